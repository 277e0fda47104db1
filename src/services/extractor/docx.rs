use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use super::{truncate_chars, TextExtractor, MAX_CONTENT_CHARS};
use crate::error::ExtractionError;

/// docx 中正文所在的部件
const DOCUMENT_PART: &str = "word/document.xml";

/// 最多解压的 XML 字节数：每个字符最多 4 字节，标签开销按 8 倍估算
const MAX_XML_BYTES: u64 = (MAX_CONTENT_CHARS * 4 * 8) as u64;

/// docx 提取器：读取 zip 容器中的 `word/document.xml` 并去掉标签
pub struct DocxExtractor;

impl TextExtractor for DocxExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        let malformed = |reason: String| ExtractionError::MalformedDocument {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|source| ExtractionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut archive =
            zip::ZipArchive::new(file).map_err(|e| malformed(format!("不是有效的 docx: {}", e)))?;

        let mut part = match archive.by_name(DOCUMENT_PART) {
            Ok(part) => part,
            Err(zip::result::ZipError::FileNotFound) => {
                return Err(malformed(format!("未找到 {}", DOCUMENT_PART)))
            }
            Err(e) => return Err(malformed(format!("读取 {} 失败: {}", DOCUMENT_PART, e))),
        };

        let mut raw = Vec::new();
        (&mut part)
            .take(MAX_XML_BYTES)
            .read_to_end(&mut raw)
            .map_err(|e| malformed(format!("读取 {} 失败: {}", DOCUMENT_PART, e)))?;

        let mut xml = String::from_utf8_lossy(&raw).into_owned();
        drop_partial_tag(&mut xml);

        Ok(truncate_chars(xml_to_text(&xml), MAX_CONTENT_CHARS))
    }
}

/// 截断处可能落在标签中间，去掉未闭合的尾部标签
fn drop_partial_tag(xml: &mut String) {
    if let Some(open) = xml.rfind('<') {
        if !xml[open..].contains('>') {
            xml.truncate(open);
        }
    }
}

fn tag_regex() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"<[^>]+>").expect("static regex"))
}

fn whitespace_regex() -> &'static Regex {
    static WS: OnceLock<Regex> = OnceLock::new();
    WS.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

fn xml_to_text(xml: &str) -> String {
    let stripped = tag_regex().replace_all(xml, " ");
    let collapsed = whitespace_regex().replace_all(stripped.trim(), " ");
    collapsed
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;

    use super::*;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for (name, body) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_extracts_document_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("合作.docx");
        write_zip(
            &path,
            &[(
                DOCUMENT_PART,
                "<w:document><w:body><w:p><w:r><w:t>劳动合同</w:t></w:r></w:p>\
                 <w:p><w:t>A &amp; B</w:t></w:p></w:body></w:document>",
            )],
        );

        let text = DocxExtractor.extract(&path).unwrap();
        assert_eq!(text, "劳动合同 A & B");
    }

    #[test]
    fn test_missing_document_part_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.docx");
        write_zip(&path, &[("word/styles.xml", "<w:styles/>")]);

        let err = DocxExtractor.extract(&path).unwrap_err();
        assert!(matches!(err, ExtractionError::MalformedDocument { .. }));
    }

    #[test]
    fn test_large_document_part_is_read_up_to_cap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bomb.docx");
        let body = format!("<w:t>x{}</w:t>", "合".repeat(2_000_000));
        write_zip(&path, &[(DOCUMENT_PART, body.as_str())]);

        let text = DocxExtractor.extract(&path).unwrap();
        assert_eq!(text.chars().count(), MAX_CONTENT_CHARS);
        assert!(text.starts_with("x合合"));
    }

    #[test]
    fn test_tag_cut_at_cap_is_dropped() {
        let mut xml = String::from("<w:t>正文</w:t><w:p attr=\"");
        drop_partial_tag(&mut xml);
        assert_eq!(xml_to_text(&xml), "正文");
    }

    #[test]
    fn test_not_a_zip_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.docx");
        std::fs::write(&path, b"plain bytes").unwrap();

        let err = DocxExtractor.extract(&path).unwrap_err();
        assert!(matches!(err, ExtractionError::MalformedDocument { .. }));
    }
}
