//! 文本提取 - 业务能力层
//!
//! 按小写扩展名分发到具体的提取器；未注册的扩展名走默认提取器，
//! 默认提取器总是返回 `UnsupportedType`。注册只在启动时进行，
//! 之后注册表只读，可以通过 `Arc` 在多个流程之间共享。

mod docx;
mod pdf;
mod plain_text;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use phf::phf_map;

use crate::error::ExtractionError;

pub use docx::DocxExtractor;
pub use pdf::PdfExtractor;
pub use plain_text::PlainTextExtractor;

/// 所有提取器返回文本的最大字符数
pub const MAX_CONTENT_CHARS: usize = 10_000;

/// 没有扩展名时，用客户端声明的 MIME 类型推断扩展名
static DECLARED_TYPE_EXTENSIONS: phf::Map<&'static str, &'static str> = phf_map! {
    "text/plain" => "txt",
    "text/markdown" => "md",
    "text/csv" => "csv",
    "application/json" => "json",
    "application/x-yaml" => "yaml",
    "application/yaml" => "yaml",
    "application/pdf" => "pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "docx",
};

/// 文本提取器
///
/// 实现必须线程安全，并自行把结果截断到 `MAX_CONTENT_CHARS`。
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String, ExtractionError>;
}

/// 默认提取器：不支持的类型
struct UnsupportedExtractor;

impl TextExtractor for UnsupportedExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        Err(ExtractionError::UnsupportedType {
            extension: path
                .extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_default(),
        })
    }
}

/// 扩展名 → 提取器
pub struct ExtractorRegistry {
    extractors: HashMap<String, Arc<dyn TextExtractor>>,
    fallback: Arc<dyn TextExtractor>,
}

impl ExtractorRegistry {
    /// 空注册表，所有类型都不支持
    pub fn new() -> Self {
        Self {
            extractors: HashMap::new(),
            fallback: Arc::new(UnsupportedExtractor),
        }
    }

    /// 注册内置的纯文本、docx、pdf 提取器
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let plain: Arc<dyn TextExtractor> = Arc::new(PlainTextExtractor);
        for ext in ["txt", "md", "log", "csv", "json", "yaml", "yml"] {
            registry.register_shared(ext, plain.clone());
        }
        registry.register("docx", DocxExtractor);
        registry.register("pdf", PdfExtractor);
        registry
    }

    /// 注册扩展名（不区分大小写，可带或不带前导点）
    pub fn register(&mut self, extension: &str, extractor: impl TextExtractor + 'static) {
        self.register_shared(extension, Arc::new(extractor));
    }

    pub fn register_shared(&mut self, extension: &str, extractor: Arc<dyn TextExtractor>) {
        self.extractors
            .insert(normalize_extension(extension), extractor);
    }

    pub fn supports(&self, extension: &str) -> bool {
        self.extractors.contains_key(&normalize_extension(extension))
    }

    /// 提取文本
    ///
    /// 优先使用路径的扩展名；路径没有扩展名时才参考声明的 MIME 类型。
    pub fn extract(
        &self,
        path: &Path,
        declared_type: Option<&str>,
    ) -> Result<String, ExtractionError> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .or_else(|| {
                declared_type
                    .map(|t| t.split(';').next().unwrap_or_default().trim().to_lowercase())
                    .and_then(|t| DECLARED_TYPE_EXTENSIONS.get(t.as_str()).map(|e| e.to_string()))
            });

        match extension.and_then(|ext| self.extractors.get(&ext)) {
            Some(extractor) => extractor.extract(path),
            None => self.fallback.extract(path),
        }
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim_start_matches('.').to_lowercase()
}

/// 按字符截断（不会截断在 UTF-8 字符中间）
pub(crate) fn truncate_chars(mut text: String, max_chars: usize) -> String {
    let cut = text.char_indices().nth(max_chars).map(|(idx, _)| idx);
    if let Some(idx) = cut {
        text.truncate(idx);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str);

    impl TextExtractor for Fixed {
        fn extract(&self, _path: &Path) -> Result<String, ExtractionError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_unregistered_extension_is_unsupported() {
        let registry = ExtractorRegistry::with_defaults();
        let err = registry.extract(Path::new("notes.bin"), None).unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedType { extension } if extension == "bin"));
    }

    #[test]
    fn test_dispatch_is_case_insensitive() {
        let mut registry = ExtractorRegistry::new();
        registry.register(".XYZ", Fixed("hit"));
        assert!(registry.supports("xyz"));
        assert_eq!(registry.extract(Path::new("a.XyZ"), None).unwrap(), "hit");
    }

    #[test]
    fn test_declared_type_used_without_extension() {
        let mut registry = ExtractorRegistry::new();
        registry.register("pdf", Fixed("pdf text"));
        let text = registry
            .extract(Path::new("upload"), Some("application/pdf; charset=binary"))
            .unwrap();
        assert_eq!(text, "pdf text");
        assert!(registry.extract(Path::new("upload"), None).is_err());
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("合同协议".to_string(), 2), "合同");
        assert_eq!(truncate_chars("abc".to_string(), 10), "abc");
    }
}
