use std::path::Path;

use super::{truncate_chars, TextExtractor, MAX_CONTENT_CHARS};
use crate::error::ExtractionError;

/// PDF 提取器，只处理带文字层的 PDF
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        let bytes = std::fs::read(path).map_err(|source| ExtractionError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let text = pdf_extract::extract_text_from_mem(&bytes).map_err(|e| {
            ExtractionError::MalformedDocument {
                path: path.to_path_buf(),
                reason: format!("解析 PDF 失败: {}", e),
            }
        })?;

        if text.trim().is_empty() {
            return Err(ExtractionError::MalformedDocument {
                path: path.to_path_buf(),
                reason: "PDF 无可提取文本".to_string(),
            });
        }
        Ok(truncate_chars(text, MAX_CONTENT_CHARS))
    }
}
