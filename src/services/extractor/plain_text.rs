use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::{truncate_chars, TextExtractor, MAX_CONTENT_CHARS};
use crate::error::ExtractionError;

/// 纯文本提取器（txt/md/log/csv/json/yaml）
///
/// 最多读取 `MAX_CONTENT_CHARS * 4` 字节，非法 UTF-8 按替换字符处理。
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        let io_err = |source| ExtractionError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(io_err)?;

        let mut bytes = Vec::new();
        file.take((MAX_CONTENT_CHARS * 4) as u64)
            .read_to_end(&mut bytes)
            .map_err(io_err)?;

        let text = String::from_utf8_lossy(&bytes).into_owned();
        Ok(truncate_chars(text, MAX_CONTENT_CHARS))
    }
}
