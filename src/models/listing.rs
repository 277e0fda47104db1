use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::category::ClassifiedFile;

/// 文件列表的排序字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// 按修改时间
    #[default]
    Time,
    /// 按文件大小
    Size,
}

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortKey {
    /// 无法识别的值按修改时间排序
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "size" => Self::Size,
            _ => Self::Time,
        }
    }
}

impl SortOrder {
    /// 无法识别的值按降序排序
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "asc" => Self::Asc,
            _ => Self::Desc,
        }
    }
}

/// 跨分类文件列表中的一项
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileListing {
    #[serde(flatten)]
    pub file: ClassifiedFile,
    /// 文件的修改时间；磁盘上已不存在时为列出的时间
    pub modified: DateTime<Local>,
}

/// 稳定排序，相等的项保持原有顺序
pub fn sort_listings(files: &mut [FileListing], key: SortKey, order: SortOrder) {
    files.sort_by(|a, b| {
        let ordering = match key {
            SortKey::Size => a.file.size.cmp(&b.file.size),
            SortKey::Time => a.modified.cmp(&b.modified),
        };
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}
