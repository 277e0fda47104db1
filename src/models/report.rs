use std::collections::BTreeMap;

use serde::Serialize;

use super::category::CategoryStats;

/// 一次批处理的结果
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub total: usize,
    pub processed: usize,
    pub by_name: usize,
    pub by_content: usize,
    pub failed: usize,
    /// 远程分类降级为本地规则的次数（包含在 by_content 中）
    pub degraded: usize,
    pub cancelled: bool,
    pub finished_at: String,
    pub classifications: BTreeMap<String, CategoryStats>,
}

impl BatchReport {
    /// 空批次（例如上传目录不存在时的重新扫描）
    pub fn empty(classifications: BTreeMap<String, CategoryStats>) -> Self {
        Self {
            finished_at: now_string(),
            classifications,
            ..Default::default()
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.processed == self.by_name + self.by_content + self.failed
    }
}

pub(crate) fn now_string() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
