//! 文件处理上下文
//!
//! 封装"我正在处理本批的第几个文件"这一信息，只用于日志

use std::fmt::Display;

#[derive(Debug, Clone)]
pub struct FileCtx {
    /// 在本批中的序号（从1开始）
    pub index: usize,
    /// 本批文件总数
    pub total: usize,
    pub name: String,
}

impl FileCtx {
    pub fn new(index: usize, total: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            total,
            name: name.into(),
        }
    }
}

impl Display for FileCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[文件 {}/{} {}]", self.index, self.total, self.name)
    }
}
