use serde::{Deserialize, Serialize};

/// 未命中任何分类时的归属
pub const UNCLASSIFIED: &str = "未分类";

/// 远程分类服务表示"其它"的标签
pub const OTHER_LABEL: &str = "其它分类";

/// 预定义分类及其默认关键词
pub const PREDEFINED_CATEGORIES: &[(&str, &[&str])] = &[
    ("合同", &["合同", "协议", "契约", "contract", "agreement", "合作", "签署"]),
    ("简历", &["简历", "履历", "resume", "cv", "个人简历", "求职", "应聘"]),
    ("发票", &["发票", "票据", "invoice", "收据", "账单", "bill", "费用"]),
    ("论文", &["论文", "研究", "paper", "thesis", "学术", "期刊", "研究报告", "报告", "毕业论文"]),
];

/// 分类方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassificationMethod {
    /// 文件名关键词命中
    ByName,
    /// 根据内容（远程服务或本地规则）
    ByContent,
    /// 处理失败
    Failed,
}

/// 一个已分类文件的记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedFile {
    pub name: String,
    /// 相对上传目录的存储路径，也是后续查询/删除的标识
    pub path: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub method: ClassificationMethod,
    pub category: String,
}

/// 分类统计（对外快照）
///
/// `count` 总是由 `files.len()` 推导，不能单独设置。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    count: usize,
    files: Vec<ClassifiedFile>,
}

impl CategoryStats {
    pub fn new(files: Vec<ClassifiedFile>) -> Self {
        Self {
            count: files.len(),
            files,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn files(&self) -> &[ClassifiedFile] {
        &self.files
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.files.iter().any(|f| f.path == path)
    }
}
