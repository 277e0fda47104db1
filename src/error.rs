use std::path::PathBuf;

use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 文本提取错误
    #[error("提取错误: {0}")]
    Extraction(#[from] ExtractionError),
    /// 远程分类错误
    #[error("远程分类错误: {0}")]
    Remote(#[from] RemoteClassifierError),
    /// 存储错误
    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),
    /// 分类注册表错误
    #[error("分类错误: {0}")]
    Registry(#[from] RegistryError),
    /// 批次错误
    #[error("批次错误: {0}")]
    Batch(#[from] BatchError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 文本提取错误
///
/// 在单个文件流程内部被吸收，降级为空内容，不会中断流程。
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// 没有注册对应扩展名的提取器
    #[error("不支持的文件类型: {extension}")]
    UnsupportedType { extension: String },
    /// 文档结构损坏或缺少正文部分
    #[error("文档格式错误 ({}): {reason}", path.display())]
    MalformedDocument { path: PathBuf, reason: String },
    /// 底层读取失败
    #[error("读取文件失败 ({}): {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 远程分类服务错误
///
/// 只在 `AiClassifier` 内部出现，随降级结果一起返回，永远不会向编排层传播。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteClassifierError {
    /// 未配置远程地址
    #[error("远程分类未启用")]
    Disabled,
    /// 请求超时
    #[error("远程分类请求超时")]
    Timeout,
    /// 网络层失败
    #[error("远程分类请求失败: {0}")]
    Transport(String),
    /// 非 2xx 状态码
    #[error("远程分类返回错误状态码 {status}: {body}")]
    BadStatus { status: u16, body: String },
    /// 响应体超过上限
    #[error("远程分类响应过大（上限 {limit} 字节）")]
    ReplyTooLarge { limit: usize },
    /// 响应体无法解析
    #[error("无法解析远程分类响应: {0}")]
    UnparsableReply(String),
    /// 返回了未知的分类标签
    #[error("远程分类返回未知标签: {0}")]
    UnrecognizedLabel(String),
    /// 批次被取消
    #[error("远程分类已取消")]
    Cancelled,
}

/// 存储错误
#[derive(Debug, Error)]
pub enum StorageError {
    /// 保存失败
    #[error("保存文件失败 ({}): {source}", path.display())]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 删除失败（文件不存在不算失败）
    #[error("删除文件失败 ({}): {source}", path.display())]
    DeleteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 遍历上传目录失败
    #[error("读取上传目录失败 ({}): {source}", path.display())]
    ListFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 路径越界或为空
    #[error("非法文件路径: {path}")]
    InvalidPath { path: String },
    /// 文件超过大小上限
    #[error("文件过大 ({name}): {size} 字节，上限 {limit} 字节")]
    TooLarge { name: String, size: u64, limit: u64 },
}

/// 分类注册表错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// 自定义分类数量已达上限
    #[error("新增分类数量已达上限（最多{limit}个）")]
    CategoryLimitExceeded { limit: usize },
    /// 分类不存在
    #[error("分类不存在: {name}")]
    UnknownCategory { name: String },
    /// 关键词列表为空
    #[error("分类 {name} 的关键词不能为空")]
    EmptyKeywords { name: String },
    /// 分类名为空
    #[error("分类名称不能为空")]
    EmptyName,
    /// 与预定义分类重名
    #[error("不能覆盖预定义分类: {name}")]
    ReservedCategory { name: String },
}

/// 批次错误：在任何处理开始之前整体拒绝
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    /// 没有上传文件
    #[error("没有上传文件")]
    EmptyBatch,
    /// 文件数量超过上限
    #[error("最多支持上传{max}个文件，本次提交了{count}个")]
    TooManyFiles { count: usize, max: usize },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 分类配置文件读取或解析失败
    #[error("分类配置文件无效 ({path}): {reason}")]
    CategoryFile { path: String, reason: String },
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
