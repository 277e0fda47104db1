//! # File Classifier
//!
//! 批量上传文件并自动归类的服务核心
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有磁盘资源，只暴露能力
//! - `LocalStorage` - 保存、定位、删除、列出上传文件
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个文件
//! - `ExtractorRegistry` - 按扩展名提取文本
//! - `classify_by_filename` - 文件名关键词分类
//! - `AiClassifier` - 远程内容分类，失败降级为本地规则
//! - `CategoryRegistry` - 分类与文件列表，并发安全
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个文件"的完整处理流程
//! - `FileFlow` - 保存 → 文件名分类 → 提取 → 内容分类 → 记录
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批次校验、并发控制、汇总统计
//! - `orchestrator/app` - 对外操作入口

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{
    BatchReport, CategoryStats, ClassificationMethod, ClassifiedFile, FileListing, SortKey, SortOrder,
    UploadFile,
};
pub use orchestrator::{App, BatchProcessor};
pub use services::{AiClassifier, CategoryRegistry, ClassifyOutcome, ExtractorRegistry};
pub use workflow::{FileCtx, FileFlow, FileOutcome};
