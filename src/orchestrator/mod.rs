//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批处理器
//! - 校验批次大小（超限整体拒绝）
//! - 用 Semaphore 限制同时运行的文件流程数
//! - 等待所有流程结束后汇总统计
//!
//! ### `app` - 应用入口
//! - 持有注册表、存储、提取器、分类服务
//! - 对外提供上传、重新扫描、查询、新增分类、删除文件
//!
//! ## 层次关系
//!
//! ```text
//! app
//!     ↓
//! batch_processor (处理 Vec<UploadFile>)
//!     ↓
//! workflow::FileFlow (处理单个文件)
//!     ↓
//! services (能力层：extractor / keyword / ai / registry)
//!     ↓
//! infrastructure (基础设施：LocalStorage)
//! ```

pub mod app;
pub mod batch_processor;

pub use app::App;
pub use batch_processor::BatchProcessor;
