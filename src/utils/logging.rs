/// 日志工具模块
///
/// 提供日志初始化和批次日志输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::BatchReport;

/// 初始化 tracing 日志
///
/// 级别由 `RUST_LOG` 控制，默认 `info`；重复调用无副作用。
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 文件分类服务启动");
    info!("📁 上传目录: {}", config.upload_dir.display());
    info!("📊 最大并发数: {}", config.max_concurrent_files);
    info!("📦 单批上限: {} 个文件", config.max_batch_files);
    info!("{}", "=".repeat(60));
}

/// 记录批次开始信息
///
/// # 参数
/// - `total`: 本批文件数
/// - `max_concurrent`: 最大并发数
pub fn log_batch_start(total: usize, max_concurrent: usize) {
    info!("{}", "=".repeat(60));
    info!("📦 开始处理 {} 个文件 (并发 {})", total, max_concurrent);
    info!("{}", "=".repeat(60));
}

/// 打印批次统计
pub fn log_batch_complete(report: &BatchReport) {
    info!("{}", "─".repeat(60));
    info!("📊 批次完成: {}", report.finished_at);
    info!("✅ 已处理: {}/{}", report.processed, report.total);
    info!("🏷️ 文件名分类: {}", report.by_name);
    info!("🤖 内容分类: {} (其中本地规则 {})", report.by_content, report.degraded);
    info!("❌ 失败: {}", report.failed);
    if report.cancelled {
        info!("⏹️ 批次已被取消");
    }
    for (name, stats) in &report.classifications {
        if stats.count() > 0 {
            info!("   {}: {}", name, stats.count());
        }
    }
    info!("{}", "─".repeat(60));
}
