use std::path::Path;

use anyhow::{Context, Result};
use file_classifier::utils::logging;
use file_classifier::{App, Config, UploadFile};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// 用法：
/// - `file_classifier <文件...>`：上传并分类给定文件
/// - `file_classifier`：重新扫描上传目录
#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置
    let config = Config::from_env();
    let app = App::initialize(config).await?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("收到中断信号，正在取消批次...");
                cancel.cancel();
            }
        });
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let report = if args.is_empty() {
        app.scan_uploads_with_cancel(cancel).await?
    } else {
        let mut files = Vec::with_capacity(args.len());
        for arg in &args {
            let path = Path::new(arg);
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("无法读取文件: {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| arg.clone());
            files.push(UploadFile::from_bytes(name, bytes));
        }
        app.upload_with_cancel(files, cancel).await?
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
