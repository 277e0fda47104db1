//! 批处理器 - 编排层
//!
//! 每个文件一个任务，同时运行的任务数由 Semaphore 限制；
//! 先拿到许可再派发任务，其余文件在派发循环里排队。
//! 计数器使用原子类型，所有任务结束后才生成报告。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::config::Config;
use crate::error::BatchError;
use crate::models::report::now_string;
use crate::infrastructure::NameReservation;
use crate::models::{BatchReport, UploadFile, UploadSource};
use crate::services::CategoryRegistry;
use crate::utils::logging;
use crate::workflow::{FileCtx, FileFlow, FileOutcome};

/// 批处理器
pub struct BatchProcessor {
    flow: Arc<FileFlow>,
    registry: Arc<CategoryRegistry>,
    max_concurrent: usize,
    max_batch_files: usize,
}

/// 并发安全的计数器
#[derive(Debug, Default)]
struct BatchCounters {
    processed: AtomicUsize,
    by_name: AtomicUsize,
    by_content: AtomicUsize,
    failed: AtomicUsize,
    degraded: AtomicUsize,
}

impl BatchCounters {
    fn record(&self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::ByName { .. } => {
                self.by_name.fetch_add(1, Ordering::SeqCst);
            }
            FileOutcome::ByContent { degraded, .. } => {
                self.by_content.fetch_add(1, Ordering::SeqCst);
                if *degraded {
                    self.degraded.fetch_add(1, Ordering::SeqCst);
                }
            }
            FileOutcome::Failed { .. } => {
                self.failed.fetch_add(1, Ordering::SeqCst);
            }
        }
        self.processed.fetch_add(1, Ordering::SeqCst);
    }

    fn record_failed(&self) {
        self.record(&FileOutcome::Failed {
            reason: String::new(),
        });
    }
}

impl BatchProcessor {
    pub fn new(config: &Config, flow: Arc<FileFlow>, registry: Arc<CategoryRegistry>) -> Self {
        Self {
            flow,
            registry,
            max_concurrent: config.max_concurrent_files.max(1),
            max_batch_files: config.max_batch_files,
        }
    }

    /// 在任何处理开始之前校验批次大小
    pub fn validate(&self, count: usize) -> Result<(), BatchError> {
        if count == 0 {
            return Err(BatchError::EmptyBatch);
        }
        if count > self.max_batch_files {
            return Err(BatchError::TooManyFiles {
                count,
                max: self.max_batch_files,
            });
        }
        Ok(())
    }

    /// 处理一批上传文件
    ///
    /// 超过上限的批次整体拒绝，不会触碰存储和注册表。
    pub async fn process_batch(
        &self,
        files: Vec<UploadFile>,
        cancel: CancellationToken,
    ) -> Result<BatchReport, BatchError> {
        self.validate(files.len())?;
        Ok(self.run(files, cancel).await)
    }

    /// 重置注册表后并发处理所有文件，等待全部结束
    pub(crate) async fn run(&self, mut files: Vec<UploadFile>, cancel: CancellationToken) -> BatchReport {
        self.registry.reset_all();
        assign_stored_names(&mut files);

        let total = files.len();
        logging::log_batch_start(total, self.max_concurrent);

        let keywords = Arc::new(self.registry.keyword_table());
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let counters = Arc::new(BatchCounters::default());
        let mut handles = Vec::with_capacity(total);

        for (idx, upload) in files.into_iter().enumerate() {
            let ctx = FileCtx::new(idx + 1, total, &upload.name);
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!("{} 无法获取并发许可: {}", ctx, e);
                    counters.record_failed();
                    continue;
                }
            };

            let flow = self.flow.clone();
            let keywords = keywords.clone();
            let counters = counters.clone();
            let cancel = cancel.clone();

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let outcome = flow.run(upload, &keywords, &ctx, &cancel).await;
                counters.record(&outcome);
            }));
        }

        // 等待所有任务结束；任务异常也算作失败，保证每个文件都有终态
        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                error!("文件处理任务异常: {}", e);
                counters.record_failed();
            }
        }

        let report = BatchReport {
            total,
            processed: counters.processed.load(Ordering::SeqCst),
            by_name: counters.by_name.load(Ordering::SeqCst),
            by_content: counters.by_content.load(Ordering::SeqCst),
            failed: counters.failed.load(Ordering::SeqCst),
            degraded: counters.degraded.load(Ordering::SeqCst),
            cancelled: cancel.is_cancelled(),
            finished_at: now_string(),
            classifications: self.registry.snapshot(),
        };
        logging::log_batch_complete(&report);
        report
    }
}

/// 在派发任务之前为待保存的文件分配互不相同的文件名
///
/// 名称非法的文件不分配，保存时会按原名失败。
fn assign_stored_names(files: &mut [UploadFile]) {
    let mut names = NameReservation::default();
    for upload in files.iter_mut() {
        if matches!(upload.source, UploadSource::Bytes(_)) {
            upload.stored_name = names.reserve(&upload.name).ok();
        }
    }
}
