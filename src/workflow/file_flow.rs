//! 单个文件处理流程 - 流程层
//!
//! 流程顺序：
//! 1. 保存到上传目录（失败则标记为 failed，不再分类）
//! 2. 文件名关键词分类，命中即记录为 by-name
//! 3. 提取文本（失败时使用空内容继续）
//! 4. 内容分类（远程服务或本地规则），记录为 by-content

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::infrastructure::LocalStorage;
use crate::models::{ClassificationMethod, ClassifiedFile, UploadFile, UploadSource, UNCLASSIFIED};
use crate::services::extractor::ExtractorRegistry;
use crate::services::keyword_classifier::{classify_by_filename, KeywordTable};
use crate::services::{AiClassifier, CategoryRegistry};
use crate::workflow::file_ctx::FileCtx;

/// 单个文件的最终状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// 文件名命中
    ByName { category: String },
    /// 内容分类；`degraded` 表示使用了本地规则
    ByContent { category: String, degraded: bool },
    /// 保存失败或在保存前被取消
    Failed { reason: String },
}

/// 单个文件处理流程
///
/// - 不持有批次状态，可在多个任务间通过 `Arc` 共享
/// - 任何分支都会走到终态，不向上返回错误
pub struct FileFlow {
    registry: Arc<CategoryRegistry>,
    storage: Arc<LocalStorage>,
    extractors: Arc<ExtractorRegistry>,
    classifier: Arc<AiClassifier>,
}

impl FileFlow {
    pub fn new(
        registry: Arc<CategoryRegistry>,
        storage: Arc<LocalStorage>,
        extractors: Arc<ExtractorRegistry>,
        classifier: Arc<AiClassifier>,
    ) -> Self {
        Self {
            registry,
            storage,
            extractors,
            classifier,
        }
    }

    pub async fn run(
        &self,
        upload: UploadFile,
        keywords: &KeywordTable,
        ctx: &FileCtx,
        cancel: &CancellationToken,
    ) -> FileOutcome {
        // ========== 1. 保存 ==========
        let rel_path = match self.persist(&upload, ctx, cancel).await {
            Ok(rel_path) => rel_path,
            Err(reason) => {
                error!("{} ❌ {}", ctx, reason);
                return FileOutcome::Failed { reason };
            }
        };

        let mut record = ClassifiedFile {
            name: upload.name.clone(),
            path: rel_path.clone(),
            size: upload.size,
            method: ClassificationMethod::ByName,
            category: String::new(),
        };

        // ========== 2. 文件名分类 ==========
        if let Some(category) = classify_by_filename(&upload.name, keywords) {
            info!("{} ✓ 文件名命中分类: {}", ctx, category);
            record.category = category.to_string();
            self.record(record, ctx);
            return FileOutcome::ByName {
                category: category.to_string(),
            };
        }

        // ========== 3. 提取文本 ==========
        let content = self
            .extract(&rel_path, upload.declared_type.clone(), ctx, cancel)
            .await;

        // ========== 4. 内容分类 ==========
        let outcome = self
            .classifier
            .classify(&upload.name, &content, cancel)
            .await;
        let category = outcome.category().to_string();
        info!(
            "{} ✓ 内容分类: {}{}",
            ctx,
            category,
            if outcome.is_degraded() { " (本地规则)" } else { "" }
        );

        record.method = ClassificationMethod::ByContent;
        record.category = category.clone();
        let category = self.record(record, ctx);

        FileOutcome::ByContent {
            category,
            degraded: outcome.is_degraded(),
        }
    }

    async fn persist(
        &self,
        upload: &UploadFile,
        ctx: &FileCtx,
        cancel: &CancellationToken,
    ) -> Result<String, String> {
        if cancel.is_cancelled() {
            return Err("批次已取消，未保存".to_string());
        }

        match &upload.source {
            UploadSource::Bytes(bytes) => {
                let name = upload.stored_name.as_deref().unwrap_or(&upload.name);
                let saved = tokio::select! {
                    _ = cancel.cancelled() => return Err("批次已取消，未保存".to_string()),
                    saved = self.storage.save(name, bytes) => saved,
                };
                let rel_path = saved.map_err(|e| e.to_string())?;
                debug!("{} 已保存为 {}", ctx, rel_path);
                Ok(rel_path)
            }
            UploadSource::Stored(rel_path) => {
                self.storage.resolve(rel_path).map_err(|e| e.to_string())?;
                Ok(rel_path.clone())
            }
        }
    }

    /// 提取失败时返回空字符串
    async fn extract(
        &self,
        rel_path: &str,
        declared_type: Option<String>,
        ctx: &FileCtx,
        cancel: &CancellationToken,
    ) -> String {
        if cancel.is_cancelled() {
            return String::new();
        }
        let full_path: PathBuf = match self.storage.resolve(rel_path) {
            Ok(path) => path,
            Err(e) => {
                warn!("{} 无法定位文件: {}", ctx, e);
                return String::new();
            }
        };

        let extractors = self.extractors.clone();
        let handle = tokio::task::spawn_blocking(move || {
            extractors.extract(&full_path, declared_type.as_deref())
        });

        match handle.await {
            Ok(Ok(text)) => {
                debug!("{} 提取到 {} 个字符", ctx, text.chars().count());
                text
            }
            Ok(Err(e)) => {
                debug!("{} 文本提取失败，使用空内容: {}", ctx, e);
                String::new()
            }
            Err(e) => {
                warn!("{} 文本提取任务异常，使用空内容: {}", ctx, e);
                String::new()
            }
        }
    }

    /// 写入注册表；分类不存在时改记到"未分类"。返回实际记录的分类
    fn record(&self, mut record: ClassifiedFile, ctx: &FileCtx) -> String {
        let category = record.category.clone();
        match self.registry.record_file(record.clone()) {
            Ok(()) => category,
            Err(e) => {
                warn!("{} {}，改记到{}", ctx, e, UNCLASSIFIED);
                record.category = UNCLASSIFIED.to_string();
                if let Err(e) = self.registry.record_file(record) {
                    error!("{} 记录失败: {}", ctx, e);
                }
                UNCLASSIFIED.to_string()
            }
        }
    }
}
