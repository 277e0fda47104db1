//! 应用入口 - 编排层
//!
//! 持有所有共享资源（注册表、存储、提取器、分类服务），并提供调用方需要的全部操作。
//! 同一时刻只运行一个批次：每个批次开始时都会重置注册表，
//! 并行的两个批次会互相清掉对方的结果。

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppResult, StorageError};
use crate::infrastructure::LocalStorage;
use crate::models::{
    sort_listings, BatchReport, CategoryStats, FileListing, SortKey, SortOrder, UploadFile,
};
use crate::orchestrator::batch_processor::BatchProcessor;
use crate::services::{AiClassifier, CategoryRegistry, ExtractorRegistry};
use crate::utils::logging;
use crate::workflow::FileFlow;

/// 应用主结构
pub struct App {
    config: Config,
    registry: Arc<CategoryRegistry>,
    storage: Arc<LocalStorage>,
    processor: BatchProcessor,
    batch_lock: Mutex<()>,
}

impl App {
    /// 初始化应用：加载关键词表、准备上传目录、创建各项服务
    pub async fn initialize(config: Config) -> AppResult<Self> {
        logging::log_startup(&config);

        let keywords = config.load_keyword_table()?;
        let registry = Arc::new(CategoryRegistry::new(keywords, config.max_user_categories));
        let storage = Arc::new(LocalStorage::new(
            config.upload_dir.clone(),
            config.max_file_size,
        ));
        tokio::fs::create_dir_all(storage.root())
            .await
            .map_err(|source| StorageError::SaveFailed {
                path: storage.root().to_path_buf(),
                source,
            })?;

        let classifier = Arc::new(AiClassifier::new(&config)?);
        if !classifier.is_enabled() {
            warn!("⚠️ 未配置远程分类地址，内容分类只使用本地规则");
        }

        let flow = Arc::new(FileFlow::new(
            registry.clone(),
            storage.clone(),
            Arc::new(ExtractorRegistry::with_defaults()),
            classifier,
        ));
        let processor = BatchProcessor::new(&config, flow, registry.clone());

        Ok(Self {
            config,
            registry,
            storage,
            processor,
            batch_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 共享的分类注册表，可在批次运行期间随时读取
    pub fn registry(&self) -> Arc<CategoryRegistry> {
        self.registry.clone()
    }

    /// 上传并分类一批文件
    pub async fn upload(&self, files: Vec<UploadFile>) -> AppResult<BatchReport> {
        self.upload_with_cancel(files, CancellationToken::new()).await
    }

    pub async fn upload_with_cancel(
        &self,
        files: Vec<UploadFile>,
        cancel: CancellationToken,
    ) -> AppResult<BatchReport> {
        self.processor.validate(files.len())?;
        let _guard = self.batch_lock.lock().await;
        info!("开始处理 {} 个文件", files.len());
        Ok(self.processor.process_batch(files, cancel).await?)
    }

    /// 重新扫描上传目录中已有的文件并分类
    pub async fn scan_uploads(&self) -> AppResult<BatchReport> {
        self.scan_uploads_with_cancel(CancellationToken::new()).await
    }

    pub async fn scan_uploads_with_cancel(
        &self,
        cancel: CancellationToken,
    ) -> AppResult<BatchReport> {
        let _guard = self.batch_lock.lock().await;
        let stored = self.storage.list().await?;
        if stored.is_empty() {
            info!("上传目录为空，无需扫描");
            self.registry.reset_all();
            return Ok(BatchReport::empty(self.registry.snapshot()));
        }

        let files = stored
            .into_iter()
            .map(|(rel_path, size)| UploadFile::stored(rel_path, size))
            .collect();
        Ok(self.processor.run(files, cancel).await)
    }

    /// 所有分类的统计快照
    pub fn stats(&self) -> BTreeMap<String, CategoryStats> {
        self.registry.snapshot()
    }

    /// 指定分类的文件列表
    pub fn category_files(&self, name: &str) -> AppResult<CategoryStats> {
        Ok(self.registry.category(name)?)
    }

    /// 所有已记录文件的列表，可按分类筛选，按修改时间或大小排序
    ///
    /// 列表基于同一个快照生成；分类不存在时返回空列表。
    pub async fn all_files(
        &self,
        sort: SortKey,
        order: SortOrder,
        category: Option<&str>,
    ) -> Vec<FileListing> {
        let snapshot = self.registry.snapshot();
        let mut files = Vec::new();
        for (name, stats) in snapshot {
            if category.is_some_and(|filter| filter != name) {
                continue;
            }
            for mut file in stats.files().iter().cloned() {
                file.category = name.clone();
                let modified = self.modified_time(&file.path).await;
                files.push(FileListing { file, modified });
            }
        }
        sort_listings(&mut files, sort, order);
        files
    }

    async fn modified_time(&self, rel_path: &str) -> DateTime<Local> {
        let Ok(full_path) = self.storage.resolve(rel_path) else {
            return Local::now();
        };
        match tokio::fs::metadata(&full_path).await.and_then(|m| m.modified()) {
            Ok(time) => DateTime::<Local>::from(time),
            Err(_) => Local::now(),
        }
    }

    /// 分类名 → 关键词
    pub fn categories(&self) -> BTreeMap<String, Vec<String>> {
        self.registry.keyword_table().into_inner()
    }

    /// 新增分类，关键词为用户标识
    ///
    /// 成功后把已登记文件中文件名命中新分类的记录移过去，返回移动的数量。
    pub fn add_category(&self, name: &str, username: &str) -> AppResult<usize> {
        self.registry
            .add_category(name, vec![username.to_string()])?;
        let moved = self.registry.reassign_by_name();
        info!(
            "分类 '{}' 添加成功，关键词: {}，重新归类 {} 个文件",
            name.trim(),
            username.trim(),
            moved
        );
        Ok(moved)
    }

    /// 删除文件并从所有分类中移除
    ///
    /// 物理文件已不存在不算错误；返回注册表中是否存在该记录。
    pub async fn remove_file(&self, rel_path: &str) -> AppResult<bool> {
        let existed = self.storage.delete(rel_path).await?;
        let found = self.registry.remove_file(rel_path);
        match (existed, found) {
            (_, true) => info!("🗑️ 文件已删除: {}", rel_path),
            (true, false) => warn!("⚠️ 文件已删除，但未在分类中找到记录: {}", rel_path),
            (false, false) => warn!("⚠️ 文件不存在: {}", rel_path),
        }
        Ok(found)
    }
}
