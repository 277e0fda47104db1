use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::services::keyword_classifier::KeywordTable;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 上传文件保存目录
    pub upload_dir: PathBuf,
    /// 同时处理的文件数量
    pub max_concurrent_files: usize,
    /// 单批最多文件数
    pub max_batch_files: usize,
    /// 最多允许新增的自定义分类数
    pub max_user_categories: usize,
    /// 单个文件大小上限（字节）
    pub max_file_size: u64,
    // --- 远程分类配置 ---
    /// 为空时不调用远程服务，直接使用本地规则
    pub ai_api_url: String,
    pub ai_api_token: String,
    pub ai_uid: String,
    pub ai_intention_code: String,
    pub ai_product_name: String,
    pub ai_timeout_ms: u64,
    /// 可选的关键词配置文件（TOML）
    pub category_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            max_concurrent_files: 30,
            max_batch_files: 200,
            max_user_categories: 3,
            max_file_size: 100 << 20,
            ai_api_url: "http://kpp.wps.cn/api/v2/aigc/completions".to_string(),
            ai_api_token: String::new(),
            ai_uid: "282987730".to_string(),
            ai_intention_code: "kdocs_public_autolabel_new".to_string(),
            ai_product_name: "kdocs-public-pc".to_string(),
            ai_timeout_ms: 30_000,
            category_file: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            upload_dir: std::env::var("UPLOAD_DIR").map(PathBuf::from).unwrap_or(default.upload_dir),
            max_concurrent_files: parse_env("MAX_CONCURRENT_FILES").unwrap_or(default.max_concurrent_files),
            max_batch_files: parse_env("MAX_BATCH_FILES").unwrap_or(default.max_batch_files),
            max_user_categories: parse_env("MAX_USER_CATEGORIES").unwrap_or(default.max_user_categories),
            max_file_size: parse_env("MAX_FILE_SIZE").unwrap_or(default.max_file_size),
            ai_api_url: std::env::var("AI_API_URL").unwrap_or(default.ai_api_url),
            ai_api_token: std::env::var("AI_API_TOKEN").unwrap_or(default.ai_api_token),
            ai_uid: std::env::var("AI_UID").unwrap_or(default.ai_uid),
            ai_intention_code: std::env::var("AI_INTENTION_CODE").unwrap_or(default.ai_intention_code),
            ai_product_name: std::env::var("AI_PRODUCT_NAME").unwrap_or(default.ai_product_name),
            ai_timeout_ms: parse_env("AI_TIMEOUT_MS").unwrap_or(default.ai_timeout_ms),
            category_file: std::env::var("CATEGORY_FILE").ok().map(PathBuf::from).or(default.category_file),
        }
    }

    pub fn ai_timeout(&self) -> Duration {
        Duration::from_millis(self.ai_timeout_ms)
    }

    /// 加载预定义分类关键词
    ///
    /// 未配置 `category_file` 时使用内置表；配置了则以文件中的 `[categories]` 表为准。
    pub fn load_keyword_table(&self) -> Result<KeywordTable, ConfigError> {
        let Some(path) = &self.category_file else {
            return Ok(KeywordTable::predefined());
        };
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CategoryFile {
            path: display.clone(),
            reason: e.to_string(),
        })?;
        parse_category_toml(&content).map_err(|reason| ConfigError::CategoryFile {
            path: display,
            reason,
        })
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[derive(Debug, Deserialize)]
struct CategoryFile {
    categories: BTreeMap<String, Vec<String>>,
}

fn parse_category_toml(content: &str) -> Result<KeywordTable, String> {
    let file: CategoryFile = toml::from_str(content).map_err(|e| e.to_string())?;
    if file.categories.is_empty() {
        return Err("[categories] 不能为空".to_string());
    }
    if let Some((name, _)) = file.categories.iter().find(|(_, kws)| kws.is_empty()) {
        return Err(format!("分类 {} 没有关键词", name));
    }
    Ok(KeywordTable::new(file.categories))
}
