//! 分类注册表 - 业务能力层
//!
//! 持有每个分类的关键词和已分类文件列表。所有写操作以及快照、删除扫描
//! 都在同一把 `RwLock` 下完成：写操作持有写锁，快照持有读锁，
//! 因此任何快照里的 `count` 都与文件列表长度一致。

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use crate::error::RegistryError;
use crate::models::{CategoryStats, ClassificationMethod, ClassifiedFile, UNCLASSIFIED};
use crate::services::keyword_classifier::{classify_by_filename, KeywordTable};

#[derive(Debug, Clone)]
struct CategoryEntry {
    keywords: Vec<String>,
    files: Vec<ClassifiedFile>,
    predefined: bool,
}

impl CategoryEntry {
    fn new(keywords: Vec<String>, predefined: bool) -> Self {
        Self {
            keywords,
            files: Vec::new(),
            predefined,
        }
    }
}

/// 分类注册表
///
/// 通过 `Arc<CategoryRegistry>` 在编排层、流程层和查询方之间共享。
#[derive(Debug)]
pub struct CategoryRegistry {
    categories: RwLock<BTreeMap<String, CategoryEntry>>,
    max_user_categories: usize,
}

impl CategoryRegistry {
    /// 用预定义关键词表创建注册表，并始终包含"未分类"
    pub fn new(table: KeywordTable, max_user_categories: usize) -> Self {
        let mut categories: BTreeMap<String, CategoryEntry> = table
            .into_inner()
            .into_iter()
            .map(|(name, keywords)| (name, CategoryEntry::new(keywords, true)))
            .collect();
        categories
            .entry(UNCLASSIFIED.to_string())
            .or_insert_with(|| CategoryEntry::new(Vec::new(), true));

        Self {
            categories: RwLock::new(categories),
            max_user_categories,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, CategoryEntry>> {
        self.categories.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, CategoryEntry>> {
        self.categories.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// 新增（或替换）一个自定义分类
    ///
    /// 替换已有的自定义分类时，其文件列表会被清空。
    pub fn add_category(
        &self,
        name: &str,
        keywords: Vec<String>,
    ) -> Result<(), RegistryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let keywords: Vec<String> = keywords
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        if keywords.is_empty() {
            return Err(RegistryError::EmptyKeywords {
                name: name.to_string(),
            });
        }

        let mut categories = self.write();
        match categories.get(name) {
            Some(entry) if entry.predefined => {
                return Err(RegistryError::ReservedCategory {
                    name: name.to_string(),
                })
            }
            Some(_) => {}
            None => {
                let user_count = categories.values().filter(|e| !e.predefined).count();
                if user_count >= self.max_user_categories {
                    return Err(RegistryError::CategoryLimitExceeded {
                        limit: self.max_user_categories,
                    });
                }
            }
        }

        categories.insert(name.to_string(), CategoryEntry::new(keywords, false));
        debug!("分类 {} 已写入注册表", name);
        Ok(())
    }

    /// 记录一个已分类文件
    ///
    /// 同一路径若已在任意分类中登记，旧记录会先被移除。
    pub fn record_file(&self, file: ClassifiedFile) -> Result<(), RegistryError> {
        let mut categories = self.write();
        if !categories.contains_key(&file.category) {
            warn!("分类不存在，忽略文件 {} -> {}", file.name, file.category);
            return Err(RegistryError::UnknownCategory {
                name: file.category,
            });
        }

        for entry in categories.values_mut() {
            entry.files.retain(|f| f.path != file.path);
        }
        if let Some(entry) = categories.get_mut(&file.category) {
            entry.files.push(file);
        }
        Ok(())
    }

    /// 清空所有分类的文件列表，保留关键词配置
    pub fn reset_all(&self) {
        let mut categories = self.write();
        for entry in categories.values_mut() {
            entry.files.clear();
        }
    }

    /// 所有分类的独立副本
    pub fn snapshot(&self) -> BTreeMap<String, CategoryStats> {
        self.read()
            .iter()
            .map(|(name, entry)| (name.clone(), CategoryStats::new(entry.files.clone())))
            .collect()
    }

    /// 单个分类的副本
    pub fn category(&self, name: &str) -> Result<CategoryStats, RegistryError> {
        self.read()
            .get(name)
            .map(|entry| CategoryStats::new(entry.files.clone()))
            .ok_or_else(|| RegistryError::UnknownCategory {
                name: name.to_string(),
            })
    }

    /// 从所有分类中移除该路径的记录，返回是否找到
    pub fn remove_file(&self, path: &str) -> bool {
        let mut categories = self.write();
        let mut found = false;
        for entry in categories.values_mut() {
            let before = entry.files.len();
            entry.files.retain(|f| f.path != path);
            found |= entry.files.len() != before;
        }
        found
    }

    /// 当前用于文件名匹配的关键词表（不含没有关键词的分类）
    pub fn keyword_table(&self) -> KeywordTable {
        let entries = self
            .read()
            .iter()
            .filter(|(_, entry)| !entry.keywords.is_empty())
            .map(|(name, entry)| (name.clone(), entry.keywords.clone()))
            .collect();
        KeywordTable::new(entries)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    pub fn user_category_count(&self) -> usize {
        self.read().values().filter(|e| !e.predefined).count()
    }

    pub fn total_files(&self) -> usize {
        self.read().values().map(|e| e.files.len()).sum()
    }

    /// 用当前关键词表重新按文件名归类已登记的文件
    ///
    /// 只移动文件名命中、且命中分类与当前分类不同的记录；整个过程持有写锁。
    /// 返回被移动的文件数。
    pub fn reassign_by_name(&self) -> usize {
        let mut categories = self.write();
        let mut table = KeywordTable::default();
        for (name, entry) in categories.iter() {
            if !entry.keywords.is_empty() {
                table.insert(name.clone(), entry.keywords.clone());
            }
        }

        let mut moved = Vec::new();
        for (name, entry) in categories.iter_mut() {
            let (stay, go): (Vec<_>, Vec<_>) = entry.files.drain(..).partition(|f| {
                classify_by_filename(&f.name, &table).map_or(true, |target| target == name)
            });
            entry.files = stay;
            moved.extend(go);
        }

        let count = moved.len();
        for mut file in moved {
            if let Some(target) = classify_by_filename(&file.name, &table) {
                file.category = target.to_string();
                file.method = ClassificationMethod::ByName;
                if let Some(entry) = categories.get_mut(target) {
                    entry.files.push(file);
                }
            }
        }
        count
    }
}
