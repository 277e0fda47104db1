//! 文件名关键词分类 - 业务能力层
//!
//! 纯函数：只看文件名，不做任何 I/O。分类名按字典序遍历，
//! 多个分类同时命中时取字典序最小的那个，保证同一张关键词表下结果可复现。

use std::collections::BTreeMap;

use crate::models::PREDEFINED_CATEGORIES;

/// 分类名 → 关键词列表（按分类名排序）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordTable {
    entries: BTreeMap<String, Vec<String>>,
}

impl KeywordTable {
    pub fn new(entries: BTreeMap<String, Vec<String>>) -> Self {
        Self { entries }
    }

    /// 内置的预定义分类关键词
    pub fn predefined() -> Self {
        let entries = PREDEFINED_CATEGORIES
            .iter()
            .map(|(name, keywords)| {
                (
                    name.to_string(),
                    keywords.iter().map(|k| k.to_string()).collect(),
                )
            })
            .collect();
        Self { entries }
    }

    pub fn keywords(&self, category: &str) -> Option<&[String]> {
        self.entries.get(category).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub(crate) fn insert(&mut self, category: String, keywords: Vec<String>) {
        self.entries.insert(category, keywords);
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<String>> {
        self.entries
    }
}

/// 根据文件名分类
///
/// 返回第一个关键词（忽略大小写）是文件名子串的分类；没有命中时返回 `None`，
/// 调用方据此进入内容分类。
pub fn classify_by_filename<'a>(filename: &str, table: &'a KeywordTable) -> Option<&'a str> {
    let lower_name = filename.to_lowercase();
    table
        .iter()
        .find(|(_, keywords)| {
            keywords
                .iter()
                .filter(|k| !k.is_empty())
                .any(|k| lower_name.contains(&k.to_lowercase()))
        })
        .map(|(category, _)| category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_chinese_keyword() {
        let table = KeywordTable::predefined();
        assert_eq!(classify_by_filename("合同_2024.pdf", &table), Some("合同"));
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        let table = KeywordTable::predefined();
        assert_eq!(classify_by_filename("RESUME_John.TXT", &table), Some("简历"));
        assert_eq!(classify_by_filename("Invoice-0042.xlsx", &table), Some("发票"));
    }

    #[test]
    fn test_no_match_is_none() {
        let table = KeywordTable::predefined();
        assert_eq!(classify_by_filename("notes.bin", &table), None);
        assert_eq!(classify_by_filename("", &table), None);
    }

    #[test]
    fn test_tie_break_is_lexicographic() {
        let mut entries = BTreeMap::new();
        entries.insert("b类".to_string(), vec!["shared".to_string()]);
        entries.insert("a类".to_string(), vec!["shared".to_string()]);
        let table = KeywordTable::new(entries);

        for _ in 0..10 {
            assert_eq!(classify_by_filename("shared.doc", &table), Some("a类"));
        }
    }

    #[test]
    fn test_empty_keyword_never_matches() {
        let mut entries = BTreeMap::new();
        entries.insert("空".to_string(), vec![String::new()]);
        let table = KeywordTable::new(entries);
        assert_eq!(classify_by_filename("anything.txt", &table), None);
    }
}
