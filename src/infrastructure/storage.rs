//! 本地文件存储
//!
//! 所有路径都以上传目录为根，对外只暴露相对路径（使用 `/` 分隔），
//! 相对路径同时也是分类注册表中文件的标识。

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::error::StorageError;

/// 本地上传目录
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    max_file_size: u64,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, max_file_size: u64) -> Self {
        Self {
            root: root.into(),
            max_file_size,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 保存上传的字节，返回相对路径
    ///
    /// 文件名只保留最后一级，与上一批次同名的文件会被覆盖；
    /// 同一批次内的重名由 [`NameReservation`] 事先错开。
    pub async fn save(&self, name: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let file_name = sanitize_file_name(name)?;
        let size = bytes.len() as u64;
        if size > self.max_file_size {
            return Err(StorageError::TooLarge {
                name: file_name,
                size,
                limit: self.max_file_size,
            });
        }

        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| StorageError::SaveFailed {
                path: self.root.clone(),
                source,
            })?;

        let full_path = self.root.join(&file_name);
        fs::write(&full_path, bytes)
            .await
            .map_err(|source| StorageError::SaveFailed {
                path: full_path.clone(),
                source,
            })?;

        debug!("已保存 {} ({} 字节)", full_path.display(), size);
        Ok(file_name)
    }

    /// 把相对路径解析为上传目录内的绝对位置，拒绝越界路径
    pub fn resolve(&self, rel_path: &str) -> Result<PathBuf, StorageError> {
        let invalid = || StorageError::InvalidPath {
            path: rel_path.to_string(),
        };
        if rel_path.trim().is_empty() {
            return Err(invalid());
        }

        let mut resolved = self.root.clone();
        let mut has_normal = false;
        for component in Path::new(rel_path).components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    has_normal = true;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(invalid())
                }
            }
        }
        if !has_normal {
            return Err(invalid());
        }
        Ok(resolved)
    }

    /// 删除文件，返回删除前文件是否存在
    ///
    /// 文件不存在不视为错误。
    pub async fn delete(&self, rel_path: &str) -> Result<bool, StorageError> {
        let full_path = self.resolve(rel_path)?;
        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StorageError::DeleteFailed {
                path: full_path,
                source,
            }),
        }
    }

    /// 递归列出上传目录中的所有文件：(相对路径, 大小)
    ///
    /// 目录不存在时返回空列表。
    pub async fn list(&self) -> Result<Vec<(String, u64)>, StorageError> {
        let mut files = Vec::new();
        if fs::metadata(&self.root).await.is_err() {
            return Ok(files);
        }

        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let read_err = |source| StorageError::ListFailed {
                path: dir.clone(),
                source,
            };
            let mut entries = fs::read_dir(&dir).await.map_err(read_err)?;
            while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
                let path = entry.path();
                let metadata = entry.metadata().await.map_err(read_err)?;
                if metadata.is_dir() {
                    pending.push(path);
                } else if let Some(rel) = self.relative(&path) {
                    files.push((rel, metadata.len()));
                }
            }
        }

        files.sort();
        Ok(files)
    }

    fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("/"))
        }
    }
}

/// 一个批次内的保存文件名分配
///
/// 首次出现的文件名原样保留，之后的重名依次追加 `_1`、`_2` ... 后缀（在扩展名之前）。
#[derive(Debug, Default)]
pub struct NameReservation {
    taken: HashSet<String>,
}

impl NameReservation {
    pub fn reserve(&mut self, name: &str) -> Result<String, StorageError> {
        let file_name = sanitize_file_name(name)?;
        if self.taken.insert(file_name.clone()) {
            return Ok(file_name);
        }

        let (stem, ext) = match file_name.rfind('.') {
            Some(idx) if idx > 0 => file_name.split_at(idx),
            _ => (file_name.as_str(), ""),
        };
        let mut n = 1;
        loop {
            let candidate = format!("{}_{}{}", stem, n, ext);
            if self.taken.insert(candidate.clone()) {
                return Ok(candidate);
            }
            n += 1;
        }
    }
}

/// 只保留文件名的最后一级
fn sanitize_file_name(name: &str) -> Result<String, StorageError> {
    let normalized = name.replace('\\', "/");
    let file_name = normalized
        .rsplit('/')
        .next()
        .map(str::trim)
        .unwrap_or_default();
    if file_name.is_empty() || file_name == "." || file_name == ".." {
        return Err(StorageError::InvalidPath {
            path: name.to_string(),
        });
    }
    Ok(file_name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(dir: &tempfile::TempDir) -> LocalStorage {
        LocalStorage::new(dir.path().join("uploads"), 1024)
    }

    #[tokio::test]
    async fn test_save_strips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);

        let rel = storage.save("../../etc/合同_2024.pdf", b"abc").await.unwrap();
        assert_eq!(rel, "合同_2024.pdf");
        assert!(dir.path().join("uploads/合同_2024.pdf").exists());
    }

    #[tokio::test]
    async fn test_save_rejects_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);

        let err = storage.save("big.bin", &vec![0u8; 2048]).await.unwrap_err();
        assert!(matches!(err, StorageError::TooLarge { size: 2048, .. }));
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let storage = LocalStorage::new("/srv/uploads", 1024);
        assert!(storage.resolve("../secret").is_err());
        assert!(storage.resolve("/etc/passwd").is_err());
        assert!(storage.resolve("").is_err());
        assert_eq!(
            storage.resolve("a/b.txt").unwrap(),
            PathBuf::from("/srv/uploads/a/b.txt")
        );
    }

    #[tokio::test]
    async fn test_delete_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);

        let rel = storage.save("notes.txt", b"hello").await.unwrap();
        assert!(storage.delete(&rel).await.unwrap());
        assert!(!storage.delete(&rel).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_walks_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);
        storage.save("a.txt", b"1").await.unwrap();
        std::fs::create_dir_all(dir.path().join("uploads/sub")).unwrap();
        std::fs::write(dir.path().join("uploads/sub/b.txt"), b"22").unwrap();

        let files = storage.list().await.unwrap();
        assert_eq!(
            files,
            vec![("a.txt".to_string(), 1), ("sub/b.txt".to_string(), 2)]
        );
    }

    #[test]
    fn test_name_reservation_suffixes_duplicates() {
        let mut names = NameReservation::default();
        assert_eq!(names.reserve("report.txt").unwrap(), "report.txt");
        assert_eq!(names.reserve("dir/report.txt").unwrap(), "report_1.txt");
        assert_eq!(names.reserve("report_1.txt").unwrap(), "report_1_1.txt");
        assert_eq!(names.reserve("report.txt").unwrap(), "report_2.txt");
        assert_eq!(names.reserve("README").unwrap(), "README");
        assert_eq!(names.reserve("README").unwrap(), "README_1");
        assert_eq!(names.reserve(".env").unwrap(), ".env");
        assert_eq!(names.reserve(".env").unwrap(), ".env_1");
        assert!(names.reserve("../").is_err());
    }

    #[tokio::test]
    async fn test_list_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);
        assert!(storage.list().await.unwrap().is_empty());
    }
}
