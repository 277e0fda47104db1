use std::path::Path;

/// 上传文件的内容来源
#[derive(Debug, Clone)]
pub enum UploadSource {
    /// 尚未落盘的字节
    Bytes(Vec<u8>),
    /// 已经保存在上传目录中（重新扫描时使用），值为相对路径
    Stored(String),
}

/// 一个待处理的上传文件
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub source: UploadSource,
    pub size: u64,
    /// 客户端声明的 MIME 类型
    pub declared_type: Option<String>,
    /// 批次内分配的保存文件名，同批重名时带序号后缀
    pub(crate) stored_name: Option<String>,
}

impl UploadFile {
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            source: UploadSource::Bytes(bytes),
            declared_type: None,
            stored_name: None,
        }
    }

    pub fn stored(rel_path: impl Into<String>, size: u64) -> Self {
        let rel_path = rel_path.into();
        let name = Path::new(&rel_path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| rel_path.clone());
        Self {
            name,
            source: UploadSource::Stored(rel_path),
            size,
            declared_type: None,
            stored_name: None,
        }
    }

    pub fn with_declared_type(mut self, mime: impl Into<String>) -> Self {
        self.declared_type = Some(mime.into());
        self
    }
}
