//! Blob storage for uploaded resumes.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Largest accepted resume, in bytes.
pub const MAX_RESUME_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlobError {
    #[error("file is empty")]
    Empty,
    #[error("file exceeds {max} bytes")]
    TooLarge { max: usize },
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("blob storage error: {0}")]
    Storage(String),
}

impl BlobError {
    /// Whether the error is the uploader's fault rather than ours.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, BlobError::Storage(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeFormat {
    Pdf,
    Doc,
    Docx,
}

impl ResumeFormat {
    /// Infer the format from a client-supplied file name.
    pub fn from_filename(name: &str) -> Result<Self, BlobError> {
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.trim().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => Ok(Self::Pdf),
            "doc" => Ok(Self::Doc),
            "docx" => Ok(Self::Docx),
            _ => Err(BlobError::UnsupportedType(name.to_string())),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Doc => "doc",
            Self::Docx => "docx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Doc => "application/msword",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

/// A resume that passed size and type checks, with its storage key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeUpload {
    pub key: String,
    pub format: ResumeFormat,
}

impl ResumeUpload {
    pub fn validate(filename: &str, len: usize) -> Result<Self, BlobError> {
        if len == 0 {
            return Err(BlobError::Empty);
        }
        if len > MAX_RESUME_BYTES {
            return Err(BlobError::TooLarge { max: MAX_RESUME_BYTES });
        }
        let format = ResumeFormat::from_filename(filename)?;
        Ok(Self {
            key: format!("resumes/{}.{}", Uuid::now_v7(), format.extension()),
            format,
        })
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key` and return its public URL.
    async fn put(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> Result<String, BlobError>;
}

/// Filesystem-backed blob store serving files from a public base URL.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, BlobError> {
        let mut path = self.root.clone();
        for segment in key.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
                return Err(BlobError::Storage(format!("invalid blob key: {key}")));
            }
            path.push(segment);
        }
        Ok(path)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str, _content_type: &str, bytes: Vec<u8>) -> Result<String, BlobError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BlobError::Storage(format!("create {}: {e}", parent.display())))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| BlobError::Storage(format!("write {}: {e}", path.display())))?;
        tracing::debug!(key, path = %path.display(), "blob stored");
        Ok(format!("{}/{key}", self.public_base_url))
    }
}

/// In-memory blob store for tests.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, (String, Vec<u8>)>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content type and bytes stored under `key`.
    pub fn get(&self, key: &str) -> Option<(String, Vec<u8>)> {
        self.blobs.read().ok()?.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> Result<String, BlobError> {
        self.blobs
            .write()
            .map_err(|_| BlobError::Storage("blob map poisoned".into()))?
            .insert(key.to_string(), (content_type.to_string(), bytes));
        Ok(format!("memory://{key}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_resume_extensions_case_insensitively() {
        assert_eq!(ResumeFormat::from_filename("cv.PDF").unwrap(), ResumeFormat::Pdf);
        assert_eq!(ResumeFormat::from_filename("my.cv.docx").unwrap(), ResumeFormat::Docx);
        assert!(matches!(
            ResumeFormat::from_filename("cv.exe"),
            Err(BlobError::UnsupportedType(_))
        ));
        assert!(ResumeFormat::from_filename("resume").is_err());
    }

    #[test]
    fn size_limits() {
        assert_eq!(ResumeUpload::validate("cv.pdf", 0).unwrap_err(), BlobError::Empty);
        assert!(ResumeUpload::validate("cv.pdf", MAX_RESUME_BYTES).is_ok());
        assert_eq!(
            ResumeUpload::validate("cv.pdf", MAX_RESUME_BYTES + 1).unwrap_err(),
            BlobError::TooLarge { max: MAX_RESUME_BYTES }
        );
    }

    #[test]
    fn keys_are_unique_and_namespaced() {
        let a = ResumeUpload::validate("cv.doc", 10).unwrap();
        let b = ResumeUpload::validate("cv.doc", 10).unwrap();
        assert!(a.key.starts_with("resumes/") && a.key.ends_with(".doc"));
        assert_ne!(a.key, b.key);
    }

    #[tokio::test]
    async fn local_store_writes_file_and_returns_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "https://cdn.investi.com/uploads/");

        let url = store
            .put("resumes/abc.pdf", "application/pdf", b"%PDF-1.7".to_vec())
            .await
            .unwrap();

        assert_eq!(url, "https://cdn.investi.com/uploads/resumes/abc.pdf");
        let written = std::fs::read(dir.path().join("resumes/abc.pdf")).unwrap();
        assert_eq!(written, b"%PDF-1.7");
    }

    #[tokio::test]
    async fn local_store_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "/uploads");
        let err = store.put("../escape.pdf", "application/pdf", vec![1]).await.unwrap_err();
        assert!(!err.is_client_error());
    }
}
