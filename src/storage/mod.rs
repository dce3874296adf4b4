mod in_memory;
mod local_fs;

pub use in_memory::InMemoryStore;
pub use local_fs::LocalDocumentStore;

use async_trait::async_trait;
use axum::body::Bytes;
use chrono::{DateTime, Utc};
use mime::Mime;
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, str::FromStr, sync::Arc};
use thiserror::Error;
use uuid::Uuid;

/// Per-record ceiling of the document collection.
pub const MAX_DOCUMENT_BYTES: usize = 16 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("document (de)serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("document of {size} bytes exceeds the {limit} byte record limit")]
    DocumentTooLarge { size: usize, limit: usize },
    #[error("invalid record: {0}")]
    InvalidRecord(&'static str),
    #[error("corrupt document {id}: {reason}")]
    Corrupt { id: FileId, reason: String },
    #[error("unsupported store url: {0}")]
    UnsupportedUrl(String),
}

/// Store-generated identifier of a [`StoredFile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(Uuid);

impl FileId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for FileId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A validated upload, ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewFile {
    original_name: String,
    content_type: Mime,
    payload: Bytes,
}

impl NewFile {
    pub fn new(
        original_name: impl Into<String>,
        content_type: Mime,
        payload: Bytes,
    ) -> Result<Self, StoreError> {
        let original_name = original_name.into();
        if original_name.trim().is_empty() {
            return Err(StoreError::InvalidRecord("original name is empty"));
        }
        if original_name.chars().any(char::is_control) {
            return Err(StoreError::InvalidRecord(
                "original name contains control characters",
            ));
        }
        if payload.len() > MAX_DOCUMENT_BYTES {
            return Err(StoreError::DocumentTooLarge {
                size: payload.len(),
                limit: MAX_DOCUMENT_BYTES,
            });
        }

        Ok(Self {
            original_name,
            content_type,
            payload,
        })
    }

    fn into_stored(self, id: FileId, uploaded_at: DateTime<Utc>) -> StoredFile {
        StoredFile {
            id,
            original_name: self.original_name,
            content_type: self.content_type,
            payload: self.payload,
            uploaded_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub id: FileId,
    pub original_name: String,
    pub content_type: Mime,
    pub payload: Bytes,
    pub uploaded_at: DateTime<Utc>,
}

impl StoredFile {
    pub fn summary(&self) -> FileSummary {
        FileSummary {
            id: self.id,
            original_name: self.original_name.clone(),
            content_type: self.content_type.to_string(),
            size: self.payload.len() as u64,
            uploaded_at: self.uploaded_at,
        }
    }
}

/// Listing projection of a [`StoredFile`]; never carries the payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSummary {
    pub id: FileId,
    pub original_name: String,
    pub content_type: String,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
}

/// Append-only document collection of uploaded files.
#[async_trait]
pub trait FileStore: Send + Sync + 'static {
    async fn insert(&self, file: NewFile) -> Result<StoredFile, StoreError>;
    async fn find(&self, id: FileId) -> Result<Option<StoredFile>, StoreError>;
    /// All records, most recent upload first.
    async fn list(&self) -> Result<Vec<FileSummary>, StoreError>;

    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Opens the store named by a `memory://` or `file://<dir>` connection string.
pub async fn connect(url: &str) -> Result<Arc<dyn FileStore>, StoreError> {
    if url == "memory://" {
        return Ok(Arc::new(InMemoryStore::new()));
    }

    match url.strip_prefix("file://") {
        Some(dir) if !dir.is_empty() => {
            let store = LocalDocumentStore::open(PathBuf::from(dir)).await?;
            Ok(Arc::new(store))
        }
        _ => Err(StoreError::UnsupportedUrl(url.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf() -> Mime {
        mime::APPLICATION_PDF
    }

    #[test]
    fn new_file_rejects_blank_name() {
        let err = NewFile::new("   ", pdf(), Bytes::from_static(b"%PDF")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord(_)));
    }

    #[test]
    fn new_file_rejects_control_characters_in_name() {
        let err = NewFile::new("a\nb.pdf", pdf(), Bytes::from_static(b"%PDF")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord(_)));
    }

    #[test]
    fn new_file_rejects_payload_over_record_limit() {
        let payload = Bytes::from(vec![0u8; MAX_DOCUMENT_BYTES + 1]);
        let err = NewFile::new("big.pdf", pdf(), payload).unwrap_err();
        assert!(matches!(
            err,
            StoreError::DocumentTooLarge { size, limit }
                if size == MAX_DOCUMENT_BYTES + 1 && limit == MAX_DOCUMENT_BYTES
        ));
    }

    #[test]
    fn summary_reports_size_without_payload() {
        let file = NewFile::new("report.pdf", pdf(), Bytes::from_static(b"%PDF-1.7"))
            .unwrap()
            .into_stored(FileId::generate(), Utc::now());
        let summary = file.summary();

        assert_eq!(summary.id, file.id);
        assert_eq!(summary.size, 8);
        assert_eq!(summary.content_type, "application/pdf");
    }

    #[test]
    fn file_id_parses_its_display_form() {
        let id = FileId::generate();
        assert_eq!(id.to_string().parse::<FileId>().unwrap(), id);
        assert!("not-a-uuid".parse::<FileId>().is_err());
    }

    #[tokio::test]
    async fn connect_selects_memory_store() {
        let store = connect("memory://").await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn connect_opens_directory_store() {
        let tmp = tempfile::TempDir::new().unwrap();
        let url = format!("file://{}", tmp.path().join("files").display());
        let store = connect(&url).await.unwrap();

        assert!(store.list().await.unwrap().is_empty());
        assert!(tmp.path().join("files").is_dir());
    }

    #[tokio::test]
    async fn connect_rejects_unknown_scheme() {
        let err = connect("mongodb://127.0.0.1:27017/files").await.err().unwrap();
        assert!(matches!(err, StoreError::UnsupportedUrl(_)));
    }
}
