use super::*;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

const DOCUMENT_EXT: &str = "json";
const PAYLOAD_EXT: &str = "bin";
const TMP_EXT: &str = "tmp";

/// Metadata document persisted as `<id>.json`.
#[derive(Debug, Serialize, Deserialize)]
struct FileDocument {
    id: FileId,
    original_name: String,
    content_type: String,
    size: u64,
    uploaded_at: DateTime<Utc>,
}

impl From<&FileDocument> for FileSummary {
    fn from(doc: &FileDocument) -> Self {
        FileSummary {
            id: doc.id,
            original_name: doc.original_name.clone(),
            content_type: doc.content_type.clone(),
            size: doc.size,
            uploaded_at: doc.uploaded_at,
        }
    }
}

/// Document collection kept in a single directory.
///
/// Each record is a `<id>.json` metadata document plus a `<id>.bin` payload.
/// The payload is written first and the document last, both through a
/// temp file and rename, so a record is visible only once it is complete.
pub struct LocalDocumentStore {
    root: PathBuf,
}

impl LocalDocumentStore {
    pub async fn open(root: PathBuf) -> Result<Self, StoreError> {
        fs::create_dir_all(&root).await?;

        let mut swept = 0usize;
        let mut entries = fs::read_dir(&root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == TMP_EXT) {
                fs::remove_file(&path).await?;
                swept += 1;
            }
        }

        tracing::info!(root = %root.display(), swept, "opened document store");
        Ok(Self { root })
    }

    fn document_path(&self, id: FileId) -> PathBuf {
        self.root.join(format!("{id}.{DOCUMENT_EXT}"))
    }

    fn payload_path(&self, id: FileId) -> PathBuf {
        self.root.join(format!("{id}.{PAYLOAD_EXT}"))
    }

    async fn read_document(path: &Path) -> Result<Option<FileDocument>, StoreError> {
        match fs::read(path).await {
            Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".");
    tmp.push(TMP_EXT);
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

#[async_trait]
impl FileStore for LocalDocumentStore {
    async fn insert(&self, file: NewFile) -> Result<StoredFile, StoreError> {
        let stored = file.into_stored(FileId::generate(), Utc::now());
        let doc = FileDocument {
            id: stored.id,
            original_name: stored.original_name.clone(),
            content_type: stored.content_type.to_string(),
            size: stored.payload.len() as u64,
            uploaded_at: stored.uploaded_at,
        };

        let payload_path = self.payload_path(stored.id);
        write_atomic(&payload_path, &stored.payload).await?;

        let written = match serde_json::to_vec_pretty(&doc) {
            Ok(raw) => write_atomic(&self.document_path(stored.id), &raw).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = written {
            let _ = fs::remove_file(&payload_path).await;
            return Err(e);
        }

        Ok(stored)
    }

    async fn find(&self, id: FileId) -> Result<Option<StoredFile>, StoreError> {
        let Some(doc) = Self::read_document(&self.document_path(id)).await? else {
            return Ok(None);
        };

        let content_type: Mime = doc.content_type.parse().map_err(|_| StoreError::Corrupt {
            id,
            reason: format!("unparseable content type {:?}", doc.content_type),
        })?;

        let payload = match fs::read(self.payload_path(id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::Corrupt {
                    id,
                    reason: "payload missing".to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        if payload.len() as u64 != doc.size {
            return Err(StoreError::Corrupt {
                id,
                reason: format!("payload is {} bytes, document says {}", payload.len(), doc.size),
            });
        }

        Ok(Some(StoredFile {
            id: doc.id,
            original_name: doc.original_name,
            content_type,
            payload: Bytes::from(payload),
            uploaded_at: doc.uploaded_at,
        }))
    }

    async fn list(&self) -> Result<Vec<FileSummary>, StoreError> {
        let mut entries = fs::read_dir(&self.root).await?;
        let mut summaries = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == DOCUMENT_EXT) {
                continue;
            }

            match Self::read_document(&path).await {
                Ok(Some(doc)) => summaries.push(FileSummary::from(&doc)),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable document");
                }
            }
        }

        summaries.sort_by(|a, b| {
            b.uploaded_at
                .cmp(&a.uploaded_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(summaries)
    }

    async fn close(&self) -> Result<(), StoreError> {
        tracing::info!(root = %self.root.display(), "closed document store");
        Ok(())
    }
}
