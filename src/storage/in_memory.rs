use super::*;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Process-local collection; contents vanish with the process.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    files: Arc<RwLock<Vec<StoredFile>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileStore for InMemoryStore {
    async fn insert(&self, file: NewFile) -> Result<StoredFile, StoreError> {
        let stored = file.into_stored(FileId::generate(), Utc::now());
        self.files.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn find(&self, id: FileId) -> Result<Option<StoredFile>, StoreError> {
        Ok(self
            .files
            .read()
            .await
            .iter()
            .find(|file| file.id == id)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<FileSummary>, StoreError> {
        // newest insert first, then a stable sort keeps that order on equal timestamps
        let mut summaries: Vec<FileSummary> = self
            .files
            .read()
            .await
            .iter()
            .rev()
            .map(StoredFile::summary)
            .collect();
        summaries.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(summaries)
    }
}
