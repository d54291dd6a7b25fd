//! JSON-file-backed pending-draft repository.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use rookery_core::draft::model::Draft;
use rookery_core::draft::repository::PendingDraftRepository;
use rookery_core::error::{Result, RookeryError};

use crate::storage::AtomicJsonFile;

/// Persists the full id → draft map to `pending_drafts.json` on every
/// mutation. Volume is single-digit drafts, so full-document rewrites are
/// the simplest correct option.
pub struct JsonDraftRepository {
    file: Arc<AtomicJsonFile<HashMap<String, Draft>>>,
}

impl JsonDraftRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: Arc::new(AtomicJsonFile::new(path)),
        }
    }

    async fn with_file<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&AtomicJsonFile<HashMap<String, Draft>>) -> Result<R> + Send + 'static,
    {
        let file = self.file.clone();
        tokio::task::spawn_blocking(move || f(&file))
            .await
            .map_err(|e| RookeryError::internal(format!("storage task join failed: {e}")))?
    }
}

#[async_trait]
impl PendingDraftRepository for JsonDraftRepository {
    async fn put(&self, draft: Draft) -> Result<()> {
        self.with_file(move |file| {
            file.update(HashMap::new(), |drafts| {
                drafts.insert(draft.id.clone(), draft);
                Ok(())
            })
        })
        .await
    }

    async fn get(&self, id: &str) -> Result<Option<Draft>> {
        let id = id.to_string();
        self.with_file(move |file| Ok(file.load()?.and_then(|drafts| drafts.get(&id).cloned())))
            .await
    }

    async fn remove(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.with_file(move |file| {
            file.update(HashMap::new(), |drafts| {
                // Removing a missing id is a no-op by contract.
                drafts.remove(&id);
                Ok(())
            })
        })
        .await
    }

    async fn load_all(&self) -> Result<HashMap<String, Draft>> {
        self.with_file(|file| Ok(file.load()?.unwrap_or_default()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo(temp_dir: &TempDir) -> JsonDraftRepository {
        JsonDraftRepository::new(temp_dir.path().join("pending_drafts.json"))
    }

    #[tokio::test]
    async fn put_get_remove_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);

        let draft = Draft::new("hello", "/tmp/a.png");
        repo.put(draft.clone()).await.unwrap();

        let loaded = repo.get(&draft.id).await.unwrap().unwrap();
        assert_eq!(loaded, draft);

        repo.remove(&draft.id).await.unwrap();
        assert!(repo.get(&draft.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn removing_a_missing_id_is_a_no_op() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);
        repo.remove("never-existed").await.unwrap();
    }

    #[tokio::test]
    async fn put_replaces_an_existing_draft() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);

        let mut draft = Draft::new("original", "/tmp/a.png");
        repo.put(draft.clone()).await.unwrap();

        draft.text = "edited".to_string();
        repo.put(draft.clone()).await.unwrap();

        let loaded = repo.get(&draft.id).await.unwrap().unwrap();
        assert_eq!(loaded.text, "edited");
    }

    #[tokio::test]
    async fn drafts_survive_a_new_repository_instance() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pending_drafts.json");

        let draft = Draft::new("durable", "/tmp/a.png");
        JsonDraftRepository::new(path.clone())
            .put(draft.clone())
            .await
            .unwrap();

        let reopened = JsonDraftRepository::new(path);
        let all = reopened.load_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all.get(&draft.id), Some(&draft));
    }
}
