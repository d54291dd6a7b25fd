//! JSON-file-backed publication history.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use rookery_core::error::{Result, RookeryError};
use rookery_core::history::HistoryRepository;

use crate::storage::AtomicJsonFile;

/// Persists the ordered list of published texts to `history.json` as a JSON
/// array, rewritten in full on every append.
pub struct JsonHistoryRepository {
    file: Arc<AtomicJsonFile<Vec<String>>>,
}

impl JsonHistoryRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: Arc::new(AtomicJsonFile::new(path)),
        }
    }

    async fn with_file<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&AtomicJsonFile<Vec<String>>) -> Result<R> + Send + 'static,
    {
        let file = self.file.clone();
        tokio::task::spawn_blocking(move || f(&file))
            .await
            .map_err(|e| RookeryError::internal(format!("storage task join failed: {e}")))?
    }
}

#[async_trait]
impl HistoryRepository for JsonHistoryRepository {
    async fn append(&self, text: String) -> Result<()> {
        self.with_file(move |file| {
            file.update(Vec::new(), |history| {
                history.push(text);
                Ok(())
            })
        })
        .await
    }

    async fn recent(&self, n: usize) -> Result<Vec<String>> {
        self.with_file(move |file| {
            let history = file.load()?.unwrap_or_default();
            let start = history.len().saturating_sub(n);
            Ok(history[start..].to_vec())
        })
        .await
    }

    async fn load_all(&self) -> Result<Vec<String>> {
        self.with_file(|file| Ok(file.load()?.unwrap_or_default()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn history_round_trips_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("history.json");

        let repo = JsonHistoryRepository::new(path.clone());
        let texts = ["first post", "second post", "third post"];
        for text in texts {
            repo.append(text.to_string()).await.unwrap();
        }

        // Reload through a fresh instance: same entries, same order.
        let reopened = JsonHistoryRepository::new(path);
        let all = reopened.load_all().await.unwrap();
        assert_eq!(all, texts);
    }

    #[tokio::test]
    async fn recent_returns_the_tail_oldest_first() {
        let temp_dir = TempDir::new().unwrap();
        let repo = JsonHistoryRepository::new(temp_dir.path().join("history.json"));

        for i in 1..=5 {
            repo.append(format!("post {i}")).await.unwrap();
        }

        let recent = repo.recent(3).await.unwrap();
        assert_eq!(recent, ["post 3", "post 4", "post 5"]);
    }

    #[tokio::test]
    async fn recent_on_an_empty_history_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let repo = JsonHistoryRepository::new(temp_dir.path().join("history.json"));
        assert!(repo.recent(3).await.unwrap().is_empty());
    }
}
