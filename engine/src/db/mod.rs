//! JSON document persistence
//!
//! This module provides the document stores backing the user registry and
//! the per-chat conversation state. Each store owns a single JSON document
//! on disk behind an async mutex: readers take a snapshot, writers mutate
//! and persist under the lock, so concurrent chat handlers serialize on a
//! single writer instead of racing whole-document read-modify-write cycles.

use crate::errors::BotError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

pub mod registry;
pub mod state;

// Re-export commonly used types
pub use registry::{Registry, UserRecord, PAGE_SIZE};
pub use state::{chat_key, ChatSession, ChatState, Sessions};

/// A single JSON document persisted at a fixed path.
///
/// The in-memory value is the source of truth while the process runs;
/// every mutation is written back before the lock is released.
pub struct DocumentStore<T> {
    path: PathBuf,
    value: Mutex<T>,
}

impl<T> DocumentStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Open the document at `path`, creating parent directories as needed.
    ///
    /// A missing file yields the type's default value; it is materialized
    /// on the first mutation.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, BotError> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let value = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No document at {}, starting empty", path.display());
                T::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            value: Mutex::new(value),
        })
    }

    /// Read from the document under the lock.
    pub async fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.value.lock().await;
        f(&guard)
    }

    /// Mutate the document and persist it before releasing the lock.
    pub async fn mutate<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, BotError> {
        let mut guard = self.value.lock().await;
        let out = f(&mut guard);

        let json = serde_json::to_string_pretty(&*guard)?;
        tokio::fs::write(&self.path, json).await?;

        Ok(out)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_open_missing_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store: DocumentStore<BTreeMap<String, u32>> =
            DocumentStore::open(dir.path().join("doc.json")).await.unwrap();

        let len = store.read(|doc| doc.len()).await;
        assert_eq!(len, 0);
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_mutate_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");

        let store: DocumentStore<BTreeMap<String, u32>> =
            DocumentStore::open(&path).await.unwrap();
        store
            .mutate(|doc| {
                doc.insert("a".to_string(), 1);
            })
            .await
            .unwrap();

        // A fresh store sees the persisted value
        let reopened: DocumentStore<BTreeMap<String, u32>> =
            DocumentStore::open(&path).await.unwrap();
        let value = reopened.read(|doc| doc.get("a").copied()).await;
        assert_eq!(value, Some(1));
    }

    #[tokio::test]
    async fn test_mutate_returns_closure_result() {
        let dir = tempfile::tempdir().unwrap();
        let store: DocumentStore<BTreeMap<String, u32>> =
            DocumentStore::open(dir.path().join("doc.json")).await.unwrap();

        let previous = store
            .mutate(|doc| doc.insert("a".to_string(), 2))
            .await
            .unwrap();
        assert_eq!(previous, None);

        let previous = store
            .mutate(|doc| doc.insert("a".to_string(), 3))
            .await
            .unwrap();
        assert_eq!(previous, Some(2));
    }
}
