//! Persisted embedding store.
//!
//! The store is a JSON document holding index-aligned `names` and
//! `embeddings` arrays. Names repeat when an identity has several images;
//! the set of distinct names is what the reconciler treats as "known".

use crate::types::Embedding;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store file not found: {0} — run `facesync init` to create an empty one")]
    NotFound(PathBuf),
    #[error("failed to read store {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("malformed store {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("malformed store {path}: {names} names but {embeddings} embeddings")]
    LengthMismatch {
        path: PathBuf,
        names: usize,
        embeddings: usize,
    },
    #[error("store already exists: {0}")]
    AlreadyExists(PathBuf),
    #[error("failed to write store {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to encode store: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Previously computed embeddings and the names they belong to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingStore {
    pub names: Vec<String>,
    pub embeddings: Vec<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl EmbeddingStore {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Distinct identity names present in the store.
    pub fn known_names(&self) -> BTreeSet<String> {
        self.names.iter().cloned().collect()
    }

    /// Append one embedding for `name`, keeping both arrays aligned.
    pub fn append(&mut self, name: &str, embedding: Embedding) {
        if self.model_version.is_none() {
            self.model_version = embedding.model_version;
        }
        self.names.push(name.to_string());
        self.embeddings.push(embedding.values);
    }
}

/// Read the store at `path`, returning it with its distinct names.
pub fn load_store(path: &Path) -> Result<(EmbeddingStore, BTreeSet<String>), StoreError> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => StoreError::NotFound(path.to_path_buf()),
        _ => StoreError::Read {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let store: EmbeddingStore =
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Malformed {
            path: path.to_path_buf(),
            source: e,
        })?;

    if store.names.len() != store.embeddings.len() {
        return Err(StoreError::LengthMismatch {
            path: path.to_path_buf(),
            names: store.names.len(),
            embeddings: store.embeddings.len(),
        });
    }

    let known = store.known_names();
    tracing::info!(
        path = %path.display(),
        entries = store.len(),
        identities = known.len(),
        "loaded embedding store"
    );

    Ok((store, known))
}

/// Write `store` to `path`, stamping `updated_at`.
///
/// The document is written to a sibling `.tmp` file and renamed into place so
/// a crash never leaves a truncated store behind.
pub fn save_store(path: &Path, store: &mut EmbeddingStore) -> Result<(), StoreError> {
    store.updated_at = Some(Utc::now());
    let encoded = serde_json::to_vec_pretty(store)?;

    let tmp = path.with_extension("json.tmp");
    let write_err = |e| StoreError::Write {
        path: path.to_path_buf(),
        source: e,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    std::fs::write(&tmp, encoded).map_err(write_err)?;
    std::fs::rename(&tmp, path).map_err(write_err)?;

    tracing::info!(path = %path.display(), entries = store.len(), "saved embedding store");
    Ok(())
}

/// Create an empty store at `path`. Refuses to clobber an existing file unless `force`.
pub fn init_store(path: &Path, force: bool) -> Result<EmbeddingStore, StoreError> {
    if path.exists() && !force {
        return Err(StoreError::AlreadyExists(path.to_path_buf()));
    }
    let mut store = EmbeddingStore::empty();
    save_store(path, &mut store)?;
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn emb(values: Vec<f32>) -> Embedding {
        Embedding { values, model_version: Some("test".into()) }
    }

    #[test]
    fn test_load_store_distinct_names() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("embeddings.json");
        std::fs::write(
            &path,
            r#"{"names": ["Alice", "Alice", "Bob"], "embeddings": [[1.0], [2.0], [3.0]]}"#,
        )
        .unwrap();

        let (store, known) = load_store(&path).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(known.len(), 2);
        assert!(known.contains("Alice"));
        assert!(known.contains("Bob"));
    }

    #[test]
    fn test_load_store_missing_file() {
        let dir = tempdir().unwrap();
        let err = load_store(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_load_store_without_names() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("embeddings.json");
        std::fs::write(&path, r#"{"embeddings": []}"#).unwrap();
        assert!(matches!(load_store(&path).unwrap_err(), StoreError::Malformed { .. }));
    }

    #[test]
    fn test_load_store_names_not_strings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("embeddings.json");
        std::fs::write(&path, r#"{"names": [1, 2], "embeddings": [[0.0], [0.0]]}"#).unwrap();
        assert!(matches!(load_store(&path).unwrap_err(), StoreError::Malformed { .. }));
    }

    #[test]
    fn test_load_store_garbage_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("embeddings.json");
        std::fs::write(&path, [0x80u8, 0x04, 0x95, 0x00]).unwrap();
        assert!(matches!(load_store(&path).unwrap_err(), StoreError::Malformed { .. }));
    }

    #[test]
    fn test_load_store_length_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("embeddings.json");
        std::fs::write(&path, r#"{"names": ["Alice", "Bob"], "embeddings": [[1.0]]}"#).unwrap();
        let err = load_store(&path).unwrap_err();
        assert!(matches!(
            err,
            StoreError::LengthMismatch { names: 2, embeddings: 1, .. }
        ));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("embeddings.json");

        let mut store = EmbeddingStore::empty();
        store.append("Alice", emb(vec![0.5, 0.5]));
        store.append("Alice", emb(vec![0.1, 0.9]));
        save_store(&path, &mut store).unwrap();

        let (loaded, known) = load_store(&path).unwrap();
        assert_eq!(loaded.names, vec!["Alice", "Alice"]);
        assert_eq!(loaded.embeddings, vec![vec![0.5, 0.5], vec![0.1, 0.9]]);
        assert_eq!(loaded.model_version.as_deref(), Some("test"));
        assert!(loaded.updated_at.is_some());
        assert_eq!(known.len(), 1);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_init_store_refuses_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("embeddings.json");

        init_store(&path, false).unwrap();
        assert!(matches!(
            init_store(&path, false).unwrap_err(),
            StoreError::AlreadyExists(_)
        ));
        init_store(&path, true).unwrap();

        let (store, known) = load_store(&path).unwrap();
        assert!(store.is_empty());
        assert!(known.is_empty());
    }
}
