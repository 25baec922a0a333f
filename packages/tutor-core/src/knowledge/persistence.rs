use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::types::KnowledgeGraph;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage io error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("storage unavailable")]
    Unavailable,
}

/// Key-value backend holding one serialized graph per session key.
pub trait KnowledgeStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn save(&self, key: &str, value: &str) -> Result<(), PersistenceError>;
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}

/// One JSON file per key under a data directory.
pub struct FileKnowledgeStore {
    dir: PathBuf,
}

impl FileKnowledgeStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }
}

impl KnowledgeStore for FileKnowledgeStore {
    fn load(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-process store. `set_failing(true)` makes every write fail, which is how
/// tests exercise an unavailable backend.
#[derive(Default)]
pub struct MemoryKnowledgeStore {
    entries: Mutex<HashMap<String, String>>,
    failing: AtomicBool,
}

impl MemoryKnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn insert_raw(&self, key: &str, value: &str) {
        self.entries.lock().insert(key.to_string(), value.to_string());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn check(&self) -> Result<(), PersistenceError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(PersistenceError::Unavailable)
        } else {
            Ok(())
        }
    }
}

impl KnowledgeStore for MemoryKnowledgeStore {
    fn load(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.raw(key))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.check()?;
        self.insert_raw(key, value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.check()?;
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Reads the graph for `key`. Absent, unreadable and corrupt entries all
/// yield an empty graph.
pub fn load_graph(store: &dyn KnowledgeStore, key: &str) -> KnowledgeGraph {
    let raw = match store.load(key) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!(key, error = %err, "knowledge graph load failed, starting empty");
            None
        }
    };

    let Some(raw) = raw else {
        return KnowledgeGraph::default();
    };

    match serde_json::from_str::<KnowledgeGraph>(&raw) {
        Ok(graph) => graph.normalized(),
        Err(err) => {
            tracing::warn!(key, error = %err, "stored knowledge graph is corrupt, starting empty");
            KnowledgeGraph::default()
        }
    }
}

/// Best-effort write. The in-memory graph stays authoritative when this fails.
pub fn persist_graph(store: &dyn KnowledgeStore, key: &str, graph: &KnowledgeGraph) -> bool {
    let result = serde_json::to_string(graph)
        .map_err(PersistenceError::from)
        .and_then(|json| store.save(key, &json));
    match result {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(key, error = %err, "knowledge graph persist failed");
            false
        }
    }
}

pub fn clear_graph(store: &dyn KnowledgeStore, key: &str) -> bool {
    match store.remove(key) {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(key, error = %err, "knowledge graph clear failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::types::TopicState;

    fn sample_graph() -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::default();
        graph.topics.insert("limits".into(), TopicState::default());
        graph.weak_nodes.insert("epsilon-delta".into());
        graph.session_stats.total_attempts = 4;
        graph
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryKnowledgeStore::new();
        assert!(persist_graph(&store, "s1", &sample_graph()));
        assert_eq!(load_graph(&store, "s1"), sample_graph());
        assert!(load_graph(&store, "other").is_empty());
    }

    #[test]
    fn test_corrupt_entry_loads_empty() {
        let store = MemoryKnowledgeStore::new();
        store.insert_raw("s1", "{not json");
        assert!(load_graph(&store, "s1").is_empty());
    }

    #[test]
    fn test_failing_store_reports_false() {
        let store = MemoryKnowledgeStore::new();
        store.set_failing(true);
        assert!(!persist_graph(&store, "s1", &sample_graph()));
        assert!(!clear_graph(&store, "s1"));
        assert!(store.raw("s1").is_none());
    }

    #[test]
    fn test_file_names_are_hashed_keys() {
        let store = FileKnowledgeStore::new("/tmp/tutor");
        let path = store.path_for("alice");
        let name = path.file_name().unwrap().to_str().unwrap();
        assert_eq!(name.len(), 64 + ".json".len());
        assert!(name.ends_with(".json"));
        assert_ne!(store.path_for("alice"), store.path_for("bob"));
        assert_eq!(store.path_for("alice"), path);
    }

    #[test]
    fn test_file_store_roundtrip_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKnowledgeStore::new(dir.path().join("nested"));
        assert!(load_graph(&store, "s1").is_empty());
        assert!(persist_graph(&store, "s1", &sample_graph()));
        assert_eq!(load_graph(&store, "s1"), sample_graph());
        assert!(clear_graph(&store, "s1"));
        assert!(load_graph(&store, "s1").is_empty());
        assert!(clear_graph(&store, "s1"));
    }
}
