//! Best-effort storage of a learner's progress.

use common::model::level::LevelId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The fixed key progress is stored under.
pub const STATE_NAMESPACE: &str = "codequest";

/// The serialized form of [`RunState`](crate::state::RunState).
///
/// Every field is defaulted, so a partial or older record still loads.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct StateSnapshot {
    pub score: u32,
    pub badges: Vec<String>,
    pub attempts: BTreeMap<LevelId, u32>,
    pub completed: Vec<LevelId>,
    pub all_complete_shown: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unable to access the state file: {0}")]
    Io(#[from] std::io::Error),
    #[error("the state file is corrupted: {0}")]
    Serde(#[from] serde_json::Error),
}

pub trait StateStore {
    /// Returns the stored snapshot, or `None` if nothing was stored yet.
    fn load(&self) -> Result<Option<StateSnapshot>, StoreError>;
    fn save(&mut self, snapshot: &StateSnapshot) -> Result<(), StoreError>;
    /// Erases the stored snapshot.
    fn clear(&mut self) -> Result<(), StoreError>;
}

/// Stores the snapshot as JSON in `<dir>/codequest.json`.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{STATE_NAMESPACE}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> Result<Option<StateSnapshot>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&mut self, snapshot: &StateSnapshot) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string(snapshot)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Keeps the snapshot in memory. Used when no state directory is configured and in tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    snapshot: Option<StateSnapshot>,
    saves: usize,
}

impl MemoryStateStore {
    pub fn with_snapshot(snapshot: StateSnapshot) -> Self {
        Self {
            snapshot: Some(snapshot),
            saves: 0,
        }
    }

    pub fn snapshot(&self) -> Option<&StateSnapshot> {
        self.snapshot.as_ref()
    }

    /// The number of times a snapshot was saved.
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<Option<StateSnapshot>, StoreError> {
        Ok(self.snapshot.clone())
    }

    fn save(&mut self, snapshot: &StateSnapshot) -> Result<(), StoreError> {
        self.snapshot = Some(snapshot.clone());
        self.saves += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.snapshot = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot() -> StateSnapshot {
        StateSnapshot {
            score: 25,
            badges: vec!["Completed Say Hello".to_string()],
            attempts: BTreeMap::from([(1, 0), (2, 3)]),
            completed: vec![1],
            all_complete_shown: false,
        }
    }

    #[test]
    fn snapshot_wire_format() {
        assert_eq!(
            serde_json::to_value(snapshot()).unwrap(),
            json!({
                "score": 25,
                "badges": ["Completed Say Hello"],
                "attempts": {"1": 0, "2": 3},
                "completed": [1],
                "allCompleteShown": false
            })
        );
    }

    #[test]
    fn partial_snapshot_loads() {
        let partial: StateSnapshot =
            serde_json::from_str(r#"{"score": 5, "attempts": {"4": 1}}"#).unwrap();
        assert_eq!(partial.score, 5);
        assert_eq!(partial.attempts.get(&4), Some(&1));
        assert!(partial.badges.is_empty());
        assert!(!partial.all_complete_shown);
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStateStore::new(dir.path().join("nested"));
        assert!(store.path().ends_with("codequest.json"));
        assert!(store.load().unwrap().is_none());

        store.save(&snapshot()).unwrap();
        assert_eq!(store.load().unwrap(), Some(snapshot()));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // Clearing twice is not an error.
        store.clear().unwrap();
    }

    #[test]
    fn file_store_reports_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path());
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(store.load(), Err(StoreError::Serde(_))));
    }

    #[test]
    fn memory_store_counts_saves() {
        let mut store = MemoryStateStore::default();
        store.save(&snapshot()).unwrap();
        store.save(&snapshot()).unwrap();
        assert_eq!(store.saves(), 2);
        assert_eq!(store.snapshot(), Some(&snapshot()));
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
