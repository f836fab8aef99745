use common::model::level::{Level, LevelId};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::{Path, PathBuf};

/// The message shown when the level source could not be loaded.
pub const FALLBACK_WARNING: &str = "Warning: could not load levels. Running in Quick Test mode.";

#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error("unable to read `{path}`: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid JSON levels file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid YAML levels file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("level id {0} is used more than once")]
    DuplicateId(LevelId),
    #[error("the levels file contains no levels")]
    Empty,
}

/// The loaded curriculum, ordered by ascending level id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelRegistry {
    levels: BTreeMap<LevelId, Level>,
}

impl LevelRegistry {
    pub fn new(levels: Vec<Level>) -> Result<Self, LevelError> {
        if levels.is_empty() {
            return Err(LevelError::Empty);
        }
        let mut by_id = BTreeMap::new();
        for level in levels {
            let id = level.id;
            if by_id.insert(id, level).is_some() {
                return Err(LevelError::DuplicateId(id));
            }
        }
        Ok(Self { levels: by_id })
    }

    /// The registry holding only [`Level::quick_test`].
    pub fn quick_test() -> Self {
        let level = Level::quick_test();
        Self {
            levels: BTreeMap::from([(level.id, level)]),
        }
    }

    pub fn get(&self, id: LevelId) -> Option<&Level> {
        self.levels.get(&id)
    }

    pub fn first(&self) -> Option<&Level> {
        self.levels.values().next()
    }

    /// The level with the smallest id greater than `id`.
    pub fn next_after(&self, id: LevelId) -> Option<&Level> {
        self.levels
            .range((Bound::Excluded(id), Bound::Unbounded))
            .next()
            .map(|(_, level)| level)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Level> {
        self.levels.values()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// Reads a levels file. Files ending in `.yaml` or `.yml` are read as YAML, anything else as JSON.
pub fn read_levels(path: &Path) -> Result<Vec<Level>, LevelError> {
    let content = std::fs::read_to_string(path).map_err(|source| LevelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    if is_yaml {
        Ok(serde_yaml::from_str(&content)?)
    } else {
        Ok(serde_json::from_str(&content)?)
    }
}

#[derive(Debug, Clone)]
pub struct LoadedLevels {
    pub registry: LevelRegistry,
    /// Set when the level source failed and the Quick Test level is used instead.
    pub warning: Option<String>,
}

/// Loads the levels at `path`, falling back to the Quick Test level if they can't be used.
pub fn load_or_fallback(path: &Path) -> LoadedLevels {
    match read_levels(path).and_then(LevelRegistry::new) {
        Ok(registry) => {
            tracing::info!("loaded {} levels from {}", registry.len(), path.display());
            LoadedLevels {
                registry,
                warning: None,
            }
        }
        Err(err) => {
            tracing::warn!("failed to load levels: {err}");
            LoadedLevels {
                registry: LevelRegistry::quick_test(),
                warning: Some(FALLBACK_WARNING.to_string()),
            }
        }
    }
}
