use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type LevelId = u32;

/// The `testCode` value meaning "no automated test, only show the output".
pub const NO_TEST_SENTINEL: &str = "null";

fn no_test() -> String {
    NO_TEST_SENTINEL.to_string()
}

/// One unit of the curriculum, as it is exposed by a levels file.
#[derive(Clone, Deserialize, Debug, Serialize, Builder, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    pub id: LevelId,
    pub title: String,
    #[serde(default)]
    #[builder(default)]
    pub description: String,
    #[serde(default)]
    #[builder(default)]
    pub starter_code: String,
    /// The source of a zero-argument predicate, or [`NO_TEST_SENTINEL`].
    #[serde(default = "no_test")]
    #[builder(default = "no_test()")]
    pub test_code: String,
    #[serde(default)]
    #[builder(default)]
    pub hint: Option<String>,
    #[serde(default)]
    #[builder(default)]
    pub solution: Option<String>,
    #[serde(default)]
    #[builder(default)]
    pub points: u32,
}

impl Level {
    /// The name of the badge unlocked by completing this level.
    pub fn badge_name(&self) -> String {
        format!("Completed {}", self.title)
    }

    /// The hint, if the level has a non-empty one.
    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref().filter(|h| !h.trim().is_empty())
    }

    /// The solution, if the level has a non-empty one.
    pub fn solution(&self) -> Option<&str> {
        self.solution.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// The level used when no levels file could be loaded.
    pub fn quick_test() -> Self {
        Self {
            id: 0,
            title: "Quick Test".to_string(),
            description: "Quick test mode, use console.log to see output".to_string(),
            starter_code: "// type JS here and press Run".to_string(),
            test_code: no_test(),
            hint: None,
            solution: None,
            points: 0,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.id, self.title)
    }
}
