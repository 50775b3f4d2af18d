//! Task shape and the named fixtures each scenario class runs with

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{E2eError, E2eResult};

const BUILTIN_FIXTURES: &str = include_str!("../fixtures/tasks.yaml");

/// A task as the API and the board see it.
///
/// `name` is the natural key for both UI and API lookups. Extra fields the
/// backend returns (ids, timestamps) are ignored when reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    #[serde(default)]
    pub is_done: bool,
}

impl Task {
    pub fn new(name: impl Into<String>, is_done: bool) -> Self {
        Self {
            name: name.into(),
            is_done,
        }
    }

    /// A task that has not been completed yet
    pub fn pending(name: impl Into<String>) -> Self {
        Self::new(name, false)
    }
}

/// One fixture per scenario class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskFixtures {
    /// Valid creation target
    pub success: Task,

    /// Seeded through the API, then created again through the UI
    pub duplicate: Task,

    /// Missing required field (empty name)
    pub required: Task,

    /// Toggle target
    pub update: Task,

    /// Deletion target
    pub delete: Task,
}

impl TaskFixtures {
    /// Fixtures shipped with the crate
    pub fn builtin() -> E2eResult<Self> {
        Self::from_yaml(BUILTIN_FIXTURES)
    }

    /// Parse fixtures from a YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        serde_yaml::from_str(yaml).map_err(E2eError::from)
    }

    /// Parse fixtures from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// All fixtures with their class name
    pub fn named(&self) -> [(&'static str, &Task); 5] {
        [
            ("success", &self.success),
            ("duplicate", &self.duplicate),
            ("required", &self.required),
            ("update", &self.update),
            ("delete", &self.delete),
        ]
    }

    /// Check the fixtures are safe to run concurrently against one backend.
    ///
    /// `required` must carry an empty name; every other class needs a
    /// non-empty name no other class uses.
    pub fn validate(&self) -> E2eResult<()> {
        if !self.required.name.is_empty() {
            return Err(E2eError::Fixture(format!(
                "required fixture must have an empty name, got '{}'",
                self.required.name
            )));
        }

        let mut seen: HashMap<&str, &str> = HashMap::new();
        for (class, task) in self.named() {
            if class == "required" {
                continue;
            }
            if task.name.is_empty() {
                return Err(E2eError::Fixture(format!("{class} fixture has an empty name")));
            }
            if let Some(other) = seen.insert(task.name.as_str(), class) {
                return Err(E2eError::Fixture(format!(
                    "{class} and {other} fixtures share the name '{}'",
                    task.name
                )));
            }
        }

        Ok(())
    }
}
