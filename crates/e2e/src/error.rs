//! Error types for the task board harness

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Seeding task '{name}' failed with status {status}: {body}")]
    Seeding {
        name: String,
        status: u16,
        body: String,
    },

    #[error("Service at {url} not ready after {attempts} attempts")]
    ServiceUnavailable { url: String, attempts: usize },

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Bridge protocol error: {0}")]
    Bridge(String),

    #[error("No task row named '{0}'")]
    RowNotFound(String),

    #[error("Expected {expectation}: expected {expected:?}, observed {observed:?}")]
    AssertionFailed {
        expectation: String,
        expected: String,
        observed: String,
    },

    #[error("Invalid fixtures: {0}")]
    Fixture(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    /// Build an assertion failure from an expectation and the values compared.
    pub fn assertion(
        expectation: impl Into<String>,
        expected: impl Into<String>,
        observed: impl Into<String>,
    ) -> Self {
        E2eError::AssertionFailed {
            expectation: expectation.into(),
            expected: expected.into(),
            observed: observed.into(),
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
