//! Browser automation seam the task board page object is built on

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::E2eResult;

/// A Playwright selector string (`css=`, `xpath=`, `text=` engines, `>>` chains)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(String);

impl Locator {
    pub fn new(selector: impl Into<String>) -> Self {
        Self(selector.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Locator-level primitives of one isolated browser session.
///
/// Calls within a session are sequential. Queries return what the page
/// shows right now; retrying until a condition holds is the caller's job.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Navigate to an absolute URL and wait for the page to settle
    async fn goto(&self, url: &str) -> E2eResult<()>;

    /// Replace the value of an input
    async fn fill(&self, locator: &Locator, value: &str) -> E2eResult<()>;

    /// Click the first matching element
    async fn click(&self, locator: &Locator) -> E2eResult<()>;

    /// Number of matching elements
    async fn count(&self, locator: &Locator) -> E2eResult<usize>;

    /// Rendered text of every matching element
    async fn inner_texts(&self, locator: &Locator) -> E2eResult<Vec<String>>;

    /// Computed CSS property of the first match, `None` when nothing matches
    async fn css_value(&self, locator: &Locator, property: &str) -> E2eResult<Option<String>>;

    /// Whether the first match is visible
    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool>;

    /// Native constraint-validation message of the first match
    async fn validation_message(&self, locator: &Locator) -> E2eResult<String>;

    /// Full-page screenshot
    async fn screenshot(&self, path: &Path) -> E2eResult<()>;

    /// End the session
    async fn close(&self) -> E2eResult<()>;
}
