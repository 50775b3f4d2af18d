//! Task board page object
//!
//! The only place that knows how the task board is laid out. Scenarios drive
//! it through intent-level operations; every read goes back to the live page.

use tracing::{debug, info};

use crate::driver::{BrowserDriver, Locator};
use crate::error::{E2eError, E2eResult};
use crate::fixture::Task;
use crate::wait::{poll_until, Probe, WaitConfig};

/// Alert shown when the backend refuses a task name that already exists
pub const DUPLICATE_TASK_ALERT: &str = "Task already exists!";

/// Native validation message of the empty name input
pub const REQUIRED_FIELD_MESSAGE: &str = "This is a required field";

/// Selectors of the task board
pub mod locators {
    use crate::driver::Locator;

    pub fn input_task_name() -> Locator {
        Locator::new("input[class*=InputNewTask]")
    }

    pub fn create_button() -> Locator {
        Locator::new("css=button >> text=Create")
    }

    pub fn task_rows() -> Locator {
        Locator::new("css=[data-testid=task-item]")
    }

    pub fn alert() -> Locator {
        Locator::new("css=.swal2-html-container")
    }

    /// Text element of the row named exactly `name`
    pub fn task_text(name: &str) -> Locator {
        Locator::new(format!("xpath={}", task_text_path(name)))
    }

    pub fn toggle_button(name: &str) -> Locator {
        row_button(name, "Toggle")
    }

    pub fn delete_button(name: &str) -> Locator {
        row_button(name, "Delete")
    }

    fn task_text_path(name: &str) -> String {
        format!("//p[text()={}]", xpath_literal(name))
    }

    fn row_button(name: &str, class: &str) -> Locator {
        Locator::new(format!(
            "xpath={}/..//button[contains(@class, \"{}\")]",
            task_text_path(name),
            class
        ))
    }

    /// Quote `value` as an XPath 1.0 string literal
    pub fn xpath_literal(value: &str) -> String {
        if !value.contains('"') {
            return format!("\"{}\"", value);
        }
        if !value.contains('\'') {
            return format!("'{}'", value);
        }

        let parts: Vec<String> = value
            .split('"')
            .map(|part| format!("\"{}\"", part))
            .collect();
        format!("concat({})", parts.join(", '\"', "))
    }
}

/// Terminal state of a create attempt as the user sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// A new row with the task name appeared
    Accepted,

    /// The backend refused the task and an alert shows why
    RejectedDuplicate(String),

    /// The browser blocked submission with this validation message
    RejectedValidation(String),
}

/// Handle to an element the board exposes directly
pub struct Element<'a> {
    driver: &'a dyn BrowserDriver,
    locator: Locator,
}

impl<'a> Element<'a> {
    /// Native constraint-validation message, empty when the value is valid
    pub async fn validation_message(&self) -> E2eResult<String> {
        self.driver.validation_message(&self.locator).await
    }
}

/// Page object for the task board
pub struct TaskBoard {
    driver: Box<dyn BrowserDriver>,
    base_url: String,
    wait: WaitConfig,
}

impl TaskBoard {
    pub fn new(driver: Box<dyn BrowserDriver>, base_url: impl Into<String>, wait: WaitConfig) -> Self {
        Self {
            driver,
            base_url: base_url.into(),
            wait,
        }
    }

    pub fn driver(&self) -> &dyn BrowserDriver {
        self.driver.as_ref()
    }

    /// Open the board
    pub async fn go(&self) -> E2eResult<()> {
        info!("Opening task board at {}", self.base_url);
        self.driver.goto(&self.base_url).await
    }

    /// Type the task name and press Create.
    ///
    /// An empty name is typed as-is; the browser is expected to block it.
    pub async fn create(&self, task: &Task) -> E2eResult<()> {
        debug!("Creating task '{}' through the board", task.name);
        self.driver.fill(&locators::input_task_name(), &task.name).await?;
        self.driver.click(&locators::create_button()).await
    }

    /// Flip the completion state of the row named `name`
    pub async fn toggle(&self, name: &str) -> E2eResult<()> {
        let button = locators::toggle_button(name);
        self.require_row(name, &button).await?;
        self.driver.click(&button).await
    }

    /// Delete the row named `name`
    pub async fn remove(&self, name: &str) -> E2eResult<()> {
        let button = locators::delete_button(name);
        self.require_row(name, &button).await?;
        self.driver.click(&button).await
    }

    /// Wait until some row shows `name`
    pub async fn should_have_text(&self, name: &str) -> E2eResult<()> {
        let board = self;
        poll_until(&self.wait, "task row to be listed", name, move || async move {
            let texts = board.row_texts().await?;
            let satisfied = texts.iter().any(|t| t.contains(name));
            Ok(Probe::new(satisfied, format!("{:?}", texts)))
        })
        .await
    }

    /// Wait until the row named `name` renders as completed
    pub async fn should_be_done(&self, name: &str) -> E2eResult<()> {
        let board = self;
        let text = locators::task_text(name);
        let text = &text;
        poll_until(&self.wait, "task to be done", "line-through", move || async move {
            let decoration = board.driver.css_value(text, "text-decoration-line").await?;
            let observed = decoration.unwrap_or_else(|| "<no row>".to_string());
            Ok(Probe::new(observed.contains("line-through"), observed))
        })
        .await
    }

    /// Wait until no row shows `name`
    pub async fn should_not_exist(&self, name: &str) -> E2eResult<()> {
        let board = self;
        let expected = format!("no row containing {:?}", name);
        poll_until(&self.wait, "task row to be gone", &expected, move || async move {
            let texts = board.row_texts().await?;
            let satisfied = !texts.iter().any(|t| t.contains(name));
            Ok(Probe::new(satisfied, format!("{:?}", texts)))
        })
        .await
    }

    /// Wait until the alert is visible with exactly `expected`
    pub async fn alert_have_text(&self, expected: &str) -> E2eResult<()> {
        let board = self;
        poll_until(&self.wait, "alert text", expected, move || async move {
            let observed = board.alert_text().await?;
            let satisfied = observed.as_deref().map(str::trim) == Some(expected);
            Ok(Probe::new(
                satisfied,
                observed.unwrap_or_else(|| "<no alert>".to_string()),
            ))
        })
        .await
    }

    /// The task name input, for reading native validation state
    pub fn input_task_name(&self) -> Element<'_> {
        Element {
            driver: self.driver.as_ref(),
            locator: locators::input_task_name(),
        }
    }

    /// Number of rows whose text contains `name`
    pub async fn row_count(&self, name: &str) -> E2eResult<usize> {
        Ok(self
            .row_texts()
            .await?
            .iter()
            .filter(|t| t.contains(name))
            .count())
    }

    /// Number of rows whose whole text is `name`
    pub async fn exact_row_count(&self, name: &str) -> E2eResult<usize> {
        Ok(self
            .row_texts()
            .await?
            .iter()
            .filter(|t| t.trim() == name)
            .count())
    }

    /// Create `task` and wait for the board to settle on an outcome.
    ///
    /// `validationMessage` tracks the input's live validity, and an accepted
    /// create clears the input, so the message only decides the outcome of
    /// an empty name. A typed name settles on the alert or a new row.
    pub async fn submit(&self, task: &Task) -> E2eResult<CreateOutcome> {
        let before = self.exact_row_count(&task.name).await?;
        self.create(task).await?;

        let start = std::time::Instant::now();
        loop {
            if task.name.is_empty() {
                let message = self.input_task_name().validation_message().await?;
                if !message.is_empty() {
                    return Ok(CreateOutcome::RejectedValidation(message));
                }
            }
            if let Some(alert) = self.alert_text().await? {
                return Ok(CreateOutcome::RejectedDuplicate(alert.trim().to_string()));
            }
            let after = self.exact_row_count(&task.name).await?;
            if after > before {
                return Ok(CreateOutcome::Accepted);
            }

            if start.elapsed() >= self.wait.timeout() {
                return Err(E2eError::assertion(
                    "create to settle",
                    "new row, alert or validation message",
                    format!("{} row(s) named {:?}", after, task.name),
                ));
            }
            tokio::time::sleep(self.wait.poll_interval()).await;
        }
    }

    async fn row_texts(&self) -> E2eResult<Vec<String>> {
        self.driver.inner_texts(&locators::task_rows()).await
    }

    async fn alert_text(&self) -> E2eResult<Option<String>> {
        let alert = locators::alert();
        if !self.driver.is_visible(&alert).await? {
            return Ok(None);
        }
        Ok(self.driver.inner_texts(&alert).await?.into_iter().next())
    }

    async fn require_row(&self, name: &str, control: &Locator) -> E2eResult<()> {
        if self.driver.count(control).await? == 0 {
            return Err(E2eError::RowNotFound(name.to_string()));
        }
        Ok(())
    }
}
