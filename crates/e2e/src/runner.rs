//! Suite runner that gives every scenario its own browser session

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::api::{ApiConfig, TaskApi};
use crate::driver::BrowserDriver;
use crate::error::{E2eError, E2eResult};
use crate::fixture::TaskFixtures;
use crate::page::TaskBoard;
use crate::playwright::{PlaywrightConfig, PlaywrightDriver};
use crate::scenario::{Scenario, ScenarioContext};
use crate::wait::WaitConfig;

/// Expected versus observed state of a failed assertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionDetail {
    pub expectation: String,
    pub expected: String,
    pub observed: String,
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub assertion: Option<AssertionDetail>,
    pub screenshot_path: Option<PathBuf>,
}

/// Result of running a suite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl SuiteResult {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn result(&self, name: &str) -> Option<&ScenarioResult> {
        self.results.iter().find(|r| r.name == name)
    }
}

/// Opens one isolated browser session per scenario
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, scenario: &str) -> E2eResult<Box<dyn BrowserDriver>>;
}

/// Sessions backed by the Playwright bridge
pub struct PlaywrightSessions {
    config: PlaywrightConfig,
}

impl PlaywrightSessions {
    /// Verify Playwright is available once, before any session is opened
    pub async fn new(config: PlaywrightConfig) -> E2eResult<Self> {
        PlaywrightDriver::check_installed().await?;
        std::fs::create_dir_all(&config.screenshot_dir)?;
        Ok(Self { config })
    }
}

#[async_trait]
impl SessionFactory for PlaywrightSessions {
    async fn open(&self, scenario: &str) -> E2eResult<Box<dyn BrowserDriver>> {
        debug!("Opening browser session for '{}'", scenario);
        let driver = PlaywrightDriver::launch(&self.config).await?;
        Ok(Box::new(driver))
    }
}

/// Configuration for the runner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub api: ApiConfig,
    pub playwright: PlaywrightConfig,
    pub wait: WaitConfig,

    /// Scenarios running at the same time, each with its own session
    pub workers: usize,

    /// Fixture file; the built-in fixtures are used when unset
    pub fixtures_path: Option<PathBuf>,

    pub output_dir: PathBuf,

    /// How long to wait for the task API before giving up on the suite
    pub ready_timeout_ms: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            playwright: PlaywrightConfig::default(),
            wait: WaitConfig::default(),
            workers: 1,
            fixtures_path: None,
            output_dir: PathBuf::from("test-results"),
            ready_timeout_ms: 30_000,
        }
    }
}

impl RunnerConfig {
    pub fn from_toml(content: &str) -> E2eResult<Self> {
        toml::from_str(content).map_err(E2eError::from)
    }

    pub fn from_toml_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load and validate the fixtures this configuration points at
    pub fn load_fixtures(&self) -> E2eResult<TaskFixtures> {
        let fixtures = match &self.fixtures_path {
            Some(path) => TaskFixtures::from_file(path)?,
            None => TaskFixtures::builtin()?,
        };
        fixtures.validate()?;
        Ok(fixtures)
    }
}

/// Main scenario runner
pub struct ScenarioRunner<F: SessionFactory> {
    sessions: F,
    api: TaskApi,
    fixtures: Arc<TaskFixtures>,
    config: RunnerConfig,
}

impl<F: SessionFactory> ScenarioRunner<F> {
    /// Create a runner; fails if the fixtures are unsafe to run concurrently
    pub fn new(sessions: F, config: RunnerConfig) -> E2eResult<Self> {
        let fixtures = config.load_fixtures()?;
        let api = TaskApi::new(&config.api)?;

        Ok(Self {
            sessions,
            api,
            fixtures: Arc::new(fixtures),
            config,
        })
    }

    pub fn api(&self) -> &TaskApi {
        &self.api
    }

    pub fn fixtures(&self) -> &TaskFixtures {
        &self.fixtures
    }

    /// Wait for the task API to answer
    pub async fn wait_until_ready(&self) -> E2eResult<()> {
        self.api
            .wait_until_ready(Duration::from_millis(self.config.ready_timeout_ms))
            .await
    }

    /// Run every scenario
    pub async fn run_all(&self, scenarios: &[Scenario]) -> SuiteResult {
        self.run_scenarios(scenarios).await
    }

    /// Run scenarios carrying `tag`; the rest count as skipped
    pub async fn run_tagged(&self, scenarios: &[Scenario], tag: &str) -> SuiteResult {
        let selected: Vec<Scenario> = scenarios.iter().filter(|s| s.has_tag(tag)).copied().collect();
        let mut result = self.run_scenarios(&selected).await;
        result.skipped = scenarios.len() - selected.len();
        result.total = scenarios.len();
        result
    }

    /// Run the scenario called `name`
    pub async fn run_named(&self, scenarios: &[Scenario], name: &str) -> E2eResult<ScenarioResult> {
        let scenario = scenarios
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| E2eError::Config(format!("Scenario not found: {}", name)))?;

        Ok(self.run_scenario(scenario).await)
    }

    /// Run scenarios concurrently, up to the configured number of workers
    pub async fn run_scenarios(&self, scenarios: &[Scenario]) -> SuiteResult {
        let start = Instant::now();
        let workers = self.config.workers.max(1);

        info!("Running {} scenario(s) on {} worker(s)...", scenarios.len(), workers);

        let results: Vec<ScenarioResult> = stream::iter(scenarios)
            .map(|scenario| self.run_scenario(scenario))
            .buffer_unordered(workers)
            .collect()
            .await;

        let passed = results.iter().filter(|r| r.success).count();
        let failed = results.len() - passed;
        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Scenario results: {} passed, {} failed ({} ms)",
            passed, failed, duration_ms
        );

        SuiteResult {
            total: scenarios.len(),
            passed,
            failed,
            skipped: 0,
            duration_ms,
            results,
        }
    }

    /// Run one scenario in a fresh session.
    ///
    /// The backend is reconciled before the session is opened, so a failed
    /// seed ends the scenario without any browser interaction.
    pub async fn run_scenario(&self, scenario: &Scenario) -> ScenarioResult {
        let started_at = Utc::now();
        let start = Instant::now();
        debug!("Running scenario: {}", scenario.name);

        let precondition = (scenario.precondition)(&self.fixtures);
        let (outcome, screenshot_path) = match precondition.apply(&self.api).await {
            Ok(()) => self.drive(scenario).await,
            Err(e) => (Err(e), None),
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        match &outcome {
            Ok(()) => info!("✓ {} ({} ms)", scenario.name, duration_ms),
            Err(e) => error!("✗ {} - {}", scenario.name, e),
        }

        let assertion = match &outcome {
            Err(E2eError::AssertionFailed {
                expectation,
                expected,
                observed,
            }) => Some(AssertionDetail {
                expectation: expectation.clone(),
                expected: expected.clone(),
                observed: observed.clone(),
            }),
            _ => None,
        };

        ScenarioResult {
            name: scenario.name.to_string(),
            success: outcome.is_ok(),
            started_at,
            duration_ms,
            error: outcome.err().map(|e| e.to_string()),
            assertion,
            screenshot_path,
        }
    }

    /// Open a session and the board, run the body, always close the session
    async fn drive(&self, scenario: &Scenario) -> (E2eResult<()>, Option<PathBuf>) {
        let driver = match self.sessions.open(scenario.name).await {
            Ok(driver) => driver,
            Err(e) => return (Err(e), None),
        };

        let ctx = ScenarioContext {
            api: self.api.clone(),
            board: TaskBoard::new(
                driver,
                self.config.playwright.base_url.clone(),
                self.config.wait.clone(),
            ),
            fixtures: Arc::clone(&self.fixtures),
        };

        let outcome = match ctx.board.go().await {
            Ok(()) => (scenario.body)(&ctx).await,
            Err(e) => Err(e),
        };
        let screenshot = match &outcome {
            Err(_) => self.capture_failure(scenario, &ctx).await,
            Ok(()) => None,
        };

        if let Err(e) = ctx.board.driver().close().await {
            warn!("Closing session for '{}' failed: {}", scenario.name, e);
        }
        (outcome, screenshot)
    }

    async fn capture_failure(&self, scenario: &Scenario, ctx: &ScenarioContext) -> Option<PathBuf> {
        let file_name: String = scenario
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        let path = self
            .config
            .playwright
            .screenshot_dir
            .join(format!("{}.png", file_name));

        match ctx.board.driver().screenshot(&path).await {
            Ok(()) => Some(path),
            Err(e) => {
                warn!("Failure screenshot for '{}' not captured: {}", scenario.name, e);
                None
            }
        }
    }

    /// Write suite results to JSON file
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}
