//! Task API client used to reconcile backend state around UI scenarios

use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::fixture::Task;

/// Configuration for the task API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Root URL of the backend
    pub base_url: String,

    /// Per-request timeout
    pub request_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3333".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

/// Backend-side primitives that bypass the UI
#[derive(Debug, Clone)]
pub struct TaskApi {
    client: Client,
    base_url: Url,
}

impl TaskApi {
    pub fn new(config: &ApiConfig) -> E2eResult<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| E2eError::Config(format!("invalid API url '{}': {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(E2eError::Config(format!("API url '{}' cannot be a base", config.base_url)));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Base URL with `segments` appended, each percent-encoded on its own
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Remove any task called `name`.
    ///
    /// Succeeds whether or not such a task exists. Only transport failures
    /// are errors.
    pub async fn delete_task_by_name(&self, name: &str) -> E2eResult<()> {
        let url = self.endpoint(&["helper", "tasks", name]);
        let resp = self.client.delete(url).send().await?;

        let status = resp.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            debug!("Reset task '{}' ({})", name, status);
        } else {
            warn!("Reset of task '{}' returned {}", name, status);
        }
        Ok(())
    }

    /// Persist `task` directly in the backend.
    ///
    /// Any non-success status is a seeding failure: the precondition could
    /// not be established, so the scenario must not go on.
    pub async fn create_task(&self, task: &Task) -> E2eResult<()> {
        let url = self.endpoint(&["tasks"]);
        let resp = self.client.post(url).json(task).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(E2eError::Seeding {
                name: task.name.clone(),
                status: status.as_u16(),
                body,
            });
        }

        debug!("Seeded task '{}' (done: {})", task.name, task.is_done);
        Ok(())
    }

    /// Every task the backend currently holds
    pub async fn list_tasks(&self) -> E2eResult<Vec<Task>> {
        let url = self.endpoint(&["tasks"]);
        let tasks = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Task>>()
            .await?;
        Ok(tasks)
    }

    /// The task named exactly `name`, if the backend has one
    pub async fn find_task(&self, name: &str) -> E2eResult<Option<Task>> {
        Ok(self.list_tasks().await?.into_iter().find(|t| t.name == name))
    }

    /// Poll the task listing until the backend answers with success
    pub async fn wait_until_ready(&self, timeout_duration: Duration) -> E2eResult<()> {
        let url = self.endpoint(&["tasks"]);
        let start = Instant::now();
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.client.get(url.clone()).send().await {
                Ok(resp) if resp.status().is_success() => {
                    info!("Task API ready at {}", self.base_url);
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("Readiness check returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for task API at {}...", self.base_url);
                    }
                    // Connection refused is expected while the backend is starting
                    if !e.is_connect() {
                        warn!("Readiness check error: {}", e);
                    }
                }
            }

            if start.elapsed() >= timeout_duration {
                return Err(E2eError::ServiceUnavailable {
                    url: url.to_string(),
                    attempts,
                });
            }
            sleep(Duration::from_millis(100)).await;
        }
    }
}
