//! Bounded polling for UI state that renders asynchronously

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::debug;

use crate::error::{E2eError, E2eResult};

/// How long UI assertions keep retrying
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    /// Give up after this many milliseconds
    pub timeout_ms: u64,

    /// Delay between probes
    pub poll_interval_ms: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            poll_interval_ms: 100,
        }
    }
}

impl WaitConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// What a single probe saw
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub satisfied: bool,
    pub observed: String,
}

impl Probe {
    pub fn new(satisfied: bool, observed: impl Into<String>) -> Self {
        Self {
            satisfied,
            observed: observed.into(),
        }
    }
}

/// Re-run `probe` until it is satisfied or the timeout elapses.
///
/// The probe always runs at least once. On timeout the last observation is
/// reported against `expected`. Probe errors abort the wait immediately.
pub async fn poll_until<F, Fut>(
    config: &WaitConfig,
    expectation: &str,
    expected: &str,
    mut probe: F,
) -> E2eResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<Probe>>,
{
    let start = Instant::now();
    let mut attempts = 0usize;

    loop {
        attempts += 1;
        let probe = probe().await?;
        if probe.satisfied {
            debug!("{} satisfied after {} probe(s)", expectation, attempts);
            return Ok(());
        }

        if start.elapsed() >= config.timeout() {
            debug!("{} timed out after {} probe(s)", expectation, attempts);
            return Err(E2eError::assertion(expectation, expected, probe.observed));
        }

        sleep(config.poll_interval()).await;
    }
}
