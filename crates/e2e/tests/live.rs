//! Live suite against a running task board
//!
//! Needs the web app, the task API and Playwright:
//!   TASKBOARD_APP_URL=http://127.0.0.1:8080 TASKBOARD_API_URL=http://127.0.0.1:3333 \
//!     cargo test --package taskboard-e2e --test live -- --ignored

use std::path::PathBuf;

use taskboard_e2e::runner::{PlaywrightSessions, RunnerConfig};
use taskboard_e2e::suite::task_scenarios;
use taskboard_e2e::ScenarioRunner;
use test_case::test_case;

fn live_config() -> RunnerConfig {
    let mut config = RunnerConfig::default();
    if let Ok(url) = std::env::var("TASKBOARD_APP_URL") {
        config.playwright.base_url = url;
    }
    if let Ok(url) = std::env::var("TASKBOARD_API_URL") {
        config.api.base_url = url;
    }
    let output = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("target").join("live-results");
    config.playwright.screenshot_dir = output.join("screenshots");
    config.output_dir = output;
    config
}

async fn live_runner() -> anyhow::Result<ScenarioRunner<PlaywrightSessions>> {
    let config = live_config();
    let sessions = PlaywrightSessions::new(config.playwright.clone()).await?;
    let runner = ScenarioRunner::new(sessions, config)?;
    runner.wait_until_ready().await?;
    Ok(runner)
}

#[test_case("creates a new task")]
#[test_case("rejects a duplicate task")]
#[test_case("requires the task name")]
#[test_case("marks a task as done")]
#[test_case("removes a task")]
#[ignore]
#[tokio::test]
async fn live_scenario(name: &str) -> anyhow::Result<()> {
    let runner = live_runner().await?;

    let result = runner.run_named(&task_scenarios(), name).await?;

    assert!(result.success, "{}: {:?} {:?}", name, result.error, result.assertion);
    Ok(())
}

#[ignore]
#[tokio::test]
async fn live_suite_in_parallel() -> anyhow::Result<()> {
    let mut runner_config = live_config();
    runner_config.workers = 3;
    let sessions = PlaywrightSessions::new(runner_config.playwright.clone()).await?;
    let runner = ScenarioRunner::new(sessions, runner_config)?;
    runner.wait_until_ready().await?;

    let result = runner.run_all(&task_scenarios()).await;
    runner.write_results(&result)?;

    assert!(result.all_passed(), "{} of {} failed", result.failed, result.total);
    Ok(())
}
