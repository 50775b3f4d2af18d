//! Task board E2E runner
//!
//! Run with: cargo run --package taskboard-e2e -- --app-url http://localhost:8080

use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use taskboard_e2e::playwright::Browser;
use taskboard_e2e::runner::{PlaywrightSessions, RunnerConfig, SuiteResult};
use taskboard_e2e::suite::task_scenarios;
use taskboard_e2e::{E2eResult, ScenarioRunner};

#[derive(Parser, Debug)]
#[command(name = "taskboard-e2e")]
#[command(about = "E2E scenarios for the task board", version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "TASKBOARD_E2E_CONFIG")]
    config: Option<PathBuf>,

    /// Root URL of the task board
    #[arg(long, env = "TASKBOARD_APP_URL")]
    app_url: Option<String>,

    /// Root URL of the task API
    #[arg(long, env = "TASKBOARD_API_URL")]
    api_url: Option<String>,

    /// Fixture file (YAML)
    #[arg(long, env = "TASKBOARD_FIXTURES")]
    fixtures: Option<PathBuf>,

    /// Run only scenarios carrying this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only the scenario with this name
    #[arg(short, long)]
    name: Option<String>,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long)]
    browser: Option<Browser>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Scenarios to run at the same time
    #[arg(short, long)]
    workers: Option<usize>,

    /// UI assertion timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Output directory for results
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

impl Args {
    /// Overlay command line options on the file or default configuration
    fn into_config(self) -> E2eResult<(RunnerConfig, Option<String>, Option<String>)> {
        let mut config = match &self.config {
            Some(path) => RunnerConfig::from_toml_file(path)?,
            None => RunnerConfig::default(),
        };

        if let Some(url) = self.app_url {
            config.playwright.base_url = url;
        }
        if let Some(url) = self.api_url {
            config.api.base_url = url;
        }
        if let Some(path) = self.fixtures {
            config.fixtures_path = Some(path);
        }
        if let Some(browser) = self.browser {
            config.playwright.browser = browser;
        }
        if self.headed {
            config.playwright.headless = false;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.wait.timeout_ms = timeout_ms;
        }
        if let Some(output) = self.output {
            config.playwright.screenshot_dir = output.join("screenshots");
            config.output_dir = output;
        }

        Ok((config, self.tag, self.name))
    }
}

fn main() {
    let args = Args::parse();

    let filter = if args.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(async_main(args)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> E2eResult<bool> {
    let (config, tag, name) = args.into_config()?;
    info!(
        "Task board at {}, task API at {}",
        config.playwright.base_url, config.api.base_url
    );

    let sessions = PlaywrightSessions::new(config.playwright.clone()).await?;
    let runner = ScenarioRunner::new(sessions, config)?;
    runner.wait_until_ready().await?;

    let scenarios = task_scenarios();
    let results = if let Some(name) = name {
        let result = runner.run_named(&scenarios, &name).await?;
        SuiteResult {
            total: 1,
            passed: usize::from(result.success),
            failed: usize::from(!result.success),
            skipped: 0,
            duration_ms: result.duration_ms,
            results: vec![result],
        }
    } else if let Some(tag) = tag {
        runner.run_tagged(&scenarios, &tag).await
    } else {
        runner.run_all(&scenarios).await
    };

    for result in results.results.iter().filter(|r| !r.success) {
        if let Some(assertion) = &result.assertion {
            error!(
                "{}: expected {} to be {:?}, observed {:?}",
                result.name, assertion.expectation, assertion.expected, assertion.observed
            );
        }
    }

    runner.write_results(&results)?;

    Ok(results.all_passed())
}
