//! Playwright browser automation
//!
//! Each session is a Node process running a small bridge script that owns one
//! browser, one context and one page. Rust sends one JSON request per line on
//! the bridge's stdin and reads one JSON response per line from its stdout.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::driver::{BrowserDriver, Locator};
use crate::error::{E2eError, E2eResult};

const BRIDGE_SCRIPT: &str = r#"
const playwright = require('playwright');
const readline = require('readline');

const settings = JSON.parse(process.argv[2]);
const reply = (message) => process.stdout.write(JSON.stringify(message) + '\n');

(async () => {
  const browser = await playwright[settings.browser].launch({ headless: settings.headless });
  const context = await browser.newContext({ viewport: settings.viewport });
  const page = await context.newPage();
  page.setDefaultTimeout(settings.action_timeout_ms);
  page.setDefaultNavigationTimeout(settings.action_timeout_ms);

  const first = (selector) => page.locator(selector).first();
  const handlers = {
    goto: async (r) => { await page.goto(r.url, { waitUntil: 'networkidle' }); return null; },
    fill: async (r) => { await first(r.selector).fill(r.value); return null; },
    click: async (r) => { await first(r.selector).click(); return null; },
    count: (r) => page.locator(r.selector).count(),
    texts: (r) => page.locator(r.selector).allInnerTexts(),
    css_value: async (r) => {
      const target = first(r.selector);
      if (await target.count() === 0) return null;
      return target.evaluate((e, property) => getComputedStyle(e).getPropertyValue(property), r.property);
    },
    visible: (r) => first(r.selector).isVisible(),
    validation_message: (r) => first(r.selector).evaluate((e) => e.validationMessage || ''),
    screenshot: async (r) => { await page.screenshot({ path: r.path, fullPage: true }); return null; },
    close: async () => { await browser.close(); return null; },
  };

  reply({ id: 0, ok: true, value: 'ready' });

  const lines = readline.createInterface({ input: process.stdin });
  for await (const line of lines) {
    if (!line.trim()) continue;
    let request;
    try {
      request = JSON.parse(line);
    } catch (error) {
      console.error('unparseable request: ' + line);
      continue;
    }
    try {
      const handler = handlers[request.op];
      if (!handler) throw new Error('unknown op: ' + request.op);
      const value = await handler(request);
      reply({ id: request.id, ok: true, value: value === undefined ? null : value });
    } catch (error) {
      reply({ id: request.id, ok: false, error: error.message });
    }
    if (request.op === 'close') break;
  }
  process.exit(0);
})().catch((error) => {
  console.error(error.stack || error.message);
  process.exit(1);
});
"#;

/// Extra time the Rust side waits on top of the bridge's own action timeout
const REQUEST_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chromium" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(E2eError::Config(format!("unknown browser '{other}'"))),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaywrightConfig {
    /// Root URL of the task board
    pub base_url: String,

    /// Where failure screenshots are written
    pub screenshot_dir: PathBuf,

    pub viewport_width: u32,
    pub viewport_height: u32,
    pub browser: Browser,
    pub headless: bool,

    /// Timeout for a single action or navigation inside the browser
    pub action_timeout_ms: u64,

    /// `node_modules` directory that provides `playwright`, exported as NODE_PATH
    pub node_modules: Option<PathBuf>,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            screenshot_dir: PathBuf::from("test-results/screenshots"),
            viewport_width: 1280,
            viewport_height: 720,
            browser: Browser::Chromium,
            headless: true,
            action_timeout_ms: 10_000,
            node_modules: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct Viewport {
    width: u32,
    height: u32,
}

/// Settings passed to the bridge as its first argument
#[derive(Debug, Serialize)]
struct BridgeSettings {
    browser: &'static str,
    headless: bool,
    viewport: Viewport,
    action_timeout_ms: u64,
}

impl From<&PlaywrightConfig> for BridgeSettings {
    fn from(config: &PlaywrightConfig) -> Self {
        Self {
            browser: config.browser.as_str(),
            headless: config.headless,
            viewport: Viewport {
                width: config.viewport_width,
                height: config.viewport_height,
            },
            action_timeout_ms: config.action_timeout_ms,
        }
    }
}

/// A request to the bridge
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Command {
    Goto { url: String },
    Fill { selector: Locator, value: String },
    Click { selector: Locator },
    Count { selector: Locator },
    Texts { selector: Locator },
    CssValue { selector: Locator, property: String },
    Visible { selector: Locator },
    ValidationMessage { selector: Locator },
    Screenshot { path: PathBuf },
    Close,
}

impl Command {
    fn name(&self) -> String {
        match self {
            Command::Goto { url } => format!("goto:{}", url),
            Command::Fill { selector, .. } => format!("fill:{}", selector),
            Command::Click { selector } => format!("click:{}", selector),
            Command::Count { selector } => format!("count:{}", selector),
            Command::Texts { selector } => format!("texts:{}", selector),
            Command::CssValue { selector, property } => format!("css:{}:{}", selector, property),
            Command::Visible { selector } => format!("visible:{}", selector),
            Command::ValidationMessage { selector } => format!("validation:{}", selector),
            Command::Screenshot { path } => format!("screenshot:{}", path.display()),
            Command::Close => "close".to_string(),
        }
    }

    /// One protocol line, without the trailing newline
    fn encode(&self, id: u64) -> E2eResult<String> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut value {
            map.insert("id".to_string(), Value::from(id));
        }
        Ok(value.to_string())
    }
}

/// A reply from the bridge
#[derive(Debug, Deserialize)]
struct Response {
    id: u64,
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    error: Option<String>,
}

impl Response {
    fn into_result(self, step: &str) -> E2eResult<Value> {
        if self.ok {
            Ok(self.value)
        } else {
            Err(E2eError::Playwright(format!(
                "{} failed: {}",
                step,
                self.error.as_deref().unwrap_or("unknown error")
            )))
        }
    }
}

struct BridgeIo {
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl BridgeIo {
    /// Read lines until the response with `id` arrives
    async fn read_response(&mut self, id: u64) -> E2eResult<Response> {
        loop {
            let line = self
                .stdout
                .next_line()
                .await?
                .ok_or_else(|| E2eError::Bridge("bridge exited".to_string()))?;

            let response: Response = match serde_json::from_str(&line) {
                Ok(response) => response,
                Err(_) => {
                    debug!("bridge output: {}", line);
                    continue;
                }
            };

            if response.id == id {
                return Ok(response);
            }
            warn!("Discarding bridge response {} while waiting for {}", response.id, id);
        }
    }
}

/// One browser session driven through the Node bridge
pub struct PlaywrightDriver {
    io: Mutex<BridgeIo>,
    child: Mutex<Child>,
    next_id: AtomicU64,
    request_timeout: Duration,
    /// Keeps the bridge script on disk while the session lives
    _script_dir: TempDir,
}

impl PlaywrightDriver {
    /// Start a bridge process and wait until its browser is up
    pub async fn launch(config: &PlaywrightConfig) -> E2eResult<Self> {
        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, BRIDGE_SCRIPT)?;

        let settings = serde_json::to_string(&BridgeSettings::from(config))?;

        let mut cmd = TokioCommand::new("node");
        cmd.arg(&script_path)
            .arg(settings)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(node_modules) = &config.node_modules {
            cmd.env("NODE_PATH", node_modules);
        }

        debug!("Spawning Playwright bridge: {}", script_path.display());
        let mut child = cmd
            .spawn()
            .map_err(|e| E2eError::Playwright(format!("Failed to spawn node: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Bridge("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Bridge("bridge stdout unavailable".to_string()))?;

        let request_timeout = Duration::from_millis(config.action_timeout_ms) + REQUEST_GRACE;
        let driver = Self {
            io: Mutex::new(BridgeIo {
                stdin,
                stdout: BufReader::new(stdout).lines(),
            }),
            child: Mutex::new(child),
            next_id: AtomicU64::new(1),
            request_timeout,
            _script_dir: script_dir,
        };

        let ready = {
            let mut io = driver.io.lock().await;
            timeout(request_timeout, io.read_response(0)).await
        };
        match ready {
            Ok(response) => {
                response?.into_result("launch")?;
            }
            Err(_) => {
                return Err(E2eError::Playwright(format!(
                    "{} did not start within {:?}",
                    config.browser.as_str(),
                    request_timeout
                )))
            }
        }

        info!("Playwright {} session ready", config.browser.as_str());
        Ok(driver)
    }

    /// Check if Playwright is installed
    pub async fn check_installed() -> E2eResult<()> {
        let status = TokioCommand::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    async fn request(&self, command: Command) -> E2eResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let step = command.name();
        let line = command.encode(id)?;

        debug!("bridge request {}: {}", id, step);

        let mut io = self.io.lock().await;
        io.stdin.write_all(line.as_bytes()).await?;
        io.stdin.write_all(b"\n").await?;
        io.stdin.flush().await?;

        let response = timeout(self.request_timeout, io.read_response(id))
            .await
            .map_err(|_| {
                E2eError::Bridge(format!("no answer to {} within {:?}", step, self.request_timeout))
            })??;

        response.into_result(&step)
    }

    async fn request_as<T: serde::de::DeserializeOwned>(&self, command: Command) -> E2eResult<T> {
        let value = self.request(command).await?;
        serde_json::from_value(value).map_err(E2eError::from)
    }
}

#[async_trait]
impl BrowserDriver for PlaywrightDriver {
    async fn goto(&self, url: &str) -> E2eResult<()> {
        self.request(Command::Goto {
            url: url.to_string(),
        })
        .await?;
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> E2eResult<()> {
        self.request(Command::Fill {
            selector: locator.clone(),
            value: value.to_string(),
        })
        .await?;
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> E2eResult<()> {
        self.request(Command::Click {
            selector: locator.clone(),
        })
        .await?;
        Ok(())
    }

    async fn count(&self, locator: &Locator) -> E2eResult<usize> {
        self.request_as(Command::Count {
            selector: locator.clone(),
        })
        .await
    }

    async fn inner_texts(&self, locator: &Locator) -> E2eResult<Vec<String>> {
        self.request_as(Command::Texts {
            selector: locator.clone(),
        })
        .await
    }

    async fn css_value(&self, locator: &Locator, property: &str) -> E2eResult<Option<String>> {
        self.request_as(Command::CssValue {
            selector: locator.clone(),
            property: property.to_string(),
        })
        .await
    }

    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool> {
        self.request_as(Command::Visible {
            selector: locator.clone(),
        })
        .await
    }

    async fn validation_message(&self, locator: &Locator) -> E2eResult<String> {
        self.request_as(Command::ValidationMessage {
            selector: locator.clone(),
        })
        .await
    }

    async fn screenshot(&self, path: &Path) -> E2eResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.request(Command::Screenshot {
            path: path.to_path_buf(),
        })
        .await?;
        Ok(())
    }

    async fn close(&self) -> E2eResult<()> {
        if let Err(e) = self.request(Command::Close).await {
            warn!("Bridge close request failed: {}", e);
        }

        let mut child = self.child.lock().await;
        if timeout(Duration::from_secs(2), child.wait()).await.is_ok() {
            return Ok(());
        }

        // Try graceful shutdown first
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = child.id() {
                if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
                    && timeout(Duration::from_millis(500), child.wait()).await.is_ok()
                {
                    return Ok(());
                }
            }
        }

        // Force kill if still running
        child.kill().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_request_line_carries_id_and_op() {
        let line = Command::Fill {
            selector: Locator::new("input[class*=InputNewTask]"),
            value: "Buy milk".to_string(),
        }
        .encode(7)
        .unwrap();

        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["op"], "fill");
        assert_eq!(value["selector"], "input[class*=InputNewTask]");
        assert_eq!(value["value"], "Buy milk");
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_unit_command_encodes_op_only() {
        let value: Value = serde_json::from_str(&Command::Close.encode(3).unwrap()).unwrap();
        assert_eq!(value, serde_json::json!({ "op": "close", "id": 3 }));
    }

    #[test]
    fn test_failed_response_names_the_step() {
        let response: Response =
            serde_json::from_str(r#"{"id": 4, "ok": false, "error": "Timeout 10000ms exceeded"}"#).unwrap();
        let err = response.into_result("click:css=button >> text=Create").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("click:css=button >> text=Create"));
        assert!(message.contains("Timeout 10000ms exceeded"));
    }

    #[test]
    fn test_null_value_defaults() {
        let response: Response = serde_json::from_str(r#"{"id": 1, "ok": true}"#).unwrap();
        assert_eq!(response.into_result("goto").unwrap(), Value::Null);
    }

    #[test_case("goto" ; "goto")]
    #[test_case("fill" ; "fill")]
    #[test_case("click" ; "click")]
    #[test_case("count" ; "count")]
    #[test_case("texts" ; "texts")]
    #[test_case("css_value" ; "css value")]
    #[test_case("visible" ; "visible")]
    #[test_case("validation_message" ; "validation message")]
    #[test_case("screenshot" ; "screenshot")]
    #[test_case("close" ; "close")]
    fn test_bridge_handles_op(op: &str) {
        assert!(BRIDGE_SCRIPT.contains(&format!("    {}: ", op)));
    }

    #[test]
    fn test_browser_parsing() {
        assert_eq!("webkit".parse::<Browser>().unwrap(), Browser::Webkit);
        assert!(matches!("safari".parse::<Browser>(), Err(E2eError::Config(_))));
    }

    #[test]
    fn test_bridge_settings_shape() {
        let config = PlaywrightConfig {
            browser: Browser::Firefox,
            headless: false,
            ..Default::default()
        };
        let value = serde_json::to_value(BridgeSettings::from(&config)).unwrap();
        assert_eq!(value["browser"], "firefox");
        assert_eq!(value["headless"], false);
        assert_eq!(value["viewport"]["width"], 1280);
        assert_eq!(value["action_timeout_ms"], 10_000);
    }
}
