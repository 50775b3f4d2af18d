//! In-process stand-in for the task board: an axum task API and a fake
//! browser session reading and writing the same store.
//!
//! Task names compare as exact byte strings, both for duplicate detection
//! and for locating rows.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::{Path as UrlPath, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

use taskboard_e2e::api::ApiConfig;
use taskboard_e2e::driver::{BrowserDriver, Locator};
use taskboard_e2e::page::{locators, DUPLICATE_TASK_ALERT, REQUIRED_FIELD_MESSAGE};
use taskboard_e2e::runner::{RunnerConfig, SessionFactory};
use taskboard_e2e::wait::WaitConfig;
use taskboard_e2e::{E2eError, E2eResult, Task};

/// Polls before a duplicate alert becomes visible
const ALERT_RENDER_POLLS: usize = 2;

#[derive(Debug, Default)]
pub struct Store {
    pub tasks: Vec<Task>,

    /// Successful POST /tasks calls
    pub api_creates: usize,

    /// Tasks persisted through the fake UI
    pub ui_submissions: usize,

    /// Make POST /tasks answer 500
    pub fail_seeding: bool,

    /// Ordered log of API and UI interactions
    pub events: Vec<String>,
}

impl Store {
    pub fn contains(&self, name: &str) -> bool {
        self.tasks.iter().any(|t| t.name == name)
    }

    pub fn task(&self, name: &str) -> Option<Task> {
        self.tasks.iter().find(|t| t.name == name).cloned()
    }
}

pub type SharedStore = Arc<Mutex<Store>>;

/// Task API served on an ephemeral port
pub struct FakeBackend {
    pub store: SharedStore,
    pub base_url: String,
    handle: JoinHandle<()>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let store: SharedStore = Arc::new(Mutex::new(Store::default()));

        let app = Router::new()
            .route("/helper/tasks/:name", delete(delete_task))
            .route("/tasks", get(list_tasks).post(create_task))
            .with_state(store.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake backend");
        let addr = listener.local_addr().expect("fake backend address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake backend crashed");
        });

        Self {
            store,
            base_url: format!("http://{}", addr),
            handle,
        }
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.clone(),
            request_timeout_ms: 2_000,
        }
    }

    pub fn seed(&self, task: Task) {
        self.store.lock().tasks.push(task);
    }

    pub fn events(&self) -> Vec<String> {
        self.store.lock().events.clone()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn delete_task(State(store): State<SharedStore>, UrlPath(name): UrlPath<String>) -> StatusCode {
    let mut store = store.lock();
    store.events.push(format!("api:delete:{}", name));

    let before = store.tasks.len();
    store.tasks.retain(|t| t.name != name);
    if store.tasks.len() < before {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn create_task(State(store): State<SharedStore>, Json(task): Json<Task>) -> (StatusCode, Json<Value>) {
    let mut store = store.lock();
    store.events.push(format!("api:create:{}", task.name));

    if store.fail_seeding {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "database unavailable" })),
        );
    }
    if task.name.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "message": "name is required" })));
    }
    if store.contains(&task.name) {
        return (StatusCode::CONFLICT, Json(json!({ "message": "Duplicated task!" })));
    }

    store.api_creates += 1;
    store.tasks.push(task.clone());
    (StatusCode::CREATED, Json(json!(task)))
}

async fn list_tasks(State(store): State<SharedStore>) -> Json<Vec<Value>> {
    let store = store.lock();
    let tasks = store
        .tasks
        .iter()
        .enumerate()
        .map(|(i, t)| json!({ "id": i + 1, "name": t.name, "is_done": t.is_done }))
        .collect();
    Json(tasks)
}

#[derive(Debug, Default)]
struct UiState {
    page_open: bool,
    input: String,
    alert: Option<String>,
    alert_polls_left: usize,
}

/// Browser session over the shared store
pub struct FakeBrowser {
    store: SharedStore,
    ui: Mutex<UiState>,
}

impl FakeBrowser {
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            ui: Mutex::new(UiState::default()),
        }
    }

    fn ensure_open(&self) -> E2eResult<()> {
        if self.ui.lock().page_open {
            Ok(())
        } else {
            Err(E2eError::Playwright("page has not been opened".to_string()))
        }
    }

    fn no_match(locator: &Locator) -> E2eError {
        E2eError::Playwright(format!("no element matches {}", locator))
    }

    /// Name of the task whose control `locator` points at
    fn row_for(&self, locator: &Locator, control: fn(&str) -> Locator) -> Option<String> {
        self.store
            .lock()
            .tasks
            .iter()
            .find(|t| control(&t.name) == *locator)
            .map(|t| t.name.clone())
    }

    fn submit(&self) {
        let mut ui = self.ui.lock();
        // The browser blocks submission of the required input.
        if ui.input.is_empty() {
            return;
        }

        let mut store = self.store.lock();
        store.events.push(format!("ui:submit:{}", ui.input));
        if store.contains(&ui.input) {
            ui.alert = Some(DUPLICATE_TASK_ALERT.to_string());
            ui.alert_polls_left = ALERT_RENDER_POLLS;
        } else {
            store.tasks.push(Task::pending(ui.input.clone()));
            store.ui_submissions += 1;
            ui.input.clear();
        }
    }
}

#[async_trait]
impl BrowserDriver for FakeBrowser {
    async fn goto(&self, url: &str) -> E2eResult<()> {
        self.store.lock().events.push(format!("ui:goto:{}", url));
        let mut ui = self.ui.lock();
        *ui = UiState::default();
        ui.page_open = true;
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> E2eResult<()> {
        self.ensure_open()?;
        if *locator != locators::input_task_name() {
            return Err(Self::no_match(locator));
        }
        self.ui.lock().input = value.to_string();
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> E2eResult<()> {
        self.ensure_open()?;
        if *locator == locators::create_button() {
            self.submit();
            return Ok(());
        }

        if let Some(name) = self.row_for(locator, locators::toggle_button) {
            let mut store = self.store.lock();
            store.events.push(format!("ui:toggle:{}", name));
            if let Some(task) = store.tasks.iter_mut().find(|t| t.name == name) {
                task.is_done = !task.is_done;
            }
            return Ok(());
        }

        if let Some(name) = self.row_for(locator, locators::delete_button) {
            let mut store = self.store.lock();
            store.events.push(format!("ui:remove:{}", name));
            store.tasks.retain(|t| t.name != name);
            return Ok(());
        }

        Err(Self::no_match(locator))
    }

    async fn count(&self, locator: &Locator) -> E2eResult<usize> {
        self.ensure_open()?;
        if *locator == locators::task_rows() {
            return Ok(self.store.lock().tasks.len());
        }

        let controls: [fn(&str) -> Locator; 3] = [
            locators::toggle_button,
            locators::delete_button,
            locators::task_text,
        ];
        let store = self.store.lock();
        Ok(store
            .tasks
            .iter()
            .filter(|t| controls.iter().any(|control| control(&t.name) == *locator))
            .count())
    }

    async fn inner_texts(&self, locator: &Locator) -> E2eResult<Vec<String>> {
        self.ensure_open()?;
        if *locator == locators::task_rows() {
            return Ok(self.store.lock().tasks.iter().map(|t| t.name.clone()).collect());
        }
        if *locator == locators::alert() {
            let ui = self.ui.lock();
            return Ok(ui.alert.iter().cloned().collect());
        }
        Err(Self::no_match(locator))
    }

    async fn css_value(&self, locator: &Locator, property: &str) -> E2eResult<Option<String>> {
        self.ensure_open()?;
        if property != "text-decoration-line" {
            return Ok(Some("normal".to_string()));
        }
        let store = self.store.lock();
        Ok(store
            .tasks
            .iter()
            .find(|t| locators::task_text(&t.name) == *locator)
            .map(|t| if t.is_done { "line-through" } else { "none" }.to_string()))
    }

    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool> {
        self.ensure_open()?;
        if *locator != locators::alert() {
            return Ok(self.count(locator).await? > 0);
        }

        let mut ui = self.ui.lock();
        if ui.alert.is_none() {
            return Ok(false);
        }
        if ui.alert_polls_left > 0 {
            ui.alert_polls_left -= 1;
            return Ok(false);
        }
        Ok(true)
    }

    async fn validation_message(&self, locator: &Locator) -> E2eResult<String> {
        self.ensure_open()?;
        if *locator != locators::input_task_name() {
            return Err(Self::no_match(locator));
        }
        // Live validity of the required input, as `validationMessage` reports it
        if self.ui.lock().input.is_empty() {
            Ok(REQUIRED_FIELD_MESSAGE.to_string())
        } else {
            Ok(String::new())
        }
    }

    async fn screenshot(&self, path: &Path) -> E2eResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, b"fake screenshot")?;
        Ok(())
    }

    async fn close(&self) -> E2eResult<()> {
        self.store.lock().events.push("ui:close".to_string());
        self.ui.lock().page_open = false;
        Ok(())
    }
}

/// Hands out fake sessions over one store
pub struct FakeSessions {
    store: SharedStore,
    pub opened: Arc<AtomicUsize>,
}

impl FakeSessions {
    pub fn new(backend: &FakeBackend) -> Self {
        Self {
            store: backend.store.clone(),
            opened: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl SessionFactory for FakeSessions {
    async fn open(&self, _scenario: &str) -> E2eResult<Box<dyn BrowserDriver>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeBrowser::new(self.store.clone())))
    }
}

/// Fast waits, fake backend, output under `output_dir`
pub fn runner_config(backend: &FakeBackend, output_dir: &Path) -> RunnerConfig {
    let mut config = RunnerConfig::default();
    config.api = backend.api_config();
    config.playwright.base_url = "http://board.test/".to_string();
    config.playwright.screenshot_dir = output_dir.join("screenshots");
    config.wait = fast_wait();
    config.output_dir = PathBuf::from(output_dir);
    config.ready_timeout_ms = 2_000;
    config
}

pub fn fast_wait() -> WaitConfig {
    WaitConfig {
        timeout_ms: 1_000,
        poll_interval_ms: 10,
    }
}
