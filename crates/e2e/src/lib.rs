//! Task board E2E harness
//!
//! This crate drives the task board through a real browser while using the
//! task API to put the backend into a known state before each scenario:
//! - Reconciles the task a scenario owns (delete by name, optionally re-seed)
//! - Controls Playwright through a long-lived Node bridge per session
//! - Models the board as a page object with bounded-retry assertions
//! - Runs independent scenarios in parallel and reports expected vs observed
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Scenario Runner (Rust)                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioRunner                                             │
//! │    ├── Precondition::apply(api)      (reset by task name)   │
//! │    ├── SessionFactory::open() -> Box<dyn BrowserDriver>     │
//! │    ├── TaskBoard::go()                                      │
//! │    └── Scenario::body(ctx) -> ScenarioResult                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TaskBoard (page object)           TaskApi (oracle)         │
//! │    ├── create / toggle / remove      ├── delete_task_by_name│
//! │    ├── should_have_text              ├── create_task        │
//! │    ├── should_be_done                └── find_task          │
//! │    ├── should_not_exist                                     │
//! │    └── alert_have_text                                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod driver;
pub mod error;
pub mod fixture;
pub mod page;
pub mod playwright;
pub mod runner;
pub mod scenario;
pub mod suite;
pub mod wait;

pub use api::TaskApi;
pub use error::{E2eError, E2eResult};
pub use fixture::{Task, TaskFixtures};
pub use page::{CreateOutcome, TaskBoard};
pub use runner::{ScenarioRunner, SessionFactory};
pub use scenario::{Precondition, Scenario, ScenarioContext};
