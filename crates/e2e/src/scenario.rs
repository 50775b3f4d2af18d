//! Scenario definitions and the name-scoped reconciliation each one starts with

use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::api::TaskApi;
use crate::error::{E2eError, E2eResult};
use crate::fixture::{Task, TaskFixtures};
use crate::page::TaskBoard;

/// Backend state a scenario needs before the board is opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// Leave the backend alone
    None,

    /// No task with this name exists
    Absent(String),

    /// Exactly this task exists, freshly created through the API
    Seeded(Task),
}

impl Precondition {
    /// Bring the backend to this state.
    ///
    /// The delete always runs first so leftovers from earlier runs never leak
    /// into the scenario. A failed seed is returned as is and never retried.
    pub async fn apply(&self, api: &TaskApi) -> E2eResult<()> {
        match self {
            Precondition::None => Ok(()),
            Precondition::Absent(name) => api.delete_task_by_name(name).await,
            Precondition::Seeded(task) => {
                api.delete_task_by_name(&task.name).await?;
                api.create_task(task).await
            }
        }
    }

    /// Task name the precondition owns
    pub fn task_name(&self) -> Option<&str> {
        match self {
            Precondition::None => None,
            Precondition::Absent(name) => Some(name),
            Precondition::Seeded(task) => Some(&task.name),
        }
    }
}

/// Everything a scenario body works with
pub struct ScenarioContext {
    pub api: TaskApi,
    pub board: TaskBoard,
    pub fixtures: Arc<TaskFixtures>,
}

impl ScenarioContext {
    /// Fail unless the backend holds a task named `name`
    pub async fn expect_persisted(&self, name: &str) -> E2eResult<Task> {
        self.api.find_task(name).await?.ok_or_else(|| {
            E2eError::assertion("task to be persisted", name, "<absent from API>")
        })
    }

    /// Fail if the backend still holds a task named `name`
    pub async fn expect_not_persisted(&self, name: &str) -> E2eResult<()> {
        match self.api.find_task(name).await? {
            None => Ok(()),
            Some(task) => Err(E2eError::assertion(
                "task to be gone from the API",
                "<absent>",
                format!("{:?}", task),
            )),
        }
    }
}

/// Fail with both values unless they are equal
pub fn ensure_eq<T>(expectation: &str, expected: T, observed: T) -> E2eResult<()>
where
    T: PartialEq + fmt::Debug,
{
    if expected == observed {
        debug!("{}: {:?}", expectation, observed);
        Ok(())
    } else {
        Err(E2eError::assertion(
            expectation,
            format!("{:?}", expected),
            format!("{:?}", observed),
        ))
    }
}

pub type ScenarioFn = for<'a> fn(&'a ScenarioContext) -> BoxFuture<'a, E2eResult<()>>;

/// One independent test case
#[derive(Clone, Copy)]
pub struct Scenario {
    pub name: &'static str,
    pub tags: &'static [&'static str],

    /// Backend state to establish before the board opens
    pub precondition: fn(&TaskFixtures) -> Precondition,

    pub body: ScenarioFn,
}

impl Scenario {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(&tag)
    }
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .finish()
    }
}
