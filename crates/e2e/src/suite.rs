//! The task board suite

use futures::future::BoxFuture;

use crate::error::E2eResult;
use crate::fixture::TaskFixtures;
use crate::page::{DUPLICATE_TASK_ALERT, REQUIRED_FIELD_MESSAGE};
use crate::scenario::{ensure_eq, Precondition, Scenario, ScenarioContext};

/// Every scenario of the suite, in no meaningful order
pub fn task_scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "creates a new task",
            tags: &["create", "smoke"],
            precondition: |f| Precondition::Absent(f.success.name.clone()),
            body: creates_a_new_task,
        },
        Scenario {
            name: "rejects a duplicate task",
            tags: &["create"],
            precondition: |f| Precondition::Seeded(f.duplicate.clone()),
            body: rejects_a_duplicate_task,
        },
        Scenario {
            name: "requires the task name",
            tags: &["create", "validation"],
            precondition: no_precondition,
            body: requires_the_task_name,
        },
        Scenario {
            name: "marks a task as done",
            tags: &["update"],
            precondition: |f| Precondition::Seeded(f.update.clone()),
            body: marks_a_task_as_done,
        },
        Scenario {
            name: "removes a task",
            tags: &["delete"],
            precondition: |f| Precondition::Seeded(f.delete.clone()),
            body: removes_a_task,
        },
    ]
}

fn no_precondition(_: &TaskFixtures) -> Precondition {
    Precondition::None
}

fn creates_a_new_task(ctx: &ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let task = &ctx.fixtures.success;

        ctx.board.create(task).await?;

        ctx.board.should_have_text(&task.name).await?;
        let stored = ctx.expect_persisted(&task.name).await?;
        ensure_eq("stored completion state", task.is_done, stored.is_done)
    })
}

fn rejects_a_duplicate_task(ctx: &ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let task = &ctx.fixtures.duplicate;

        ctx.board.create(task).await?;

        ctx.board.alert_have_text(DUPLICATE_TASK_ALERT).await?;
        let rows = ctx.board.exact_row_count(&task.name).await?;
        ensure_eq("rows for the duplicated name", 1, rows)
    })
}

fn requires_the_task_name(ctx: &ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let task = &ctx.fixtures.required;

        ctx.board.create(task).await?;

        let message = ctx.board.input_task_name().validation_message().await?;
        ensure_eq("validation message", REQUIRED_FIELD_MESSAGE, message.as_str())?;
        let rows = ctx.board.exact_row_count(&task.name).await?;
        ensure_eq("rows without a name", 0, rows)
    })
}

fn marks_a_task_as_done(ctx: &ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let task = &ctx.fixtures.update;

        ctx.board.toggle(&task.name).await?;

        ctx.board.should_be_done(&task.name).await
    })
}

fn removes_a_task(ctx: &ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let task = &ctx.fixtures.delete;

        ctx.board.remove(&task.name).await?;

        ctx.board.should_not_exist(&task.name).await?;
        ctx.expect_not_persisted(&task.name).await
    })
}
