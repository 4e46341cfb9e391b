//! Task and goal mutations.
//!
//! Only today's report accepts edits. Any change that touches a
//! goal-linked task recomputes that goal through the same store handle, so
//! the goal reads the write that caused it.

use crate::core::error::DaybookError;
use crate::engine::model::{
    ConditionScore, DailyReport, Goal, GoalId, NewGoal, NewTask, ProgressRate, Task, TaskId, UserId,
};
use crate::engine::persistence::ReportStore;
use crate::engine::progress::compute_goal_progress;
use chrono::NaiveDate;
use tracing::{debug, info};

/// Recompute a goal's progress from its linked tasks and store it.
pub fn recompute_goal_progress<S: ReportStore + ?Sized>(
    store: &mut S,
    goal_id: &GoalId,
) -> Result<ProgressRate, DaybookError> {
    let linked = store.tasks_for_goal(goal_id)?;
    let progress = compute_goal_progress(&linked);
    store.upsert_goal_progress(goal_id, progress)?;
    debug!(goal = %goal_id, tasks = linked.len(), %progress, "goal progress recomputed");
    Ok(progress)
}

fn require_goal<S: ReportStore + ?Sized>(
    store: &S,
    user: &UserId,
    goal_id: &GoalId,
) -> Result<Goal, DaybookError> {
    match store.get_goal(goal_id)? {
        Some(goal) if &goal.user_id == user => Ok(goal),
        _ => Err(DaybookError::NotFound(format!("goal {}", goal_id))),
    }
}

/// Load a task together with its report, refusing tasks in closed reports.
fn open_task<S: ReportStore + ?Sized>(
    store: &S,
    task_id: &TaskId,
    today: NaiveDate,
) -> Result<(Task, DailyReport), DaybookError> {
    let task = store
        .get_task(task_id)?
        .ok_or_else(|| DaybookError::NotFound(format!("task {}", task_id)))?;
    let report = store
        .get_report_by_id(&task.daily_report_id)?
        .ok_or_else(|| DaybookError::NotFound(format!("report {}", task.daily_report_id)))?;
    if report.is_closed(today) {
        return Err(DaybookError::ValidationError(format!(
            "task {} belongs to the closed report of {}",
            task_id, report.report_date
        )));
    }
    Ok((task, report))
}

/// Append a task to today's report, creating the report if needed.
pub fn add_task<S: ReportStore + ?Sized>(
    store: &mut S,
    user: &UserId,
    today: NaiveDate,
    new_task: NewTask,
) -> Result<Task, DaybookError> {
    if let Some(goal_id) = &new_task.goal_id {
        require_goal(&*store, user, goal_id)?;
    }
    let report = store.get_or_create_report(user, today)?;
    let task = new_task.into_task(&report.id)?;
    store.insert_task(&task)?;
    if let Some(goal_id) = &task.goal_id {
        recompute_goal_progress(store, goal_id)?;
    }
    info!(user = %user, task = %task.id, %today, "task added");
    Ok(task)
}

pub fn update_task_progress<S: ReportStore + ?Sized>(
    store: &mut S,
    task_id: &TaskId,
    progress: ProgressRate,
    today: NaiveDate,
) -> Result<Task, DaybookError> {
    let (mut task, _) = open_task(&*store, task_id, today)?;
    task.progress_rate = progress;
    store.update_task(&task)?;
    if let Some(goal_id) = &task.goal_id {
        recompute_goal_progress(store, goal_id)?;
    }
    Ok(task)
}

/// Set or clear a task's goal. Both the previous and the new goal are
/// recomputed.
pub fn link_task_goal<S: ReportStore + ?Sized>(
    store: &mut S,
    task_id: &TaskId,
    goal_id: Option<GoalId>,
    today: NaiveDate,
) -> Result<Task, DaybookError> {
    let (mut task, report) = open_task(&*store, task_id, today)?;
    if let Some(new_goal) = &goal_id {
        require_goal(&*store, &report.user_id, new_goal)?;
    }
    let previous = std::mem::replace(&mut task.goal_id, goal_id);
    store.update_task(&task)?;
    if let Some(old) = &previous {
        recompute_goal_progress(store, old)?;
    }
    if let Some(new) = &task.goal_id {
        if previous.as_ref() != Some(new) {
            recompute_goal_progress(store, new)?;
        }
    }
    Ok(task)
}

pub fn create_goal<S: ReportStore + ?Sized>(
    store: &mut S,
    user: &UserId,
    new_goal: NewGoal,
) -> Result<Goal, DaybookError> {
    let goal = new_goal.into_goal(user)?;
    store.insert_goal(&goal)?;
    info!(user = %user, goal = %goal.id, "goal created");
    Ok(goal)
}

/// Delete a goal. Linked tasks survive with their link cleared; their ids
/// are returned.
pub fn delete_goal<S: ReportStore + ?Sized>(
    store: &mut S,
    goal_id: &GoalId,
) -> Result<Vec<TaskId>, DaybookError> {
    let unlinked: Vec<TaskId> = store
        .tasks_for_goal(goal_id)?
        .into_iter()
        .map(|t| t.id)
        .collect();
    store.delete_goal(goal_id)?;
    info!(goal = %goal_id, unlinked = unlinked.len(), "goal deleted");
    Ok(unlinked)
}

/// Record the day's condition score. Only today's report is editable.
pub fn set_condition_score<S: ReportStore + ?Sized>(
    store: &mut S,
    user: &UserId,
    date: NaiveDate,
    score: Option<ConditionScore>,
    today: NaiveDate,
) -> Result<DailyReport, DaybookError> {
    if date != today {
        return Err(DaybookError::ValidationError(format!(
            "condition score can only be set for today ({}), not {}",
            today, date
        )));
    }
    let report = store.get_or_create_report(user, date)?;
    store.set_condition_score(&report.id, score)?;
    store
        .get_report_by_id(&report.id)?
        .ok_or_else(|| DaybookError::NotFound(format!("report {}", report.id)))
}
