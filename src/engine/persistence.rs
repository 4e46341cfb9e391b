//! The storage port the engine is written against, plus an in-memory
//! implementation.
//!
//! Reads take `&self`, writes take `&mut self`. Holding the only mutable
//! handle is what serializes carry-over per user inside one process.
//! Implementations never retry; the engine never retries either.

use crate::core::error::DaybookError;
use crate::engine::model::{
    ConditionScore, DailyReport, Goal, GoalId, ProgressRate, ReportId, Task, TaskId, UserId,
};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap, HashSet};

pub trait ReportStore {
    fn get_report(&self, user: &UserId, date: NaiveDate)
    -> Result<Option<DailyReport>, DaybookError>;

    fn get_report_by_id(&self, report_id: &ReportId) -> Result<Option<DailyReport>, DaybookError>;

    /// Up to `limit` reports dated strictly before `date`, newest first.
    fn get_reports_before(
        &self,
        user: &UserId,
        date: NaiveDate,
        limit: usize,
    ) -> Result<Vec<DailyReport>, DaybookError>;

    /// Reports dated within `[from, to]`, newest first.
    fn get_reports_between(
        &self,
        user: &UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyReport>, DaybookError>;

    /// Fails with `Conflict` if the user already has a report for `date`.
    fn create_report(&mut self, user: &UserId, date: NaiveDate)
    -> Result<DailyReport, DaybookError>;

    fn set_condition_score(
        &mut self,
        report_id: &ReportId,
        score: Option<ConditionScore>,
    ) -> Result<(), DaybookError>;

    fn get_task(&self, task_id: &TaskId) -> Result<Option<Task>, DaybookError>;

    /// Appends the task to the report named by `task.daily_report_id`.
    fn insert_task(&mut self, task: &Task) -> Result<(), DaybookError>;

    /// Overwrites the task's fields. The owning report never changes here.
    fn update_task(&mut self, task: &Task) -> Result<(), DaybookError>;

    /// Move a task to another report and overwrite its progress.
    fn reassign_task(
        &mut self,
        task_id: &TaskId,
        new_report_id: &ReportId,
        new_progress: ProgressRate,
    ) -> Result<(), DaybookError>;

    /// Undo a reassignment: move the task into `report_id` at `index`
    /// (clamped to the end of the report) and overwrite its progress.
    fn restore_task(
        &mut self,
        task_id: &TaskId,
        report_id: &ReportId,
        progress: ProgressRate,
        index: usize,
    ) -> Result<(), DaybookError>;

    fn tasks_for_goal(&self, goal_id: &GoalId) -> Result<Vec<Task>, DaybookError>;

    fn get_goal(&self, goal_id: &GoalId) -> Result<Option<Goal>, DaybookError>;

    fn list_goals(&self, user: &UserId) -> Result<Vec<Goal>, DaybookError>;

    fn insert_goal(&mut self, goal: &Goal) -> Result<(), DaybookError>;

    /// Removes the goal and clears the link on every task that pointed at it.
    fn delete_goal(&mut self, goal_id: &GoalId) -> Result<(), DaybookError>;

    fn upsert_goal_progress(
        &mut self,
        goal_id: &GoalId,
        progress: ProgressRate,
    ) -> Result<(), DaybookError>;

    /// Record that the user declined to carry these tasks forward.
    /// Recording the same task twice is not an error.
    fn dismiss_tasks(
        &mut self,
        user: &UserId,
        task_ids: &[TaskId],
        on: NaiveDate,
    ) -> Result<(), DaybookError>;

    fn dismissed_task_ids(&self, user: &UserId) -> Result<HashSet<TaskId>, DaybookError>;

    fn get_or_create_report(
        &mut self,
        user: &UserId,
        date: NaiveDate,
    ) -> Result<DailyReport, DaybookError> {
        match self.get_report(user, date)? {
            Some(report) => Ok(report),
            None => self.create_report(user, date),
        }
    }
}

/// `ReportStore` over plain maps. Used by tests and embedders that keep
/// state elsewhere.
#[derive(Debug, Default)]
pub struct MemoryReportStore {
    reports: BTreeMap<(UserId, NaiveDate), DailyReport>,
    report_keys: HashMap<ReportId, (UserId, NaiveDate)>,
    goals: BTreeMap<GoalId, Goal>,
    dismissals: HashMap<UserId, HashMap<TaskId, NaiveDate>>,
    reassign_calls: usize,
    fail_reassign_at: Option<usize>,
    goal_progress_calls: usize,
    fail_goal_progress_at: Option<usize>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `n`-th `reassign_task` call from now (1-based) fail with
    /// `PersistenceUnavailable`.
    pub fn fail_reassign_on_call(&mut self, n: usize) {
        self.fail_reassign_at = Some(self.reassign_calls + n);
    }

    pub fn reassign_calls(&self) -> usize {
        self.reassign_calls
    }

    /// Same as [`MemoryReportStore::fail_reassign_on_call`] for
    /// `upsert_goal_progress`.
    pub fn fail_goal_progress_on_call(&mut self, n: usize) {
        self.fail_goal_progress_at = Some(self.goal_progress_calls + n);
    }

    fn take_task(&mut self, task_id: &TaskId) -> Result<Task, DaybookError> {
        for report in self.reports.values_mut() {
            if let Some(pos) = report.tasks.iter().position(|t| &t.id == task_id) {
                return Ok(report.tasks.remove(pos));
            }
        }
        Err(DaybookError::NotFound(format!("task {}", task_id)))
    }

    fn report_mut(&mut self, report_id: &ReportId) -> Result<&mut DailyReport, DaybookError> {
        let key = self
            .report_keys
            .get(report_id)
            .ok_or_else(|| DaybookError::NotFound(format!("report {}", report_id)))?;
        self.reports
            .get_mut(key)
            .ok_or_else(|| DaybookError::NotFound(format!("report {}", report_id)))
    }

    fn find_task_mut(&mut self, task_id: &TaskId) -> Option<&mut Task> {
        self.reports
            .values_mut()
            .flat_map(|r| r.tasks.iter_mut())
            .find(|t| &t.id == task_id)
    }
}

impl ReportStore for MemoryReportStore {
    fn get_report(
        &self,
        user: &UserId,
        date: NaiveDate,
    ) -> Result<Option<DailyReport>, DaybookError> {
        Ok(self.reports.get(&(user.clone(), date)).cloned())
    }

    fn get_report_by_id(&self, report_id: &ReportId) -> Result<Option<DailyReport>, DaybookError> {
        Ok(self
            .report_keys
            .get(report_id)
            .and_then(|key| self.reports.get(key))
            .cloned())
    }

    fn get_reports_before(
        &self,
        user: &UserId,
        date: NaiveDate,
        limit: usize,
    ) -> Result<Vec<DailyReport>, DaybookError> {
        Ok(self
            .reports
            .range((user.clone(), NaiveDate::MIN)..(user.clone(), date))
            .rev()
            .take(limit)
            .map(|(_, r)| r.clone())
            .collect())
    }

    fn get_reports_between(
        &self,
        user: &UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyReport>, DaybookError> {
        if from > to {
            return Ok(Vec::new());
        }
        Ok(self
            .reports
            .range((user.clone(), from)..=(user.clone(), to))
            .rev()
            .map(|(_, r)| r.clone())
            .collect())
    }

    fn create_report(
        &mut self,
        user: &UserId,
        date: NaiveDate,
    ) -> Result<DailyReport, DaybookError> {
        let key = (user.clone(), date);
        if self.reports.contains_key(&key) {
            return Err(DaybookError::Conflict(format!(
                "report for {} on {} already exists",
                user, date
            )));
        }
        let report = DailyReport::new(user.clone(), date);
        self.report_keys.insert(report.id.clone(), key.clone());
        self.reports.insert(key, report.clone());
        Ok(report)
    }

    fn set_condition_score(
        &mut self,
        report_id: &ReportId,
        score: Option<ConditionScore>,
    ) -> Result<(), DaybookError> {
        self.report_mut(report_id)?.condition_score = score;
        Ok(())
    }

    fn get_task(&self, task_id: &TaskId) -> Result<Option<Task>, DaybookError> {
        Ok(self
            .reports
            .values()
            .flat_map(|r| r.tasks.iter())
            .find(|t| &t.id == task_id)
            .cloned())
    }

    fn insert_task(&mut self, task: &Task) -> Result<(), DaybookError> {
        if self.get_task(&task.id)?.is_some() {
            return Err(DaybookError::Conflict(format!("task {} already exists", task.id)));
        }
        self.report_mut(&task.daily_report_id)?.tasks.push(task.clone());
        Ok(())
    }

    fn update_task(&mut self, task: &Task) -> Result<(), DaybookError> {
        let stored = self
            .find_task_mut(&task.id)
            .ok_or_else(|| DaybookError::NotFound(format!("task {}", task.id)))?;
        let report_id = stored.daily_report_id.clone();
        *stored = task.clone();
        stored.daily_report_id = report_id;
        Ok(())
    }

    fn reassign_task(
        &mut self,
        task_id: &TaskId,
        new_report_id: &ReportId,
        new_progress: ProgressRate,
    ) -> Result<(), DaybookError> {
        self.reassign_calls += 1;
        if self.fail_reassign_at == Some(self.reassign_calls) {
            self.fail_reassign_at = None;
            return Err(DaybookError::PersistenceUnavailable(format!(
                "injected failure reassigning {}",
                task_id
            )));
        }

        // Resolve the target first so a bad id leaves the task where it was.
        self.report_mut(new_report_id)?;
        let mut task = self.take_task(task_id)?;
        task.daily_report_id = new_report_id.clone();
        task.progress_rate = new_progress;
        self.report_mut(new_report_id)?.tasks.push(task);
        Ok(())
    }

    fn restore_task(
        &mut self,
        task_id: &TaskId,
        report_id: &ReportId,
        progress: ProgressRate,
        index: usize,
    ) -> Result<(), DaybookError> {
        self.report_mut(report_id)?;
        let mut task = self.take_task(task_id)?;
        task.daily_report_id = report_id.clone();
        task.progress_rate = progress;
        let tasks = &mut self.report_mut(report_id)?.tasks;
        let at = index.min(tasks.len());
        tasks.insert(at, task);
        Ok(())
    }

    fn tasks_for_goal(&self, goal_id: &GoalId) -> Result<Vec<Task>, DaybookError> {
        Ok(self
            .reports
            .values()
            .flat_map(|r| r.tasks.iter())
            .filter(|t| t.goal_id.as_ref() == Some(goal_id))
            .cloned()
            .collect())
    }

    fn get_goal(&self, goal_id: &GoalId) -> Result<Option<Goal>, DaybookError> {
        Ok(self.goals.get(goal_id).cloned())
    }

    fn list_goals(&self, user: &UserId) -> Result<Vec<Goal>, DaybookError> {
        Ok(self
            .goals
            .values()
            .filter(|g| &g.user_id == user)
            .cloned()
            .collect())
    }

    fn insert_goal(&mut self, goal: &Goal) -> Result<(), DaybookError> {
        if self.goals.contains_key(&goal.id) {
            return Err(DaybookError::Conflict(format!("goal {} already exists", goal.id)));
        }
        self.goals.insert(goal.id.clone(), goal.clone());
        Ok(())
    }

    fn delete_goal(&mut self, goal_id: &GoalId) -> Result<(), DaybookError> {
        if self.goals.remove(goal_id).is_none() {
            return Err(DaybookError::NotFound(format!("goal {}", goal_id)));
        }
        for task in self.reports.values_mut().flat_map(|r| r.tasks.iter_mut()) {
            if task.goal_id.as_ref() == Some(goal_id) {
                task.goal_id = None;
            }
        }
        Ok(())
    }

    fn upsert_goal_progress(
        &mut self,
        goal_id: &GoalId,
        progress: ProgressRate,
    ) -> Result<(), DaybookError> {
        self.goal_progress_calls += 1;
        if self.fail_goal_progress_at == Some(self.goal_progress_calls) {
            self.fail_goal_progress_at = None;
            return Err(DaybookError::PersistenceUnavailable(format!(
                "injected failure updating goal {}",
                goal_id
            )));
        }
        let goal = self
            .goals
            .get_mut(goal_id)
            .ok_or_else(|| DaybookError::NotFound(format!("goal {}", goal_id)))?;
        goal.progress_rate = progress;
        Ok(())
    }

    fn dismiss_tasks(
        &mut self,
        user: &UserId,
        task_ids: &[TaskId],
        on: NaiveDate,
    ) -> Result<(), DaybookError> {
        let entry = self.dismissals.entry(user.clone()).or_default();
        for id in task_ids {
            entry.entry(id.clone()).or_insert(on);
        }
        Ok(())
    }

    fn dismissed_task_ids(&self, user: &UserId) -> Result<HashSet<TaskId>, DaybookError> {
        Ok(self
            .dismissals
            .get(user)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default())
    }
}
