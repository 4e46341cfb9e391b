//! Carry-over of unfinished tasks from closed reports into the current day.
//!
//! Detection is a pure scan over report history. Migration re-reads the
//! origin reports, moves every candidate to the target report with
//! progress reset to 0, recomputes the affected goals, and undoes
//! everything it already did if any step fails.

use crate::core::config::DaybookConfig;
use crate::core::error::DaybookError;
use crate::engine::model::{CarryOverCandidate, DailyReport, GoalId, ProgressRate, TaskId, UserId};
use crate::engine::persistence::ReportStore;
use crate::engine::tasks::recompute_goal_progress;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, error, info, warn};

/// Which closed reports may contribute carry-over candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BacklogPolicy {
    /// Only the newest closed report that still has unfinished tasks.
    #[default]
    MostRecent,
    /// Every closed report within the scan limit, newest first.
    Accumulate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub scan_limit: usize,
    pub backlog: BacklogPolicy,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::from(&DaybookConfig::default())
    }
}

impl From<&DaybookConfig> for ScanOptions {
    fn from(config: &DaybookConfig) -> Self {
        Self {
            scan_limit: config.scan_limit,
            backlog: config.backlog,
        }
    }
}

/// Candidates awaiting a decision. Owned by the caller between scan and
/// resolution; the engine keeps no copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCarryOver {
    pub user: UserId,
    pub detected_on: NaiveDate,
    pub candidates: Vec<CarryOverCandidate>,
}

impl PendingCarryOver {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn task_ids(&self) -> Vec<TaskId> {
        self.candidates.iter().map(|c| c.task.id.clone()).collect()
    }
}

/// Unfinished, undismissed tasks from reports dated before `today`.
///
/// Reports are visited newest first. Under [`BacklogPolicy::MostRecent`]
/// the scan stops at the first report with any unfinished task, even when
/// every one of them was dismissed, so older backlog never resurfaces.
pub fn detect_candidates(
    report_history: &[DailyReport],
    today: NaiveDate,
    dismissed: &HashSet<TaskId>,
    policy: BacklogPolicy,
) -> Vec<CarryOverCandidate> {
    let mut closed: Vec<&DailyReport> = report_history
        .iter()
        .filter(|r| r.is_closed(today))
        .collect();
    closed.sort_by(|a, b| b.report_date.cmp(&a.report_date));

    let mut candidates = Vec::new();
    for report in closed {
        let mut unfinished = report.incomplete_tasks().peekable();
        if unfinished.peek().is_none() {
            continue;
        }
        candidates.extend(
            unfinished
                .filter(|t| !dismissed.contains(&t.id))
                .map(|t| CarryOverCandidate {
                    task: t.clone(),
                    origin_date: report.report_date,
                }),
        );
        if policy == BacklogPolicy::MostRecent {
            break;
        }
    }
    candidates
}

/// Read recent history from the store and detect candidates for `today`.
pub fn scan_for_carry_over<S: ReportStore + ?Sized>(
    store: &S,
    user: &UserId,
    today: NaiveDate,
    options: ScanOptions,
) -> Result<PendingCarryOver, DaybookError> {
    let history = store.get_reports_before(user, today, options.scan_limit)?;
    let dismissed = store.dismissed_task_ids(user)?;
    let candidates = detect_candidates(&history, today, &dismissed, options.backlog);
    debug!(
        user = %user,
        %today,
        reports = history.len(),
        candidates = candidates.len(),
        "carry-over scan"
    );
    Ok(PendingCarryOver {
        user: user.clone(),
        detected_on: today,
        candidates,
    })
}

fn validate_batch(
    candidates: &[CarryOverCandidate],
    target_date: NaiveDate,
) -> Result<(), DaybookError> {
    let mut seen = HashSet::new();
    for candidate in candidates {
        if candidate.origin_date >= target_date {
            return Err(DaybookError::ValidationError(format!(
                "task {} from {} cannot be carried to {}: carry-over only moves forward",
                candidate.task.id, candidate.origin_date, target_date
            )));
        }
        if !seen.insert(&candidate.task.id) {
            return Err(DaybookError::ValidationError(format!(
                "task {} listed twice in one carry-over",
                candidate.task.id
            )));
        }
    }
    Ok(())
}

/// What the origin reports look like right before the first write.
struct OriginSnapshot {
    /// Index of each candidate inside its origin report.
    slots: HashMap<TaskId, usize>,
    /// Goals the candidates are linked to as stored now.
    goals: BTreeSet<GoalId>,
}

/// Re-read every origin report and fail with `Conflict` if any candidate
/// moved, changed progress, finished or was dismissed since detection.
fn verify_unchanged<S: ReportStore + ?Sized>(
    store: &S,
    user: &UserId,
    candidates: &[CarryOverCandidate],
) -> Result<OriginSnapshot, DaybookError> {
    let dismissed = store.dismissed_task_ids(user)?;
    let mut by_origin: BTreeMap<NaiveDate, Vec<&CarryOverCandidate>> = BTreeMap::new();
    for candidate in candidates {
        by_origin.entry(candidate.origin_date).or_default().push(candidate);
    }

    let mut snapshot = OriginSnapshot {
        slots: HashMap::with_capacity(candidates.len()),
        goals: BTreeSet::new(),
    };
    for (origin_date, group) in by_origin {
        let report = store.get_report(user, origin_date)?.ok_or_else(|| {
            DaybookError::Conflict(format!("origin report {} no longer exists", origin_date))
        })?;
        for candidate in group {
            let task_id = &candidate.task.id;
            if &report.id != candidate.origin_report_id() {
                return Err(DaybookError::Conflict(format!(
                    "origin report {} was replaced since detection",
                    origin_date
                )));
            }
            let slot = report
                .tasks
                .iter()
                .position(|t| &t.id == task_id)
                .ok_or_else(|| {
                    DaybookError::Conflict(format!(
                        "task {} is no longer in the {} report",
                        task_id, origin_date
                    ))
                })?;
            let current = &report.tasks[slot];
            if current.progress_rate != candidate.task.progress_rate || current.is_complete() {
                return Err(DaybookError::Conflict(format!(
                    "task {} changed since detection ({} -> {})",
                    task_id, candidate.task.progress_rate, current.progress_rate
                )));
            }
            if dismissed.contains(task_id) {
                return Err(DaybookError::Conflict(format!(
                    "task {} was dismissed since detection",
                    task_id
                )));
            }
            snapshot.slots.insert(task_id.clone(), slot);
            snapshot.goals.extend(current.goal_id.clone());
        }
    }
    Ok(snapshot)
}

/// Put already-moved tasks back where they came from.
///
/// Restoring in ascending slot order per origin report rebuilds the
/// original task order. Failures here are logged; the caller reports the
/// original error.
fn roll_back<S: ReportStore + ?Sized>(
    store: &mut S,
    moved: &[&CarryOverCandidate],
    slots: &HashMap<TaskId, usize>,
) {
    let mut ordered: Vec<(&CarryOverCandidate, usize)> = moved
        .iter()
        .map(|c| (*c, slots.get(&c.task.id).copied().unwrap_or(usize::MAX)))
        .collect();
    ordered.sort_by_key(|(c, slot)| (c.origin_date, *slot));

    for (candidate, slot) in ordered {
        let restored = store.restore_task(
            &candidate.task.id,
            candidate.origin_report_id(),
            candidate.task.progress_rate,
            slot,
        );
        if let Err(e) = restored {
            error!(
                task = %candidate.task.id,
                origin = %candidate.origin_date,
                error = %e,
                "carry-over rollback failed"
            );
        }
    }
}

/// Move every candidate into the report for `target_date` with progress 0.
///
/// All-or-nothing: on any failure, tasks already moved are put back at
/// their original place and progress before the error is returned. Goal
/// links come from the stored tasks, not from the detection snapshot. The
/// caller's candidate list is only borrowed, so it is still available
/// after a failure.
pub fn execute_carry_over<S: ReportStore + ?Sized>(
    store: &mut S,
    user: &UserId,
    candidates: &[CarryOverCandidate],
    target_date: NaiveDate,
) -> Result<DailyReport, DaybookError> {
    validate_batch(candidates, target_date)?;
    let snapshot = verify_unchanged(&*store, user, candidates)?;

    let target = store.get_or_create_report(user, target_date)?;

    let mut moved: Vec<&CarryOverCandidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if let Err(e) = store.reassign_task(&candidate.task.id, &target.id, ProgressRate::ZERO) {
            warn!(
                task = %candidate.task.id,
                moved = moved.len(),
                error = %e,
                "carry-over failed mid-batch, rolling back"
            );
            roll_back(store, &moved, &snapshot.slots);
            return Err(e);
        }
        moved.push(candidate);
    }

    let goals = &snapshot.goals;
    let mut recomputed: Vec<&GoalId> = Vec::new();
    for goal_id in goals {
        if let Err(e) = recompute_goal_progress(store, goal_id) {
            warn!(goal = %goal_id, error = %e, "goal recompute failed, rolling back carry-over");
            roll_back(store, &moved, &snapshot.slots);
            for done in recomputed {
                if let Err(e) = recompute_goal_progress(store, done) {
                    error!(goal = %done, error = %e, "goal restore failed");
                }
            }
            return Err(e);
        }
        recomputed.push(goal_id);
    }

    info!(
        user = %user,
        target = %target_date,
        tasks = candidates.len(),
        goals = goals.len(),
        "carry-over applied"
    );

    store
        .get_report(user, target_date)?
        .ok_or_else(|| DaybookError::NotFound(format!("report {} vanished", target_date)))
}

/// Execute the pending list and clear it only on success.
pub fn apply_pending<S: ReportStore + ?Sized>(
    store: &mut S,
    pending: &mut PendingCarryOver,
    target_date: NaiveDate,
) -> Result<DailyReport, DaybookError> {
    let report = execute_carry_over(store, &pending.user, &pending.candidates, target_date)?;
    pending.candidates.clear();
    Ok(report)
}

/// Decline every pending candidate. Tasks stay in their closed reports
/// untouched and are skipped by later scans. Calling this again on the
/// emptied list does nothing.
pub fn discard_candidates<S: ReportStore + ?Sized>(
    store: &mut S,
    pending: &mut PendingCarryOver,
    today: NaiveDate,
) -> Result<usize, DaybookError> {
    if pending.is_empty() {
        return Ok(0);
    }
    let ids = pending.task_ids();
    store.dismiss_tasks(&pending.user, &ids, today)?;
    pending.candidates.clear();
    info!(user = %pending.user, tasks = ids.len(), "carry-over candidates discarded");
    Ok(ids.len())
}
