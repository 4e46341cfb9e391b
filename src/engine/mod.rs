//! The daily-report domain.
//!
//! Pure computations (progress, streak, trend, motivation) take report
//! history as arguments. Mutating operations (carry-over, task and goal
//! edits) are written against the [`persistence::ReportStore`] trait.

pub mod carryover;
pub mod dashboard;
pub mod model;
pub mod motivation;
pub mod persistence;
pub mod progress;
pub mod streak;
pub mod tasks;

pub use carryover::{
    BacklogPolicy, PendingCarryOver, ScanOptions, apply_pending, discard_candidates,
    execute_carry_over, scan_for_carry_over,
};
pub use dashboard::{Dashboard, build_dashboard};
pub use model::{
    CarryOverCandidate, ConditionScore, DailyReport, Goal, GoalId, NewGoal, NewTask, Priority,
    ProgressRate, ReportId, Task, TaskCategory, TaskId, UserId,
};
pub use persistence::{MemoryReportStore, ReportStore};
