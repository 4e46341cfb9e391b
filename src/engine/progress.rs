//! Report, goal and weekly progress aggregation. Pure functions only.

use crate::engine::model::{DailyReport, ProgressRate, Task};
use chrono::{Days, NaiveDate};

/// Days covered by the weekly window, today included.
pub const WEEK_WINDOW_DAYS: u64 = 7;

/// Mean of the given percentages, rounded half-up. Empty input yields 0.
fn rounded_mean<I>(rates: I) -> ProgressRate
where
    I: IntoIterator<Item = ProgressRate>,
{
    let (sum, count) = rates
        .into_iter()
        .fold((0u64, 0u64), |(sum, count), rate| {
            (sum + u64::from(rate.value()), count + 1)
        });
    if count == 0 {
        return ProgressRate::ZERO;
    }
    // (2*sum + n) / (2*n) == floor(sum/n + 1/2) for non-negative sums.
    ProgressRate::clamped(((2 * sum + count) / (2 * count)) as i64)
}

/// Progress of a daily report: the rounded mean of its tasks' progress.
pub fn compute_report_progress(tasks: &[Task]) -> ProgressRate {
    rounded_mean(tasks.iter().map(|t| t.progress_rate))
}

/// Progress of a goal, from the tasks currently linked to it.
pub fn compute_goal_progress(linked_tasks: &[Task]) -> ProgressRate {
    compute_report_progress(linked_tasks)
}

/// Mean progress over every task in reports dated `[today-6, today]`.
pub fn compute_weekly_progress(reports: &[DailyReport], today: NaiveDate) -> ProgressRate {
    let start = today
        .checked_sub_days(Days::new(WEEK_WINDOW_DAYS - 1))
        .unwrap_or(NaiveDate::MIN);
    rounded_mean(
        reports
            .iter()
            .filter(|r| r.report_date >= start && r.report_date <= today)
            .flat_map(|r| r.tasks.iter().map(|t| t.progress_rate)),
    )
}
