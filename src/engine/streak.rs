//! Reporting streaks and day-over-day completion trends.

use crate::engine::model::{DailyReport, ProgressRate, Task};
use crate::engine::progress::compute_report_progress;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Streaks are counted over at most this many days, today included.
pub const STREAK_WINDOW_DAYS: u32 = 7;

/// Consecutive days with a report, walking back from `today`.
///
/// A missing report for `today` gives 0. The result never exceeds
/// [`STREAK_WINDOW_DAYS`].
pub fn calculate_report_streak(reports: &[DailyReport], today: NaiveDate) -> u32 {
    let dates: HashSet<NaiveDate> = reports.iter().map(|r| r.report_date).collect();
    let mut streak = 0;
    let mut day = today;
    while streak < STREAK_WINDOW_DAYS && dates.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonKind {
    Improved,
    Same,
    Decreased,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    pub kind: ComparisonKind,
    /// Absolute difference in completed-task counts.
    pub difference: u32,
}

fn completed(tasks: &[Task]) -> u32 {
    tasks.iter().filter(|t| t.is_complete()).count() as u32
}

/// Compare how many tasks reached 100% yesterday versus today.
pub fn compare_yesterday_today(yesterday_tasks: &[Task], today_tasks: &[Task]) -> Comparison {
    let before = completed(yesterday_tasks);
    let after = completed(today_tasks);
    let kind = match after.cmp(&before) {
        std::cmp::Ordering::Greater => ComparisonKind::Improved,
        std::cmp::Ordering::Equal => ComparisonKind::Same,
        std::cmp::Ordering::Less => ComparisonKind::Decreased,
    };
    Comparison {
        kind,
        difference: after.abs_diff(before),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub has_report: bool,
    pub progress: ProgressRate,
    pub completed: u32,
    pub total: u32,
    /// Completed count minus the previous day's. 0 for the first point.
    pub completed_delta: i64,
}

/// One point per day for the `days` days ending at `today`, oldest first.
pub fn completion_trend(reports: &[DailyReport], today: NaiveDate, days: u32) -> Vec<TrendPoint> {
    if days == 0 {
        return Vec::new();
    }
    let by_date: BTreeMap<NaiveDate, &DailyReport> =
        reports.iter().map(|r| (r.report_date, r)).collect();
    let start = today
        .checked_sub_days(Days::new(u64::from(days - 1)))
        .unwrap_or(NaiveDate::MIN);

    let mut points = Vec::with_capacity(days as usize);
    let mut previous: Option<u32> = None;
    for date in start.iter_days().take_while(|d| *d <= today) {
        let point = match by_date.get(&date) {
            Some(report) => {
                let done = completed(&report.tasks);
                TrendPoint {
                    date,
                    has_report: true,
                    progress: compute_report_progress(&report.tasks),
                    completed: done,
                    total: report.tasks.len() as u32,
                    completed_delta: previous.map_or(0, |p| i64::from(done) - i64::from(p)),
                }
            }
            None => TrendPoint {
                date,
                has_report: false,
                progress: ProgressRate::ZERO,
                completed: 0,
                total: 0,
                completed_delta: previous.map_or(0, |p| -i64::from(p)),
            },
        };
        previous = Some(point.completed);
        points.push(point);
    }
    points
}
