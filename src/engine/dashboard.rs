//! Everything the "today" screen needs, computed in one read-only pass.

use crate::core::config::DaybookConfig;
use crate::core::error::DaybookError;
use crate::engine::carryover::{PendingCarryOver, ScanOptions, scan_for_carry_over};
use crate::engine::model::{DailyReport, Goal, ProgressRate, UserId};
use crate::engine::motivation::{MotivationSummary, build_summary};
use crate::engine::persistence::ReportStore;
use crate::engine::progress::{WEEK_WINDOW_DAYS, compute_report_progress, compute_weekly_progress};
use crate::engine::streak::{
    Comparison, TrendPoint, calculate_report_streak, compare_yesterday_today, completion_trend,
};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub user: UserId,
    pub today: NaiveDate,
    pub pending: PendingCarryOver,
    pub today_report: Option<DailyReport>,
    pub today_progress: ProgressRate,
    pub weekly_progress: ProgressRate,
    pub streak: u32,
    pub comparison: Comparison,
    pub trend: Vec<TrendPoint>,
    pub goals: Vec<Goal>,
    pub summary: MotivationSummary,
}

/// Scan for carry-over candidates and derive progress, streak, trend and
/// motivation for `today`. Does not create today's report.
pub fn build_dashboard<S: ReportStore + ?Sized>(
    store: &S,
    user: &UserId,
    today: NaiveDate,
    display_name: &str,
    config: &DaybookConfig,
) -> Result<Dashboard, DaybookError> {
    let pending = scan_for_carry_over(store, user, today, ScanOptions::from(config))?;

    let window = u64::from(config.history_days).max(WEEK_WINDOW_DAYS);
    let from = today
        .checked_sub_days(Days::new(window - 1))
        .unwrap_or(NaiveDate::MIN);
    let history = store.get_reports_between(user, from, today)?;

    let today_report = history.iter().find(|r| r.report_date == today).cloned();
    let yesterday = today.pred_opt();
    let yesterday_tasks = history
        .iter()
        .find(|r| Some(r.report_date) == yesterday)
        .map(|r| r.tasks.as_slice())
        .unwrap_or_default();
    let today_tasks = today_report
        .as_ref()
        .map(|r| r.tasks.as_slice())
        .unwrap_or_default();

    let today_progress = compute_report_progress(today_tasks);
    let weekly_progress = compute_weekly_progress(&history, today);
    let streak = calculate_report_streak(&history, today);
    let comparison = compare_yesterday_today(yesterday_tasks, today_tasks);
    let trend = completion_trend(&history, today, config.history_days);
    let summary = build_summary(streak, weekly_progress, &comparison, display_name);
    let goals = store.list_goals(user)?;

    Ok(Dashboard {
        user: user.clone(),
        today,
        pending,
        today_report,
        today_progress,
        weekly_progress,
        streak,
        comparison,
        trend,
        goals,
        summary,
    })
}
