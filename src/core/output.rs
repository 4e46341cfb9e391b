//! Text rendering for CLI surfaces.
//!
//! Renderers return `String`s so they can be asserted on; colour is applied
//! through `colored` and honours its global override.

use crate::engine::carryover::PendingCarryOver;
use crate::engine::dashboard::Dashboard;
use crate::engine::model::{DailyReport, Goal, ProgressRate, Task};
use crate::engine::streak::ComparisonKind;
use colored::Colorize;
use std::fmt::Write;

const BAR_WIDTH: usize = 20;
const TITLE_CHARS: usize = 48;

/// Collapse newlines/extra whitespace and bound length for terminal display.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}

/// `[#########...........]  45%`
pub fn progress_bar(rate: ProgressRate) -> String {
    let filled = usize::from(rate.value()) * BAR_WIDTH / 100;
    format!(
        "[{}{}] {:>4}",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        rate.to_string()
    )
}

fn task_line(task: &Task) -> String {
    let marker = if task.is_complete() {
        "●".bright_green()
    } else {
        "○".bright_yellow()
    };
    let mut line = format!(
        "  {} {} {} [{} p{}]",
        marker,
        compact_line(&task.title, TITLE_CHARS).bright_white(),
        task.progress_rate.to_string().bright_cyan(),
        task.category,
        task.priority.level()
    );
    if let Some(minutes) = task.estimated_time_minutes {
        let _ = write!(line, " ~{}m", minutes);
    }
    let _ = write!(line, "  {}", task.id.as_str().bright_black());
    line
}

pub fn render_report(report: &DailyReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {}",
        "▸".bright_cyan(),
        format!("Report {}", report.report_date).bold()
    );
    if let Some(score) = report.condition_score {
        let _ = writeln!(out, "  condition {}/10", score.value());
    }
    if report.tasks.is_empty() {
        let _ = writeln!(out, "  {}", "no tasks yet".bright_black());
    }
    for task in &report.tasks {
        let _ = writeln!(out, "{}", task_line(task));
    }
    out
}

pub fn render_candidates(pending: &PendingCarryOver) -> String {
    let mut out = String::new();
    if pending.is_empty() {
        let _ = writeln!(out, "{} nothing to carry over", "✓".bright_green());
        return out;
    }
    let _ = writeln!(
        out,
        "{} {} unfinished task(s) can be carried into {}",
        "▸".bright_yellow(),
        pending.len(),
        pending.detected_on
    );
    for candidate in &pending.candidates {
        let _ = writeln!(
            out,
            "{}  {}",
            task_line(&candidate.task),
            format!("from {}", candidate.origin_date).bright_black()
        );
    }
    out
}

pub fn render_goals(goals: &[Goal]) -> String {
    let mut out = String::new();
    if goals.is_empty() {
        let _ = writeln!(out, "  {}", "no goals".bright_black());
    }
    for goal in goals {
        let due = goal
            .target_date
            .map(|d| format!(" due {}", d))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "  {} {} p{}{}  {}",
            progress_bar(goal.progress_rate),
            compact_line(&goal.title, TITLE_CHARS).bright_white(),
            goal.priority.level(),
            due,
            goal.id.as_str().bright_black()
        );
    }
    out
}

pub fn render_dashboard(dash: &Dashboard) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", dash.summary.greeting.bright_magenta().bold());
    let _ = writeln!(out, "  {}", dash.summary.motivation);
    if !dash.summary.badges.is_empty() {
        let _ = writeln!(out, "  {}", dash.summary.badges.join(" · ").bright_yellow());
    }
    let _ = writeln!(out);

    let delta = match dash.comparison.kind {
        ComparisonKind::Improved => format!("+{}", dash.comparison.difference).bright_green(),
        ComparisonKind::Same => "±0".normal(),
        ComparisonKind::Decreased => format!("-{}", dash.comparison.difference).bright_red(),
    };
    let _ = writeln!(out, "  today   {}", progress_bar(dash.today_progress));
    let _ = writeln!(out, "  week    {}", progress_bar(dash.weekly_progress));
    let _ = writeln!(
        out,
        "  streak  {} day(s)   completed vs yesterday {}",
        dash.streak, delta
    );
    let _ = writeln!(out);

    out.push_str(&render_candidates(&dash.pending));
    match &dash.today_report {
        Some(report) => out.push_str(&render_report(report)),
        None => {
            let _ = writeln!(out, "{} no report for {} yet", "▸".bright_cyan(), dash.today);
        }
    }

    if !dash.trend.is_empty() {
        let _ = writeln!(out, "{} {}", "▸".bright_cyan(), "Trend".bold());
        for point in &dash.trend {
            let row = if point.has_report {
                format!(
                    "{}/{} done  {}",
                    point.completed, point.total, point.progress
                )
            } else {
                "no report".to_string()
            };
            let _ = writeln!(out, "  {}  {}", point.date, row);
        }
    }

    let _ = writeln!(out, "{} {}", "▸".bright_cyan(), "Goals".bold());
    out.push_str(&render_goals(&dash.goals));
    out
}
