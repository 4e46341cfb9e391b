//! Greeting, motivation line and badges derived from streak and progress.

use crate::engine::model::ProgressRate;
use crate::engine::streak::{Comparison, ComparisonKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotivationSummary {
    pub greeting: String,
    pub motivation: String,
    pub badges: Vec<String>,
}

struct Rule {
    threshold: u32,
    badge: &'static str,
    message: &'static str,
}

// Highest threshold first; the first rule that matches wins its category.
const STREAK_RULES: &[Rule] = &[
    Rule {
        threshold: 7,
        badge: "Week Warrior",
        message: "A full week of reports. Keep the rhythm going!",
    },
    Rule {
        threshold: 5,
        badge: "Five-Day Flow",
        message: "Five days in a row. You're building a real habit.",
    },
    Rule {
        threshold: 3,
        badge: "Three-Day Spark",
        message: "Three days straight. Momentum is on your side.",
    },
    Rule {
        threshold: 1,
        badge: "Showed Up",
        message: "You showed up today. That's how streaks start.",
    },
];

const WEEKLY_RULES: &[Rule] = &[
    Rule {
        threshold: 80,
        badge: "Goal Crusher",
        message: "Over 80% of this week's work is done. Outstanding.",
    },
    Rule {
        threshold: 60,
        badge: "On Track",
        message: "You're well on track this week.",
    },
    Rule {
        threshold: 40,
        badge: "Building Momentum",
        message: "Solid progress this week. Keep pushing.",
    },
];

const IMPROVED_BADGE: &str = "Rising Star";
const IMPROVED_MESSAGE: &str = "You finished more than yesterday. Nice climb!";
const DEFAULT_MESSAGE: &str = "Every task counts. Pick one and start small.";

fn first_match(rules: &'static [Rule], value: u32) -> Option<&'static Rule> {
    rules.iter().find(|rule| value >= rule.threshold)
}

/// Project streak, weekly progress and the day-over-day comparison into
/// display text.
///
/// Badges accumulate across categories in the order streak, weekly
/// progress, improvement. The motivation line takes the single
/// highest-priority match: streak, then improvement, then weekly progress,
/// then a default.
pub fn build_summary(
    streak: u32,
    weekly_progress: ProgressRate,
    comparison: &Comparison,
    display_name: &str,
) -> MotivationSummary {
    let name = match display_name.trim() {
        "" => "there",
        trimmed => trimmed,
    };
    let greeting = if streak >= 1 {
        format!("Welcome back, {}!", name)
    } else {
        format!("Good to see you, {}!", name)
    };

    let streak_rule = first_match(STREAK_RULES, streak);
    let weekly_rule = first_match(WEEKLY_RULES, u32::from(weekly_progress.value()));
    let improved = comparison.kind == ComparisonKind::Improved;

    let mut badges = Vec::new();
    if let Some(rule) = streak_rule {
        badges.push(rule.badge.to_string());
    }
    if let Some(rule) = weekly_rule {
        badges.push(rule.badge.to_string());
    }
    if improved {
        badges.push(IMPROVED_BADGE.to_string());
    }

    let motivation = streak_rule
        .map(|r| r.message)
        .or(improved.then_some(IMPROVED_MESSAGE))
        .or(weekly_rule.map(|r| r.message))
        .unwrap_or(DEFAULT_MESSAGE)
        .to_string();

    MotivationSummary {
        greeting,
        motivation,
        badges,
    }
}
