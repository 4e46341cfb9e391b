//! Value types for tasks, daily reports and goals.
//!
//! Numeric ranges are enforced at construction, so every `Task` or `Goal`
//! in memory already satisfies them.

use crate::core::error::DaybookError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn generate() -> Self {
                Self(format!("{}_{}", $prefix, Ulid::new()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(TaskId, "task");
string_id!(ReportId, "report");
string_id!(GoalId, "goal");
string_id!(
    /// Opaque owner key. Authentication lives outside this crate.
    UserId,
    "user"
);

/// Completion percentage in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
pub struct ProgressRate(u8);

impl ProgressRate {
    pub const ZERO: ProgressRate = ProgressRate(0);
    pub const COMPLETE: ProgressRate = ProgressRate(100);

    /// Clamp any integer into range. Used wherever the value is derived.
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(0, 100) as u8)
    }

    /// Reject out-of-range input. Used at user-input boundaries.
    pub fn parse_strict(value: i64) -> Result<Self, DaybookError> {
        if (0..=100).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(DaybookError::ValidationError(format!(
                "progress must be between 0 and 100, got {}",
                value
            )))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_complete(self) -> bool {
        self.0 == 100
    }
}

impl From<i64> for ProgressRate {
    fn from(value: i64) -> Self {
        Self::clamped(value)
    }
}

impl From<ProgressRate> for u8 {
    fn from(value: ProgressRate) -> Self {
        value.0
    }
}

impl fmt::Display for ProgressRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Priority {
    pub fn level(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Priority {
    type Error = DaybookError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Priority::High),
            2 => Ok(Priority::Medium),
            3 => Ok(Priority::Low),
            other => Err(DaybookError::ValidationError(format!(
                "priority must be 1, 2 or 3, got {}",
                other
            ))),
        }
    }
}

impl From<Priority> for u8 {
    fn from(value: Priority) -> Self {
        value.level()
    }
}

impl FromStr for Priority {
    type Err = DaybookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "high" => Ok(Priority::High),
            "2" | "medium" => Ok(Priority::Medium),
            "3" | "low" => Ok(Priority::Low),
            other => Err(DaybookError::ValidationError(format!(
                "invalid priority '{}': use 1-3 or high/medium/low",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskCategory {
    /// Recurring work that carries across days.
    Continuous,
    ShortTerm,
}

impl TaskCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskCategory::Continuous => "continuous",
            TaskCategory::ShortTerm => "short-term",
        }
    }
}

impl FromStr for TaskCategory {
    type Err = DaybookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "continuous" => Ok(TaskCategory::Continuous),
            "short-term" => Ok(TaskCategory::ShortTerm),
            other => Err(DaybookError::ValidationError(format!(
                "invalid category '{}': use continuous or short-term",
                other
            ))),
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Self-reported condition for a day, 1 (worst) to 10 (best).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ConditionScore(u8);

impl ConditionScore {
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for ConditionScore {
    type Error = DaybookError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (1..=10).contains(&value) {
            Ok(Self(value))
        } else {
            Err(DaybookError::ValidationError(format!(
                "condition score must be between 1 and 10, got {}",
                value
            )))
        }
    }
}

impl From<ConditionScore> for u8 {
    fn from(value: ConditionScore) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub category: TaskCategory,
    pub priority: Priority,
    pub progress_rate: ProgressRate,
    pub estimated_time_minutes: Option<u32>,
    /// Back-reference to the owning report. Lookup only.
    pub daily_report_id: ReportId,
    pub goal_id: Option<GoalId>,
}

impl Task {
    pub fn is_complete(&self) -> bool {
        self.progress_rate.is_complete()
    }
}

/// Input for creating a task. Ids and the owning report are assigned by the engine.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub category: TaskCategory,
    pub priority: Priority,
    pub progress_rate: ProgressRate,
    pub estimated_time_minutes: Option<u32>,
    pub goal_id: Option<GoalId>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            category: TaskCategory::ShortTerm,
            priority: Priority::Medium,
            progress_rate: ProgressRate::ZERO,
            estimated_time_minutes: None,
            goal_id: None,
        }
    }

    pub fn into_task(self, report_id: &ReportId) -> Result<Task, DaybookError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(DaybookError::ValidationError(
                "task title must not be empty".into(),
            ));
        }
        Ok(Task {
            id: TaskId::generate(),
            title,
            description: self.description,
            category: self.category,
            priority: self.priority,
            progress_rate: self.progress_rate,
            estimated_time_minutes: self.estimated_time_minutes,
            daily_report_id: report_id.clone(),
            goal_id: self.goal_id,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyReport {
    pub id: ReportId,
    pub user_id: UserId,
    pub report_date: NaiveDate,
    pub condition_score: Option<ConditionScore>,
    /// Tasks in display order. The report owns them exclusively.
    pub tasks: Vec<Task>,
}

impl DailyReport {
    pub fn new(user_id: UserId, report_date: NaiveDate) -> Self {
        Self {
            id: ReportId::generate(),
            user_id,
            report_date,
            condition_score: None,
            tasks: Vec::new(),
        }
    }

    /// A report is closed once its date is strictly before `today`.
    pub fn is_closed(&self, today: NaiveDate) -> bool {
        self.report_date < today
    }

    pub fn task_ids(&self) -> Vec<TaskId> {
        self.tasks.iter().map(|t| t.id.clone()).collect()
    }

    pub fn contains_task(&self, id: &TaskId) -> bool {
        self.tasks.iter().any(|t| &t.id == id)
    }

    pub fn find_task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    pub fn incomplete_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| !t.is_complete())
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_complete()).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub user_id: UserId,
    pub title: String,
    /// Derived from linked tasks; written only by goal recomputation.
    pub progress_rate: ProgressRate,
    pub target_date: Option<NaiveDate>,
    pub priority: Priority,
}

#[derive(Debug, Clone)]
pub struct NewGoal {
    pub title: String,
    pub target_date: Option<NaiveDate>,
    pub priority: Priority,
}

impl NewGoal {
    pub fn into_goal(self, user_id: &UserId) -> Result<Goal, DaybookError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(DaybookError::ValidationError(
                "goal title must not be empty".into(),
            ));
        }
        Ok(Goal {
            id: GoalId::generate(),
            user_id: user_id.clone(),
            title,
            progress_rate: ProgressRate::ZERO,
            target_date: self.target_date,
            priority: self.priority,
        })
    }
}

/// An incomplete task from a closed report, offered for migration.
/// Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarryOverCandidate {
    pub task: Task,
    pub origin_date: NaiveDate,
}

impl CarryOverCandidate {
    pub fn origin_report_id(&self) -> &ReportId {
        &self.task.daily_report_id
    }
}
