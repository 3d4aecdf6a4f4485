//! Pipeline definition and run-state types.

use crate::error::{Error, Result};
use crate::ids::{PipelineId, PolicyId};
use serde::{Deserialize, Serialize};

/// A named, schedulable unit grouping one or more policies to run against
/// cloud accounts. Each policy carries its own owning account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: PipelineId,
    pub name: String,
    /// Policies executed in list order on every run.
    pub policies: Vec<PolicyId>,
    /// Regions the pipeline executes in; the first is handed to the engine.
    pub regions: Vec<String>,
    pub schedule: ScheduleSpec,
    pub enabled: bool,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub run_status: RunStatus,
    /// Epoch seconds of the last terminal transition.
    #[serde(default)]
    pub last_run_time: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Unknown,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

/// Five-field cron schedule. Each field is either a literal value or `*`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSpec {
    pub minute: String,
    pub hour: String,
    pub day_of_month: String,
    pub month: String,
    pub day_of_week: String,
}

impl ScheduleSpec {
    pub fn new(
        minute: impl Into<String>,
        hour: impl Into<String>,
        day_of_month: impl Into<String>,
        month: impl Into<String>,
        day_of_week: impl Into<String>,
    ) -> Self {
        Self {
            minute: minute.into(),
            hour: hour.into(),
            day_of_month: day_of_month.into(),
            month: month.into(),
            day_of_week: day_of_week.into(),
        }
    }

    /// Standard 5-field cron expression: minute hour day-of-month month
    /// day-of-week.
    pub fn to_cron_expression(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.minute, self.hour, self.day_of_month, self.month, self.day_of_week
        )
    }

    /// Inverse of [`to_cron_expression`](Self::to_cron_expression).
    pub fn from_cron_expression(expr: &str) -> Result<Self> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(Error::InvalidSchedule {
                expression: expr.to_string(),
                reason: format!("expected 5 fields, got {}", fields.len()),
            });
        }
        Ok(Self::new(fields[0], fields[1], fields[2], fields[3], fields[4]))
    }

    /// Reject malformed field values before they reach the cron engine.
    pub fn validate(&self) -> Result<()> {
        self.check_field("minute", &self.minute, 0, 59)?;
        self.check_field("hour", &self.hour, 0, 23)?;
        self.check_field("day-of-month", &self.day_of_month, 1, 31)?;
        self.check_field("month", &self.month, 1, 12)?;
        self.check_field("day-of-week", &self.day_of_week, 0, 6)?;
        Ok(())
    }

    fn check_field(&self, name: &str, value: &str, min: u32, max: u32) -> Result<()> {
        if value == "*" {
            return Ok(());
        }
        match value.parse::<u32>() {
            Ok(n) if n >= min && n <= max => Ok(()),
            _ => Err(Error::InvalidSchedule {
                expression: self.to_cron_expression(),
                reason: format!("{name} field '{value}' not '*' or {min}..={max}"),
            }),
        }
    }
}
