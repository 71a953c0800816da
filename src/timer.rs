//! Workout timer state and the elapsed-time arithmetic over it.
//!
//! A trainee has at most one timer row. Pauses and breaks accumulate into
//! `total_paused_seconds` when the timer resumes; a stop deletes the row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Active,
    Paused,
    Break,
    Stopped,
}

impl TimerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerStatus::Active => "active",
            TimerStatus::Paused => "paused",
            TimerStatus::Break => "break",
            TimerStatus::Stopped => "stopped",
        }
    }

    /// Paused and break both stop the clock.
    pub fn is_suspended(&self) -> bool {
        matches!(self, TimerStatus::Paused | TimerStatus::Break)
    }
}

impl FromStr for TimerStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TimerStatus::Active),
            "paused" => Ok(TimerStatus::Paused),
            "break" => Ok(TimerStatus::Break),
            "stopped" => Ok(TimerStatus::Stopped),
            _ => Err(AppError::Validation(format!("Unknown timer status: {}", s))),
        }
    }
}

impl fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkoutTimer {
    pub id: String,
    pub trainee_id: String,
    pub status: TimerStatus,
    pub started_at: DateTime<Utc>,
    pub paused_at: Option<DateTime<Utc>>,
    pub total_paused_seconds: i64,
    pub break_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbWorkoutTimer {
    pub id: Option<String>,
    pub trainee_id: Option<String>,
    pub status: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub total_paused_seconds: Option<i64>,
    pub break_reason: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<DbWorkoutTimer> for WorkoutTimer {
    type Error = AppError;

    fn try_from(timer: DbWorkoutTimer) -> Result<Self, Self::Error> {
        let started_at = timer
            .started_at
            .ok_or_else(|| AppError::Internal("Timer row without start time".to_string()))?;

        Ok(Self {
            id: timer.id.unwrap_or_default(),
            trainee_id: timer.trainee_id.unwrap_or_default(),
            status: timer.status.unwrap_or_default().parse()?,
            started_at,
            paused_at: timer.paused_at,
            total_paused_seconds: timer.total_paused_seconds.unwrap_or_default(),
            break_reason: timer.break_reason,
            created_at: timer.created_at.unwrap_or(started_at),
            updated_at: timer.updated_at.unwrap_or(started_at),
        })
    }
}

/// Whole seconds from `earlier` to `later`, floored.
pub fn whole_seconds_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
    (later - earlier).num_milliseconds().div_euclid(1000)
}

/// Active seconds on the clock at `now`. Absent and stopped timers read 0.
pub fn elapsed_seconds(timer: Option<&WorkoutTimer>, now: DateTime<Utc>) -> i64 {
    let Some(timer) = timer else {
        return 0;
    };

    if timer.status == TimerStatus::Stopped {
        return 0;
    }

    let mut elapsed = whole_seconds_between(timer.started_at, now) - timer.total_paused_seconds;

    if timer.status.is_suspended() {
        if let Some(paused_at) = timer.paused_at {
            elapsed -= whole_seconds_between(paused_at, now);
        }
    }

    elapsed.max(0)
}

/// The pause total after resuming at `now`. The total never shrinks, and a
/// timer without `paused_at` keeps its total.
pub fn resume_paused_total(timer: &WorkoutTimer, now: DateTime<Utc>) -> i64 {
    match timer.paused_at {
        Some(paused_at) => {
            timer.total_paused_seconds + whole_seconds_between(paused_at, now).max(0)
        }
        None => timer.total_paused_seconds,
    }
}

/// Field values a status change writes back to the timer row.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerUpdate {
    pub status: TimerStatus,
    pub paused_at: Option<DateTime<Utc>>,
    pub total_paused_seconds: i64,
    pub break_reason: Option<String>,
}

/// Computes the row update for moving `timer` to `target`. Stopping is a
/// delete and has no update.
pub fn transition(
    timer: &WorkoutTimer,
    target: TimerStatus,
    break_reason: Option<String>,
    now: DateTime<Utc>,
) -> Result<TimerUpdate, AppError> {
    match target {
        TimerStatus::Paused | TimerStatus::Break => {
            Ok(TimerUpdate {
                status: target,
                paused_at: Some(now),
                total_paused_seconds: timer.total_paused_seconds,
                break_reason: break_reason.or_else(|| timer.break_reason.clone()),
            })
        }
        TimerStatus::Active => Ok(TimerUpdate {
            status: TimerStatus::Active,
            paused_at: None,
            total_paused_seconds: resume_paused_total(timer, now),
            break_reason: None,
        }),
        TimerStatus::Stopped => Err(AppError::Validation(
            "A stopped timer is removed, not updated".to_string(),
        )),
    }
}

/// `HH:MM:SS`, zero padded. Hours are not wrapped.
pub fn format_clock(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// One evaluation of a trainee's clock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimerTick {
    pub trainee_id: String,
    pub status: TimerStatus,
    pub elapsed_seconds: i64,
    pub display: String,
    pub break_reason: Option<String>,
    pub at: DateTime<Utc>,
}

impl TimerTick {
    pub fn evaluate(trainee_id: &str, timer: Option<&WorkoutTimer>, now: DateTime<Utc>) -> Self {
        let elapsed = elapsed_seconds(timer, now);

        Self {
            trainee_id: trainee_id.to_string(),
            status: timer.map_or(TimerStatus::Stopped, |timer| timer.status),
            elapsed_seconds: elapsed,
            display: format_clock(elapsed),
            break_reason: timer.and_then(|timer| timer.break_reason.clone()),
            at: now,
        }
    }
}
