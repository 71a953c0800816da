//! In-process change feed.
//!
//! Every committed mutation publishes a [`ChangeEvent`] on the [`ChangeBus`];
//! bridge subscriptions and SSE streams receive them independently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::sync::broadcast;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Exercises,
    Profiles,
    TrainerTraineeAssignments,
    WorkoutPlans,
    SessionLogs,
    WorkoutTimers,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Exercises => "exercises",
            Table::Profiles => "profiles",
            Table::TrainerTraineeAssignments => "trainer_trainee_assignments",
            Table::WorkoutPlans => "workout_plans",
            Table::SessionLogs => "session_logs",
            Table::WorkoutTimers => "workout_timers",
        }
    }
}

impl FromStr for Table {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exercises" => Ok(Table::Exercises),
            "profiles" => Ok(Table::Profiles),
            "trainer_trainee_assignments" => Ok(Table::TrainerTraineeAssignments),
            "workout_plans" => Ok(Table::WorkoutPlans),
            "session_logs" => Ok(Table::SessionLogs),
            "workout_timers" => Ok(Table::WorkoutTimers),
            _ => Err(AppError::NotFound(format!("Unknown table: {}", s))),
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A row-level change on one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    pub row_id: Option<String>,
    /// The trainee the row belongs to, when the table has one.
    pub trainee_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(table: Table, kind: ChangeKind) -> Self {
        Self {
            table,
            kind,
            row_id: None,
            trainee_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_row(mut self, row_id: impl Into<String>) -> Self {
        self.row_id = Some(row_id.into());
        self
    }

    pub fn for_trainee(mut self, trainee_id: impl Into<String>) -> Self {
        self.trainee_id = Some(trainee_id.into());
        self
    }
}

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug)]
pub struct ChangeBus {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeBus {
    /// When the buffer fills, slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishing with no subscribers drops the event.
    pub fn publish(&self, event: ChangeEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
