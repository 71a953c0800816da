use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::auth::{Profile, ProfileRef};
use crate::error::AppError;

pub const MAX_TRAINEES_PER_TRAINER: i64 = 4;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub category: String,
    pub default_sets: i64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbExercise {
    pub id: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub default_sets: Option<i64>,
    pub description: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<DbExercise> for Exercise {
    fn from(exercise: DbExercise) -> Self {
        Self {
            id: exercise.id.unwrap_or_default(),
            name: exercise.name.unwrap_or_default(),
            category: exercise.category.unwrap_or_default(),
            default_sets: exercise.default_sets.unwrap_or(3),
            description: exercise.description,
            created_at: exercise.created_at.unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Deserialize, Validate, Clone)]
pub struct NewExercise {
    #[validate(length(min = 1, max = 100, message = "Exercise name is required"))]
    pub name: String,

    #[validate(length(min = 1, max = 50, message = "Category is required"))]
    pub category: String,

    #[validate(range(min = 1, max = 20, message = "Default sets must be between 1 and 20"))]
    #[serde(default = "default_sets")]
    pub default_sets: i64,

    #[validate(length(max = 500, message = "Description is too long"))]
    pub description: Option<String>,
}

fn default_sets() -> i64 {
    3
}

/// The `{id, name, category}` projection joined onto plans and logs.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ExerciseRef {
    pub id: String,
    pub name: String,
    pub category: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TrainerAssignment {
    pub id: String,
    pub trainer_id: String,
    pub trainee_id: String,
    pub assigned_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbTrainerAssignment {
    pub id: Option<String>,
    pub trainer_id: Option<String>,
    pub trainee_id: Option<String>,
    pub assigned_at: Option<DateTime<Utc>>,
}

impl From<DbTrainerAssignment> for TrainerAssignment {
    fn from(assignment: DbTrainerAssignment) -> Self {
        Self {
            id: assignment.id.unwrap_or_default(),
            trainer_id: assignment.trainer_id.unwrap_or_default(),
            trainee_id: assignment.trainee_id.unwrap_or_default(),
            assigned_at: assignment.assigned_at.unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TrainerContact {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// A trainee's own assignment, with the trainer's contact details.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AssignmentWithTrainer {
    #[serde(flatten)]
    pub assignment: TrainerAssignment,
    pub trainer: TrainerContact,
}

/// One of a trainer's assignments, with the trainee's profile.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AssignmentWithTrainee {
    #[serde(flatten)]
    pub assignment: TrainerAssignment,
    pub trainee: Profile,
}

/// Assignment joined with the profile on the other side of it.
#[derive(sqlx::FromRow, Clone)]
pub struct DbAssignmentWithProfile {
    pub id: Option<String>,
    pub trainer_id: Option<String>,
    pub trainee_id: Option<String>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub profile_id: Option<String>,
    pub profile_name: Option<String>,
    pub profile_email: Option<String>,
    pub profile_role: Option<String>,
    pub profile_created_at: Option<DateTime<Utc>>,
}

impl DbAssignmentWithProfile {
    fn split(self) -> (TrainerAssignment, crate::auth::DbProfile) {
        let assignment = TrainerAssignment::from(DbTrainerAssignment {
            id: self.id,
            trainer_id: self.trainer_id,
            trainee_id: self.trainee_id,
            assigned_at: self.assigned_at,
        });
        let profile = crate::auth::DbProfile {
            id: self.profile_id,
            name: self.profile_name,
            email: self.profile_email,
            role: self.profile_role,
            created_at: self.profile_created_at,
        };
        (assignment, profile)
    }
}

impl From<DbAssignmentWithProfile> for AssignmentWithTrainer {
    fn from(row: DbAssignmentWithProfile) -> Self {
        let (assignment, trainer) = row.split();
        Self {
            assignment,
            trainer: TrainerContact {
                id: trainer.id.unwrap_or_default(),
                name: trainer.name.unwrap_or_default(),
                email: trainer.email.unwrap_or_default(),
            },
        }
    }
}

impl TryFrom<DbAssignmentWithProfile> for AssignmentWithTrainee {
    type Error = AppError;

    fn try_from(row: DbAssignmentWithProfile) -> Result<Self, Self::Error> {
        let (assignment, trainee) = row.split();
        Ok(Self {
            assignment,
            trainee: Profile::try_from(trainee)?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TrainerAvailability {
    pub id: String,
    pub name: String,
    pub email: String,
    pub trainee_count: i64,
    pub is_available: bool,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbTrainerAvailability {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub trainee_count: Option<i64>,
}

impl From<DbTrainerAvailability> for TrainerAvailability {
    fn from(trainer: DbTrainerAvailability) -> Self {
        let trainee_count = trainer.trainee_count.unwrap_or_default();
        Self {
            id: trainer.id.unwrap_or_default(),
            name: trainer.name.unwrap_or_default(),
            email: trainer.email.unwrap_or_default(),
            trainee_count,
            is_available: trainee_count < MAX_TRAINEES_PER_TRAINER,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Pending,
    Done,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Pending => "pending",
            PlanStatus::Done => "done",
        }
    }
}

impl FromStr for PlanStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PlanStatus::Pending),
            "done" => Ok(PlanStatus::Done),
            _ => Err(AppError::Validation(format!("Unknown workout status: {}", s))),
        }
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WorkoutPlan {
    pub id: String,
    pub trainee_id: String,
    pub exercise_id: String,
    pub assigned_sets: i64,
    pub assigned_reps: i64,
    pub assigned_weight: f64,
    pub status: PlanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub exercise: Option<ExerciseRef>,
    pub trainee: Option<ProfileRef>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbWorkoutPlan {
    pub id: Option<String>,
    pub trainee_id: Option<String>,
    pub exercise_id: Option<String>,
    pub assigned_sets: Option<i64>,
    pub assigned_reps: Option<i64>,
    pub assigned_weight: Option<f64>,
    pub status: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub exercise_name: Option<String>,
    pub exercise_category: Option<String>,
    pub trainee_name: Option<String>,
}

impl TryFrom<DbWorkoutPlan> for WorkoutPlan {
    type Error = AppError;

    fn try_from(plan: DbWorkoutPlan) -> Result<Self, Self::Error> {
        let exercise_id = plan.exercise_id.unwrap_or_default();
        let trainee_id = plan.trainee_id.unwrap_or_default();
        let created_at = plan.created_at.unwrap_or_else(Utc::now);

        Ok(Self {
            id: plan.id.unwrap_or_default(),
            exercise: joined_exercise(&exercise_id, plan.exercise_name, plan.exercise_category),
            trainee: plan.trainee_name.map(|name| ProfileRef {
                id: trainee_id.clone(),
                name,
            }),
            trainee_id,
            exercise_id,
            assigned_sets: plan.assigned_sets.unwrap_or_default(),
            assigned_reps: plan.assigned_reps.unwrap_or_default(),
            assigned_weight: plan.assigned_weight.unwrap_or_default(),
            status: plan.status.unwrap_or_default().parse()?,
            created_at,
            updated_at: plan.updated_at.unwrap_or(created_at),
        })
    }
}

#[derive(Debug, Deserialize, Serialize, Validate, Clone)]
pub struct NewWorkoutPlan {
    #[validate(length(min = 1, message = "Trainee is required"))]
    pub trainee_id: String,

    #[validate(length(min = 1, message = "Exercise is required"))]
    pub exercise_id: String,

    #[validate(range(min = 1, max = 20, message = "Sets must be between 1 and 20"))]
    pub assigned_sets: i64,

    #[validate(range(min = 1, max = 100, message = "Reps must be between 1 and 100"))]
    pub assigned_reps: i64,

    #[validate(range(min = 0.0, max = 1000.0, message = "Weight must be between 0 and 1000"))]
    pub assigned_weight: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionLog {
    pub id: String,
    pub trainee_id: String,
    pub exercise_id: String,
    pub date_completed: NaiveDate,
    pub actual_weight: f64,
    pub rating: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub exercise: Option<ExerciseRef>,
    pub trainee: Option<ProfileRef>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbSessionLog {
    pub id: Option<String>,
    pub trainee_id: Option<String>,
    pub exercise_id: Option<String>,
    pub date_completed: Option<NaiveDate>,
    pub actual_weight: Option<f64>,
    pub rating: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    pub exercise_name: Option<String>,
    pub exercise_category: Option<String>,
    pub trainee_name: Option<String>,
}

impl From<DbSessionLog> for SessionLog {
    fn from(log: DbSessionLog) -> Self {
        let exercise_id = log.exercise_id.unwrap_or_default();
        let trainee_id = log.trainee_id.unwrap_or_default();
        let created_at = log.created_at.unwrap_or_else(Utc::now);

        Self {
            id: log.id.unwrap_or_default(),
            exercise: joined_exercise(&exercise_id, log.exercise_name, log.exercise_category),
            trainee: log.trainee_name.map(|name| ProfileRef {
                id: trainee_id.clone(),
                name,
            }),
            trainee_id,
            exercise_id,
            date_completed: log
                .date_completed
                .unwrap_or_else(|| created_at.date_naive()),
            actual_weight: log.actual_weight.unwrap_or_default(),
            rating: log.rating,
            created_at,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Validate, Clone)]
pub struct NewSessionLog {
    #[validate(length(min = 1, message = "Trainee is required"))]
    pub trainee_id: String,

    #[validate(length(min = 1, message = "Exercise is required"))]
    pub exercise_id: String,

    #[validate(range(min = 0.0, max = 1000.0, message = "Weight must be between 0 and 1000"))]
    pub actual_weight: f64,

    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i64>,
}

fn joined_exercise(
    exercise_id: &str,
    name: Option<String>,
    category: Option<String>,
) -> Option<ExerciseRef> {
    name.map(|name| ExerciseRef {
        id: exercise_id.to_string(),
        name,
        category: category.unwrap_or_default(),
    })
}
