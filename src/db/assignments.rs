use chrono::Utc;
use tracing::{info, instrument, warn};

use super::new_id;
use crate::error::AppError;
use crate::models::{
    AssignmentWithTrainee, AssignmentWithTrainer, DbAssignmentWithProfile, DbTrainerAssignment,
    DbTrainerAvailability, MAX_TRAINEES_PER_TRAINER, TrainerAssignment, TrainerAvailability,
};
use crate::realtime::{ChangeEvent, ChangeKind, QueryGroup, QueryKey, Table};
use crate::store::Store;

/// Everything that reads the trainer/trainee relation.
const ROSTER_GROUPS: &[QueryGroup] = &[
    QueryGroup::TrainersAvailability,
    QueryGroup::MyTrainerAssignment,
    QueryGroup::MyTrainees,
    QueryGroup::Trainees,
    QueryGroup::PendingWorkouts,
];

const CAPACITY_EXCEEDED: &str = "trainer_capacity_exceeded";
const ROLE_MISMATCH: &str = "assignment_role_mismatch";

fn map_assignment_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        let message = db_err.message();

        if message.contains(CAPACITY_EXCEEDED) {
            return AppError::Validation(format!(
                "Trainer already has the maximum of {} trainees",
                MAX_TRAINEES_PER_TRAINER
            ));
        }
        if message.contains(ROLE_MISMATCH) {
            return AppError::Validation(
                "Assignments must link a trainer to a trainee".to_string(),
            );
        }
        if db_err.is_unique_violation() {
            return AppError::Conflict("Trainee already has a trainer".to_string());
        }
        if db_err.is_foreign_key_violation() {
            return AppError::NotFound("Trainer not found".to_string());
        }
    }

    AppError::Database(err)
}

#[instrument(skip(store))]
pub async fn get_trainers_with_availability(
    store: &Store,
) -> Result<Vec<TrainerAvailability>, AppError> {
    store
        .cached(QueryKey::group(QueryGroup::TrainersAvailability), || async {
            info!("Getting trainers with availability");
            let rows = sqlx::query_as::<_, DbTrainerAvailability>(
                "SELECT p.id, p.name, p.email, COUNT(a.id) AS trainee_count
                 FROM profiles p
                 LEFT JOIN trainer_trainee_assignments a ON a.trainer_id = p.id
                 WHERE p.role = 'trainer'
                 GROUP BY p.id, p.name, p.email
                 ORDER BY p.name",
            )
            .fetch_all(store.pool())
            .await?;

            Ok(rows.into_iter().map(TrainerAvailability::from).collect())
        })
        .await
}

#[instrument(skip(store))]
pub async fn get_my_trainer_assignment(
    store: &Store,
    trainee_id: &str,
) -> Result<Option<AssignmentWithTrainer>, AppError> {
    store
        .cached(
            QueryKey::scoped(QueryGroup::MyTrainerAssignment, trainee_id),
            || async {
                info!("Getting trainer assignment for trainee");
                let row = sqlx::query_as::<_, DbAssignmentWithProfile>(
                    "SELECT a.id, a.trainer_id, a.trainee_id, a.assigned_at,
                            p.id AS profile_id, p.name AS profile_name, p.email AS profile_email,
                            p.role AS profile_role, p.created_at AS profile_created_at
                     FROM trainer_trainee_assignments a
                     JOIN profiles p ON p.id = a.trainer_id
                     WHERE a.trainee_id = ?",
                )
                .bind(trainee_id)
                .fetch_optional(store.pool())
                .await?;

                Ok(row.map(AssignmentWithTrainer::from))
            },
        )
        .await
}

#[instrument(skip(store))]
pub async fn assign_to_trainer(
    store: &Store,
    trainee_id: &str,
    trainer_id: &str,
) -> Result<TrainerAssignment, AppError> {
    info!("Assigning trainee to trainer");

    let assignment = TrainerAssignment {
        id: new_id(),
        trainer_id: trainer_id.to_string(),
        trainee_id: trainee_id.to_string(),
        assigned_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO trainer_trainee_assignments (id, trainer_id, trainee_id, assigned_at)
         VALUES (?, ?, ?, ?)",
    )
    .bind(&assignment.id)
    .bind(&assignment.trainer_id)
    .bind(&assignment.trainee_id)
    .bind(assignment.assigned_at)
    .execute(store.pool())
    .await
    .map_err(map_assignment_error)?;

    store
        .committed(
            ChangeEvent::new(Table::TrainerTraineeAssignments, ChangeKind::Insert)
                .with_row(&assignment.id)
                .for_trainee(trainee_id),
            ROSTER_GROUPS,
        )
        .await;

    Ok(assignment)
}

#[instrument(skip(store))]
pub async fn get_my_trainees(
    store: &Store,
    trainer_id: &str,
) -> Result<Vec<AssignmentWithTrainee>, AppError> {
    store
        .cached(QueryKey::scoped(QueryGroup::MyTrainees, trainer_id), || async {
            info!("Getting trainees for trainer");
            let rows = sqlx::query_as::<_, DbAssignmentWithProfile>(
                "SELECT a.id, a.trainer_id, a.trainee_id, a.assigned_at,
                        p.id AS profile_id, p.name AS profile_name, p.email AS profile_email,
                        p.role AS profile_role, p.created_at AS profile_created_at
                 FROM trainer_trainee_assignments a
                 JOIN profiles p ON p.id = a.trainee_id
                 WHERE a.trainer_id = ?
                 ORDER BY a.assigned_at DESC",
            )
            .bind(trainer_id)
            .fetch_all(store.pool())
            .await?;

            rows.into_iter().map(AssignmentWithTrainee::try_from).collect()
        })
        .await
}

/// Ids of the trainees currently assigned to `trainer_id`.
pub async fn assigned_trainee_ids(store: &Store, trainer_id: &str) -> Result<Vec<String>, AppError> {
    Ok(get_my_trainees(store, trainer_id)
        .await?
        .into_iter()
        .map(|row| row.assignment.trainee_id)
        .collect())
}

pub async fn trainer_has_trainee(
    store: &Store,
    trainer_id: &str,
    trainee_id: &str,
) -> Result<bool, AppError> {
    Ok(get_my_trainees(store, trainer_id)
        .await?
        .iter()
        .any(|row| row.assignment.trainee_id == trainee_id))
}

/// Deletes one of the calling trainer's assignments.
#[instrument(skip(store))]
pub async fn remove_trainee(
    store: &Store,
    trainer_id: &str,
    assignment_id: &str,
) -> Result<(), AppError> {
    info!("Removing trainee from trainer");

    let trainee_id = sqlx::query_scalar::<_, String>(
        "DELETE FROM trainer_trainee_assignments WHERE id = ? AND trainer_id = ? RETURNING trainee_id",
    )
    .bind(assignment_id)
    .bind(trainer_id)
    .fetch_optional(store.pool())
    .await?;

    let Some(trainee_id) = trainee_id else {
        warn!("Assignment not found for trainer");
        return Err(AppError::NotFound(format!(
            "Assignment {} not found",
            assignment_id
        )));
    };

    store
        .committed(
            ChangeEvent::new(Table::TrainerTraineeAssignments, ChangeKind::Delete)
                .with_row(assignment_id)
                .for_trainee(trainee_id),
            ROSTER_GROUPS,
        )
        .await;

    Ok(())
}

/// Moves a trainee from the calling trainer to another trainer, subject to
/// the receiving trainer's capacity.
#[instrument(skip(store))]
pub async fn transfer_trainee(
    store: &Store,
    from_trainer_id: &str,
    trainee_id: &str,
    to_trainer_id: &str,
) -> Result<TrainerAssignment, AppError> {
    info!("Transferring trainee");

    if from_trainer_id == to_trainer_id {
        return Err(AppError::Validation(
            "Trainee is already assigned to this trainer".to_string(),
        ));
    }

    let row = sqlx::query_as::<_, DbTrainerAssignment>(
        "UPDATE trainer_trainee_assignments
         SET trainer_id = ?, assigned_at = ?
         WHERE trainee_id = ? AND trainer_id = ?
         RETURNING id, trainer_id, trainee_id, assigned_at",
    )
    .bind(to_trainer_id)
    .bind(Utc::now())
    .bind(trainee_id)
    .bind(from_trainer_id)
    .fetch_optional(store.pool())
    .await
    .map_err(map_assignment_error)?;

    let Some(row) = row else {
        return Err(AppError::NotFound(format!(
            "Trainee {} is not assigned to you",
            trainee_id
        )));
    };

    let assignment = TrainerAssignment::from(row);

    store
        .committed(
            ChangeEvent::new(Table::TrainerTraineeAssignments, ChangeKind::Update)
                .with_row(&assignment.id)
                .for_trainee(trainee_id),
            ROSTER_GROUPS,
        )
        .await;

    Ok(assignment)
}
