use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};
use tracing::{info, instrument, warn};

use super::{assigned_trainee_ids, new_id, push_id_filter, scope_for};
use crate::auth::{Profile, Role};
use crate::error::AppError;
use crate::models::{DbWorkoutPlan, NewWorkoutPlan, PlanStatus, WorkoutPlan};
use crate::realtime::{ChangeEvent, ChangeKind, QueryGroup, QueryKey, Table};
use crate::store::Store;

const PLAN_GROUPS: &[QueryGroup] = &[QueryGroup::WorkoutPlans, QueryGroup::PendingWorkouts];

const PLAN_SELECT: &str = "SELECT wp.id, wp.trainee_id, wp.exercise_id, wp.assigned_sets,
        wp.assigned_reps, wp.assigned_weight, wp.status, wp.created_at, wp.updated_at,
        e.name AS exercise_name, e.category AS exercise_category, p.name AS trainee_name
    FROM workout_plans wp
    LEFT JOIN exercises e ON e.id = wp.exercise_id
    LEFT JOIN profiles p ON p.id = wp.trainee_id";

async fn fetch_plans(
    store: &Store,
    trainee_ids: &[String],
    status: Option<PlanStatus>,
) -> Result<Vec<WorkoutPlan>, AppError> {
    let mut builder = QueryBuilder::<Sqlite>::new(PLAN_SELECT);
    push_id_filter(&mut builder, "wp.trainee_id", trainee_ids);
    if let Some(status) = status {
        builder.push(" AND wp.status = ").push_bind(status.as_str());
    }
    builder.push(" ORDER BY wp.created_at DESC");

    let rows = builder
        .build_query_as::<DbWorkoutPlan>()
        .fetch_all(store.pool())
        .await?;

    rows.into_iter().map(WorkoutPlan::try_from).collect()
}

/// Plans for the given trainees, newest first.
#[instrument(skip(store))]
pub async fn get_workout_plans(
    store: &Store,
    trainee_ids: &[String],
) -> Result<Vec<WorkoutPlan>, AppError> {
    if trainee_ids.is_empty() {
        return Ok(Vec::new());
    }

    store
        .cached(
            QueryKey::scoped(QueryGroup::WorkoutPlans, scope_for(trainee_ids)),
            || async {
                info!("Getting workout plans");
                fetch_plans(store, trainee_ids, None).await
            },
        )
        .await
}

/// Pending plans visible to `viewer`: a trainer sees their trainees' plans,
/// a trainee their own.
#[instrument(skip(store, viewer), fields(viewer_id = %viewer.id))]
pub async fn get_pending_workouts(
    store: &Store,
    viewer: &Profile,
) -> Result<Vec<WorkoutPlan>, AppError> {
    let trainee_ids = match viewer.role {
        Role::Trainer => assigned_trainee_ids(store, &viewer.id).await?,
        Role::Trainee => vec![viewer.id.clone()],
    };

    pending_workouts_for(store, &trainee_ids).await
}

/// An empty id set yields no plans and never reaches the database.
#[instrument(skip(store))]
pub async fn pending_workouts_for(
    store: &Store,
    trainee_ids: &[String],
) -> Result<Vec<WorkoutPlan>, AppError> {
    if trainee_ids.is_empty() {
        info!("No trainees in scope, skipping pending workout query");
        return Ok(Vec::new());
    }

    store
        .cached(
            QueryKey::scoped(QueryGroup::PendingWorkouts, scope_for(trainee_ids)),
            || async {
                info!("Getting pending workouts");
                fetch_plans(store, trainee_ids, Some(PlanStatus::Pending)).await
            },
        )
        .await
}

#[instrument(skip(store))]
pub async fn get_workout_plan(store: &Store, id: &str) -> Result<WorkoutPlan, AppError> {
    info!("Getting workout plan");

    let row = sqlx::query_as::<_, DbWorkoutPlan>(&format!("{} WHERE wp.id = ?", PLAN_SELECT))
        .bind(id)
        .fetch_optional(store.pool())
        .await?;

    match row {
        Some(plan) => WorkoutPlan::try_from(plan),
        None => Err(AppError::NotFound(format!("Workout plan {} not found", id))),
    }
}

#[instrument(skip(store))]
pub async fn create_workout_plan(
    store: &Store,
    new: &NewWorkoutPlan,
) -> Result<WorkoutPlan, AppError> {
    info!("Creating workout plan");

    let id = new_id();
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO workout_plans
            (id, trainee_id, exercise_id, assigned_sets, assigned_reps, assigned_weight, status, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&new.trainee_id)
    .bind(&new.exercise_id)
    .bind(new.assigned_sets)
    .bind(new.assigned_reps)
    .bind(new.assigned_weight)
    .bind(PlanStatus::Pending.as_str())
    .bind(now)
    .bind(now)
    .execute(store.pool())
    .await
    .map_err(|err| match &err {
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            AppError::Validation("Unknown trainee or exercise".to_string())
        }
        _ => AppError::Database(err),
    })?;

    store
        .committed(
            ChangeEvent::new(Table::WorkoutPlans, ChangeKind::Insert)
                .with_row(&id)
                .for_trainee(&new.trainee_id),
            PLAN_GROUPS,
        )
        .await;

    get_workout_plan(store, &id).await
}

/// Moves a plan to `status`. Completed plans cannot return to pending.
#[instrument(skip(store))]
pub async fn update_workout_status(
    store: &Store,
    id: &str,
    status: PlanStatus,
) -> Result<WorkoutPlan, AppError> {
    info!("Updating workout status");

    let current = get_workout_plan(store, id).await?;

    match (current.status, status) {
        (PlanStatus::Done, PlanStatus::Pending) => {
            warn!("Rejected reopening a completed workout");
            return Err(AppError::Validation(
                "A completed workout cannot be reopened".to_string(),
            ));
        }
        (from, to) if from == to => return Ok(current),
        _ => {}
    }

    sqlx::query("UPDATE workout_plans SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(id)
        .execute(store.pool())
        .await?;

    store
        .committed(
            ChangeEvent::new(Table::WorkoutPlans, ChangeKind::Update)
                .with_row(id)
                .for_trainee(&current.trainee_id),
            PLAN_GROUPS,
        )
        .await;

    get_workout_plan(store, id).await
}

#[instrument(skip(store))]
pub async fn delete_workout_plan(store: &Store, id: &str) -> Result<(), AppError> {
    info!("Deleting workout plan");

    let trainee_id = sqlx::query_scalar::<_, String>(
        "DELETE FROM workout_plans WHERE id = ? RETURNING trainee_id",
    )
    .bind(id)
    .fetch_optional(store.pool())
    .await?;

    let Some(trainee_id) = trainee_id else {
        return Err(AppError::NotFound(format!("Workout plan {} not found", id)));
    };

    store
        .committed(
            ChangeEvent::new(Table::WorkoutPlans, ChangeKind::Delete)
                .with_row(id)
                .for_trainee(trainee_id),
            PLAN_GROUPS,
        )
        .await;

    Ok(())
}

#[instrument(skip(store))]
pub async fn delete_all_workout_plans(store: &Store) -> Result<u64, AppError> {
    info!("Deleting all workout plans");

    let result = sqlx::query("DELETE FROM workout_plans")
        .execute(store.pool())
        .await?;

    store
        .committed(
            ChangeEvent::new(Table::WorkoutPlans, ChangeKind::Delete),
            PLAN_GROUPS,
        )
        .await;

    Ok(result.rows_affected())
}

/// Inserts a batch of pending plans in one statement.
#[instrument(skip(store, plans), fields(count = plans.len()))]
pub async fn insert_workout_plans(
    store: &Store,
    plans: &[NewWorkoutPlan],
) -> Result<u64, AppError> {
    info!("Inserting workout plans");

    if plans.is_empty() {
        return Ok(0);
    }

    let now = Utc::now();
    let ids: Vec<String> = plans.iter().map(|_| new_id()).collect();

    let mut builder = QueryBuilder::<Sqlite>::new(
        "INSERT INTO workout_plans
            (id, trainee_id, exercise_id, assigned_sets, assigned_reps, assigned_weight, status, created_at, updated_at) ",
    );
    builder.push_values(ids.iter().zip(plans), |mut row, (id, plan)| {
        row.push_bind(id)
            .push_bind(&plan.trainee_id)
            .push_bind(&plan.exercise_id)
            .push_bind(plan.assigned_sets)
            .push_bind(plan.assigned_reps)
            .push_bind(plan.assigned_weight)
            .push_bind(PlanStatus::Pending.as_str())
            .push_bind(now)
            .push_bind(now);
    });
    let result = builder.build().execute(store.pool()).await?;

    store
        .committed(
            ChangeEvent::new(Table::WorkoutPlans, ChangeKind::Insert),
            PLAN_GROUPS,
        )
        .await;

    Ok(result.rows_affected())
}
