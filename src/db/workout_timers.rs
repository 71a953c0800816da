use chrono::Utc;
use tracing::{info, instrument};

use super::new_id;
use crate::error::AppError;
use crate::realtime::{ChangeEvent, ChangeKind, QueryGroup, QueryKey, Table};
use crate::store::Store;
use crate::timer::{DbWorkoutTimer, TimerStatus, WorkoutTimer, transition};

const TIMER_COLUMNS: &str = "id, trainee_id, status, started_at, paused_at, total_paused_seconds,
    break_reason, created_at, updated_at";

fn timer_key(trainee_id: &str) -> QueryKey {
    QueryKey::scoped(QueryGroup::WorkoutTimer, trainee_id)
}

async fn timer_changed(store: &Store, trainee_id: &str, kind: ChangeKind, timer_id: Option<&str>) {
    let mut change = ChangeEvent::new(Table::WorkoutTimers, kind).for_trainee(trainee_id);
    if let Some(timer_id) = timer_id {
        change = change.with_row(timer_id);
    }

    store.invalidate_key(&timer_key(trainee_id)).await;
    store.committed(change, &[]).await;
}

async fn fetch_timer(store: &Store, trainee_id: &str) -> Result<Option<WorkoutTimer>, AppError> {
    let row = sqlx::query_as::<_, DbWorkoutTimer>(&format!(
        "SELECT {} FROM workout_timers WHERE trainee_id = ?",
        TIMER_COLUMNS
    ))
    .bind(trainee_id)
    .fetch_optional(store.pool())
    .await?;

    row.map(WorkoutTimer::try_from).transpose()
}

#[instrument(skip(store))]
pub async fn get_timer(store: &Store, trainee_id: &str) -> Result<Option<WorkoutTimer>, AppError> {
    store
        .cached(timer_key(trainee_id), || async {
            info!("Getting workout timer");
            fetch_timer(store, trainee_id).await
        })
        .await
}

/// Replaces any existing timer for the trainee with a fresh active one.
#[instrument(skip(store))]
pub async fn start_timer(store: &Store, trainee_id: &str) -> Result<WorkoutTimer, AppError> {
    info!("Starting workout timer");

    let removed = sqlx::query("DELETE FROM workout_timers WHERE trainee_id = ?")
        .bind(trainee_id)
        .execute(store.pool())
        .await?;

    if removed.rows_affected() > 0 {
        timer_changed(store, trainee_id, ChangeKind::Delete, None).await;
    }

    let now = Utc::now();
    let timer = WorkoutTimer {
        id: new_id(),
        trainee_id: trainee_id.to_string(),
        status: TimerStatus::Active,
        started_at: now,
        paused_at: None,
        total_paused_seconds: 0,
        break_reason: None,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        "INSERT INTO workout_timers
            (id, trainee_id, status, started_at, paused_at, total_paused_seconds, break_reason, created_at, updated_at)
         VALUES (?, ?, ?, ?, NULL, 0, NULL, ?, ?)",
    )
    .bind(&timer.id)
    .bind(&timer.trainee_id)
    .bind(timer.status.as_str())
    .bind(timer.started_at)
    .bind(timer.created_at)
    .bind(timer.updated_at)
    .execute(store.pool())
    .await?;

    timer_changed(store, trainee_id, ChangeKind::Insert, Some(&timer.id)).await;

    Ok(timer)
}

/// Applies a status change. Moving to `stopped` removes the timer and
/// returns `None`.
#[instrument(skip(store))]
pub async fn update_timer_status(
    store: &Store,
    trainee_id: &str,
    status: TimerStatus,
    break_reason: Option<String>,
) -> Result<Option<WorkoutTimer>, AppError> {
    info!("Updating workout timer status");

    if status == TimerStatus::Stopped {
        stop_timer(store, trainee_id).await?;
        return Ok(None);
    }

    let Some(current) = fetch_timer(store, trainee_id).await? else {
        return Err(AppError::NotFound(
            "No workout timer for this trainee".to_string(),
        ));
    };

    let now = Utc::now();
    let update = transition(&current, status, break_reason, now)?;

    sqlx::query(
        "UPDATE workout_timers
         SET status = ?, paused_at = ?, total_paused_seconds = ?, break_reason = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(update.status.as_str())
    .bind(update.paused_at)
    .bind(update.total_paused_seconds)
    .bind(&update.break_reason)
    .bind(now)
    .bind(&current.id)
    .execute(store.pool())
    .await?;

    timer_changed(store, trainee_id, ChangeKind::Update, Some(&current.id)).await;

    Ok(Some(WorkoutTimer {
        status: update.status,
        paused_at: update.paused_at,
        total_paused_seconds: update.total_paused_seconds,
        break_reason: update.break_reason,
        updated_at: now,
        ..current
    }))
}

/// Deletes the trainee's timer. Returns whether one existed.
#[instrument(skip(store))]
pub async fn stop_timer(store: &Store, trainee_id: &str) -> Result<bool, AppError> {
    info!("Stopping workout timer");

    let result = sqlx::query("DELETE FROM workout_timers WHERE trainee_id = ?")
        .bind(trainee_id)
        .execute(store.pool())
        .await?;

    let removed = result.rows_affected() > 0;
    if removed {
        timer_changed(store, trainee_id, ChangeKind::Delete, None).await;
    }

    Ok(removed)
}
