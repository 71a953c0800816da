use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};
use tracing::{info, instrument};

use super::{new_id, push_id_filter, scope_for};
use crate::error::AppError;
use crate::models::{DbSessionLog, NewSessionLog, SessionLog};
use crate::realtime::{ChangeEvent, ChangeKind, QueryGroup, QueryKey, Table};
use crate::store::Store;

const LOG_SELECT: &str = "SELECT sl.id, sl.trainee_id, sl.exercise_id, sl.date_completed,
        sl.actual_weight, sl.rating, sl.created_at,
        e.name AS exercise_name, e.category AS exercise_category, p.name AS trainee_name
    FROM session_logs sl
    LEFT JOIN exercises e ON e.id = sl.exercise_id
    LEFT JOIN profiles p ON p.id = sl.trainee_id";

/// Logs for the given trainees, most recent completion first.
#[instrument(skip(store))]
pub async fn get_session_logs(
    store: &Store,
    trainee_ids: &[String],
) -> Result<Vec<SessionLog>, AppError> {
    if trainee_ids.is_empty() {
        return Ok(Vec::new());
    }

    store
        .cached(
            QueryKey::scoped(QueryGroup::SessionLogs, scope_for(trainee_ids)),
            || async {
                info!("Getting session logs");

                let mut builder = QueryBuilder::<Sqlite>::new(LOG_SELECT);
                push_id_filter(&mut builder, "sl.trainee_id", trainee_ids);
                builder.push(" ORDER BY sl.date_completed DESC, sl.created_at DESC");

                let rows = builder
                    .build_query_as::<DbSessionLog>()
                    .fetch_all(store.pool())
                    .await?;

                Ok(rows.into_iter().map(SessionLog::from).collect())
            },
        )
        .await
}

/// Appends a log dated today.
#[instrument(skip(store))]
pub async fn create_session_log(
    store: &Store,
    new: &NewSessionLog,
) -> Result<SessionLog, AppError> {
    info!("Creating session log");

    let id = new_id();
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO session_logs (id, trainee_id, exercise_id, date_completed, actual_weight, rating, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&new.trainee_id)
    .bind(&new.exercise_id)
    .bind(now.date_naive())
    .bind(new.actual_weight)
    .bind(new.rating)
    .bind(now)
    .execute(store.pool())
    .await?;

    store
        .committed(
            ChangeEvent::new(Table::SessionLogs, ChangeKind::Insert)
                .with_row(&id)
                .for_trainee(&new.trainee_id),
            &[QueryGroup::SessionLogs],
        )
        .await;

    let row = sqlx::query_as::<_, DbSessionLog>(&format!("{} WHERE sl.id = ?", LOG_SELECT))
        .bind(&id)
        .fetch_one(store.pool())
        .await?;

    Ok(SessionLog::from(row))
}
