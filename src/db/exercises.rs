use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};
use tracing::{info, instrument};

use super::new_id;
use crate::error::AppError;
use crate::models::{DbExercise, Exercise, NewExercise};
use crate::realtime::{ChangeEvent, ChangeKind, QueryGroup, QueryKey, Table};
use crate::store::Store;

/// Groups whose rows disappear with an exercise, through the cascade.
const EXERCISE_CASCADE_GROUPS: &[QueryGroup] = &[
    QueryGroup::Exercises,
    QueryGroup::WorkoutPlans,
    QueryGroup::PendingWorkouts,
    QueryGroup::SessionLogs,
];

#[instrument(skip(store))]
pub async fn get_exercises(store: &Store) -> Result<Vec<Exercise>, AppError> {
    store
        .cached(QueryKey::group(QueryGroup::Exercises), || async {
            info!("Getting all exercises");
            let rows = sqlx::query_as::<_, DbExercise>(
                "SELECT id, name, category, default_sets, description, created_at
                 FROM exercises
                 ORDER BY name",
            )
            .fetch_all(store.pool())
            .await?;

            Ok(rows.into_iter().map(Exercise::from).collect())
        })
        .await
}

#[instrument(skip(store))]
pub async fn create_exercise(store: &Store, new: &NewExercise) -> Result<Exercise, AppError> {
    info!("Creating exercise");

    let exercise = build_exercise(new);

    sqlx::query(
        "INSERT INTO exercises (id, name, category, default_sets, description, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&exercise.id)
    .bind(&exercise.name)
    .bind(&exercise.category)
    .bind(exercise.default_sets)
    .bind(&exercise.description)
    .bind(exercise.created_at)
    .execute(store.pool())
    .await?;

    store
        .committed(
            ChangeEvent::new(Table::Exercises, ChangeKind::Insert).with_row(&exercise.id),
            &[QueryGroup::Exercises],
        )
        .await;

    Ok(exercise)
}

/// Removes the whole catalog, and with it every plan and log.
#[instrument(skip(store))]
pub async fn delete_all_exercises(store: &Store) -> Result<u64, AppError> {
    info!("Deleting all exercises");

    let result = sqlx::query("DELETE FROM exercises")
        .execute(store.pool())
        .await?;

    store
        .committed(
            ChangeEvent::new(Table::Exercises, ChangeKind::Delete),
            EXERCISE_CASCADE_GROUPS,
        )
        .await;

    Ok(result.rows_affected())
}

/// Inserts a batch of exercises in one statement.
#[instrument(skip(store, exercises), fields(count = exercises.len()))]
pub async fn insert_exercises(
    store: &Store,
    exercises: &[NewExercise],
) -> Result<Vec<Exercise>, AppError> {
    info!("Inserting exercises");

    if exercises.is_empty() {
        return Ok(Vec::new());
    }

    let rows: Vec<Exercise> = exercises.iter().map(build_exercise).collect();

    let mut builder = QueryBuilder::<Sqlite>::new(
        "INSERT INTO exercises (id, name, category, default_sets, description, created_at) ",
    );
    builder.push_values(rows.iter(), |mut row, exercise| {
        row.push_bind(&exercise.id)
            .push_bind(&exercise.name)
            .push_bind(&exercise.category)
            .push_bind(exercise.default_sets)
            .push_bind(&exercise.description)
            .push_bind(exercise.created_at);
    });
    builder.build().execute(store.pool()).await?;

    store
        .committed(
            ChangeEvent::new(Table::Exercises, ChangeKind::Insert),
            &[QueryGroup::Exercises],
        )
        .await;

    Ok(rows)
}

fn build_exercise(new: &NewExercise) -> Exercise {
    Exercise {
        id: new_id(),
        name: new.name.trim().to_string(),
        category: new.category.trim().to_string(),
        default_sets: new.default_sets,
        description: new.description.clone(),
        created_at: Utc::now(),
    }
}
