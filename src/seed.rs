//! Demo data: resets the exercise catalog and hands each of the first few
//! trainees a couple of pending workouts.

use rand::Rng;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::db::{
    delete_all_exercises, delete_all_workout_plans, get_all_trainee_ids, insert_exercises,
    insert_workout_plans,
};
use crate::error::AppError;
use crate::models::{Exercise, NewExercise, NewWorkoutPlan};
use crate::store::Store;

const SEEDED_TRAINEES: usize = 4;
const PLANS_PER_TRAINEE: usize = 2;

const CATALOG: &[(&str, &str, i64, &str)] = &[
    ("Barbell Squat", "Legs", 4, "Compound leg exercise targeting quads, hamstrings, and glutes"),
    ("Bench Press", "Chest", 4, "Primary chest exercise also engaging triceps and shoulders"),
    ("Deadlift", "Back", 3, "Full body compound lift focusing on posterior chain"),
    ("Overhead Press", "Shoulders", 3, "Shoulder press for deltoid development"),
    ("Barbell Row", "Back", 4, "Horizontal pulling movement for back thickness"),
    ("Pull-ups", "Back", 3, "Bodyweight vertical pulling exercise"),
    ("Leg Press", "Legs", 4, "Machine-based leg pressing movement"),
    ("Dumbbell Curls", "Arms", 3, "Isolation exercise for biceps"),
    ("Tricep Dips", "Arms", 3, "Compound pushing exercise for triceps"),
    ("Plank", "Core", 3, "Isometric core stability exercise"),
];

pub fn catalog() -> Vec<NewExercise> {
    CATALOG
        .iter()
        .map(|(name, category, default_sets, description)| NewExercise {
            name: name.to_string(),
            category: category.to_string(),
            default_sets: *default_sets,
            description: Some(description.to_string()),
        })
        .collect()
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SeedSummary {
    pub exercises: usize,
    pub workout_plans: u64,
}

/// Two plans per trainee for the first trainees, cycling through the catalog.
pub fn sample_plans<R: Rng>(
    trainee_ids: &[String],
    exercises: &[Exercise],
    rng: &mut R,
) -> Vec<NewWorkoutPlan> {
    if exercises.is_empty() {
        return Vec::new();
    }

    let mut plans = Vec::new();
    for (i, trainee_id) in trainee_ids.iter().take(SEEDED_TRAINEES).enumerate() {
        for j in 0..PLANS_PER_TRAINEE {
            let exercise = &exercises[(i * PLANS_PER_TRAINEE + j) % exercises.len()];
            plans.push(NewWorkoutPlan {
                trainee_id: trainee_id.clone(),
                exercise_id: exercise.id.clone(),
                assigned_sets: rng.random_range(3..=4),
                assigned_reps: rng.random_range(8..=12),
                assigned_weight: rng.random_range(20..=99) as f64,
            });
        }
    }

    plans
}

#[instrument(skip(store, rng))]
pub async fn seed_database<R: Rng + Send>(
    store: &Store,
    rng: &mut R,
) -> Result<SeedSummary, AppError> {
    info!("Seeding database");

    let removed = delete_all_exercises(store).await?;
    info!(removed, "Cleared exercise catalog");

    let exercises = insert_exercises(store, &catalog()).await?;
    info!(count = exercises.len(), "Inserted exercises");

    let trainee_ids = match get_all_trainee_ids(store).await {
        Ok(ids) => ids,
        Err(err) => {
            warn!(error = %err, "Could not load trainees, skipping workout plans");
            Vec::new()
        }
    };

    let mut workout_plans = 0;
    if !trainee_ids.is_empty() {
        delete_all_workout_plans(store).await?;

        let plans = sample_plans(&trainee_ids, &exercises, rng);
        match insert_workout_plans(store, &plans).await {
            Ok(inserted) => {
                info!(inserted, "Inserted workout plans");
                workout_plans = inserted;
            }
            Err(err) => warn!(error = %err, "Failed to insert workout plans"),
        }
    }

    Ok(SeedSummary {
        exercises: exercises.len(),
        workout_plans,
    })
}
