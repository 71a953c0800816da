//! Aggregates computed over fetched rows for the dashboard, history, report
//! and live views.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::auth::ProfileRef;
use crate::models::{SessionLog, WorkoutPlan};

const TOP_EXERCISES: usize = 5;
const PROGRESS_POINTS: usize = 10;
const POPULAR_EXERCISES: usize = 8;
const UNKNOWN: &str = "Unknown";

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn average(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ExerciseStats {
    pub name: String,
    pub category: String,
    pub total_sessions: usize,
    pub avg_weight: f64,
    pub max_weight: f64,
    pub avg_rating: f64,
    pub last_performed: NaiveDate,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct HistoryStats {
    pub total_workouts: usize,
    pub avg_weight: f64,
    pub max_weight: f64,
    pub avg_rating: f64,
    pub workout_days: usize,
    pub last_workout: NaiveDate,
    pub exercise_stats: Vec<ExerciseStats>,
    pub top_exercise: Option<ExerciseStats>,
}

impl HistoryStats {
    /// `None` when there is no history.
    pub fn from_logs(logs: &[SessionLog]) -> Option<Self> {
        let last_workout = logs.iter().map(|log| log.date_completed).max()?;

        let avg_weight = average(logs.iter().map(|log| log.actual_weight)).unwrap_or_default();
        let max_weight = logs
            .iter()
            .map(|log| log.actual_weight)
            .fold(f64::MIN, f64::max);
        let avg_rating =
            average(logs.iter().filter_map(|log| log.rating).map(|r| r as f64)).unwrap_or_default();

        // Grouped by exercise id, in order of first appearance.
        let mut order: Vec<&str> = Vec::new();
        let mut by_exercise: HashMap<&str, Vec<&SessionLog>> = HashMap::new();
        for log in logs {
            by_exercise
                .entry(log.exercise_id.as_str())
                .or_insert_with(|| {
                    order.push(log.exercise_id.as_str());
                    Vec::new()
                })
                .push(log);
        }

        let mut exercise_stats: Vec<ExerciseStats> = order
            .iter()
            .filter_map(|id| by_exercise.get(id))
            .filter_map(|group| exercise_stats(group))
            .collect();
        exercise_stats.sort_by(|a, b| b.total_sessions.cmp(&a.total_sessions));

        let top_exercise = exercise_stats.first().cloned();
        exercise_stats.truncate(TOP_EXERCISES);

        let workout_days = logs
            .iter()
            .map(|log| log.date_completed)
            .collect::<HashSet<_>>()
            .len();

        Some(Self {
            total_workouts: logs.len(),
            avg_weight: round_one_decimal(avg_weight),
            max_weight,
            avg_rating: round_one_decimal(avg_rating),
            workout_days,
            last_workout,
            exercise_stats,
            top_exercise,
        })
    }
}

fn exercise_stats(logs: &[&SessionLog]) -> Option<ExerciseStats> {
    let first = logs.first()?;
    let (name, category) = match &first.exercise {
        Some(exercise) => (exercise.name.clone(), exercise.category.clone()),
        None => (UNKNOWN.to_string(), UNKNOWN.to_string()),
    };

    Some(ExerciseStats {
        name,
        category,
        total_sessions: logs.len(),
        avg_weight: average(logs.iter().map(|log| log.actual_weight)).unwrap_or_default(),
        max_weight: logs
            .iter()
            .map(|log| log.actual_weight)
            .fold(f64::MIN, f64::max),
        avg_rating: average(logs.iter().filter_map(|log| log.rating).map(|r| r as f64))
            .unwrap_or_default(),
        last_performed: logs.iter().map(|log| log.date_completed).max()?,
    })
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ProgressPoint {
    pub date: NaiveDate,
    pub weight: f64,
    pub exercise: String,
}

/// The most recent logs, oldest first, as chart points.
pub fn progress_points(logs: &[SessionLog]) -> Vec<ProgressPoint> {
    let mut sorted: Vec<&SessionLog> = logs.iter().collect();
    sorted.sort_by_key(|log| log.date_completed);

    let skip = sorted.len().saturating_sub(PROGRESS_POINTS);
    sorted
        .into_iter()
        .skip(skip)
        .map(|log| ProgressPoint {
            date: log.date_completed,
            weight: log.actual_weight,
            exercise: log
                .exercise
                .as_ref()
                .map_or_else(|| UNKNOWN.to_string(), |e| e.name.clone()),
        })
        .collect()
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ExercisePopularity {
    pub name: String,
    pub count: usize,
}

/// How often each exercise appears across plans, most planned first.
pub fn exercise_popularity(plans: &[WorkoutPlan]) -> Vec<ExercisePopularity> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for plan in plans {
        let name = plan
            .exercise
            .as_ref()
            .map_or_else(|| UNKNOWN.to_string(), |e| e.name.clone());
        let count = counts.entry(name.clone()).or_insert_with(|| {
            order.push(name);
            0
        });
        *count += 1;
    }

    let mut popularity: Vec<ExercisePopularity> = order
        .into_iter()
        .map(|name| {
            let count = counts.get(&name).copied().unwrap_or_default();
            ExercisePopularity { name, count }
        })
        .collect();
    popularity.sort_by(|a, b| b.count.cmp(&a.count));
    popularity.truncate(POPULAR_EXERCISES);
    popularity
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct TraineeWorkouts {
    pub trainee: ProfileRef,
    pub workouts: Vec<WorkoutPlan>,
}

/// Pending plans grouped per trainee, in the order trainees first appear.
pub fn group_by_trainee(plans: &[WorkoutPlan]) -> Vec<TraineeWorkouts> {
    let mut groups: Vec<TraineeWorkouts> = Vec::new();

    for plan in plans {
        match groups
            .iter_mut()
            .find(|group| group.trainee.id == plan.trainee_id)
        {
            Some(group) => group.workouts.push(plan.clone()),
            None => groups.push(TraineeWorkouts {
                trainee: plan.trainee.clone().unwrap_or_else(|| ProfileRef {
                    id: plan.trainee_id.clone(),
                    name: UNKNOWN.to_string(),
                }),
                workouts: vec![plan.clone()],
            }),
        }
    }

    groups
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct DashboardStats {
    pub trainee_count: usize,
    pub pending_workouts: usize,
    pub exercise_count: usize,
}
