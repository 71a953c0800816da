use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use validator::Validate;

use super::{ensure_trainee_access, trainee_scope};
use crate::auth::{Permission, Profile};
use crate::db::{
    create_session_log, create_workout_plan, delete_workout_plan, get_pending_workouts,
    get_workout_plan, get_workout_plans, update_workout_status,
};
use crate::error::AppError;
use crate::models::{NewSessionLog, NewWorkoutPlan, PlanStatus, SessionLog, WorkoutPlan};
use crate::store::Store;
use crate::validation::{ApiResult, AppErrorExt, JsonValidateExt, PermissionCheckExt};

const DEFAULT_RATING: i64 = 5;

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: PlanStatus,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CompleteWorkout {
    #[validate(range(min = 0.0, max = 1000.0, message = "Weight must be between 0 and 1000"))]
    pub actual_weight: Option<f64>,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompletedWorkout {
    pub plan: WorkoutPlan,
    pub session_log: SessionLog,
}

#[get("/workout-plans?<trainee_id>")]
pub async fn api_get_workout_plans(
    trainee_id: Option<&str>,
    profile: Profile,
    store: &State<Store>,
) -> ApiResult<Json<Vec<WorkoutPlan>>> {
    let scope = trainee_scope(store, &profile, trainee_id).await?;
    let plans = get_workout_plans(store, &scope).await.validate_custom()?;
    Ok(Json(plans))
}

#[get("/workout-plans/pending")]
pub async fn api_get_pending_workouts(
    profile: Profile,
    store: &State<Store>,
) -> ApiResult<Json<Vec<WorkoutPlan>>> {
    let plans = get_pending_workouts(store, &profile).await.validate_custom()?;
    Ok(Json(plans))
}

#[post("/workout-plans", data = "<plan>")]
pub async fn api_create_workout_plan(
    plan: Json<NewWorkoutPlan>,
    profile: Profile,
    store: &State<Store>,
) -> ApiResult<Custom<Json<WorkoutPlan>>> {
    profile
        .require_permission(Permission::PlanWorkouts)
        .validate_custom()?;
    let plan = plan.validate_custom()?;
    ensure_trainee_access(store, &profile, &plan.trainee_id).await?;

    let created = create_workout_plan(store, &plan).await.validate_custom()?;
    Ok(Custom(Status::Created, Json(created)))
}

#[put("/workout-plans/<id>/status", data = "<update>")]
pub async fn api_update_workout_status(
    id: &str,
    update: Json<StatusUpdate>,
    profile: Profile,
    store: &State<Store>,
) -> ApiResult<Json<WorkoutPlan>> {
    let plan = get_workout_plan(store, id).await.validate_custom()?;
    ensure_trainee_access(store, &profile, &plan.trainee_id).await?;

    let updated = update_workout_status(store, id, update.status)
        .await
        .validate_custom()?;
    Ok(Json(updated))
}

#[delete("/workout-plans/<id>")]
pub async fn api_delete_workout_plan(
    id: &str,
    profile: Profile,
    store: &State<Store>,
) -> ApiResult<Status> {
    profile
        .require_permission(Permission::PlanWorkouts)
        .validate_custom()?;

    let plan = get_workout_plan(store, id).await.validate_custom()?;
    ensure_trainee_access(store, &profile, &plan.trainee_id).await?;

    delete_workout_plan(store, id).await.validate_custom()?;
    Ok(Status::NoContent)
}

/// Marks a pending plan done, then records the session. The two writes are
/// independent: a failed log leaves the plan done. Only the trainee can
/// complete, and only once.
#[post("/workout-plans/<id>/complete", data = "<completion>")]
#[instrument(skip(completion, profile, store))]
pub async fn api_complete_workout(
    id: &str,
    completion: Option<Json<CompleteWorkout>>,
    profile: Profile,
    store: &State<Store>,
) -> ApiResult<Json<CompletedWorkout>> {
    profile
        .require_permission(Permission::CompleteOwnWorkouts)
        .validate_custom()?;
    let completion = match completion {
        Some(body) => body.validate_custom()?,
        None => CompleteWorkout::default(),
    };

    let plan = get_workout_plan(store, id).await.validate_custom()?;
    ensure_trainee_access(store, &profile, &plan.trainee_id).await?;
    if plan.status != PlanStatus::Pending {
        return Err(AppError::Conflict("Workout already completed".to_string()))
            .validate_custom();
    }

    let plan = update_workout_status(store, id, PlanStatus::Done)
        .await
        .validate_custom()?;

    let log = NewSessionLog {
        trainee_id: plan.trainee_id.clone(),
        exercise_id: plan.exercise_id.clone(),
        actual_weight: completion.actual_weight.unwrap_or(plan.assigned_weight),
        rating: Some(completion.rating.unwrap_or(DEFAULT_RATING)),
    };

    let session_log = match create_session_log(store, &log).await {
        Ok(session_log) => session_log,
        Err(err) => {
            warn!(plan_id = %plan.id, "Workout marked done but session log failed");
            return Err(err).validate_custom();
        }
    };

    info!(plan_id = %plan.id, "Workout completed");
    Ok(Json(CompletedWorkout { plan, session_log }))
}
