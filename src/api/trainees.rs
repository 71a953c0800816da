use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use super::ensure_trainee_access;
use crate::auth::{Permission, Profile, Role};
use crate::db::{
    assign_to_trainer, get_my_trainer_assignment, get_my_trainees, get_profile,
    get_trainees_for_trainer, get_trainers_with_availability, remove_trainee, transfer_trainee,
};
use crate::models::{
    AssignmentWithTrainee, AssignmentWithTrainer, TrainerAssignment, TrainerAvailability,
};
use crate::store::Store;
use crate::validation::{
    ApiResult, AppErrorExt, JsonValidateExt, PermissionCheckExt, ToValidationResponse,
};

#[derive(Debug, Deserialize, Validate)]
pub struct AssignTrainerRequest {
    #[validate(length(min = 1, message = "Trainer is required"))]
    pub trainer_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TransferRequest {
    #[validate(length(min = 1, message = "Trainee is required"))]
    pub trainee_id: String,
    #[validate(length(min = 1, message = "Target trainer is required"))]
    pub to_trainer_id: String,
}

#[get("/trainees")]
pub async fn api_get_trainees(
    profile: Profile,
    store: &State<Store>,
) -> ApiResult<Json<Vec<Profile>>> {
    profile
        .require_permission(Permission::ViewAssignedTrainees)
        .validate_custom()?;

    let trainees = get_trainees_for_trainer(store, &profile.id)
        .await
        .validate_custom()?;
    Ok(Json(trainees))
}

/// Own profile, any trainer's profile, or the profile of an assigned trainee.
#[get("/profiles/<id>")]
pub async fn api_get_profile(
    id: &str,
    profile: Profile,
    store: &State<Store>,
) -> ApiResult<Json<Profile>> {
    if id == profile.id {
        return Ok(Json(profile));
    }

    let Some(target) = get_profile(store, id).await.validate_custom()? else {
        return Err(Status::NotFound.to_validation_response());
    };

    if target.role == Role::Trainee {
        ensure_trainee_access(store, &profile, &target.id).await?;
    }

    Ok(Json(target))
}

#[get("/trainers/availability")]
pub async fn api_get_trainer_availability(
    _profile: Profile,
    store: &State<Store>,
) -> ApiResult<Json<Vec<TrainerAvailability>>> {
    let trainers = get_trainers_with_availability(store)
        .await
        .validate_custom()?;
    Ok(Json(trainers))
}

#[get("/assignments/me")]
pub async fn api_get_my_assignment(
    profile: Profile,
    store: &State<Store>,
) -> ApiResult<Json<Option<AssignmentWithTrainer>>> {
    let assignment = get_my_trainer_assignment(store, &profile.id)
        .await
        .validate_custom()?;
    Ok(Json(assignment))
}

#[post("/assignments", data = "<request>")]
pub async fn api_choose_trainer(
    request: Json<AssignTrainerRequest>,
    profile: Profile,
    store: &State<Store>,
) -> ApiResult<Custom<Json<TrainerAssignment>>> {
    profile
        .require_permission(Permission::ChooseTrainer)
        .validate_custom()?;
    let request = request.validate_custom()?;

    let assignment = assign_to_trainer(store, &profile.id, &request.trainer_id)
        .await
        .validate_custom()?;

    info!(trainee_id = %profile.id, trainer_id = %request.trainer_id, "Trainer chosen");
    Ok(Custom(Status::Created, Json(assignment)))
}

#[get("/assignments")]
pub async fn api_get_my_trainees(
    profile: Profile,
    store: &State<Store>,
) -> ApiResult<Json<Vec<AssignmentWithTrainee>>> {
    profile
        .require_permission(Permission::ViewAssignedTrainees)
        .validate_custom()?;

    let trainees = get_my_trainees(store, &profile.id).await.validate_custom()?;
    Ok(Json(trainees))
}

#[delete("/assignments/<id>")]
pub async fn api_remove_trainee(
    id: &str,
    profile: Profile,
    store: &State<Store>,
) -> ApiResult<Status> {
    profile
        .require_permission(Permission::ManageTrainees)
        .validate_custom()?;

    remove_trainee(store, &profile.id, id).await.validate_custom()?;
    Ok(Status::NoContent)
}

#[post("/assignments/transfer", data = "<request>")]
pub async fn api_transfer_trainee(
    request: Json<TransferRequest>,
    profile: Profile,
    store: &State<Store>,
) -> ApiResult<Json<TrainerAssignment>> {
    profile
        .require_permission(Permission::ManageTrainees)
        .validate_custom()?;
    let request = request.validate_custom()?;

    let assignment = transfer_trainee(
        store,
        &profile.id,
        &request.trainee_id,
        &request.to_trainer_id,
    )
    .await
    .validate_custom()?;

    Ok(Json(assignment))
}
