use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;

use crate::auth::{Permission, Profile};
use crate::db::{create_exercise, get_exercises};
use crate::models::{Exercise, NewExercise};
use crate::store::Store;
use crate::validation::{ApiResult, AppErrorExt, JsonValidateExt, PermissionCheckExt};

#[get("/exercises")]
pub async fn api_get_exercises(
    _profile: Profile,
    store: &State<Store>,
) -> ApiResult<Json<Vec<Exercise>>> {
    let exercises = get_exercises(store).await.validate_custom()?;
    Ok(Json(exercises))
}

#[post("/exercises", data = "<exercise>")]
pub async fn api_create_exercise(
    exercise: Json<NewExercise>,
    profile: Profile,
    store: &State<Store>,
) -> ApiResult<Custom<Json<Exercise>>> {
    profile
        .require_permission(Permission::ManageExercises)
        .validate_custom()?;
    let exercise = exercise.validate_custom()?;

    let created = create_exercise(store, &exercise).await.validate_custom()?;
    Ok(Custom(Status::Created, Json(created)))
}
