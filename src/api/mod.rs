pub mod auth;
pub mod exercises;
pub mod realtime;
pub mod seed;
pub mod session_logs;
pub mod timers;
pub mod trainees;
pub mod workouts;

use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde_json::{Value, json};
use tracing::warn;

use crate::auth::{Profile, Role};
use crate::db::{assigned_trainee_ids, trainer_has_trainee};
use crate::store::Store;
use crate::validation::{ApiResult, AppErrorExt, ToValidationResponse};

/// A trainee may act on their own rows; a trainer on the rows of trainees
/// assigned to them.
pub async fn ensure_trainee_access(
    store: &Store,
    viewer: &Profile,
    trainee_id: &str,
) -> ApiResult<()> {
    let allowed = match viewer.role {
        Role::Trainee => viewer.id == trainee_id,
        Role::Trainer => trainer_has_trainee(store, &viewer.id, trainee_id)
            .await
            .validate_custom()?,
    };

    if allowed {
        Ok(())
    } else {
        warn!(viewer_id = %viewer.id, trainee_id, "Trainee access denied");
        Err(Status::Forbidden.to_validation_response())
    }
}

/// Trainee ids a list endpoint covers: the requested trainee after an access
/// check, otherwise everyone visible to the viewer.
pub async fn trainee_scope(
    store: &Store,
    viewer: &Profile,
    trainee_id: Option<&str>,
) -> ApiResult<Vec<String>> {
    match trainee_id {
        Some(trainee_id) => {
            ensure_trainee_access(store, viewer, trainee_id).await?;
            Ok(vec![trainee_id.to_string()])
        }
        None => match viewer.role {
            Role::Trainee => Ok(vec![viewer.id.clone()]),
            Role::Trainer => assigned_trainee_ids(store, &viewer.id).await.validate_custom(),
        },
    }
}

#[get("/health")]
pub async fn health(store: &State<Store>) -> Custom<Json<Value>> {
    match sqlx::query("SELECT 1").execute(store.pool()).await {
        Ok(_) => Custom(Status::Ok, Json(json!({ "status": "ok" }))),
        Err(err) => {
            warn!(error = %err, "Health check failed");
            Custom(
                Status::ServiceUnavailable,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}
