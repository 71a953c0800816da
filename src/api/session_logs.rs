use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::Serialize;

use super::{ensure_trainee_access, trainee_scope};
use crate::auth::Profile;
use crate::db::{create_session_log, get_session_logs};
use crate::models::{NewSessionLog, SessionLog};
use crate::reports::{HistoryStats, ProgressPoint, progress_points};
use crate::store::Store;
use crate::validation::{ApiResult, AppErrorExt, JsonValidateExt};

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub logs: Vec<SessionLog>,
    pub stats: Option<HistoryStats>,
    pub progress: Vec<ProgressPoint>,
}

#[get("/session-logs?<trainee_id>")]
pub async fn api_get_session_logs(
    trainee_id: Option<&str>,
    profile: Profile,
    store: &State<Store>,
) -> ApiResult<Json<Vec<SessionLog>>> {
    let scope = trainee_scope(store, &profile, trainee_id).await?;
    let logs = get_session_logs(store, &scope).await.validate_custom()?;
    Ok(Json(logs))
}

#[get("/session-logs/history?<trainee_id>")]
pub async fn api_get_history(
    trainee_id: Option<&str>,
    profile: Profile,
    store: &State<Store>,
) -> ApiResult<Json<HistoryResponse>> {
    let scope = trainee_scope(store, &profile, trainee_id).await?;
    let logs = get_session_logs(store, &scope).await.validate_custom()?;

    Ok(Json(HistoryResponse {
        stats: HistoryStats::from_logs(&logs),
        progress: progress_points(&logs),
        logs,
    }))
}

#[post("/session-logs", data = "<log>")]
pub async fn api_create_session_log(
    log: Json<NewSessionLog>,
    profile: Profile,
    store: &State<Store>,
) -> ApiResult<Custom<Json<SessionLog>>> {
    let log = log.validate_custom()?;
    ensure_trainee_access(store, &profile, &log.trainee_id).await?;

    let created = create_session_log(store, &log).await.validate_custom()?;
    Ok(Custom(Status::Created, Json(created)))
}
