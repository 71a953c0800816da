use chrono::Utc;
use rocket::serde::json::Json;
use rocket::serde::{Deserialize, Serialize};
use rocket::response::stream::{Event, EventStream};
use rocket::tokio::select;
use rocket::tokio::time::{self, Duration};
use rocket::{Shutdown, State};
use tracing::info;
use validator::Validate;

use super::ensure_trainee_access;
use crate::auth::{Permission, Profile};
use crate::db::{get_timer, start_timer, stop_timer, update_timer_status};
use crate::realtime::timer_channel;
use crate::store::Store;
use crate::timer::{TimerStatus, TimerTick, WorkoutTimer};
use crate::validation::{ApiResult, AppErrorExt, JsonValidateExt, PermissionCheckExt};

const CLOCK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Serialize, Deserialize)]
pub struct TimerResponse {
    pub timer: Option<WorkoutTimer>,
    pub tick: TimerTick,
}

impl TimerResponse {
    fn new(trainee_id: &str, timer: Option<WorkoutTimer>) -> Self {
        let tick = TimerTick::evaluate(trainee_id, timer.as_ref(), Utc::now());
        Self { timer, tick }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct TimerStatusUpdate {
    pub status: TimerStatus,
    #[validate(length(max = 200, message = "Break reason is too long"))]
    pub break_reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StopResponse {
    pub stopped: bool,
}

/// Trainees drive their own clock, trainers the clocks of their trainees.
async fn timer_access(store: &Store, profile: &Profile, trainee_id: &str) -> ApiResult<()> {
    let permission = if profile.is_trainer() {
        Permission::ManageTraineeTimers
    } else {
        Permission::ManageOwnTimer
    };
    profile.require_permission(permission).validate_custom()?;
    ensure_trainee_access(store, profile, trainee_id).await
}

#[get("/timers/<trainee_id>")]
pub async fn api_get_timer(
    trainee_id: &str,
    profile: Profile,
    store: &State<Store>,
) -> ApiResult<Json<TimerResponse>> {
    timer_access(store, &profile, trainee_id).await?;

    let timer = get_timer(store, trainee_id).await.validate_custom()?;
    Ok(Json(TimerResponse::new(trainee_id, timer)))
}

#[post("/timers/<trainee_id>/start")]
pub async fn api_start_timer(
    trainee_id: &str,
    profile: Profile,
    store: &State<Store>,
) -> ApiResult<Json<TimerResponse>> {
    timer_access(store, &profile, trainee_id).await?;

    let timer = start_timer(store, trainee_id).await.validate_custom()?;
    info!(trainee_id, started_by = %profile.id, "Workout timer started");
    Ok(Json(TimerResponse::new(trainee_id, Some(timer))))
}

#[put("/timers/<trainee_id>/status", data = "<update>")]
pub async fn api_update_timer_status(
    trainee_id: &str,
    update: Json<TimerStatusUpdate>,
    profile: Profile,
    store: &State<Store>,
) -> ApiResult<Json<TimerResponse>> {
    timer_access(store, &profile, trainee_id).await?;
    let update = update.validate_custom()?;

    let timer = update_timer_status(store, trainee_id, update.status, update.break_reason)
        .await
        .validate_custom()?;
    Ok(Json(TimerResponse::new(trainee_id, timer)))
}

#[delete("/timers/<trainee_id>")]
pub async fn api_stop_timer(
    trainee_id: &str,
    profile: Profile,
    store: &State<Store>,
) -> ApiResult<Json<StopResponse>> {
    timer_access(store, &profile, trainee_id).await?;

    let stopped = stop_timer(store, trainee_id).await.validate_custom()?;
    Ok(Json(StopResponse { stopped }))
}

/// Streams the trainee's clock once a second. The stream holds the timer
/// channel open, so a change made elsewhere shows on the next tick.
#[get("/timers/<trainee_id>/clock")]
pub async fn api_timer_clock(
    trainee_id: &str,
    profile: Profile,
    store: &State<Store>,
    mut shutdown: Shutdown,
) -> ApiResult<EventStream![]> {
    timer_access(store, &profile, trainee_id).await?;

    let store = store.inner().clone();
    let trainee_id = trainee_id.to_string();

    Ok(EventStream! {
        let _channel = store.bridge().subscribe(timer_channel(&trainee_id));
        let mut interval = time::interval(CLOCK_INTERVAL);

        loop {
            select! {
                _ = interval.tick() => {},
                _ = &mut shutdown => break,
            };

            match get_timer(&store, &trainee_id).await {
                Ok(timer) => {
                    let tick = TimerTick::evaluate(&trainee_id, timer.as_ref(), Utc::now());
                    yield Event::json(&tick).event("tick");
                }
                Err(err) => err.log_and_record("Workout clock"),
            }
        }
    })
}
