#[macro_use]
extern crate rocket;

mod api;
mod auth;
mod db;
mod env;
mod error;
mod models;
mod realtime;
mod reports;
mod routes;
mod seed;
mod store;
mod telemetry;
mod timer;
mod validation;
#[cfg(test)]
mod test;

use api::auth::{api_login, api_logout, api_me, api_signup};
use api::exercises::{api_create_exercise, api_get_exercises};
use api::health;
use api::realtime::api_realtime_changes;
use api::seed::{api_seed_database, api_seed_preflight};
use api::session_logs::{api_create_session_log, api_get_history, api_get_session_logs};
use api::timers::{
    api_get_timer, api_start_timer, api_stop_timer, api_timer_clock, api_update_timer_status,
};
use api::trainees::{
    api_choose_trainer, api_get_my_assignment, api_get_my_trainees, api_get_profile,
    api_get_trainees, api_get_trainer_availability, api_remove_trainee, api_transfer_trainee,
};
use api::workouts::{
    api_complete_workout, api_create_workout_plan, api_delete_workout_plan,
    api_get_pending_workouts, api_get_workout_plans, api_update_workout_status,
};
use auth::{forbidden_api, session_unavailable, unauthorized_api};
use db::clean_expired_sessions;
use env::{Settings, load_environment};
use error::AppError;
use realtime::Subscription;
use rocket::{Build, Rocket, tokio};
use sqlx::SqlitePool;
use store::Store;
use telemetry::{TelemetryFairing, init_tracing};
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Anyhow(anyhow::Error),
    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("{0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("Application error: {0}")]
    App(#[from] AppError),
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Error::Anyhow(value)
    }
}

/// Realtime channels held open for as long as Rocket runs.
pub struct BridgeSubscriptions(pub Vec<Subscription>);

const SESSION_CLEANUP_INTERVAL: tokio::time::Duration = tokio::time::Duration::from_secs(3600);

async fn prepare() -> Result<(Store, Settings), Error> {
    if let Err(err) = load_environment() {
        return Err(anyhow::anyhow!("Failed to load environment: {}", err).into());
    }

    let settings = Settings::from_env()?;
    init_tracing(&settings);

    info!(database_url = %settings.database_url, "Connecting to database");
    let pool = SqlitePool::connect(&settings.database_url).await?;

    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations completed successfully");

    Ok((Store::new(pool), settings))
}

fn spawn_session_cleanup(store: &Store) {
    let pool = store.pool().clone();

    tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;

        loop {
            match clean_expired_sessions(&pool).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Cleaned up {} expired sessions", count);
                    }
                }
                Err(e) => {
                    error!("Failed to clean expired sessions: {}", e);
                }
            }

            tokio::time::sleep(SESSION_CLEANUP_INTERVAL).await;
        }
    });
}

#[launch]
async fn rocket() -> _ {
    match prepare().await {
        Ok((store, settings)) => {
            spawn_session_cleanup(&store);
            init_rocket(store, settings).await
        }
        Err(err) => {
            eprintln!("Startup failed: {}", err);
            std::process::exit(1);
        }
    }
}

pub async fn init_rocket(store: Store, settings: Settings) -> Rocket<Build> {
    info!(
        environment = %settings.deployment_environment,
        "Starting gym tracker"
    );

    let subscriptions = BridgeSubscriptions(store.bridge().subscribe_defaults());
    info!(channels = subscriptions.0.len(), "Realtime bridge subscribed");

    rocket::build()
        .manage(store)
        .manage(settings)
        .manage(subscriptions)
        .mount(
            "/api",
            routes![
                api_signup,
                api_login,
                api_logout,
                api_me,
                api_get_exercises,
                api_create_exercise,
                api_get_trainees,
                api_get_profile,
                api_get_trainer_availability,
                api_get_my_assignment,
                api_choose_trainer,
                api_get_my_trainees,
                api_remove_trainee,
                api_transfer_trainee,
                api_get_workout_plans,
                api_get_pending_workouts,
                api_create_workout_plan,
                api_update_workout_status,
                api_delete_workout_plan,
                api_complete_workout,
                api_get_session_logs,
                api_get_history,
                api_create_session_log,
                api_get_timer,
                api_start_timer,
                api_update_timer_status,
                api_stop_timer,
                api_timer_clock,
                api_realtime_changes,
                health,
            ],
        )
        .register(
            "/api",
            catchers![unauthorized_api, forbidden_api, session_unavailable],
        )
        .mount("/functions", routes![api_seed_database, api_seed_preflight])
        .mount(
            "/",
            routes![
                routes::index,
                routes::auth_page,
                routes::dashboard,
                routes::trainees,
                routes::plan_workout,
                routes::trainee_history,
                routes::reports,
                routes::my_workouts,
                routes::select_trainer,
                routes::live,
            ],
        )
        .attach(TelemetryFairing)
}
