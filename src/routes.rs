//! Page routes. Each page resolves the session through [`route_access`] and
//! answers with its view model as JSON, or with a redirect.

use chrono::Utc;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::response::{self, Redirect, Responder};
use rocket::serde::json::Json;
use rocket::{Request, State};
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::auth::{LOGIN_PATH, Permission, Profile, Role, RouteDecision, Viewer, route_access};
use crate::db::{
    get_exercises, get_my_trainer_assignment, get_my_trainees, get_pending_workouts, get_profile,
    get_session_logs, get_timer, get_trainees_for_trainer, get_trainers_with_availability,
    get_workout_plans, trainer_has_trainee,
};
use crate::error::AppError;
use crate::models::{
    AssignmentWithTrainee, Exercise, MAX_TRAINEES_PER_TRAINER, PlanStatus, SessionLog,
    TrainerAvailability, TrainerContact, WorkoutPlan,
};
use crate::reports::{
    DashboardStats, ExercisePopularity, HistoryStats, ProgressPoint, TraineeWorkouts,
    exercise_popularity, group_by_trainee, progress_points,
};
use crate::store::Store;
use crate::timer::TimerTick;

const TRAINEES_PATH: &str = "/trainees";
const SELECT_TRAINER_PATH: &str = "/select-trainer";
const MY_WORKOUTS_PATH: &str = "/my-workouts";

/// Why a page did not render.
pub enum PageExit {
    Redirect(Redirect),
    Loading,
    Failed(AppError),
}

impl From<AppError> for PageExit {
    fn from(err: AppError) -> Self {
        PageExit::Failed(err)
    }
}

fn redirect(path: &'static str) -> PageExit {
    PageExit::Redirect(Redirect::to(path))
}

impl<'r> Responder<'r, 'static> for PageExit {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        match self {
            PageExit::Redirect(redirect) => redirect.respond_to(req),
            PageExit::Loading => Custom(
                Status::ServiceUnavailable,
                Json(json!({ "status": "loading" })),
            )
            .respond_to(req),
            PageExit::Failed(err) => err.respond_to(req),
        }
    }
}

pub type Page<T> = Result<Json<T>, PageExit>;

fn gate(viewer: &Viewer, required: Option<Role>) -> Result<Profile, PageExit> {
    match route_access(&viewer.0, required) {
        RouteDecision::Render(profile) => Ok(profile),
        RouteDecision::Loading => Err(PageExit::Loading),
        RouteDecision::RedirectToLogin => Err(redirect(LOGIN_PATH)),
        RouteDecision::RedirectHome(path) => Err(redirect(path)),
    }
}

/// Where a profile lands after signing in.
pub async fn landing_path(store: &Store, profile: &Profile) -> Result<&'static str, AppError> {
    match profile.role {
        Role::Trainer => Ok(Role::Trainer.home_path()),
        Role::Trainee => match get_my_trainer_assignment(store, &profile.id).await? {
            Some(_) => Ok(Role::Trainee.home_path()),
            None => Ok(SELECT_TRAINER_PATH),
        },
    }
}

/// A trainee on a trainer page must be one of the trainer's own.
async fn assigned_trainee(store: &Store, trainer: &Profile, trainee_id: &str) -> Result<Profile, PageExit> {
    if !trainer_has_trainee(store, &trainer.id, trainee_id).await? {
        info!(trainer_id = %trainer.id, trainee_id, "Trainee not assigned, redirecting");
        return Err(redirect(TRAINEES_PATH));
    }

    get_profile(store, trainee_id)
        .await?
        .ok_or_else(|| redirect(TRAINEES_PATH))
}

#[get("/")]
pub async fn index(viewer: Viewer, store: &State<Store>) -> Result<Redirect, PageExit> {
    let profile = gate(&viewer, None)?;
    Ok(Redirect::to(landing_path(store, &profile).await?))
}

#[derive(Debug, Serialize)]
pub struct AuthView {
    pub roles: Vec<Role>,
}

#[get("/auth")]
pub async fn auth_page(viewer: Viewer, store: &State<Store>) -> Page<AuthView> {
    if let Some(profile) = viewer.0.profile() {
        return Err(PageExit::Redirect(Redirect::to(
            landing_path(store, profile).await?,
        )));
    }

    Ok(Json(AuthView {
        roles: vec![Role::Trainer, Role::Trainee],
    }))
}

#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub profile: Profile,
    pub stats: DashboardStats,
    pub trainees: Vec<Profile>,
    pub pending_workouts: Vec<WorkoutPlan>,
}

#[get("/dashboard")]
#[instrument(skip_all)]
pub async fn dashboard(viewer: Viewer, store: &State<Store>) -> Page<DashboardView> {
    let profile = gate(&viewer, Some(Role::Trainer))?;

    let trainees = get_trainees_for_trainer(store, &profile.id).await?;
    let pending_workouts = get_pending_workouts(store, &profile).await?;
    let exercises = get_exercises(store).await?;

    Ok(Json(DashboardView {
        stats: DashboardStats {
            trainee_count: trainees.len(),
            pending_workouts: pending_workouts.len(),
            exercise_count: exercises.len(),
        },
        profile,
        trainees,
        pending_workouts,
    }))
}

#[derive(Debug, Serialize)]
pub struct TraineesView {
    pub assignments: Vec<AssignmentWithTrainee>,
    pub capacity: i64,
    pub trainers: Vec<TrainerAvailability>,
}

#[get("/trainees")]
pub async fn trainees(viewer: Viewer, store: &State<Store>) -> Page<TraineesView> {
    let profile = gate(&viewer, Some(Role::Trainer))?;

    let assignments = get_my_trainees(store, &profile.id).await?;
    let trainers = get_trainers_with_availability(store)
        .await?
        .into_iter()
        .filter(|trainer| trainer.id != profile.id)
        .collect();

    Ok(Json(TraineesView {
        assignments,
        capacity: MAX_TRAINEES_PER_TRAINER,
        trainers,
    }))
}

#[derive(Debug, Serialize)]
pub struct PlanView {
    pub trainee: Profile,
    pub exercises: Vec<Exercise>,
    pub plans: Vec<WorkoutPlan>,
}

#[get("/trainees/<id>/plan")]
pub async fn plan_workout(id: &str, viewer: Viewer, store: &State<Store>) -> Page<PlanView> {
    let profile = gate(&viewer, Some(Role::Trainer))?;
    let trainee = assigned_trainee(store, &profile, id).await?;

    let exercises = get_exercises(store).await?;
    let plans = get_workout_plans(store, &[trainee.id.clone()]).await?;

    Ok(Json(PlanView {
        trainee,
        exercises,
        plans,
    }))
}

#[derive(Debug, Serialize)]
pub struct HistoryView {
    pub trainee: Profile,
    pub logs: Vec<SessionLog>,
    pub stats: Option<HistoryStats>,
}

#[get("/trainees/<id>/history")]
pub async fn trainee_history(id: &str, viewer: Viewer, store: &State<Store>) -> Page<HistoryView> {
    let profile = gate(&viewer, Some(Role::Trainer))?;
    let trainee = assigned_trainee(store, &profile, id).await?;

    let logs = get_session_logs(store, &[trainee.id.clone()]).await?;

    Ok(Json(HistoryView {
        trainee,
        stats: HistoryStats::from_logs(&logs),
        logs,
    }))
}

#[derive(Debug, Serialize)]
pub struct ReportsView {
    pub trainees: Vec<Profile>,
    pub selected_trainee: Option<String>,
    pub stats: Option<HistoryStats>,
    pub progress: Vec<ProgressPoint>,
    pub popularity: Vec<ExercisePopularity>,
}

/// Popularity covers every assigned trainee; progress only the selected one.
#[get("/reports?<trainee_id>")]
pub async fn reports(
    trainee_id: Option<&str>,
    viewer: Viewer,
    store: &State<Store>,
) -> Page<ReportsView> {
    let profile = gate(&viewer, Some(Role::Trainer))?;
    if !profile.has_permission(Permission::ViewReports) {
        return Err(redirect(profile.role.home_path()));
    }

    let trainees = get_trainees_for_trainer(store, &profile.id).await?;
    let trainee_ids: Vec<String> = trainees.iter().map(|t| t.id.clone()).collect();
    let plans = get_workout_plans(store, &trainee_ids).await?;

    let selected_trainee = match trainee_id {
        Some(id) => Some(assigned_trainee(store, &profile, id).await?.id),
        None => None,
    };

    let (stats, progress) = match &selected_trainee {
        Some(id) => {
            let logs = get_session_logs(store, &[id.clone()]).await?;
            (HistoryStats::from_logs(&logs), progress_points(&logs))
        }
        None => (None, Vec::new()),
    };

    Ok(Json(ReportsView {
        trainees,
        selected_trainee,
        stats,
        progress,
        popularity: exercise_popularity(&plans),
    }))
}

#[derive(Debug, Serialize)]
pub struct MyWorkoutsView {
    pub trainer: TrainerContact,
    pub pending: Vec<WorkoutPlan>,
    pub completed: Vec<WorkoutPlan>,
    pub clock: TimerTick,
}

#[get("/my-workouts")]
pub async fn my_workouts(viewer: Viewer, store: &State<Store>) -> Page<MyWorkoutsView> {
    let profile = gate(&viewer, None)?;
    if !profile.has_permission(Permission::ViewOwnWorkouts) {
        return Err(redirect(profile.role.home_path()));
    }

    let Some(assignment) = get_my_trainer_assignment(store, &profile.id).await? else {
        return Err(redirect(SELECT_TRAINER_PATH));
    };

    let (pending, completed) = get_workout_plans(store, &[profile.id.clone()])
        .await?
        .into_iter()
        .partition(|plan| plan.status == PlanStatus::Pending);
    let timer = get_timer(store, &profile.id).await?;

    Ok(Json(MyWorkoutsView {
        trainer: assignment.trainer,
        pending,
        completed,
        clock: TimerTick::evaluate(&profile.id, timer.as_ref(), Utc::now()),
    }))
}

#[derive(Debug, Serialize)]
pub struct SelectTrainerView {
    pub trainers: Vec<TrainerAvailability>,
}

#[get("/select-trainer")]
pub async fn select_trainer(viewer: Viewer, store: &State<Store>) -> Page<SelectTrainerView> {
    let profile = gate(&viewer, None)?;
    if profile.is_trainer() {
        return Err(redirect(Role::Trainer.home_path()));
    }

    if get_my_trainer_assignment(store, &profile.id).await?.is_some() {
        return Err(redirect(MY_WORKOUTS_PATH));
    }

    Ok(Json(SelectTrainerView {
        trainers: get_trainers_with_availability(store).await?,
    }))
}

#[derive(Debug, Serialize)]
pub struct LiveTrainee {
    #[serde(flatten)]
    pub workouts: TraineeWorkouts,
    pub clock: TimerTick,
}

#[derive(Debug, Serialize)]
pub struct LiveView {
    pub trainees: Vec<LiveTrainee>,
}

#[get("/live")]
pub async fn live(viewer: Viewer, store: &State<Store>) -> Page<LiveView> {
    let profile = gate(&viewer, None)?;

    let pending = get_pending_workouts(store, &profile).await?;
    let now = Utc::now();

    let mut trainees = Vec::new();
    for workouts in group_by_trainee(&pending) {
        let timer = get_timer(store, &workouts.trainee.id).await?;
        trainees.push(LiveTrainee {
            clock: TimerTick::evaluate(&workouts.trainee.id, timer.as_ref(), now),
            workouts,
        });
    }

    Ok(Json(LiveView { trainees }))
}
