#[cfg(test)]
mod tests {
    use crate::db::{
        create_workout_plan, get_pending_workouts, get_profile, get_workout_plan,
        get_workout_plans, pending_workouts_for, update_workout_status,
    };
    use crate::error::AppError;
    use crate::models::{NewWorkoutPlan, PlanStatus};
    use crate::store::Store;
    use crate::test::test_db::TestDbBuilder;
    use crate::test::test_utils::{create_standard_test_db, login_test_user, setup_test_client};
    use rocket::http::{ContentType, Status};
    use rocket::tokio;
    use sqlx::SqlitePool;

    #[tokio::test]
    async fn test_completed_workout_cannot_be_reopened() {
        let test_db = create_standard_test_db().await;
        let store = &test_db.store;
        let tina = test_db.profile_id("tina");

        let plan_id = get_workout_plans(store, &[tina]).await.unwrap()[0].id.clone();

        let done = update_workout_status(store, &plan_id, PlanStatus::Done)
            .await
            .expect("pending -> done");
        assert_eq!(done.status, PlanStatus::Done);

        let result = update_workout_status(store, &plan_id, PlanStatus::Pending).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let stored = get_workout_plan(store, &plan_id).await.unwrap();
        assert_eq!(stored.status, PlanStatus::Done);
    }

    #[tokio::test]
    async fn test_same_status_is_a_no_op() {
        let test_db = create_standard_test_db().await;
        let store = &test_db.store;
        let tina = test_db.profile_id("tina");

        let plan = get_workout_plans(store, &[tina]).await.unwrap().remove(0);

        let unchanged = update_workout_status(store, &plan.id, PlanStatus::Pending)
            .await
            .unwrap();
        assert_eq!(unchanged.status, PlanStatus::Pending);
        assert_eq!(unchanged.updated_at, plan.updated_at);
    }

    #[tokio::test]
    async fn test_empty_trainee_set_never_queries() {
        let pool = SqlitePool::connect_lazy("sqlite::memory:").unwrap();
        pool.close().await;
        let store = Store::new(pool);

        let plans = pending_workouts_for(&store, &[])
            .await
            .expect("empty scope should not touch the database");
        assert!(plans.is_empty());
    }

    #[tokio::test]
    async fn test_trainer_without_trainees_has_no_pending_workouts() {
        let test_db = create_standard_test_db().await;
        let store = &test_db.store;

        let coach_ben = get_profile(store, &test_db.profile_id("coach_ben"))
            .await
            .unwrap()
            .unwrap();
        assert!(get_pending_workouts(store, &coach_ben).await.unwrap().is_empty());

        let coach_amy = get_profile(store, &test_db.profile_id("coach_amy"))
            .await
            .unwrap()
            .unwrap();
        let pending = get_pending_workouts(store, &coach_amy).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].exercise.as_ref().map(|e| e.name.as_str()), Some("Deadlift"));
    }

    #[tokio::test]
    async fn test_plan_for_unknown_exercise_is_rejected() {
        let test_db = TestDbBuilder::new()
            .trainee("tina")
            .build()
            .await
            .expect("Failed to build test database");

        let result = create_workout_plan(
            &test_db.store,
            &NewWorkoutPlan {
                trainee_id: test_db.profile_id("tina"),
                exercise_id: "missing-exercise".to_string(),
                assigned_sets: 3,
                assigned_reps: 10,
                assigned_weight: 50.0,
            },
        )
        .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_cached_plans_refresh_after_create() {
        let test_db = create_standard_test_db().await;
        let store = &test_db.store;
        let scope = vec![test_db.profile_id("tina")];

        assert_eq!(get_workout_plans(store, &scope).await.unwrap().len(), 1);
        assert_eq!(pending_workouts_for(store, &scope).await.unwrap().len(), 1);

        create_workout_plan(
            store,
            &NewWorkoutPlan {
                trainee_id: scope[0].clone(),
                exercise_id: test_db.exercise_id("Bench Press"),
                assigned_sets: 4,
                assigned_reps: 8,
                assigned_weight: 60.0,
            },
        )
        .await
        .unwrap();

        assert_eq!(get_workout_plans(store, &scope).await.unwrap().len(), 2);
        assert_eq!(pending_workouts_for(store, &scope).await.unwrap().len(), 2);
    }

    #[rocket::async_test]
    async fn test_failed_session_log_leaves_plan_done() {
        let (client, test_db) = setup_test_client(create_standard_test_db().await).await;
        let tina = test_db.profile_id("tina");
        let plan_id = get_workout_plans(&test_db.store, &[tina]).await.unwrap()[0]
            .id
            .clone();

        login_test_user(&client, "tina").await;

        sqlx::query("DROP TABLE session_logs")
            .execute(test_db.store.pool())
            .await
            .unwrap();

        let response = client
            .post(format!("/api/workout-plans/{}/complete", plan_id))
            .header(ContentType::JSON)
            .body("{}")
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::InternalServerError);

        let plan = get_workout_plan(&test_db.store, &plan_id).await.unwrap();
        assert_eq!(plan.status, PlanStatus::Done);
    }

    #[rocket::async_test]
    async fn test_workout_completes_only_once() {
        let (client, test_db) = setup_test_client(create_standard_test_db().await).await;
        let tina = test_db.profile_id("tina");
        let plan_id = get_workout_plans(&test_db.store, &[tina.clone()]).await.unwrap()[0]
            .id
            .clone();

        login_test_user(&client, "tina").await;

        for expected in [Status::Ok, Status::Conflict] {
            let response = client
                .post(format!("/api/workout-plans/{}/complete", plan_id))
                .header(ContentType::JSON)
                .body("{}")
                .dispatch()
                .await;
            assert_eq!(response.status(), expected);
        }

        let logs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM session_logs WHERE trainee_id = ?")
            .bind(&tina)
            .fetch_one(test_db.store.pool())
            .await
            .unwrap();
        assert_eq!(logs, 1);
    }
}
