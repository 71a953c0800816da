#[cfg(test)]
mod tests {
    use crate::api::auth::LoginResponse;
    use crate::api::workouts::CompletedWorkout;
    use crate::auth::{Profile, Role};
    use crate::db::get_workout_plans;
    use crate::models::{Exercise, PlanStatus, TrainerAssignment};
    use crate::test::test_utils::{
        create_standard_test_db, login_test_user, logout, setup_test_client,
    };
    use rocket::http::{ContentType, Status};
    use serde_json::{Value, json};

    #[rocket::async_test]
    async fn test_signup_starts_session() {
        let (client, _) = setup_test_client(create_standard_test_db().await).await;

        let response = client
            .post("/api/auth/signup")
            .header(ContentType::JSON)
            .body(
                json!({
                    "name": "New Trainee",
                    "email": "new.trainee@gym.test",
                    "password": "secret123",
                    "role": "trainee",
                })
                .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Created);
        let body: LoginResponse = response.into_json().await.unwrap();
        assert!(body.success);
        assert_eq!(body.redirect_url.as_deref(), Some("/select-trainer"));

        let response = client.get("/api/me").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let me: Profile = response.into_json().await.unwrap();
        assert_eq!(me.email, "new.trainee@gym.test");
        assert_eq!(me.role, Role::Trainee);
    }

    #[rocket::async_test]
    async fn test_signup_with_taken_email() {
        let (client, _) = setup_test_client(create_standard_test_db().await).await;

        let response = client
            .post("/api/auth/signup")
            .header(ContentType::JSON)
            .body(
                json!({
                    "name": "Tina Again",
                    "email": "tina@gym.test",
                    "password": "secret123",
                    "role": "trainee",
                })
                .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Conflict);
    }

    #[rocket::async_test]
    async fn test_login_with_wrong_password() {
        let (client, _) = setup_test_client(create_standard_test_db().await).await;

        let response = client
            .post("/api/auth/login")
            .header(ContentType::JSON)
            .body(
                json!({
                    "email": "coach_amy@gym.test",
                    "password": "wrong_password",
                })
                .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        let body: LoginResponse = response.into_json().await.unwrap();
        assert!(!body.success);
        assert!(body.user.is_none());
        assert_eq!(body.error.as_deref(), Some("Invalid email or password"));

        let response = client.get("/api/me").dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);
    }

    #[rocket::async_test]
    async fn test_login_redirects_by_role() {
        let (client, _) = setup_test_client(create_standard_test_db().await).await;

        let response = client
            .post("/api/auth/login")
            .header(ContentType::JSON)
            .body(json!({ "email": "coach_amy@gym.test", "password": "password123" }).to_string())
            .dispatch()
            .await;
        let body: LoginResponse = response.into_json().await.unwrap();
        assert_eq!(body.redirect_url.as_deref(), Some("/dashboard"));

        let response = client
            .post("/api/auth/login")
            .header(ContentType::JSON)
            .body(json!({ "email": "tina@gym.test", "password": "password123" }).to_string())
            .dispatch()
            .await;
        let body: LoginResponse = response.into_json().await.unwrap();
        assert_eq!(body.redirect_url.as_deref(), Some("/my-workouts"));
    }

    #[rocket::async_test]
    async fn test_anonymous_api_request_is_unauthorized() {
        let (client, _) = setup_test_client(create_standard_test_db().await).await;

        let response = client.get("/api/exercises").dispatch().await;

        assert_eq!(response.status(), Status::Unauthorized);
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["error"], "Unauthorized");
    }

    #[rocket::async_test]
    async fn test_trainee_cannot_create_exercise() {
        let (client, _) = setup_test_client(create_standard_test_db().await).await;
        login_test_user(&client, "tina").await;

        let response = client
            .post("/api/exercises")
            .header(ContentType::JSON)
            .body(json!({ "name": "Lunge", "category": "Legs" }).to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Forbidden);
    }

    #[rocket::async_test]
    async fn test_trainer_exercise_validation() {
        let (client, _) = setup_test_client(create_standard_test_db().await).await;
        login_test_user(&client, "coach_amy").await;

        let response = client
            .post("/api/exercises")
            .header(ContentType::JSON)
            .body(json!({ "name": "", "category": "Legs" }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::UnprocessableEntity);
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["errors"]["name"][0], "Exercise name is required");

        let response = client
            .post("/api/exercises")
            .header(ContentType::JSON)
            .body(json!({ "name": "Lunge", "category": "Legs" }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);
        let created: Exercise = response.into_json().await.unwrap();
        assert_eq!(created.default_sets, 3);

        let response = client.get("/api/exercises").dispatch().await;
        let exercises: Vec<Exercise> = response.into_json().await.unwrap();
        assert_eq!(exercises.len(), 3);
    }

    #[rocket::async_test]
    async fn test_trainee_chooses_trainer() {
        let (client, test_db) = setup_test_client(create_standard_test_db().await).await;
        login_test_user(&client, "una").await;

        let response = client.get("/api/assignments/me").dispatch().await;
        let current: Option<Value> = response.into_json().await.unwrap();
        assert!(current.is_none());

        let coach_ben = test_db.profile_id("coach_ben");
        let response = client
            .post("/api/assignments")
            .header(ContentType::JSON)
            .body(json!({ "trainer_id": coach_ben }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);
        let assignment: TrainerAssignment = response.into_json().await.unwrap();
        assert_eq!(assignment.trainer_id, coach_ben);
        assert_eq!(assignment.trainee_id, test_db.profile_id("una"));

        let response = client
            .post("/api/assignments")
            .header(ContentType::JSON)
            .body(json!({ "trainer_id": test_db.profile_id("coach_amy") }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Conflict);

        let response = client.get("/api/assignments/me").dispatch().await;
        let current: Value = response.into_json().await.unwrap();
        assert_eq!(current["trainer"]["id"], coach_ben);
    }

    #[rocket::async_test]
    async fn test_trainer_cannot_plan_for_unassigned_trainee() {
        let (client, test_db) = setup_test_client(create_standard_test_db().await).await;
        login_test_user(&client, "coach_ben").await;

        let response = client
            .post("/api/workout-plans")
            .header(ContentType::JSON)
            .body(
                json!({
                    "trainee_id": test_db.profile_id("tina"),
                    "exercise_id": test_db.exercise_id("Deadlift"),
                    "assigned_sets": 3,
                    "assigned_reps": 10,
                    "assigned_weight": 60.0,
                })
                .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Forbidden);
    }

    #[rocket::async_test]
    async fn test_trainer_plans_for_assigned_trainee() {
        let (client, test_db) = setup_test_client(create_standard_test_db().await).await;
        login_test_user(&client, "coach_amy").await;
        let tom = test_db.profile_id("tom");

        let response = client
            .post("/api/workout-plans")
            .header(ContentType::JSON)
            .body(
                json!({
                    "trainee_id": tom,
                    "exercise_id": test_db.exercise_id("Bench Press"),
                    "assigned_sets": 4,
                    "assigned_reps": 8,
                    "assigned_weight": 70.0,
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);

        let response = client.get("/api/workout-plans/pending").dispatch().await;
        let pending: Vec<Value> = response.into_json().await.unwrap();
        assert_eq!(pending.len(), 2);
    }

    #[rocket::async_test]
    async fn test_complete_workout_defaults() {
        let (client, test_db) = setup_test_client(create_standard_test_db().await).await;
        let tina = test_db.profile_id("tina");
        let plan_id = get_workout_plans(&test_db.store, &[tina.clone()])
            .await
            .unwrap()[0]
            .id
            .clone();

        login_test_user(&client, "tina").await;

        let response = client
            .post(format!("/api/workout-plans/{}/complete", plan_id))
            .header(ContentType::JSON)
            .body("{}")
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        let completed: CompletedWorkout = response.into_json().await.unwrap();
        assert_eq!(completed.plan.status, PlanStatus::Done);
        assert_eq!(completed.session_log.trainee_id, tina);
        assert_eq!(completed.session_log.actual_weight, 80.0);
        assert_eq!(completed.session_log.rating, Some(5));

        let response = client.get("/api/session-logs").dispatch().await;
        let logs: Vec<Value> = response.into_json().await.unwrap();
        assert_eq!(logs.len(), 1);
    }

    #[rocket::async_test]
    async fn test_other_trainee_cannot_complete_workout() {
        let (client, test_db) = setup_test_client(create_standard_test_db().await).await;
        let plan_id = get_workout_plans(&test_db.store, &[test_db.profile_id("tina")])
            .await
            .unwrap()[0]
            .id
            .clone();

        login_test_user(&client, "tom").await;

        let response = client
            .post(format!("/api/workout-plans/{}/complete", plan_id))
            .header(ContentType::JSON)
            .body(json!({ "actual_weight": 10.0, "rating": 3 }).to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Forbidden);
    }

    #[rocket::async_test]
    async fn test_trainer_cannot_complete_trainee_workout() {
        let (client, test_db) = setup_test_client(create_standard_test_db().await).await;
        let tina = test_db.profile_id("tina");
        let plan_id = get_workout_plans(&test_db.store, &[tina.clone()])
            .await
            .unwrap()[0]
            .id
            .clone();

        login_test_user(&client, "coach_amy").await;

        let response = client
            .post(format!("/api/workout-plans/{}/complete", plan_id))
            .header(ContentType::JSON)
            .body("{}")
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Forbidden);

        let plans = get_workout_plans(&test_db.store, &[tina]).await.unwrap();
        assert_eq!(plans[0].status, PlanStatus::Pending);
    }

    #[rocket::async_test]
    async fn test_trainer_drives_assigned_trainee_timer() {
        let (client, test_db) = setup_test_client(create_standard_test_db().await).await;
        login_test_user(&client, "coach_amy").await;

        let response = client
            .post(format!("/api/timers/{}/start", test_db.profile_id("tina")))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let response = client
            .post(format!("/api/timers/{}/start", test_db.profile_id("una")))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Forbidden);
    }

    #[rocket::async_test]
    async fn test_timer_lifecycle_over_http() {
        let (client, test_db) = setup_test_client(create_standard_test_db().await).await;
        let tina = test_db.profile_id("tina");
        login_test_user(&client, "tina").await;

        let response = client
            .post(format!("/api/timers/{}/start", tina))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let response = client
            .put(format!("/api/timers/{}/status", tina))
            .header(ContentType::JSON)
            .body(json!({ "status": "break", "break_reason": "Water" }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["timer"]["break_reason"], "Water");

        let response = client.delete(format!("/api/timers/{}", tina)).dispatch().await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["stopped"], true);

        let response = client.get(format!("/api/timers/{}", tina)).dispatch().await;
        let body: Value = response.into_json().await.unwrap();
        assert!(body["timer"].is_null());
        assert_eq!(body["tick"]["elapsed_seconds"], 0);

        logout(&client).await;
        login_test_user(&client, "tom").await;
        let response = client
            .post(format!("/api/timers/{}/start", tina))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Forbidden);
    }

    #[rocket::async_test]
    async fn test_change_stream_rejections() {
        let (client, test_db) = setup_test_client(create_standard_test_db().await).await;

        let response = client.get("/api/realtime/workout_plans").dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);

        login_test_user(&client, "coach_ben").await;

        let response = client.get("/api/realtime/heart_rates").dispatch().await;
        assert_eq!(response.status(), Status::NotFound);

        let response = client
            .get(format!(
                "/api/realtime/workout_plans?trainee_id={}",
                test_db.profile_id("tina")
            ))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Forbidden);

        let response = client
            .get(format!("/api/timers/{}/clock", test_db.profile_id("tina")))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Forbidden);
    }

    #[rocket::async_test]
    async fn test_seed_function_allows_cross_origin() {
        let (client, _) = setup_test_client(create_standard_test_db().await).await;

        let response = client.options("/functions/seed-database").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(
            response.headers().get_one("Access-Control-Allow-Origin"),
            Some("*")
        );

        let response = client.post("/functions/seed-database").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(
            response.headers().get_one("Access-Control-Allow-Origin"),
            Some("*")
        );
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["exercises"], 10);
    }

    #[rocket::async_test]
    async fn test_health() {
        let (client, _) = setup_test_client(create_standard_test_db().await).await;

        let response = client.get("/api/health").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[rocket::async_test]
    async fn test_logout_ends_session() {
        let (client, _) = setup_test_client(create_standard_test_db().await).await;
        login_test_user(&client, "coach_amy").await;

        let response = client.get("/api/me").dispatch().await;
        assert_eq!(response.status(), Status::Ok);

        let response = client.post("/api/auth/logout").dispatch().await;
        assert_eq!(response.status(), Status::NoContent);

        let response = client.get("/api/me").dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);
    }
}
