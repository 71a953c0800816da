#[cfg(test)]
pub mod test_db {
    use crate::auth::Role;
    use crate::db::{assign_to_trainer, create_exercise, create_profile, create_workout_plan};
    use crate::error::AppError;
    use crate::models::{NewExercise, NewWorkoutPlan};
    use crate::store::Store;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::collections::HashMap;
    use std::sync::Once;

    static INIT: Once = Once::new();
    pub static STANDARD_PASSWORD: &str = "password123";

    #[derive(Default)]
    pub struct TestDbBuilder {
        profiles: Vec<TestProfile>,
        exercises: Vec<TestExercise>,
        assignments: Vec<(String, String)>,
        plans: Vec<TestPlan>,
    }

    pub struct TestProfile {
        pub name: String,
        pub role: Role,
    }

    pub struct TestExercise {
        pub name: String,
        pub category: String,
    }

    pub struct TestPlan {
        pub trainee: String,
        pub exercise: String,
        pub weight: f64,
    }

    pub fn email_for(name: &str) -> String {
        format!("{}@gym.test", name)
    }

    impl TestDbBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn trainer(mut self, name: &str) -> Self {
            self.profiles.push(TestProfile {
                name: name.to_string(),
                role: Role::Trainer,
            });
            self
        }

        pub fn trainee(mut self, name: &str) -> Self {
            self.profiles.push(TestProfile {
                name: name.to_string(),
                role: Role::Trainee,
            });
            self
        }

        pub fn exercise(mut self, name: &str, category: &str) -> Self {
            self.exercises.push(TestExercise {
                name: name.to_string(),
                category: category.to_string(),
            });
            self
        }

        pub fn assign(mut self, trainer: &str, trainee: &str) -> Self {
            self.assignments
                .push((trainer.to_string(), trainee.to_string()));
            self
        }

        pub fn plan(mut self, trainee: &str, exercise: &str, weight: f64) -> Self {
            self.plans.push(TestPlan {
                trainee: trainee.to_string(),
                exercise: exercise.to_string(),
                weight,
            });
            self
        }

        pub async fn build(self) -> Result<TestDb, AppError> {
            INIT.call_once(|| {
                let _ = env_logger::builder()
                    .parse_filters("debug")
                    .is_test(true)
                    .try_init();
            });

            // One connection that never idles out, so the in-memory database
            // lives as long as the pool.
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect("sqlite::memory:")
                .await?;

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|err| AppError::Internal(err.to_string()))?;

            let store = Store::new(pool);
            let mut profile_ids = HashMap::new();
            let mut exercise_ids = HashMap::new();

            for profile in &self.profiles {
                let created = create_profile(
                    &store,
                    &profile.name,
                    &email_for(&profile.name),
                    STANDARD_PASSWORD,
                    profile.role,
                )
                .await?;
                profile_ids.insert(profile.name.clone(), created.id);
            }

            for exercise in &self.exercises {
                let created = create_exercise(
                    &store,
                    &NewExercise {
                        name: exercise.name.clone(),
                        category: exercise.category.clone(),
                        default_sets: 3,
                        description: None,
                    },
                )
                .await?;
                exercise_ids.insert(exercise.name.clone(), created.id);
            }

            for (trainer, trainee) in &self.assignments {
                assign_to_trainer(&store, &profile_ids[trainee], &profile_ids[trainer]).await?;
            }

            for plan in &self.plans {
                create_workout_plan(
                    &store,
                    &NewWorkoutPlan {
                        trainee_id: profile_ids[&plan.trainee].clone(),
                        exercise_id: exercise_ids[&plan.exercise].clone(),
                        assigned_sets: 3,
                        assigned_reps: 10,
                        assigned_weight: plan.weight,
                    },
                )
                .await?;
            }

            Ok(TestDb {
                store,
                profile_ids,
                exercise_ids,
            })
        }
    }

    pub struct TestDb {
        pub store: Store,
        pub profile_ids: HashMap<String, String>,
        pub exercise_ids: HashMap<String, String>,
    }

    impl TestDb {
        pub fn profile_id(&self, name: &str) -> String {
            self.profile_ids
                .get(name)
                .cloned()
                .unwrap_or_else(|| panic!("no test profile named {}", name))
        }

        pub fn exercise_id(&self, name: &str) -> String {
            self.exercise_ids
                .get(name)
                .cloned()
                .unwrap_or_else(|| panic!("no test exercise named {}", name))
        }
    }
}

#[cfg(test)]
pub mod test_utils {
    use super::test_db::{STANDARD_PASSWORD, TestDb, TestDbBuilder, email_for};
    use crate::env::Settings;
    use crate::init_rocket;
    use crate::store::Store;
    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::{Value, json};

    /// Two trainers, three trainees (two assigned to `coach_amy`) and a small
    /// exercise catalog with one pending plan.
    pub async fn create_standard_test_db() -> TestDb {
        TestDbBuilder::new()
            .trainer("coach_amy")
            .trainer("coach_ben")
            .trainee("tina")
            .trainee("tom")
            .trainee("una")
            .exercise("Deadlift", "Back")
            .exercise("Bench Press", "Chest")
            .assign("coach_amy", "tina")
            .assign("coach_amy", "tom")
            .plan("tina", "Deadlift", 80.0)
            .build()
            .await
            .expect("Failed to build standard test database")
    }

    pub async fn setup_test_client(test_db: TestDb) -> (Client, TestDb) {
        let store: Store = test_db.store.clone();
        let rocket = init_rocket(store, Settings::default()).await;
        let client = Client::tracked(rocket)
            .await
            .expect("valid rocket instance");
        (client, test_db)
    }

    pub async fn login_test_user(client: &Client, name: &str) {
        let response = client
            .post("/api/auth/login")
            .header(ContentType::JSON)
            .body(
                json!({
                    "email": email_for(name),
                    "password": STANDARD_PASSWORD,
                })
                .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().await.expect("login body");
        assert_eq!(body["success"], true, "login failed for {}", name);
    }

    pub async fn logout(client: &Client) {
        client.post("/api/auth/logout").dispatch().await;
    }
}
