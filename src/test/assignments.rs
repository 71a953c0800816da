#[cfg(test)]
mod tests {
    use crate::db::{
        assign_to_trainer, get_my_trainees, get_trainers_with_availability, remove_trainee,
        transfer_trainee,
    };
    use crate::error::AppError;
    use crate::test::test_db::TestDbBuilder;
    use rocket::tokio;

    #[tokio::test]
    async fn test_trainer_capacity_is_four() {
        let test_db = TestDbBuilder::new()
            .trainer("coach")
            .trainee("t1")
            .trainee("t2")
            .trainee("t3")
            .trainee("t4")
            .trainee("t5")
            .assign("coach", "t1")
            .assign("coach", "t2")
            .assign("coach", "t3")
            .assign("coach", "t4")
            .build()
            .await
            .expect("Failed to build test database");
        let store = &test_db.store;

        let result =
            assign_to_trainer(store, &test_db.profile_id("t5"), &test_db.profile_id("coach")).await;
        match result {
            Err(AppError::Validation(msg)) => {
                assert_eq!(msg, "Trainer already has the maximum of 4 trainees")
            }
            other => panic!("Expected capacity validation error, got {:?}", other),
        }

        let trainers = get_trainers_with_availability(store).await.unwrap();
        assert_eq!(trainers.len(), 1);
        assert_eq!(trainers[0].trainee_count, 4);
        assert!(!trainers[0].is_available);
    }

    #[tokio::test]
    async fn test_trainee_has_at_most_one_trainer() {
        let test_db = TestDbBuilder::new()
            .trainer("coach_a")
            .trainer("coach_b")
            .trainee("tina")
            .assign("coach_a", "tina")
            .build()
            .await
            .expect("Failed to build test database");

        let result = assign_to_trainer(
            &test_db.store,
            &test_db.profile_id("tina"),
            &test_db.profile_id("coach_b"),
        )
        .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_assignment_requires_trainer_and_trainee() {
        let test_db = TestDbBuilder::new()
            .trainee("tina")
            .trainee("tom")
            .build()
            .await
            .expect("Failed to build test database");

        let result = assign_to_trainer(
            &test_db.store,
            &test_db.profile_id("tina"),
            &test_db.profile_id("tom"),
        )
        .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_assignment_refreshes_cached_availability() {
        let test_db = TestDbBuilder::new()
            .trainer("coach")
            .trainee("tina")
            .build()
            .await
            .expect("Failed to build test database");
        let store = &test_db.store;

        let before = get_trainers_with_availability(store).await.unwrap();
        assert_eq!(before[0].trainee_count, 0);

        assign_to_trainer(store, &test_db.profile_id("tina"), &test_db.profile_id("coach"))
            .await
            .unwrap();

        let after = get_trainers_with_availability(store).await.unwrap();
        assert_eq!(after[0].trainee_count, 1);
        assert!(after[0].is_available);
    }

    #[tokio::test]
    async fn test_transfer_moves_trainee_between_rosters() {
        let test_db = TestDbBuilder::new()
            .trainer("coach_a")
            .trainer("coach_b")
            .trainee("tina")
            .assign("coach_a", "tina")
            .build()
            .await
            .expect("Failed to build test database");
        let store = &test_db.store;
        let coach_a = test_db.profile_id("coach_a");
        let coach_b = test_db.profile_id("coach_b");
        let tina = test_db.profile_id("tina");

        assert_eq!(get_my_trainees(store, &coach_a).await.unwrap().len(), 1);
        assert!(get_my_trainees(store, &coach_b).await.unwrap().is_empty());

        let moved = transfer_trainee(store, &coach_a, &tina, &coach_b)
            .await
            .expect("Transfer should succeed");
        assert_eq!(moved.trainer_id, coach_b);

        assert!(get_my_trainees(store, &coach_a).await.unwrap().is_empty());
        let roster = get_my_trainees(store, &coach_b).await.unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].trainee.id, tina);
    }

    #[tokio::test]
    async fn test_transfer_respects_receiving_capacity() {
        let test_db = TestDbBuilder::new()
            .trainer("coach_a")
            .trainer("coach_b")
            .trainee("t1")
            .trainee("t2")
            .trainee("t3")
            .trainee("t4")
            .trainee("t5")
            .assign("coach_b", "t1")
            .assign("coach_b", "t2")
            .assign("coach_b", "t3")
            .assign("coach_b", "t4")
            .assign("coach_a", "t5")
            .build()
            .await
            .expect("Failed to build test database");

        let result = transfer_trainee(
            &test_db.store,
            &test_db.profile_id("coach_a"),
            &test_db.profile_id("t5"),
            &test_db.profile_id("coach_b"),
        )
        .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_remove_trainee_only_from_own_roster() {
        let test_db = TestDbBuilder::new()
            .trainer("coach_a")
            .trainer("coach_b")
            .trainee("tina")
            .assign("coach_a", "tina")
            .build()
            .await
            .expect("Failed to build test database");
        let store = &test_db.store;
        let coach_a = test_db.profile_id("coach_a");

        let assignment_id = get_my_trainees(store, &coach_a).await.unwrap()[0]
            .assignment
            .id
            .clone();

        let result = remove_trainee(store, &test_db.profile_id("coach_b"), &assignment_id).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        remove_trainee(store, &coach_a, &assignment_id)
            .await
            .expect("Owner can remove trainee");
        assert!(get_my_trainees(store, &coach_a).await.unwrap().is_empty());
    }
}
