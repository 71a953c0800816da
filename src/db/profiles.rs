use chrono::Utc;
use sqlx::Row;
use tracing::{info, instrument};

use super::new_id;
use crate::auth::{DbProfile, Profile, Role};
use crate::error::AppError;
use crate::realtime::{ChangeEvent, ChangeKind, QueryGroup, QueryKey, Table};
use crate::store::Store;

const PROFILE_COLUMNS: &str = "id, name, email, role, created_at";

#[cfg(not(test))]
const BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;
#[cfg(test)]
const BCRYPT_COST: u32 = 4;

#[instrument(skip(store, password))]
pub async fn create_profile(
    store: &Store,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
) -> Result<Profile, AppError> {
    info!("Creating profile");

    let email = email.trim().to_lowercase();

    if find_profile_by_email(store, &email).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "An account for '{}' already exists",
            email
        )));
    }

    let hashed_password = bcrypt::hash(password, BCRYPT_COST)?;
    let profile = Profile {
        id: new_id(),
        name: name.trim().to_string(),
        email,
        role,
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO profiles (id, name, email, role, password, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&profile.id)
    .bind(&profile.name)
    .bind(&profile.email)
    .bind(profile.role.as_str())
    .bind(hashed_password)
    .bind(profile.created_at)
    .execute(store.pool())
    .await?;

    store
        .committed(
            ChangeEvent::new(Table::Profiles, ChangeKind::Insert).with_row(&profile.id),
            &[QueryGroup::Profile, QueryGroup::TrainersAvailability],
        )
        .await;

    Ok(profile)
}

/// Returns the profile when the email and password match.
#[instrument(skip(store, password))]
pub async fn authenticate(
    store: &Store,
    email: &str,
    password: &str,
) -> Result<Option<Profile>, AppError> {
    info!("Authenticating profile");

    let row = sqlx::query("SELECT id, password FROM profiles WHERE email = ?")
        .bind(email.trim().to_lowercase())
        .fetch_optional(store.pool())
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let hashed: String = row.try_get("password")?;
    if !bcrypt::verify(password, &hashed).unwrap_or(false) {
        return Ok(None);
    }

    let id: String = row.try_get("id")?;
    get_profile(store, &id).await
}

#[instrument(skip(store))]
pub async fn get_profile(store: &Store, id: &str) -> Result<Option<Profile>, AppError> {
    store
        .cached(QueryKey::scoped(QueryGroup::Profile, id), || async {
            info!("Fetching profile by id");
            let row = sqlx::query_as::<_, DbProfile>(&format!(
                "SELECT {} FROM profiles WHERE id = ?",
                PROFILE_COLUMNS
            ))
            .bind(id)
            .fetch_optional(store.pool())
            .await?;

            row.map(Profile::try_from).transpose()
        })
        .await
}

#[instrument(skip(store))]
pub async fn find_profile_by_email(store: &Store, email: &str) -> Result<Option<Profile>, AppError> {
    info!("Fetching profile by email");
    let row = sqlx::query_as::<_, DbProfile>(&format!(
        "SELECT {} FROM profiles WHERE email = ?",
        PROFILE_COLUMNS
    ))
    .bind(email.trim().to_lowercase())
    .fetch_optional(store.pool())
    .await?;

    row.map(Profile::try_from).transpose()
}

/// Profiles of the trainees assigned to `trainer_id`, sorted by name.
#[instrument(skip(store))]
pub async fn get_trainees_for_trainer(
    store: &Store,
    trainer_id: &str,
) -> Result<Vec<Profile>, AppError> {
    store
        .cached(QueryKey::scoped(QueryGroup::Trainees, trainer_id), || async {
            info!("Fetching trainees for trainer");
            let rows = sqlx::query_as::<_, DbProfile>(
                "SELECT p.id, p.name, p.email, p.role, p.created_at
                 FROM profiles p
                 JOIN trainer_trainee_assignments a ON a.trainee_id = p.id
                 WHERE a.trainer_id = ?
                 ORDER BY p.name",
            )
            .bind(trainer_id)
            .fetch_all(store.pool())
            .await?;

            rows.into_iter().map(Profile::try_from).collect()
        })
        .await
}

/// Every trainee id, oldest profile first.
#[instrument(skip(store))]
pub async fn get_all_trainee_ids(store: &Store) -> Result<Vec<String>, AppError> {
    info!("Fetching trainee ids");
    let ids = sqlx::query_scalar::<_, String>(
        "SELECT id FROM profiles WHERE role = 'trainee' ORDER BY created_at, id",
    )
    .fetch_all(store.pool())
    .await?;

    Ok(ids)
}
