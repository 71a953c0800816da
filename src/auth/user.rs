use chrono::{DateTime, Utc};
use rocket::http::Status;
use serde::{Deserialize, Serialize};

use super::{Permission, Role};
use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbProfile {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl TryFrom<DbProfile> for Profile {
    type Error = AppError;

    fn try_from(profile: DbProfile) -> Result<Self, Self::Error> {
        Ok(Self {
            id: profile.id.unwrap_or_default(),
            name: profile.name.unwrap_or_default(),
            email: profile.email.unwrap_or_default(),
            role: profile.role.unwrap_or_default().parse()?,
            created_at: profile.created_at.unwrap_or_else(Utc::now),
        })
    }
}

/// The `{id, name}` projection joined onto plans and logs.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProfileRef {
    pub id: String,
    pub name: String,
}

impl Profile {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.role.has_permission(permission)
    }

    pub fn require_permission(&self, permission: Permission) -> Result<(), Status> {
        if self.role.has_permission(permission) {
            Ok(())
        } else {
            tracing::warn!(
                profile_id = %self.id,
                role = %self.role.as_str(),
                permission = ?permission,
                "Permission denied"
            );
            Err(Status::Forbidden)
        }
    }

    pub fn is_trainer(&self) -> bool {
        matches!(self.role, Role::Trainer)
    }
}
