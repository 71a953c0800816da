use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ViewOwnWorkouts,
    CompleteOwnWorkouts,
    ChooseTrainer,
    ManageOwnTimer,

    ViewAssignedTrainees,
    PlanWorkouts,
    ManageExercises,
    ManageTrainees,
    ViewReports,
    ManageTraineeTimers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Trainer,
    Trainee,
}

static TRAINEE_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.insert(Permission::ViewOwnWorkouts);
    permissions.insert(Permission::CompleteOwnWorkouts);
    permissions.insert(Permission::ChooseTrainer);
    permissions.insert(Permission::ManageOwnTimer);

    permissions
});

static TRAINER_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.insert(Permission::ViewAssignedTrainees);
    permissions.insert(Permission::PlanWorkouts);
    permissions.insert(Permission::ManageExercises);
    permissions.insert(Permission::ManageTrainees);
    permissions.insert(Permission::ViewReports);
    permissions.insert(Permission::ManageTraineeTimers);

    permissions
});

impl Role {
    pub fn permissions(&self) -> &'static HashSet<Permission> {
        match self {
            Role::Trainer => &TRAINER_PERMISSIONS,
            Role::Trainee => &TRAINEE_PERMISSIONS,
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Trainer => "trainer",
            Role::Trainee => "trainee",
        }
    }

    /// Landing page for the role, used when a page rejects the role.
    pub fn home_path(&self) -> &'static str {
        match self {
            Role::Trainer => "/dashboard",
            Role::Trainee => "/my-workouts",
        }
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trainer" => Ok(Role::Trainer),
            "trainee" => Ok(Role::Trainee),
            _ => Err(AppError::Validation(format!("Unknown role: {}", s))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_permissions_are_disjoint() {
        assert!(Role::Trainer.has_permission(Permission::PlanWorkouts));
        assert!(Role::Trainer.has_permission(Permission::ManageTraineeTimers));
        assert!(!Role::Trainer.has_permission(Permission::ChooseTrainer));

        assert!(Role::Trainee.has_permission(Permission::CompleteOwnWorkouts));
        assert!(!Role::Trainee.has_permission(Permission::ViewReports));

        assert!(
            Role::Trainer
                .permissions()
                .is_disjoint(Role::Trainee.permissions())
        );
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("trainer".parse::<Role>().unwrap(), Role::Trainer);
        assert_eq!("trainee".parse::<Role>().unwrap(), Role::Trainee);
        assert!("coach".parse::<Role>().is_err());
        assert_eq!(Role::Trainee.to_string(), "trainee");
        assert_eq!(
            serde_json::to_string(&Role::Trainer).unwrap(),
            "\"trainer\""
        );
    }

    #[test]
    fn test_home_paths() {
        assert_eq!(Role::Trainer.home_path(), "/dashboard");
        assert_eq!(Role::Trainee.home_path(), "/my-workouts");
    }
}
