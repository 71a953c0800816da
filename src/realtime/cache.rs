//! Shared cache of query results keyed by query group and scope.
//!
//! Entries are JSON snapshots. Invalidation marks entries stale rather than
//! removing them, and bumps the group's epoch so a fetch that started before
//! the invalidation cannot store its now-outdated result as fresh.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryGroup {
    Exercises,
    Profile,
    Trainees,
    TrainersAvailability,
    MyTrainerAssignment,
    MyTrainees,
    WorkoutPlans,
    PendingWorkouts,
    SessionLogs,
    WorkoutTimer,
}

impl QueryGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryGroup::Exercises => "exercises",
            QueryGroup::Profile => "profile",
            QueryGroup::Trainees => "trainees",
            QueryGroup::TrainersAvailability => "trainers_availability",
            QueryGroup::MyTrainerAssignment => "my_trainer_assignment",
            QueryGroup::MyTrainees => "my_trainees",
            QueryGroup::WorkoutPlans => "workout_plans",
            QueryGroup::PendingWorkouts => "pending_workouts",
            QueryGroup::SessionLogs => "session_logs",
            QueryGroup::WorkoutTimer => "workout_timer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub group: QueryGroup,
    pub scope: Option<String>,
}

impl QueryKey {
    pub fn group(group: QueryGroup) -> Self {
        Self { group, scope: None }
    }

    pub fn scoped(group: QueryGroup, scope: impl Into<String>) -> Self {
        Self {
            group,
            scope: Some(scope.into()),
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    value: serde_json::Value,
    stale: bool,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<QueryKey, CacheEntry>,
    epochs: HashMap<QueryGroup, u64>,
}

#[derive(Debug, Default)]
pub struct QueryCache {
    state: RwLock<CacheState>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value if it is present and fresh.
    pub async fn get<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        let state = self.state.read().await;
        let entry = state.entries.get(key).filter(|entry| !entry.stale)?;

        match serde_json::from_value(entry.value.clone()) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(group = key.group.as_str(), error = %err, "Discarding unreadable cache entry");
                None
            }
        }
    }

    /// Current epoch of a group. Pass it back to [`QueryCache::put`].
    pub async fn epoch(&self, group: QueryGroup) -> u64 {
        self.state
            .read()
            .await
            .epochs
            .get(&group)
            .copied()
            .unwrap_or_default()
    }

    /// Stores a fetched value unless the group was invalidated after `epoch`
    /// was read. Returns whether the value was stored.
    pub async fn put<T: Serialize>(&self, key: QueryKey, value: &T, epoch: u64) -> bool {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(err) => {
                warn!(group = key.group.as_str(), error = %err, "Value not cacheable");
                return false;
            }
        };

        let mut state = self.state.write().await;
        let current = state.epochs.get(&key.group).copied().unwrap_or_default();
        if current != epoch {
            debug!(group = key.group.as_str(), "Skipping cache store after invalidation");
            return false;
        }

        state.entries.insert(
            key,
            CacheEntry {
                value,
                stale: false,
            },
        );
        true
    }

    /// Marks every entry in the group stale. Returns how many entries were
    /// fresh before the call.
    pub async fn invalidate_group(&self, group: QueryGroup) -> usize {
        let mut state = self.state.write().await;
        *state.epochs.entry(group).or_default() += 1;

        let mut invalidated = 0;
        for (key, entry) in state.entries.iter_mut() {
            if key.group == group && !entry.stale {
                entry.stale = true;
                invalidated += 1;
            }
        }

        debug!(group = group.as_str(), invalidated, "Invalidated query group");
        invalidated
    }

    pub async fn invalidate(&self, key: &QueryKey) -> bool {
        let mut state = self.state.write().await;
        *state.epochs.entry(key.group).or_default() += 1;

        match state.entries.get_mut(key) {
            Some(entry) if !entry.stale => {
                entry.stale = true;
                true
            }
            _ => false,
        }
    }

    pub async fn is_fresh(&self, key: &QueryKey) -> bool {
        self.state
            .read()
            .await
            .entries
            .get(key)
            .is_some_and(|entry| !entry.stale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_entries_are_served() {
        let cache = QueryCache::new();
        let key = QueryKey::group(QueryGroup::Exercises);

        let epoch = cache.epoch(QueryGroup::Exercises).await;
        assert!(cache.put(key.clone(), &vec!["Plank".to_string()], epoch).await);

        let cached: Option<Vec<String>> = cache.get(&key).await;
        assert_eq!(cached, Some(vec!["Plank".to_string()]));
    }

    #[tokio::test]
    async fn group_invalidation_marks_only_that_group() {
        let cache = QueryCache::new();
        let plans_a = QueryKey::scoped(QueryGroup::WorkoutPlans, "a");
        let plans_b = QueryKey::scoped(QueryGroup::WorkoutPlans, "b");
        let logs = QueryKey::scoped(QueryGroup::SessionLogs, "a");

        cache.put(plans_a.clone(), &1, 0).await;
        cache.put(plans_b.clone(), &2, 0).await;
        cache.put(logs.clone(), &3, 0).await;

        assert_eq!(cache.invalidate_group(QueryGroup::WorkoutPlans).await, 2);
        assert!(!cache.is_fresh(&plans_a).await);
        assert!(!cache.is_fresh(&plans_b).await);
        assert!(cache.is_fresh(&logs).await);
        assert_eq!(cache.get::<i32>(&plans_a).await, None);
    }

    #[tokio::test]
    async fn fetch_started_before_invalidation_is_not_stored() {
        let cache = QueryCache::new();
        let key = QueryKey::scoped(QueryGroup::WorkoutTimer, "trainee-1");

        let epoch = cache.epoch(QueryGroup::WorkoutTimer).await;
        cache.invalidate(&key).await;

        assert!(!cache.put(key.clone(), &"outdated", epoch).await);
        assert!(!cache.is_fresh(&key).await);

        let epoch = cache.epoch(QueryGroup::WorkoutTimer).await;
        assert!(cache.put(key.clone(), &"current", epoch).await);
        assert!(cache.is_fresh(&key).await);
    }
}
