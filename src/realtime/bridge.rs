use std::fmt;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{ChangeBus, ChangeEvent, QueryCache, QueryGroup, QueryKey, Table};

/// What a channel marks stale when one of its events arrives.
#[derive(Debug, Clone, PartialEq)]
pub enum Invalidation {
    Group(QueryGroup),
    Key(QueryKey),
}

/// Restricts a channel to the rows of one trainee.
#[derive(Debug, Clone, PartialEq)]
pub struct RowFilter {
    pub trainee_id: String,
}

impl fmt::Display for RowFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trainee_id=eq.{}", self.trainee_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSpec {
    pub name: String,
    pub table: Table,
    pub filter: Option<RowFilter>,
    pub invalidates: Vec<Invalidation>,
}

impl ChannelSpec {
    pub fn new(name: impl Into<String>, table: Table) -> Self {
        Self {
            name: name.into(),
            table,
            filter: None,
            invalidates: Vec::new(),
        }
    }

    pub fn for_trainee(mut self, trainee_id: impl Into<String>) -> Self {
        self.filter = Some(RowFilter {
            trainee_id: trainee_id.into(),
        });
        self
    }

    pub fn invalidating_groups(mut self, groups: &[QueryGroup]) -> Self {
        self.invalidates
            .extend(groups.iter().copied().map(Invalidation::Group));
        self
    }

    pub fn invalidating_key(mut self, key: QueryKey) -> Self {
        self.invalidates.push(Invalidation::Key(key));
        self
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        if event.table != self.table {
            return false;
        }

        match &self.filter {
            Some(filter) => event.trainee_id.as_deref() == Some(filter.trainee_id.as_str()),
            None => true,
        }
    }
}

pub const WORKOUT_PLANS_CHANNEL: &str = "workout_plans_changes";
pub const ASSIGNMENTS_CHANNEL: &str = "trainer-assignments-changes";

/// Channels held open for the lifetime of the service.
pub fn default_channels() -> Vec<ChannelSpec> {
    vec![
        ChannelSpec::new(WORKOUT_PLANS_CHANNEL, Table::WorkoutPlans)
            .invalidating_groups(&[QueryGroup::WorkoutPlans, QueryGroup::PendingWorkouts]),
        ChannelSpec::new(ASSIGNMENTS_CHANNEL, Table::TrainerTraineeAssignments)
            .invalidating_groups(&[
                QueryGroup::MyTrainees,
                QueryGroup::Trainees,
                QueryGroup::TrainersAvailability,
                QueryGroup::MyTrainerAssignment,
                QueryGroup::PendingWorkouts,
            ]),
    ]
}

/// The per-trainee timer channel, opened while a clock is being watched.
pub fn timer_channel(trainee_id: &str) -> ChannelSpec {
    ChannelSpec::new(format!("workout-timer-{}", trainee_id), Table::WorkoutTimers)
        .for_trainee(trainee_id)
        .invalidating_key(QueryKey::scoped(QueryGroup::WorkoutTimer, trainee_id))
}

/// A live channel. Dropping it stops the listener.
#[derive(Debug)]
pub struct Subscription {
    name: String,
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        debug!(channel = %self.name, "Closing realtime channel");
        self.handle.abort();
    }
}

#[derive(Debug, Clone)]
pub struct RealtimeBridge {
    bus: Arc<ChangeBus>,
    cache: Arc<QueryCache>,
}

impl RealtimeBridge {
    pub fn new(bus: Arc<ChangeBus>, cache: Arc<QueryCache>) -> Self {
        Self { bus, cache }
    }

    /// Opens a channel. The receiver is registered before this returns, so
    /// no event published afterwards is missed.
    pub fn subscribe(&self, spec: ChannelSpec) -> Subscription {
        let mut receiver = self.bus.subscribe();
        let cache = self.cache.clone();
        let name = spec.name.clone();

        match &spec.filter {
            Some(filter) => info!(channel = %spec.name, table = %spec.table, filter = %filter, "Opening realtime channel"),
            None => info!(channel = %spec.name, table = %spec.table, "Opening realtime channel"),
        }

        let handle = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) if spec.matches(&event) => {
                        debug!(channel = %spec.name, kind = ?event.kind, "Change received");
                        apply(&cache, &spec.invalidates).await;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(channel = %spec.name, skipped, "Realtime channel lagged, invalidating all targets");
                        apply(&cache, &spec.invalidates).await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Subscription { name, handle }
    }

    pub fn subscribe_defaults(&self) -> Vec<Subscription> {
        default_channels()
            .into_iter()
            .map(|spec| self.subscribe(spec))
            .collect()
    }
}

async fn apply(cache: &QueryCache, invalidations: &[Invalidation]) {
    for invalidation in invalidations {
        match invalidation {
            Invalidation::Group(group) => {
                cache.invalidate_group(*group).await;
            }
            Invalidation::Key(key) => {
                cache.invalidate(key).await;
            }
        }
    }
}
