use rocket::response::stream::{Event, EventStream};
use rocket::tokio::select;
use rocket::tokio::sync::broadcast::error::RecvError;
use rocket::{Shutdown, State};
use tracing::{debug, info, warn};

use super::ensure_trainee_access;
use crate::auth::{Profile, Role};
use crate::db::trainer_has_trainee;
use crate::realtime::{ChangeEvent, ChannelSpec, Table};
use crate::store::Store;
use crate::validation::{ApiResult, AppErrorExt};

/// Tables whose rows are not owned by a trainee.
fn is_shared(table: Table) -> bool {
    matches!(table, Table::Exercises | Table::Profiles)
}

async fn visible_to(store: &Store, viewer: &Profile, spec: &ChannelSpec, event: &ChangeEvent) -> bool {
    if !spec.matches(event) {
        return false;
    }
    if spec.filter.is_some() || is_shared(spec.table) || viewer.role != Role::Trainer {
        return true;
    }

    match &event.trainee_id {
        Some(trainee_id) => trainer_has_trainee(store, &viewer.id, trainee_id)
            .await
            .unwrap_or(false),
        None => true,
    }
}

/// Forwards committed changes on one table as server-sent events. Trainees
/// only ever see their own rows; trainers see rows of their trainees.
#[get("/realtime/<table>?<trainee_id>")]
pub async fn api_realtime_changes(
    table: &str,
    trainee_id: Option<&str>,
    profile: Profile,
    store: &State<Store>,
    mut shutdown: Shutdown,
) -> ApiResult<EventStream![]> {
    let table = table.parse::<Table>().validate_custom()?;

    let mut spec = ChannelSpec::new(format!("sse-{}-{}", table, profile.id), table);
    if !is_shared(table) {
        match (profile.role, trainee_id) {
            (Role::Trainee, _) => spec = spec.for_trainee(&profile.id),
            (Role::Trainer, Some(trainee_id)) => {
                ensure_trainee_access(store, &profile, trainee_id).await?;
                spec = spec.for_trainee(trainee_id);
            }
            (Role::Trainer, None) => {}
        }
    }

    info!(channel = %spec.name, "Opening change stream");
    let store = store.inner().clone();
    let mut receiver = store.bus().subscribe();

    Ok(EventStream! {
        loop {
            let event = select! {
                received = receiver.recv() => received,
                _ = &mut shutdown => break,
            };

            match event {
                Ok(event) => {
                    if visible_to(&store, &profile, &spec, &event).await {
                        debug!(channel = %spec.name, kind = ?event.kind, "Forwarding change");
                        yield Event::json(&event).event("change");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(channel = %spec.name, skipped, "Change stream lagged");
                    yield Event::data("resync").event("resync");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
