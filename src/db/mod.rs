pub mod assignments;
pub mod exercises;
pub mod profiles;
pub mod session_logs;
pub mod sessions;
pub mod workout_plans;
pub mod workout_timers;

pub use assignments::*;
pub use exercises::*;
pub use profiles::*;
pub use session_logs::*;
pub use sessions::*;
pub use workout_plans::*;
pub use workout_timers::*;

use sqlx::{QueryBuilder, Sqlite};

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Appends ` WHERE <column> IN (?, ?, ...)` binding each id. Callers must not
/// pass an empty slice.
pub(crate) fn push_id_filter<'args>(
    builder: &mut QueryBuilder<'args, Sqlite>,
    column: &str,
    ids: &'args [String],
) {
    builder.push(" WHERE ").push(column).push(" IN (");
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(id.as_str());
    }
    separated.push_unseparated(")");
}

/// Cache scope for a set of trainee ids, independent of their order.
pub(crate) fn scope_for(ids: &[String]) -> String {
    let mut sorted: Vec<&str> = ids.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.join(",")
}
