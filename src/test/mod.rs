mod api;
mod assignments;
pub mod utils;
mod workouts;

pub use utils::{test_db, test_utils};
