use rand::SeedableRng;
use rand::rngs::StdRng;
use rocket::{Responder, State};
use rocket::http::{Header, Status};
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde_json::{Value, json};
use tracing::error;

use crate::seed::seed_database;
use crate::store::Store;

const ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

fn allow_origin() -> Header<'static> {
    Header::new("Access-Control-Allow-Origin", "*")
}

fn allow_headers() -> Header<'static> {
    Header::new("Access-Control-Allow-Headers", ALLOW_HEADERS)
}

#[derive(Responder)]
pub struct SeedReply {
    inner: Custom<Json<Value>>,
    allow_origin: Header<'static>,
    allow_headers: Header<'static>,
}

impl SeedReply {
    fn new(status: Status, body: Value) -> Self {
        Self {
            inner: Custom(status, Json(body)),
            allow_origin: allow_origin(),
            allow_headers: allow_headers(),
        }
    }
}

#[derive(Responder)]
pub struct SeedPreflight {
    inner: Status,
    allow_origin: Header<'static>,
    allow_headers: Header<'static>,
}

#[options("/seed-database")]
pub fn api_seed_preflight() -> SeedPreflight {
    SeedPreflight {
        inner: Status::Ok,
        allow_origin: allow_origin(),
        allow_headers: allow_headers(),
    }
}

/// Resets the exercise catalog and hands out sample workouts. Always
/// answers with a JSON body, including on failure.
#[post("/seed-database")]
pub async fn api_seed_database(store: &State<Store>) -> SeedReply {
    let mut rng = StdRng::from_os_rng();

    match seed_database(store, &mut rng).await {
        Ok(summary) => SeedReply::new(
            Status::Ok,
            json!({
                "success": true,
                "message": "Database seeded successfully",
                "exercises": summary.exercises,
                "note": "Create trainer and trainee accounts through the auth page to test full functionality",
            }),
        ),
        Err(err) => {
            error!(error = %err, "Seed failed");
            SeedReply::new(
                Status::InternalServerError,
                json!({ "success": false, "error": err.to_string() }),
            )
        }
    }
}
