// HTTP handler bindings for the arena endpoints
//
// Thin wrappers binding Rocket routes to the Bot's methods. Handlers
// deserialize the request, pull the Bot from managed state, delegate, and
// serialize the response. A snapshot that cannot be normalized is answered
// with 422 and a JSON error body.

use log::warn;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use serde_json::{json, Value};

use crate::bot::Bot;
use crate::types::{ArenaState, CommandBatch};

/// GET / endpoint
/// Returns bot metadata
#[get("/")]
pub fn index(bot: &rocket::State<Bot>) -> Json<Value> {
    Json(bot.info())
}

/// POST /start endpoint
/// Called when a round starts; resets per-round memory
#[post("/start")]
pub fn start(bot: &rocket::State<Bot>) -> Status {
    bot.start();
    Status::Ok
}

/// POST /plan endpoint
/// Called every tick with the arena snapshot; returns one command per unit
#[post("/plan", format = "json", data = "<state>")]
pub async fn plan(
    bot: &rocket::State<Bot>,
    state: Json<ArenaState>,
) -> Result<Json<CommandBatch>, status::Custom<Json<Value>>> {
    match bot.plan_tick(state.into_inner()).await {
        Ok(batch) => Ok(Json(batch)),
        Err(e) => {
            warn!("Rejected snapshot: {}", e);
            Err(status::Custom(
                Status::UnprocessableEntity,
                Json(json!({ "error": e.to_string() })),
            ))
        }
    }
}

/// POST /end endpoint
/// Called when a round ends
#[post("/end")]
pub fn end(bot: &rocket::State<Bot>) -> Status {
    bot.end();
    Status::Ok
}
