use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::server::AppState;
use crate::sequencer::WorkerSnapshot;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    /// Workers currently registered.
    pub live_workers: usize,
    /// Workers spawned since startup, including retired ones.
    pub spawned_workers: u64,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let registry = state.registry();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        live_workers: registry.len(),
        spawned_workers: registry.spawned(),
    })
}

pub async fn get_workers(State(state): State<AppState>) -> Json<Vec<WorkerSnapshot>> {
    Json(state.registry().snapshot())
}
