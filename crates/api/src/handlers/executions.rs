//! `POST /executions` — the external trigger surface.
//!
//! Takes a `Workflow` document directly in the request body; there is no
//! workflow store to resolve an id against (that CRUD layer is out of
//! scope here). The handler starts the run in the background and returns
//! immediately with the execution id a client can attach
//! `GET /ws/:execution_id` to, including ones that connect before the run
//! has produced its first event — `streaming::WsChannel` queues outbound
//! events until a socket takes the receiver.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use browser::mock::MockDriver;
use engine::{ExecuteParams, Workflow};

use crate::AppState;

#[derive(Deserialize)]
pub struct TriggerRequest {
    pub workflow: Workflow,
    #[serde(default)]
    pub headless: Option<bool>,
    #[serde(default)]
    pub storage_state: Option<Value>,
}

#[derive(Serialize)]
pub struct TriggerResponse {
    pub execution_id: Uuid,
}

/// Starts a run in the background and returns its id immediately — the
/// caller follows along over `GET /ws/:execution_id`.
///
/// `MockDriver` stands in for the real CDP/Playwright-equivalent driver,
/// which is out of scope here; this is the one seam a real driver would
/// plug into.
pub async fn trigger(
    State(state): State<AppState>,
    Json(body): Json<TriggerRequest>,
) -> Result<(StatusCode, Json<TriggerResponse>), StatusCode> {
    let execution_id = Uuid::new_v4();
    let channel = state.registry.create(execution_id);

    let params = ExecuteParams {
        execution_id,
        driver: Arc::new(MockDriver::new()),
        channel: channel.clone(),
        llm: state.llm.clone(),
        headless: body.headless.unwrap_or(state.default_headless),
        storage_state: body.storage_state,
    };

    let engine = state.engine.clone();
    let registry = state.registry.clone();
    let workflow = body.workflow;

    tokio::spawn(async move {
        if let Err(e) = engine.execute(&workflow, params).await {
            tracing::error!(%execution_id, error = %e, "execution failed before it could start");
        }
        registry.remove(execution_id);
    });

    Ok((StatusCode::ACCEPTED, Json(TriggerResponse { execution_id })))
}
