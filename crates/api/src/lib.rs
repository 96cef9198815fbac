//! `api` crate — the external trigger surface: a thin axum router wiring
//! `POST /executions` and `GET /ws/:execution_id` to an [`engine::Engine`]
//! and a [`streaming::ConnectionRegistry`]. There is no workflow document
//! store or webhook dispatch here; both are out of scope, and a caller
//! supplies the full `Workflow` body on every trigger.

pub mod handlers;

use std::sync::Arc;

use axum::extract::FromRef;
use axum::routing::post;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use browser::LlmClient;
use engine::Engine;
use streaming::ConnectionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub registry: Arc<ConnectionRegistry>,
    /// Fallback `headless` value for a trigger request that omits it.
    pub default_headless: bool,
    /// Shared AI-assist client, absent when the process has no LLM
    /// configured — the hybrid locator and intervention detector both
    /// fall back to their non-AI paths in that case.
    pub llm: Option<Arc<dyn LlmClient>>,
}

impl FromRef<AppState> for Arc<ConnectionRegistry> {
    fn from_ref(state: &AppState) -> Self {
        state.registry.clone()
    }
}

pub fn router(
    engine: Arc<Engine>,
    registry: Arc<ConnectionRegistry>,
    default_headless: bool,
    llm: Option<Arc<dyn LlmClient>>,
) -> Router {
    let state = AppState { engine, registry, default_headless, llm };

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/executions", post(handlers::executions::trigger))
        .route("/ws/:execution_id", axum::routing::get(streaming::execution_ws))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(
    bind: &str,
    engine: Arc<Engine>,
    registry: Arc<ConnectionRegistry>,
    default_headless: bool,
    llm: Option<Arc<dyn LlmClient>>,
) -> Result<(), std::io::Error> {
    let app = router(engine, registry, default_headless, llm);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::Json;
    use persistence::JsonFileExecutionRepository;

    async fn make_state() -> AppState {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileExecutionRepository::new(dir.path().to_path_buf()).await.unwrap();
        std::mem::forget(dir);
        let engine = Arc::new(Engine::new(engine::ActionRegistry::with_builtins(), Arc::new(repo)));
        AppState { engine, registry: Arc::new(ConnectionRegistry::new()), default_headless: true, llm: None }
    }

    #[tokio::test]
    async fn trigger_registers_a_channel_and_returns_an_execution_id() {
        let state = make_state().await;
        let workflow = engine::Workflow::new("wf", vec![], vec![]);
        let body = handlers::executions::TriggerRequest { workflow, headless: Some(true), storage_state: None };

        let (status, Json(response)) =
            handlers::executions::trigger(State(state.clone()), Json(body)).await.unwrap();

        assert_eq!(status, StatusCode::ACCEPTED);
        // The channel is registered synchronously, before the background
        // task that will eventually remove it on completion runs.
        assert!(state.registry.get(response.execution_id).is_some());
    }
}
