//! HTTP trigger surface. The relay core never owns the clock or the
//! transport: it only exposes "run one cycle", and this module maps cycle
//! outcomes to the response contract (200 on success, 500 on failure, 405
//! for anything but POST).

use crate::prelude::*;
use crate::relay::{JsonFileStore, Publisher as _, Relay};
use crate::tg::{TgPublisher, TgSource};
use crate::{gen, Error};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Deserialize, Clone)]
pub(crate) struct Config {
    #[serde(default = "default_bind")]
    pub(crate) bind: SocketAddr,
}

fn default_bind() -> SocketAddr {
    ([0, 0, 0, 0], 8080).into()
}

pub(crate) type RelayService = Relay<TgSource, TgPublisher, JsonFileStore>;

pub(crate) struct AppState {
    /// The relay service is shared between the scheduler and the HTTP
    /// trigger; the mutex serializes cycles so two triggers can never race
    /// the published-set file.
    pub(crate) relay: tokio::sync::Mutex<RelayService>,
    pub(crate) gen: gen::Client,
    pub(crate) publisher: TgPublisher,
    pub(crate) destination: String,
}

pub(crate) fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/relay", post(relay_cycle))
        .route("/generate", post(generate))
        .with_state(state)
}

pub(crate) async fn serve(cfg: Config, state: Arc<AppState>) -> Result {
    info!(bind = %cfg.bind, "Starting the trigger endpoint...");

    let listener = tokio::net::TcpListener::bind(cfg.bind)
        .await
        .fatal_ctx(|| format!("Failed to bind the trigger endpoint to {}", cfg.bind))?;

    axum::serve(listener, router(state))
        .await
        .fatal_ctx(|| "The trigger endpoint exited unexpectedly")
}

async fn relay_cycle(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    match state.relay.lock().await.run_cycle().await {
        Ok(report) => (
            StatusCode::OK,
            Json(json!({
                "message": format!(
                    "Relayed a {} post from {}",
                    report.kind, report.source_channel
                ),
            })),
        ),
        Err(err) => failure_response(&err, "Relay cycle failed"),
    }
}

async fn generate(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    let result = async {
        let text = state.gen.generate().await?;
        state
            .publisher
            .send_text(&state.destination, &text)
            .await
            .map_err(err_ctx!(crate::relay::RelayError::Publish))?;
        Ok::<_, Error>(())
    }
    .await;

    match result {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "Published a generated post" })),
        ),
        Err(err) => failure_response(&err, "Generated post failed"),
    }
}

fn failure_response(err: &Error, msg: &str) -> (StatusCode, Json<serde_json::Value>) {
    if err.is_no_candidates() {
        warn!(err = tracing_err(err), "{msg}");
    } else {
        error!(err = tracing_err(err), "{msg}");
    }

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": err.to_string(),
            "error_id": err.id(),
        })),
    )
}
