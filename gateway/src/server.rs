//! Axum server the platform bridge pushes events and commands to.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use kahukura_bot::{Bot, CommandReply, PlatformEvent};

use crate::error::GatewayError;
use crate::wire::CommandRequest;

#[derive(Clone)]
struct AppState {
    bot: Arc<Bot>,
    enable_metrics: bool,
}

pub struct GatewayServer {
    bot: Arc<Bot>,
    addr: SocketAddr,
    enable_metrics: bool,
}

impl GatewayServer {
    pub fn new(bot: Arc<Bot>, addr: SocketAddr, enable_metrics: bool) -> Self {
        Self {
            bot,
            addr,
            enable_metrics,
        }
    }

    pub fn router(&self) -> Router {
        let state = AppState {
            bot: self.bot.clone(),
            enable_metrics: self.enable_metrics,
        };
        Router::new()
            .route("/v1/events", post(handle_event))
            .route("/v1/commands", post(handle_command))
            .route("/healthz", get(health_check))
            .route("/metrics", get(metrics))
            .with_state(state)
    }

    /// Bind and serve until `shutdown` resolves.
    pub async fn serve<F>(&self, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|source| GatewayError::Bind {
                addr: self.addr,
                source,
            })?;
        tracing::info!(addr = %self.addr, metrics = self.enable_metrics, "gateway listening");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        tracing::info!("gateway stopped");
        Ok(())
    }
}

/// Events are acknowledged immediately and handled on their own task.
async fn handle_event(State(state): State<AppState>, Json(event): Json<PlatformEvent>) -> StatusCode {
    tracing::debug!(?event, "platform event received");
    let bot = state.bot.clone();
    tokio::spawn(async move {
        // Failures are logged by the bot.
        let _ = bot.handle_event(event).await;
    });
    StatusCode::ACCEPTED
}

async fn handle_command(
    State(state): State<AppState>,
    Json(request): Json<CommandRequest>,
) -> Json<CommandReply> {
    tracing::debug!(member = %request.invoker.id, command = request.command.name(), "command received");
    Json(state.bot.dispatch(&request.invoker, request.command).await)
}

async fn health_check() -> &'static str {
    "ok"
}

async fn metrics(State(state): State<AppState>) -> Response {
    if !state.enable_metrics {
        return StatusCode::NOT_FOUND.into_response();
    }
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.bot.metrics().encode(),
    )
        .into_response()
}
