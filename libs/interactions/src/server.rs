use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context as _, Result};
use axum::{
    Json, Router,
    body::Body,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{error, info, warn};

use crate::{
    dispatcher::{Dispatcher, Reply},
    error::AuthError,
    response::InteractionResponse,
    verify::{InboundBody, SignatureHeaders, SignatureVerifier},
};

pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Everything the interaction route needs per request.
#[derive(Debug, Clone)]
pub struct InteractionServer {
    pub verifier: SignatureVerifier,
    pub dispatcher: Dispatcher,
    pub body_limit: usize,
    /// Handler work acknowledged with `202` and still running.
    pub tasks: TaskTracker,
}

impl InteractionServer {
    pub fn new(verifier: SignatureVerifier, dispatcher: Dispatcher, body_limit: usize) -> Self {
        Self {
            verifier,
            dispatcher,
            body_limit,
            tasks: TaskTracker::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    commands: usize,
}

pub fn router(state: Arc<InteractionServer>, path: &str) -> Router {
    Router::new()
        .route(
            path,
            post({
                let state = state.clone();
                move |headers: HeaderMap, body: Body| {
                    let state = state.clone();
                    async move { interaction_handler(state, headers, body.into()).await }
                }
            }),
        )
        .route(
            "/health",
            get(move || {
                let state = state.clone();
                async move {
                    Json(HealthResponse {
                        status: "ok",
                        commands: state.dispatcher.registry().len(),
                    })
                }
            }),
        )
}

async fn interaction_handler(
    state: Arc<InteractionServer>,
    headers: HeaderMap,
    body: InboundBody,
) -> Response {
    let interaction = match authenticate(&state, &headers, body).await {
        Ok(interaction) => interaction,
        Err(error) => {
            warn!(error = %error, "rejected interaction request");
            return (
                StatusCode::UNAUTHORIZED,
                Json(ApiError {
                    error: "unauthorized".to_string(),
                    message: error.to_string(),
                }),
            )
                .into_response();
        }
    };

    let interaction_id = interaction.id().to_string();
    match state.dispatcher.dispatch(interaction).await {
        Ok(Reply::Pong) => Json(InteractionResponse::Pong).into_response(),
        Ok(Reply::Autocomplete(choices)) => {
            Json(InteractionResponse::AutocompleteResult(choices)).into_response()
        }
        Ok(Reply::Accepted(work)) => {
            work.spawn_tracked(&state.tasks);
            StatusCode::ACCEPTED.into_response()
        }
        Ok(Reply::Completed | Reply::NoChanges | Reply::Unhandled { .. }) => {
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => {
            error!(interaction_id = %interaction_id, error = %err, "interaction handler failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError {
                    error: "handler_failed".to_string(),
                    message: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

async fn authenticate(
    state: &InteractionServer,
    headers: &HeaderMap,
    body: InboundBody,
) -> Result<crate::types::Interaction, AuthError> {
    let signature = SignatureHeaders::from_headers(headers)?;
    let bytes = body.collect(state.body_limit).await?;
    state.verifier.authenticate(&signature, &bytes)
}

/// Binds `bind` and serves `app` until `cancel` fires.
pub async fn serve(
    bind: &str,
    app: Router,
    tasks: TaskTracker,
    cancel: CancellationToken,
) -> Result<()> {
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("invalid bind address '{bind}'"))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    serve_listener(listener, app, tasks, cancel).await
}

/// Serves on an already bound listener. After the listener stops, waits for
/// every tracked handler so acknowledged interactions still get their replies.
pub async fn serve_listener(
    listener: TcpListener,
    app: Router,
    tasks: TaskTracker,
    cancel: CancellationToken,
) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "interaction endpoint listening");
    }

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .context("interaction server failed");

    tasks.close();
    if !tasks.is_empty() {
        info!(pending = tasks.len(), "waiting for in-flight interaction handlers");
    }
    tasks.wait().await;
    info!("interaction endpoint stopped");

    result
}
