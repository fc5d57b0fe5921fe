//! HTTP surface: message submission, live event streams, session snapshots.
//!
//! The streaming handler is the transport end of the subscription protocol:
//! subscribe on connect, emit the synthetic `connected` event first, forward
//! envelopes until the client goes away. Deregistration rides on the
//! [`Subscription`](crate::bus::Subscription) drop guard, so an aborted SSE
//! task cleans up exactly like a graceful disconnect.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::bus::ConversationBus;
use crate::config::ConvoyConfig;
use crate::error::Result;
use crate::router::{InboundTurn, TurnRouter};
use crate::session::{SessionStore, StoredMessage};
use crate::types::EventEnvelope;

/// Channel name of the HTTP surface.
pub const WEB_CHANNEL: &str = "web";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub bus: Arc<ConversationBus>,
    pub router: Arc<TurnRouter>,
    pub store: Arc<dyn SessionStore>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub content: String,
    #[serde(default = "default_conversation")]
    pub conversation_id: String,
    #[serde(default = "default_sender")]
    pub sender_id: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

fn default_conversation() -> String {
    "default".into()
}

fn default_sender() -> String {
    "user".into()
}

#[derive(Debug, Serialize)]
pub struct SubmitAck {
    pub status: &'static str,
    pub conversation_id: String,
}

#[derive(Debug, Serialize)]
pub struct SessionSnapshot {
    pub conversation_id: String,
    pub messages: Vec<StoredMessage>,
    pub metadata: Map<String, Value>,
}

/// Build the axum application.
pub fn app(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/api/messages", post(submit_message))
        .route("/api/events/:conversation_id", get(stream_events))
        .route("/api/sessions/:conversation_id", get(get_session))
        .route("/api/health", get(health))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: &ConvoyConfig, state: AppState) -> Result<()> {
    let router = app(state, &config.cors_origins);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "convoy gateway listening");
    axum::serve(listener, router).await?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Accept one message for asynchronous processing.
///
/// The turn runs on a spawned task; its result arrives on the event stream
/// as the terminal `message` envelope, never in this response.
async fn submit_message(
    State(state): State<AppState>,
    Json(req): Json<SubmitRequest>,
) -> Json<SubmitAck> {
    let conversation_id = req.conversation_id.clone();
    let mut inbound = InboundTurn::new(
        WEB_CHANNEL,
        req.conversation_id,
        req.sender_id,
        req.content,
    );
    inbound.metadata = req.metadata;

    let router = Arc::clone(&state.router);
    let bus = Arc::clone(&state.bus);
    tokio::spawn(async move {
        let outbound = router.route(inbound).await;
        bus.publish(&outbound.to_envelope());
    });

    Json(SubmitAck {
        status: "accepted",
        conversation_id,
    })
}

/// Open a live event stream for one conversation.
async fn stream_events(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let mut subscription = state.bus.subscribe(&conversation_id);

    let stream = async_stream::stream! {
        yield Ok(envelope_event(&EventEnvelope::connected(&conversation_id)));
        while let Some(envelope) = subscription.recv().await {
            yield Ok(envelope_event(&envelope));
        }
        // subscription drops here, or on cancellation of the SSE task;
        // either way the bus registration is released
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn envelope_event(envelope: &EventEnvelope) -> Event {
    match serde_json::to_string(envelope) {
        Ok(data) => Event::default().data(data),
        Err(err) => {
            tracing::error!(error = %err, "failed to serialize envelope");
            Event::default().comment("serialization error")
        }
    }
}

/// Read-only history snapshot for one conversation.
async fn get_session(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> std::result::Result<Json<SessionSnapshot>, ApiError> {
    let key = format!("{WEB_CHANNEL}:{conversation_id}");
    let session = state.store.get(&key).await.ok_or_else(|| {
        ApiError::NotFound(format!("No session for conversation '{conversation_id}'"))
    })?;

    Ok(Json(SessionSnapshot {
        conversation_id,
        messages: session.messages,
        metadata: session.metadata,
    }))
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// API error responses.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
        };
        let body = Json(json!({"error": message, "code": code}));
        (status, body).into_response()
    }
}
