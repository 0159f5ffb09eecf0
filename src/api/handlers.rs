//! API request handlers

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::StreamExt;
use tracing::warn;

use crate::api::error::ApiError;
use crate::registry::{ItemState, Registry, Snapshot};

/// Shared application state
pub struct AppState {
    pub registry: Arc<Registry>,
    /// Flips to `true` once the server begins shutting down.
    pub shutdown: watch::Receiver<bool>,
}

impl AppState {
    pub fn new(registry: Arc<Registry>, shutdown: watch::Receiver<bool>) -> Self {
        Self { registry, shutdown }
    }
}

/// Request to start a new item history
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRequest {
    /// Caller-chosen identifier, must be unique
    pub id: String,

    /// Opaque payload of the first snapshot
    pub payload: String,
}

/// Response from item creation
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateResponse {
    pub id: String,
}

/// Request to append a snapshot
#[derive(Debug, Serialize, Deserialize)]
pub struct AppendRequest {
    pub payload: String,
}

/// Item addressed by query string, for ids that cannot be a path segment
#[derive(Debug, Serialize, Deserialize)]
pub struct ItemQuery {
    pub id: String,
}

/// Empty acknowledgement
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AppendResponse {}

/// Create an item
///
/// POST /v1/products
pub async fn create_item(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateRequest>,
) -> Result<(StatusCode, Json<CreateResponse>), ApiError> {
    state.registry.create(&request.id, request.payload).await?;

    Ok((StatusCode::CREATED, Json(CreateResponse { id: request.id })))
}

/// Append a snapshot to an item
///
/// POST /v1/products/{id}/snapshots
pub async fn append_snapshot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<AppendRequest>,
) -> Result<Json<AppendResponse>, ApiError> {
    state.registry.append(&id, request.payload).await?;

    Ok(Json(AppendResponse::default()))
}

/// Append a snapshot to an item named in the query string
///
/// POST /v1/item/snapshots?id=
pub async fn append_snapshot_by_query(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ItemQuery>,
    Json(request): Json<AppendRequest>,
) -> Result<Json<AppendResponse>, ApiError> {
    state.registry.append(&query.id, request.payload).await?;

    Ok(Json(AppendResponse::default()))
}

/// Current payload of an item
///
/// GET /v1/products/{id}
pub async fn get_current(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ItemState>, ApiError> {
    Ok(Json(state.registry.current(&id).await?))
}

/// GET /v1/item?id=
pub async fn get_current_by_query(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ItemQuery>,
) -> Result<Json<ItemState>, ApiError> {
    Ok(Json(state.registry.current(&query.id).await?))
}

/// Full history of an item
///
/// GET /v1/products/{id}/history
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Snapshot>>, ApiError> {
    Ok(Json(state.registry.history(&id).await?))
}

/// GET /v1/item/history?id=
pub async fn get_history_by_query(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ItemQuery>,
) -> Result<Json<Vec<Snapshot>>, ApiError> {
    Ok(Json(state.registry.history(&query.id).await?))
}

/// Number of known items
///
/// GET /v1/count
pub async fn get_count(State(state): State<Arc<AppState>>) -> Json<usize> {
    Json(state.registry.count().await)
}

/// Live notification stream
///
/// GET /v1/notifications
///
/// Server-sent events, one per create/append committed after the client
/// connected. Event name is the notification kind, data is its JSON form.
/// A client too slow to keep up skips the notifications it missed. The
/// stream ends when the server starts shutting down.
pub async fn stream_notifications(
    State(state): State<Arc<AppState>>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let receiver = state
        .registry
        .bus()
        .stream()
        .map_err(|e| ApiError::Unavailable(e.to_string()))?;

    let events = BroadcastStream::new(receiver).filter_map(|item| match item {
        Ok(notification) => Event::default()
            .event(notification.kind())
            .json_data(&*notification)
            .ok()
            .map(Ok::<Event, Infallible>),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            warn!(skipped = skipped, "Notification stream lagged");
            None
        }
    });

    let mut shutdown = state.shutdown.clone();
    let stopping = async move {
        let signalled = shutdown.wait_for(|stop| *stop).await.is_ok();
        // Sender gone: nothing will ever ask this stream to stop
        if !signalled {
            std::future::pending::<()>().await;
        }
    };
    let events = futures::StreamExt::take_until(events, stopping);

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
