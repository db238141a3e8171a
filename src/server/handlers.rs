//! Request handlers

use super::{AppState, ServerError};
use crate::rate::RateUpdate;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use uuid::Uuid;

/// Query parameters for `/rates`
#[derive(Debug, Deserialize)]
pub(super) struct RatesQuery {
    since: Option<String>,
}

/// Parse a `since` value given as unix seconds or an RFC 3339 timestamp
pub fn parse_since(value: &str) -> Result<DateTime<Utc>, ServerError> {
    if let Ok(secs) = value.parse::<i64>() {
        return Utc
            .timestamp_opt(secs, 0)
            .single()
            .ok_or_else(|| ServerError::InvalidSince(value.to_string()));
    }

    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ServerError::InvalidSince(value.to_string()))
}

pub(super) async fn rates_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<RatesQuery>,
    State(state): State<AppState>,
) -> Response {
    // An empty value is treated as absent
    let since = match query
        .since
        .as_deref()
        .filter(|value| !value.is_empty())
        .map(parse_since)
        .transpose()
    {
        Ok(since) => since,
        Err(e) => {
            tracing::warn!(error = %e, "Rejecting rates request");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, since))
}

pub(super) async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn handle_socket(mut socket: WebSocket, state: AppState, since: Option<DateTime<Utc>>) {
    if let Some(since) = since {
        let history = state.repository.list_since(since);
        tracing::debug!(count = history.len(), %since, "Replaying cached updates");

        for update in &history {
            if let Err(e) = send_update(&mut socket, update).await {
                tracing::warn!(error = %e, "Failed to replay update, closing connection");
                return;
            }
        }
    }

    let id = Uuid::new_v4().to_string();
    let mut updates = match state.subscriber.subscribe(&id) {
        Ok(updates) => updates,
        Err(e) => {
            tracing::warn!(error = %e, "Subscription failed");
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };
    tracing::info!(subscription = %id, "WebSocket client connected");

    loop {
        tokio::select! {
            update = updates.recv() => {
                match update {
                    Some(update) => {
                        if let Err(e) = send_update(&mut socket, &update).await {
                            tracing::warn!(subscription = %id, error = %e, "Failed to send update");
                            break;
                        }
                    }
                    None => {
                        tracing::debug!(subscription = %id, "Subscription closed");
                        let _ = socket.send(Message::Close(None)).await;
                        break;
                    }
                }
            }

            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(subscription = %id, error = %e, "WebSocket read failed");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.subscriber.unsubscribe(&id);
    tracing::info!(subscription = %id, "WebSocket client disconnected");
}

async fn send_update(socket: &mut WebSocket, update: &RateUpdate) -> Result<(), axum::Error> {
    let payload = serde_json::to_string(update).map_err(axum::Error::new)?;
    socket.send(Message::Text(payload.into())).await
}
