use crate::hub::BroadcastHub;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use wordminer_protocol::{word_counts_key, WordBroadcast, WordCount, ALL_LANGUAGES};
use wordminer_store::{top_words, CounterStore};

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 500;
const NEW_WORD_EVENT: &str = "new_word";

#[derive(Clone)]
pub struct DashboardState {
    pub store: Arc<dyn CounterStore>,
    pub hub: BroadcastHub,
}

#[derive(Debug, Default, Deserialize)]
pub struct WordsQuery {
    pub language: Option<String>,
    pub limit: Option<usize>,
}

impl WordsQuery {
    fn partition(&self) -> &str {
        self.language
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(ALL_LANGUAGES)
    }

    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LastRepoResponse {
    pub repository: Option<String>,
}

/// Envelope of every message pushed over `/api/stream`.
#[derive(Debug, Serialize)]
struct StreamEvent<'a> {
    event: &'static str,
    data: &'a WordBroadcast,
}

/// Read-only HTTP and WebSocket view over the counters.
pub fn router(state: DashboardState) -> Router {
    Router::new()
        .route("/api/words", get(top_words_handler))
        .route("/api/last-repo", get(last_repo_handler))
        .route("/api/stream", get(stream_handler))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}

async fn top_words_handler(
    State(state): State<DashboardState>,
    Query(query): Query<WordsQuery>,
) -> Result<Json<Vec<WordCount>>, StatusCode> {
    let key = word_counts_key(query.partition());
    let counts = state.store.get_all_fields(&key).await.map_err(|err| {
        log::warn!("Dashboard could not read {key}: {err}");
        StatusCode::SERVICE_UNAVAILABLE
    })?;
    Ok(Json(top_words(counts, query.limit())))
}

async fn last_repo_handler(
    State(state): State<DashboardState>,
) -> Result<Json<LastRepoResponse>, StatusCode> {
    let repository = state.store.last_repo().await.map_err(|err| {
        log::warn!("Dashboard could not read last repo: {err}");
        StatusCode::SERVICE_UNAVAILABLE
    })?;
    Ok(Json(LastRepoResponse { repository }))
}

async fn stream_handler(ws: WebSocketUpgrade, State(state): State<DashboardState>) -> Response {
    let words = state.hub.subscribe();
    ws.on_upgrade(move |socket| forward_words(socket, words))
}

async fn forward_words(mut socket: WebSocket, mut words: broadcast::Receiver<WordBroadcast>) {
    log::debug!("Live listener connected");
    loop {
        let word = match words.recv().await {
            Ok(word) => word,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                log::debug!("Live listener lagged, skipped {skipped} words");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        let text = match encode_event(&word) {
            Ok(text) => text,
            Err(err) => {
                log::warn!("Could not encode live word: {err}");
                continue;
            }
        };
        if socket.send(Message::Text(text)).await.is_err() {
            break;
        }
    }
    log::debug!("Live listener disconnected");
}

fn encode_event(word: &WordBroadcast) -> serde_json::Result<String> {
    serde_json::to_string(&StreamEvent {
        event: NEW_WORD_EVENT,
        data: word,
    })
}
