// =============================================================================
// Status server — minimal axum surface exposing feed snapshots
// =============================================================================
//
// Grounded on the teacher's `api/rest.rs`: a small Axum router over shared
// state, permissive CORS for local/dev use. Unlike the teacher's dashboard
// API this exposes read-only feed introspection only -- no control-plane
// endpoints, since this crate has no trading surface to expose.
// =============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::candle::Candle;
use crate::feed::Feed;

pub type SharedFeed = Arc<Mutex<Feed>>;

/// Named set of feeds the status server introspects, keyed by whatever
/// label the host chooses (e.g. `"binance:BTC-USDT:1m"`).
#[derive(Clone, Default)]
pub struct FeedRegistry {
    feeds: Arc<Mutex<HashMap<String, SharedFeed>>>,
}

impl FeedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, label: impl Into<String>, feed: SharedFeed) {
        self.feeds.lock().await.insert(label.into(), feed);
    }

    pub async fn labels(&self) -> Vec<String> {
        self.feeds.lock().await.keys().cloned().collect()
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    feeds: usize,
}

async fn health(State(state): State<FeedRegistry>) -> impl IntoResponse {
    let feeds = state.feeds.lock().await.len();
    Json(HealthResponse { status: "ok", feeds })
}

async fn list_feeds(State(state): State<FeedRegistry>) -> impl IntoResponse {
    Json(state.labels().await)
}

#[derive(Serialize)]
struct FeedSnapshot {
    ready: bool,
    first_open_time: Option<i64>,
    last_open_time: Option<i64>,
    candles: Vec<Candle>,
}

async fn feed_snapshot(State(state): State<FeedRegistry>, Path(label): Path<String>) -> impl IntoResponse {
    let feeds = state.feeds.lock().await;
    match feeds.get(&label) {
        Some(feed) => {
            let feed = feed.lock().await;
            Json(FeedSnapshot {
                ready: feed.ready(),
                first_open_time: feed.first_open_time(),
                last_open_time: feed.last_open_time(),
                candles: feed.snapshot(),
            })
            .into_response()
        }
        None => (StatusCode::NOT_FOUND, "unknown feed").into_response(),
    }
}

/// Build the status router. CORS is permissive -- this is a read-only
/// introspection surface, not a control plane.
pub fn router(registry: FeedRegistry) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/feeds", get(list_feeds))
        .route("/feeds/:label/snapshot", get(feed_snapshot))
        .layer(cors)
        .with_state(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registry_starts_empty_and_tracks_labels() {
        let registry = FeedRegistry::new();
        assert!(registry.labels().await.is_empty());
    }

    #[tokio::test]
    async fn insert_makes_a_feed_discoverable_by_label() {
        use crate::interval::Interval;
        use crate::network::NetworkConfig;
        use crate::pair::TradingPair;

        crate::adapters::mock::register_exchange();
        let pair = TradingPair::parse("BTC-USDT").unwrap();
        let feed = crate::feed::FeedBuilder::new("mock", pair, Interval::parse("1m").unwrap())
            .network_config(NetworkConfig::for_testing())
            .build()
            .unwrap();

        let registry = FeedRegistry::new();
        registry.insert("mock:BTC-USDT:1m", Arc::new(Mutex::new(feed))).await;
        assert_eq!(registry.labels().await, vec!["mock:BTC-USDT:1m".to_string()]);
    }
}
