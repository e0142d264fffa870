//! Read-only HTTP view of the stream store.
//!
//! Serves the most recent payload of each active stream to a local viewer.
//! Nothing here can affect the agent: the router only reads.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use remote_agent_core::StreamStore;
use tower_http::cors::CorsLayer;

/// Build the viewer router.
///
/// - `GET /streams` lists the stored keys.
/// - `GET /streams/{key}` returns the latest payload for `key`.
#[must_use]
pub fn create_viewer_router(store: Arc<StreamStore>) -> Router {
    Router::new()
        .route("/streams", get(list_streams))
        .route("/streams/{key}", get(latest_payload))
        .layer(CorsLayer::permissive())
        .with_state(store)
}

async fn list_streams(State(store): State<Arc<StreamStore>>) -> Json<Vec<String>> {
    Json(store.keys())
}

async fn latest_payload(
    State(store): State<Arc<StreamStore>>,
    Path(key): Path<String>,
) -> Response {
    match store.get(&key) {
        Some(payload) => (
            [
                (header::CONTENT_TYPE, "application/octet-stream"),
                (header::CACHE_CONTROL, "no-store"),
            ],
            payload,
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use bytes::Bytes;
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn test_serves_latest_payload() {
        let store = Arc::new(StreamStore::new());
        store.set("agent_screen", Bytes::from_static(b"\x89PNG"));
        let router = create_viewer_router(store);

        let response = router
            .oneshot(Request::get("/streams/agent_screen").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), b"\x89PNG");
    }

    #[tokio::test]
    async fn test_unknown_stream_is_404() {
        let router = create_viewer_router(Arc::new(StreamStore::new()));
        let response = router
            .oneshot(Request::get("/streams/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_lists_keys() {
        let store = Arc::new(StreamStore::new());
        store.set("b_webcam", Bytes::from_static(b"1"));
        store.set("a_screen", Bytes::from_static(b"2"));
        let router = create_viewer_router(store);

        let response = router
            .oneshot(Request::get("/streams").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let keys: Vec<String> = serde_json::from_slice(&body).unwrap();
        assert_eq!(keys, vec!["a_screen", "b_webcam"]);
    }
}
