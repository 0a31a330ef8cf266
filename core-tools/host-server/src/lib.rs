//! Host File Server
//!
//! Republishes the generated host files over HTTP: `GET /hosts/:host_name`
//! returns the file's bytes as plain text, or `404 Host not found` when no
//! such host exists. Lookups are read-only; the bot engine owns the files.

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

/// Server state shared across handlers
#[derive(Clone)]
struct ServerState {
    host_dir: PathBuf,
}

/// Build the router serving host files out of `host_dir`.
pub fn router(host_dir: PathBuf) -> Router {
    Router::new()
        .route("/hosts/:host_name", get(get_host))
        .layer(TraceLayer::new_for_http())
        .with_state(ServerState { host_dir })
}

/// Serve host files on `addr` until the task is dropped.
pub async fn serve(addr: SocketAddr, host_dir: PathBuf) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Host file server listening on http://{}", addr);

    axum::serve(listener, router(host_dir)).await
}

/// Host names are lowercased file stems; anything outside the whitelist
/// can't name a file we wrote, so it never reaches the filesystem.
fn valid_host_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

async fn get_host(
    State(state): State<ServerState>,
    Path(host_name): Path<String>,
) -> Response {
    if !valid_host_name(&host_name) {
        return not_found();
    }

    let path = state
        .host_dir
        .join(format!("{}.txt", host_name.to_lowercase()));

    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            bytes,
        )
            .into_response(),
        Err(_) => not_found(),
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Host not found").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_serves_existing_host() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("my-host.txt"), "1.2.3.4 growtopia1.com").unwrap();

        let response = router(dir.path().to_path_buf())
            .oneshot(
                Request::builder()
                    .uri("/hosts/my-host")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "1.2.3.4 growtopia1.com");
    }

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("my-host.txt"), "content").unwrap();

        let response = router(dir.path().to_path_buf())
            .oneshot(
                Request::builder()
                    .uri("/hosts/My-Host")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_host_is_404() {
        let dir = tempfile::tempdir().unwrap();

        let response = router(dir.path().to_path_buf())
            .oneshot(
                Request::builder()
                    .uri("/hosts/nothing-here")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(response).await, "Host not found");
    }

    #[tokio::test]
    async fn test_traversal_names_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("secret.txt"), "secret").unwrap();

        let response = router(dir.path().to_path_buf())
            .oneshot(
                Request::builder()
                    .uri("/hosts/..%2Fsecret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
