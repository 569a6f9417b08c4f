use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::handlers::{health_check, method_not_allowed, stats, webhook, AppState};
use crate::alerts::{AlertDispatcher, Notifier, TwilioNotifier};
use crate::config::Config;
use crate::directory::{
    DirectoryClient, RecipientCache, RecipientResolver, SheetsDirectory, SHORT_CACHE_TTL,
};

/// Applies to every directory and SMS provider call
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhook", post(webhook).fallback(method_not_allowed))
        .route("/health", get(health_check))
        .route("/stats", get(stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wire caches, directory, resolver and notifier from a validated config
pub fn build_state(config: &Config) -> Result<Arc<AppState>, Box<dyn std::error::Error>> {
    let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;

    let directory: Arc<dyn DirectoryClient> = Arc::new(SheetsDirectory::new(
        http.clone(),
        config.google_sheet_id.clone(),
        config.google_token_path.clone(),
    ));
    let resolver = RecipientResolver::new(
        directory,
        Arc::new(RecipientCache::short(SHORT_CACHE_TTL)),
        Arc::new(RecipientCache::fallback()),
    );
    let notifier: Arc<dyn Notifier> =
        Arc::new(TwilioNotifier::new(http, config.twilio_credentials()));

    Ok(Arc::new(AppState {
        dispatcher: AlertDispatcher::new(Arc::new(resolver), notifier),
    }))
}

/// Run the HTTP server until Ctrl-C
pub async fn run_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let state = build_state(&config)?;
    let app = build_router(state);

    let addr: SocketAddr = config.listen_addr().parse()?;
    tracing::info!("listening on: {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::dispatcher::tests::RecordingNotifier;
    use crate::directory::resolver::tests::FakeDirectory;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt;

    fn create_test_app(directory: FakeDirectory) -> (Router, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let resolver = RecipientResolver::new(
            Arc::new(directory),
            Arc::new(RecipientCache::short(SHORT_CACHE_TTL)),
            Arc::new(RecipientCache::fallback()),
        );
        let state = Arc::new(AppState {
            dispatcher: AlertDispatcher::new(
                Arc::new(resolver),
                Arc::clone(&notifier) as Arc<dyn Notifier>,
            ),
        });
        (build_router(state), notifier)
    }

    fn post_webhook(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let (app, _) = create_test_app(FakeDirectory::with_rows(&[]));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_webhook_success() {
        let (app, notifier) =
            create_test_app(FakeDirectory::with_rows(&[("infra", &["+33333333333"])]));

        let body = serde_json::json!({
            "status": "firing",
            "alerts": [{
                "status": "firing",
                "labels": {"team": "infra"},
                "annotations": {"summary": "disk full"}
            }]
        });
        let response = app.oneshot(post_webhook(&body.to_string())).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!("success"));
        assert_eq!(
            notifier.sent(),
            vec![("+33333333333".to_string(), "firing: disk full".to_string())]
        );
    }

    #[tokio::test]
    async fn test_webhook_rejects_other_methods() {
        let (app, _) = create_test_app(FakeDirectory::with_rows(&[]));

        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/webhook")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            body_json(response).await,
            serde_json::json!("unsupported HTTP method")
        );
    }

    #[tokio::test]
    async fn test_webhook_malformed_json() {
        let (app, notifier) = create_test_app(FakeDirectory::with_rows(&[]));

        let response = app.oneshot(post_webhook("{\"alerts\": [")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await.is_string());
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_webhook_null_batches_are_empty() {
        for body in ["null", r#"{"alerts": null}"#] {
            let (app, notifier) = create_test_app(FakeDirectory::with_rows(&[]));

            let response = app.oneshot(post_webhook(body)).await.unwrap();

            assert_eq!(response.status(), StatusCode::OK, "{body}");
            assert_eq!(body_json(response).await, serde_json::json!("success"));
            assert!(notifier.sent().is_empty());
        }
    }

    #[tokio::test]
    async fn test_webhook_unknown_team_is_internal_error() {
        let (app, _) = create_test_app(FakeDirectory::with_rows(&[("infra", &["+33333333333"])]));

        let body = r#"{"alerts": [{"status": "firing", "labels": {"team": "green"}}]}"#;
        let response = app.oneshot(post_webhook(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            serde_json::json!("No row found in Sheet for team green")
        );
    }

    #[tokio::test]
    async fn test_stats() {
        let (app, _) = create_test_app(FakeDirectory::with_rows(&[]));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let stats = body_json(response).await;
        assert_eq!(stats["short_cache"]["ttl_secs"], 600);
        assert!(stats["fallback_cache"]["ttl_secs"].is_null());
    }
}
