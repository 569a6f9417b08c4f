//! Forwarding of WARN and ERROR events to a Sentry store endpoint
//!
//! Events are captured by a tracing layer and posted from a background task,
//! so logging never waits on the network and a failing endpoint is ignored.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;
use url::Url;

/// Target of the reporter's own diagnostics, never forwarded
const REPORTER_TARGET: &str = "alertsms::telemetry::sentry";

/// Events waiting to be posted; further events are dropped
pub const EVENT_QUEUE_CAPACITY: usize = 1024;

/// Parsed `{scheme}://{public_key}@{host}{path}/{project_id}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentryDsn {
    pub public_key: String,
    pub store_url: String,
}

impl SentryDsn {
    pub fn parse(dsn: &str) -> Result<Self, String> {
        let url = Url::parse(dsn).map_err(|e| e.to_string())?;

        let public_key = url.username();
        if public_key.is_empty() {
            return Err("missing public key".to_string());
        }
        let host = url.host_str().ok_or_else(|| "missing host".to_string())?;

        let mut segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();
        let project_id = segments
            .pop()
            .filter(|id| id.chars().all(|c| c.is_ascii_digit()))
            .ok_or_else(|| "missing numeric project id".to_string())?;

        let port = url.port().map(|p| format!(":{}", p)).unwrap_or_default();
        let prefix: String = segments.iter().map(|s| format!("/{}", s)).collect();

        Ok(Self {
            public_key: public_key.to_string(),
            store_url: format!(
                "{}://{}{}{}/api/{}/store/",
                url.scheme(),
                host,
                port,
                prefix,
                project_id
            ),
        })
    }

    fn auth_header(&self) -> String {
        format!(
            "Sentry sentry_version=7, sentry_client=alertsms/{}, sentry_key={}",
            env!("CARGO_PKG_VERSION"),
            self.public_key
        )
    }
}

/// An event captured for forwarding
#[derive(Debug, Clone)]
pub struct ReportedEvent {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ReportedEvent {
    fn payload(&self) -> serde_json::Value {
        let level = if self.level == Level::ERROR {
            "error"
        } else {
            "warning"
        };
        serde_json::json!({
            "event_id": uuid::Uuid::new_v4().simple().to_string(),
            "timestamp": self.timestamp.to_rfc3339(),
            "level": level,
            "logger": self.target,
            "platform": "other",
            "release": concat!("alertsms@", env!("CARGO_PKG_VERSION")),
            "message": self.message,
        })
    }
}

/// Tracing layer handing WARN and ERROR events to the reporter task
pub struct ErrorSinkLayer {
    tx: mpsc::Sender<ReportedEvent>,
    pending: Arc<AtomicUsize>,
}

impl ErrorSinkLayer {
    fn channel(
        pending: Arc<AtomicUsize>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<ReportedEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx, pending }, rx)
    }
}

impl<S: Subscriber> Layer<S> for ErrorSinkLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if *meta.level() > Level::WARN || meta.target().starts_with(REPORTER_TARGET) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let reported = ReportedEvent {
            level: *meta.level(),
            target: meta.target().to_string(),
            message: visitor.finish(),
            timestamp: Utc::now(),
        };
        self.pending.fetch_add(1, Ordering::SeqCst);
        // Full or closed queue: the event is dropped
        if self.tx.try_send(reported).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Collects the message and fields of an event into one line
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else {
            format!("{} {}", self.message, self.fields.join(" "))
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }
}

/// Background sender of captured events
pub struct ErrorReporter {
    pending: Arc<AtomicUsize>,
    handle: tokio::task::JoinHandle<()>,
}

impl ErrorReporter {
    /// Start the sender task; install the returned layer in the subscriber.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(dsn: SentryDsn, http: reqwest::Client) -> (Self, ErrorSinkLayer) {
        let pending = Arc::new(AtomicUsize::new(0));
        let (layer, mut rx) = ErrorSinkLayer::channel(Arc::clone(&pending), EVENT_QUEUE_CAPACITY);

        let task_pending = Arc::clone(&pending);
        let handle = tokio::spawn(async move {
            let auth = dsn.auth_header();
            while let Some(event) = rx.recv().await {
                let result = http
                    .post(&dsn.store_url)
                    .header("X-Sentry-Auth", &auth)
                    .json(&event.payload())
                    .send()
                    .await
                    .and_then(|r| r.error_for_status());
                if let Err(e) = result {
                    tracing::debug!(target: REPORTER_TARGET, "Failed to report event: {}", e);
                }
                task_pending.fetch_sub(1, Ordering::SeqCst);
            }
        });

        (Self { pending, handle }, layer)
    }

    /// Wait until queued events are sent, at most `timeout`
    pub async fn flush(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.pending.load(Ordering::SeqCst) > 0 {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        true
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}
