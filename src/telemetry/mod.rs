//! Logging setup and error forwarding

mod sentry;

pub use sentry::{ErrorReporter, ErrorSinkLayer, ReportedEvent, SentryDsn, EVENT_QUEUE_CAPACITY};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber: env-filtered fmt output, plus the error
/// sink when one is configured.
pub fn init_tracing(sink: Option<ErrorSinkLayer>) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "alertsms=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(sink)
        .init();
}
