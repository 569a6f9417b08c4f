//! alertsms server
//!
//! Run with: cargo run
//!
//! Configuration comes from the environment, see [`alertsms::config`].
//! RUST_LOG sets the log level (default: info).

use std::time::Duration;

use alertsms::api::run_server;
use alertsms::config::Config;
use alertsms::telemetry::{init_tracing, ErrorReporter, SentryDsn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    let validation = config.validate();

    // Only start forwarding once the DSN is known to be valid
    let reporter = match (&validation, &config.sentry_dsn) {
        (Ok(()), Some(dsn)) => {
            let dsn = SentryDsn::parse(dsn)?;
            let http = reqwest::Client::builder()
                .timeout(Duration::from_secs(5))
                .build()?;
            Some(ErrorReporter::start(dsn, http))
        }
        _ => None,
    };
    let (reporter, sink) = match reporter {
        Some((reporter, sink)) => (Some(reporter), Some(sink)),
        None => (None, None),
    };
    init_tracing(sink);

    if let Err(errors) = validation {
        for error in &errors {
            tracing::error!("{}", error);
        }
        return Err("Parameters validation failed".into());
    }

    match &config.sentry_dsn {
        Some(dsn) => tracing::info!("Sentry initialized with DSN {}", dsn),
        None => tracing::info!("Not using Sentry"),
    }

    let result = run_server(config).await;

    if let Some(reporter) = reporter {
        reporter.flush(Duration::from_secs(5)).await;
        reporter.stop();
    }
    result
}
