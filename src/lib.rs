//! alertsms: Alertmanager to SMS relay
//!
//! Receives Alertmanager webhooks and texts each alert to the on-call numbers
//! of the alert's team. Team numbers live in a Google Sheet (first column the
//! team, following columns the numbers) so rotations are edited there rather
//! than in configuration.
//!
//! # Features
//!
//! - **Directory caching**: sheet reads are cached for ten minutes, and every
//!   read refreshes all teams at once
//! - **Stale fallback**: when the sheet cannot be read, the last successfully
//!   read numbers are used
//! - **Label override**: a `phone_numbers` label sends to explicit numbers
//!   without touching the sheet
//! - **Error forwarding**: warnings and errors go to Sentry when configured
//!
//! # Example
//!
//! ```no_run
//! use alertsms::directory::{RecipientCache, RecipientResolver, SheetsDirectory, SHORT_CACHE_TTL};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let directory = SheetsDirectory::new(reqwest::Client::new(), "sheet-id", "/etc/alertsms/key.json");
//! let resolver = RecipientResolver::new(
//!     Arc::new(directory),
//!     Arc::new(RecipientCache::short(SHORT_CACHE_TTL)),
//!     Arc::new(RecipientCache::fallback()),
//! );
//!
//! let numbers = resolver.resolve("infra").await?;
//! println!("Paging: {:?}", numbers);
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod api;
pub mod config;
pub mod directory;
pub mod telemetry;

// Re-export commonly used types
pub use alerts::{AlertBatch, AlertDispatcher, DispatchError};
pub use config::{Config, ConfigError};
pub use directory::{RecipientResolver, ResolveError};
