//! Team to recipient resolution
//!
//! The directory is a spreadsheet mapping each team to the phone numbers of
//! its on-call members. Reads go through two caches: a short-lived one that
//! bounds the load on the rate-limited Sheets API, and a never-expiring one
//! that keeps the last known good rows around for when the API is down.

pub mod cache;
pub mod client;
pub mod resolver;
pub mod sheets;

pub use cache::{CacheStats, CachedRecipients, RecipientCache, SHORT_CACHE_TTL};
pub use client::{DirectoryClient, DirectoryError, DirectorySnapshot, Recipients, TeamRow};
pub use resolver::{RecipientResolver, ResolveError, ResolverStats};
pub use sheets::{ServiceAccountKey, SheetsDirectory, READ_RANGE};
