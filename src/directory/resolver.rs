//! Recipient resolution over the short and fallback caches

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use super::cache::{CacheStats, CachedRecipients, RecipientCache};
use super::client::{DirectoryClient, DirectoryError, DirectorySnapshot, Recipients};

/// Resolves a team to its recipients.
///
/// Lookup order: short cache, then a full directory fetch (which refills both
/// caches for every team in the snapshot), then the fallback cache when the
/// fetch fails. A fetch that succeeds without the team is authoritative and
/// never falls back.
pub struct RecipientResolver {
    directory: Arc<dyn DirectoryClient>,
    short: Arc<RecipientCache>,
    long: Arc<RecipientCache>,
}

impl RecipientResolver {
    pub fn new(
        directory: Arc<dyn DirectoryClient>,
        short: Arc<RecipientCache>,
        long: Arc<RecipientCache>,
    ) -> Self {
        Self {
            directory,
            short,
            long,
        }
    }

    pub async fn resolve(&self, team: &str) -> Result<Recipients, ResolveError> {
        if let Some(entry) = self.short.get(team) {
            return Ok(entry.recipients);
        }

        tracing::info!(team = %team, "Getting numbers for team from directory");

        match self.fetch().await {
            Ok(snapshot) => {
                self.store(&snapshot);
                snapshot
                    .get(team)
                    .cloned()
                    .ok_or_else(|| ResolveError::NotFound {
                        team: team.to_string(),
                    })
            }
            Err(err) => {
                tracing::error!(
                    team = %team,
                    error = %err,
                    "Directory unavailable, reading from fallback cache"
                );
                match self.long.get(team) {
                    Some(entry) => {
                        tracing::warn!(
                            team = %team,
                            fetched_at = %entry.fetched_at,
                            "Serving recipients from fallback cache"
                        );
                        Ok(entry.recipients)
                    }
                    None => Err(ResolveError::NotInFallback {
                        team: team.to_string(),
                        source: err,
                    }),
                }
            }
        }
    }

    async fn fetch(&self) -> Result<DirectorySnapshot, DirectoryError> {
        let snapshot = self.directory.fetch_all().await?;
        if snapshot.is_empty() {
            return Err(DirectoryError::EmptySnapshot);
        }
        Ok(snapshot)
    }

    /// Write every row into both caches, short and fallback entries of a
    /// team sharing the same fetch. When a team appears on several rows the
    /// first one wins, matching `DirectorySnapshot::get`.
    fn store(&self, snapshot: &DirectorySnapshot) {
        let fetched_at = Utc::now();
        let mut seen = HashSet::new();
        for row in &snapshot.rows {
            if !seen.insert(row.team.as_str()) {
                tracing::warn!(team = %row.team, "Duplicate team row in directory, keeping the first");
                continue;
            }
            let entry = CachedRecipients {
                recipients: row.recipients.clone(),
                fetched_at,
            };
            self.long.put(&row.team, entry.clone());
            self.short.put(&row.team, entry);
        }
        tracing::debug!(rows = snapshot.len(), "Directory snapshot cached");
    }

    pub fn stats(&self) -> ResolverStats {
        ResolverStats {
            short_cache: self.short.stats(),
            fallback_cache: self.long.stats(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ResolverStats {
    pub short_cache: CacheStats,
    pub fallback_cache: CacheStats,
}

/// Resolution failures
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The directory was read and has no row for the team
    #[error("No row found in Sheet for team {team}")]
    NotFound { team: String },

    /// The directory could not be read and the fallback cache misses
    #[error("No numbers found in fallback cache for team {team}: {source}")]
    NotInFallback {
        team: String,
        #[source]
        source: DirectoryError,
    },
}

impl ResolveError {
    pub fn team(&self) -> &str {
        match self {
            ResolveError::NotFound { team } | ResolveError::NotInFallback { team, .. } => team,
        }
    }
}
