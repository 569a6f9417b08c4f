//! Process configuration
//!
//! Read from environment variables and validated once at startup:
//!
//! - TWILIO_ACCOUNT_SID, TWILIO_AUTH_SID: Twilio SIDs (`AC...`, `SK...`)
//! - TWILIO_AUTH_TOKEN: secret paired with TWILIO_AUTH_SID
//! - TWILIO_FROM_NUMBER: sender number, E.164
//! - GOOGLE_SHEET_ID: spreadsheet holding the team directory
//! - GOOGLE_TOKEN_PATH: service account key file
//! - HOST: bind address (default: 0.0.0.0)
//! - PORT: listen port (default: 9080)
//! - SENTRY_DSN: optional error reporting DSN

mod validation;

pub use validation::ConfigError;

use crate::alerts::TwilioCredentials;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 9080;

/// Raw configuration, see [`Config::validate`]
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub twilio_account_sid: String,
    pub twilio_auth_sid: String,
    pub twilio_auth_token: String,
    pub twilio_from_number: String,
    pub google_sheet_id: String,
    pub google_token_path: String,
    pub host: String,
    /// Empty means [`DEFAULT_PORT`]
    pub port: String,
    pub sentry_dsn: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable source; unset and set-but-empty are the same
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).unwrap_or_default();

        let host = var("HOST");
        Self {
            twilio_account_sid: var("TWILIO_ACCOUNT_SID"),
            twilio_auth_sid: var("TWILIO_AUTH_SID"),
            twilio_auth_token: var("TWILIO_AUTH_TOKEN"),
            twilio_from_number: var("TWILIO_FROM_NUMBER"),
            google_sheet_id: var("GOOGLE_SHEET_ID"),
            google_token_path: var("GOOGLE_TOKEN_PATH"),
            host: if host.is_empty() {
                DEFAULT_HOST.to_string()
            } else {
                host
            },
            port: var("PORT"),
            sentry_dsn: lookup("SENTRY_DSN").filter(|dsn| !dsn.is_empty()),
        }
    }

    /// Listen port; only meaningful once validated
    pub fn listen_port(&self) -> u16 {
        if self.port.is_empty() {
            DEFAULT_PORT
        } else {
            self.port.parse().unwrap_or(DEFAULT_PORT)
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.listen_port())
    }

    pub fn twilio_credentials(&self) -> TwilioCredentials {
        TwilioCredentials {
            account_sid: self.twilio_account_sid.clone(),
            auth_sid: self.twilio_auth_sid.clone(),
            auth_token: self.twilio_auth_token.clone(),
            from_number: self.twilio_from_number.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = Config::from_lookup(lookup(&[("TWILIO_AUTH_TOKEN", "secret"), ("SENTRY_DSN", "")]));

        assert_eq!(config.twilio_auth_token, "secret");
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.listen_port(), 9080);
        assert_eq!(config.listen_addr(), "0.0.0.0:9080");
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8081"),
            ("SENTRY_DSN", "https://abc@sentry.example.com/42"),
        ]));

        assert_eq!(config.listen_addr(), "127.0.0.1:8081");
        assert_eq!(
            config.sentry_dsn.as_deref(),
            Some("https://abc@sentry.example.com/42")
        );
    }
}
