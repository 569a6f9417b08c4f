//! Configuration validation, failing fast at startup

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use super::Config;
use crate::telemetry::SentryDsn;

fn twilio_sid() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z]{2}[0-9a-f]{32}$").expect("valid SID pattern"))
}

fn phone() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+[1-9]\d{1,14}$").expect("valid phone pattern"))
}

fn sheet_id() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9-_]+$").expect("valid sheet id pattern"))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is required")]
    Missing { name: &'static str },

    #[error("{name} is not a valid Twilio SID: {value}")]
    InvalidSid { name: &'static str, value: String },

    #[error("TWILIO_FROM_NUMBER is not an E.164 phone number: {0}")]
    InvalidPhone(String),

    #[error("GOOGLE_SHEET_ID has invalid characters: {0}")]
    InvalidSheetId(String),

    #[error("GOOGLE_TOKEN_PATH is not a file: {0}")]
    NotAFile(String),

    #[error("PORT must be between 0 and 65535: {0}")]
    InvalidPort(String),

    #[error("SENTRY_DSN is invalid: {0}")]
    InvalidSentryDsn(String),
}

impl Config {
    /// Check every field, collecting all violations
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        for (name, value) in [
            ("TWILIO_ACCOUNT_SID", &self.twilio_account_sid),
            ("TWILIO_AUTH_SID", &self.twilio_auth_sid),
        ] {
            if value.is_empty() {
                errors.push(ConfigError::Missing { name });
            } else if !twilio_sid().is_match(value) {
                errors.push(ConfigError::InvalidSid {
                    name,
                    value: value.clone(),
                });
            }
        }

        if self.twilio_auth_token.is_empty() {
            errors.push(ConfigError::Missing {
                name: "TWILIO_AUTH_TOKEN",
            });
        }

        if self.twilio_from_number.is_empty() {
            errors.push(ConfigError::Missing {
                name: "TWILIO_FROM_NUMBER",
            });
        } else if !phone().is_match(&self.twilio_from_number) {
            errors.push(ConfigError::InvalidPhone(self.twilio_from_number.clone()));
        }

        if self.google_sheet_id.is_empty() {
            errors.push(ConfigError::Missing {
                name: "GOOGLE_SHEET_ID",
            });
        } else if !sheet_id().is_match(&self.google_sheet_id) {
            errors.push(ConfigError::InvalidSheetId(self.google_sheet_id.clone()));
        }

        if self.google_token_path.is_empty() {
            errors.push(ConfigError::Missing {
                name: "GOOGLE_TOKEN_PATH",
            });
        } else if !Path::new(&self.google_token_path).is_file() {
            errors.push(ConfigError::NotAFile(self.google_token_path.clone()));
        }

        if !self.port.is_empty() && self.port.parse::<u16>().is_err() {
            errors.push(ConfigError::InvalidPort(self.port.clone()));
        }

        if let Some(dsn) = &self.sentry_dsn {
            if let Err(e) = SentryDsn::parse(dsn) {
                errors.push(ConfigError::InvalidSentryDsn(e));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
