//! SMS delivery

use async_trait::async_trait;
use serde::Deserialize;

const TWILIO_BASE_URL: &str = "https://api.twilio.com";

/// Sends one message to one recipient. No retries.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Returns the provider's message id
    async fn send(&self, recipient: &str, message: &str) -> Result<String, NotifierError>;
}

/// Twilio account used to send messages
#[derive(Debug, Clone)]
pub struct TwilioCredentials {
    pub account_sid: String,
    pub auth_sid: String,
    pub auth_token: String,
    /// Sender number, E.164
    pub from_number: String,
}

/// Notifier backed by the Twilio Messages API
pub struct TwilioNotifier {
    client: reqwest::Client,
    credentials: TwilioCredentials,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: Option<String>,
}

impl TwilioNotifier {
    pub fn new(client: reqwest::Client, credentials: TwilioCredentials) -> Self {
        Self {
            client,
            credentials,
            base_url: TWILIO_BASE_URL.to_string(),
        }
    }

    /// Point at another API host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn send(&self, recipient: &str, message: &str) -> Result<String, NotifierError> {
        tracing::info!(recipient = %recipient, "Sending SMS: {}", message);

        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.credentials.account_sid
        );
        let form = [
            ("To", recipient),
            ("From", self.credentials.from_number.as_str()),
            ("Body", message),
        ];

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.credentials.auth_sid, Some(&self.credentials.auth_token))
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| NotifierError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NotifierError::Status(format!("{} - {}", status, body)));
        }

        let body: MessageResponse = response
            .json()
            .await
            .map_err(|e| NotifierError::Response(e.to_string()))?;
        let sid = body.sid.unwrap_or_default();

        tracing::info!(recipient = %recipient, sid = %sid, "Successfully sent SMS");
        Ok(sid)
    }
}

/// Notifier errors
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("Error querying twilio API: {0}")]
    Request(String),

    #[error("Non-200 response from twilio API: {0}")]
    Status(String),

    #[error("Error in twilio response body: {0}")]
    Response(String),
}
