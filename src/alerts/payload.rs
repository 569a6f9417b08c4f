//! Alertmanager webhook payload

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Label holding the team to page
pub const TEAM_LABEL: &str = "team";
/// Label overriding directory recipients
pub const PHONE_NUMBERS_LABEL: &str = "phone_numbers";
/// Annotation used as message text
pub const SUMMARY_ANNOTATION: &str = "summary";

/// Webhook body, as posted by Alertmanager
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AlertBatch {
    pub version: String,
    pub group_key: String,
    pub receiver: String,
    pub status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub alerts: Vec<Alert>,
    #[serde(deserialize_with = "null_as_default")]
    pub group_labels: HashMap<String, String>,
    #[serde(deserialize_with = "null_as_default")]
    pub common_labels: HashMap<String, String>,
    #[serde(deserialize_with = "null_as_default")]
    pub common_annotations: HashMap<String, String>,
    #[serde(rename = "externalURL")]
    pub external_url: String,
}

impl AlertBatch {
    /// Decode a webhook body; a JSON `null` body is an empty batch
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        let batch: Option<Self> = serde_json::from_slice(body)?;
        Ok(batch.unwrap_or_default())
    }
}

/// Explicit `null` decodes like an absent field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One alert of a batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Alert {
    /// `firing` or `resolved`
    pub status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub labels: HashMap<String, String>,
    #[serde(deserialize_with = "null_as_default")]
    pub annotations: HashMap<String, String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(rename = "generatorURL")]
    pub generator_url: String,
    pub fingerprint: String,
}

impl Alert {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Value of the `team` label, empty when absent
    pub fn team(&self) -> &str {
        self.label(TEAM_LABEL)
    }

    /// Value of the `phone_numbers` label, empty when absent
    pub fn phone_numbers(&self) -> &str {
        self.label(PHONE_NUMBERS_LABEL)
    }

    pub fn summary(&self) -> &str {
        self.annotations
            .get(SUMMARY_ANNOTATION)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// SMS text for this alert
    pub fn message(&self) -> String {
        format!("{}: {}", self.status, self.summary())
    }

    fn label(&self, key: &str) -> &str {
        self.labels.get(key).map(String::as_str).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_alertmanager_body() {
        let body = r#"{
            "version": "4",
            "groupKey": "{}:{alertname=\"HighLatency\"}",
            "truncatedAlerts": 0,
            "status": "firing",
            "receiver": "sms",
            "groupLabels": {"alertname": "HighLatency"},
            "commonLabels": {"team": "infra"},
            "commonAnnotations": {},
            "externalURL": "http://alertmanager:9093",
            "alerts": [{
                "status": "firing",
                "labels": {"alertname": "HighLatency", "team": "infra"},
                "annotations": {"summary": "p99 above 2s"},
                "startsAt": "2024-03-01T10:00:00Z",
                "endsAt": "0001-01-01T00:00:00Z",
                "generatorURL": "http://prometheus:9090/graph",
                "fingerprint": "a1b2c3"
            }]
        }"#;

        let batch: AlertBatch = serde_json::from_str(body).unwrap();

        assert_eq!(batch.external_url, "http://alertmanager:9093");
        assert_eq!(batch.alerts.len(), 1);
        let alert = &batch.alerts[0];
        assert_eq!(alert.team(), "infra");
        assert_eq!(alert.phone_numbers(), "");
        assert_eq!(alert.generator_url, "http://prometheus:9090/graph");
        assert_eq!(alert.message(), "firing: p99 above 2s");
    }

    #[test]
    fn test_null_body_and_fields_are_empty() {
        let batch = AlertBatch::from_slice(b"null").unwrap();
        assert!(batch.alerts.is_empty());

        let batch = AlertBatch::from_slice(br#"{"alerts": null, "commonLabels": null}"#).unwrap();
        assert!(batch.alerts.is_empty());
        assert!(batch.common_labels.is_empty());

        let batch =
            AlertBatch::from_slice(br#"{"alerts": [{"status": "firing", "labels": null}]}"#).unwrap();
        assert_eq!(batch.alerts[0].team(), "");

        assert!(AlertBatch::from_slice(b"[1, 2]").is_err());
    }

    #[test]
    fn test_missing_fields_default() {
        let batch: AlertBatch = serde_json::from_str(r#"{"alerts": [{}]}"#).unwrap();

        let alert = &batch.alerts[0];
        assert_eq!(alert.team(), "");
        assert_eq!(alert.message(), ": ");
        assert!(alert.starts_at.is_none());
    }
}
