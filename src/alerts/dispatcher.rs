//! Alert batch dispatch

use std::sync::Arc;

use super::labels::parse_phone_numbers;
use super::notifier::{Notifier, NotifierError};
use super::payload::{Alert, AlertBatch};
use crate::directory::{Recipients, RecipientResolver, ResolveError};

/// Outcome of a fully delivered batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub alerts: usize,
    pub messages: usize,
}

/// Sends every alert of a batch to its recipients.
///
/// The first resolution or send failure aborts the rest of the batch;
/// messages already sent stay sent.
pub struct AlertDispatcher {
    resolver: Arc<RecipientResolver>,
    notifier: Arc<dyn Notifier>,
}

impl AlertDispatcher {
    pub fn new(resolver: Arc<RecipientResolver>, notifier: Arc<dyn Notifier>) -> Self {
        Self { resolver, notifier }
    }

    pub fn resolver(&self) -> &RecipientResolver {
        &self.resolver
    }

    pub async fn dispatch(&self, batch: &AlertBatch) -> Result<DispatchReport, DispatchError> {
        let mut report = DispatchReport::default();

        for alert in &batch.alerts {
            let message = alert.message();
            let recipients = self.recipients(alert).await?;

            for recipient in recipients {
                let recipient = e164(&recipient);
                self.notifier
                    .send(&recipient, &message)
                    .await
                    .map_err(|source| DispatchError::Send { recipient, source })?;
                report.messages += 1;
            }
            report.alerts += 1;
        }

        Ok(report)
    }

    /// Label override when well formed, directory otherwise
    async fn recipients(&self, alert: &Alert) -> Result<Recipients, DispatchError> {
        match parse_phone_numbers(alert.phone_numbers()) {
            Ok(Some(numbers)) => return Ok(numbers),
            Ok(None) => {}
            Err(e) => {
                tracing::error!(
                    phone_numbers = %alert.phone_numbers(),
                    "Cannot use label-provided phone numbers: {}",
                    e
                );
            }
        }

        Ok(self.resolver.resolve(alert.team()).await?)
    }
}

/// Directory and label numbers may omit the leading `+`
fn e164(number: &str) -> String {
    if number.starts_with('+') {
        number.to_string()
    } else {
        format!("+{}", number)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("{source}")]
    Send {
        recipient: String,
        #[source]
        source: NotifierError,
    },
}
