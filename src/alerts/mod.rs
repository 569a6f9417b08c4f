//! Alert dispatch
//!
//! Turns Alertmanager webhook batches into SMS messages: each alert is sent
//! to the numbers of its `phone_numbers` label when present and well formed,
//! otherwise to the numbers the directory holds for its `team` label.

pub mod dispatcher;
pub mod labels;
pub mod notifier;
pub mod payload;

pub use dispatcher::{AlertDispatcher, DispatchError, DispatchReport};
pub use labels::{parse_phone_numbers, LabelError};
pub use notifier::{Notifier, NotifierError, TwilioCredentials, TwilioNotifier};
pub use payload::{Alert, AlertBatch};
