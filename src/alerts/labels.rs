//! Recipient override label parsing

use std::sync::OnceLock;

use regex::Regex;

/// Comma-separated numbers without `+`: a leading 1-9 then 1 to 14 digits
const PHONE_LIST_PATTERN: &str = r"^[1-9]\d{1,14}(,[1-9]\d{1,14})*$";

fn phone_list_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PHONE_LIST_PATTERN).expect("valid phone list pattern"))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LabelError {
    #[error("Wrong comma-separated phone numbers syntax")]
    Syntax,
}

/// Parse a `phone_numbers` label.
///
/// Returns `Ok(None)` for an empty label, meaning no override.
pub fn parse_phone_numbers(label: &str) -> Result<Option<Vec<String>>, LabelError> {
    if label.is_empty() {
        return Ok(None);
    }
    if !phone_list_regex().is_match(label) {
        return Err(LabelError::Syntax);
    }
    Ok(Some(label.split(',').map(str::to_string).collect()))
}
