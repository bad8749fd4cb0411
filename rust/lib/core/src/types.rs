use crate::ServiceError;

/// Get the current time as an RFC 3339 string.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Trim a required text field, rejecting blank input.
///
/// `field` is the wire name of the field and ends up in the error message.
pub fn required_text(value: &str, field: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Validation(format!("{field} é obrigatório")));
    }
    Ok(trimmed.to_string())
}

/// Normalise an optional free-text field: blank becomes `None`.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
