//! Common validation rules applied to inbound credentials.

use validator::ValidationError;

/// Lowercases and trims an email so uniqueness is case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Validates password complexity.
///
/// Requirements:
/// - At least `min_length` characters
/// - At least one uppercase letter, one lowercase letter, one digit,
///   and one symbol
pub fn validate_password(password: &str, min_length: usize) -> Result<(), ValidationError> {
    if password.chars().count() < min_length {
        return Err(ValidationError::new("password_too_short"));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::new("password_missing_uppercase"));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(ValidationError::new("password_missing_lowercase"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::new("password_missing_digit"));
    }
    if password.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::new("password_missing_symbol"));
    }
    Ok(())
}
