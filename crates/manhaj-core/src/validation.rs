//! # Input Validation
//!
//! Boundary checks run before any mutation reaches the store. Each function
//! returns the normalized value to persist.

use crate::primitives::{
    ALL_COUNTRIES, MAX_CONTENT_LENGTH, MAX_DESCRIPTION_LENGTH, MAX_EMAIL_LENGTH, MAX_GRADE,
    MAX_ID_LENGTH, MAX_NAME_LENGTH, MAX_TITLE_LENGTH, MIN_GRADE,
};
use crate::ManhajError;

/// Minimum password length accepted for new accounts.
const MIN_PASSWORD_LENGTH: usize = 6;

fn bounded(field: &str, value: &str, max_chars: usize) -> Result<String, ManhajError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ManhajError::invalid(format!("{field} is required")));
    }
    if trimmed.chars().count() > max_chars {
        return Err(ManhajError::invalid(format!(
            "{field} exceeds {max_chars} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Non-blank, at most `MAX_TITLE_LENGTH` characters. Returns the trimmed title.
pub fn title(value: &str) -> Result<String, ManhajError> {
    bounded("title", value, MAX_TITLE_LENGTH)
}

/// Optional description. Blank input is stored as `None`.
pub fn description(value: Option<&str>) -> Result<Option<String>, ManhajError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) if text.chars().count() > MAX_DESCRIPTION_LENGTH => Err(ManhajError::invalid(
            format!("description exceeds {MAX_DESCRIPTION_LENGTH} characters"),
        )),
        Some(text) => Ok(Some(text.to_string())),
    }
}

/// Opaque document blob. Only the size is checked; the bytes are kept as-is.
pub fn content(value: &str) -> Result<(), ManhajError> {
    if value.len() > MAX_CONTENT_LENGTH {
        return Err(ManhajError::invalid(format!(
            "content exceeds {MAX_CONTENT_LENGTH} bytes"
        )));
    }
    Ok(())
}

/// Caller-chosen node id: ASCII letters, digits, `-` and `_`.
pub fn node_id(value: &str) -> Result<String, ManhajError> {
    if value.is_empty() || value.len() > MAX_ID_LENGTH {
        return Err(ManhajError::invalid(format!(
            "node id must be 1..={MAX_ID_LENGTH} characters"
        )));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ManhajError::invalid(format!(
            "node id '{value}' may contain only letters, digits, '-' and '_'"
        )));
    }
    Ok(value.to_string())
}

/// Display name of a user.
pub fn user_name(value: &str) -> Result<String, ManhajError> {
    bounded("name", value, MAX_NAME_LENGTH)
}

/// Trim and lowercase an email. Requires a single `@` with text on both sides.
pub fn email(value: &str) -> Result<String, ManhajError> {
    let normalized = bounded("email", value, MAX_EMAIL_LENGTH)?.to_lowercase();
    let mut parts = normalized.split('@');
    let well_formed = matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty()
    );
    if !well_formed || normalized.chars().any(char::is_whitespace) {
        return Err(ManhajError::invalid(format!("'{value}' is not an email address")));
    }
    Ok(normalized)
}

/// Passwords are required and must not be trivially short.
pub fn password(value: &str) -> Result<(), ManhajError> {
    if value.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ManhajError::invalid(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Curriculum slot. Country is `ALL` or two ASCII letters (uppercased);
/// grade is within the school years; subject is non-blank.
pub fn curriculum(
    country: &str,
    grade: u8,
    subject: &str,
) -> Result<(String, u8, String), ManhajError> {
    let country = country.trim().to_ascii_uppercase();
    let is_code = country.len() == 2 && country.chars().all(|c| c.is_ascii_alphabetic());
    if country != ALL_COUNTRIES && !is_code {
        return Err(ManhajError::invalid(format!(
            "country must be {ALL_COUNTRIES} or a two-letter code, got '{country}'"
        )));
    }
    if !(MIN_GRADE..=MAX_GRADE).contains(&grade) {
        return Err(ManhajError::invalid(format!(
            "grade must be within {MIN_GRADE}..={MAX_GRADE}, got {grade}"
        )));
    }
    let subject = bounded("subject", subject, MAX_NAME_LENGTH)?;
    Ok((country, grade, subject))
}
