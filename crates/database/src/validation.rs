//! Input validation for customer and service-request fields.

use std::fmt;

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid phone number format.
    InvalidPhone(String),
    /// Value too long.
    TooLong { field: String, max: usize, actual: usize },
    /// Empty value where one is required.
    Empty(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidPhone(msg) => write!(f, "Invalid phone number: {}", msg),
            ValidationError::TooLong { field, max, actual } => {
                write!(f, "{} is too long ({} chars, max {})", field, actual, max)
            }
            ValidationError::Empty(field) => write!(f, "{} cannot be empty", field),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Maximum allowed length for names.
pub const MAX_NAME_LENGTH: usize = 128;

/// Maximum allowed length for phone numbers.
pub const MAX_PHONE_LENGTH: usize = 20;

/// Validate a required, bounded-length name field.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Empty("name".to_string()));
    }

    if name.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LENGTH,
            actual: name.len(),
        });
    }

    Ok(())
}

/// Validate a phone number.
///
/// Accepts an optional leading `+` followed by digits, with spaces and
/// hyphens tolerated as separators. At least 7 digits are required.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(ValidationError::Empty("phone number".to_string()));
    }

    if phone.len() > MAX_PHONE_LENGTH {
        return Err(ValidationError::TooLong {
            field: "phone number".to_string(),
            max: MAX_PHONE_LENGTH,
            actual: phone.len(),
        });
    }

    let rest = phone.strip_prefix('+').unwrap_or(phone);
    let mut digits = 0;
    for c in rest.chars() {
        match c {
            '0'..='9' => digits += 1,
            ' ' | '-' => {}
            _ => {
                return Err(ValidationError::InvalidPhone(format!(
                    "unexpected character '{}'",
                    c
                )));
            }
        }
    }

    if digits < 7 {
        return Err(ValidationError::InvalidPhone(
            "must contain at least 7 digits".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Jane Smith").is_ok());
        assert!(validate_name("  Jane  ").is_ok()); // trimmed

        assert!(matches!(validate_name(""), Err(ValidationError::Empty(_))));
        assert!(matches!(
            validate_name(&"a".repeat(200)),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_validate_phone_valid() {
        assert!(validate_phone("+250788000000").is_ok());
        assert!(validate_phone("0788 000 000").is_ok());
        assert!(validate_phone("078-800-0000").is_ok());
    }

    #[test]
    fn test_validate_phone_invalid() {
        assert!(matches!(
            validate_phone(""),
            Err(ValidationError::Empty(_))
        ));

        // Letters
        assert!(matches!(
            validate_phone("+250CALLME"),
            Err(ValidationError::InvalidPhone(_))
        ));

        // Too few digits
        assert!(matches!(
            validate_phone("+1234"),
            Err(ValidationError::InvalidPhone(_))
        ));

        // Too long
        assert!(matches!(
            validate_phone("+123456789012345678901"),
            Err(ValidationError::TooLong { .. })
        ));
    }
}
