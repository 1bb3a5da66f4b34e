//! Validation helpers for DTOs.

use validator::ValidationError;

/// Length of a session join code.
pub const SESSION_CODE_LENGTH: usize = 6;

/// Validates that a session code is exactly six decimal digits.
pub fn validate_session_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != SESSION_CODE_LENGTH {
        let mut err = ValidationError::new("session_code_length");
        err.message = Some(
            format!(
                "Session code must be exactly {SESSION_CODE_LENGTH} characters (got {})",
                code.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !code.chars().all(|c| c.is_ascii_digit()) {
        let mut err = ValidationError::new("session_code_format");
        err.message = Some("Session code must contain only decimal digits".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_session_code_valid() {
        assert!(validate_session_code("000000").is_ok());
        assert!(validate_session_code("123456").is_ok());
        assert!(validate_session_code("999999").is_ok());
    }

    #[test]
    fn test_validate_session_code_invalid_length() {
        assert!(validate_session_code("12345").is_err()); // too short
        assert!(validate_session_code("1234567").is_err()); // too long
        assert!(validate_session_code("").is_err()); // empty
    }

    #[test]
    fn test_validate_session_code_invalid_format() {
        assert!(validate_session_code("12345a").is_err()); // letter
        assert!(validate_session_code("12 456").is_err()); // space
        assert!(validate_session_code("١٢٣٤٥٦").is_err()); // non-ASCII digits
    }
}
