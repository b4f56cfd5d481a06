//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest room key accepted from clients.
pub const MAX_ROOM_KEY_LENGTH: usize = 64;

/// Validates that a room key is 1 to 64 ASCII letters, digits, `-` or `_`.
///
/// # Examples
///
/// ```ignore
/// validate_room_key("ABC-123")  // Ok
/// validate_room_key("")         // Err - empty
/// validate_room_key("abc def")  // Err - space
/// ```
pub fn validate_room_key(key: &str) -> Result<(), ValidationError> {
    if key.is_empty() || key.len() > MAX_ROOM_KEY_LENGTH {
        let mut err = ValidationError::new("room_key_length");
        err.message = Some(
            format!(
                "Room key must be between 1 and {MAX_ROOM_KEY_LENGTH} characters (got {})",
                key.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        let mut err = ValidationError::new("room_key_format");
        err.message =
            Some("Room key must contain only ASCII letters, digits, '-' or '_'".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_room_key_valid() {
        assert!(validate_room_key("ABC").is_ok());
        assert!(validate_room_key("room_42-b").is_ok());
        assert!(validate_room_key(&"x".repeat(MAX_ROOM_KEY_LENGTH)).is_ok());
    }

    #[test]
    fn test_validate_room_key_invalid_length() {
        assert!(validate_room_key("").is_err());
        assert!(validate_room_key(&"x".repeat(MAX_ROOM_KEY_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_room_key_invalid_format() {
        assert!(validate_room_key("abc def").is_err()); // space
        assert!(validate_room_key("abc/def").is_err()); // slash
        assert!(validate_room_key("café").is_err()); // non-ascii
    }
}
