//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest display name (player or team) the backend accepts.
pub const MAX_NAME_LENGTH: usize = 24;

/// Validates a display name: non-blank after trimming, at most
/// [`MAX_NAME_LENGTH`] characters, no control characters.
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("name_blank");
        err.message = Some("name must not be blank".into());
        return Err(err);
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        let mut err = ValidationError::new("name_length");
        err.message = Some(
            format!(
                "name must be at most {} characters (got {})",
                MAX_NAME_LENGTH,
                name.chars().count()
            )
            .into(),
        );
        return Err(err);
    }

    if name.chars().any(char::is_control) {
        let mut err = ValidationError::new("name_control_chars");
        err.message = Some("name must not contain control characters".into());
        return Err(err);
    }

    Ok(())
}

/// Validates a picked option: non-blank after trimming.
pub fn validate_choice(choice: &str) -> Result<(), ValidationError> {
    if choice.trim().is_empty() {
        let mut err = ValidationError::new("choice_blank");
        err.message = Some("choice must not be blank".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_display_name_valid() {
        assert!(validate_display_name("Ana").is_ok());
        assert!(validate_display_name("The Blue Falcons").is_ok());
        assert!(validate_display_name("  padded  ").is_ok());
    }

    #[test]
    fn test_validate_display_name_blank() {
        assert!(validate_display_name("").is_err());
        assert!(validate_display_name("   ").is_err());
    }

    #[test]
    fn test_validate_display_name_too_long() {
        assert!(validate_display_name(&"x".repeat(24)).is_ok());
        assert!(validate_display_name(&"x".repeat(25)).is_err());
    }

    #[test]
    fn test_validate_display_name_control_chars() {
        assert!(validate_display_name("An\na").is_err());
        assert!(validate_display_name("An\u{0007}a").is_err());
    }

    #[test]
    fn test_validate_choice() {
        assert!(validate_choice("Minecraft").is_ok());
        assert!(validate_choice("").is_err());
        assert!(validate_choice("  ").is_err());
    }
}
