//! Input checks that run before any store or storage call.

use crate::errors::AppError;

pub const MIN_PASSWORD_LEN: usize = 6;

pub fn require(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(())
}

/// Loose shape check: something before and after a single `@`, and a dot in the domain.
pub fn validate_email(email: &str) -> Result<(), AppError> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(AppError::Validation(format!(
            "'{email}' is not a valid email address"
        )));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), AppError> {
    require("username", username)?;
    if username.trim().chars().any(char::is_whitespace) {
        return Err(AppError::Validation(
            "username must not contain spaces".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_accepts_plain_address() {
        assert!(validate_email("wang@example.com").is_ok());
        assert!(validate_email(" li@corp.example.org ").is_ok());
    }

    #[test]
    fn test_email_rejects_missing_at() {
        assert!(validate_email("wang.example.com").is_err());
    }

    #[test]
    fn test_email_rejects_empty_parts() {
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("wang@").is_err());
        assert!(validate_email("wang@localhost").is_err());
    }

    #[test]
    fn test_email_rejects_double_at() {
        assert!(validate_email("a@b@example.com").is_err());
    }

    #[test]
    fn test_password_minimum_length() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn test_password_counts_characters_not_bytes() {
        assert!(validate_password("密碼密碼密").is_err());
        assert!(validate_password("密碼密碼密碼").is_ok());
    }

    #[test]
    fn test_username_rejects_whitespace() {
        assert!(validate_username("wang wei").is_err());
        assert!(validate_username("   ").is_err());
        assert!(validate_username("wang").is_ok());
    }
}
