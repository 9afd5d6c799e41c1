//! services/client/src/validation.rs
//!
//! Input validation helpers for the signup/login/profile forms. The host
//! shell enforces these at its input boundary; the store itself accepts
//! whatever it is given, matching the remote fixture's behavior.

pub const PASSWORD_MIN_LENGTH: usize = 6;
pub const NAME_MIN_LENGTH: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Password must be at least {} characters", PASSWORD_MIN_LENGTH)]
    PasswordTooShort,
    #[error("Name must be at least {} characters", NAME_MIN_LENGTH)]
    NameTooShort,
    #[error("Passwords don't match")]
    PasswordMismatch,
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::Required("Email"));
    }
    if !email_shape_ok(email) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

/// `local@domain.tld`, no whitespace, exactly one `@`.
fn email_shape_ok(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::Required("Password"));
    }
    if password.len() < PASSWORD_MIN_LENGTH {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::Required("Name"));
    }
    if name.len() < NAME_MIN_LENGTH {
        return Err(ValidationError::NameTooShort);
    }
    Ok(())
}

pub fn validate_password_confirmation(
    password: &str,
    confirmation: &str,
) -> Result<(), ValidationError> {
    if confirmation.is_empty() {
        return Err(ValidationError::Required("Password confirmation"));
    }
    if password != confirmation {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

pub fn validate_required(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation_accepts_ordinary_addresses() {
        assert!(validate_email("client@test.com").is_ok());
        assert!(validate_email("  padded@test.com  ").is_ok());
    }

    #[test]
    fn email_validation_rejects_malformed_addresses() {
        assert_eq!(validate_email(""), Err(ValidationError::Required("Email")));
        assert_eq!(validate_email("no-at-sign"), Err(ValidationError::InvalidEmail));
        assert_eq!(validate_email("two@@test.com"), Err(ValidationError::InvalidEmail));
        assert_eq!(validate_email("spaced @test.com"), Err(ValidationError::InvalidEmail));
        assert_eq!(validate_email("nodot@test"), Err(ValidationError::InvalidEmail));
        assert_eq!(validate_email("@test.com"), Err(ValidationError::InvalidEmail));
    }

    #[test]
    fn password_length_is_enforced() {
        assert!(validate_password("123123").is_ok());
        assert_eq!(
            validate_password("12345"),
            Err(ValidationError::PasswordTooShort)
        );
        assert_eq!(validate_password(""), Err(ValidationError::Required("Password")));
    }

    #[test]
    fn name_length_is_enforced() {
        assert!(validate_name("Al").is_ok());
        assert_eq!(validate_name("A"), Err(ValidationError::NameTooShort));
        assert_eq!(validate_name("   "), Err(ValidationError::Required("Name")));
    }

    #[test]
    fn confirmation_must_match() {
        assert!(validate_password_confirmation("secret", "secret").is_ok());
        assert_eq!(
            validate_password_confirmation("secret", "other"),
            Err(ValidationError::PasswordMismatch)
        );
        assert_eq!(
            validate_password_confirmation("secret", ""),
            Err(ValidationError::Required("Password confirmation"))
        );
    }
}
