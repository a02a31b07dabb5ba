//! Input validation for identity fields.
//!
//! The legacy handlers shipped two divergent rule sets; this module keeps
//! the stricter one: RFC-shaped email, exactly ten digit mobile, password
//! of at least eight characters.

use crate::errors::IdentityError;

const MIN_PASSWORD_LEN: usize = 8;

pub fn validate_email(email: &str) -> Result<(), IdentityError> {
    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return Err(IdentityError::InvalidEmail),
    };

    let well_formed = !local.is_empty()
        && !domain.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !email.chars().any(char::is_whitespace);

    if well_formed {
        Ok(())
    } else {
        Err(IdentityError::InvalidEmail)
    }
}

pub fn validate_mobile(mobile: &str) -> Result<(), IdentityError> {
    if mobile.len() == 10 && mobile.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(IdentityError::InvalidMobile)
    }
}

pub fn validate_password(password: &str) -> Result<(), IdentityError> {
    if password.len() >= MIN_PASSWORD_LEN {
        Ok(())
    } else {
        Err(IdentityError::WeakPassword)
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::IdentityError;

    use super::{validate_email, validate_mobile, validate_password};

    #[test]
    fn accepts_plain_addresses() {
        assert_eq!(validate_email("asha@example.in"), Ok(()));
        assert_eq!(validate_email("first.last@dept.gov.in"), Ok(()));
    }

    #[test]
    fn rejects_malformed_addresses() {
        for email in ["", "no-at-sign", "@example.in", "a@b", "a@@b.in", "a b@example.in", "a@.in", "a@in."] {
            assert_eq!(validate_email(email), Err(IdentityError::InvalidEmail), "email: {email:?}");
        }
    }

    #[test]
    fn mobile_must_be_ten_digits() {
        assert_eq!(validate_mobile("9876543210"), Ok(()));
        for mobile in ["", "12345", "98765432100", "98765x3210", "+919876543"] {
            assert_eq!(validate_mobile(mobile), Err(IdentityError::InvalidMobile), "mobile: {mobile:?}");
        }
    }

    #[test]
    fn password_needs_eight_characters() {
        assert_eq!(validate_password("hunter12"), Ok(()));
        assert_eq!(validate_password("hunter1"), Err(IdentityError::WeakPassword));
    }
}
