//! Input validators for user-supplied fields.

/// Minimum accepted password length (inclusive).
pub const PASSWORD_MIN_LEN: usize = 6;

/// Maximum accepted password length (inclusive).
pub const PASSWORD_MAX_LEN: usize = 24;

/// Number of digits in an SMS verification code.
pub const VERIFICATION_CODE_LEN: usize = 5;

/// Validate a Russian phone number: `+7`, `7` or `8` followed by ten digits.
pub fn validate_phone(phone: &str) -> bool {
    let rest = if let Some(rest) = phone.strip_prefix("+7") {
        rest
    } else if let Some(rest) = phone.strip_prefix('7').or_else(|| phone.strip_prefix('8')) {
        rest
    } else {
        return false;
    };
    rest.len() == 10 && rest.bytes().all(|b| b.is_ascii_digit())
}

/// Loose structural email check: one `@`, non-empty local part, dotted domain.
pub fn validate_email(email: &str) -> bool {
    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|l| {
            !l.is_empty()
                && !l.starts_with('-')
                && !l.ends_with('-')
                && l.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

pub fn validate_password(password: &str) -> bool {
    (PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&password.chars().count())
}

/// A verification code is exactly five ASCII digits.
pub fn validate_verification_code(code: &str) -> bool {
    code.len() == VERIFICATION_CODE_LEN && code.bytes().all(|b| b.is_ascii_digit())
}
