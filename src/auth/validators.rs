//! Input checks shared by registration and profile updates.
//!
//! `validate_email` is a yes/no check; the password and username validators
//! return every violated rule so the client can show them all at once.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
    static ref USERNAME_RE: Regex = Regex::new(r"^[a-zA-Z0-9_]+$").unwrap();
    // any Unicode decimal digit, not only ASCII
    static ref DIGIT_RE: Regex = Regex::new(r"\d").unwrap();
}

pub const PASSWORD_MIN_LEN: usize = 8;
pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 20;

pub fn validate_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn validate_password(password: &str) -> Vec<String> {
    let mut errors = Vec::new();

    if password.chars().count() < PASSWORD_MIN_LEN {
        errors.push(format!(
            "Password must be at least {PASSWORD_MIN_LEN} characters"
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("Password must contain at least one uppercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push("Password must contain at least one lowercase letter".to_string());
    }
    if !DIGIT_RE.is_match(password) {
        errors.push("Password must contain at least one digit".to_string());
    }

    errors
}

pub fn validate_username(username: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let len = username.chars().count();

    if len < USERNAME_MIN_LEN {
        errors.push(format!(
            "Username must be at least {USERNAME_MIN_LEN} characters"
        ));
    }
    if len > USERNAME_MAX_LEN {
        errors.push(format!(
            "Username must not exceed {USERNAME_MAX_LEN} characters"
        ));
    }
    if !USERNAME_RE.is_match(username) {
        errors.push("Username can only contain letters, numbers, and underscores".to_string());
    }

    errors
}
