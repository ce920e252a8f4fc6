use crate::domain::model::{FieldError, Identity, IdentityField};
use regex::Regex;
use std::sync::LazyLock;

pub const REQUIRED_MESSAGE: &str = "This field is required";
pub const INVALID_EMAIL_MESSAGE: &str = "The email address is not formatted correctly";

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

/// Checks the identity step before the wizard may leave it.
pub struct ValidationGate;

impl ValidationGate {
    /// Returns one error per invalid field; empty means the input passes.
    pub fn check(input: &Identity) -> Vec<FieldError> {
        IdentityField::ALL
            .into_iter()
            .filter_map(|field| {
                Self::check_field(field, input.get(field)).map(|message| FieldError {
                    field,
                    message: message.to_string(),
                })
            })
            .collect()
    }

    fn check_field(field: IdentityField, raw: &str) -> Option<&'static str> {
        let value = raw.trim();
        if value.is_empty() {
            return Some(REQUIRED_MESSAGE);
        }
        if field == IdentityField::Email && !EMAIL_PATTERN.is_match(value) {
            return Some(INVALID_EMAIL_MESSAGE);
        }
        None
    }
}
