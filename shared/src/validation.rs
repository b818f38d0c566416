//! Field validators.
//!
//! Pure predicates over the raw text a user typed. They never panic and never touch
//! any state; the edit session decides which ones run and in what order.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::ProfileField;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\(?([0-9]{3})\)?[-. ]?([0-9]{3})[-. ]?([0-9]{4})$").expect("valid phone regex")
});

pub const MIN_ADDRESS_LEN: usize = 5;

/// How strictly addresses are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressRule {
    /// Trimmed length of at least five characters, one of them alphanumeric.
    #[default]
    LengthAndAlphanumeric,
    /// Trimmed length of at least five characters.
    LengthOnly,
}

/// `local@domain.tld`, no whitespace, exactly one `@` boundary.
#[must_use]
pub fn is_email_valid(s: &str) -> bool {
    EMAIL_RE.is_match(s)
}

/// Ten-digit North-American number, optionally `(555) 123-4567` style.
/// Extensions are not accepted.
#[must_use]
pub fn is_phone_valid(s: &str) -> bool {
    PHONE_RE.is_match(s)
}

/// Finite and strictly greater than zero once parsed.
#[must_use]
pub fn is_positive_number(s: &str) -> bool {
    s.trim()
        .parse::<f64>()
        .map(|v| v.is_finite() && v > 0.0)
        .unwrap_or(false)
}

#[must_use]
pub fn is_address_valid(s: &str) -> bool {
    is_address_valid_with(s, AddressRule::LengthAndAlphanumeric)
}

#[must_use]
pub fn is_address_valid_with(s: &str, rule: AddressRule) -> bool {
    let trimmed = s.trim();
    if trimmed.chars().count() < MIN_ADDRESS_LEN {
        return false;
    }
    match rule {
        AddressRule::LengthAndAlphanumeric => trimmed.chars().any(char::is_alphanumeric),
        AddressRule::LengthOnly => true,
    }
}

/// A field that failed its validator, with the message shown under the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: ProfileField,
    pub message: String,
}

impl FieldViolation {
    fn new(field: ProfileField, message: &str) -> Self {
        Self {
            field,
            message: message.to_string(),
        }
    }
}

/// Runs the validator that belongs to `field`. Fields without a rule always pass.
pub fn validate_field(
    field: ProfileField,
    value: &str,
    address_rule: AddressRule,
) -> Result<(), FieldViolation> {
    let ok = match field {
        ProfileField::Email => is_email_valid(value),
        ProfileField::PhoneNumber => is_phone_valid(value),
        ProfileField::Weight | ProfileField::Height => is_positive_number(value),
        ProfileField::Address => is_address_valid_with(value, address_rule),
        ProfileField::Name | ProfileField::ExternalId => true,
    };
    if ok {
        Ok(())
    } else {
        Err(FieldViolation::new(field, violation_message(field)))
    }
}

#[must_use]
pub const fn violation_message(field: ProfileField) -> &'static str {
    match field {
        ProfileField::Email => "Please enter a valid email address.",
        ProfileField::PhoneNumber => "Please enter a valid phone number.",
        ProfileField::Weight => "Weight must be a positive number.",
        ProfileField::Height => "Height must be a positive number.",
        ProfileField::Address => "Please enter a valid address.",
        ProfileField::Name | ProfileField::ExternalId => "Invalid value.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn email_examples() {
        assert!(is_email_valid("jane@example.com"));
        assert!(is_email_valid("a.b+c@sub.example.co"));
        assert!(!is_email_valid("not-an-email"));
        assert!(!is_email_valid("jane@example"));
        assert!(!is_email_valid("jane doe@example.com"));
        assert!(!is_email_valid("jane@@example.com"));
        assert!(!is_email_valid(""));
    }

    #[test]
    fn phone_examples() {
        assert!(is_phone_valid("(555) 123-4567"));
        assert!(is_phone_valid("555-123-4567"));
        assert!(is_phone_valid("555.123.4567"));
        assert!(is_phone_valid("5551234567"));
        assert!(!is_phone_valid("12345"));
        assert!(!is_phone_valid("555-123-4567 x89"));
        assert!(!is_phone_valid("+1 555 123 4567"));
        assert!(!is_phone_valid(""));
    }

    #[test]
    fn positive_number_examples() {
        assert!(is_positive_number("12.5"));
        assert!(is_positive_number(" 70 "));
        assert!(!is_positive_number("0"));
        assert!(!is_positive_number("-5"));
        assert!(!is_positive_number("abc"));
        assert!(!is_positive_number(""));
        assert!(!is_positive_number("NaN"));
        assert!(!is_positive_number("inf"));
    }

    #[test]
    fn address_rules_differ_on_punctuation() {
        assert!(is_address_valid("123 Main St, Springfield"));
        assert!(!is_address_valid("  12  "));
        assert!(!is_address_valid("-----"));
        assert!(is_address_valid_with("-----", AddressRule::LengthOnly));
        assert!(!is_address_valid_with("abcd", AddressRule::LengthOnly));
    }

    #[test]
    fn validate_field_reports_message() {
        let err = validate_field(ProfileField::Email, "nope", AddressRule::default()).unwrap_err();
        assert_eq!(err.field, ProfileField::Email);
        assert_eq!(err.message, "Please enter a valid email address.");

        assert!(validate_field(ProfileField::Name, "", AddressRule::default()).is_ok());
    }

    proptest! {
        #[test]
        fn email_matches_reference_shape(local in "[a-z0-9._%+-]{1,12}", domain in "[a-z0-9-]{1,10}", tld in "[a-z]{2,6}") {
            let email = format!("{local}@{domain}.{tld}");
            prop_assert!(is_email_valid(&email));
        }

        #[test]
        fn email_with_whitespace_never_valid(a in "[a-z]{1,5}", b in "[a-z]{1,5}") {
            let email = format!("{a} {b}@example.com");
            prop_assert!(!is_email_valid(&email));
        }

        #[test]
        fn ten_digit_phone_always_valid(area in 0u32..1000, exchange in 0u32..1000, line in 0u32..10000) {
            let formatted = format!("({area:03}) {exchange:03}-{line:04}");
            prop_assert!(is_phone_valid(&formatted));
            let bare = format!("{area:03}{exchange:03}{line:04}");
            prop_assert!(is_phone_valid(&bare));
        }

        #[test]
        fn positive_number_agrees_with_sign(v in -1.0e6f64..1.0e6) {
            prop_assert_eq!(is_positive_number(&v.to_string()), v > 0.0);
        }
    }
}
