//! Form descriptors and submitted-input validation.
//!
//! Rendering produces structured field descriptors only; the surrounding UI
//! owns markup and layout. Parsing validates submitted values against fixed
//! patterns and fails on the first invalid field, before any side effect.

use crate::errors::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Input widget requested for a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Secret,
}

/// One field of a provider form.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FormField {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    /// Free-form hint shown next to the input, if any.
    pub hint: Option<&'static str>,
}

impl FormField {
    #[must_use]
    pub const fn new(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            hint: None,
        }
    }

    #[must_use]
    pub const fn with_hint(mut self, hint: &'static str) -> Self {
        self.hint = Some(hint);
        self
    }
}

/// Submitted form values, keyed by field name.
#[derive(Debug, Clone, Default)]
pub struct FormInput {
    values: HashMap<String, String>,
}

impl FormInput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormInput {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn valid_email(email: &str) -> bool {
    Regex::new(r"^\S+@\S+$").is_ok_and(|re| re.is_match(email))
}

fn valid_phone(phone: &str) -> bool {
    Regex::new(r"^[0-9\- ]+$").is_ok_and(|re| re.is_match(phone))
}

fn valid_country_code(code: &str) -> bool {
    Regex::new(r"^[0-9]{1,3}$").is_ok_and(|re| re.is_match(code))
}

/// Validate a submitted API key: anything non-empty after trimming.
///
/// # Errors
/// Returns `Error::InvalidField` if the key is missing or blank.
pub fn parse_api_key(input: &FormInput) -> Result<String> {
    let key = input.get("api_key").unwrap_or_default().trim();
    if key.is_empty() {
        return Err(Error::InvalidField {
            field: "api_key",
            reason: "must not be empty".to_string(),
        });
    }
    Ok(key.to_string())
}

/// Validate a submitted email address against `local@domain`.
///
/// # Errors
/// Returns `Error::InvalidField` if the address does not match.
pub fn parse_email(input: &FormInput) -> Result<String> {
    let email = input.get("email").unwrap_or_default().trim();
    if !valid_email(email) {
        return Err(Error::InvalidField {
            field: "email",
            reason: "must look like local@domain".to_string(),
        });
    }
    Ok(email.to_string())
}

/// Validate a submitted country code: 1-3 digits, optional leading `+`.
///
/// The leading `+` is stripped; the stored value is digits only.
///
/// # Errors
/// Returns `Error::InvalidField` if the code is not 1-3 digits.
pub fn parse_country_code(input: &FormInput) -> Result<String> {
    let raw = input.get("country_code").unwrap_or_default().trim();
    let code = raw.strip_prefix('+').unwrap_or(raw);
    if !valid_country_code(code) {
        return Err(Error::InvalidField {
            field: "country_code",
            reason: "must be 1-3 digits".to_string(),
        });
    }
    Ok(code.to_string())
}

/// Validate a submitted phone number: digits, dashes and spaces only.
///
/// # Errors
/// Returns `Error::InvalidField` if the number contains anything else.
pub fn parse_phone(input: &FormInput) -> Result<String> {
    let phone = input.get("phone").unwrap_or_default().trim();
    if !valid_phone(phone) {
        return Err(Error::InvalidField {
            field: "phone",
            reason: "must contain only digits, dashes and spaces".to_string(),
        });
    }
    Ok(phone.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(pairs: &[(&str, &str)]) -> FormInput {
        pairs.iter().copied().collect()
    }

    #[test]
    fn api_key_trims_and_rejects_blank() {
        assert_eq!(
            parse_api_key(&input(&[("api_key", "  abc123  ")])).ok(),
            Some("abc123".to_string())
        );
        assert!(parse_api_key(&input(&[("api_key", "   ")])).is_err());
        assert!(parse_api_key(&input(&[])).is_err());
    }

    #[test]
    fn email_accepts_local_at_domain() {
        assert!(parse_email(&input(&[("email", "alice@example.com")])).is_ok());
        assert!(parse_email(&input(&[("email", "not-an-email")])).is_err());
        assert!(parse_email(&input(&[("email", "two words@domain")])).is_err());
    }

    #[test]
    fn country_code_strips_leading_plus() {
        assert_eq!(
            parse_country_code(&input(&[("country_code", "+44")])).ok(),
            Some("44".to_string())
        );
        assert_eq!(
            parse_country_code(&input(&[("country_code", "1")])).ok(),
            Some("1".to_string())
        );
        assert!(parse_country_code(&input(&[("country_code", "abcd")])).is_err());
        assert!(parse_country_code(&input(&[("country_code", "1234")])).is_err());
        assert!(parse_country_code(&input(&[("country_code", "++44")])).is_err());
    }

    #[test]
    fn phone_allows_digits_dashes_spaces() {
        assert!(parse_phone(&input(&[("phone", "555-123 456")])).is_ok());
        assert!(parse_phone(&input(&[("phone", "abc")])).is_err());
        assert!(parse_phone(&input(&[("phone", "")])).is_err());
    }

    #[test]
    fn form_field_builder() {
        let field = FormField::new("email", "Email address", FieldKind::Text)
            .with_hint("used for account recovery");
        assert_eq!(field.name, "email");
        assert_eq!(field.hint, Some("used for account recovery"));
    }
}
