//! Declarative form validation.
//!
//! Every record form (shipper, consignee, notify party, container, user) runs
//! its input through a [`Validator`] before anything is written. The validator
//! collects at most one message per field, mirroring what a form shows next to
//! each input.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("email pattern is valid")
});

/// Field name → human-readable message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Record a message for `field` unless one is already present.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }
}

impl core::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// Accumulates rule failures for one form submission.
#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value must contain at least one non-whitespace character.
    pub fn required(&mut self, field: &str, value: &str, message: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.errors.add(field, message);
        }
        self
    }

    /// Value must be at least `min` characters long (counted in chars).
    pub fn min_len(&mut self, field: &str, value: &str, min: usize, message: &str) -> &mut Self {
        if value.chars().count() < min {
            self.errors.add(field, message);
        }
        self
    }

    /// Value must be a well-formed email address.
    pub fn email(&mut self, field: &str, value: &str, message: &str) -> &mut Self {
        if !EMAIL.is_match(value.trim()) {
            self.errors.add(field, message);
        }
        self
    }

    /// Value may be absent or empty; otherwise it must be a well-formed email.
    pub fn optional_email(&mut self, field: &str, value: Option<&str>, message: &str) -> &mut Self {
        match value.map(str::trim) {
            None | Some("") => self,
            Some(v) => self.email(field, v, message),
        }
    }

    /// Value must be present and one of `allowed`.
    pub fn one_of(
        &mut self,
        field: &str,
        value: Option<&str>,
        allowed: &[&str],
        message: &str,
    ) -> &mut Self {
        match value {
            Some(v) if allowed.contains(&v) => {}
            _ => self.errors.add(field, message),
        }
        self
    }

    pub fn finish(&mut self) -> Result<(), FieldErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }
}

/// Trim an optional text input; empty strings become `None`.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
