//! Field-scoped form validation.
//!
//! Each form holds raw field values as typed and a [`FieldErrors`] map
//! filled by `validate`. Setting a field clears that field's error only;
//! the other errors stay until the next validation.

pub mod auth;
pub mod task;

pub use auth::{SignInField, SignInForm, SignUpField, SignUpForm};
pub use task::TaskForm;

use std::collections::BTreeMap;

/// Validation messages keyed by field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldErrors<F: Ord> {
    errors: BTreeMap<F, String>,
}

impl<F: Ord> Default for FieldErrors<F> {
    fn default() -> Self {
        Self {
            errors: BTreeMap::new(),
        }
    }
}

impl<F: Ord + Copy> FieldErrors<F> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `message` for `field`, replacing any earlier one.
    pub fn set(&mut self, field: F, message: impl Into<String>) {
        self.errors.insert(field, message.into());
    }

    /// Drops the error for `field`.
    pub fn clear(&mut self, field: F) {
        self.errors.remove(&field);
    }

    /// The error for `field`, if any.
    #[must_use]
    pub fn get(&self, field: F) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Errors in field order.
    pub fn iter(&self) -> impl Iterator<Item = (F, &str)> {
        self.errors.iter().map(|(f, m)| (*f, m.as_str()))
    }
}
