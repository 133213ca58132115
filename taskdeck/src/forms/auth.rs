//! Sign-in and sign-up forms.
//!
//! Only the client-side checks live here. Registration and credential
//! verification belong to the auth service; its rejection text goes into
//! the `General` slot via `set_general_error`.

use std::sync::LazyLock;

use regex::Regex;

use super::FieldErrors;

#[allow(clippy::unwrap_used)]
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").unwrap());

/// Minimum password length for new accounts.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Characters that satisfy the special-character rule.
pub const PASSWORD_SPECIALS: &str = "@$!%*?&";

fn check_email(email: &str) -> Option<&'static str> {
    if email.trim().is_empty() {
        Some("Email is required")
    } else if !EMAIL_PATTERN.is_match(email) {
        Some("Email is invalid")
    } else {
        None
    }
}

fn check_new_password(password: &str) -> Option<&'static str> {
    if password.is_empty() {
        return Some("Password is required");
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Some("Password must be at least 8 characters");
    }
    let lower = password.chars().any(|c| c.is_ascii_lowercase());
    let upper = password.chars().any(|c| c.is_ascii_uppercase());
    let digit = password.chars().any(|c| c.is_ascii_digit());
    let special = password.chars().any(|c| PASSWORD_SPECIALS.contains(c));
    if !(lower && upper && digit && special) {
        return Some("Password must contain uppercase, lowercase, number, and special character");
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignInField {
    Email,
    Password,
    /// Errors not tied to one field, such as rejected credentials.
    General,
}

/// Email and password for an existing account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignInForm {
    email: String,
    password: String,
    errors: FieldErrors<SignInField>,
}

impl SignInForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.email = email.into();
        self.errors.clear(SignInField::Email);
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = password.into();
        self.errors.clear(SignInField::Password);
    }

    /// Records a failure reported by the auth service.
    pub fn set_general_error(&mut self, message: impl Into<String>) {
        self.errors.set(SignInField::General, message);
    }

    #[must_use]
    pub fn error(&self, field: SignInField) -> Option<&str> {
        self.errors.get(field)
    }

    #[must_use]
    pub const fn errors(&self) -> &FieldErrors<SignInField> {
        &self.errors
    }

    /// Validates every field, replacing the error map. Returns `true` if valid.
    pub fn validate(&mut self) -> bool {
        self.errors = FieldErrors::new();
        if let Some(message) = check_email(&self.email) {
            self.errors.set(SignInField::Email, message);
        }
        if self.password.is_empty() {
            self.errors.set(SignInField::Password, "Password is required");
        }
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignUpField {
    Name,
    Email,
    Password,
    ConfirmPassword,
    /// Errors not tied to one field, such as an email already registered.
    General,
}

/// Registration form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignUpForm {
    name: String,
    email: String,
    password: String,
    confirm_password: String,
    errors: FieldErrors<SignUpField>,
}

impl SignUpForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.errors.clear(SignUpField::Name);
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.email = email.into();
        self.errors.clear(SignUpField::Email);
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = password.into();
        self.errors.clear(SignUpField::Password);
    }

    pub fn set_confirm_password(&mut self, confirm: impl Into<String>) {
        self.confirm_password = confirm.into();
        self.errors.clear(SignUpField::ConfirmPassword);
    }

    /// Records a failure reported by the auth service.
    pub fn set_general_error(&mut self, message: impl Into<String>) {
        self.errors.set(SignUpField::General, message);
    }

    #[must_use]
    pub fn error(&self, field: SignUpField) -> Option<&str> {
        self.errors.get(field)
    }

    #[must_use]
    pub const fn errors(&self) -> &FieldErrors<SignUpField> {
        &self.errors
    }

    /// Validates every field, replacing the error map. Returns `true` if valid.
    pub fn validate(&mut self) -> bool {
        self.errors = FieldErrors::new();
        if self.name.trim().is_empty() {
            self.errors.set(SignUpField::Name, "Name is required");
        }
        if let Some(message) = check_email(&self.email) {
            self.errors.set(SignUpField::Email, message);
        }
        if let Some(message) = check_new_password(&self.password) {
            self.errors.set(SignUpField::Password, message);
        }
        if self.password != self.confirm_password {
            self.errors
                .set(SignUpField::ConfirmPassword, "Passwords do not match");
        }
        self.errors.is_empty()
    }
}
