//! Client-side form checks, run before anything is sent to the backend

use thiserror::Error;

/// Shortest password the sign-up and settings forms accept.
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("All fields are required")]
    MissingFields,

    #[error("All password fields are required")]
    MissingPasswordFields,

    #[error("{0} is required")]
    Required(&'static str),

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("New passwords do not match")]
    NewPasswordMismatch,

    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),

    #[error("New password must be at least {0} characters")]
    NewPasswordTooShort(usize),

    #[error("Nothing to update")]
    EmptyPatch,
}

/// Sign-up form input
#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignUpForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.username.is_empty() || self.email.is_empty() || self.password.is_empty() {
            return Err(ValidationError::MissingFields);
        }
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort(MIN_PASSWORD_LEN));
        }
        Ok(())
    }
}

/// Sign-in form input
#[derive(Debug, Clone, Default)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

impl SignInForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.email.is_empty() || self.password.is_empty() {
            return Err(ValidationError::MissingFields);
        }
        Ok(())
    }
}

/// Settings: profile section
#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub username: String,
}

impl ProfileForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("Username", &self.username)
    }
}

/// Settings: password section
#[derive(Debug, Clone, Default)]
pub struct PasswordChangeForm {
    /// Collected by the form but not checked against the server.
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl PasswordChangeForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.current_password.is_empty()
            || self.new_password.is_empty()
            || self.confirm_password.is_empty()
        {
            return Err(ValidationError::MissingPasswordFields);
        }
        if self.new_password != self.confirm_password {
            return Err(ValidationError::NewPasswordMismatch);
        }
        if self.new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::NewPasswordTooShort(MIN_PASSWORD_LEN));
        }
        Ok(())
    }
}

/// Fails with `Required(field)` when `value` is empty.
pub fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        Err(ValidationError::Required(field))
    } else {
        Ok(())
    }
}
