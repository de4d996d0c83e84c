//! Login form validation.

use crate::AuthError;

const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=50;
const PASSWORD_LEN: std::ops::RangeInclusive<usize> = 6..=255;

/// A username and password that passed client-side validation.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Validates login form input.
    ///
    /// Lengths are counted in characters. The checks run in the order the
    /// login form reports them.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self, AuthError> {
        let username = username.into();
        let password = password.into();

        if username.is_empty() || password.is_empty() {
            return Err(AuthError::Validation("Please fill in all fields".into()));
        }

        if !USERNAME_LEN.contains(&username.chars().count()) {
            return Err(AuthError::Validation(
                "Username must be between 3 and 50 characters".into(),
            ));
        }

        if !PASSWORD_LEN.contains(&password.chars().count()) {
            return Err(AuthError::Validation(
                "Password must be between 6 and 255 characters".into(),
            ));
        }

        Ok(Self { username, password })
    }

    /// Returns the username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the password.
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}
