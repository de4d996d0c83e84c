//! Remote login exchange.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::{Credentials, CurrentUser, Role};

/// Message shown when the server gave nothing better.
pub const DEFAULT_LOGIN_FAILURE: &str = "Login failed";

/// Body of a login response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginResponse {
    /// Bearer token; absent or empty means the login did not succeed.
    #[serde(default)]
    pub token: Option<String>,
    /// Server-declared absolute expiry (ISO-8601).
    #[serde(default)]
    pub expires: Option<String>,
    /// User profile returned alongside the token.
    #[serde(default)]
    pub user: Option<ServerUser>,
}

/// User profile as returned by the login endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServerUser {
    /// Identifier (string or number).
    #[serde(default)]
    pub id: Option<Value>,
    /// Login name.
    #[serde(default)]
    pub username: Option<String>,
    /// Role (short form).
    #[serde(default)]
    pub role: Option<String>,
    /// Role as named by the user management API.
    #[serde(default, rename = "roleName")]
    pub role_name: Option<String>,
}

impl ServerUser {
    /// Returns the role, preferring `roleName` over `role`.
    pub fn role(&self) -> Option<Role> {
        self.role_name
            .as_deref()
            .or(self.role.as_deref())
            .filter(|r| !r.is_empty())
            .map(Role::from)
    }
}

impl From<ServerUser> for CurrentUser {
    fn from(user: ServerUser) -> Self {
        let role = user.role();
        let id = match user.id {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        CurrentUser {
            id,
            username: user.username,
            role,
        }
    }
}

/// Errors from the login exchange.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The server answered with a non-success status.
    #[error("login rejected with status {status}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Raw response body, if any.
        body: Option<String>,
    },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),
}

impl GatewayError {
    /// Returns the message to show on the login form.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Rejected {
                body: Some(body), ..
            } => error_message(body).unwrap_or_else(|| DEFAULT_LOGIN_FAILURE.to_string()),
            _ => DEFAULT_LOGIN_FAILURE.to_string(),
        }
    }
}

/// Extracts a human-readable message from an error response body.
///
/// Prefers a JSON `message` field, then the body text itself.
pub fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("message") {
            Some(Value::String(msg)) if !msg.is_empty() => Some(msg.clone()),
            _ => Some(body.to_string()),
        },
        Ok(Value::String(msg)) if !msg.is_empty() => Some(msg),
        _ => Some(body.to_string()),
    }
}

/// Exchanges credentials for a session token.
#[async_trait]
pub trait LoginGateway: Send + Sync {
    /// Performs one login request.
    async fn exchange(&self, credentials: &Credentials) -> Result<LoginResponse, GatewayError>;
}
