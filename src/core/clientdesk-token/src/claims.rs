//! Projection of decoded claims onto the signed-in user.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Claims;

/// Claim aliases for the subject identifier, in priority order.
const ID_CLAIMS: [&str; 3] = ["nameid", "sub", "id"];

/// Claim aliases for the username, in priority order.
const USERNAME_CLAIMS: [&str; 2] = ["unique_name", "username"];

/// Short role claim.
const ROLE_CLAIM: &str = "role";

/// Namespaced role claim emitted by older identity servers.
pub const LEGACY_ROLE_CLAIM: &str = "http://schemas.microsoft.com/ws/2008/06/identity/claims/role";

/// Role carried by a session.
///
/// The decoder passes any role string through; only `admin` and `customer`
/// have routes of their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// Administrator: manages users and customers.
    Admin,
    /// Customer: sees their own profile.
    Customer,
    /// Any other role string.
    Other(String),
}

impl Role {
    /// Returns the wire form of the role.
    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::Customer => "customer",
            Role::Other(s) => s,
        }
    }

    /// Checks if this is the administrator role.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        match s.as_str() {
            "admin" => Role::Admin,
            "customer" => Role::Customer,
            _ => Role::Other(s),
        }
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        Role::from(s.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The user a session belongs to, as claimed by its token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Subject identifier (`nameid`, `sub` or `id`).
    pub id: Option<String>,
    /// Login name (`unique_name` or `username`).
    pub username: Option<String>,
    /// Session role.
    pub role: Option<Role>,
}

impl CurrentUser {
    /// Projects decoded claims onto a user.
    ///
    /// For each field the first alias holding a non-empty value wins.
    pub fn from_claims(claims: &Claims) -> Self {
        let id = first_scalar(claims, &ID_CLAIMS);
        let username = first_scalar(claims, &USERNAME_CLAIMS);
        let role = match claims.get(ROLE_CLAIM) {
            // A sequence settles the role even when it is empty.
            Some(Value::Array(items)) => items.first().and_then(scalar),
            short => role_claim(short).or_else(|| role_claim(claims.get(LEGACY_ROLE_CLAIM))),
        }
        .map(Role::from);

        Self { id, username, role }
    }

    /// Checks whether the user holds `role`.
    pub fn has_role(&self, role: &Role) -> bool {
        self.role.as_ref() == Some(role)
    }

    /// Checks whether the user is an administrator.
    pub fn is_admin(&self) -> bool {
        self.role.as_ref().is_some_and(Role::is_admin)
    }
}

fn first_scalar(claims: &Claims, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| claims.get(*key).and_then(scalar))
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn role_claim(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Array(items) => items.first().and_then(scalar),
        other => scalar(other),
    }
}
