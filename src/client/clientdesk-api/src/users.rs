//! User management: `/api/users`.

use serde::{Deserialize, Serialize};

use crate::{ApiClient, ApiError, ResourceId};

const USERS_PATH: &str = "/api/users";

/// Role given to users created without one.
pub const DEFAULT_ROLE_NAME: &str = "customer";

/// A user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Identifier.
    pub id: ResourceId,
    /// Login name.
    pub username: String,
    /// Role name (`admin` or `customer`).
    #[serde(default)]
    pub role_name: Option<String>,
}

/// Body for creating a user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    /// Login name.
    pub username: String,
    /// Initial password.
    pub password: String,
    /// Role name.
    pub role_name: String,
}

impl NewUser {
    /// Creates a user form with the default role.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            role_name: DEFAULT_ROLE_NAME.to_string(),
        }
    }

    /// Sets the role name.
    pub fn with_role(mut self, role_name: impl Into<String>) -> Self {
        self.role_name = role_name.into();
        self
    }

    fn validate(&self) -> Result<(), ApiError> {
        if self.username.is_empty() || self.password.is_empty() {
            return Err(ApiError::Invalid("username and password are required".into()));
        }
        Ok(())
    }
}

/// Body for updating a user. Only the fields that are set are sent.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    /// New login name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// New password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// New role name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
}

impl UserUpdate {
    /// Drops empty strings so they are not sent as changes.
    fn normalized(&self) -> Self {
        let keep = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
        Self {
            username: keep(&self.username),
            password: keep(&self.password),
            role_name: keep(&self.role_name),
        }
    }

    fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none() && self.role_name.is_none()
    }
}

/// Client for `/api/users`.
#[derive(Debug, Clone)]
pub struct UsersApi {
    client: ApiClient,
}

impl UsersApi {
    /// Creates the service.
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Lists all users.
    pub async fn list(&self) -> Result<Vec<User>, ApiError> {
        self.client.get_json(USERS_PATH).await
    }

    /// Creates a user. Returns the stored record when the server echoes it.
    pub async fn create(&self, user: &NewUser) -> Result<Option<User>, ApiError> {
        user.validate()?;
        self.client.post_json(USERS_PATH, user).await
    }

    /// Updates a user. Returns the stored record when the server echoes it.
    pub async fn update(
        &self,
        id: &ResourceId,
        update: &UserUpdate,
    ) -> Result<Option<User>, ApiError> {
        let update = update.normalized();
        if update.is_empty() {
            return Err(ApiError::Invalid("nothing to update".into()));
        }
        self.client
            .put_json(&format!("{USERS_PATH}/{id}"), &update)
            .await
    }

    /// Deletes a user.
    pub async fn delete(&self, id: &ResourceId) -> Result<(), ApiError> {
        self.client.delete(&format!("{USERS_PATH}/{id}")).await
    }
}
