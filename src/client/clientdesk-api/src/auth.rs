//! Login endpoint.

use async_trait::async_trait;
use clientdesk_auth::{Credentials, GatewayError, LoginGateway, LoginResponse};
use serde::Serialize;

use crate::{ApiClient, ApiError};

const LOGIN_PATH: &str = "/api/auth/login";

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Login gateway over `POST /api/auth/login`.
///
/// The request goes through the same pipeline as every other call, so a
/// `401` here also ends any session still on record.
#[derive(Debug, Clone)]
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    /// Creates the gateway.
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LoginGateway for AuthApi {
    async fn exchange(&self, credentials: &Credentials) -> Result<LoginResponse, GatewayError> {
        let request = LoginRequest {
            username: credentials.username(),
            password: credentials.password(),
        };

        self.client
            .post_json::<_, LoginResponse>(LOGIN_PATH, &request)
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| match e {
                ApiError::Unauthorized { body } => GatewayError::Rejected { status: 401, body },
                ApiError::Status { status, body } => GatewayError::Rejected { status, body },
                other => GatewayError::Transport(other.to_string()),
            })
    }
}
