//! HTTP client and interceptor pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use clientdesk_auth::SessionContext;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::{ApiConfig, ApiError};

/// A step applied to every request and response.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Adjusts an outgoing request.
    async fn on_request(&self, request: RequestBuilder) -> RequestBuilder {
        request
    }

    /// Observes a response before it reaches the caller.
    async fn on_response(&self, _status: StatusCode, _url: &Url) {}

    /// Returns the name of this interceptor for logging.
    fn name(&self) -> &'static str;
}

/// Attaches the session's bearer token while the session is valid.
pub struct BearerInterceptor {
    session: Arc<SessionContext>,
}

impl BearerInterceptor {
    /// Creates the interceptor.
    pub fn new(session: Arc<SessionContext>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Interceptor for BearerInterceptor {
    async fn on_request(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.bearer_token().await {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn name(&self) -> &'static str {
        "bearer"
    }
}

/// Ends the session on any `401`, whichever endpoint produced it.
pub struct UnauthorizedInterceptor {
    session: Arc<SessionContext>,
}

impl UnauthorizedInterceptor {
    /// Creates the interceptor.
    pub fn new(session: Arc<SessionContext>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Interceptor for UnauthorizedInterceptor {
    async fn on_response(&self, status: StatusCode, url: &Url) {
        if status == StatusCode::UNAUTHORIZED {
            warn!(path = %url.path(), "Unauthorized response; ending session");
            self.session.logout().await;
        }
    }

    fn name(&self) -> &'static str {
        "unauthorized"
    }
}

/// REST client bound to a session.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionContext>,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl ApiClient {
    /// Creates a client with the bearer and unauthorized interceptors installed.
    pub fn new(config: &ApiConfig, session: Arc<SessionContext>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("clientdesk/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let interceptors: Vec<Arc<dyn Interceptor>> = vec![
            Arc::new(BearerInterceptor::new(session.clone())),
            Arc::new(UnauthorizedInterceptor::new(session.clone())),
        ];

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
            interceptors,
        })
    }

    /// Returns the session this client authenticates with.
    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    /// Returns the absolute URL for an API path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Returns a request builder for `method` on `path`, before interception.
    pub fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.url(path))
    }

    /// Runs `request` through the pipeline.
    ///
    /// Non-success statuses become errors after every interceptor has seen
    /// the response.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let mut request = request;
        for interceptor in &self.interceptors {
            request = interceptor.on_request(request).await;
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(status = status.as_u16(), path = %response.url().path(), "API response");

        for interceptor in &self.interceptors {
            interceptor.on_response(status, response.url()).await;
        }

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.ok().filter(|b| !b.trim().is_empty());
        if status == StatusCode::UNAUTHORIZED {
            Err(ApiError::Unauthorized { body })
        } else {
            Err(ApiError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }

    /// `GET` a JSON resource.
    #[instrument(skip(self))]
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(self.request(reqwest::Method::GET, path)).await?;
        decode(response)
            .await?
            .ok_or_else(|| ApiError::Decode("empty response body".into()))
    }

    /// `POST` a JSON body and decode the JSON reply.
    ///
    /// An empty success body (`201`/`204` without content) yields `None`.
    #[instrument(skip(self, body))]
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<Option<T>, ApiError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(reqwest::Method::POST, path).json(body);
        decode(self.send(request).await?).await
    }

    /// `PUT` a JSON body and decode the JSON reply, if there is one.
    #[instrument(skip(self, body))]
    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<Option<T>, ApiError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(reqwest::Method::PUT, path).json(body);
        decode(self.send(request).await?).await
    }

    /// `DELETE` a resource. Any success body is discarded.
    #[instrument(skip(self))]
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(self.request(reqwest::Method::DELETE, path))
            .await
            .map(drop)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field(
                "interceptors",
                &self.interceptors.iter().map(|i| i.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<Option<T>, ApiError> {
    let bytes = response.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| ApiError::Decode(e.to_string()))
}
