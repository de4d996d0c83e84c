//! Session context: validity, identity, login and logout.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use clientdesk_token::{decode, expires_at};
use tracing::{debug, info, warn};

use crate::guard::{self, GuardDecision, Route};
use crate::{AuthError, Clock, Credentials, CurrentUser, LoginGateway, LoginResponse, Navigator, Role, TokenStore};

/// Upper bound on redirects followed by a single navigation.
const MAX_REDIRECTS: usize = 4;

/// How the server-declared expiry combines with the token's `exp` claim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExpiryPolicy {
    /// Both must be in the future. A past server expiry short-circuits, a
    /// future one still defers to `exp`.
    #[default]
    Strictest,
    /// A stored server expiry settles the question; `exp` is consulted only
    /// when there is none.
    ServerAuthoritative,
}

impl ExpiryPolicy {
    /// Returns the configuration name of the policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpiryPolicy::Strictest => "strictest",
            ExpiryPolicy::ServerAuthoritative => "server-authoritative",
        }
    }
}

impl fmt::Display for ExpiryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpiryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strictest" => Ok(ExpiryPolicy::Strictest),
            "server-authoritative" => Ok(ExpiryPolicy::ServerAuthoritative),
            other => Err(format!(
                "unknown expiry policy '{other}' (expected 'strictest' or 'server-authoritative')"
            )),
        }
    }
}

/// Session settings.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Expiry precedence.
    pub policy: ExpiryPolicy,
}

/// Result of a login attempt. Login never fails any other way.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    /// A token was issued and stored.
    Success {
        /// The signed-in user, from the server or else from the new token.
        user: Option<CurrentUser>,
        /// The issued token.
        token: String,
        /// Server-declared expiry, if any.
        expires: Option<String>,
    },
    /// No session was established.
    Failure {
        /// Message for the login form.
        message: String,
    },
}

impl LoginOutcome {
    fn failure(message: impl Into<String>) -> Self {
        LoginOutcome::Failure {
            message: message.into(),
        }
    }

    /// Checks whether a session was established.
    pub fn is_success(&self) -> bool {
        matches!(self, LoginOutcome::Success { .. })
    }

    /// Returns the failure message, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            LoginOutcome::Failure { message } => Some(message),
            LoginOutcome::Success { .. } => None,
        }
    }
}

/// The client's session, shared by the views and the HTTP layer.
///
/// Built once at start-up. [`logout`](Self::logout) is its teardown: it
/// clears storage, bumps the [`epoch`](Self::epoch) and reloads the client
/// at `/login`.
pub struct SessionContext {
    store: TokenStore,
    navigator: Arc<dyn Navigator>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    epoch: AtomicU64,
}

impl SessionContext {
    /// Creates a session context.
    pub fn new(
        store: TokenStore,
        navigator: Arc<dyn Navigator>,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
    ) -> Self {
        Self {
            store,
            navigator,
            clock,
            config,
            epoch: AtomicU64::new(0),
        }
    }

    /// Returns the token store.
    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Returns the navigator.
    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    /// Returns the expiry policy in force.
    pub fn policy(&self) -> ExpiryPolicy {
        self.config.policy
    }

    /// Counts completed logouts.
    ///
    /// A caller that captured the epoch before an await can compare it
    /// afterwards to tell whether its session ended in between.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Checks whether a token is stored and still valid.
    pub async fn is_authenticated(&self) -> bool {
        match self.store.get().await {
            Some(token) => !self.is_expired(&token).await,
            None => false,
        }
    }

    /// Checks whether `token` has expired.
    ///
    /// A stored server expiry that has passed always wins. Otherwise the
    /// `exp` claim decides, except under
    /// [`ExpiryPolicy::ServerAuthoritative`] where a future server expiry
    /// is enough. A missing or undecodable `exp` counts as expired; an
    /// unparseable server expiry is ignored.
    pub async fn is_expired(&self, token: &str) -> bool {
        let now = self.clock.now();

        if let Some(server_expiry) = self.server_expiry().await {
            if now >= server_expiry {
                debug!("Token past server-declared expiry");
                return true;
            }
            if self.config.policy == ExpiryPolicy::ServerAuthoritative {
                return false;
            }
        }

        let Some(exp) = decode(token).as_ref().and_then(expires_at) else {
            debug!("Token carries no usable exp claim");
            return true;
        };

        exp < now.timestamp_millis() as f64 / 1000.0
    }

    /// Returns the token if the session is valid, for attaching to requests.
    pub async fn bearer_token(&self) -> Option<String> {
        let token = self.store.get().await?;
        if self.is_expired(&token).await {
            None
        } else {
            Some(token)
        }
    }

    /// Returns the signed-in user without touching storage.
    pub async fn peek_session(&self) -> Option<CurrentUser> {
        let token = self.bearer_token().await?;
        decode(&token).map(|claims| CurrentUser::from_claims(&claims))
    }

    /// Clears storage if the stored session is no longer valid.
    ///
    /// Returns `true` when an expired token was removed.
    pub async fn expire_session(&self) -> bool {
        match self.store.get().await {
            Some(token) if self.is_expired(&token).await => {
                info!("Session expired; clearing stored token");
                self.store.clear().await;
                true
            },
            Some(_) => false,
            None => {
                if self.store.expires().await.is_some() {
                    self.store.clear().await;
                }
                false
            },
        }
    }

    /// Returns the signed-in user, clearing an expired session on the way.
    pub async fn current_user(&self) -> Option<CurrentUser> {
        self.expire_session().await;
        self.peek_session().await
    }

    /// Checks whether the signed-in user holds `role`.
    pub async fn has_role(&self, role: &Role) -> bool {
        self.current_user()
            .await
            .is_some_and(|user| user.has_role(role))
    }

    /// Returns when the current session ends, if known.
    ///
    /// This is the earlier of the server expiry and the `exp` claim, or just
    /// the server expiry under [`ExpiryPolicy::ServerAuthoritative`].
    pub async fn expires_at(&self) -> Option<DateTime<Utc>> {
        let token = self.store.get().await?;
        let server = self.server_expiry().await;

        if server.is_some() && self.config.policy == ExpiryPolicy::ServerAuthoritative {
            return server;
        }

        let claim = decode(&token)
            .as_ref()
            .and_then(expires_at)
            .and_then(|exp| DateTime::from_timestamp_millis((exp * 1000.0) as i64));

        match (server, claim) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Signs in through `gateway`.
    ///
    /// The form is validated first; a rejected form makes no network call.
    /// Every failure comes back as [`LoginOutcome::Failure`].
    pub async fn login(
        &self,
        gateway: &dyn LoginGateway,
        username: &str,
        password: &str,
    ) -> LoginOutcome {
        let credentials = match Credentials::new(username, password) {
            Ok(credentials) => credentials,
            Err(e) => return LoginOutcome::failure(e.to_string()),
        };

        debug!(username = %credentials.username(), "Sending login request");

        let response = match gateway.exchange(&credentials).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Login request failed");
                return LoginOutcome::failure(e.user_message());
            },
        };

        let LoginResponse {
            token,
            expires,
            user,
        } = response;

        let Some(token) = token.filter(|t| !t.is_empty()) else {
            warn!("Login response carried no token");
            return LoginOutcome::failure("No token received");
        };

        if let Err(e) = self.store.replace(&token, expires.as_deref()).await {
            warn!(error = %e, "Failed to persist session");
            return LoginOutcome::failure(format!("Login failed: {e}"));
        }

        let user = match user {
            Some(user) => Some(CurrentUser::from(user)),
            None => self.current_user().await,
        };

        info!(
            username = ?user.as_ref().and_then(|u| u.username.as_deref()),
            role = ?user.as_ref().and_then(|u| u.role.as_ref()).map(Role::as_str),
            "Login successful"
        );

        LoginOutcome::Success {
            user,
            token,
            expires,
        }
    }

    /// Ends the session and reloads the client at `/login`.
    pub async fn logout(&self) {
        self.store.clear().await;
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        info!(epoch, "Session ended");
        self.navigator.hard_redirect(Route::Login.path());
    }

    /// Returns where to go after a successful login.
    ///
    /// An `admin` or `customer` role from the server response is used as is;
    /// anything else falls back to the role in the stored token.
    pub async fn landing_route(&self, outcome: &LoginOutcome) -> Route {
        let server_role = match outcome {
            LoginOutcome::Success {
                user: Some(user), ..
            } => user.role.clone(),
            _ => None,
        };

        let role = match server_role {
            Some(role @ (Role::Admin | Role::Customer)) => Some(role),
            _ => self.current_user().await.and_then(|user| user.role),
        };

        guard::home_for(role.as_ref())
    }

    /// Opens `path`, following guard redirects, and returns the view shown.
    pub async fn navigate(&self, path: &str) -> Result<Route, AuthError> {
        let mut route = Route::parse(path);
        let mut visited = HashSet::new();

        for _ in 0..=MAX_REDIRECTS {
            let authenticated = self.is_authenticated().await;
            let user = self.current_user().await;

            match guard::resolve(&route, authenticated, user.as_ref()) {
                GuardDecision::Render => {
                    self.navigator.replace(route.path());
                    return Ok(route);
                },
                GuardDecision::Redirect(next) => {
                    debug!(from = %route, to = %next, "Route guard redirect");
                    visited.insert(route);
                    if visited.contains(&next) {
                        break;
                    }
                    route = next;
                },
            }
        }

        warn!(path, "Route resolution did not settle");
        Err(AuthError::RedirectLoop(path.to_string()))
    }

    async fn server_expiry(&self) -> Option<DateTime<Utc>> {
        let raw = self.store.expires().await?;
        let parsed = parse_expiry(&raw);
        if parsed.is_none() {
            warn!(value = %raw, "Ignoring unparseable tokenExpires");
        }
        parsed
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("policy", &self.config.policy)
            .field("epoch", &self.epoch())
            .finish_non_exhaustive()
    }
}

/// Parses an ISO-8601 expiry. Timestamps without an offset are taken as UTC.
fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
