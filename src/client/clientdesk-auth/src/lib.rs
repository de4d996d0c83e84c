//! # ClientDesk Auth
//!
//! Client-side session handling for ClientDesk.
//!
//! ## Components
//!
//! - [`TokenStore`]: the persisted `token` / `tokenExpires` record
//! - [`SessionContext`]: validity checks, current user, login and logout
//! - [`guard`]: role-gated route resolution
//! - [`LoginGateway`]: the seam to the remote login endpoint
//!
//! Decoded roles only steer navigation. The API server still authorizes
//! every request on its own.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod navigator;
pub mod session;
pub mod store;

pub use clientdesk_token::{CurrentUser, Role};
pub use clock::{Clock, FixedClock, SystemClock};
pub use credentials::Credentials;
pub use error::AuthError;
pub use gateway::{GatewayError, LoginGateway, LoginResponse, ServerUser};
pub use guard::{GuardDecision, Route};
pub use navigator::{MemoryNavigator, Navigation, Navigator};
pub use session::{ExpiryPolicy, LoginOutcome, SessionConfig, SessionContext};
pub use store::TokenStore;
