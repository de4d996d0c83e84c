//! # ClientDesk Token
//!
//! Client-side view of a compact signed session token.
//!
//! Only the payload segment is read. The signature is never checked here:
//! the decoded claims drive display and routing, while the API server stays
//! the authority on every request.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod claims;
pub mod codec;

pub use claims::{CurrentUser, Role};
pub use codec::{decode, expires_at, Claims};
