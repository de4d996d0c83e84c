//! # ClientDesk API
//!
//! Typed client for the ClientDesk REST API.
//!
//! ## Endpoints
//!
//! - `POST /api/auth/login` - token exchange ([`AuthApi`])
//! - `/api/users[/:id]` - user management ([`UsersApi`])
//! - `/api/customers[/:id]` - customer management ([`CustomersApi`])
//!
//! Every request runs through the [`ApiClient`] interceptor pipeline, which
//! attaches the session's bearer token and ends the session on `401`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod client;
pub mod config;
pub mod customers;
pub mod error;
pub mod types;
pub mod users;

pub use auth::AuthApi;
pub use client::{ApiClient, BearerInterceptor, Interceptor, UnauthorizedInterceptor};
pub use config::ApiConfig;
pub use customers::{Customer, CustomerForm, CustomersApi};
pub use error::ApiError;
pub use types::ResourceId;
pub use users::{NewUser, User, UserUpdate, UsersApi};
