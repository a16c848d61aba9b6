//! Middleware Module
//!
//! Two kinds of middleware live here:
//!
//! - **`rpc`** - endpoint wrappers for the WebSocket RPC surface
//!   (require-user, require-admin, authenticate, deauthenticate, rate-limit)
//! - **`http`** - axum `from_fn` middleware for the plain HTTP routes
//!   (CORS, admin token check)

pub mod http;
pub mod rpc;

pub use http::{access_control, require_admin_http, AdminUser};
pub use rpc::{authenticate, deauthenticate, rate_limit, require_admin, require_user};
