//! Route Configuration Module
//!
//! HTTP routes of the engine.
//!
//! - **`router`** - router assembly and middleware layering
//! - **`socket_routes`** - WebSocket upgrade and liveness handlers
//!
//! # Module Structure
//!
//! ```text
//! routes/
//! ├── mod.rs            - Module exports and documentation
//! ├── router.rs         - Main router creation
//! └── socket_routes.rs  - Upgrade and ping handlers
//! ```

pub mod router;
pub mod socket_routes;

pub use router::create_router;
