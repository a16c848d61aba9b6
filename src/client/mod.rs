//! Client Module
//!
//! Programmatic access to the engine over the same WebSocket protocol the
//! apps speak. Requests are matched to responses by `ack`; pushes can be
//! observed through [`Client::subscribe_pushes`].
//!
//! # Example
//!
//! ```rust,no_run
//! use deck_engine::client::Client;
//! use deck_engine::shared::ClientConfig;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), deck_engine::client::ClientError> {
//! let config = ClientConfig::new("ws://localhost:9000/api/").with_timeout(Duration::from_secs(5));
//! let client = Client::connect(config).await?;
//! let mut pushes = client.subscribe_pushes();
//! let pong: String = client.call("ping?", &()).await?;
//! assert_eq!(pong, "Pong!");
//! if let Some(push) = pushes.recv().await {
//!     println!("push {}", push.rpc);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod transport;

pub use error::ClientError;
pub use transport::{decode_generic_response, Client};
