//! Push Module
//!
//! Server-to-client messages that no request asked for.
//!
//! - **`pusher`** - builds push envelopes and writes them to local writers
//! - **`fanout`** - relays pushes to and from other processes over a bus
//! - **`bus`** - the `PubSub` trait and its local and Redis implementations

pub mod bus;
pub mod fanout;
pub mod pusher;

pub use bus::{open_bus, LocalBus, PubSub, RedisBus, UserMessage, PUSH_ALL, PUSH_USER};
pub use fanout::FanOut;
pub use pusher::Pusher;
