//! Network Module
//!
//! TCP server, connection handling and a blocking client.
//!
//! ## Architecture
//! - Single acceptor thread
//! - One thread per connection
//! - Commands routed through the Engine's worker queue

mod client;
mod connection;
mod server;

pub use client::Client;
pub use connection::Connection;
pub use server::{Server, ShutdownHandle};
