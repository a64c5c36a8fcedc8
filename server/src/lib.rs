//! # Authority Server Library
//!
//! The authoritative node of a session. It owns every participant's
//! kinematic state and the roster; remote nodes only submit intents and
//! observe the results.
//!
//! ## Module Organization
//!
//! ### Client Manager (`client_manager`)
//! Connection ids, address lookup, liveness and capacity. Knows nothing about
//! participants or the roster.
//!
//! ### Lifecycle (`lifecycle`)
//! Connect/disconnect notifications fanned out to scoped subscriptions.
//!
//! ### Roster Service (`roster_service`)
//! One per session, constructed by the server and fed by the lifecycle hub.
//! Produces the revisioned changes observers replicate.
//!
//! ### Game (`game`)
//! The authoritative [`game::World`]: the single place intents are applied,
//! whether they came from the host's own participant or over the network,
//! and the per-tick integration step (gravity, motion, penetration).
//!
//! ### Host (`host`)
//! Optional participant run by the server process itself. Its intents take
//! the local route into the world.
//!
//! ### Network (`network`)
//! UDP transport and the event loop. Internal tasks:
//! - **Network Receiver**: continuously listens for incoming packets
//! - **Network Sender**: processes the outgoing packet queue and broadcasts
//! - **Timeout Checker**: removes silent clients
//! - **Main Loop**: applies intents on receipt, steps the world on the physics
//!   tick, broadcasts world state and periodic roster snapshots
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new("127.0.0.1:8080", ServerConfig::default()).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod game;
pub mod host;
pub mod lifecycle;
pub mod network;
pub mod roster_service;
