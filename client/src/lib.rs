//! # Participant Client Library
//!
//! A headless participant node. It is never the authority for anything: its
//! own participant's intents go to the server over UDP, and everything it
//! knows about the world (positions, orientation, the roster) is mirrored
//! from what the server broadcasts.
//!
//! ## Prediction
//!
//! Look and loadout are predicted locally by the participant's controller so
//! they respond within the frame. Movement is not predicted: the desired
//! velocity is computed from the last observed position and the predicted
//! facing, then submitted. There is no reconciliation of either.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! Observed world state and the roster replica.
//!
//! ### Input Module (`input`)
//! Bot input samplers standing in for device polling.
//!
//! ### Network Module (`network`)
//! UDP intent channel, connection handling and the frame/physics loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::input::{make_bot, BotKind};
//! use client::network::{Client, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bot = make_bot(BotKind::Strafe, None);
//!     let mut client = Client::new("127.0.0.1:8080", bot, ClientConfig::default()).await?;
//!     client.run().await?;
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod input;
pub mod network;
