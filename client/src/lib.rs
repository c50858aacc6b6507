//! # Platformer Client Library
//!
//! This library provides the client side of the multiplayer platformer. Each
//! client simulates its own avatar locally against a built-in level and
//! streams its position to a room relay, which forwards it to the other
//! players in the room.
//!
//! ## Architecture Overview
//!
//! ### Local Simulation
//! The avatar is simulated entirely on the client using the shared physics:
//! gravity, collision side detection, bouncy surfaces, zones, powerups and
//! markers. Each frame applies the current input, steps the world with the
//! frame's timestamp and turns marker events into room events.
//!
//! ### Remote Players
//! Peers are never simulated. Their last reported position and velocity are
//! stored as-is and overwritten by every `player_update`, with no
//! interpolation and no reconciliation. Echoes of our own updates are
//! recognised by user id or client id and ignored.
//!
//! ### Single Event Loop
//! Network frames, input commands, simulation frames and the update timer are
//! multiplexed on one task with `tokio::select!`, so game state is only ever
//! touched from one place.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! Client game state: the local world and avatar, identity assigned by the
//! relay, remote player table, outgoing message construction.
//!
//! ### Input Module (`input`)
//! Line-based input commands and the held-direction tracking applied to the
//! avatar every frame.
//!
//! ### Level Module (`level`)
//! The default level layout and spawn point.
//!
//! ### Network Module (`network`)
//! WebSocket connection to the relay and the client event loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::{Client, ClientConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::new(ClientConfig {
//!         server_url: "ws://127.0.0.1:3000".to_string(),
//!         room_id: "lobby".to_string(),
//!         client_id: "player-one".to_string(),
//!         update_interval: Duration::from_millis(50),
//!         frame_interval: Duration::from_millis(16),
//!     });
//!
//!     client.run().await?;
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod input;
pub mod level;
pub mod network;
