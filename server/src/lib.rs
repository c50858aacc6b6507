//! # Room Relay Server Library
//!
//! This library provides the relay server for the multiplayer platformer. The
//! relay is not authoritative: it does not simulate anything. It groups
//! connections into named rooms and forwards each client's reported state to
//! the other members of its room.
//!
//! ## Core Responsibilities
//!
//! ### Session Management
//! Every accepted WebSocket connection becomes a session with a fresh,
//! server-generated user id. Sessions end when the transport reports a close
//! or error, or when an optional idle timeout expires.
//!
//! ### Room Membership
//! Rooms are created on the first `join_room` naming them. A user belongs to
//! at most one room at a time; joining another room leaves the previous one.
//! Empty rooms are evicted unless configured otherwise.
//!
//! ### Message Relay
//! Position updates are shallow-merged into the stored player entry and
//! rebroadcast to the room. Game actions and custom room events are
//! rebroadcast untouched with the sender's identity attached.
//!
//! ## Architecture Design
//!
//! ### Single-Consumer Event Loop
//! All relay state lives in one [`relay::Relay`] value owned by a single task.
//! Connection tasks never touch it directly; they send connect, message and
//! disconnect events over a channel and the loop handles each one to
//! completion. No locks are needed around the user, room or connection maps.
//!
//! ### Best-Effort Delivery
//! Each connection has an unbounded outbox drained by its own writer task. A
//! slow peer only delays its own writer. A send to a closed outbox drops that
//! connection handle and never affects the other recipients.
//!
//! ## Module Organization
//!
//! ### Config Module (`config`)
//! Relay switches parsed from the command line.
//!
//! ### Room Module (`room`)
//! The per-room player table and snapshot building.
//!
//! ### Relay Module (`relay`)
//! The synchronous state machine: accept, dispatch, broadcast, disconnect.
//!
//! ### Network Module (`network`)
//! WebSocket transport, per-connection tasks and the event loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::RelayConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind("127.0.0.1:3000", RelayConfig::default()).await?;
//!
//!     // Accepts connections and relays room traffic until the process exits
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod network;
pub mod relay;
pub mod room;
