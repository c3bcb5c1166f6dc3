//! linecast daemon - session registry and broadcast relay
//!
//! This crate provides the server side of the relay:
//! - `admission` - bounded slot pool gating concurrent connections
//! - `registry` - session registry actor, the single owner of session state
//! - `broadcast` - the single consumer that fans chat lines out to sessions
//! - `server` - TCP accept loop, handshake, per-session read and write loops
//! - `config` - server configuration (defaults, TOML file, environment)
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  slot   ┌───────────────────┐  Register/Remove  ┌───────────────┐
//! │ Accept Loop  │────────▶│ SessionTask       │──────────────────▶│ RegistryActor │
//! │ (TcpListener)│         │ handshake + read  │                   │ (session map) │
//! └──────────────┘         └─────────┬─────────┘                   └───────▲───┬───┘
//!                                    │ OutboundMessage                FanOut │   │ try_send
//!                                    ▼                                       │   ▼
//!                          ┌───────────────────┐                   ┌─────────┴─────────┐
//!                          │ Broadcaster       │──────────────────▶│ SessionWriter ×N  │
//!                          │ (mpsc consumer)   │                   │ (bounded queues)  │
//!                          └───────────────────┘                   └───────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod admission;
pub mod broadcast;
pub mod config;
pub mod registry;
pub mod server;
