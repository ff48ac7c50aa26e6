//! Deterministic simulation harness for rotor session testing.
//!
//! This crate provides Turmoil-based implementations of the `Environment`
//! and `Transport` traits, a scripted DDP peer, and a scenario framework,
//! enabling deterministic, reproducible testing of the session under
//! reordered replies, staggered timers and network faults.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod scenario;
pub mod server;
pub mod sim_env;
pub mod sim_transport;

pub use server::{ScriptedServer, ServerScript};
pub use sim_env::SimEnv;
pub use sim_transport::{SimConnection, SimListener, SimTransport};
