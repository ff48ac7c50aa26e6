//! Rotor core logic
//!
//! This crate contains the pure logic behind rotor: deriving rotating
//! one-time codes from a time window, and the client session that fetches the
//! seed material for those codes over DDP. It is completely decoupled from
//! I/O, enabling deterministic testing.
//!
//! # Architecture: "The Hollow Shell"
//!
//! Protocol logic is strictly separated from transport and clock concerns:
//!
//! ```text
//!      ┌──────────────────────────────┐
//!      │ rotor-core                   │
//!      │ - Session state machine      │
//!      │ - Code derivation            │
//!      │ - Refresh scheduling         │
//!      └──────────────────────────────┘
//!         ↓                        ↓
//! ┌─────────────────┐   ┌──────────────────┐
//! │ rotor-harness   │   │ rotor-client     │
//! │ (Turmoil)       │   │ (Tokio)          │
//! │ - Virtual time  │   │ - WebSocket      │
//! │ - Scripted peer │   │ - System clock   │
//! └─────────────────┘   └──────────────────┘
//! ```
//!
//! # Key Principles
//!
//! - No I/O in Core: never call `tokio::spawn`, `SystemTime::now()` or open
//!   sockets here
//! - Action Pattern: state machines return actions (send, set timer, publish)
//!   and a driver executes them
//! - Deterministic: given the same inputs, produce the same outputs
//!
//! # Modules
//!
//! - [`token`]: digest derivation and code assembly
//! - [`window`]: wall-clock to refresh-window mapping
//! - [`generator`]: code generator bound to one set of credentials
//! - [`extract`]: locating identity and secret inside a user document
//! - [`session`]: DDP session state machine
//! - [`scheduler`]: countdown and regeneration cadences
//! - [`report`] / [`render`]: contracts for display and image collaborators
//! - [`env`] / [`transport`]: environment and transport abstractions
//! - [`error`]: error taxonomy

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;
pub mod error;
pub mod extract;
pub mod generator;
pub mod render;
pub mod report;
pub mod scheduler;
pub mod session;
pub mod token;
pub mod transport;
pub mod window;

pub use extract::{Credentials, Identity, Secret};
pub use generator::{CodeGenerator, GeneratedCode, GeneratorConfig};
pub use session::{ProtocolSession, SessionAction, SessionConfig, SessionState};
pub use window::{RefreshInterval, TimeWindow, WindowMode};
