//! Rotor client runtime
//!
//! Executes the actions returned by the `rotor-core` state machines on a
//! tokio runtime, with real clocks and a WebSocket transport, and draws the
//! result in a terminal.
//!
//! - [`SessionDriver`]: runs one DDP session until credentials are published
//!   and the connection is closed
//! - [`RefreshDriver`]: runs the countdown and regeneration cadences
//! - [`SystemEnv`] / [`WsTransport`]: production environment and transport
//! - [`TerminalDisplay`], [`TerminalRenderer`], [`SvgRenderer`]: presentation
//! - [`Args`]: command line configuration for the `rotor` binary

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod display;
pub mod driver;
pub mod refresh;
pub mod renderer;
pub mod system_env;
pub mod ws_transport;

pub use config::Args;
pub use display::{CodeDisplay, TerminalDisplay};
pub use driver::SessionDriver;
pub use refresh::RefreshDriver;
pub use renderer::{RenderError, SvgRenderer, TerminalRenderer};
pub use system_env::SystemEnv;
pub use ws_transport::{WsConnection, WsTransport};
