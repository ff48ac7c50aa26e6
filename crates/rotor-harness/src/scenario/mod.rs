//! Scenario testing framework for deterministic session tests.
//!
//! This module provides a declarative API for writing scenario-based tests
//! that follow the Oracle Pattern. Scenarios run a session against a scripted
//! server in virtual time, execute every action, and enforce oracle
//! verification.

mod builder;
pub mod oracle;
mod world;

pub use builder::{RunnableScenario, Scenario};
pub use oracle::OracleFn;
pub use world::World;
