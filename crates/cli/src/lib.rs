//! CLI for running and querying Chord ring members.
//!
//! Provides commands for:
//! - Running a node that joins or founds a ring
//! - Resolving identifiers to their owning node
//! - Inspecting a node's routing state
//! - Reading and writing keys

pub mod commands;
pub mod config;

pub use commands::CommandResult;
pub use config::{CliConfig, Command};
