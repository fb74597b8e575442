//! Tooling & Integration Layer
//!
//! Operator command-line interface: inspect the agents a process would register and the
//! configuration it would run with. Never invokes agents.

pub mod cli;

pub use cli::{Cli, CliContext, Commands};
