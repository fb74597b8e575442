//! Integration tests for the agent invocation queue

mod builtin_agents;
mod cli_contracts;
mod config_loading;
mod events_lifecycle;
mod support;
