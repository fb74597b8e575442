//! CLI Tooling
//!
//! `writecare-agents` command-line interface. Commands load configuration the same way a
//! running service does and report on it; none of them dispatch invocations.

use crate::agent::{default_definitions, AgentDefinition, AgentRegistry};
use crate::config::{AppConfig, ConfigLoader};
use crate::error::AgentError;
use crate::events::EventBus;
use crate::logging::LoggingConfig;
use crate::processor::{ProcessorCatalog, UnconfiguredAdapter};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// WriteCare Agents - priority invocation queue for care assistant agents
#[derive(Parser)]
#[command(name = "writecare-agents")]
#[command(about = "Inspect WriteCareNotes agent registrations and queue configuration")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (layered over the global config file)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Logging config with command-line overrides applied on top of `base`
    pub fn logging_config(&self, base: &LoggingConfig) -> LoggingConfig {
        let mut config = base.clone();
        if self.verbose {
            config.level = "debug".to_string();
        }
        if let Some(ref level) = self.log_level {
            config.level = level.clone();
        }
        if let Some(ref format) = self.log_format {
            config.format = format.clone();
        }
        if let Some(ref output) = self.log_output {
            config.output = output.clone();
        }
        if let Some(ref file) = self.log_file {
            config.file = Some(file.clone());
        }
        config
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect agents
    Agents {
        #[command(subcommand)]
        command: AgentCommands,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum AgentCommands {
    /// List built-in and configured agents in dispatch-priority order
    List {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
        /// Only agents declaring this capability
        #[arg(long)]
        capability: Option<String>,
        /// Hide disabled agents
        #[arg(long)]
        enabled_only: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show {
        /// Output format (toml or json)
        #[arg(long, default_value = "toml")]
        format: String,
    },
    /// Check the configuration and every agent registration
    Validate,
}

/// Loaded configuration plus the command executor
pub struct CliContext {
    config: AppConfig,
}

impl CliContext {
    pub fn new(config_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let config = ConfigLoader::load(config_path.as_deref()).with_context(|| match config_path {
            Some(ref path) => format!("Failed to load configuration from {}", path.display()),
            None => "Failed to load configuration".to_string(),
        })?;
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Registry with built-in definitions overlaid by configured agents
    fn build_registry(&self) -> Result<AgentRegistry, AgentError> {
        let catalog = ProcessorCatalog::with_builtins(Arc::new(UnconfiguredAdapter));
        let events = Arc::new(EventBus::new(self.config.queue.event_capacity));
        let registry = AgentRegistry::new(catalog, events);
        registry.register_all(default_definitions())?;
        registry.load_from_config(&self.config.agents)?;
        Ok(registry)
    }

    pub fn execute(&self, command: &Commands) -> anyhow::Result<String> {
        debug!("Executing command");
        match command {
            Commands::Agents {
                command:
                    AgentCommands::List {
                        format,
                        capability,
                        enabled_only,
                    },
            } => self.handle_agents_list(format, capability.as_deref(), *enabled_only),
            Commands::Config {
                command: ConfigCommands::Show { format },
            } => self.handle_config_show(format),
            Commands::Config {
                command: ConfigCommands::Validate,
            } => self.handle_config_validate(),
        }
    }

    fn handle_agents_list(
        &self,
        format: &str,
        capability: Option<&str>,
        enabled_only: bool,
    ) -> anyhow::Result<String> {
        let registry = self.build_registry().context("Failed to register agents")?;
        let mut agents = match capability {
            Some(capability) => registry.list_by_capability(capability),
            None => registry.list(),
        };
        if enabled_only {
            agents.retain(|a| a.enabled);
        }

        match format {
            "json" => Ok(serde_json::to_string_pretty(&agents)?),
            "text" => Ok(format_agents_table(&agents)),
            other => bail!("Invalid format: {} (must be 'text' or 'json')", other),
        }
    }

    fn handle_config_show(&self, format: &str) -> anyhow::Result<String> {
        match format {
            "toml" => Ok(self.config.to_toml()?),
            "json" => Ok(serde_json::to_string_pretty(&self.config)?),
            other => bail!("Invalid format: {} (must be 'toml' or 'json')", other),
        }
    }

    fn handle_config_validate(&self) -> anyhow::Result<String> {
        self.config.validate()?;
        let registry = self.build_registry()?;
        Ok(format!(
            "Configuration is valid: {} agents ({} from config)",
            registry.len(),
            self.config.agents.len()
        ))
    }
}

fn format_agents_table(agents: &[AgentDefinition]) -> String {
    if agents.is_empty() {
        return "No agents registered.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        "ID",
        "Name",
        "Type",
        "Priority",
        "Enabled",
        "Timeout (ms)",
        "Retries",
        "Capabilities",
        "Depends On",
    ]);
    for agent in agents {
        let capabilities: Vec<&str> = agent.capabilities.iter().map(String::as_str).collect();
        let dependencies = if agent.dependencies.is_empty() {
            "-".to_string()
        } else {
            agent.dependencies.join(", ")
        };
        table.add_row(vec![
            agent.id.clone(),
            agent.name.clone(),
            agent.agent_type.clone(),
            agent.priority.to_string(),
            if agent.enabled { "yes" } else { "no" }.to_string(),
            agent.timeout_ms.to_string(),
            agent.retry_attempts.to_string(),
            capabilities.join(", "),
            dependencies,
        ]);
    }
    table.to_string()
}
