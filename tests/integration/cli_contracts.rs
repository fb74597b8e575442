use std::fs;
use tempfile::TempDir;
use writecare_agents::tooling::cli::{AgentCommands, CliContext, Commands, ConfigCommands};

#[test]
fn agents_list_json_contract_has_required_fields() {
    let cli = CliContext::from_config(Default::default());
    let output = cli
        .execute(&Commands::Agents {
            command: AgentCommands::List {
                format: "json".to_string(),
                capability: None,
                enabled_only: false,
            },
        })
        .unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    let agents = parsed.as_array().unwrap();
    assert_eq!(agents.len(), 3);
    for agent in agents {
        assert!(agent.get("id").and_then(|v| v.as_str()).is_some());
        assert!(agent.get("agent_type").and_then(|v| v.as_str()).is_some());
        assert!(agent.get("enabled").and_then(|v| v.as_bool()).is_some());
        assert!(agent.get("priority").and_then(|v| v.as_u64()).is_some());
        assert!(agent.get("timeout_ms").and_then(|v| v.as_u64()).is_some());
        assert!(agent.get("retry_attempts").and_then(|v| v.as_u64()).is_some());
        assert!(agent.get("capabilities").and_then(|v| v.as_array()).is_some());
    }
}

#[test]
fn config_show_reflects_explicit_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[queue]\nbatch_size = 7\n\n[logging]\nlevel = \"warn\"\n").unwrap();

    let cli = CliContext::new(Some(path)).unwrap();
    let output = cli
        .execute(&Commands::Config {
            command: ConfigCommands::Show {
                format: "json".to_string(),
            },
        })
        .unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed["queue"]["batch_size"], 7);
    assert_eq!(parsed["queue"]["tick_interval_ms"], 1000);
    assert_eq!(parsed["logging"]["level"], "warn");
}

#[test]
fn config_show_toml_is_loadable() {
    let cli = CliContext::from_config(Default::default());
    let output = cli
        .execute(&Commands::Config {
            command: ConfigCommands::Show {
                format: "toml".to_string(),
            },
        })
        .unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shown.toml");
    fs::write(&path, output).unwrap();
    let reloaded = CliContext::new(Some(path)).unwrap();
    assert_eq!(reloaded.config().queue.batch_size, 5);
}

#[test]
fn config_validate_rejects_bad_log_format() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[logging]\nformat = \"xml\"\n").unwrap();

    let cli = CliContext::new(Some(path)).unwrap();
    let err = cli
        .execute(&Commands::Config {
            command: ConfigCommands::Validate,
        })
        .unwrap_err();
    assert!(err.to_string().contains("Invalid log format"));
}
