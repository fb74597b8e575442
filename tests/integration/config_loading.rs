use serde_json::json;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use writecare_agents::config::ConfigLoader;
use writecare_agents::processor::{ProcessorCatalog, UnconfiguredAdapter};
use writecare_agents::{AgentError, AgentInvocation, AgentQueue};

use super::support::{echo_after, Calls};

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("writecare.toml");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn configured_agents_override_builtin_definitions() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[queue]
tick_interval_ms = 250
batch_size = 3

[agents.voice-to-note]
agent_type = "voice_to_note"
name = "Voice Notes (night shift)"
timeout_ms = 120000
retry_attempts = 1

[agents.smart-roster]
agent_type = "smart_roster"
enabled = false
"#,
    );

    let config = ConfigLoader::load_from_file(&path).unwrap();
    assert_eq!(config.queue.batch_size, 3);

    let catalog = ProcessorCatalog::with_builtins(std::sync::Arc::new(UnconfiguredAdapter));
    let queue = AgentQueue::from_config(&config, catalog).unwrap();
    assert_eq!(queue.config().tick_interval_ms, 250);

    let registry = queue.registry();
    assert_eq!(registry.len(), 3);
    let voice = registry.get("voice-to-note").unwrap();
    assert_eq!(voice.name, "Voice Notes (night shift)");
    assert_eq!(voice.timeout_ms, 120_000);
    assert_eq!(voice.retry_attempts, 1);
    assert!(!registry.get("smart-roster").unwrap().enabled);
    assert!(registry.get("risk-flag").unwrap().enabled);
}

#[test]
fn invalid_config_is_rejected_before_registration() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[queue]\nbatch_size = 0\n");

    let config = ConfigLoader::load_from_file(&path).unwrap();
    let catalog = ProcessorCatalog::with_builtins(std::sync::Arc::new(UnconfiguredAdapter));
    let err = AgentQueue::from_config(&config, catalog).err().unwrap();
    assert!(matches!(err, AgentError::ConfigError(ref msg) if msg.contains("batch_size")));
}

#[test]
fn unknown_agent_type_in_config_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[agents.scribe]\nagent_type = \"dictation\"\n");

    let config = ConfigLoader::load_from_file(&path).unwrap();
    let catalog = ProcessorCatalog::with_builtins(std::sync::Arc::new(UnconfiguredAdapter));
    let err = AgentQueue::from_config(&config, catalog).err().unwrap();
    assert_eq!(err, AgentError::UnknownAgentType("dictation".to_string()));
}

#[test]
fn missing_explicit_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    assert!(ConfigLoader::load(Some(&dir.path().join("nope.toml"))).is_err());
}

#[tokio::test(start_paused = true)]
async fn custom_agent_from_config_is_invocable() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[queue]
tick_interval_ms = 10

[agents.echo]
agent_type = "echo"
timeout_ms = 100
retry_attempts = 0
capabilities = ["testing"]
"#,
    );
    let config = ConfigLoader::load_from_file(&path).unwrap();

    let calls = Calls::default();
    let catalog = ProcessorCatalog::with_builtins(std::sync::Arc::new(UnconfiguredAdapter))
        .with("echo", echo_after(Duration::from_millis(10), calls.clone()));
    let queue = AgentQueue::from_config(&config, catalog).unwrap();
    queue.start().unwrap();

    let response = queue.invoke(AgentInvocation::new("echo", json!({"n": 1}))).await;
    assert!(response.success);
    assert_eq!(response.result, Some(json!({"n": 1})));
    assert_eq!(queue.registry().list_by_capability("testing").len(), 1);

    queue.stop().await;
}
