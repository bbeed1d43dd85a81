use std::io::Write;

use agentgraph_core::config::{AppConfig, StepModeSetting};
use agentgraph_core::AgentGraphError;
use agentgraph_runtime::{Breakpoint, EventKind, StepMode};

#[test]
fn test_load_full_config_from_file() {
    let toml_content = r#"
[import]
fail_on_issues = true

[export]
hide_secrets = true
skip_links = true

[runtime]
step_mode = "breakpoints"
breakpoints = ["input_request", "event:error", "agent:critic", "writer:message"]
control_buffer = 4

[log]
filter = "agentgraph=debug"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert!(config.import.fail_on_issues);
    assert!(config.export.hide_secrets);
    assert!(config.export.skip_links);
    assert_eq!(config.runtime.step_mode, StepModeSetting::Breakpoints);
    assert_eq!(config.runtime.control_buffer, 4);
    assert_eq!(config.log.filter, "agentgraph=debug");

    let mode = StepMode::from_config(&config.runtime).expect("valid breakpoints");
    assert_eq!(
        mode,
        StepMode::breakpoints([
            Breakpoint::from(EventKind::InputRequest),
            Breakpoint::from(EventKind::Error),
            Breakpoint::Agent {
                name: "critic".into()
            },
            Breakpoint::AgentEvent {
                name: "writer".into(),
                kind: EventKind::Message
            },
        ])
    );
}

#[test]
fn test_env_var_expansion_in_config() {
    std::env::set_var("AGENTGRAPH_TEST_LOG_FILTER", "agentgraph=trace");

    let toml_content = r#"
[log]
filter = "${AGENTGRAPH_TEST_LOG_FILTER}"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");
    assert_eq!(config.log.filter, "agentgraph=trace");

    std::env::remove_var("AGENTGRAPH_TEST_LOG_FILTER");
}

#[test]
fn test_minimal_config_uses_defaults() {
    let toml_content = r#"
[export]
skip_links = true
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert!(config.export.skip_links);
    assert!(!config.export.hide_secrets);
    assert!(!config.import.fail_on_issues);
    assert_eq!(config.runtime.step_mode, StepModeSetting::Run);
    assert!(config.runtime.breakpoints.is_empty());
    assert_eq!(config.runtime.control_buffer, 16);
    assert_eq!(config.log.filter, "agentgraph=info,warn");
}

#[test]
fn test_missing_file_is_an_error_but_default_fallback_is_not() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("agentgraph.toml");

    assert!(matches!(
        AppConfig::load(&path),
        Err(AgentGraphError::ConfigNotFound(_))
    ));
    assert_eq!(
        AppConfig::load_or_default(&path).expect("defaults"),
        AppConfig::default()
    );
}

#[test]
fn test_unreadable_config_is_an_io_error() {
    let dir = tempfile::tempdir().expect("create temp dir");

    assert!(matches!(
        AppConfig::load(dir.path()),
        Err(AgentGraphError::Io(_))
    ));
    // The path exists, so there is no silent fallback either.
    assert!(AppConfig::load_or_default(dir.path()).is_err());
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(b"[runtime]\nstep_mode = \"sometimes\"\n")
        .expect("write toml");

    assert!(matches!(
        AppConfig::load(tmp.path()),
        Err(AgentGraphError::Config(_))
    ));
}

#[test]
fn test_unknown_breakpoint_kind_is_rejected() {
    let toml_content = r#"
[runtime]
step_mode = "breakpoints"
breakpoints = ["message", "heartbeat"]
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");
    assert!(StepMode::from_config(&config.runtime).is_err());
}

#[test]
fn test_config_round_trips_through_toml() {
    let mut config = AppConfig::default();
    config.export.hide_secrets = true;
    config.runtime.step_mode = StepModeSetting::Step;

    let text = config.to_toml().expect("serialize");
    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(text.as_bytes()).expect("write toml");

    assert_eq!(AppConfig::load(tmp.path()).expect("load config"), config);
}
