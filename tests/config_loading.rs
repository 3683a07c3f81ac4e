use std::io::Write;

use dialoq_core::config::AppConfig;

#[test]
fn test_load_full_config_from_file() {
    let toml_content = r#"
[model]
provider = "openai"
model_id = "gpt-4o-mini"
api_key = "sk-test-key"
max_tokens = 512
temperature = 0.3
timeout_secs = 30

[[fallback_models]]
provider = "anthropic"
model_id = "claude-sonnet-4-20250514"
api_key = "sk-ant-test"

[dialogue]
max_turns = 12
history_window = 4
output_dir = "/tmp/dialoq-test-output"

[roles]
assistant_role = "You are a hotel booking assistant."
user_role = "You are a traveler booking a room."
task = "Book a hotel room for the user"

[evaluation]
enabled = false
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.model.provider, "openai");
    assert_eq!(config.model.model_id, "gpt-4o-mini");
    assert_eq!(config.model.api_key, Some("sk-test-key".to_string()));
    assert_eq!(config.model.max_tokens, 512);
    assert_eq!(config.model.timeout_secs, 30);

    assert_eq!(config.fallback_models.len(), 1);
    assert_eq!(config.fallback_models[0].provider, "anthropic");

    assert_eq!(config.dialogue.max_turns, 12);
    assert_eq!(config.dialogue.history_window, 4);
    assert_eq!(config.dialogue.output_dir, "/tmp/dialoq-test-output");

    assert_eq!(config.roles.task, "Book a hotel room for the user");
    assert!(!config.evaluation.enabled);
}

#[test]
fn test_env_var_expansion_in_config() {
    std::env::set_var("DIALOQ_TEST_API_KEY", "expanded-key-value");

    let toml_content = r#"
[model]
model_id = "gpt-4o-mini"
api_key = "${DIALOQ_TEST_API_KEY}"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");
    assert_eq!(config.model.api_key, Some("expanded-key-value".to_string()));

    std::env::remove_var("DIALOQ_TEST_API_KEY");
}

#[test]
fn test_missing_config_file_reports_path() {
    let err = AppConfig::load(std::path::Path::new("/nonexistent/dialoq.toml")).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("/nonexistent/dialoq.toml"), "got: {}", msg);
}
