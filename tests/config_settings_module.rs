use cascade_builder::config::{
    load_settings, resolve_runner_binaries, ConfigError, Settings, ENV_PROVIDER_BIN_OPENAI,
};
use cascade_builder::provider::ProviderKind;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn missing_keys_take_defaults() {
    let settings = Settings::from_yaml("model: opus\n", Path::new("cascade.yaml")).expect("yaml");
    assert_eq!(settings.model, "opus");
    assert_eq!(settings.provider_kind().expect("provider"), ProviderKind::Anthropic);
    assert_eq!(settings.step_timeout(), Duration::from_secs(900));
    assert_eq!(settings.max_total_steps, 500);
    assert_eq!(
        Settings::from_yaml("   \n", Path::new("cascade.yaml")).expect("empty"),
        Settings::default()
    );
}

#[test]
fn relative_paths_resolve_against_the_settings_file() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("cascade.yaml");
    fs::write(
        &path,
        "save_folder: runs\nschema_path: schema/custom.schema\nprompts_dir: /abs/prompts\n",
    )
    .expect("write");

    let settings = load_settings(Some(&path)).expect("settings");
    assert_eq!(settings.save_folder, dir.path().join("runs"));
    assert_eq!(
        settings.schema_path.as_deref(),
        Some(dir.path().join("schema/custom.schema").as_path())
    );
    assert_eq!(settings.prompts_dir.as_deref(), Some(Path::new("/abs/prompts")));
}

#[test]
fn invalid_values_are_rejected() {
    let dir = tempdir().expect("tempdir");
    for (body, needle) in [
        ("provider: gemini\n", "provider"),
        ("model: \"  \"\n", "model"),
        ("step_timeout_seconds: 0\n", "step_timeout_seconds"),
        ("max_total_steps: 0\n", "max_total_steps"),
        ("binaries:\n  openai: \"\"\n", "binaries.openai"),
    ] {
        let path = dir.path().join("cascade.yaml");
        fs::write(&path, body).expect("write");
        let err = load_settings(Some(&path)).expect_err(body);
        assert!(matches!(err, ConfigError::Settings(_)), "{body}");
        assert!(err.to_string().contains(needle), "{body}: {err}");
    }

    let path = dir.path().join("broken.yaml");
    fs::write(&path, "save_folder: [unclosed\n").expect("write");
    assert!(matches!(
        load_settings(Some(&path)).expect_err("yaml"),
        ConfigError::Parse { .. }
    ));
    assert!(matches!(
        load_settings(Some(&dir.path().join("absent.yaml"))).expect_err("missing"),
        ConfigError::Read { .. }
    ));
}

#[test]
fn schema_text_is_read_from_the_configured_path() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("tiny.schema"), "struct A {\n    x: u8,\n}\n").expect("schema");
    let path = dir.path().join("cascade.yaml");
    fs::write(&path, "schema_path: tiny.schema\n").expect("write");

    let settings = load_settings(Some(&path)).expect("settings");
    let text = settings.load_schema_text().expect("schema text");
    assert!(text.is_some_and(|text| text.contains("struct A")));
    assert_eq!(Settings::default().load_schema_text().expect("none"), None);
}

#[test]
fn runner_binaries_prefer_env_then_settings_then_defaults() {
    let settings = Settings::from_yaml(
        "binaries:\n  anthropic: /opt/claude\n  openai: /opt/codex\n",
        Path::new("cascade.yaml"),
    )
    .expect("yaml");

    let from_settings = resolve_runner_binaries(&settings, |_| None);
    assert_eq!(from_settings.anthropic, "/opt/claude");
    assert_eq!(from_settings.openai, "/opt/codex");

    let from_env = resolve_runner_binaries(&settings, |key| {
        (key == ENV_PROVIDER_BIN_OPENAI).then(|| "/env/codex".to_string())
    });
    assert_eq!(from_env.anthropic, "/opt/claude");
    assert_eq!(from_env.openai, "/env/codex");

    let defaults = resolve_runner_binaries(&Settings::default(), |_| None);
    assert_eq!(defaults.anthropic, "claude");
    assert_eq!(defaults.openai, "codex");
}
