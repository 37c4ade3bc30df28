use super::*;
use secrecy::ExposeSecret;
use std::collections::HashMap;

#[test]
fn test_defaults_match_local_first_setup() {
    let settings = Settings::default();
    assert_eq!(settings.server.app_name, "Euclid's Window");
    assert_eq!(settings.local_ai.llm_model, "qwen2.5-math:7b");
    assert!(settings.local_ai.enabled);
    assert!(!settings.local_ai.fast_mode_enabled);
    assert_eq!(settings.local_ai.llm_timeout(), Duration::from_secs(120));
    assert!(settings.media.diffusion_url.is_none());
}

#[test]
fn test_partial_toml_keeps_other_defaults() {
    let settings = Settings::from_toml_str(
        r#"
        [local_ai]
        llm_model = "llama3.2:3b"
        fast_mode_enabled = true

        [media]
        music_timeout_seconds = 30
        "#,
    )
    .unwrap();

    assert_eq!(settings.local_ai.llm_model, "llama3.2:3b");
    assert!(settings.local_ai.fast_mode_enabled);
    assert!(settings.local_ai.multi_agent_enabled);
    assert_eq!(settings.media.music_timeout_seconds, 30);
    assert_eq!(settings.media.diffusion_timeout_seconds, 60);
    assert_eq!(settings.server.bind, "127.0.0.1:8000");
}

#[test]
fn test_env_overrides_win_over_file() {
    let mut settings = Settings::from_toml_str("[llm]\nopenai_model = \"gpt-4o\"\n").unwrap();
    let env: HashMap<&str, &str> = HashMap::from([
        ("OPENAI_MODEL", "gpt-4.1-mini"),
        ("OPENAI_API_KEY", "sk-test"),
        ("LOCAL_AI_ENABLED", "off"),
        ("EUCLID_DATA_DIR", "/srv/euclid/data"),
    ]);
    settings.apply_env(|k| env.get(k).map(|v| v.to_string()));

    assert_eq!(settings.llm.openai_model, "gpt-4.1-mini");
    assert_eq!(settings.llm.openai_api_key.as_ref().map(|k| k.expose_secret()), Some("sk-test"));
    assert!(!settings.local_ai.enabled);
    assert_eq!(settings.paths.settings_file(), PathBuf::from("/srv/euclid/data/app_settings.json"));
}

#[test]
fn test_blank_api_key_is_ignored() {
    let mut settings = Settings::default();
    settings.apply_env(|k| (k == "OPENAI_API_KEY").then(|| "   ".to_string()));
    assert!(settings.llm.openai_api_key.is_none());
}

#[test]
fn test_api_key_is_not_serialized() {
    let mut settings = Settings::default();
    settings.llm.openai_api_key = Some("sk-secret".into());
    let rendered = toml::to_string(&settings).unwrap();
    assert!(!rendered.contains("sk-secret"));
}

#[test]
fn test_api_key_is_redacted_in_debug() {
    let settings: Settings = toml::from_str("[llm]\nopenai_api_key = \"sk-from-file\"\n").unwrap();
    assert_eq!(settings.llm.openai_api_key.as_ref().map(|k| k.expose_secret()), Some("sk-from-file"));
    let debug = format!("{settings:?}");
    assert!(!debug.contains("sk-from-file"));
    assert!(debug.contains("REDACTED"));
}

#[test]
fn test_auth_section_and_overrides() {
    let mut settings: Settings = toml::from_str("[auth]\ntoken_ttl_hours = 2\n").unwrap();
    assert!(settings.auth.token_secret.is_none());
    assert_eq!(settings.auth.token_ttl(), Duration::from_secs(7200));

    let env: HashMap<&str, &str> =
        HashMap::from([("EUCLID_AUTH_SECRET", "hunter2-but-longer"), ("EUCLID_TOKEN_TTL_HOURS", "not-a-number")]);
    settings.apply_env(|k| env.get(k).map(|v| v.to_string()));
    assert_eq!(settings.auth.token_secret.as_ref().map(|s| s.expose_secret()), Some("hunter2-but-longer"));
    assert_eq!(settings.auth.token_ttl_hours, 2);
    assert!(!toml::to_string(&settings).unwrap().contains("hunter2"));
}

#[test]
fn test_parse_bool_variants() {
    assert_eq!(parse_bool("YES"), Some(true));
    assert_eq!(parse_bool("0"), Some(false));
    assert_eq!(parse_bool("maybe"), None);
}
