use pdflate::app_config::{Config, DualLayout, LogLevel, OutputMode};

#[test]
fn test_from_file_withValidJson_shouldLoadAndApplyDefaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(
        &path,
        r#"{
            "source_language": "en",
            "target_language": "fr",
            "output_mode": "both",
            "dual_layout": "side_by_side",
            "translation": {
                "endpoint": "https://api.example.com",
                "api_key": "sk-test",
                "model": "gpt-4o"
            }
        }"#,
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.source_language, "en");
    assert_eq!(config.target_language, "fr");
    assert_eq!(config.output_mode, OutputMode::Both);
    assert_eq!(config.dual_layout, DualLayout::SideBySide);
    assert_eq!(config.translation.model, "gpt-4o");
    // Unspecified fields fall back to defaults
    assert_eq!(config.worker_count, 4);
    assert_eq!(config.translation.retry_count, 3);
    assert!(config.cache.enabled);
    assert_eq!(config.log_level, LogLevel::Info);
}

#[test]
fn test_from_file_withInvalidJson_shouldFail() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(&path, "{ not valid json").unwrap();
    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_from_file_withInvalidLanguage_shouldFailValidation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(
        &path,
        r#"{ "source_language": "notalang", "target_language": "fr" }"#,
    )
    .unwrap();
    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_from_file_withMissingFile_shouldFail() {
    assert!(Config::from_file("/nonexistent/conf.json").is_err());
}

#[test]
fn test_create_default_config_shouldWriteLoadableFile() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conf.json");

    let created = Config::create_default_config(&path).unwrap();
    assert!(path.exists());

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded.source_language, created.source_language);
    assert_eq!(loaded.target_language, created.target_language);
    assert_eq!(loaded.worker_count, created.worker_count);
}
