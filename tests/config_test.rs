use memory_scan::config::{
    validate_config, Config, ConfigError, ConfigLoader, ScannerConfig,
};
use memory_scan::{ManualScanner, MemoryAlignment};
use std::fs;
use tempfile::TempDir;

#[test]
fn partial_file_fills_in_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("memory-scan.toml");
    fs::write(
        &path,
        r#"
[scanner]
alignment = "4"
parallel = false
"#,
    )
    .unwrap();

    let config = ConfigLoader::new(&path).load().unwrap();
    assert_eq!(config.scanner.alignment, MemoryAlignment::Align4);
    assert!(!config.scanner.parallel);
    assert_eq!(config.scanner.progress_interval, ScannerConfig::default().progress_interval);
    assert_eq!(config.logging.level, "info");
    validate_config(&config).unwrap();
}

#[test]
fn alignment_accepts_bare_integers() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("memory-scan.toml");
    fs::write(&path, "[scanner]\nalignment = 4\n").unwrap();

    let config = ConfigLoader::new(&path).load().unwrap();
    assert_eq!(config.scanner.alignment, MemoryAlignment::Align4);

    fs::write(&path, "[scanner]\nalignment = 0\n").unwrap();
    let config = ConfigLoader::new(&path).load().unwrap();
    assert_eq!(config.scanner.alignment, MemoryAlignment::Auto);

    fs::write(&path, "[scanner]\nalignment = 6\n").unwrap();
    assert!(matches!(
        ConfigLoader::new(&path).load(),
        Err(ConfigError::TomlParse(_))
    ));
}

#[test]
fn save_and_reload() {
    let dir = TempDir::new().unwrap();
    let loader = ConfigLoader::new(dir.path().join("saved.toml"));
    let mut config = Config::default();
    config.scanner.max_threads = 3;
    config.scanner.alignment = MemoryAlignment::Align2;
    config.logging.level = "debug".to_string();

    loader.save(&config).unwrap();
    let loaded = loader.load().unwrap();

    assert_eq!(loaded.scanner, config.scanner);
    assert_eq!(loaded.logging.level, "debug");
}

#[test]
fn unknown_alignment_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[scanner]\nalignment = \"3\"\n").unwrap();

    let err = ConfigLoader::new(&path).load().unwrap_err();
    assert!(matches!(err, ConfigError::TomlParse(_)));
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let loader = ConfigLoader::new(dir.path().join("absent.toml"));

    assert!(matches!(loader.load(), Err(ConfigError::FileNotFound(_))));
    let config = loader.load_or_default();
    assert_eq!(config.scanner, ScannerConfig::default());
}

#[test]
fn loaded_config_drives_the_scanner() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scanner.toml");
    fs::write(
        &path,
        "[scanner]\nmax_threads = 2\nparallel = true\nprogress_interval = 8\n",
    )
    .unwrap();

    let config = ConfigLoader::new(&path).load().unwrap();
    validate_config(&config).unwrap();
    let scanner = ManualScanner::new(config.scanner.clone()).unwrap();
    assert_eq!(scanner.config(), &config.scanner);
}

#[test]
fn zero_threads_rejected() {
    let mut config = Config::default();
    config.scanner.max_threads = 0;
    assert!(matches!(validate_config(&config), Err(ConfigError::Invalid(_))));
}
