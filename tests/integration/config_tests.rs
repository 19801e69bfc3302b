use figment::providers::{Format, Serialized, Toml};
use figment::Figment;
use mediadupe::config::AppConfig;
use mediadupe::scanner::FingerprintMode;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let figment = Figment::from(Serialized::defaults(AppConfig::default()));
    let config: AppConfig = figment.extract().unwrap();
    assert_eq!(config, AppConfig::default());
    assert_eq!(config.mode, FingerprintMode::Fast);
    assert_eq!(config.io_threads, 4);
    assert_eq!(config.audio_length_secs, 120);
}

#[test]
fn test_config_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    let toml_content = r#"
mode = "deep"
extensions = ["JPG", ".mp4"]
recursive = false
io_threads = 8
fpcalc = "/opt/chromaprint/fpcalc"
tool_timeout_secs = 15
video_sample_offsets = [0.0, 5.0]
snapshot_dir = "/var/lib/mediadupe"
"#;
    fs::write(&config_path, toml_content).unwrap();

    let config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
        .merge(Toml::file(&config_path))
        .extract()
        .unwrap();

    assert_eq!(config.mode, FingerprintMode::Deep);
    assert_eq!(config.io_threads, 8);
    assert_eq!(config.snapshot_dir, Some(PathBuf::from("/var/lib/mediadupe")));

    let scan = config.scan_config();
    assert_eq!(scan.mode, FingerprintMode::Deep);
    assert_eq!(scan.extension_filter, vec!["jpg", "mp4"]);
    assert!(!scan.recursive);
    assert_eq!(scan.io_threads, 8);
    assert_eq!(scan.tools.fpcalc, PathBuf::from("/opt/chromaprint/fpcalc"));
    assert_eq!(scan.tools.ffmpeg, PathBuf::from("ffmpeg"));
    assert_eq!(scan.tools.timeout, Duration::from_secs(15));
    assert_eq!(scan.video_sample_offsets, vec![0.0, 5.0]);
}

#[test]
fn test_env_overrides_file() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "audio_length_secs = 30\nskip_hidden = false\n").unwrap();

    std::env::set_var("MEDIADUPE_AUDIO_LENGTH_SECS", "45");
    std::env::set_var("MEDIADUPE_SKIP_HIDDEN", "true");

    let config: AppConfig = AppConfig::figment(Some(&config_path)).extract().unwrap();

    std::env::remove_var("MEDIADUPE_AUDIO_LENGTH_SECS");
    std::env::remove_var("MEDIADUPE_SKIP_HIDDEN");

    assert_eq!(config.audio_length_secs, 45);
    assert!(config.skip_hidden);
}

#[test]
fn test_missing_file_uses_defaults() {
    let temp_dir = tempdir().unwrap();
    let config = AppConfig::load(Some(&temp_dir.path().join("absent.toml"))).unwrap();
    assert_eq!(config.recursive, AppConfig::default().recursive);
    assert_eq!(config.fpcalc, PathBuf::from("fpcalc"));
}

#[test]
fn test_malformed_file_is_an_error() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "mode = [unterminated").unwrap();

    assert!(AppConfig::load(Some(&config_path)).is_err());
}

#[test]
fn test_unknown_mode_is_an_error() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "mode = \"thorough\"").unwrap();

    let result: Result<AppConfig, _> = Figment::from(Serialized::defaults(AppConfig::default()))
        .merge(Toml::file(&config_path))
        .extract();
    assert!(result.is_err());
}

#[test]
fn test_toml_round_trip() {
    let original = AppConfig {
        mode: FingerprintMode::Deep,
        extensions: vec!["flac".into(), "mp3".into()],
        log_file: Some(PathBuf::from("/tmp/mediadupe.log")),
        ..AppConfig::default()
    };
    let text = original.to_toml().unwrap();

    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, text).unwrap();

    let loaded: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
        .merge(Toml::file(&config_path))
        .extract()
        .unwrap();
    assert_eq!(loaded, original);
}

#[test]
fn test_default_locations() {
    if let Some(path) = AppConfig::default_path() {
        assert!(path.ends_with("config.toml"));
    }
    if let Some(dir) = AppConfig::default_snapshot_dir() {
        assert!(dir.ends_with("snapshots"));
    }
}
