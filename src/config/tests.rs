use std::env;
use std::fs;

use serial_test::serial;
use tempfile::TempDir;

use super::load_config;
use super::settings::{CatalogSettings, Settings};

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.broker.host, "127.0.0.1");
    assert_eq!(settings.broker.port, 5680);
    assert_eq!(settings.producer.pace_ms, 30_000);
    assert_eq!(settings.catalog.dog_breeds[0], "Labrador Retriever");
    assert_eq!(settings.catalog.cat_breeds[9], "Scottish Fold");
    assert_eq!(settings.logging.level, "info");
    assert!(settings.logging.file.is_none());
}

#[test]
fn test_catalog_defaults_are_ten_breeds_per_species() {
    let catalog = CatalogSettings::default();
    assert_eq!(catalog.dog_breeds.len(), 10);
    assert_eq!(catalog.cat_breeds.len(), 10);
    assert_eq!(catalog.dog_breeds, Settings::default().catalog.dog_breeds);
    assert_eq!(catalog.cat_breeds, Settings::default().catalog.cat_breeds);
}

// Runs `check` with the current directory switched to a fresh temp dir, so
// load_config only sees the files the test writes.
fn in_temp_cwd(check: impl FnOnce(&TempDir)) {
    let tmp = TempDir::new().expect("create tempdir");
    let orig = env::current_dir().expect("current_dir");
    env::set_current_dir(tmp.path()).expect("set current dir");
    check(&tmp);
    env::set_current_dir(orig).expect("restore cwd");
}

#[test]
#[serial]
fn test_load_config_without_sources_yields_defaults() {
    in_temp_cwd(|_| {
        let cfg = load_config().expect("load_config failed");
        assert_eq!(cfg.broker.port, 5680);
        assert_eq!(cfg.catalog.cat_breeds.len(), 10);
    });
}

#[test]
#[serial]
fn test_load_config_from_file_overrides_defaults() {
    in_temp_cwd(|_| {
        fs::create_dir_all("config").expect("create config dir");
        let toml = r#"
            [broker]
            host = "0.0.0.0"
            port = 9000

            [producer]
            pace_ms = 50

            [catalog]
            cat_breeds = ["Birman", "Sphynx"]
        "#;
        fs::write("config/default.toml", toml).expect("write config file");

        let cfg = load_config().expect("load_config failed");
        assert_eq!(cfg.broker.host, "0.0.0.0");
        assert_eq!(cfg.broker.port, 9000);
        assert_eq!(cfg.broker.data_dir, "shelterfeed_db");
        assert_eq!(cfg.producer.pace_ms, 50);
        assert_eq!(cfg.catalog.cat_breeds, vec!["Birman", "Sphynx"]);
        assert_eq!(cfg.catalog.dog_breeds.len(), 10);
    });
}

#[test]
#[serial]
fn test_environment_overrides_file_values() {
    in_temp_cwd(|_| {
        fs::create_dir_all("config").expect("create config dir");
        fs::write("config/default.toml", "[broker]\nport = 9000\n").expect("write config file");

        temp_env::with_vars(
            [
                ("SHELTERFEED__BROKER__PORT", Some("7000")),
                ("SHELTERFEED__LOGGING__LEVEL", Some("debug")),
                ("SHELTERFEED__CATALOG__DOG_BREEDS", Some("Beagle,Boxer")),
            ],
            || {
                let cfg = load_config().expect("load_config failed");
                assert_eq!(cfg.broker.port, 7000);
                assert_eq!(cfg.logging.level, "debug");
                assert_eq!(cfg.catalog.dog_breeds, vec!["Beagle", "Boxer"]);
            },
        );
    });
}

#[test]
#[serial]
fn test_consumer_prefetch_is_not_configurable() {
    in_temp_cwd(|_| {
        fs::create_dir_all("config").expect("create config dir");
        fs::write("config/default.toml", "[consumer]\nprefetch = 0\n").expect("write config file");

        let cfg = load_config().expect("unknown sections are ignored");
        assert_eq!(cfg.broker.port, 5680);
        assert_eq!(crate::consumer::PREFETCH, 1);
    });
}
