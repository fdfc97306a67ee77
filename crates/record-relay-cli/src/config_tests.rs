//! Tests for [`RelayConfig`] loading and validation.

use super::*;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

fn valid_config() -> RelayConfig {
    let mut config = RelayConfig::default();
    config.delivery.endpoint = "https://graphql.example.com/graphql".to_string();
    config
}

fn env(pairs: &[(&str, &str)]) -> config::Map<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).expect("failed to write config file");
    path
}

// ============================================================================
// Defaults and validation
// ============================================================================

mod validation_tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();

        assert_eq!(config.delivery.endpoint, "");
        assert_eq!(config.delivery.timeout_seconds, 30);
        assert_eq!(config.store.table_name, "record-events");
        assert_eq!(config.store.data_dir, PathBuf::from("./data/status"));
        assert_eq!(config.processing.brand, "testBrand");
        assert_eq!(
            config.processing.decode_failure_policy,
            DecodeFailurePolicy::Skip
        );
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    /// The endpoint has no default, so an unconfigured relay is rejected.
    #[test]
    fn test_missing_endpoint_fails() {
        let result = RelayConfig::default().validate();

        assert!(
            matches!(result, Err(ConfigError::MissingRequired { ref key }) if key == "delivery.endpoint"),
            "got: {:?}",
            result
        );
    }

    #[test]
    fn test_non_http_endpoint_fails() {
        for endpoint in ["ftp://example.com/graphql", "not a url", "/graphql"] {
            let mut config = valid_config();
            config.delivery.endpoint = endpoint.to_string();

            assert!(
                matches!(config.validate(), Err(ConfigError::Invalid { .. })),
                "endpoint {endpoint} should be rejected"
            );
        }
    }

    #[test]
    fn test_zero_timeout_fails() {
        let mut config = valid_config();
        config.delivery.timeout_seconds = 0;

        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { ref key, .. }) if key == "delivery.timeout_seconds"
        ));
    }

    #[test]
    fn test_empty_table_and_brand_fail() {
        let mut config = valid_config();
        config.store.table_name = String::new();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired { ref key }) if key == "store.table_name"
        ));

        let mut config = valid_config();
        config.processing.brand = " ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired { ref key }) if key == "processing.brand"
        ));
    }

    #[test]
    fn test_client_config_uses_timeout() {
        let mut config = valid_config();
        config.delivery.timeout_seconds = 5;

        assert_eq!(config.delivery.client_config().timeout, Duration::from_secs(5));
    }
}

// ============================================================================
// Loading
// ============================================================================

mod loading_tests {
    use super::*;

    #[test]
    fn test_no_sources_yields_defaults() {
        let config = load_configuration_from(&[], None, &env(&[])).unwrap();

        assert_eq!(config, RelayConfig::default());
    }

    #[test]
    fn test_explicit_toml_file_is_loaded() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "relay.toml",
            r#"
[delivery]
endpoint = "https://graphql.example.com/graphql"
timeout_seconds = 10

[processing]
brand = "otherBrand"
decode_failure_policy = "mark_failed"
"#,
        );

        let config = load_configuration_from(&[], Some(&path), &env(&[])).unwrap();

        assert_eq!(config.delivery.endpoint, "https://graphql.example.com/graphql");
        assert_eq!(config.delivery.timeout_seconds, 10);
        assert_eq!(config.processing.brand, "otherBrand");
        assert_eq!(
            config.processing.decode_failure_policy,
            DecodeFailurePolicy::MarkFailed
        );
        // Unset sections keep their defaults
        assert_eq!(config.store.table_name, "record-events");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");

        let result = load_configuration_from(&[], Some(&path), &env(&[]));

        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_search_paths_are_optional_and_layered() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "base.yaml", "store:\n  table_name: base-table\n");
        write_file(&dir, "local.json", r#"{ "logging": { "json_format": true } }"#);
        let base = dir.path().join("base");
        let local = dir.path().join("local");
        let absent = dir.path().join("absent");

        let search_paths = [
            absent.to_str().unwrap(),
            base.to_str().unwrap(),
            local.to_str().unwrap(),
        ];
        let config = load_configuration_from(&search_paths, None, &env(&[])).unwrap();

        assert_eq!(config.store.table_name, "base-table");
        assert!(config.logging.json_format);
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "[store]\ntable_name = \"from-file\"").unwrap();

        let config = load_configuration_from(
            &[],
            Some(file.path()),
            &env(&[
                ("RELAY__STORE__TABLE_NAME", "from-env"),
                ("RELAY__DELIVERY__TIMEOUT_SECONDS", "7"),
                ("RELAY__LOGGING__JSON_FORMAT", "true"),
                ("UNRELATED", "ignored"),
            ]),
        )
        .unwrap();

        assert_eq!(config.store.table_name, "from-env");
        assert_eq!(config.delivery.timeout_seconds, 7);
        assert!(config.logging.json_format);
    }

    #[test]
    fn test_legacy_variables_take_precedence() {
        let config = load_configuration_from(
            &[],
            None,
            &env(&[
                ("RELAY__DELIVERY__ENDPOINT", "https://new.example.com/graphql"),
                (LEGACY_ENDPOINT_VAR, "https://legacy.example.com/graphql"),
                (LEGACY_TABLE_VAR, "legacy-table"),
            ]),
        )
        .unwrap();

        assert_eq!(config.delivery.endpoint, "https://legacy.example.com/graphql");
        assert_eq!(config.store.table_name, "legacy-table");
    }

    #[test]
    fn test_empty_legacy_variables_are_ignored() {
        let config =
            load_configuration_from(&[], None, &env(&[(LEGACY_TABLE_VAR, "")])).unwrap();

        assert_eq!(config.store.table_name, "record-events");
    }

    #[test]
    fn test_wrongly_typed_value_is_an_error() {
        let result = load_configuration_from(
            &[],
            None,
            &env(&[("RELAY__DELIVERY__TIMEOUT_SECONDS", "soon")]),
        );

        assert!(matches!(result, Err(ConfigError::Load(_))));
    }
}
