//! RuntimeConfig tests

#[cfg(test)]
mod tests {
    use bvc_telemetry::{
        config::{RuntimeConfig, DEFAULT_MINIMUM_PLAYERS, DEFAULT_POLL_INTERVAL_MS},
        error::ConfigError,
        types::{DeafenRule, Game},
    };
    use std::time::Duration;

    fn write_config(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bvc.toml");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    // -----------------------------------------------------------------------
    // Defaults
    // -----------------------------------------------------------------------

    #[test]
    fn defaults_match_documented_values() {
        let config = RuntimeConfig::default();
        assert_eq!(config.minimum_players, DEFAULT_MINIMUM_PLAYERS);
        assert_eq!(config.poll_interval(), Duration::from_millis(DEFAULT_POLL_INTERVAL_MS));
        assert_eq!(config.request_timeout(), Duration::from_millis(1000));
        assert_eq!(config.game, Game::Minecraft);
        assert_eq!(config.deafen_rule, DeafenRule::Sneaking);
        assert!(!config.debug);
        assert_eq!(config.embedded_config.http_port, 8444);
        assert_eq!(config.embedded_config.quic_port, 8443);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RuntimeConfig::load(Some(dir.path().join("nope.toml").as_path())).unwrap();
        assert_eq!(config.minimum_players, DEFAULT_MINIMUM_PLAYERS);
        assert!(config.bvc_server.is_none());
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    #[test]
    fn loads_kebab_case_keys() {
        let (_dir, path) = write_config(
            r#"
            bvc-server = "https://bvc.example.com"
            access-token = "secret"
            minimum-players = 1
            debug = true
            game = "hytale"
            deafen-rule = "sneaking-or-swimming"

            [embedded-config]
            http-port = 9000
            tls-names = ["voice.example.com"]
            "#,
        );

        let config = RuntimeConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(config.server_url(), Some("https://bvc.example.com"));
        assert_eq!(config.token(), Some("secret"));
        assert_eq!(config.minimum_players, 1);
        assert!(config.debug);
        assert_eq!(config.game, Game::Hytale);
        assert_eq!(config.deafen_rule, DeafenRule::SneakingOrSwimming);
        assert_eq!(config.embedded_config.http_port, 9000);
        assert_eq!(config.embedded_config.quic_port, 8443);
        assert_eq!(config.embedded_config.tls_names, ["voice.example.com"]);
    }

    #[test]
    fn accepts_snake_case_aliases() {
        let (_dir, path) = write_config(
            r#"
            bvc_server = "https://bvc.example.com"
            access_token = "secret"
            minimum_players = 3
            use_embedded_server = false
            "#,
        );

        let config = RuntimeConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(config.minimum_players, 3);
        assert!(config.is_valid());
    }

    #[test]
    fn malformed_file_is_a_load_error() {
        let (_dir, path) = write_config("minimum-players = \"many\"");
        assert!(matches!(
            RuntimeConfig::load(Some(path.as_path())),
            Err(ConfigError::Load(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Saving
    // -----------------------------------------------------------------------

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("bvc.toml");

        let mut original = RuntimeConfig {
            bvc_server: Some("https://bvc.example.com".into()),
            access_token: Some("secret".into()),
            minimum_players: 4,
            poll_interval_ms: 500,
            ..Default::default()
        };
        original.embedded_config.tls_certificate = "/etc/bvc/cert.pem".into();
        original.save(&path).unwrap();

        let loaded = RuntimeConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn create_default_only_writes_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bvc.toml");

        assert!(RuntimeConfig::create_default_if_missing(&path).unwrap());
        let first = std::fs::read_to_string(&path).unwrap();
        assert!(first.contains("minimum-players = 2"));

        std::fs::write(&path, "minimum-players = 7\n").unwrap();
        assert!(!RuntimeConfig::create_default_if_missing(&path).unwrap());
        assert_eq!(RuntimeConfig::load(Some(path.as_path())).unwrap().minimum_players, 7);
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    #[test]
    fn external_mode_needs_server_and_token() {
        let config = RuntimeConfig {
            bvc_server: Some("https://bvc.example.com".into()),
            ..Default::default()
        };
        match config.validate() {
            Err(ConfigError::Invalid {
                server_set,
                token_set,
            }) => {
                assert!(server_set);
                assert!(!token_set);
            }
            other => panic!("expected invalid config, got {:?}", other),
        }
    }

    #[test]
    fn blank_values_count_as_missing() {
        let config = RuntimeConfig {
            bvc_server: Some("  ".into()),
            access_token: Some("secret".into()),
            ..Default::default()
        };
        assert!(!config.is_valid());
        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("bvc-server=MISSING"), "{}", message);
        assert!(message.contains("access-token=set"), "{}", message);
    }

    #[test]
    fn embedded_mode_is_always_valid() {
        let config = RuntimeConfig {
            use_embedded_server: true,
            ..Default::default()
        };
        assert!(config.is_valid());
    }
}
