//! EmbeddedServer tests against a scripted native bridge

#[cfg(test)]
mod tests {
    use bvc_telemetry::{
        config::RuntimeConfig,
        embedded::{build_runtime_config, EmbeddedServer, NativeBridge, ServerHandle, MINECRAFT_CLIENT_ID},
        error::NativeBridgeError,
        protocol::Payload,
        transport::{PositionRouter, PositionSink},
        types::Game,
    };
    use parking_lot::{Condvar, Mutex};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    /// Bridge whose `start` blocks until `stop` is called, like the real
    /// server.
    #[derive(Default)]
    struct MockBridge {
        fail_create: bool,
        created_with: Mutex<Option<String>>,
        updates: Mutex<Vec<String>>,
        stopped: Mutex<bool>,
        wake: Condvar,
        stop_calls: AtomicUsize,
        destroy_calls: AtomicUsize,
        started: AtomicBool,
        /// While set, `stop` is recorded but does not wake `start`.
        hold_stop: AtomicBool,
    }

    impl MockBridge {
        fn failing() -> Self {
            Self {
                fail_create: true,
                ..Default::default()
            }
        }

        fn release(&self) {
            *self.stopped.lock() = true;
            self.wake.notify_all();
        }
    }

    impl NativeBridge for MockBridge {
        fn init(&self) -> i32 {
            0
        }

        fn version(&self) -> String {
            "mock-1.0".into()
        }

        fn create(&self, config_json: &str) -> Option<ServerHandle> {
            *self.created_with.lock() = Some(config_json.to_string());
            if self.fail_create {
                None
            } else {
                ServerHandle::from_raw(0xB0C)
            }
        }

        fn start(&self, _handle: ServerHandle) -> i32 {
            self.started.store(true, Ordering::SeqCst);
            let mut stopped = self.stopped.lock();
            while !*stopped {
                self.wake.wait(&mut stopped);
            }
            0
        }

        fn stop(&self, _handle: ServerHandle) -> i32 {
            self.stop_calls.fetch_add(1, Ordering::SeqCst);
            if !self.hold_stop.load(Ordering::SeqCst) {
                self.release();
            }
            0
        }

        fn destroy(&self, _handle: ServerHandle) -> i32 {
            self.destroy_calls.fetch_add(1, Ordering::SeqCst);
            0
        }

        fn update_positions(&self, _handle: ServerHandle, game_data_json: &str) -> i32 {
            self.updates.lock().push(game_data_json.to_string());
            0
        }

        fn last_error(&self) -> Option<String> {
            self.fail_create.then(|| "bad config".to_string())
        }
    }

    fn embedded_config() -> RuntimeConfig {
        let mut config = RuntimeConfig {
            use_embedded_server: true,
            ..Default::default()
        };
        config.embedded_config.tls_certificate = "/etc/bvc/cert.pem".into();
        config.embedded_config.tls_key = "/etc/bvc/key.pem".into();
        config
    }

    // -----------------------------------------------------------------------
    // Handle
    // -----------------------------------------------------------------------

    #[test]
    fn null_handle_is_not_a_handle() {
        assert!(ServerHandle::from_raw(0).is_none());
        assert_eq!(ServerHandle::from_raw(42).unwrap().as_raw(), 42);
    }

    // -----------------------------------------------------------------------
    // Runtime config blob
    // -----------------------------------------------------------------------

    #[test]
    fn runtime_config_uses_configured_token() {
        let mut config = embedded_config();
        config.access_token = Some("secret".into());

        let blob = build_runtime_config(&config, std::path::Path::new("/srv/bvc"));
        let json = serde_json::to_value(&blob).unwrap();

        assert_eq!(json["database"]["scheme"], "sqlite3");
        assert_eq!(json["database"]["database"], "/srv/bvc/bvc.sqlite3");
        assert_eq!(json["server"]["listen"], "0.0.0.0");
        assert_eq!(json["server"]["port"], 8444);
        assert_eq!(json["server"]["quic_port"], 8443);
        assert_eq!(json["server"]["assets_path"], "/srv/bvc/assets");
        assert_eq!(json["server"]["tls"]["certificate"], "/etc/bvc/cert.pem");
        assert_eq!(json["server"]["tls"]["so_reuse_port"], false);
        assert_eq!(json["server"]["tls"]["certs_path"], "/srv/bvc/certificates");
        assert_eq!(json["server"]["minecraft"]["access_token"], "secret");
        assert_eq!(json["server"]["minecraft"]["client_id"], MINECRAFT_CLIENT_ID);
        assert_eq!(json["log"]["out"], "stdout");
        assert_eq!(json["voice"]["broadcast_range"], 32.0);
    }

    #[test]
    fn runtime_config_generates_token_when_missing() {
        let blob = build_runtime_config(&embedded_config(), std::path::Path::new("/srv/bvc"));
        let token = &blob.server.minecraft.access_token;
        assert_eq!(token.len(), 36);
        assert_eq!(token.matches('-').count(), 4);
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    #[test]
    fn start_requires_embedded_mode_and_tls() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = Arc::new(MockBridge::default());

        let mut disabled = embedded_config();
        disabled.use_embedded_server = false;
        assert!(matches!(
            EmbeddedServer::start(bridge.clone(), &disabled, dir.path()),
            Err(NativeBridgeError::NotEnabled)
        ));

        let mut no_tls = embedded_config();
        no_tls.embedded_config.tls_key.clear();
        assert!(matches!(
            EmbeddedServer::start(bridge.clone(), &no_tls, dir.path()),
            Err(NativeBridgeError::MissingTls)
        ));
        assert!(bridge.created_with.lock().is_none());
    }

    #[test]
    fn null_create_fails_without_panicking() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = Arc::new(MockBridge::failing());

        match EmbeddedServer::start(bridge.clone(), &embedded_config(), dir.path()) {
            Err(NativeBridgeError::Create(reason)) => assert_eq!(reason, "bad config"),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("server started with a null handle"),
        }
        assert!(!bridge.started.load(Ordering::SeqCst));
    }

    #[test]
    fn start_prepares_data_directories() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("bvc-data");
        let bridge = Arc::new(MockBridge::default());

        let server = EmbeddedServer::start(bridge.clone(), &embedded_config(), &data_dir).unwrap();
        assert!(data_dir.join("certificates").is_dir());
        assert!(data_dir.join("assets").is_dir());

        let created = bridge.created_with.lock().clone().unwrap();
        assert!(created.contains("bvc.sqlite3"));
        server.stop();
    }

    #[test]
    fn submit_routes_payload_through_ffi() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = Arc::new(MockBridge::default());
        let server = EmbeddedServer::start(bridge.clone(), &embedded_config(), dir.path()).unwrap();

        while !bridge.started.load(Ordering::SeqCst) {
            std::thread::yield_now();
        }
        assert!(server.is_running());

        server.submit(Payload::build(Game::Minecraft, Vec::new()));
        assert_eq!(
            bridge.updates.lock().as_slice(),
            [r#"{"game":"minecraft","players":[]}"#]
        );
        server.stop();
    }

    #[test]
    fn stop_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = Arc::new(MockBridge::default());
        let server = EmbeddedServer::start(bridge.clone(), &embedded_config(), dir.path()).unwrap();

        server.stop();
        server.stop();
        drop(server);

        assert_eq!(bridge.stop_calls.load(Ordering::SeqCst), 1);
        assert_eq!(bridge.destroy_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn updates_do_not_wait_on_a_slow_stop() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = Arc::new(MockBridge::default());
        bridge.hold_stop.store(true, Ordering::SeqCst);
        let server =
            Arc::new(EmbeddedServer::start(bridge.clone(), &embedded_config(), dir.path()).unwrap());
        while !bridge.started.load(Ordering::SeqCst) {
            std::thread::yield_now();
        }

        let stopping = {
            let server = Arc::clone(&server);
            std::thread::spawn(move || server.stop())
        };
        while bridge.stop_calls.load(Ordering::SeqCst) == 0 {
            std::thread::yield_now();
        }

        // `stop` is now waiting on the server thread.
        let began = Instant::now();
        assert!(!server.update_positions("{}"));
        server.submit(Payload::build(Game::Minecraft, Vec::new()));
        assert!(began.elapsed() < Duration::from_secs(1));
        assert!(bridge.updates.lock().is_empty());

        bridge.release();
        stopping.join().unwrap();
        assert_eq!(bridge.destroy_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stopped_server_rejects_updates() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = Arc::new(MockBridge::default());
        let server = EmbeddedServer::start(bridge.clone(), &embedded_config(), dir.path()).unwrap();

        server.stop();
        assert!(!server.is_running());
        assert!(!server.update_positions("{}"));
        assert!(bridge.updates.lock().is_empty());
    }

    #[test]
    fn router_falls_back_once_embedded_stops() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = Arc::new(MockBridge::default());
        let server =
            Arc::new(EmbeddedServer::start(bridge.clone(), &embedded_config(), dir.path()).unwrap());
        while !bridge.started.load(Ordering::SeqCst) {
            std::thread::yield_now();
        }

        let router = PositionRouter::new().with_embedded(server.clone());
        router.submit(Payload::build(Game::Minecraft, Vec::new()));
        assert_eq!(bridge.updates.lock().len(), 1);

        server.stop();
        assert!(!router.is_available());
        router.submit(Payload::build(Game::Minecraft, Vec::new()));
        assert_eq!(bridge.updates.lock().len(), 1);
    }
}
