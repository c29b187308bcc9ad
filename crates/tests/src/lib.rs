//! # Integration Tests
//!
//! End-to-end flows across crates.
//!
//! Covers:
//! - source → router → broadcast / upload
//! - recorder sink output replayed through the trace source
//! - configuration rejected before anything starts

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_default_config_is_v1() {
        let config = contracts::ServiceConfig::default();
        assert_eq!(config.version, contracts::ConfigVersion::V1);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::io::Write;
    use std::path::Path;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        ListenerHandle, MeasurementRecord, ServiceConfig, SinkConfig, SinkType, SourceConfig,
        UploadConfig,
    };
    use parking_lot::Mutex;
    use pipeline::PipelineRouter;
    use service::VehicleService;
    use sinks::{
        BroadcastEngine, ChannelListener, MeasurementSink, SinkError, UploadSink, UploadTransport,
        STATUS_CREATED,
    };
    use sources::{SyntheticConfig, SyntheticSource};
    use tokio::time::{sleep, timeout, Instant};

    /// Collector stand-in that records every POSTed body
    #[derive(Clone, Default)]
    struct RecordingTransport {
        bodies: Arc<Mutex<Vec<String>>>,
    }

    impl UploadTransport for RecordingTransport {
        async fn post(&self, body: String) -> Result<u16, SinkError> {
            self.bodies.lock().push(body);
            Ok(STATUS_CREATED)
        }
    }

    /// Poll `condition` every 10ms until it holds or `limit` elapses
    async fn wait_until(limit: Duration, condition: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + limit;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            sleep(Duration::from_millis(10)).await;
        }
        condition()
    }

    fn file_url(path: &Path) -> String {
        url::Url::from_file_path(path).unwrap().to_string()
    }

    fn write_trace(path: &Path, lines: &[String]) {
        let mut file = std::fs::File::create(path).unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
    }

    fn upload_config() -> UploadConfig {
        let mut config = UploadConfig::new("http://collector.local/records");
        config.batch_size = 10;
        config.capacity = 100;
        config
    }

    /// Application data reaches the last-value table, a listener and the collector
    #[tokio::test]
    async fn test_e2e_application_to_listener_and_upload() {
        let transport = RecordingTransport::default();
        let bodies = transport.bodies.clone();
        let config = ServiceConfig {
            upload: Some(upload_config()),
            ..Default::default()
        };

        let relay = VehicleService::builder(config)
            .upload_sink(UploadSink::spawn(&upload_config(), transport))
            .build()
            .unwrap();

        let (listener, mut rx) = ChannelListener::new();
        relay.register("engine_speed", ListenerHandle::new(listener));

        for i in 0..30 {
            assert!(relay.receive(MeasurementRecord::new("engine_speed", f64::from(i))));
        }

        assert_eq!(relay.message_count(), 30);
        assert_eq!(relay.get("engine_speed").unwrap().value().as_f64(), Some(29.0));

        let upload = relay.upload().unwrap();
        assert!(
            wait_until(Duration::from_secs(2), || upload.stats().uploaded_records == 30).await,
            "all records should be uploaded"
        );
        let uploaded: usize = bodies
            .lock()
            .iter()
            .map(|body| body.matches("\"engine_speed\"").count())
            .sum();
        assert_eq!(uploaded, 30);
        assert!(bodies.lock().iter().all(|body| body.starts_with("{\"records\":[")));

        // Coalescing may skip intermediate values, never the final one
        let mut last = None;
        while let Ok(Some(record)) = timeout(Duration::from_millis(200), rx.recv()).await {
            last = record.value().as_f64();
        }
        assert_eq!(last, Some(29.0));

        relay.shutdown().await;
    }

    /// A trace source configured as default replays into the router
    #[tokio::test]
    async fn test_e2e_trace_replay_through_router() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drive.jsonl");
        let lines: Vec<String> = (0..20)
            .map(|i| {
                format!(
                    r#"{{"name":"vehicle_speed","value":{}.0,"timestamp":{}}}"#,
                    i,
                    100.0 + f64::from(i) * 0.001
                )
            })
            .collect();
        write_trace(&path, &lines);

        let config = ServiceConfig {
            source: SourceConfig {
                source_type: "trace".to_string(),
                resource: Some(file_url(&path)),
                ..Default::default()
            },
            ..Default::default()
        };
        let relay = VehicleService::new(config).unwrap();
        assert_eq!(relay.source_summaries().len(), 2);

        assert!(wait_until(Duration::from_secs(2), || relay.message_count() == 20).await);
        assert_eq!(relay.get("vehicle_speed").unwrap().value().as_f64(), Some(19.0));

        relay.shutdown().await;
    }

    /// Records captured by the file sink replay unchanged through the trace source
    #[tokio::test]
    async fn test_e2e_recorded_trace_replays() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recorded").join("trace.jsonl");

        let mut params = HashMap::new();
        params.insert("path".to_string(), path.display().to_string());
        let recorder_config = ServiceConfig {
            sinks: vec![SinkConfig {
                name: "recorder".to_string(),
                sink_type: SinkType::File,
                queue_capacity: 100,
                params,
            }],
            ..Default::default()
        };

        let recorder = VehicleService::new(recorder_config).unwrap();
        recorder.receive(MeasurementRecord::new("fuel_level", 0.42));
        recorder.receive(MeasurementRecord::new("turn_signal_status", "left"));
        recorder.receive(MeasurementRecord::with_timestamp("odometer", 1234.5, Some(1_700_000_000.0)));
        recorder.shutdown().await;

        let replayer = VehicleService::new(ServiceConfig::default()).unwrap();
        replayer.set_source("trace", Some(&file_url(&path))).unwrap();

        assert!(wait_until(Duration::from_secs(2), || replayer.message_count() == 3).await);
        assert_eq!(replayer.get("fuel_level").unwrap().value().as_f64(), Some(0.42));
        assert_eq!(
            replayer.get("turn_signal_status").unwrap().value().as_str(),
            Some("left")
        );
        let odometer = replayer.get("odometer").unwrap();
        assert_eq!(odometer.value().as_f64(), Some(1234.5));
        assert_eq!(odometer.timestamp(), Some(1_700_000_000.0));

        replayer.shutdown().await;
    }

    /// Clearing sources stops device data while application data keeps flowing
    #[tokio::test]
    async fn test_e2e_clear_sources_keeps_application_data() {
        let relay = VehicleService::new(ServiceConfig::default()).unwrap();

        let notified = Arc::new(AtomicU64::new(0));
        let counter = notified.clone();
        relay.register(
            "fuel_level",
            ListenerHandle::new(sinks::CallbackListener::new(move |_record: &MeasurementRecord| {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
        );

        let mut params = HashMap::new();
        params.insert("keys".to_string(), "fuel_level".to_string());
        params.insert("frequency_hz".to_string(), "100".to_string());
        let config = ServiceConfig {
            source: SourceConfig {
                source_type: "synthetic".to_string(),
                params,
                ..Default::default()
            },
            ..Default::default()
        };
        let synthetic = VehicleService::new(config).unwrap();
        assert!(wait_until(Duration::from_secs(2), || synthetic.message_count() >= 5).await);

        synthetic.clear_sources();
        // Allow an in-flight tick to land
        sleep(Duration::from_millis(50)).await;
        let settled = synthetic.message_count();
        sleep(Duration::from_millis(100)).await;
        assert_eq!(synthetic.message_count(), settled);

        assert!(synthetic.receive(MeasurementRecord::new("fuel_level", 0.5)));
        assert_eq!(synthetic.message_count(), settled + 1);
        assert_eq!(synthetic.get("fuel_level").unwrap().value().as_f64(), Some(0.5));
        synthetic.shutdown().await;

        relay.receive(MeasurementRecord::new("fuel_level", 0.9));
        assert!(wait_until(Duration::from_secs(1), || notified.load(Ordering::SeqCst) == 1).await);
        relay.shutdown().await;
    }

    /// Synthetic source → router → broadcast engine and upload sink, wired by hand
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_source_router_sinks() {
        let router = PipelineRouter::new();

        let broadcast = Arc::new(BroadcastEngine::spawn(router.last_values(), 1).unwrap());
        router.add_sink(broadcast.clone());

        let transport = RecordingTransport::default();
        let bodies = transport.bodies.clone();
        let upload = Arc::new(UploadSink::spawn(&upload_config(), transport));
        router.add_sink(upload.clone());

        let (listener, mut rx) = ChannelListener::new();
        broadcast.register("coolant_temp", ListenerHandle::new(listener));

        let source = Arc::new(SyntheticSource::new(
            SyntheticConfig {
                keys: vec!["coolant_temp".to_string(), "odometer".to_string()],
                frequency_hz: 200.0,
            },
            router.ingest_callback(),
        ));
        router.add_source(source).unwrap();

        assert!(wait_until(Duration::from_secs(3), || upload.stats().uploaded_records >= 20).await);
        let notified = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(notified.key(), "coolant_temp");
        assert!(router.get("odometer").is_some());

        router.stop();
        assert!(!broadcast.receive(&MeasurementRecord::new("coolant_temp", 1.0)));
        broadcast.shutdown().await;
        upload.shutdown().await;

        let settled = router.message_count();
        sleep(Duration::from_millis(50)).await;
        assert_eq!(router.message_count(), settled);
        assert!(bodies.lock().iter().any(|body| body.contains("\"odometer\"")));
    }

    /// Invalid configuration is rejected before any component starts
    #[test]
    fn test_invalid_configuration_is_rejected() {
        let invalid = [
            "[source]\nsource_type = \"\"\n",
            "[upload]\nurl = \"not a url\"\n",
            "[upload]\nurl = \"http://collector.local\"\nbatch_size = 50\ncapacity = 10\n",
            "[[sinks]]\nname = \"recorder\"\nsink_type = \"file\"\n",
        ];

        for content in invalid {
            assert!(
                ConfigLoader::load_from_str(content, ConfigFormat::Toml).is_err(),
                "should reject:\n{content}"
            );
        }

        let valid = "[source]\nsource_type = \"synthetic\"\n[upload]\nurl = \"https://collector.local/records\"\n";
        let config = ConfigLoader::load_from_str(valid, ConfigFormat::Toml).unwrap();
        assert_eq!(config.upload.unwrap().batch_size, 25);
    }
}
