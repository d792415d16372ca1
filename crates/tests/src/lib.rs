//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约测试（默认配置下的 target 集合）
//! - 端到端测试：环境变量 -> ConfigLoader -> DispatchHandler -> 本地 HTTP 服务

#[cfg(test)]
mod support {
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::{header, HeaderMap, StatusCode, Uri};
    use axum::routing::post;
    use axum::Router;
    use chrono::{Duration as ChronoDuration, Utc};
    use contracts::Reading;

    /// One request as seen by the local server
    #[derive(Debug, Clone)]
    pub struct Captured {
        pub path: String,
        pub query: Option<String>,
        pub authorization: Option<String>,
        pub body: String,
    }

    /// Shared capture log plus the vendor endpoint's canned reply
    #[derive(Clone)]
    pub struct Recorder {
        requests: Arc<Mutex<Vec<Captured>>>,
        vendor_reply: Arc<String>,
    }

    impl Recorder {
        pub fn new(vendor_reply: &str) -> Self {
            Self {
                requests: Arc::default(),
                vendor_reply: Arc::new(vendor_reply.to_string()),
            }
        }

        pub fn requests_to(&self, path: &str) -> Vec<Captured> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.path == path)
                .cloned()
                .collect()
        }

        fn push(&self, uri: &Uri, headers: &HeaderMap, body: String) {
            self.requests.lock().unwrap().push(Captured {
                path: uri.path().to_string(),
                query: uri.query().map(str::to_string),
                authorization: headers
                    .get(header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string),
                body,
            });
        }
    }

    async fn legacy(
        State(recorder): State<Recorder>,
        uri: Uri,
        headers: HeaderMap,
        body: String,
    ) -> StatusCode {
        recorder.push(&uri, &headers, body);
        StatusCode::OK
    }

    async fn vendor(
        State(recorder): State<Recorder>,
        uri: Uri,
        headers: HeaderMap,
        body: String,
    ) -> (StatusCode, String) {
        recorder.push(&uri, &headers, body);
        (StatusCode::OK, recorder.vendor_reply.as_ref().clone())
    }

    async fn influx(
        State(recorder): State<Recorder>,
        uri: Uri,
        headers: HeaderMap,
        body: String,
    ) -> StatusCode {
        recorder.push(&uri, &headers, body);
        StatusCode::NO_CONTENT
    }

    /// Serve all three endpoints on an ephemeral port
    pub async fn spawn_server(recorder: Recorder) -> SocketAddr {
        let app = Router::new()
            .route("/tiltbridge", post(legacy))
            .route("/api/tilt", post(vendor))
            .route("/api/v2/write", post(influx))
            .with_state(recorder);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    /// Reading last seen `age_secs` ago
    pub fn reading(color: &str, age_secs: i64, gravity: f64, temp_f: f64) -> Reading {
        let mut reading = Reading::new(color, Utc::now() - ChronoDuration::seconds(age_secs));
        reading.gravity = Some(gravity);
        reading.temp = Some(temp_f);
        reading.smoothed_gravity = Some(gravity);
        reading.smoothed_temp = Some(temp_f);
        reading.rssi = Some(-70);
        reading.weeks_on_battery = Some(3.0);
        reading
    }
}

#[cfg(test)]
mod contract_tests {
    use contracts::{DispatchOutcome, ForwarderConfig, ReadingSnapshot, SkipReason};
    use dispatcher::DispatchHandler;
    use std::time::Duration;

    use crate::support::reading;

    #[tokio::test]
    async fn test_default_config_sends_nothing() {
        let mut handler = DispatchHandler::from_config(&ForwarderConfig::default()).unwrap();
        assert_eq!(handler.names(), vec!["legacy_http", "vendor_cloud", "influxdb"]);

        let snapshot =
            ReadingSnapshot::new([reading("Red", 1, 1.012, 68.0)], Duration::from_secs(300));
        let report = handler.dispatch(&snapshot).await;

        assert_eq!(report.attempted(), 0);
        for (_, outcome) in &report.outcomes {
            assert_eq!(outcome, &DispatchOutcome::Skipped(SkipReason::Disabled));
        }
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use std::time::Duration;

    use config_loader::{env, ConfigLoader};
    use contracts::{DispatchOutcome, ReadingSnapshot, SkipReason, TargetStatus};
    use dispatcher::DispatchHandler;

    use crate::support::{reading, spawn_server, Recorder};

    fn env_for(addr: SocketAddr) -> HashMap<String, String> {
        [
            (env::LEGACY_ENABLED, "true".to_string()),
            (env::LEGACY_URL, format!("http://{addr}/tiltbridge")),
            (env::LEGACY_INTERVAL, "0.05".to_string()),
            (env::VENDOR_ENABLED, "TRUE".to_string()),
            (env::VENDOR_URL, format!("http://{addr}/api/tilt")),
            (env::VENDOR_API_KEY, "bb-key".to_string()),
            (env::VENDOR_INTERVAL, "0.05".to_string()),
            (env::INFLUX_ENABLED, "true".to_string()),
            (env::INFLUX_URL, format!("http://{addr}")),
            (env::INFLUX_TOKEN, "s3cret".to_string()),
            (env::INFLUX_ORG, "brewhouse".to_string()),
            (env::INFLUX_BUCKET, "fermenter".to_string()),
            (env::INFLUX_BEER_NAME, "Hazy IPA".to_string()),
            (env::INFLUX_OG, "1.050".to_string()),
            (env::INFLUX_COLOR, "red".to_string()),
            (env::INFLUX_INTERVAL, "0.05".to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    fn snapshot() -> ReadingSnapshot {
        ReadingSnapshot::new(
            [
                reading("Red", 2, 1.012, 68.0),
                reading("Blue", 5, 1.020, 66.2),
                reading("Green", 900, 1.030, 70.0),
            ],
            Duration::from_secs(300),
        )
    }

    /// Targets start with a full window ahead of them; wait past the 50ms intervals
    async fn wait_for_first_window() {
        tokio::time::sleep(Duration::from_millis(60)).await;
    }

    /// Environment -> loader -> handler -> HTTP, two dispatch rounds
    #[tokio::test]
    async fn test_e2e_all_targets() {
        let recorder = Recorder::new(r#"{"next_request_ms": 60000}"#);
        let addr = spawn_server(recorder.clone()).await;

        let config = ConfigLoader::load_from_env(&env_for(addr)).unwrap();
        let mut handler = DispatchHandler::from_config(&config).unwrap();
        assert!(handler
            .statuses()
            .iter()
            .all(|(_, status)| *status == TargetStatus::Ready));

        let snapshot = snapshot();
        let early = handler.dispatch(&snapshot).await;
        assert!(early
            .outcomes
            .iter()
            .all(|(_, o)| *o == DispatchOutcome::Skipped(SkipReason::NotDue)));
        assert!(recorder.requests_to("/tiltbridge").is_empty());

        wait_for_first_window().await;
        let first = handler.dispatch(&snapshot).await;
        assert_eq!(
            first.get("legacy_http"),
            Some(&DispatchOutcome::Sent {
                attempted: 1,
                succeeded: 1
            })
        );
        assert_eq!(
            first.get("vendor_cloud"),
            Some(&DispatchOutcome::Sent {
                attempted: 2,
                succeeded: 2
            })
        );
        assert_eq!(
            first.get("influxdb"),
            Some(&DispatchOutcome::Sent {
                attempted: 1,
                succeeded: 1
            })
        );

        // Legacy: one batch, fresh readings only, color order
        let legacy = recorder.requests_to("/tiltbridge");
        assert_eq!(legacy.len(), 1);
        let body: serde_json::Value = serde_json::from_str(&legacy[0].body).unwrap();
        assert_eq!(body["tiltbridge_junior"], true);
        let colors: Vec<_> = body["tilts"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["color"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(colors, vec!["Blue", "Red"]);

        // Vendor: one flattened body per reading
        let vendor = recorder.requests_to("/api/tilt");
        assert_eq!(vendor.len(), 2);
        for request in &vendor {
            let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
            assert_eq!(body["apikey"], "bb-key");
            assert_eq!(body["type"], "tilt");
            assert_eq!(body["s_number_wifi_0"], -70);
        }
        let red: serde_json::Value = vendor
            .iter()
            .map(|r| serde_json::from_str::<serde_json::Value>(&r.body).unwrap())
            .find(|b| b["chipid"] == "Red")
            .unwrap();
        assert_eq!(red["s_number_wort_0"], 1.012);
        assert_eq!(red["s_number_temp_0"], 20.0);

        // InfluxDB: line protocol with token auth, configured color only
        let influx = recorder.requests_to("/api/v2/write");
        assert_eq!(influx.len(), 1);
        assert_eq!(influx[0].authorization.as_deref(), Some("Token s3cret"));
        assert_eq!(
            influx[0].query.as_deref(),
            Some("org=brewhouse&bucket=fermenter&precision=ms")
        );
        assert!(influx[0]
            .body
            .starts_with("tilt,color=Red,name=Hazy\\ IPA temp_fahrenheit=68.0,"));

        // The vendor hint stretches its window to 60s
        let metrics: HashMap<_, _> = handler.metrics().into_iter().collect();
        assert_eq!(metrics["vendor_cloud"].interval_ms, 60_000);
        assert_eq!(metrics["legacy_http"].interval_ms, 50);

        tokio::time::sleep(Duration::from_millis(120)).await;
        let second = handler.dispatch(&snapshot).await;
        assert!(second.get("legacy_http").unwrap().reached_network());
        assert_eq!(
            second.get("vendor_cloud"),
            Some(&DispatchOutcome::Skipped(SkipReason::NotDue))
        );
        assert!(second.get("influxdb").unwrap().reached_network());
        assert_eq!(recorder.requests_to("/api/tilt").len(), 2);
        assert_eq!(recorder.requests_to("/tiltbridge").len(), 2);
    }

    /// An unreachable endpoint fails alone
    #[tokio::test]
    async fn test_e2e_unreachable_target_is_isolated() {
        let recorder = Recorder::new("");
        let addr = spawn_server(recorder.clone()).await;

        let closed = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };

        let mut vars = env_for(addr);
        vars.insert(
            env::LEGACY_URL.to_string(),
            format!("http://{closed}/tiltbridge"),
        );
        vars.insert(env::VENDOR_ENABLED.to_string(), "false".to_string());

        let config = ConfigLoader::load_from_env(&vars).unwrap();
        let mut handler = DispatchHandler::from_config(&config).unwrap();

        wait_for_first_window().await;
        let report = handler.dispatch(&snapshot()).await;
        assert_eq!(
            report.get("legacy_http"),
            Some(&DispatchOutcome::Sent {
                attempted: 1,
                succeeded: 0
            })
        );
        assert_eq!(
            report.get("vendor_cloud"),
            Some(&DispatchOutcome::Skipped(SkipReason::Disabled))
        );
        assert_eq!(
            report.get("influxdb"),
            Some(&DispatchOutcome::Sent {
                attempted: 1,
                succeeded: 1
            })
        );
        assert_eq!(report.failed(), 1);
        assert_eq!(recorder.requests_to("/api/v2/write").len(), 1);
    }

    /// An unusable vendor reply keeps the configured window
    #[tokio::test]
    async fn test_e2e_vendor_without_hint_keeps_interval() {
        let recorder = Recorder::new("<html>busy</html>");
        let addr = spawn_server(recorder.clone()).await;

        let mut vars = env_for(addr);
        vars.insert(env::LEGACY_ENABLED.to_string(), "false".to_string());
        vars.insert(env::INFLUX_ENABLED.to_string(), "false".to_string());

        let config = ConfigLoader::load_from_env(&vars).unwrap();
        let mut handler = DispatchHandler::from_config(&config).unwrap();

        wait_for_first_window().await;
        let report = handler.dispatch(&snapshot()).await;
        assert_eq!(report.succeeded(), 2);

        let metrics: HashMap<_, _> = handler.metrics().into_iter().collect();
        assert_eq!(metrics["vendor_cloud"].interval_ms, 50);
    }
}
