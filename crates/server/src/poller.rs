//! Pulls alerts from the caretaker signal store when the webhook cannot
//! reach this process.
//!
//! Signals arrive newest first. Everything newer than the last-seen marker
//! is processed oldest first, and the marker advances after each one.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use ict_core::config::PollerConfig;
use ict_core::Payload;
use serde::Deserialize;
use serde_json::Value;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::pipeline::Pipeline;

const BOT_NAME: &str = "ict-analysis";

#[derive(Debug, Clone, Deserialize)]
pub struct Signal {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub raw: Value,
}

impl Signal {
    pub fn alert(&self) -> Option<&Value> {
        self.raw.get("alert")
    }

    fn is_test(&self) -> bool {
        self.alert()
            .and_then(|a| a.get("test"))
            .is_some_and(is_truthy)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Signals newer than `last_seen`, oldest first. `signals` must be newest
/// first; the walk stops at the first already-seen timestamp. Test alerts
/// are dropped.
pub fn select_new_signals(signals: Vec<Signal>, last_seen: Option<&str>) -> Vec<Signal> {
    let mut fresh: Vec<Signal> = signals
        .into_iter()
        .take_while(|s| last_seen.map_or(true, |seen| s.timestamp.as_str() > seen))
        .filter(|s| !s.is_test())
        .collect();
    fresh.reverse();
    fresh
}

pub async fn read_marker(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => {
            let ts = text.trim();
            (!ts.is_empty()).then(|| ts.to_string())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not read last-seen marker");
            None
        }
    }
}

pub async fn write_marker(path: &Path, timestamp: &str) -> std::io::Result<()> {
    tokio::fs::write(path, timestamp).await
}

pub struct Poller {
    client: reqwest::Client,
    signals_url: String,
    marker: PathBuf,
    interval: Duration,
    pipeline: Arc<Pipeline>,
}

impl Poller {
    pub fn new(config: &PollerConfig, pipeline: Arc<Pipeline>) -> anyhow::Result<Self> {
        let base = config
            .caretaker_url
            .as_deref()
            .context("CARETAKER_URL must be set to run the poller")?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("building HTTP client")?;

        Ok(Self {
            client,
            signals_url: format!("{}/api/signals?bot={BOT_NAME}", base.trim_end_matches('/')),
            marker: config.last_seen_file.clone(),
            interval: Duration::from_secs(config.interval_secs.max(1)),
            pipeline,
        })
    }

    /// Fetch the signal list. Any failure is logged and yields nothing.
    pub async fn fetch(&self) -> Vec<Signal> {
        let response = match self.client.get(&self.signals_url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Signal poll failed");
                return Vec::new();
            }
        };
        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Signal store returned an error");
            return Vec::new();
        }
        match response.json::<Vec<Signal>>().await {
            Ok(signals) => signals,
            Err(e) => {
                warn!(error = %e, "Unparseable signal list");
                Vec::new()
            }
        }
    }

    /// One poll cycle. Returns the number of signals consumed.
    pub async fn poll_once(&self) -> usize {
        let last_seen = read_marker(&self.marker).await;
        let fresh = select_new_signals(self.fetch().await, last_seen.as_deref());
        if fresh.is_empty() {
            return 0;
        }
        info!(count = fresh.len(), "New alerts found");

        for signal in &fresh {
            self.handle(signal).await;
            if let Err(e) = write_marker(&self.marker, &signal.timestamp).await {
                warn!(path = %self.marker.display(), error = %e, "Could not write last-seen marker");
            }
        }
        fresh.len()
    }

    async fn handle(&self, signal: &Signal) {
        let Some(alert) = signal.alert() else {
            warn!(timestamp = %signal.timestamp, "Signal has no alert body, skipping");
            return;
        };
        match Payload::from_value(alert.clone()) {
            Ok(payload) => {
                info!(
                    timestamp = %signal.timestamp,
                    trigger = %payload.trigger,
                    symbol = %payload.symbol,
                    conviction = payload.narrative.score,
                    "Processing polled alert"
                );
                self.pipeline.process(payload).await;
            }
            Err(e) => {
                warn!(timestamp = %signal.timestamp, error = %e, "Polled alert failed validation");
            }
        }
    }

    /// Poll every interval until `shutdown` resolves.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) {
        info!(
            url = %self.signals_url,
            interval_secs = self.interval.as_secs(),
            marker = %self.marker.display(),
            "Alert poller started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
            }
        }
        info!("Alert poller stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::{pipeline_with, FixedAnalyst, RecordingChannel};
    use crate::testdata::sample_value;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn signal(ts: &str, alert: Value) -> Signal {
        Signal {
            timestamp: ts.to_string(),
            raw: json!({ "alert": alert }),
        }
    }

    fn timestamps(signals: &[Signal]) -> Vec<&str> {
        signals.iter().map(|s| s.timestamp.as_str()).collect()
    }

    #[test]
    fn first_run_takes_everything_oldest_first() {
        let signals = vec![
            signal("2024-02-07T16:03:00Z", json!({})),
            signal("2024-02-07T16:02:00Z", json!({})),
            signal("2024-02-07T16:01:00Z", json!({})),
        ];
        let fresh = select_new_signals(signals, None);
        assert_eq!(
            timestamps(&fresh),
            ["2024-02-07T16:01:00Z", "2024-02-07T16:02:00Z", "2024-02-07T16:03:00Z"]
        );
    }

    #[test]
    fn stops_at_last_seen() {
        let signals = vec![
            signal("2024-02-07T16:03:00Z", json!({})),
            signal("2024-02-07T16:02:00Z", json!({})),
            signal("2024-02-07T16:01:00Z", json!({})),
        ];
        let fresh = select_new_signals(signals, Some("2024-02-07T16:02:00Z"));
        assert_eq!(timestamps(&fresh), ["2024-02-07T16:03:00Z"]);
    }

    #[test]
    fn test_alerts_are_skipped() {
        let signals = vec![
            signal("2024-02-07T16:03:00Z", json!({ "test": true })),
            signal("2024-02-07T16:02:00Z", json!({ "test": false })),
            signal("2024-02-07T16:01:00Z", json!({ "test": "yes" })),
        ];
        let fresh = select_new_signals(signals, None);
        assert_eq!(timestamps(&fresh), ["2024-02-07T16:02:00Z"]);
    }

    #[tokio::test]
    async fn marker_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".last-alert-ts");

        assert_eq!(read_marker(&path).await, None);
        write_marker(&path, "2024-02-07T16:02:00Z").await.unwrap();
        assert_eq!(read_marker(&path).await.as_deref(), Some("2024-02-07T16:02:00Z"));

        tokio::fs::write(&path, "  \n").await.unwrap();
        assert_eq!(read_marker(&path).await, None);
    }

    async fn caretaker(signals: Value) -> String {
        let app = Router::new().route(
            "/api/signals",
            get(move || {
                let signals = signals.clone();
                async move { Json(signals) }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn poller_config(url: String, marker: PathBuf) -> PollerConfig {
        PollerConfig {
            caretaker_url: Some(url),
            interval_secs: 30,
            timeout_secs: 5,
            last_seen_file: marker,
        }
    }

    #[tokio::test]
    async fn poll_processes_new_alerts_and_advances_marker() {
        let mut invalid = sample_value();
        invalid["v"] = json!(2);
        let base = caretaker(json!([
            { "timestamp": "2024-02-07T16:04:00Z", "raw": { "alert": invalid } },
            { "timestamp": "2024-02-07T16:03:00Z", "raw": { "alert": sample_value() } },
            { "timestamp": "2024-02-07T16:02:00Z", "raw": { "alert": sample_value() } },
        ]))
        .await;

        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join(".last-alert-ts");
        write_marker(&marker, "2024-02-07T16:02:00Z").await.unwrap();

        let channel = Arc::new(RecordingChannel::default());
        let analyst = Arc::new(FixedAnalyst { text: "polled", calls: AtomicUsize::new(0) });
        let pipeline = pipeline_with(analyst, vec![channel.clone()]);
        let poller = Poller::new(&poller_config(base, marker.clone()), pipeline).unwrap();

        assert_eq!(poller.poll_once().await, 2);
        // The invalid newest alert is consumed without reaching a channel.
        assert_eq!(channel.seen.lock().unwrap().len(), 1);
        assert_eq!(read_marker(&marker).await.as_deref(), Some("2024-02-07T16:04:00Z"));

        assert_eq!(poller.poll_once().await, 0);
    }

    #[tokio::test]
    async fn unreachable_store_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_with(
            Arc::new(FixedAnalyst { text: "x", calls: AtomicUsize::new(0) }),
            Vec::new(),
        );
        let config = poller_config("http://127.0.0.1:9".to_string(), dir.path().join("m"));
        let poller = Poller::new(&config, pipeline).unwrap();

        assert!(poller.fetch().await.is_empty());
        assert_eq!(poller.poll_once().await, 0);
    }

    #[test]
    fn poller_requires_caretaker_url() {
        let mut config = poller_config(String::new(), PathBuf::from("m"));
        config.caretaker_url = None;
        let pipeline = pipeline_with(
            Arc::new(FixedAnalyst { text: "x", calls: AtomicUsize::new(0) }),
            Vec::new(),
        );
        assert!(Poller::new(&config, pipeline).is_err());
    }
}
