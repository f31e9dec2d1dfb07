//! Pipeline orchestration: screenshot lookup, analysis, fan-out delivery.
//!
//! [`Pipeline::process`] is the failure boundary. Whatever happens inside a
//! run (including a panic) is logged and never reaches the caller.

use std::sync::Arc;

use ict_core::{Config, Payload};
use ict_llm::{AnalysisEngine, Analyst};
use ict_notify::{Alert, DeliveryStatus, DispatchResult, Dispatcher};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::screenshot::ScreenshotStore;

/// Max payloads waiting for a worker before the webhook starts refusing.
pub const QUEUE_CAPACITY: usize = 256;

/// Max pipeline runs in flight. The worker stops pulling from the queue
/// while every slot is taken, so a stalled provider fills the queue.
pub const MAX_CONCURRENT_RUNS: usize = 4;

pub struct Pipeline {
    analyst: Arc<dyn Analyst>,
    dispatcher: Dispatcher,
    screenshots: ScreenshotStore,
}

impl Pipeline {
    pub fn new(analyst: Arc<dyn Analyst>, dispatcher: Dispatcher, screenshots: ScreenshotStore) -> Self {
        Self {
            analyst,
            dispatcher,
            screenshots,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let engine = AnalysisEngine::from_config(&config.llm);
        info!(provider = engine.provider_name(), "Analysis engine ready");

        let dispatcher = Dispatcher::from_config(&config.delivery);
        info!(
            method = %config.delivery.method,
            channels = ?dispatcher.channel_names(),
            "Delivery channels ready"
        );

        let screenshots = ScreenshotStore::new(config.screenshot.dir.clone());
        if !screenshots.is_enabled() {
            info!("SCREENSHOT_DIR not set, alerts will be sent without charts");
        }

        Self::new(Arc::new(engine), dispatcher, screenshots)
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.dispatcher
            .channel_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// One full run. Analysis finishes before any channel is called.
    pub async fn run(&self, payload: Payload) -> Vec<DispatchResult> {
        let screenshot = self.screenshots.resolve(&payload).await;
        let analysis = self.analyst.analyze(&payload).await;

        let alert = Arc::new(Alert::new(payload, analysis, screenshot));
        let results = self.dispatcher.dispatch(Arc::clone(&alert)).await;

        let sent = results
            .iter()
            .filter(|r| r.status == DeliveryStatus::Sent)
            .count();
        info!(
            trigger = %alert.payload.trigger,
            model = %alert.payload.model.name,
            sent,
            channels = results.len(),
            "Pipeline complete"
        );
        results
    }

    /// Run on a separate task and contain any failure. Returns `None` when
    /// the run crashed.
    pub async fn process(self: &Arc<Self>, payload: Payload) -> Option<Vec<DispatchResult>> {
        let run_id = Uuid::new_v4();
        let trigger = payload.trigger.clone();
        let span = tracing::info_span!("pipeline", %run_id, trigger = %trigger);

        let pipeline = Arc::clone(self);
        let handle = tokio::spawn(async move { pipeline.run(payload).await }.instrument(span.clone()));

        match handle.await {
            Ok(results) => Some(results),
            Err(e) => {
                span.in_scope(|| {
                    tracing::error!(trigger = %trigger, error = %e, "Pipeline error");
                });
                None
            }
        }
    }
}

/// Error returned when a payload cannot be queued.
#[derive(Debug, PartialEq, Eq)]
pub enum EnqueueError {
    Full,
    Closed,
}

impl std::fmt::Display for EnqueueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnqueueError::Full => f.write_str("pipeline queue is full"),
            EnqueueError::Closed => f.write_str("pipeline is shutting down"),
        }
    }
}

/// Sending half of the background pipeline queue.
#[derive(Clone)]
pub struct PipelineQueue {
    tx: mpsc::Sender<Payload>,
}

impl PipelineQueue {
    /// Start the worker. It exits, after draining in-flight runs, once every
    /// queue handle has been dropped.
    pub fn start(pipeline: Arc<Pipeline>, capacity: usize, max_runs: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity);
        let worker = tokio::spawn(run_worker(pipeline, rx, max_runs.max(1)));
        (Self { tx }, worker)
    }

    #[cfg(test)]
    pub(crate) fn from_sender(tx: mpsc::Sender<Payload>) -> Self {
        Self { tx }
    }

    pub fn enqueue(&self, payload: Payload) -> Result<(), EnqueueError> {
        self.tx.try_send(payload).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => EnqueueError::Full,
            mpsc::error::TrySendError::Closed(_) => EnqueueError::Closed,
        })
    }
}

async fn run_worker(pipeline: Arc<Pipeline>, mut rx: mpsc::Receiver<Payload>, max_runs: usize) {
    let slots = Arc::new(Semaphore::new(max_runs));
    let mut runs = JoinSet::new();
    loop {
        tokio::select! {
            Some(_) = runs.join_next(), if !runs.is_empty() => {}
            slot = Arc::clone(&slots).acquire_owned() => {
                // The semaphore is never closed.
                let Ok(slot) = slot else { break };
                let Some(payload) = rx.recv().await else { break };
                let pipeline = Arc::clone(&pipeline);
                runs.spawn(async move {
                    pipeline.process(payload).await;
                    drop(slot);
                });
            }
        }
    }

    if !runs.is_empty() {
        info!(pending = runs.len(), "Draining in-flight pipeline runs");
    }
    while runs.join_next().await.is_some() {}
    info!("Pipeline worker stopped");
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::testdata::sample_payload;
    use ict_notify::{Notifier, NotifyError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    pub(crate) struct FixedAnalyst {
        pub text: &'static str,
        pub calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Analyst for FixedAnalyst {
        async fn analyze(&self, _payload: &Payload) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.text.to_string()
        }
    }

    struct PanickingAnalyst;

    #[async_trait::async_trait]
    impl Analyst for PanickingAnalyst {
        async fn analyze(&self, _payload: &Payload) -> String {
            panic!("analyst exploded")
        }
    }

    /// Blocks every analysis until the test releases it.
    struct GatedAnalyst {
        started: tokio::sync::Notify,
        release: Semaphore,
    }

    #[async_trait::async_trait]
    impl Analyst for GatedAnalyst {
        async fn analyze(&self, _payload: &Payload) -> String {
            self.started.notify_one();
            let _pass = self.release.acquire().await;
            "gated".to_string()
        }
    }

    struct SlowAnalyst;

    #[async_trait::async_trait]
    impl Analyst for SlowAnalyst {
        async fn analyze(&self, _payload: &Payload) -> String {
            tokio::time::sleep(Duration::from_millis(50)).await;
            "slow".to_string()
        }
    }

    /// Records every alert it receives.
    #[derive(Default)]
    pub(crate) struct RecordingChannel {
        pub seen: Mutex<Vec<(String, String)>>,
        pub fail: bool,
    }

    #[async_trait::async_trait]
    impl Notifier for RecordingChannel {
        async fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
            self.seen
                .lock()
                .unwrap()
                .push((alert.payload.trigger.clone(), alert.analysis.clone()));
            if self.fail {
                Err(NotifyError::Api { status: 500, body: "boom".into() })
            } else {
                Ok(())
            }
        }
        fn is_enabled(&self) -> bool {
            true
        }
        fn channel_name(&self) -> &str {
            "recording"
        }
    }

    pub(crate) fn pipeline_with(analyst: Arc<dyn Analyst>, channels: Vec<Arc<dyn Notifier>>) -> Arc<Pipeline> {
        Arc::new(Pipeline::new(
            analyst,
            Dispatcher::new(channels),
            ScreenshotStore::disabled(),
        ))
    }

    #[tokio::test]
    async fn analysis_fans_out_to_channels() {
        let a = Arc::new(RecordingChannel::default());
        let b = Arc::new(RecordingChannel::default());
        let analyst = Arc::new(FixedAnalyst { text: "bullish", calls: AtomicUsize::new(0) });
        let pipeline = pipeline_with(analyst.clone(), vec![a.clone(), b.clone()]);

        let results = pipeline.process(sample_payload()).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(analyst.calls.load(Ordering::SeqCst), 1);
        for channel in [&a, &b] {
            assert_eq!(
                channel.seen.lock().unwrap().as_slice(),
                [("SETUP_FORMING".to_string(), "bullish".to_string())]
            );
        }
    }

    #[tokio::test]
    async fn failing_channel_does_not_stop_sibling() {
        let bad = Arc::new(RecordingChannel { fail: true, ..Default::default() });
        let good = Arc::new(RecordingChannel::default());
        let analyst = Arc::new(FixedAnalyst { text: "x", calls: AtomicUsize::new(0) });
        let pipeline = pipeline_with(analyst, vec![bad.clone(), good.clone()]);

        let results = pipeline.process(sample_payload()).await.unwrap();
        assert!(matches!(results[0].status, DeliveryStatus::Failed(_)));
        assert_eq!(results[1].status, DeliveryStatus::Sent);
        assert_eq!(good.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn panicking_analyst_is_contained() {
        let channel = Arc::new(RecordingChannel::default());
        let pipeline = pipeline_with(Arc::new(PanickingAnalyst), vec![channel.clone()]);

        assert!(pipeline.process(sample_payload()).await.is_none());
        assert!(channel.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn queue_drains_before_worker_exits() {
        let channel = Arc::new(RecordingChannel::default());
        let pipeline = pipeline_with(Arc::new(SlowAnalyst), vec![channel.clone()]);
        let (queue, worker) = PipelineQueue::start(pipeline, 8, 2);

        for _ in 0..3 {
            queue.enqueue(sample_payload()).unwrap();
        }
        drop(queue);
        worker.await.unwrap();

        assert_eq!(channel.seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn saturated_worker_pushes_back_on_queue() {
        let channel = Arc::new(RecordingChannel::default());
        let analyst = Arc::new(GatedAnalyst {
            started: tokio::sync::Notify::new(),
            release: Semaphore::new(0),
        });
        let pipeline = pipeline_with(analyst.clone(), vec![channel.clone()]);
        let (queue, worker) = PipelineQueue::start(pipeline, 1, 1);

        queue.enqueue(sample_payload()).unwrap();
        analyst.started.notified().await;

        // The only run slot is busy, so the next payload waits in the
        // channel and the one after that is refused.
        assert_eq!(queue.enqueue(sample_payload()), Ok(()));
        assert_eq!(queue.enqueue(sample_payload()), Err(EnqueueError::Full));

        analyst.release.add_permits(1);
        drop(queue);
        worker.await.unwrap();
        assert_eq!(channel.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn full_queue_is_reported() {
        let (tx, _rx) = mpsc::channel(1);
        let queue = PipelineQueue { tx };

        assert_eq!(queue.enqueue(sample_payload()), Ok(()));
        assert_eq!(queue.enqueue(sample_payload()), Err(EnqueueError::Full));
    }

    #[tokio::test]
    async fn closed_queue_is_reported() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let queue = PipelineQueue { tx };
        assert_eq!(queue.enqueue(sample_payload()), Err(EnqueueError::Closed));
    }
}
