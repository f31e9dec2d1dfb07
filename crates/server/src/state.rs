use crate::pipeline::PipelineQueue;

pub struct AppState {
    pub queue: PipelineQueue,
    /// Provider name shown on `GET /`.
    pub provider: String,
    /// Selected delivery channels shown on `GET /`.
    pub channels: Vec<String>,
}
