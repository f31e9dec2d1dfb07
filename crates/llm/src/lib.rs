pub mod engine;
pub mod prompts;
pub mod provider;
pub mod providers;

pub use engine::{AnalysisEngine, Analyst};
pub use provider::{LlmError, LlmProvider, Message, Role};
