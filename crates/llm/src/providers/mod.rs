pub mod claude;
pub mod deepseek;

use ict_core::config::LlmConfig;

use crate::provider::{LlmError, LlmProvider};

/// Create the configured LLM provider. Selected once at startup.
pub fn create_provider(llm_config: &LlmConfig) -> Result<Box<dyn LlmProvider>, LlmError> {
    match llm_config.provider.as_str() {
        "deepseek" => {
            let api_key = llm_config
                .deepseek_api_key
                .as_ref()
                .ok_or_else(|| LlmError::NotConfigured("DEEPSEEK_API_KEY not set".into()))?;
            Ok(Box::new(deepseek::DeepSeekProvider::new(
                api_key.clone(),
                llm_config.deepseek_model.clone(),
                llm_config.deepseek_base_url.clone(),
            )))
        }
        "anthropic" | "claude" => {
            let api_key = llm_config
                .anthropic_api_key
                .as_ref()
                .ok_or_else(|| LlmError::NotConfigured("ANTHROPIC_API_KEY not set".into()))?;
            Ok(Box::new(claude::ClaudeProvider::new(
                api_key.clone(),
                llm_config.anthropic_model.clone(),
            )))
        }
        other => Err(LlmError::NotConfigured(format!(
            "unknown LLM provider: '{}'",
            other
        ))),
    }
}
