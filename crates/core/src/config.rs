use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_parse<T: FromStr>(profile: &str, key: &str, default: T) -> T {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub delivery: DeliveryConfig,
    pub poller: PollerConfig,
    pub screenshot: ScreenshotConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `ICT_PROFILE`. When set (e.g. `PROD`), every key
    /// is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("ICT_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            llm: LlmConfig::from_env_profiled(p),
            delivery: DeliveryConfig::from_env_profiled(p),
            poller: PollerConfig::from_env_profiled(p),
            screenshot: ScreenshotConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:      {}:{}", self.server.host, self.server.port);
        tracing::info!(
            "  llm:         provider={}, configured={}, timeout={}s",
            self.llm.provider,
            self.llm.is_configured(),
            self.llm.timeout_secs
        );
        tracing::info!(
            "  delivery:    method={}, discord={}, telegram={}",
            self.delivery.method,
            self.delivery.discord_enabled(),
            self.delivery.telegram_enabled()
        );
        tracing::info!(
            "  poller:      url={}, interval={}s",
            self.poller.caretaker_url.as_deref().unwrap_or("(none)"),
            self.poller.interval_secs
        );
        tracing::info!(
            "  screenshot:  dir={}",
            self.screenshot
                .dir
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| "(disabled)".to_string())
        );
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_parse(p, "PORT", 8000),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ── LLM (DeepSeek / Anthropic) ───────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "deepseek", "anthropic" (alias "claude")
    pub provider: String,
    pub deepseek_api_key: Option<String>,
    pub deepseek_model: String,
    pub deepseek_base_url: String,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl LlmConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            provider: profiled_env_or(p, "AI_PROVIDER", "deepseek").to_lowercase(),
            deepseek_api_key: profiled_env_opt(p, "DEEPSEEK_API_KEY"),
            deepseek_model: profiled_env_or(p, "DEEPSEEK_MODEL", "deepseek-chat"),
            deepseek_base_url: profiled_env_or(p, "DEEPSEEK_BASE_URL", "https://api.deepseek.com"),
            anthropic_api_key: profiled_env_opt(p, "ANTHROPIC_API_KEY"),
            anthropic_model: profiled_env_or(p, "CLAUDE_MODEL", "claude-sonnet-4-5-20250929"),
            temperature: profiled_env_parse(p, "LLM_TEMPERATURE", 0.3),
            max_tokens: profiled_env_parse(p, "LLM_MAX_TOKENS", 2000),
            timeout_secs: profiled_env_parse(p, "LLM_TIMEOUT_SECS", 60),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn is_configured(&self) -> bool {
        match self.provider.as_str() {
            "deepseek" => self.deepseek_api_key.is_some(),
            "anthropic" | "claude" => self.anthropic_api_key.is_some(),
            _ => false,
        }
    }
}

// ── Delivery (Discord / Telegram) ─────────────────────────────

/// Which delivery channels receive the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
    #[default]
    Discord,
    Telegram,
    Both,
}

impl DeliveryMethod {
    pub fn includes_discord(&self) -> bool {
        matches!(self, DeliveryMethod::Discord | DeliveryMethod::Both)
    }

    pub fn includes_telegram(&self) -> bool {
        matches!(self, DeliveryMethod::Telegram | DeliveryMethod::Both)
    }
}

impl FromStr for DeliveryMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "discord" | "a" => Ok(DeliveryMethod::Discord),
            "telegram" | "b" => Ok(DeliveryMethod::Telegram),
            "both" => Ok(DeliveryMethod::Both),
            _ => Err(ConfigError::UnknownDeliveryMethod(s.to_string())),
        }
    }
}

impl fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeliveryMethod::Discord => "discord",
            DeliveryMethod::Telegram => "telegram",
            DeliveryMethod::Both => "both",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    pub method: DeliveryMethod,
    pub discord_webhook_url: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub telegram_api_url: String,
}

impl DeliveryConfig {
    fn from_env_profiled(p: &str) -> Self {
        let raw_method = profiled_env_or(p, "DELIVERY_METHOD", "discord");
        let method = raw_method.parse().unwrap_or_else(|e| {
            tracing::warn!("{e}, falling back to discord");
            DeliveryMethod::Discord
        });
        Self {
            method,
            discord_webhook_url: profiled_env_opt(p, "DISCORD_WEBHOOK_URL"),
            telegram_bot_token: profiled_env_opt(p, "TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: profiled_env_opt(p, "TELEGRAM_CHAT_ID"),
            telegram_api_url: profiled_env_or(p, "TELEGRAM_API_URL", "https://api.telegram.org"),
        }
    }

    pub fn discord_enabled(&self) -> bool {
        self.method.includes_discord() && self.discord_webhook_url.is_some()
    }

    pub fn telegram_enabled(&self) -> bool {
        self.method.includes_telegram()
            && self.telegram_bot_token.is_some()
            && self.telegram_chat_id.is_some()
    }
}

// ── Poller (caretaker signal store) ───────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    pub caretaker_url: Option<String>,
    pub interval_secs: u64,
    pub timeout_secs: u64,
    pub last_seen_file: PathBuf,
}

impl PollerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            caretaker_url: profiled_env_opt(p, "CARETAKER_URL"),
            interval_secs: profiled_env_parse(p, "POLL_INTERVAL_SECS", 30),
            timeout_secs: profiled_env_parse(p, "POLL_TIMEOUT_SECS", 15),
            last_seen_file: PathBuf::from(profiled_env_or(p, "LAST_SEEN_FILE", ".last-alert-ts")),
        }
    }
}

// ── Screenshots ───────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScreenshotConfig {
    /// Directory an external capturer writes chart images into. `None` disables attachments.
    pub dir: Option<PathBuf>,
}

impl ScreenshotConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            dir: profiled_env_opt(p, "SCREENSHOT_DIR").map(PathBuf::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_method_parses_aliases() {
        assert_eq!("discord".parse::<DeliveryMethod>().unwrap(), DeliveryMethod::Discord);
        assert_eq!("A".parse::<DeliveryMethod>().unwrap(), DeliveryMethod::Discord);
        assert_eq!("Telegram".parse::<DeliveryMethod>().unwrap(), DeliveryMethod::Telegram);
        assert_eq!("b".parse::<DeliveryMethod>().unwrap(), DeliveryMethod::Telegram);
        assert_eq!(" BOTH ".parse::<DeliveryMethod>().unwrap(), DeliveryMethod::Both);
        assert!("slack".parse::<DeliveryMethod>().is_err());
    }

    #[test]
    fn delivery_method_selects_channels() {
        assert!(DeliveryMethod::Discord.includes_discord());
        assert!(!DeliveryMethod::Discord.includes_telegram());
        assert!(DeliveryMethod::Both.includes_discord());
        assert!(DeliveryMethod::Both.includes_telegram());
        assert!(!DeliveryMethod::Telegram.includes_discord());
    }

    #[test]
    fn profiled_keys_take_precedence() {
        std::env::set_var("ICTTEST_DEEPSEEK_MODEL", "deepseek-reasoner");
        std::env::set_var("DEEPSEEK_MODEL", "deepseek-chat");
        let config = Config::for_profile("icttest");
        assert_eq!(config.profile, "ICTTEST");
        assert_eq!(config.llm.deepseek_model, "deepseek-reasoner");
        std::env::remove_var("ICTTEST_DEEPSEEK_MODEL");
        std::env::remove_var("DEEPSEEK_MODEL");
    }

    #[test]
    fn telegram_needs_token_and_chat() {
        let mut delivery = DeliveryConfig {
            method: DeliveryMethod::Both,
            discord_webhook_url: None,
            telegram_bot_token: Some("123:ABC".into()),
            telegram_chat_id: None,
            telegram_api_url: "https://api.telegram.org".into(),
        };
        assert!(!delivery.telegram_enabled());
        assert!(!delivery.discord_enabled());
        delivery.telegram_chat_id = Some("-100123".into());
        assert!(delivery.telegram_enabled());
        delivery.method = DeliveryMethod::Discord;
        assert!(!delivery.telegram_enabled());
    }

    #[test]
    fn llm_configured_depends_on_provider_key() {
        let mut llm = Config::for_profile("UNUSED_PROFILE_XYZ").llm;
        llm.provider = "deepseek".into();
        llm.deepseek_api_key = None;
        assert!(!llm.is_configured());
        llm.deepseek_api_key = Some("sk-test".into());
        assert!(llm.is_configured());
        llm.provider = "claude".into();
        llm.anthropic_api_key = None;
        assert!(!llm.is_configured());
        llm.provider = "unknown".into();
        assert!(!llm.is_configured());
    }
}
