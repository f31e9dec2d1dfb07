//! Compact summary shown next to the analysis on every channel.
//!
//! The card is never truncated; only the analysis body is.

use ict_core::{Direction, Payload, Price};

/// Placeholder shown when no entry has been found yet.
pub const SCANNING: &str = "Scanning";

pub fn trigger_emoji(trigger: &str) -> &'static str {
    match trigger {
        "PRE_MARKET_0915" => "📋",
        "PRE_OPEN_0929" => "🔒",
        "KZ_OPEN_LONDON" => "🇬🇧",
        "KZ_OPEN_NY_AM" => "🗽",
        "KZ_OPEN_NY_PM" => "🌆",
        "CONVICTION_CROSSED" => "🟢",
        "SETUP_FORMING" => "🚨",
        _ => "📡",
    }
}

pub fn model_emoji(model: &str) -> &'static str {
    match model {
        "UNICORN" => "🦄",
        "2022_MODEL" => "📐",
        "SILVER_BULLET" => "🔫",
        "JUDAS_SWING" => "🎭",
        "TURTLE_SOUP" => "🐢",
        "STANDARD_OTE" => "🎯",
        "PO3_ENTRY" => "📊",
        _ => "📌",
    }
}

/// `SETUP_FORMING` → `SETUP FORMING`.
pub fn humanize(label: &str) -> String {
    label.replace('_', " ")
}

/// Longest prefix of `text` holding at most `limit` characters.
/// Hard cut, no ellipsis.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryCard {
    pub trigger_emoji: &'static str,
    pub trigger_label: String,
    pub symbol: String,
    pub direction: Direction,
    /// Entry price, or [`SCANNING`].
    pub entry: String,
    /// e.g. "78%".
    pub conviction: String,
    pub model_emoji: &'static str,
    pub model_label: String,
}

impl SummaryCard {
    pub fn from_payload(p: &Payload) -> Self {
        Self {
            trigger_emoji: trigger_emoji(&p.trigger),
            trigger_label: humanize(&p.trigger),
            symbol: p.symbol.clone(),
            direction: p.bias.direction,
            entry: p
                .entry_price()
                .map(|px| Price(px).to_string())
                .unwrap_or_else(|| SCANNING.to_string()),
            conviction: format!("{}%", p.narrative.score),
            model_emoji: model_emoji(&p.model.name),
            model_label: humanize(&p.model.name),
        }
    }
}
