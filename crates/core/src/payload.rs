//! Typed model of an inbound indicator alert.
//!
//! Wire names follow the compact keys emitted by the TradingView indicator
//! (`sym`, `tf`, `px`, `narr`, ...). Labels whose value set is open-ended
//! (trigger, model name, DOL source, kill zone) stay `String`; directions and
//! states with a fixed vocabulary are enums.

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::de;
use crate::error::ValidationError;
use crate::format::PricePosition;

/// The only payload schema version this service understands.
pub const SCHEMA_VERSION: u32 = 1;

// ── Enumerations ──────────────────────────────────────────────

/// Directional thesis of the bias engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Bull,
    Bear,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Bull => "BULL",
            Direction::Bear => "BEAR",
        }
    }
}

/// Direction that may also be undetermined (`NONE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketDirection {
    Bull,
    Bear,
    None,
}

impl MarketDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketDirection::Bull => "BULL",
            MarketDirection::Bear => "BEAR",
            MarketDirection::None => "NONE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DolStatus {
    Active,
    Delivered,
    Seeking,
}

impl DolStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DolStatus::Active => "ACTIVE",
            DolStatus::Delivered => "DELIVERED",
            DolStatus::Seeking => "SEEKING",
        }
    }
}

/// Narrative state machine position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NarrativeState {
    None,
    Developing,
    Active,
}

impl NarrativeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            NarrativeState::None => "NONE",
            NarrativeState::Developing => "DEVELOPING",
            NarrativeState::Active => "ACTIVE",
        }
    }
}

macro_rules! display_via_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_via_as_str!(Direction, MarketDirection, DolStatus, NarrativeState);

// ── Sub-records ───────────────────────────────────────────────

/// Bias and draw-on-liquidity target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bias {
    #[serde(rename = "dir")]
    pub direction: Direction,
    /// DOL price; absent while the engine is still seeking a target.
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub dol: Option<f64>,
    /// e.g. "PDH", "BSL x3", "IPDA 20D High".
    #[serde(rename = "dol_src")]
    pub dol_source: String,
    pub dol_status: DolStatus,
    /// e.g. "ASIA_SWEEP", "MSS", "PD_ZONE".
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    #[serde(rename = "mss")]
    pub shift: MarketDirection,
    pub bos_bull: bool,
    pub bos_bear: bool,
    pub choch_bull: bool,
    pub choch_bear: bool,
    pub displaced: bool,
}

/// Price reference grid. Any level may be absent when not yet computed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Levels {
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub pdh: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub pdl: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub asia_h: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub asia_l: Option<f64>,
    #[serde(default)]
    pub asia_swept_h: bool,
    #[serde(default)]
    pub asia_swept_l: bool,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub eq: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub premium: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub discount: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub deal_h: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub deal_l: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub ote_h: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub ote_l: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub ipda20h: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub ipda20l: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub ipda40h: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub ipda40l: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub ipda60h: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub ipda60l: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Narrative {
    pub state: NarrativeState,
    #[serde(rename = "dir")]
    pub direction: MarketDirection,
    /// Conviction, 0-100.
    #[serde(deserialize_with = "de::integer")]
    pub score: u8,
    pub sweep: bool,
    pub mss: bool,
    pub entry: bool,
    pub pd_aligned: bool,
    pub kz: bool,
    pub confirm: bool,
}

/// Smart-entry candidate. Prices are meaningless when `found` is false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub found: bool,
    /// "OB", "FVG", "BRK", "IFVG".
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "dir")]
    pub direction: MarketDirection,
    #[serde(rename = "px", default, deserialize_with = "de::opt_decimal")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub top: Option<f64>,
    #[serde(rename = "bot", default, deserialize_with = "de::opt_decimal")]
    pub bottom: Option<f64>,
    #[serde(deserialize_with = "de::decimal")]
    pub score: f64,
}

/// Pattern classification, e.g. "2022_MODEL", "UNICORN", "GENERIC".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCall {
    pub name: String,
    #[serde(rename = "conf", deserialize_with = "de::decimal")]
    pub confidence: f64,
    /// Comma-joined, e.g. "SB,OTE,DISCOUNT,KZ".
    pub flags: String,
}

impl ModelCall {
    pub fn flag_list(&self) -> impl Iterator<Item = &str> {
        self.flags.split(',').map(str::trim).filter(|f| !f.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// "LONDON", "NY_AM", "NY_PM", "ASIA", "NONE".
    #[serde(rename = "kz")]
    pub kill_zone: String,
    /// "ACCUMULATION", "MANIPULATION", "DISTRIBUTION", "UNKNOWN".
    pub po3: String,
    #[serde(rename = "macro")]
    pub macro_time: bool,
    #[serde(rename = "sb_time")]
    pub silver_bullet: bool,
}

// ── Payload ───────────────────────────────────────────────────

/// One alert snapshot. Construct through [`Payload::from_json`] or
/// [`Payload::from_value`] so the invariants are checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(rename = "v", deserialize_with = "de::integer")]
    pub version: u32,
    /// e.g. "SETUP_FORMING", "KZ_OPEN_NY_AM".
    pub trigger: String,
    #[serde(rename = "sym")]
    pub symbol: String,
    #[serde(rename = "tf")]
    pub timeframe: String,
    #[serde(rename = "px", deserialize_with = "de::decimal")]
    pub price: f64,
    /// Unix epoch milliseconds.
    #[serde(rename = "ts", deserialize_with = "de::integer")]
    pub timestamp_ms: i64,
    pub bias: Bias,
    #[serde(rename = "struct")]
    pub structure: Structure,
    pub levels: Levels,
    #[serde(rename = "narr")]
    pub narrative: Narrative,
    pub entry: Entry,
    pub model: ModelCall,
    pub session: Session,
}

impl Payload {
    /// Parse and validate a raw JSON body.
    pub fn from_json(body: &str) -> Result<Self, ValidationError> {
        let payload: Payload = serde_json::from_str(body)?;
        payload.validate()?;
        Ok(payload)
    }

    /// Parse and validate raw request bytes. Invalid UTF-8 is a parse error.
    pub fn from_slice(body: &[u8]) -> Result<Self, ValidationError> {
        let payload: Payload = serde_json::from_slice(body)?;
        payload.validate()?;
        Ok(payload)
    }

    /// Parse and validate an already-decoded JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ValidationError> {
        let payload: Payload = serde_json::from_value(value)?;
        payload.validate()?;
        Ok(payload)
    }

    /// Check the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.version != SCHEMA_VERSION {
            return Err(ValidationError::UnsupportedVersion {
                found: self.version,
                expected: SCHEMA_VERSION,
            });
        }
        if self.narrative.score > 100 {
            return Err(ValidationError::ScoreOutOfRange(self.narrative.score));
        }
        for (field, value) in self.decimals() {
            if value.is_some_and(|v| !v.is_finite()) {
                return Err(ValidationError::NonFinite { field });
            }
        }
        Ok(())
    }

    /// Entry price, only when an entry was actually found.
    pub fn entry_price(&self) -> Option<f64> {
        if self.entry.found {
            self.entry.price
        } else {
            None
        }
    }

    pub fn price_position(&self) -> PricePosition {
        PricePosition::classify(Some(self.price), self.levels.eq)
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp_ms).single()
    }

    fn decimals(&self) -> [(&'static str, Option<f64>); 25] {
        let l = &self.levels;
        [
            ("px", Some(self.price)),
            ("bias.dol", self.bias.dol),
            ("levels.pdh", l.pdh),
            ("levels.pdl", l.pdl),
            ("levels.asia_h", l.asia_h),
            ("levels.asia_l", l.asia_l),
            ("levels.eq", l.eq),
            ("levels.premium", l.premium),
            ("levels.discount", l.discount),
            ("levels.deal_h", l.deal_h),
            ("levels.deal_l", l.deal_l),
            ("levels.ote_h", l.ote_h),
            ("levels.ote_l", l.ote_l),
            ("levels.ipda20h", l.ipda20h),
            ("levels.ipda20l", l.ipda20l),
            ("levels.ipda40h", l.ipda40h),
            ("levels.ipda40l", l.ipda40l),
            ("levels.ipda60h", l.ipda60h),
            ("levels.ipda60l", l.ipda60l),
            ("entry.px", self.entry.price),
            ("entry.top", self.entry.top),
            ("entry.bot", self.entry.bottom),
            ("entry.score", Some(self.entry.score)),
            ("model.conf", Some(self.model.confidence)),
            ("narr.score", Some(f64::from(self.narrative.score))),
        ]
    }
}
