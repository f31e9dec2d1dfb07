//! Compact text rendering of a payload for the language model and for
//! degraded deliveries.

use std::fmt::{self, Display, Write};

use crate::payload::Payload;

/// Where price sits relative to the dealing-range equilibrium.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricePosition {
    Premium,
    Discount,
    Unknown,
}

impl PricePosition {
    /// Strictly above equilibrium is premium, at or below is discount.
    /// Either side missing yields `Unknown`.
    pub fn classify(price: Option<f64>, equilibrium: Option<f64>) -> Self {
        match (price, equilibrium) {
            (Some(px), Some(eq)) if px > eq => PricePosition::Premium,
            (Some(_), Some(_)) => PricePosition::Discount,
            _ => PricePosition::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PricePosition::Premium => "premium",
            PricePosition::Discount => "discount",
            PricePosition::Unknown => "unknown",
        }
    }
}

impl Display for PricePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricePosition::Premium => f.write_str("PREMIUM (above EQ)"),
            PricePosition::Discount => f.write_str("DISCOUNT (below EQ)"),
            PricePosition::Unknown => f.write_str("UNKNOWN"),
        }
    }
}

/// Renders a price with at least one decimal place, so whole prices read
/// `17900.0` rather than `17900`.
#[derive(Debug, Clone, Copy)]
pub struct Price(pub f64);

impl Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        if v.is_finite() && v.fract() == 0.0 {
            write!(f, "{v:.1}")
        } else {
            write!(f, "{v}")
        }
    }
}

/// Renders an optional level, `n/a` when absent.
struct Level(Option<f64>);

impl Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => Price(v).fmt(f),
            None => f.write_str("n/a"),
        }
    }
}

/// Render the fixed-section indicator report.
pub fn format_payload(p: &Payload) -> String {
    let mut out = String::with_capacity(1536);
    // Writing into a String cannot fail.
    let _ = write_report(&mut out, p);
    out
}

fn write_report(out: &mut String, p: &Payload) -> fmt::Result {
    let b = &p.bias;
    let s = &p.structure;
    let l = &p.levels;
    let n = &p.narrative;
    let e = &p.entry;

    writeln!(out, "## INDICATOR DATA")?;
    if let Some(ts) = p.timestamp() {
        writeln!(out, "Snapshot: {}", ts.format("%Y-%m-%d %H:%M UTC"))?;
    }
    writeln!(out)?;

    writeln!(out, "### BIAS & DOL")?;
    writeln!(out, "- Direction: **{}**", b.direction)?;
    writeln!(out, "- DOL: {} ({})", Level(b.dol), b.dol_source)?;
    writeln!(out, "- DOL Status: {}", b.dol_status)?;
    writeln!(out, "- Bias Reason: {}", b.reason)?;
    writeln!(out, "- Price Position: {}", p.price_position())?;
    writeln!(out)?;

    writeln!(out, "### MARKET STRUCTURE")?;
    writeln!(out, "- MSS: **{}**", s.shift)?;
    writeln!(out, "- BOS Bull: {} | BOS Bear: {}", s.bos_bull, s.bos_bear)?;
    writeln!(out, "- CHoCH Bull: {} | CHoCH Bear: {}", s.choch_bull, s.choch_bear)?;
    writeln!(out, "- Displaced: {}", s.displaced)?;
    writeln!(out)?;

    writeln!(out, "### KEY LEVELS")?;
    writeln!(out, "- PDH: {} | PDL: {}", Level(l.pdh), Level(l.pdl))?;
    writeln!(
        out,
        "- Asia: {} - {} (Swept H: {}, Swept L: {})",
        Level(l.asia_h),
        Level(l.asia_l),
        l.asia_swept_h,
        l.asia_swept_l
    )?;
    writeln!(out, "- Dealing Range: {} - {}", Level(l.deal_h), Level(l.deal_l))?;
    writeln!(out, "- Equilibrium: {}", Level(l.eq))?;
    writeln!(out, "- Premium: {} | Discount: {}", Level(l.premium), Level(l.discount))?;
    writeln!(out, "- OTE Zone: {} - {}", Level(l.ote_h), Level(l.ote_l))?;
    writeln!(out, "- IPDA 20D: {} - {}", Level(l.ipda20h), Level(l.ipda20l))?;
    writeln!(out, "- IPDA 40D: {} - {}", Level(l.ipda40h), Level(l.ipda40l))?;
    writeln!(out, "- IPDA 60D: {} - {}", Level(l.ipda60h), Level(l.ipda60l))?;
    writeln!(out)?;

    writeln!(out, "### NARRATIVE ENGINE")?;
    writeln!(out, "- State: **{}** | Direction: {}", n.state, n.direction)?;
    writeln!(out, "- Conviction: **{}%**", n.score)?;
    writeln!(
        out,
        "- Sweep: {} | MSS: {} | Entry Available: {}",
        n.sweep, n.mss, n.entry
    )?;
    writeln!(
        out,
        "- P/D Aligned: {} | Kill Zone: {} | Confirmation: {}",
        n.pd_aligned, n.kz, n.confirm
    )?;
    writeln!(out)?;

    writeln!(out, "### SMART ENTRY")?;
    writeln!(out, "- Found: **{}**", e.found)?;
    writeln!(out, "- Type: {} | Direction: {}", e.kind, e.direction)?;
    writeln!(
        out,
        "- Price: {} (Zone: {} - {})",
        Level(e.price),
        Level(e.bottom),
        Level(e.top)
    )?;
    writeln!(out, "- Score: {}", Price(e.score))?;
    writeln!(out)?;

    writeln!(out, "### ICT MODEL")?;
    writeln!(out, "- Model: **{}**", p.model.name)?;
    writeln!(out, "- Confidence: {}", p.model.confidence)?;
    writeln!(out, "- Flags: {}", p.model.flags)?;
    writeln!(out)?;

    writeln!(out, "### SESSION")?;
    writeln!(out, "- Kill Zone: {}", p.session.kill_zone)?;
    writeln!(out, "- PO3 Phase: {}", p.session.po3)?;
    write!(
        out,
        "- Macro Time: {} | Silver Bullet: {}",
        p.session.macro_time, p.session.silver_bullet
    )
}
