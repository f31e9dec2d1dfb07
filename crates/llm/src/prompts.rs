//! Prompt text sent to the analysis provider.

use ict_core::{Payload, Price};

/// Persona and strict output-format contract for the analyst.
pub const ICT_SYSTEM_PROMPT: &str = include_str!("../prompts/ict-analyst-system.md");

/// Templated user block: alert header followed by the formatted indicator report.
pub fn user_prompt(payload: &Payload, summary: &str) -> String {
    format!(
        "Here is the current ICT indicator data. Produce your market breakdown.\n\
         \n\
         **Alert Trigger:** {trigger}\n\
         **Symbol:** {sym} | **Timeframe:** {tf}min | **Current Price:** {px}\n\
         \n\
         {summary}\n\
         \n\
         Analyze based on the indicator data. Produce your ICT market breakdown following the exact output format specified.",
        trigger = payload.trigger,
        sym = payload.symbol,
        tf = payload.timeframe,
        px = Price(payload.price),
    )
}
