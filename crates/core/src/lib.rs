pub mod config;
mod de;
pub mod error;
pub mod format;
pub mod payload;

pub use config::Config;
pub use error::*;
pub use format::{format_payload, Price, PricePosition};
pub use payload::*;
