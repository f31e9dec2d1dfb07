//! Delivery channels for finished analyses.
//!
//! This crate provides:
//! - `Notifier` trait for pluggable, best-effort delivery channels
//! - Discord (webhook embed) and Telegram (bot API) implementations
//! - Summary-card rendering shared by both channels
//! - Dispatcher that fans one alert out to every selected channel

pub mod card;
pub mod discord;
pub mod dispatcher;
pub mod telegram;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_support;

pub use dispatcher::Dispatcher;
pub use traits::{Alert, DeliveryStatus, DispatchResult, Notifier, NotifyError};
