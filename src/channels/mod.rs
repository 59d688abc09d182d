//! Chat transports that feed the query pipeline.
//!
//! Only Telegram exists: [`telegram::TelegramChannel`] long-polls the Bot API
//! and turns locations and refresh-button presses into pipeline queries.

pub mod telegram;

pub use telegram::TelegramChannel;
