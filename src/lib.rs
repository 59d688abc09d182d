//! weatherbot: a Telegram bot that answers a shared location with the
//! current Yandex.Weather conditions.
//!
//! The query pipeline lives in [`pipeline`]; everything else is either a
//! component it composes ([`access`], [`memory`], [`weather`], [`reply`]) or
//! the surrounding process plumbing ([`config`], [`channels`], [`gateway`],
//! [`observability`]).

pub mod access;
pub mod channels;
pub mod config;
pub mod gateway;
pub mod memory;
pub mod observability;
pub mod pipeline;
pub mod reply;
pub mod weather;

/// Opaque requester identifier assigned by the chat transport (Telegram user id).
pub type Identity = i64;

pub use access::AccessGate;
pub use config::Config;
pub use memory::{Coordinates, LocationCache};
pub use pipeline::{QueryOutcome, QueryPipeline};
pub use reply::{render, RenderedMessage};
pub use weather::{ForecastError, ForecastProvider, Snapshot, YandexWeatherClient};
