//! Forecast provider abstraction.
//!
//! Defines the [`ForecastProvider`] trait, the [`Snapshot`] shape every
//! provider returns, and the [`ForecastError`] classification the pipeline
//! turns into user-facing notices. One provider exists:
//!
//! - [`yandex::YandexWeatherClient`]: Yandex.Weather REST API (requires `YANDEX_WEATHER_API_KEY`)

pub mod session;
pub mod yandex;

pub use yandex::YandexWeatherClient;

use crate::memory::Coordinates;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Why a forecast could not be fetched.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("provider rejected the API key")]
    Auth,

    #[error("provider has no data for these coordinates")]
    NotFound,

    #[error("provider internal error")]
    ProviderUnavailable,

    #[error("unexpected response status {0}")]
    UnexpectedStatus(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("no response within the request budget")]
    Timeout,
}

impl ForecastError {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::NotFound => "not_found",
            Self::ProviderUnavailable => "provider_unavailable",
            Self::UnexpectedStatus(_) => "unexpected_status",
            Self::Network(_) => "network",
            Self::Timeout => "timeout",
        }
    }

    /// Notice shown to the user. Carries no status codes or transport detail.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Auth | Self::UnexpectedStatus(_) => {
                "⚠️ Ошибка сервиса погоды. Попробуйте позже."
            }
            Self::NotFound => "📍 Не удалось найти погоду для указанной локации.",
            Self::ProviderUnavailable => "⚠️ Сервис погоды временно недоступен. Попробуйте позже.",
            Self::Network(_) => "📡 Не удалось подключиться к сервису погоды. Попробуйте позже.",
            Self::Timeout => "⏱ Сервис погоды не ответил вовремя. Попробуйте позже.",
        }
    }
}

/// One provider response for a single coordinate query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub fact: Option<Fact>,
}

/// Current conditions. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fact {
    pub temp: Option<f64>,
    pub feels_like: Option<f64>,
    pub condition: Option<String>,
    pub wind_speed: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure_mm: Option<f64>,
}

impl Snapshot {
    /// Decode a provider body without failing: fields of the wrong type, or
    /// non-finite numbers, are treated as absent.
    pub fn from_value(body: &Value) -> Self {
        let fact = body
            .get("fact")
            .filter(|fact| fact.is_object())
            .map(Fact::from_value);
        Self { fact }
    }
}

impl Fact {
    fn from_value(fact: &Value) -> Self {
        let number = |key: &str| fact[key].as_f64().filter(|v| v.is_finite());
        Self {
            temp: number("temp"),
            feels_like: number("feels_like"),
            condition: fact["condition"].as_str().map(str::to_string),
            wind_speed: number("wind_speed"),
            humidity: number("humidity"),
            pressure_mm: number("pressure_mm"),
        }
    }
}

/// Provider-agnostic forecast interface.
///
/// Implementations issue exactly one outbound request per [`fetch`] call and
/// never retry on their own.
///
/// [`fetch`]: ForecastProvider::fetch
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    /// Short provider name used in logs.
    fn name(&self) -> &str;

    /// Fetch current conditions for the given coordinates.
    async fn fetch(&self, coordinates: Coordinates) -> Result<Snapshot, ForecastError>;

    /// Release any pooled connection resources. The provider stays usable.
    async fn close(&self) {}
}
