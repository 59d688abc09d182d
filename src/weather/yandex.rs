//! Yandex.Weather provider: HTTP client for the forecast REST API.

use super::session::{SessionPool, DEFAULT_SESSION_MAX_AGE};
use super::{ForecastError, ForecastProvider, Snapshot};
use crate::config::ForecastConfig;
use crate::memory::Coordinates;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::{Duration, Instant};

/// Forecast endpoint of the Yandex.Weather API.
pub const YANDEX_WEATHER_API: &str = "https://api.weather.yandex.ru/v2/forecast";

/// Absolute budget for one request, from dispatch to a fully read body.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_LANG: &str = "ru_RU";

const API_KEY_HEADER: &str = "X-Yandex-API-Key";

pub struct YandexWeatherClient {
    api_key: String,
    api_url: String,
    lang: String,
    timeout: Duration,
    session_max_age: Duration,
    sessions: SessionPool,
}

impl YandexWeatherClient {
    /// Client for the public endpoint with the default language and 5 s budget.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: YANDEX_WEATHER_API.to_string(),
            lang: DEFAULT_LANG.to_string(),
            timeout: REQUEST_TIMEOUT,
            session_max_age: DEFAULT_SESSION_MAX_AGE,
            sessions: SessionPool::new(DEFAULT_SESSION_MAX_AGE, REQUEST_TIMEOUT),
        }
    }

    /// Client configured from the `[forecast]` table.
    pub fn from_config(api_key: impl Into<String>, config: &ForecastConfig) -> Self {
        Self::new(api_key)
            .with_api_url(&config.api_url)
            .with_lang(&config.lang)
            .with_timeout(Duration::from_secs(config.timeout_secs))
            .with_session_max_age(Duration::from_secs(config.session_max_age_secs))
    }

    /// Override the forecast endpoint URL.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Override the `lang` query parameter.
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    /// Whole-request budget. Resets the session pool.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.sessions = SessionPool::new(self.session_max_age, timeout);
        self
    }

    /// How long a pooled session is reused. Resets the session pool.
    pub fn with_session_max_age(mut self, max_age: Duration) -> Self {
        self.session_max_age = max_age;
        self.sessions = SessionPool::new(max_age, self.timeout);
        self
    }

    /// The pooled HTTP session.
    pub fn sessions(&self) -> &SessionPool {
        &self.sessions
    }

    async fn request(
        &self,
        http: &reqwest::Client,
        coordinates: Coordinates,
    ) -> Result<Snapshot, ForecastError> {
        let resp = http
            .get(&self.api_url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(&[
                ("lat", coordinates.latitude.to_string()),
                ("lon", coordinates.longitude.to_string()),
                ("lang", self.lang.clone()),
                ("limit", "1".to_string()),
                ("hours", "false".to_string()),
                ("extra", "false".to_string()),
            ])
            .send()
            .await
            .map_err(classify_transport_error)?;

        match resp.status() {
            StatusCode::OK => {
                let body = resp.text().await.map_err(classify_transport_error)?;
                let parsed: serde_json::Value = serde_json::from_str(&body)
                    .map_err(|e| ForecastError::Network(format!("invalid JSON body: {e}")))?;
                Ok(Snapshot::from_value(&parsed))
            }
            StatusCode::FORBIDDEN => Err(ForecastError::Auth),
            StatusCode::NOT_FOUND => Err(ForecastError::NotFound),
            StatusCode::INTERNAL_SERVER_ERROR => Err(ForecastError::ProviderUnavailable),
            other => Err(ForecastError::UnexpectedStatus(other.as_u16())),
        }
    }
}

fn classify_transport_error(err: reqwest::Error) -> ForecastError {
    if err.is_timeout() {
        ForecastError::Timeout
    } else {
        ForecastError::Network(err.to_string())
    }
}

#[async_trait]
impl ForecastProvider for YandexWeatherClient {
    fn name(&self) -> &str {
        "yandex"
    }

    async fn fetch(&self, coordinates: Coordinates) -> Result<Snapshot, ForecastError> {
        tracing::info!("Requesting forecast for {coordinates}");
        let http = self.sessions.acquire()?;
        let started = Instant::now();

        let result = match tokio::time::timeout(self.timeout, self.request(&http, coordinates)).await
        {
            Ok(result) => result,
            Err(_) => Err(ForecastError::Timeout),
        };

        match &result {
            Ok(_) => tracing::info!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Forecast received"
            ),
            Err(ForecastError::Auth) => {
                tracing::error!("Yandex.Weather rejected the API key (403)")
            }
            Err(ForecastError::NotFound) => {
                tracing::error!("No forecast for {coordinates} (404)")
            }
            Err(ForecastError::ProviderUnavailable) => {
                tracing::error!("Yandex.Weather internal server error (500)")
            }
            Err(ForecastError::UnexpectedStatus(code)) => {
                tracing::error!("Unexpected forecast response status: {code}")
            }
            Err(ForecastError::Network(detail)) => {
                tracing::error!("Network error while requesting forecast: {detail}")
            }
            Err(ForecastError::Timeout) => tracing::error!(
                "Forecast request exceeded {} ms",
                self.timeout.as_millis()
            ),
        }
        result
    }

    async fn close(&self) {
        self.sessions.close();
    }
}
