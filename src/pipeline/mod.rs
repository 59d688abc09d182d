//! Query pipeline: gate → resolve coordinates → fetch → cache → render.
//!
//! Every inbound query runs through [`QueryPipeline`] independently; the
//! only shared mutable state is the [`LocationCache`], which is written only
//! after a successful fetch.

use crate::access::AccessGate;
use crate::memory::{Coordinates, LocationCache};
use crate::observability::Metrics;
use crate::reply::{render, RenderedMessage, Reply};
use crate::weather::{ForecastError, ForecastProvider};
use crate::Identity;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

pub const ACCESS_DENIED_NOTICE: &str = "⛔ У вас нет доступа к этому боту.";

pub const NO_LOCATION_NOTICE: &str =
    "📍 Я ещё не знаю вашего местоположения. Отправьте геолокацию, чтобы получить прогноз.";

/// Where a query is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    Received,
    Gated,
    Resolving,
    Fetching,
    Formatting,
    Delivered,
    Aborted,
}

impl QueryStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Gated => "gated",
            Self::Resolving => "resolving",
            Self::Fetching => "fetching",
            Self::Formatting => "formatting",
            Self::Delivered => "delivered",
            Self::Aborted => "aborted",
        }
    }
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("user {0} is not on the allow-list")]
    AccessDenied(Identity),

    #[error("no cached location for user {0}")]
    NoCachedLocation(Identity),

    #[error(transparent)]
    Forecast(#[from] ForecastError),
}

impl QueryError {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AccessDenied(_) => "access_denied",
            Self::NoCachedLocation(_) => "no_cached_location",
            Self::Forecast(e) => e.kind(),
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::AccessDenied(_) => ACCESS_DENIED_NOTICE,
            Self::NoCachedLocation(_) => NO_LOCATION_NOTICE,
            Self::Forecast(e) => e.user_message(),
        }
    }
}

/// Result of one query.
#[derive(Debug)]
pub enum QueryOutcome {
    Delivered(RenderedMessage),
    Aborted {
        /// Stage at which the query stopped.
        stage: QueryStage,
        error: QueryError,
        notice: Reply,
    },
}

impl QueryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered(_))
    }

    pub fn error(&self) -> Option<&QueryError> {
        match self {
            Self::Delivered(_) => None,
            Self::Aborted { error, .. } => Some(error),
        }
    }

    /// The message to hand to the transport.
    pub fn into_reply(self) -> Reply {
        match self {
            Self::Delivered(message) => message.into(),
            Self::Aborted { notice, .. } => notice,
        }
    }
}

pub struct QueryPipeline {
    gate: AccessGate,
    cache: Arc<LocationCache>,
    provider: Arc<dyn ForecastProvider>,
    metrics: Option<Arc<Metrics>>,
}

impl QueryPipeline {
    pub fn new(
        gate: AccessGate,
        cache: Arc<LocationCache>,
        provider: Arc<dyn ForecastProvider>,
    ) -> Self {
        Self {
            gate,
            cache,
            provider,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Allow-list shared with the transport for non-query messages.
    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }

    /// Last-known locations.
    pub fn cache(&self) -> &Arc<LocationCache> {
        &self.cache
    }

    /// A user shared coordinates.
    pub async fn handle_location(
        &self,
        identity: Identity,
        coordinates: Coordinates,
    ) -> QueryOutcome {
        self.run(identity, Some(coordinates)).await
    }

    /// A user asked to repeat their last successful query.
    pub async fn handle_refresh(&self, identity: Identity) -> QueryOutcome {
        self.run(identity, None).await
    }

    #[tracing::instrument(name = "query", skip(self, explicit), fields(user_id = identity))]
    async fn run(&self, identity: Identity, explicit: Option<Coordinates>) -> QueryOutcome {
        tracing::debug!(
            stage = QueryStage::Received.as_str(),
            refresh = explicit.is_none()
        );

        if !self.gate.is_allowed(identity) {
            return self.abort(
                QueryStage::Gated,
                QueryError::AccessDenied(identity),
                Reply::notice(ACCESS_DENIED_NOTICE),
            );
        }

        let coordinates = match explicit.or_else(|| self.cache.get(identity)) {
            Some(coordinates) => coordinates,
            None => {
                return self.abort(
                    QueryStage::Resolving,
                    QueryError::NoCachedLocation(identity),
                    Reply::notice(NO_LOCATION_NOTICE),
                )
            }
        };

        let started = Instant::now();
        let fetched = self.provider.fetch(coordinates).await;
        if let Some(metrics) = &self.metrics {
            metrics.observe_forecast_latency(started.elapsed().as_secs_f64());
        }

        let snapshot = match fetched {
            Ok(snapshot) => snapshot,
            Err(e) => {
                // Only offer a retry button when a refresh has something to use.
                let mut notice = Reply::notice(e.user_message());
                if self.cache.contains(identity) {
                    notice = notice.with_refresh();
                }
                return self.abort(QueryStage::Fetching, e.into(), notice);
            }
        };

        self.cache.save(identity, coordinates);

        tracing::debug!(stage = QueryStage::Formatting.as_str());
        let message = render(Some(&snapshot));

        if let Some(metrics) = &self.metrics {
            metrics.record_outcome(QueryStage::Delivered.as_str());
            metrics.set_cached_locations(self.cache.len());
        }
        tracing::info!(
            stage = QueryStage::Delivered.as_str(),
            "Forecast delivered for {coordinates}"
        );
        QueryOutcome::Delivered(message)
    }

    fn abort(&self, stage: QueryStage, error: QueryError, notice: Reply) -> QueryOutcome {
        tracing::warn!(
            stage = stage.as_str(),
            kind = error.kind(),
            "Query aborted: {error}"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_outcome(error.kind());
        }
        QueryOutcome::Aborted {
            stage,
            error,
            notice,
        }
    }
}
