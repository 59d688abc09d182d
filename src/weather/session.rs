//! Pooled HTTP session for forecast requests.
//!
//! A pool of one: [`SessionPool::acquire`] hands out the live session, or
//! opens a fresh one when the previous session was closed or has outlived
//! its maximum age. Callers never see the health check.

use super::ForecastError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Default lifetime of a pooled session before it is replaced.
pub const DEFAULT_SESSION_MAX_AGE: Duration = Duration::from_secs(300);

struct Session {
    client: reqwest::Client,
    opened_at: Instant,
}

/// Single-slot pool of forecast HTTP sessions.
pub struct SessionPool {
    slot: Mutex<Option<Session>>,
    max_age: Duration,
    connect_timeout: Duration,
    opened: AtomicU64,
}

impl SessionPool {
    /// Empty pool; the first [`acquire`](Self::acquire) opens the session.
    pub fn new(max_age: Duration, connect_timeout: Duration) -> Self {
        Self {
            slot: Mutex::new(None),
            max_age,
            connect_timeout,
            opened: AtomicU64::new(0),
        }
    }

    /// Return the live session, opening a new one if needed.
    ///
    /// The returned client is a cheap handle; a session replaced while a
    /// request is in flight is released once that request finishes.
    pub fn acquire(&self) -> Result<reqwest::Client, ForecastError> {
        let mut slot = self.slot.lock();
        if let Some(session) = slot.as_ref() {
            if self.is_healthy(session) {
                return Ok(session.client.clone());
            }
            tracing::debug!("Forecast session expired, reopening");
        }

        let client = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .pool_idle_timeout(self.max_age)
            .user_agent(concat!("weatherbot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ForecastError::Network(format!("failed to build HTTP client: {e}")))?;

        *slot = Some(Session {
            client: client.clone(),
            opened_at: Instant::now(),
        });
        self.opened.fetch_add(1, Ordering::Relaxed);
        tracing::info!("Opened forecast HTTP session");
        Ok(client)
    }

    /// Drop the pooled session. The next [`acquire`](Self::acquire) opens a new one.
    pub fn close(&self) {
        if self.slot.lock().take().is_some() {
            tracing::info!("Forecast HTTP session closed");
        }
    }

    /// Whether a session is currently pooled.
    pub fn is_open(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Number of sessions opened over the pool's lifetime.
    pub fn sessions_opened(&self) -> u64 {
        self.opened.load(Ordering::Relaxed)
    }

    fn is_healthy(&self, session: &Session) -> bool {
        session.opened_at.elapsed() < self.max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(max_age: Duration) -> SessionPool {
        SessionPool::new(max_age, Duration::from_secs(5))
    }

    #[test]
    fn new_pool_has_no_session() {
        let pool = pool(DEFAULT_SESSION_MAX_AGE);
        assert!(!pool.is_open());
        assert_eq!(pool.sessions_opened(), 0);
    }

    #[test]
    fn acquire_reuses_healthy_session() {
        let pool = pool(DEFAULT_SESSION_MAX_AGE);
        pool.acquire().unwrap();
        pool.acquire().unwrap();
        assert!(pool.is_open());
        assert_eq!(pool.sessions_opened(), 1);
    }

    #[test]
    fn acquire_after_close_opens_fresh_session() {
        let pool = pool(DEFAULT_SESSION_MAX_AGE);
        pool.acquire().unwrap();
        pool.close();
        assert!(!pool.is_open());

        pool.acquire().unwrap();
        assert!(pool.is_open());
        assert_eq!(pool.sessions_opened(), 2);
    }

    #[test]
    fn expired_session_is_replaced() {
        let pool = pool(Duration::ZERO);
        pool.acquire().unwrap();
        pool.acquire().unwrap();
        assert_eq!(pool.sessions_opened(), 2);
    }

    #[test]
    fn close_without_session_is_noop() {
        let pool = pool(DEFAULT_SESSION_MAX_AGE);
        pool.close();
        assert!(!pool.is_open());
    }
}
