//! User-Scoped Location Cache
//!
//! Keeps the last coordinates each user got a successful forecast for, so a
//! "refresh" can repeat the query without the user resending a location.
//!
//! Architecture:
//! - One entry per user, last write wins
//! - Sharded concurrent map; a user's coordinates are stored as a single
//!   `Copy` value, so readers never see half of an update
//! - No eviction or TTL: the map grows with the number of distinct users and
//!   is dropped with the process

use super::Coordinates;
use crate::Identity;
use dashmap::DashMap;

/// Per-user last-known location.
#[derive(Debug, Default)]
pub struct LocationCache {
    locations: DashMap<Identity, Coordinates>,
}

impl LocationCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store coordinates for a user, replacing whatever was there.
    pub fn save(&self, identity: Identity, coordinates: Coordinates) {
        let previous = self.locations.insert(identity, coordinates);
        if previous.is_none() {
            tracing::debug!("Cached first location for user_id={identity}");
        }
    }

    /// Last saved coordinates for a user, if any.
    pub fn get(&self, identity: Identity) -> Option<Coordinates> {
        self.locations.get(&identity).map(|entry| *entry.value())
    }

    /// Whether the user has a cached location.
    pub fn contains(&self, identity: Identity) -> bool {
        self.locations.contains_key(&identity)
    }

    /// Number of users with a cached location.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// True when no user has a cached location.
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}
