//! Identity allow-list.
//!
//! An empty list admits everyone. This is the default for ungated
//! deployments and must stay that way.

use crate::Identity;
use std::collections::HashSet;

/// Admits or rejects a requester before any other work is done for it.
#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    allowed: HashSet<Identity>,
}

impl AccessGate {
    /// Gate admitting only `allowed`; an empty iterator gives an open gate.
    pub fn new(allowed: impl IntoIterator<Item = Identity>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    /// A gate with no allow-list: every identity is admitted.
    pub fn open() -> Self {
        Self::default()
    }

    /// Whether `identity` may use the bot.
    pub fn is_allowed(&self, identity: Identity) -> bool {
        self.allowed.is_empty() || self.allowed.contains(&identity)
    }

    /// True when no allow-list is configured.
    pub fn is_open(&self) -> bool {
        self.allowed.is_empty()
    }

    /// Number of distinct identities on the allow-list.
    pub fn allowed_count(&self) -> usize {
        self.allowed.len()
    }
}
