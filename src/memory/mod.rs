//! Process-lifetime memory of where each user last asked about.
//!
//! Nothing here survives a restart.

pub mod locations;

pub use locations::LocationCache;

/// A latitude/longitude pair as received from the chat transport.
///
/// No range validation happens here; the forecast provider decides what it
/// accepts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Coordinates in decimal degrees.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "lat={}, lon={}", self.latitude, self.longitude)
    }
}
