use serde::{Deserialize, Serialize};

/// A Glicko-style rating snapshot: a mean skill estimate plus its uncertainty.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Rating {
    pub mean: f64,
    pub deviation: f64,
}

impl Rating {
    pub fn new(mean: f64, deviation: f64) -> Self {
        Self { mean, deviation }
    }

    /// Conservative rating shown to players and used for map-pool banding:
    /// mean minus three deviations.
    pub fn displayed(&self) -> f64 {
        self.mean - 3.0 * self.deviation
    }
}
