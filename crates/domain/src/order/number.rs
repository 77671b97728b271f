//! Human-facing order numbers.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Order number of the form `ORD-YYYYMMDD-RRRR`.
///
/// The suffix is random in `1000..=9999`, so two orders placed on the same
/// day can collide. Uniqueness is enforced by the store; callers regenerate
/// on conflict.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Generates a number for an order placed at `placed_at`.
    pub fn generate<R: Rng + ?Sized>(placed_at: DateTime<Utc>, rng: &mut R) -> Self {
        let suffix: u16 = rng.gen_range(1000..=9999);
        Self(format!("ORD-{}-{suffix}", placed_at.format("%Y%m%d")))
    }

    /// Wraps a number read back from storage.
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
