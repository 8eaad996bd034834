//! Emission tier classification.
//!
//! A fixed threshold ladder. Each threshold belongs to the upper tier:
//! 200.0 g/km is Medium and 300.0 g/km is High.

use crate::domain::EmissionTier;

/// Lowest value classified as [`EmissionTier::Medium`].
pub const MEDIUM_THRESHOLD: f64 = 200.0;

/// Lowest value classified as [`EmissionTier::High`].
pub const HIGH_THRESHOLD: f64 = 300.0;

/// Map a CO2 estimate (g/km) to its tier.
pub fn classify(value: f64) -> EmissionTier {
    if value < MEDIUM_THRESHOLD {
        EmissionTier::Low
    } else if value < HIGH_THRESHOLD {
        EmissionTier::Medium
    } else {
        EmissionTier::High
    }
}
