//! Seven-degree phin scale
//!
//! Defines the scale degrees, the degree → ratio tuning table and the
//! quantizer that snaps frequencies onto it.
//!
//! The tuning is a value, not a global: callers can build alternative
//! seven-degree tunings with [`ScaleTuning::new`] and hand them to a
//! [`ScaleQuantizer`].

pub mod quantizer;

pub use quantizer::{QuantizedPitch, ScaleQuantizer};

use crate::error::{Result, TranscriptionError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of degrees in the scale
pub const DEGREE_COUNT: usize = 7;

/// Default phin ratios relative to the tonic
pub const PHIN_RATIOS: [f32; DEGREE_COUNT] = [1.0, 1.125, 1.25, 1.333, 1.5, 1.667, 1.789];

/// Degree whose ratio (3/2) anchors the table to the reference frequency
pub const PHIN_PIVOT: u8 = 4;

const DEGREE_NAMES: [&str; DEGREE_COUNT] = [
    "tonic", "second", "third", "fourth", "fifth", "sixth", "seventh",
];

/// Zero-based scale degree (0-6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ScaleDegree(u8);

impl ScaleDegree {
    /// Degree 0
    pub const TONIC: ScaleDegree = ScaleDegree(0);

    /// Degree 4, the default pivot
    pub const FIFTH: ScaleDegree = ScaleDegree(PHIN_PIVOT);

    /// Create a degree, `None` if `index >= 7`
    pub fn new(index: u8) -> Option<Self> {
        if (index as usize) < DEGREE_COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Zero-based index into a ratio table
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Traditional degree name ("tonic", "second", ...)
    pub fn name(self) -> &'static str {
        DEGREE_NAMES[self.index()]
    }

    /// All seven degrees in ascending order
    pub fn all() -> impl Iterator<Item = ScaleDegree> {
        (0..DEGREE_COUNT as u8).map(ScaleDegree)
    }
}

impl TryFrom<u8> for ScaleDegree {
    type Error = TranscriptionError;

    fn try_from(value: u8) -> Result<Self> {
        ScaleDegree::new(value).ok_or_else(|| {
            TranscriptionError::InvalidInput(format!(
                "Scale degree must be in 0..{}, got {}",
                DEGREE_COUNT, value
            ))
        })
    }
}

impl From<ScaleDegree> for u8 {
    fn from(degree: ScaleDegree) -> u8 {
        degree.0
    }
}

impl fmt::Display for ScaleDegree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0, self.name())
    }
}

/// How frequencies outside the reference octave are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OctaveMode {
    /// Compare against the seven single-octave candidates in absolute Hz
    #[default]
    Unfolded,

    /// Fold the input into the reference octave and pick the degree nearest in cents
    Folded,
}

/// Immutable degree → ratio table
///
/// Invariants (checked by [`ScaleTuning::new`]):
/// - exactly seven finite ratios
/// - `ratios[0] == 1.0`
/// - strictly increasing, and below 2.0 so the table spans one octave
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleTuning {
    ratios: [f32; DEGREE_COUNT],
    pivot: ScaleDegree,
}

impl ScaleTuning {
    /// Create a tuning from a ratio table and the pivot degree
    ///
    /// # Errors
    ///
    /// Returns `TranscriptionError::InvalidInput` if the table violates any
    /// of the invariants listed on the type.
    pub fn new(ratios: [f32; DEGREE_COUNT], pivot: ScaleDegree) -> Result<Self> {
        if ratios[0] != 1.0 {
            return Err(TranscriptionError::InvalidInput(format!(
                "Tonic ratio must be 1.0, got {}",
                ratios[0]
            )));
        }

        for (i, pair) in ratios.windows(2).enumerate() {
            if !pair[1].is_finite() || pair[1] <= pair[0] {
                return Err(TranscriptionError::InvalidInput(format!(
                    "Ratios must be strictly increasing: ratio[{}]={} ratio[{}]={}",
                    i,
                    pair[0],
                    i + 1,
                    pair[1]
                )));
            }
        }

        if ratios[DEGREE_COUNT - 1] >= 2.0 {
            return Err(TranscriptionError::InvalidInput(format!(
                "Highest ratio must stay below the octave (2.0), got {}",
                ratios[DEGREE_COUNT - 1]
            )));
        }

        Ok(Self { ratios, pivot })
    }

    /// The traditional phin tuning, pivoted on the fifth (ratio 1.5)
    pub fn phin() -> Self {
        Self {
            ratios: PHIN_RATIOS,
            pivot: ScaleDegree::FIFTH,
        }
    }

    /// Ratio for one degree
    pub fn ratio(&self, degree: ScaleDegree) -> f32 {
        self.ratios[degree.index()]
    }

    /// Full ratio table
    pub fn ratios(&self) -> &[f32; DEGREE_COUNT] {
        &self.ratios
    }

    /// Pivot degree
    pub fn pivot(&self) -> ScaleDegree {
        self.pivot
    }

    /// Canonical frequency of `degree` when the pivot sits at `reference_hz`
    ///
    /// `reference_hz * ratio[degree] / ratio[pivot]`
    pub fn degree_frequency(&self, degree: ScaleDegree, reference_hz: f32) -> f32 {
        reference_hz * self.ratios[degree.index()] / self.ratios[self.pivot.index()]
    }
}

impl Default for ScaleTuning {
    fn default() -> Self {
        Self::phin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phin_table_invariants() {
        let tuning = ScaleTuning::phin();
        assert_eq!(tuning.ratios().len(), DEGREE_COUNT);
        assert_eq!(tuning.ratio(ScaleDegree::TONIC), 1.0);
        assert_eq!(tuning.ratio(tuning.pivot()), 1.5);
        for pair in tuning.ratios().windows(2) {
            assert!(pair[1] > pair[0]);
        }
        // The default table passes its own validation
        assert!(ScaleTuning::new(PHIN_RATIOS, ScaleDegree::FIFTH).is_ok());
    }

    #[test]
    fn test_tuning_rejects_bad_tables() {
        let not_unit = [1.1, 1.2, 1.3, 1.4, 1.5, 1.6, 1.7];
        assert!(ScaleTuning::new(not_unit, ScaleDegree::FIFTH).is_err());

        let not_increasing = [1.0, 1.2, 1.2, 1.4, 1.5, 1.6, 1.7];
        assert!(ScaleTuning::new(not_increasing, ScaleDegree::FIFTH).is_err());

        let past_octave = [1.0, 1.2, 1.3, 1.4, 1.5, 1.6, 2.1];
        assert!(ScaleTuning::new(past_octave, ScaleDegree::FIFTH).is_err());

        let nan = [1.0, 1.2, f32::NAN, 1.4, 1.5, 1.6, 1.7];
        assert!(ScaleTuning::new(nan, ScaleDegree::FIFTH).is_err());
    }

    #[test]
    fn test_degree_bounds_and_names() {
        assert!(ScaleDegree::new(6).is_some());
        assert!(ScaleDegree::new(7).is_none());
        assert_eq!(ScaleDegree::FIFTH.name(), "fifth");
        assert_eq!(ScaleDegree::all().count(), 7);
        assert!(ScaleDegree::try_from(9u8).is_err());
    }

    #[test]
    fn test_degree_frequency_uses_pivot() {
        let tuning = ScaleTuning::phin();
        let fifth = tuning.degree_frequency(ScaleDegree::FIFTH, 440.0);
        assert_eq!(fifth, 440.0);
        let tonic = tuning.degree_frequency(ScaleDegree::TONIC, 440.0);
        assert!((tonic - 293.333).abs() < 0.01);
    }

    #[test]
    fn test_degree_serde_rejects_out_of_range() {
        let degree: ScaleDegree = serde_json::from_str("3").unwrap();
        assert_eq!(degree.index(), 3);
        assert!(serde_json::from_str::<ScaleDegree>("12").is_err());
    }
}
