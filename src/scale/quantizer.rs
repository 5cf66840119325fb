//! Scale quantization
//!
//! Maps a raw fundamental-frequency estimate onto the nearest degree of a
//! [`ScaleTuning`].
//!
//! In the default [`OctaveMode::Unfolded`] mode the input is compared, in
//! absolute Hz, against only the seven single-octave candidate frequencies.
//! A bass note an octave below the reference therefore snaps to the lowest
//! candidate rather than to the musically matching degree.
//! [`OctaveMode::Folded`] is the opt-in alternative.
//!
//! # Example
//!
//! ```
//! use phin_transcription::scale::ScaleQuantizer;
//!
//! let quantizer = ScaleQuantizer::default();
//! let q = quantizer.quantize(300.0)?;
//! assert_eq!(q.degree.index(), 0);
//! assert!((q.frequency - 293.33).abs() < 0.01);
//! # Ok::<(), phin_transcription::TranscriptionError>(())
//! ```

use super::{OctaveMode, ScaleDegree, ScaleTuning, DEGREE_COUNT};
use crate::config::ScaleConfig;
use crate::error::{Result, TranscriptionError};
use serde::{Deserialize, Serialize};

/// Result of quantizing one frequency
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantizedPitch {
    /// Canonical frequency of the chosen degree (shifted by `octave` when folding)
    pub frequency: f32,

    /// Chosen scale degree
    pub degree: ScaleDegree,

    /// Octave offset from the reference octave (always 0 when unfolded)
    pub octave: i32,
}

/// Stateless quantizer over a fixed tuning and reference frequency
///
/// Cheap to clone and safe to share read-only across threads.
#[derive(Debug, Clone)]
pub struct ScaleQuantizer {
    tuning: ScaleTuning,
    reference_hz: f32,
    octave_mode: OctaveMode,
    adherence_tolerance: f32,
    degree_frequencies: [f32; DEGREE_COUNT],
}

/// Canonical frequency of every degree with the pivot at `reference_hz`
fn degree_table(tuning: &ScaleTuning, reference_hz: f32) -> [f32; DEGREE_COUNT] {
    let mut degree_frequencies = [0.0; DEGREE_COUNT];
    for degree in ScaleDegree::all() {
        degree_frequencies[degree.index()] = tuning.degree_frequency(degree, reference_hz);
    }
    degree_frequencies
}

fn validate_frequency(frequency: f32) -> Result<f32> {
    if frequency.is_finite() && frequency > 0.0 {
        Ok(frequency)
    } else {
        Err(TranscriptionError::InvalidFrequency(frequency))
    }
}

impl ScaleQuantizer {
    /// Create a quantizer whose pivot degree sits at `reference_hz`
    ///
    /// # Errors
    ///
    /// `InvalidFrequency` if `reference_hz` is not finite and positive.
    pub fn new(tuning: ScaleTuning, reference_hz: f32) -> Result<Self> {
        let reference_hz = validate_frequency(reference_hz)?;
        Ok(Self {
            degree_frequencies: degree_table(&tuning, reference_hz),
            tuning,
            reference_hz,
            octave_mode: OctaveMode::Unfolded,
            adherence_tolerance: 0.05,
        })
    }

    /// Create a quantizer whose tonic (degree 0) sits at `tonic_hz`
    ///
    /// Degree frequencies are `tonic_hz * ratio[degree]`.
    pub fn with_tonic(tuning: ScaleTuning, tonic_hz: f32) -> Result<Self> {
        let tonic_hz = validate_frequency(tonic_hz)?;
        let reference_hz = tonic_hz * tuning.ratio(tuning.pivot());
        let mut quantizer = Self::new(tuning, reference_hz)?;
        for degree in ScaleDegree::all() {
            quantizer.degree_frequencies[degree.index()] =
                tonic_hz * quantizer.tuning.ratio(degree);
        }
        Ok(quantizer)
    }

    /// Build the phin-tuned quantizer described by `config`
    pub fn from_config(config: &ScaleConfig) -> Result<Self> {
        Ok(Self::new(ScaleTuning::phin(), config.reference_hz)?
            .with_octave_mode(config.octave_mode)
            .with_adherence_tolerance(config.adherence_tolerance))
    }

    /// Switch octave handling
    pub fn with_octave_mode(mut self, mode: OctaveMode) -> Self {
        self.octave_mode = mode;
        self
    }

    /// Change the relative tolerance used by the adherence checks
    pub fn with_adherence_tolerance(mut self, tolerance: f32) -> Self {
        self.adherence_tolerance = tolerance.max(0.0);
        self
    }

    /// Tuning table in use
    pub fn tuning(&self) -> &ScaleTuning {
        &self.tuning
    }

    /// Frequency of the pivot degree
    pub fn reference_hz(&self) -> f32 {
        self.reference_hz
    }

    /// Octave handling mode
    pub fn octave_mode(&self) -> OctaveMode {
        self.octave_mode
    }

    /// Relative adherence tolerance
    pub fn adherence_tolerance(&self) -> f32 {
        self.adherence_tolerance
    }

    /// Canonical frequencies of all seven degrees in the reference octave
    pub fn degree_frequencies(&self) -> &[f32; DEGREE_COUNT] {
        &self.degree_frequencies
    }

    /// Canonical frequency of one degree in the reference octave
    pub fn canonical_frequency(&self, degree: ScaleDegree) -> f32 {
        self.degree_frequencies[degree.index()]
    }

    /// Quantize a frequency to the nearest scale degree
    ///
    /// Ties go to the lower degree.
    ///
    /// # Errors
    ///
    /// `InvalidFrequency` if `frequency` is not finite and positive.
    pub fn quantize(&self, frequency: f32) -> Result<QuantizedPitch> {
        let frequency = validate_frequency(frequency)?;
        Ok(match self.octave_mode {
            OctaveMode::Unfolded => self.quantize_unfolded(frequency),
            OctaveMode::Folded => self.quantize_folded(frequency),
        })
    }

    fn quantize_unfolded(&self, frequency: f32) -> QuantizedPitch {
        let mut best = 0;
        let mut min_difference = f32::INFINITY;
        for (i, &candidate) in self.degree_frequencies.iter().enumerate() {
            let difference = (candidate - frequency).abs();
            if difference < min_difference {
                min_difference = difference;
                best = i;
            }
        }

        QuantizedPitch {
            frequency: self.degree_frequencies[best],
            degree: ScaleDegree(best as u8),
            octave: 0,
        }
    }

    fn quantize_folded(&self, frequency: f32) -> QuantizedPitch {
        let base = self.degree_frequencies[0];
        let octave = (frequency / base).log2().floor() as i32;
        let folded = frequency / 2.0f32.powi(octave);

        // The tonic one octave up competes with the seventh degree
        let wrapped_tonic = (2.0 * base, 0usize, 1i32);
        let candidates = self
            .degree_frequencies
            .iter()
            .enumerate()
            .map(|(i, &f)| (f, i, 0i32))
            .chain(std::iter::once(wrapped_tonic));

        let mut best = (self.degree_frequencies[0], 0usize, 0i32);
        let mut min_cents = f32::INFINITY;
        for (candidate, index, shift) in candidates {
            let cents = (folded / candidate).log2().abs();
            if cents < min_cents {
                min_cents = cents;
                best = (candidate, index, shift);
            }
        }

        let (candidate, index, shift) = best;
        QuantizedPitch {
            frequency: candidate * 2.0f32.powi(octave),
            degree: ScaleDegree(index as u8),
            octave: octave + shift,
        }
    }

    /// `|f - quantize(f)| / f`
    pub fn relative_deviation(&self, frequency: f32) -> Result<f32> {
        let quantized = self.quantize(frequency)?;
        Ok((frequency - quantized.frequency).abs() / frequency)
    }

    /// True iff the relative deviation is within the adherence tolerance
    pub fn is_scale_adherent(&self, frequency: f32) -> Result<bool> {
        Ok(self.relative_deviation(frequency)? <= self.adherence_tolerance)
    }

    /// Fraction of `frequencies` that are scale adherent
    ///
    /// Returns 0.0 for an empty slice.
    ///
    /// # Errors
    ///
    /// `InvalidFrequency` on the first non-positive or non-finite entry.
    pub fn scale_adherence(&self, frequencies: &[f32]) -> Result<f32> {
        if frequencies.is_empty() {
            return Ok(0.0);
        }

        let mut adherent = 0usize;
        for &frequency in frequencies {
            if self.is_scale_adherent(frequency)? {
                adherent += 1;
            }
        }

        Ok(adherent as f32 / frequencies.len() as f32)
    }
}

impl Default for ScaleQuantizer {
    fn default() -> Self {
        let tuning = ScaleTuning::phin();
        Self {
            degree_frequencies: degree_table(&tuning, 440.0),
            tuning,
            reference_hz: 440.0,
            octave_mode: OctaveMode::Unfolded,
            adherence_tolerance: 0.05,
        }
    }
}
