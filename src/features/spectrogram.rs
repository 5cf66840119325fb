//! Magnitude spectrograms
//!
//! Holds a non-negative `(bins, frames)` magnitude matrix together with the
//! centre frequency of every bin and the hop between frames, as produced by
//! an external constant-Q (or STFT) front end.

use crate::error::{Result, TranscriptionError};
use ndarray::{Array2, ArrayView2};

/// Lowest constant-Q bin used for phin recordings (C2)
pub const PHIN_CQT_FMIN: f32 = 65.41;

/// Number of constant-Q bins (five octaves)
pub const PHIN_CQT_BINS: usize = 120;

/// Constant-Q resolution; two bins per semitone for microtonal degrees
pub const PHIN_CQT_BINS_PER_OCTAVE: usize = 24;

/// Log-spaced centre frequencies of a constant-Q transform
///
/// `f[k] = fmin * 2^(k / bins_per_octave)`
pub fn cqt_bin_frequencies(fmin: f32, n_bins: usize, bins_per_octave: usize) -> Vec<f32> {
    let bins_per_octave = bins_per_octave.max(1) as f32;
    (0..n_bins)
        .map(|k| fmin * 2.0f32.powf(k as f32 / bins_per_octave))
        .collect()
}

/// Magnitude time–frequency matrix with its axes
#[derive(Debug, Clone)]
pub struct MagnitudeSpectrogram {
    magnitudes: Array2<f32>,
    bin_frequencies: Vec<f32>,
    hop_duration: f32,
}

impl MagnitudeSpectrogram {
    /// Create a spectrogram
    ///
    /// # Arguments
    ///
    /// * `magnitudes` - Non-negative magnitudes shaped `(bins, frames)`
    /// * `bin_frequencies` - Centre frequency of each bin in Hz
    /// * `hop_duration` - Seconds between frames
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the bin axis does not match `bin_frequencies`, a
    /// magnitude is negative or non-finite, a bin frequency is not positive,
    /// or `hop_duration` is not positive.
    pub fn new(
        magnitudes: Array2<f32>,
        bin_frequencies: Vec<f32>,
        hop_duration: f32,
    ) -> Result<Self> {
        if !hop_duration.is_finite() || hop_duration <= 0.0 {
            return Err(TranscriptionError::InvalidInput(format!(
                "Hop duration must be > 0, got {}",
                hop_duration
            )));
        }

        if magnitudes.nrows() != bin_frequencies.len() {
            return Err(TranscriptionError::InvalidInput(format!(
                "Spectrogram has {} bins but {} bin frequencies were given",
                magnitudes.nrows(),
                bin_frequencies.len()
            )));
        }

        if let Some(bad) = bin_frequencies
            .iter()
            .find(|f| !(f.is_finite() && **f > 0.0))
        {
            return Err(TranscriptionError::InvalidInput(format!(
                "Bin frequencies must be finite and > 0, got {}",
                bad
            )));
        }

        if magnitudes.iter().any(|m| !m.is_finite() || *m < 0.0) {
            return Err(TranscriptionError::InvalidInput(
                "Magnitudes must be finite and non-negative".to_string(),
            ));
        }

        Ok(Self {
            magnitudes,
            bin_frequencies,
            hop_duration,
        })
    }

    /// Magnitudes shaped `(bins, frames)`
    pub fn magnitudes(&self) -> ArrayView2<'_, f32> {
        self.magnitudes.view()
    }

    /// Magnitudes transposed to `(frames, bins)`
    pub fn time_major(&self) -> ArrayView2<'_, f32> {
        self.magnitudes.t()
    }

    /// Bin centre frequencies in Hz
    pub fn bin_frequencies(&self) -> &[f32] {
        &self.bin_frequencies
    }

    /// Seconds between frames
    pub fn hop_duration(&self) -> f32 {
        self.hop_duration
    }

    /// Number of frequency bins
    pub fn n_bins(&self) -> usize {
        self.magnitudes.nrows()
    }

    /// Number of time frames
    pub fn n_frames(&self) -> usize {
        self.magnitudes.ncols()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cqt_bin_frequencies() {
        let bins = cqt_bin_frequencies(PHIN_CQT_FMIN, PHIN_CQT_BINS, PHIN_CQT_BINS_PER_OCTAVE);
        assert_eq!(bins.len(), 120);
        assert_eq!(bins[0], PHIN_CQT_FMIN);
        // One octave up after 24 bins
        assert!((bins[24] - 2.0 * PHIN_CQT_FMIN).abs() < 1e-3);
        assert!(bins.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_shape_validation() {
        let magnitudes = Array2::<f32>::zeros((3, 5));
        assert!(MagnitudeSpectrogram::new(magnitudes.clone(), vec![100.0, 200.0], 0.01).is_err());
        assert!(MagnitudeSpectrogram::new(magnitudes.clone(), vec![100.0, 200.0, 300.0], 0.0).is_err());

        let spectrogram = MagnitudeSpectrogram::new(magnitudes, vec![100.0, 200.0, 300.0], 0.01).unwrap();
        assert_eq!(spectrogram.n_bins(), 3);
        assert_eq!(spectrogram.n_frames(), 5);
        assert_eq!(spectrogram.time_major().dim(), (5, 3));
    }

    #[test]
    fn test_rejects_negative_magnitudes() {
        let mut magnitudes = Array2::<f32>::zeros((2, 2));
        magnitudes[[1, 1]] = -0.5;
        assert!(MagnitudeSpectrogram::new(magnitudes, vec![100.0, 200.0], 0.01).is_err());
    }
}
