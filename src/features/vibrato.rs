//! Vibrato detection on pitch contours
//!
//! Algorithm:
//! 1. Collect voiced frequencies and convert them to cents around their mean
//! 2. Remove the linear trend (glides, slow drift)
//! 3. FFT the detrended cents; the strongest bin inside the vibrato band
//!    gives the rate
//! 4. The standard deviation of the detrended cents gives the extent
//!
//! Vibrato is reported as present when the extent is audible and the band
//! peak dominates the modulation spectrum.

use super::contour::FrequencyContour;
use crate::config::VibratoConfig;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};

/// Band peak must reach this fraction of the strongest non-DC bin
const BAND_DOMINANCE: f32 = 0.5;

/// Vibrato estimate for one contour
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VibratoAnalysis {
    /// True if periodic pitch modulation was found in the vibrato band
    pub present: bool,

    /// Modulation rate in Hz (0.0 when no band peak exists)
    pub rate_hz: f32,

    /// Standard deviation of the detrended pitch in cents
    pub extent_cents: f32,

    /// Number of voiced frames analysed
    pub voiced_frames: usize,
}

/// Subtract the least-squares line from `values` in place
fn detrend(values: &mut [f32]) {
    let n = values.len() as f32;
    if values.len() < 2 {
        return;
    }

    let mean_x = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f32>() / n;
    let mut covariance = 0.0f32;
    let mut variance = 0.0f32;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f32 - mean_x;
        covariance += dx * (y - mean_y);
        variance += dx * dx;
    }
    let slope = if variance > 0.0 { covariance / variance } else { 0.0 };

    for (i, y) in values.iter_mut().enumerate() {
        *y -= mean_y + slope * (i as f32 - mean_x);
    }
}

/// Detect vibrato in the voiced part of a contour
///
/// # Arguments
///
/// * `contour` - Pitch contour
/// * `voicing_threshold` - Minimum voiced probability for a frame to count
/// * `config` - Band limits and detection thresholds
///
/// # Returns
///
/// `VibratoAnalysis` with `present = false` when fewer than
/// `config.min_frames` voiced frames exist or the band lies above Nyquist.
///
/// Voiced frames are concatenated across unvoiced gaps.
pub fn detect_vibrato(
    contour: &FrequencyContour,
    voicing_threshold: f32,
    config: &VibratoConfig,
) -> VibratoAnalysis {
    let frequencies = contour.voiced_frequencies(voicing_threshold);
    let voiced_frames = frequencies.len();
    log::debug!(
        "Vibrato analysis: {} voiced frames, band {:.1}-{:.1} Hz",
        voiced_frames,
        config.min_rate_hz,
        config.max_rate_hz
    );

    let absent = VibratoAnalysis {
        voiced_frames,
        ..VibratoAnalysis::default()
    };

    if voiced_frames < config.min_frames.max(4) {
        return absent;
    }

    let mean_log = frequencies.iter().map(|f| f.log2()).sum::<f32>() / voiced_frames as f32;
    let mut cents: Vec<f32> = frequencies
        .iter()
        .map(|f| 1200.0 * (f.log2() - mean_log))
        .collect();
    detrend(&mut cents);

    let extent_cents =
        (cents.iter().map(|c| c * c).sum::<f32>() / voiced_frames as f32).sqrt();

    let mut buffer: Vec<Complex<f32>> = cents.iter().map(|&c| Complex::new(c, 0.0)).collect();
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(voiced_frames);
    fft.process(&mut buffer);

    let frame_rate = 1.0 / contour.hop_duration();
    let bin_hz = frame_rate / voiced_frames as f32;
    let half = voiced_frames / 2;

    let mut strongest = 0.0f32;
    let mut band_peak: Option<(usize, f32)> = None;
    for (k, value) in buffer.iter().enumerate().take(half + 1).skip(1) {
        let magnitude = value.norm();
        strongest = strongest.max(magnitude);

        let frequency = k as f32 * bin_hz;
        if frequency >= config.min_rate_hz && frequency <= config.max_rate_hz {
            match band_peak {
                Some((_, best)) if magnitude <= best => {}
                _ => band_peak = Some((k, magnitude)),
            }
        }
    }

    let (rate_hz, present) = match band_peak {
        Some((k, magnitude)) => (
            k as f32 * bin_hz,
            magnitude > 0.0
                && magnitude >= BAND_DOMINANCE * strongest
                && extent_cents >= config.min_extent_cents,
        ),
        None => {
            log::debug!("No FFT bin inside the vibrato band");
            (0.0, false)
        }
    };

    log::debug!(
        "Vibrato: present={}, rate={:.2} Hz, extent={:.1} cents",
        present,
        rate_hz,
        extent_cents
    );

    VibratoAnalysis {
        present,
        rate_hz,
        extent_cents,
        voiced_frames,
    }
}
