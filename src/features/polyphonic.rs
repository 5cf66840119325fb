//! Polyphonic note detection
//!
//! Decomposes a magnitude spectrogram into additive components and picks
//! onset candidates from each component's activation curve.
//!
//! Algorithm:
//! 1. Transpose the spectrogram to `(frames, bins)`
//! 2. Factor into `k = min(20, max(1, frames / 10))` components
//! 3. Per component, find activation peaks above 30% of its maximum that are
//!    at least 100 ms apart
//! 4. Quantize the component's dominant bin onto the scale
//! 5. Emit one candidate note per peak, sorted by onset
//!
//! Candidates last one hop; consolidating them is the merger's job.

use super::decomposition::{component_budget, Decomposer, NmfDecomposer};
use super::peak_picking::find_peaks;
use super::spectrogram::MagnitudeSpectrogram;
use crate::config::{PolyphonicConfig, TranscriptionConfig};
use crate::error::{Result, TranscriptionError};
use crate::notes::{sort_by_onset, NoteEvent, Pitch};
use crate::scale::ScaleQuantizer;

/// Decomposition-based multi-pitch onset detector
#[derive(Debug, Clone)]
pub struct PolyphonicNoteDetector<D: Decomposer = NmfDecomposer> {
    quantizer: ScaleQuantizer,
    config: PolyphonicConfig,
    decomposer: D,
}

impl PolyphonicNoteDetector<NmfDecomposer> {
    /// Build a detector backed by a seeded NMF
    pub fn new(config: &TranscriptionConfig) -> Result<Self> {
        Ok(Self {
            quantizer: ScaleQuantizer::from_config(&config.scale)?,
            config: config.polyphonic.clone(),
            decomposer: NmfDecomposer::from_config(&config.polyphonic),
        })
    }
}

impl<D: Decomposer> PolyphonicNoteDetector<D> {
    /// Build a detector around any decomposition strategy
    pub fn with_decomposer(quantizer: ScaleQuantizer, config: PolyphonicConfig, decomposer: D) -> Self {
        Self {
            quantizer,
            config,
            decomposer,
        }
    }

    /// Detect candidate notes in a spectrogram
    ///
    /// # Returns
    ///
    /// One candidate per activation peak, sorted by start time. Velocity is
    /// the raw activation at the peak. Empty for an empty or silent
    /// spectrogram.
    ///
    /// # Errors
    ///
    /// Decomposition and quantizer errors propagate.
    pub fn detect(&self, spectrogram: &MagnitudeSpectrogram) -> Result<Vec<NoteEvent>> {
        let n_frames = spectrogram.n_frames();
        let hop = spectrogram.hop_duration();
        log::debug!(
            "Detecting polyphonic notes: {} bins x {} frames, hop={:.4}s",
            spectrogram.n_bins(),
            n_frames,
            hop
        );

        if n_frames == 0 || spectrogram.n_bins() == 0 {
            log::warn!("Empty spectrogram, no notes detected");
            return Ok(Vec::new());
        }

        let data = spectrogram.time_major();
        if data.iter().all(|&v| v == 0.0) {
            log::warn!("Silent spectrogram, no notes detected");
            return Ok(Vec::new());
        }

        let n_components = component_budget(
            n_frames,
            self.config.max_components,
            self.config.frames_per_component,
        );
        let decomposition = self.decomposer.decompose(data, n_components)?;

        if decomposition.activations.nrows() != n_frames
            || decomposition.loadings.ncols() != spectrogram.n_bins()
            || decomposition.loadings.nrows() != decomposition.n_components()
        {
            return Err(TranscriptionError::DecompositionError(format!(
                "Decomposer returned activations {:?} and loadings {:?} for a {}x{} input",
                decomposition.activations.dim(),
                decomposition.loadings.dim(),
                n_frames,
                spectrogram.n_bins()
            )));
        }

        let min_distance = ((self.config.min_peak_gap_seconds / hop) as usize).max(1);
        let mut candidates = Vec::new();

        for component in 0..decomposition.n_components() {
            let activation = decomposition.activation(component);
            let max_activation = activation.iter().cloned().fold(0.0f32, f32::max);
            if max_activation <= 0.0 {
                continue;
            }

            let peaks = find_peaks(
                &activation,
                self.config.peak_height_ratio * max_activation,
                min_distance,
                self.config.include_edge_peaks,
            );
            if peaks.is_empty() {
                continue;
            }

            let bin = match decomposition.dominant_bin(component) {
                Some(bin) => bin,
                None => continue,
            };
            let quantized = self.quantizer.quantize(spectrogram.bin_frequencies()[bin])?;

            log::debug!(
                "Component {}: bin {} ({:.2} Hz) -> degree {} ({:.2} Hz), {} peaks",
                component,
                bin,
                spectrogram.bin_frequencies()[bin],
                quantized.degree,
                quantized.frequency,
                peaks.len()
            );

            for peak in peaks {
                let start_time = peak.index as f32 * hop;
                candidates.push(
                    NoteEvent::new(
                        start_time,
                        start_time + hop,
                        Pitch::Hz(quantized.frequency),
                        peak.value,
                    )?
                    .with_scale_degree(quantized.degree),
                );
            }
        }

        sort_by_onset(&mut candidates);
        log::debug!(
            "Detected {} candidate notes from {} components",
            candidates.len(),
            n_components
        );

        Ok(candidates)
    }
}
