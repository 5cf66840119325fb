//! Configuration parameters for transcription and evaluation

use crate::scale::OctaveMode;
use serde::{Deserialize, Serialize};

/// Top-level transcription configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Scale quantization
    pub scale: ScaleConfig,

    /// Monophonic contour segmentation
    pub segmentation: SegmentationConfig,

    /// Polyphonic decomposition and peak picking
    pub polyphonic: PolyphonicConfig,

    /// Near-duplicate merging
    pub merge: MergeConfig,

    /// Reference comparison
    pub evaluation: EvaluationConfig,

    /// Vibrato analysis
    pub vibrato: VibratoConfig,
}

/// Scale quantization parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleConfig {
    /// Reference frequency in Hz (default: 440.0)
    /// The pivot degree (the fifth) is pinned to this frequency
    pub reference_hz: f32,

    /// Relative tolerance for scale adherence (default: 0.05 = 5%)
    pub adherence_tolerance: f32,

    /// Octave handling (default: Unfolded, the seven single-octave candidates only)
    pub octave_mode: OctaveMode,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            reference_hz: 440.0,
            adherence_tolerance: 0.05,
            octave_mode: OctaveMode::Unfolded,
        }
    }
}

/// Pitch contour segmentation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Quantized pitch change (Hz) that splits an open note (default: 0.5)
    pub pitch_change_threshold: f32,

    /// Minimum voiced probability for a frame to count as voiced (default: 0.5)
    pub voicing_threshold: f32,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            pitch_change_threshold: 0.5,
            voicing_threshold: 0.5,
        }
    }
}

/// Polyphonic note detection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolyphonicConfig {
    /// Upper bound on the number of decomposition components (default: 20)
    pub max_components: usize,

    /// One component is budgeted per this many time frames (default: 10)
    pub frames_per_component: usize,

    /// Peak height relative to the component's maximum activation (default: 0.3)
    pub peak_height_ratio: f32,

    /// Minimum gap between activation peaks in seconds (default: 0.1)
    pub min_peak_gap_seconds: f32,

    /// Accept peaks on the first/last frame (default: false)
    pub include_edge_peaks: bool,

    /// Maximum factorization iterations (default: 200)
    pub max_iterations: usize,

    /// Relative reconstruction-error change that stops iteration early (default: 1e-4)
    pub convergence_tolerance: f32,

    /// Seed for the random factor initialization (default: 42)
    pub seed: u64,
}

impl Default for PolyphonicConfig {
    fn default() -> Self {
        Self {
            max_components: 20,
            frames_per_component: 10,
            peak_height_ratio: 0.3,
            min_peak_gap_seconds: 0.1,
            include_edge_peaks: false,
            max_iterations: 200,
            convergence_tolerance: 1e-4,
            seed: 42,
        }
    }
}

/// Near-duplicate note merging parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Maximum start-time distance in seconds (default: 0.1)
    pub time_tolerance: f32,

    /// Maximum frequency distance in Hz (default: 0.5)
    pub frequency_tolerance: f32,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            time_tolerance: 0.1,
            frequency_tolerance: 0.5,
        }
    }
}

/// Transcription evaluation parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Onset matching window in seconds (default: 0.3)
    pub onset_window: f32,

    /// Pitch tolerance in semitones (default: 0.2)
    pub pitch_tolerance: f32,

    /// Tonic used to build the degree frequencies for scale adherence (default: 440.0)
    pub scale_fundamental_hz: f32,

    /// Relative tolerance for scale adherence (default: 0.05)
    pub adherence_tolerance: f32,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            onset_window: 0.3,
            pitch_tolerance: 0.2,
            scale_fundamental_hz: 440.0,
            adherence_tolerance: 0.05,
        }
    }
}

/// Vibrato analysis parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VibratoConfig {
    /// Lower edge of the vibrato rate band in Hz (default: 4.0)
    pub min_rate_hz: f32,

    /// Upper edge of the vibrato rate band in Hz (default: 8.0)
    pub max_rate_hz: f32,

    /// Minimum voiced frames needed for analysis (default: 10)
    pub min_frames: usize,

    /// Minimum modulation depth, in cents, to report vibrato as present (default: 10.0)
    pub min_extent_cents: f32,
}

impl Default for VibratoConfig {
    fn default() -> Self {
        Self {
            min_rate_hz: 4.0,
            max_rate_hz: 8.0,
            min_frames: 10,
            min_extent_cents: 10.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = TranscriptionConfig::default();
        assert_eq!(config.scale.reference_hz, 440.0);
        assert_eq!(config.merge.time_tolerance, 0.1);
        assert_eq!(config.merge.frequency_tolerance, 0.5);
        assert_eq!(config.evaluation.onset_window, 0.3);
        assert_eq!(config.evaluation.pitch_tolerance, 0.2);
        assert_eq!(config.polyphonic.max_components, 20);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: TranscriptionConfig =
            serde_json::from_str(r#"{"merge": {"time_tolerance": 0.2}}"#).unwrap();
        assert_eq!(config.merge.time_tolerance, 0.2);
        assert_eq!(config.merge.frequency_tolerance, 0.5);
        assert_eq!(config.segmentation.pitch_change_threshold, 0.5);
    }
}
