//! Evaluation and analysis result types

use super::patterns::{MelodicPatterns, PitchDistribution, RhythmicFeatures, TranscriptionQuality};
use crate::features::vibrato::VibratoAnalysis;
use crate::notes::NoteEvent;
use serde::{Deserialize, Serialize};

/// Precision, recall and F-measure of a one-to-one note matching
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MatchScores {
    /// Matched / predicted
    pub precision: f32,

    /// Matched / reference
    pub recall: f32,

    /// Harmonic mean of precision and recall
    pub f1: f32,

    /// Number of matched pairs
    pub matched: usize,
}

impl MatchScores {
    /// Scores from a match count
    ///
    /// All zero when either side is empty.
    pub fn from_counts(matched: usize, reference: usize, predicted: usize) -> Self {
        if reference == 0 || predicted == 0 {
            return Self::default();
        }

        let precision = matched as f32 / predicted as f32;
        let recall = matched as f32 / reference as f32;
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            precision,
            recall,
            f1,
            matched,
        }
    }
}

/// How closely predicted pitches sit on the scale
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScaleAccuracy {
    /// Fraction of predicted notes within tolerance of a degree frequency (0.0-1.0)
    pub adherence: f32,

    /// Mean `|f - nearest degree| / f` over predicted notes
    pub mean_deviation: f32,

    /// Number of adherent notes
    pub matched_notes: usize,
}

/// Comparison of one predicted transcription against its reference
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TranscriptionReport {
    /// Onset precision (0.0-1.0)
    pub onset_precision: f32,

    /// Onset recall (0.0-1.0)
    pub onset_recall: f32,

    /// Onset F-measure (0.0-1.0)
    pub onset_f1: f32,

    /// Reference/predicted pairs matched on onset
    pub onset_matches: usize,

    /// Onset-and-pitch precision (0.0-1.0)
    pub pitch_precision: f32,

    /// Onset-and-pitch recall (0.0-1.0)
    pub pitch_recall: f32,

    /// Onset-and-pitch F-measure (0.0-1.0)
    pub pitch_f1: f32,

    /// Reference/predicted pairs matched on onset and pitch
    pub pitch_matches: usize,

    /// Fraction of predicted notes whose pitch is near some reference pitch, ignoring timing
    pub pitch_accuracy: f32,

    /// Number of reference notes
    pub reference_notes: usize,

    /// Number of predicted notes
    pub predicted_notes: usize,

    /// Scale adherence of the predicted notes
    pub scale: ScaleAccuracy,
}

/// Distribution summary of one metric across a batch
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SummaryStats {
    /// Arithmetic mean
    pub mean: f32,

    /// Population standard deviation
    pub std: f32,

    /// Median (mean of the two middle values for even counts)
    pub median: f32,

    /// Minimum
    pub min: f32,

    /// Maximum
    pub max: f32,
}

impl SummaryStats {
    /// Summarize a set of values; all zero when empty
    pub fn from_values(values: &[f32]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let n = values.len() as f32;
        let mean = values.iter().sum::<f32>() / n;
        let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        Self {
            mean,
            std: variance.sqrt(),
            median,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
        }
    }
}

/// Aggregate of many per-item reports
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchReport {
    /// Onset F-measure across items
    pub onset_f1: SummaryStats,

    /// Onset-and-pitch F-measure across items
    pub pitch_f1: SummaryStats,

    /// Number of items evaluated
    pub total_evaluations: usize,

    /// Per-item reports in input order
    pub reports: Vec<TranscriptionReport>,
}

/// Everything derived from one pitch contour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContourAnalysis {
    /// Merged, scale-quantized notes
    pub notes: Vec<NoteEvent>,

    /// Fraction of voiced frames within tolerance of a scale degree
    pub frame_scale_adherence: f32,

    /// Vibrato estimate
    pub vibrato: VibratoAnalysis,

    /// Interval statistics
    pub melodic: MelodicPatterns,

    /// Timing statistics
    pub rhythmic: RhythmicFeatures,

    /// Pitch histogram statistics
    pub pitch: PitchDistribution,

    /// Reference-free quality indicators
    pub quality: TranscriptionQuality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_scores() {
        let scores = MatchScores::from_counts(1, 2, 1);
        assert_eq!(scores.precision, 1.0);
        assert_eq!(scores.recall, 0.5);
        assert!((scores.f1 - 2.0 / 3.0).abs() < 1e-6);

        assert_eq!(MatchScores::from_counts(0, 0, 3), MatchScores::default());
        assert_eq!(MatchScores::from_counts(0, 2, 3).f1, 0.0);
    }

    #[test]
    fn test_summary_stats() {
        let stats = SummaryStats::from_values(&[0.0, 1.0, 0.5, 0.5]);
        assert_eq!(stats.mean, 0.5);
        assert_eq!(stats.median, 0.5);
        assert_eq!(stats.min, 0.0);
        assert_eq!(stats.max, 1.0);
        assert!((stats.std - 0.353_553).abs() < 1e-5);

        let odd = SummaryStats::from_values(&[3.0, 1.0, 2.0]);
        assert_eq!(odd.median, 2.0);

        assert_eq!(SummaryStats::from_values(&[]), SummaryStats::default());
    }
}
