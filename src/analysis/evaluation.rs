//! Transcription evaluation
//!
//! Compares a predicted note list with a reference note list.
//!
//! Onsets are matched one-to-one: a reference and a predicted note may be
//! paired when their onsets differ by at most the onset window (and, for the
//! pitch scores, their pitches by at most the pitch tolerance). The number of
//! pairs is maximised with augmenting paths; each reference note tries its
//! candidates closest onset first (earlier predicted note on ties), which
//! makes the chosen pairing deterministic.
//!
//! Offsets are ignored throughout.

use super::result::{MatchScores, ScaleAccuracy, TranscriptionReport};
use crate::config::EvaluationConfig;
use crate::error::Result;
use crate::notes::NoteEvent;
use crate::scale::{ScaleQuantizer, ScaleTuning};

/// Scores predicted transcriptions against references
#[derive(Debug, Clone)]
pub struct TranscriptionEvaluator {
    config: EvaluationConfig,
    scale: ScaleQuantizer,
}

impl TranscriptionEvaluator {
    /// Create an evaluator for the phin tuning
    ///
    /// Scale adherence uses degree frequencies `scale_fundamental_hz * ratio`.
    ///
    /// # Errors
    ///
    /// `InvalidFrequency` if `scale_fundamental_hz` is not positive.
    pub fn new(config: EvaluationConfig) -> Result<Self> {
        Self::with_tuning(config, ScaleTuning::phin())
    }

    /// Create an evaluator for an arbitrary tuning
    pub fn with_tuning(config: EvaluationConfig, tuning: ScaleTuning) -> Result<Self> {
        let scale = ScaleQuantizer::with_tonic(tuning, config.scale_fundamental_hz)?
            .with_adherence_tolerance(config.adherence_tolerance);
        Ok(Self { config, scale })
    }

    /// Parameters in use
    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Evaluate one predicted transcription
    ///
    /// # Arguments
    ///
    /// * `reference` - Ground-truth notes (may be empty)
    /// * `predicted` - Transcribed notes (may be empty)
    ///
    /// # Returns
    ///
    /// `TranscriptionReport`; every score is 0.0 when either list is empty.
    ///
    /// # Example
    ///
    /// ```
    /// use phin_transcription::analysis::evaluation::TranscriptionEvaluator;
    /// use phin_transcription::config::EvaluationConfig;
    /// use phin_transcription::{NoteEvent, Pitch};
    ///
    /// let evaluator = TranscriptionEvaluator::new(EvaluationConfig::default())?;
    /// let reference = vec![NoteEvent::new(0.0, 0.5, Pitch::Midi(60), 100.0)?];
    /// let predicted = vec![NoteEvent::new(0.05, 0.5, Pitch::Midi(60), 90.0)?];
    /// let report = evaluator.evaluate(&reference, &predicted)?;
    /// assert_eq!(report.onset_f1, 1.0);
    /// assert_eq!(report.pitch_f1, 1.0);
    /// # Ok::<(), phin_transcription::TranscriptionError>(())
    /// ```
    pub fn evaluate(
        &self,
        reference: &[NoteEvent],
        predicted: &[NoteEvent],
    ) -> Result<TranscriptionReport> {
        log::debug!(
            "Evaluating {} predicted notes against {} reference notes",
            predicted.len(),
            reference.len()
        );

        let onset = self.onset_scores(reference, predicted);
        let pitch = self.pitch_scores(reference, predicted);
        let report = TranscriptionReport {
            onset_precision: onset.precision,
            onset_recall: onset.recall,
            onset_f1: onset.f1,
            onset_matches: onset.matched,
            pitch_precision: pitch.precision,
            pitch_recall: pitch.recall,
            pitch_f1: pitch.f1,
            pitch_matches: pitch.matched,
            pitch_accuracy: self.pitch_accuracy(reference, predicted),
            reference_notes: reference.len(),
            predicted_notes: predicted.len(),
            scale: self.scale_accuracy(predicted)?,
        };

        log::debug!(
            "Onset F1={:.3}, pitch F1={:.3}, scale adherence={:.3}",
            report.onset_f1,
            report.pitch_f1,
            report.scale.adherence
        );

        Ok(report)
    }

    /// Onset-only matching scores
    pub fn onset_scores(&self, reference: &[NoteEvent], predicted: &[NoteEvent]) -> MatchScores {
        let pairs = match_onsets(reference, predicted, self.config.onset_window, |_, _| true);
        MatchScores::from_counts(pairs.len(), reference.len(), predicted.len())
    }

    /// Onset-and-pitch matching scores
    pub fn pitch_scores(&self, reference: &[NoteEvent], predicted: &[NoteEvent]) -> MatchScores {
        let tolerance = self.config.pitch_tolerance;
        let pairs = match_onsets(reference, predicted, self.config.onset_window, |r, p| {
            (r.midi() - p.midi()).abs() <= tolerance
        });
        MatchScores::from_counts(pairs.len(), reference.len(), predicted.len())
    }

    /// Fraction of predicted notes within the pitch tolerance of their nearest reference pitch
    ///
    /// Timing is ignored. 0.0 when either list is empty.
    pub fn pitch_accuracy(&self, reference: &[NoteEvent], predicted: &[NoteEvent]) -> f32 {
        if reference.is_empty() || predicted.is_empty() {
            return 0.0;
        }

        let matches = predicted
            .iter()
            .filter(|p| {
                let nearest = reference
                    .iter()
                    .map(|r| (r.midi() - p.midi()).abs())
                    .fold(f32::INFINITY, f32::min);
                nearest <= self.config.pitch_tolerance
            })
            .count();

        matches as f32 / predicted.len() as f32
    }

    /// Scale adherence of predicted notes
    ///
    /// Zeroed for an empty list.
    pub fn scale_accuracy(&self, predicted: &[NoteEvent]) -> Result<ScaleAccuracy> {
        if predicted.is_empty() {
            return Ok(ScaleAccuracy::default());
        }

        let mut matched_notes = 0usize;
        let mut total_deviation = 0.0f32;
        for note in predicted {
            let deviation = self.scale.relative_deviation(note.hz())?;
            if deviation <= self.scale.adherence_tolerance() {
                matched_notes += 1;
            }
            total_deviation += deviation;
        }

        let count = predicted.len() as f32;
        Ok(ScaleAccuracy {
            adherence: matched_notes as f32 / count,
            mean_deviation: total_deviation / count,
            matched_notes,
        })
    }
}

/// Maximum one-to-one matching of onsets within `window`
///
/// Returns `(reference_index, predicted_index)` pairs sorted by reference index.
pub fn match_onsets<F>(
    reference: &[NoteEvent],
    predicted: &[NoteEvent],
    window: f32,
    compatible: F,
) -> Vec<(usize, usize)>
where
    F: Fn(&NoteEvent, &NoteEvent) -> bool,
{
    if reference.is_empty() || predicted.is_empty() {
        return Vec::new();
    }

    // Predicted indices by onset so each window is a contiguous range
    let mut by_onset: Vec<usize> = (0..predicted.len()).collect();
    by_onset.sort_by(|&a, &b| {
        predicted[a]
            .start_time()
            .partial_cmp(&predicted[b].start_time())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });

    let candidates: Vec<Vec<usize>> = reference
        .iter()
        .map(|r| {
            let onset = r.start_time();
            let first = by_onset.partition_point(|&j| predicted[j].start_time() < onset - window);
            let mut within: Vec<(f32, usize)> = by_onset[first..]
                .iter()
                .take_while(|&&j| predicted[j].start_time() <= onset + window)
                .filter(|&&j| {
                    (predicted[j].start_time() - onset).abs() <= window && compatible(r, &predicted[j])
                })
                .map(|&j| ((predicted[j].start_time() - onset).abs(), j))
                .collect();
            within.sort_by(|a, b| {
                a.0.partial_cmp(&b.0)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.1.cmp(&b.1))
            });
            within.into_iter().map(|(_, j)| j).collect()
        })
        .collect();

    let mut owner: Vec<Option<usize>> = vec![None; predicted.len()];
    let mut visited: Vec<usize> = vec![0; predicted.len()];
    let mut path: Vec<(usize, usize)> = Vec::new();
    for i in 0..reference.len() {
        augment(i, i + 1, &candidates, &mut visited, &mut owner, &mut path);
    }

    let mut pairs: Vec<(usize, usize)> = owner
        .iter()
        .enumerate()
        .filter_map(|(j, owner)| owner.map(|i| (i, j)))
        .collect();
    pairs.sort_unstable();
    pairs
}

/// Try to give reference `root` a partner, re-routing earlier pairs if needed
///
/// Depth-first search over alternating paths with an explicit stack of
/// `(reference, next candidate position)`. A predicted note is visited at
/// most once per search: `visited[j] == stamp` marks it for this root.
fn augment(
    root: usize,
    stamp: usize,
    candidates: &[Vec<usize>],
    visited: &mut [usize],
    owner: &mut [Option<usize>],
    path: &mut Vec<(usize, usize)>,
) -> bool {
    path.clear();
    path.push((root, 0));

    while let Some(&(i, position)) = path.last() {
        let next = candidates[i][position..]
            .iter()
            .position(|&j| visited[j] != stamp)
            .map(|offset| position + offset);

        let Some(position) = next else {
            path.pop();
            continue;
        };
        let j = candidates[i][position];
        visited[j] = stamp;
        if let Some(frame) = path.last_mut() {
            frame.1 = position + 1;
        }

        match owner[j] {
            Some(k) => path.push((k, 0)),
            None => {
                // Every frame's last tried candidate becomes its partner
                for &(i, position) in path.iter() {
                    owner[candidates[i][position - 1]] = Some(i);
                }
                return true;
            }
        }
    }
    false
}
