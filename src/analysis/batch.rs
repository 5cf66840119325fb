//! Batch evaluation
//!
//! Scores many (reference, predicted) pairs and summarises onset and pitch
//! F-measures across the batch. Items are independent; with the `parallel`
//! feature they are scored on the rayon pool. Reports always come back in
//! input order.

use super::evaluation::TranscriptionEvaluator;
use super::result::{BatchReport, SummaryStats, TranscriptionReport};
use crate::error::{Result, TranscriptionError};
use crate::notes::NoteEvent;

/// Evaluate a batch of transcriptions
///
/// # Arguments
///
/// * `evaluator` - Shared, read-only evaluator
/// * `references` - One reference note list per item
/// * `predictions` - One predicted note list per item
///
/// # Returns
///
/// `BatchReport` with per-item reports and summary statistics. An empty
/// batch yields zeroed statistics.
///
/// # Errors
///
/// `LengthMismatch` if the two lists differ in length; no item is scored in
/// that case.
pub fn evaluate_batch(
    evaluator: &TranscriptionEvaluator,
    references: &[Vec<NoteEvent>],
    predictions: &[Vec<NoteEvent>],
) -> Result<BatchReport> {
    if references.len() != predictions.len() {
        return Err(TranscriptionError::LengthMismatch {
            reference: references.len(),
            predicted: predictions.len(),
        });
    }

    log::debug!("Evaluating batch of {} items", references.len());

    let reports: Vec<TranscriptionReport> = {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            references
                .par_iter()
                .zip(predictions.par_iter())
                .map(|(reference, predicted)| evaluator.evaluate(reference, predicted))
                .collect::<Result<Vec<_>>>()?
        }
        #[cfg(not(feature = "parallel"))]
        {
            references
                .iter()
                .zip(predictions.iter())
                .map(|(reference, predicted)| evaluator.evaluate(reference, predicted))
                .collect::<Result<Vec<_>>>()?
        }
    };

    let report = summarize(reports);
    log::debug!(
        "Batch: mean onset F1={:.3}, mean pitch F1={:.3} over {} items",
        report.onset_f1.mean,
        report.pitch_f1.mean,
        report.total_evaluations
    );

    Ok(report)
}

/// Aggregate per-item reports into a `BatchReport`
pub fn summarize(reports: Vec<TranscriptionReport>) -> BatchReport {
    let onset: Vec<f32> = reports.iter().map(|r| r.onset_f1).collect();
    let pitch: Vec<f32> = reports.iter().map(|r| r.pitch_f1).collect();

    BatchReport {
        onset_f1: SummaryStats::from_values(&onset),
        pitch_f1: SummaryStats::from_values(&pitch),
        total_evaluations: reports.len(),
        reports,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvaluationConfig;
    use crate::notes::Pitch;

    fn midi_note(onset: f32, pitch: u8) -> NoteEvent {
        NoteEvent::new(onset, onset + 0.25, Pitch::Midi(pitch), 100.0).unwrap()
    }

    fn evaluator() -> TranscriptionEvaluator {
        TranscriptionEvaluator::new(EvaluationConfig::default()).unwrap()
    }

    #[test]
    fn test_length_mismatch() {
        let result = evaluate_batch(&evaluator(), &[vec![], vec![]], &[vec![]]);
        assert_eq!(
            result,
            Err(TranscriptionError::LengthMismatch {
                reference: 2,
                predicted: 1
            })
        );
    }

    #[test]
    fn test_empty_batch() {
        let report = evaluate_batch(&evaluator(), &[], &[]).unwrap();
        assert_eq!(report.total_evaluations, 0);
        assert_eq!(report.onset_f1, SummaryStats::default());
    }

    #[test]
    fn test_batch_statistics_and_order() {
        let references = vec![
            vec![midi_note(0.0, 60)],
            vec![midi_note(0.0, 60), midi_note(1.0, 62)],
            vec![midi_note(0.0, 60)],
        ];
        let predictions = vec![
            vec![midi_note(0.05, 60)],
            vec![midi_note(0.0, 60)],
            vec![],
        ];

        let report = evaluate_batch(&evaluator(), &references, &predictions).unwrap();
        assert_eq!(report.total_evaluations, 3);
        assert_eq!(report.reports[0].onset_f1, 1.0);
        assert!((report.reports[1].onset_f1 - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(report.reports[2].onset_f1, 0.0);

        assert!((report.onset_f1.mean - 5.0 / 9.0).abs() < 1e-5);
        assert!((report.onset_f1.median - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(report.onset_f1.min, 0.0);
        assert_eq!(report.onset_f1.max, 1.0);
    }
}
