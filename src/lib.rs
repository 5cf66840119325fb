//! # Phin Transcription
//!
//! Note-event extraction and evaluation for recordings of the phin, a
//! three-string lute whose melodies sit on a non-equal-tempered
//! seven-degree scale.
//!
//! ## Features
//!
//! - **Scale Quantization**: Snap frequencies onto the seven phin degrees (optionally octave-folded)
//! - **Monophonic Transcription**: Segment a pitch contour into notes at pitch jumps and unvoiced frames
//! - **Polyphonic Detection**: Seeded NMF of a magnitude spectrogram with per-component peak picking
//! - **Note Merging**: Collapse near-duplicate candidates from either detector
//! - **Evaluation**: Onset and pitch F-measure, scale adherence, batch statistics
//! - **Analysis**: Vibrato, melodic intervals, rhythm, pitch distribution
//!
//! ## Quick Start
//!
//! ```
//! use phin_transcription::{transcribe_contour, FrequencyContour, TranscriptionConfig};
//!
//! // One second of A4 followed by one second of the degree below
//! let f0: Vec<Option<f32>> = (0..200)
//!     .map(|i| Some(if i < 100 { 441.0 } else { 392.0 }))
//!     .collect();
//! let contour = FrequencyContour::from_f0(&f0, &vec![0.9; 200], 0.01)?;
//!
//! let notes = transcribe_contour(&contour, &TranscriptionConfig::default())?;
//! assert_eq!(notes.len(), 2);
//! # Ok::<(), phin_transcription::TranscriptionError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! FrequencyContour    → PitchContourSegmenter   ┐
//!                                               ├→ NoteEventMerger → TranscriptionEvaluator
//! MagnitudeSpectrogram → PolyphonicNoteDetector ┘
//! ```
//!
//! Both detectors quantize through a [`ScaleQuantizer`]. Audio decoding and
//! feature extraction happen upstream of this crate.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod notes;
pub mod scale;

// Re-export main types
pub use analysis::result::{BatchReport, ContourAnalysis, ScaleAccuracy, SummaryStats, TranscriptionReport};
pub use analysis::TranscriptionEvaluator;
pub use config::{
    EvaluationConfig, MergeConfig, PolyphonicConfig, ScaleConfig, SegmentationConfig,
    TranscriptionConfig, VibratoConfig,
};
pub use error::{Result, TranscriptionError};
pub use features::{
    ContourFrame, Decomposer, FrequencyContour, MagnitudeSpectrogram, NmfDecomposer,
    NoteEventMerger, PitchContourSegmenter, PolyphonicNoteDetector, VibratoAnalysis,
};
pub use notes::{NoteEvent, Pitch};
pub use scale::{OctaveMode, QuantizedPitch, ScaleDegree, ScaleQuantizer, ScaleTuning};

use ndarray::Array2;

/// Quantize a frequency onto the phin scale
///
/// # Arguments
///
/// * `frequency` - Frequency in Hz
/// * `reference_hz` - Frequency of the fifth degree (typically 440.0)
///
/// # Errors
///
/// `InvalidFrequency` if either frequency is not finite and positive.
///
/// # Example
///
/// ```
/// let q = phin_transcription::quantize(300.0, 440.0)?;
/// assert_eq!(q.degree.index(), 0);
/// assert!((q.frequency - 293.33).abs() < 0.01);
/// # Ok::<(), phin_transcription::TranscriptionError>(())
/// ```
pub fn quantize(frequency: f32, reference_hz: f32) -> Result<QuantizedPitch> {
    ScaleQuantizer::new(ScaleTuning::phin(), reference_hz)?.quantize(frequency)
}

/// Segment a pitch contour into notes with default parameters
pub fn segment_contour(contour: &FrequencyContour) -> Result<Vec<NoteEvent>> {
    PitchContourSegmenter::from_config(&TranscriptionConfig::default())?.segment(contour)
}

/// Detect candidate notes in a `(bins, frames)` magnitude matrix with default parameters
///
/// # Arguments
///
/// * `magnitudes` - Non-negative magnitudes shaped `(bins, frames)`
/// * `bin_frequencies` - Centre frequency of each bin in Hz
/// * `hop_duration` - Seconds between frames
///
/// # Returns
///
/// Unmerged candidates sorted by start time
pub fn detect_polyphonic_notes(
    magnitudes: Array2<f32>,
    bin_frequencies: Vec<f32>,
    hop_duration: f32,
) -> Result<Vec<NoteEvent>> {
    let spectrogram = MagnitudeSpectrogram::new(magnitudes, bin_frequencies, hop_duration)?;
    PolyphonicNoteDetector::new(&TranscriptionConfig::default())?.detect(&spectrogram)
}

/// Merge near-duplicate candidates
///
/// Typical tolerances are 0.1 s and 0.5 Hz.
pub fn merge_notes(
    candidates: Vec<NoteEvent>,
    time_tolerance: f32,
    frequency_tolerance: f32,
) -> Result<Vec<NoteEvent>> {
    NoteEventMerger::with_tolerances(time_tolerance, frequency_tolerance).merge(candidates)
}

/// Compare a predicted transcription with a reference
///
/// Typical parameters are a 0.3 s onset window and a 0.2 semitone pitch
/// tolerance. Scale adherence uses the phin scale on a 440 Hz tonic.
pub fn evaluate(
    reference: &[NoteEvent],
    predicted: &[NoteEvent],
    onset_window: f32,
    pitch_tolerance: f32,
) -> Result<TranscriptionReport> {
    let config = EvaluationConfig {
        onset_window,
        pitch_tolerance,
        ..EvaluationConfig::default()
    };
    TranscriptionEvaluator::new(config)?.evaluate(reference, predicted)
}

/// Evaluate many transcriptions with default parameters
///
/// # Errors
///
/// `LengthMismatch` if the lists differ in length.
pub fn evaluate_batch(
    references: &[Vec<NoteEvent>],
    predictions: &[Vec<NoteEvent>],
) -> Result<BatchReport> {
    let evaluator = TranscriptionEvaluator::new(EvaluationConfig::default())?;
    analysis::batch::evaluate_batch(&evaluator, references, predictions)
}

/// Transcribe a pitch contour: segment, then merge
pub fn transcribe_contour(
    contour: &FrequencyContour,
    config: &TranscriptionConfig,
) -> Result<Vec<NoteEvent>> {
    let raw = PitchContourSegmenter::from_config(config)?.segment(contour)?;
    NoteEventMerger::new(config.merge).merge(raw)
}

/// Transcribe a magnitude spectrogram: decompose, peak-pick, then merge
pub fn transcribe_spectrogram(
    spectrogram: &MagnitudeSpectrogram,
    config: &TranscriptionConfig,
) -> Result<Vec<NoteEvent>> {
    let candidates = PolyphonicNoteDetector::new(config)?.detect(spectrogram)?;
    NoteEventMerger::new(config.merge).merge(candidates)
}

/// Transcribe and describe a pitch contour
///
/// # Returns
///
/// `ContourAnalysis` with the merged notes, frame-level scale adherence,
/// vibrato, and melodic/rhythmic/pitch statistics. Quality density is
/// measured against the contour's duration.
///
/// # Errors
///
/// Propagates quantizer errors.
pub fn analyze_contour(
    contour: &FrequencyContour,
    config: &TranscriptionConfig,
) -> Result<ContourAnalysis> {
    use std::time::Instant;
    let start_time = Instant::now();

    log::debug!("Analyzing contour: {} frames", contour.len());

    let notes = transcribe_contour(contour, config)?;

    let quantizer = ScaleQuantizer::from_config(&config.scale)?;
    let voiced = contour.voiced_frequencies(config.segmentation.voicing_threshold);
    let frame_scale_adherence = quantizer.scale_adherence(&voiced)?;

    let vibrato = features::vibrato::detect_vibrato(
        contour,
        config.segmentation.voicing_threshold,
        &config.vibrato,
    );

    let analysis = ContourAnalysis {
        frame_scale_adherence,
        vibrato,
        melodic: analysis::patterns::melodic_patterns(&notes),
        rhythmic: analysis::patterns::rhythmic_features(&notes),
        pitch: analysis::patterns::pitch_distribution(&notes),
        quality: analysis::patterns::transcription_quality(&notes, contour.duration()),
        notes,
    };

    log::debug!(
        "Contour analysis: {} notes, {:.1}% scale adherence in {:.2} ms",
        analysis.notes.len(),
        analysis.frame_scale_adherence * 100.0,
        start_time.elapsed().as_secs_f32() * 1000.0
    );

    Ok(analysis)
}
