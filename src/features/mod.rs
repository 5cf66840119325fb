//! Note extraction modules
//!
//! This module contains the transcription stages and their inputs:
//! - Pitch contours and magnitude spectrograms
//! - Contour segmentation (monophonic)
//! - Decomposition and peak picking (polyphonic)
//! - Near-duplicate merging
//! - Vibrato detection

pub mod contour;
pub mod decomposition;
pub mod merge;
pub mod peak_picking;
pub mod polyphonic;
pub mod segmentation;
pub mod spectrogram;
pub mod vibrato;

pub use contour::{ContourFrame, FrequencyContour};
pub use decomposition::{Decomposer, Decomposition, NmfDecomposer};
pub use merge::NoteEventMerger;
pub use polyphonic::PolyphonicNoteDetector;
pub use segmentation::PitchContourSegmenter;
pub use spectrogram::MagnitudeSpectrogram;
pub use vibrato::{detect_vibrato, VibratoAnalysis};
