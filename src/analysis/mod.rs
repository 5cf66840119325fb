//! Evaluation and analysis modules
//!
//! Scores and describes transcriptions:
//! - Reference comparison (onset/pitch F-measure, scale adherence)
//! - Batch aggregation
//! - Melodic, rhythmic and pitch statistics
//! - Result types

pub mod batch;
pub mod evaluation;
pub mod patterns;
pub mod result;

pub use batch::evaluate_batch;
pub use evaluation::TranscriptionEvaluator;
pub use result::{BatchReport, ContourAnalysis, ScaleAccuracy, SummaryStats, TranscriptionReport};
