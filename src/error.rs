//! Error types for the transcription pipeline

use std::fmt;

/// Errors that can occur during note extraction and evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptionError {
    /// Non-positive or non-finite frequency passed to the quantizer
    InvalidFrequency(f32),

    /// Batch evaluation called with reference/predicted lists of unequal length
    LengthMismatch {
        /// Number of reference items
        reference: usize,
        /// Number of predicted items
        predicted: usize,
    },

    /// Invalid input parameters or malformed data shapes
    InvalidInput(String),

    /// Matrix factorization failed
    DecompositionError(String),

    /// File I/O error
    IoError(String),

    /// JSON (de)serialization error
    SerializationError(String),

    /// Standard MIDI File export error
    MidiExportError(String),
}

impl fmt::Display for TranscriptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptionError::InvalidFrequency(hz) => {
                write!(f, "Invalid frequency: {} Hz (must be finite and > 0)", hz)
            }
            TranscriptionError::LengthMismatch {
                reference,
                predicted,
            } => write!(
                f,
                "Length mismatch: {} reference items vs {} predicted items",
                reference, predicted
            ),
            TranscriptionError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            TranscriptionError::DecompositionError(msg) => {
                write!(f, "Decomposition error: {}", msg)
            }
            TranscriptionError::IoError(msg) => write!(f, "I/O error: {}", msg),
            TranscriptionError::SerializationError(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
            TranscriptionError::MidiExportError(msg) => write!(f, "MIDI export error: {}", msg),
        }
    }
}

impl std::error::Error for TranscriptionError {}

impl From<std::io::Error> for TranscriptionError {
    fn from(err: std::io::Error) -> Self {
        TranscriptionError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for TranscriptionError {
    fn from(err: serde_json::Error) -> Self {
        TranscriptionError::SerializationError(err.to_string())
    }
}

/// Result type alias for transcription operations
pub type Result<T> = std::result::Result<T, TranscriptionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = TranscriptionError::InvalidFrequency(-1.0);
        assert!(err.to_string().contains("-1"));

        let err = TranscriptionError::LengthMismatch {
            reference: 3,
            predicted: 2,
        };
        assert_eq!(
            err.to_string(),
            "Length mismatch: 3 reference items vs 2 predicted items"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.json");
        let err: TranscriptionError = io.into();
        assert!(matches!(err, TranscriptionError::IoError(ref m) if m.contains("missing.json")));
    }
}
