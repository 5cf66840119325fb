//! Fundamental-frequency contours
//!
//! A [`FrequencyContour`] is the per-frame output of an external pitch
//! tracker: one [`ContourFrame`] per hop, each with an optional frequency
//! and a voicing probability. Unvoiced or low-confidence frames act as note
//! boundaries during segmentation.

use crate::error::{Result, TranscriptionError};
use serde::{Deserialize, Serialize};

/// One pitch-tracker frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContourFrame {
    /// Frame time in seconds
    pub time: f32,

    /// Estimated fundamental in Hz, `None` when the tracker found no pitch
    pub frequency: Option<f32>,

    /// Voicing probability (0.0-1.0)
    pub voiced_probability: f32,

    /// Amplitude envelope sample; falls back to `voiced_probability` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amplitude: Option<f32>,
}

impl ContourFrame {
    /// Voiced frame
    pub fn voiced(time: f32, frequency: f32, voiced_probability: f32) -> Self {
        Self {
            time,
            frequency: Some(frequency),
            voiced_probability,
            amplitude: None,
        }
    }

    /// Unvoiced frame
    pub fn unvoiced(time: f32) -> Self {
        Self {
            time,
            frequency: None,
            voiced_probability: 0.0,
            amplitude: None,
        }
    }

    /// Attach an amplitude envelope sample
    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = Some(amplitude);
        self
    }

    /// Amplitude at this frame
    pub fn amplitude(&self) -> f32 {
        self.amplitude.unwrap_or(self.voiced_probability).max(0.0)
    }

    /// Voiced frequency, if the frame clears `voicing_threshold` and carries a usable pitch
    pub fn voiced_frequency(&self, voicing_threshold: f32) -> Option<f32> {
        match self.frequency {
            Some(f) if f.is_finite() && f > 0.0 && self.voiced_probability >= voicing_threshold => {
                Some(f)
            }
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct RawContour {
    hop_duration: f32,
    frames: Vec<ContourFrame>,
}

impl TryFrom<RawContour> for FrequencyContour {
    type Error = TranscriptionError;

    fn try_from(raw: RawContour) -> Result<Self> {
        FrequencyContour::new(raw.hop_duration, raw.frames)
    }
}

/// Time-ordered pitch contour at a fixed hop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawContour")]
pub struct FrequencyContour {
    hop_duration: f32,
    frames: Vec<ContourFrame>,
}

impl FrequencyContour {
    /// Create a contour
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `hop_duration` is not positive, or frame times are
    /// negative, non-finite or decreasing.
    pub fn new(hop_duration: f32, frames: Vec<ContourFrame>) -> Result<Self> {
        if !hop_duration.is_finite() || hop_duration <= 0.0 {
            return Err(TranscriptionError::InvalidInput(format!(
                "Hop duration must be > 0, got {}",
                hop_duration
            )));
        }

        let mut previous = 0.0f32;
        for (i, frame) in frames.iter().enumerate() {
            if !frame.time.is_finite() || frame.time < previous {
                return Err(TranscriptionError::InvalidInput(format!(
                    "Contour frame {} has time {} (must be finite and non-decreasing, previous {})",
                    i, frame.time, previous
                )));
            }
            previous = frame.time;
        }

        Ok(Self {
            hop_duration,
            frames,
        })
    }

    /// Build a contour from per-frame f0 estimates and voicing probabilities
    ///
    /// Frame `i` is placed at `i * hop_duration`.
    pub fn from_f0(
        f0: &[Option<f32>],
        voiced_probabilities: &[f32],
        hop_duration: f32,
    ) -> Result<Self> {
        if f0.len() != voiced_probabilities.len() {
            return Err(TranscriptionError::InvalidInput(format!(
                "f0 has {} frames but voicing has {}",
                f0.len(),
                voiced_probabilities.len()
            )));
        }

        let frames = f0
            .iter()
            .zip(voiced_probabilities)
            .enumerate()
            .map(|(i, (&frequency, &voiced_probability))| ContourFrame {
                time: i as f32 * hop_duration,
                frequency,
                voiced_probability,
                amplitude: None,
            })
            .collect();

        Self::new(hop_duration, frames)
    }

    /// Seconds between frames
    pub fn hop_duration(&self) -> f32 {
        self.hop_duration
    }

    /// All frames in time order
    pub fn frames(&self) -> &[ContourFrame] {
        &self.frames
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True if the contour has no frames
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Voiced frequencies in time order
    pub fn voiced_frequencies(&self, voicing_threshold: f32) -> Vec<f32> {
        self.frames
            .iter()
            .filter_map(|frame| frame.voiced_frequency(voicing_threshold))
            .collect()
    }

    /// Time of the last frame plus one hop (0.0 when empty)
    pub fn duration(&self) -> f32 {
        self.frames
            .last()
            .map(|frame| frame.time + self.hop_duration)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_f0_places_frames_on_hop_grid() {
        let contour =
            FrequencyContour::from_f0(&[Some(440.0), None, Some(330.0)], &[0.9, 0.0, 0.8], 0.01)
                .unwrap();
        assert_eq!(contour.len(), 3);
        assert!((contour.frames()[2].time - 0.02).abs() < 1e-6);
        assert_eq!(contour.voiced_frequencies(0.5), vec![440.0, 330.0]);
    }

    #[test]
    fn test_rejects_bad_contours() {
        assert!(FrequencyContour::new(0.0, vec![]).is_err());
        let frames = vec![ContourFrame::unvoiced(0.2), ContourFrame::unvoiced(0.1)];
        assert!(FrequencyContour::new(0.01, frames).is_err());
        assert!(FrequencyContour::from_f0(&[Some(1.0)], &[], 0.01).is_err());
    }

    #[test]
    fn test_voiced_frequency_threshold() {
        let frame = ContourFrame::voiced(0.0, 440.0, 0.3);
        assert_eq!(frame.voiced_frequency(0.5), None);
        assert_eq!(frame.voiced_frequency(0.2), Some(440.0));
        let nan = ContourFrame::voiced(0.0, f32::NAN, 1.0);
        assert_eq!(nan.voiced_frequency(0.5), None);
    }

    #[test]
    fn test_amplitude_fallback() {
        let frame = ContourFrame::voiced(0.0, 440.0, 0.7);
        assert_eq!(frame.amplitude(), 0.7);
        assert_eq!(frame.with_amplitude(0.2).amplitude(), 0.2);
    }

    #[test]
    fn test_json_validation() {
        let ok = r#"{"hop_duration":0.01,"frames":[{"time":0.0,"frequency":440.0,"voiced_probability":0.9}]}"#;
        let contour: FrequencyContour = serde_json::from_str(ok).unwrap();
        assert_eq!(contour.len(), 1);

        let bad = r#"{"hop_duration":-1.0,"frames":[]}"#;
        assert!(serde_json::from_str::<FrequencyContour>(bad).is_err());
    }
}
