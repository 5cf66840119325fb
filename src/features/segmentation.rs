//! Monophonic contour segmentation
//!
//! Turns a per-frame pitch contour into note events. Each voiced frame is
//! quantized onto the scale; a note stays open while the quantized pitch is
//! stable and is closed by a pitch jump, an unvoiced frame or the end of the
//! contour.

use super::contour::FrequencyContour;
use crate::config::{SegmentationConfig, TranscriptionConfig};
use crate::error::Result;
use crate::notes::{NoteEvent, Pitch};
use crate::scale::{ScaleDegree, ScaleQuantizer};

/// Note currently being accumulated
#[derive(Debug, Clone, Copy)]
struct OpenNote {
    start_time: f32,
    frequency: f32,
    degree: ScaleDegree,
    amplitude: f32,
}

/// Splits a [`FrequencyContour`] into scale-quantized [`NoteEvent`]s
#[derive(Debug, Clone)]
pub struct PitchContourSegmenter {
    quantizer: ScaleQuantizer,
    config: SegmentationConfig,
}

impl PitchContourSegmenter {
    /// Create a segmenter around an existing quantizer
    pub fn new(quantizer: ScaleQuantizer, config: SegmentationConfig) -> Self {
        Self { quantizer, config }
    }

    /// Build the segmenter described by `config`
    pub fn from_config(config: &TranscriptionConfig) -> Result<Self> {
        Ok(Self::new(
            ScaleQuantizer::from_config(&config.scale)?,
            config.segmentation.clone(),
        ))
    }

    /// Quantizer used for each voiced frame
    pub fn quantizer(&self) -> &ScaleQuantizer {
        &self.quantizer
    }

    /// Segment a contour into notes
    ///
    /// # Arguments
    ///
    /// * `contour` - Pitch contour in time order
    ///
    /// # Returns
    ///
    /// Notes in time order. Empty for an empty or fully unvoiced contour.
    /// Each note carries its quantized frequency, its scale degree and the
    /// amplitude of its first frame as velocity.
    ///
    /// # Errors
    ///
    /// Propagates quantizer errors.
    pub fn segment(&self, contour: &FrequencyContour) -> Result<Vec<NoteEvent>> {
        log::debug!(
            "Segmenting contour: {} frames, hop={:.4}s, pitch_change_threshold={:.2}",
            contour.len(),
            contour.hop_duration(),
            self.config.pitch_change_threshold
        );

        let hop = contour.hop_duration();
        let mut notes = Vec::new();
        let mut open: Option<OpenNote> = None;

        for frame in contour.frames() {
            match frame.voiced_frequency(self.config.voicing_threshold) {
                Some(frequency) => {
                    let quantized = self.quantizer.quantize(frequency)?;
                    let pitch_jump = open.map_or(false, |note| {
                        (quantized.frequency - note.frequency).abs()
                            > self.config.pitch_change_threshold
                    });

                    if pitch_jump {
                        if let Some(note) = open.take() {
                            notes.push(close_note(note, frame.time, hop)?);
                        }
                    }

                    if open.is_none() {
                        open = Some(OpenNote {
                            start_time: frame.time,
                            frequency: quantized.frequency,
                            degree: quantized.degree,
                            amplitude: frame.amplitude(),
                        });
                    }
                }
                None => {
                    if let Some(note) = open.take() {
                        notes.push(close_note(note, frame.time, hop)?);
                    }
                }
            }
        }

        if let (Some(note), Some(last)) = (open, contour.frames().last()) {
            notes.push(close_note(note, last.time, hop)?);
        }

        if notes.is_empty() && !contour.is_empty() {
            log::warn!("Contour has {} frames but no voiced notes", contour.len());
        }
        log::debug!("Segmented {} notes", notes.len());

        Ok(notes)
    }
}

/// Close a note at `end_time`, padding to one hop when it would be empty
fn close_note(note: OpenNote, end_time: f32, hop: f32) -> Result<NoteEvent> {
    let end_time = if end_time > note.start_time {
        end_time
    } else {
        note.start_time + hop
    };
    Ok(NoteEvent::new(
        note.start_time,
        end_time,
        Pitch::Hz(note.frequency),
        note.amplitude,
    )?
    .with_scale_degree(note.degree))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::contour::ContourFrame;

    fn segmenter() -> PitchContourSegmenter {
        PitchContourSegmenter::from_config(&TranscriptionConfig::default()).unwrap()
    }

    fn contour(f0: &[Option<f32>]) -> FrequencyContour {
        let voicing: Vec<f32> = f0.iter().map(|f| if f.is_some() { 0.9 } else { 0.0 }).collect();
        FrequencyContour::from_f0(f0, &voicing, 0.01).unwrap()
    }

    #[test]
    fn test_empty_and_unvoiced_contours() {
        let segmenter = segmenter();
        assert!(segmenter.segment(&contour(&[])).unwrap().is_empty());
        assert!(segmenter.segment(&contour(&[None; 50])).unwrap().is_empty());
    }

    #[test]
    fn test_constant_run_yields_one_note() {
        let f0 = vec![Some(441.0); 100];
        let notes = segmenter().segment(&contour(&f0)).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].start_time(), 0.0);
        assert!((notes[0].end_time() - 0.99).abs() < 1e-5);
        assert_eq!(notes[0].hz(), 440.0);
        assert_eq!(notes[0].scale_degree(), Some(ScaleDegree::FIFTH));
        assert!((notes[0].velocity() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_jitter_within_degree_does_not_split() {
        let f0: Vec<Option<f32>> = (0..40)
            .map(|i| Some(if i % 2 == 0 { 436.0 } else { 446.0 }))
            .collect();
        assert_eq!(segmenter().segment(&contour(&f0)).unwrap().len(), 1);
    }

    #[test]
    fn test_pitch_change_splits_note() {
        let mut f0 = vec![Some(440.0); 10];
        f0.extend(vec![Some(330.0); 10]);
        let notes = segmenter().segment(&contour(&f0)).unwrap();
        assert_eq!(notes.len(), 2);
        assert!((notes[0].end_time() - 0.10).abs() < 1e-5);
        assert!((notes[1].start_time() - 0.10).abs() < 1e-5);
        assert_eq!(notes[1].hz(), 330.0);
    }

    #[test]
    fn test_unvoiced_gap_closes_note() {
        let mut f0 = vec![Some(440.0); 5];
        f0.push(None);
        f0.extend(vec![Some(440.0); 5]);
        let notes = segmenter().segment(&contour(&f0)).unwrap();
        assert_eq!(notes.len(), 2);
        assert!((notes[0].end_time() - 0.05).abs() < 1e-5);
        assert!((notes[1].start_time() - 0.06).abs() < 1e-5);
    }

    #[test]
    fn test_low_voicing_probability_is_a_boundary() {
        let frames = vec![
            ContourFrame::voiced(0.00, 440.0, 0.9),
            ContourFrame::voiced(0.01, 440.0, 0.9),
            ContourFrame::voiced(0.02, 440.0, 0.1),
            ContourFrame::voiced(0.03, 440.0, 0.9),
        ];
        let contour = FrequencyContour::new(0.01, frames).unwrap();
        let notes = segmenter().segment(&contour).unwrap();
        assert_eq!(notes.len(), 2);
    }

    #[test]
    fn test_single_frame_note_lasts_one_hop() {
        let notes = segmenter().segment(&contour(&[Some(330.0)])).unwrap();
        assert_eq!(notes.len(), 1);
        assert!((notes[0].duration() - 0.01).abs() < 1e-6);
    }

    #[test]
    fn test_amplitude_taken_at_note_start() {
        let frames = vec![
            ContourFrame::voiced(0.00, 440.0, 0.9).with_amplitude(0.25),
            ContourFrame::voiced(0.01, 440.0, 0.9).with_amplitude(0.75),
        ];
        let contour = FrequencyContour::new(0.01, frames).unwrap();
        let notes = segmenter().segment(&contour).unwrap();
        assert_eq!(notes[0].velocity(), 0.25);
    }
}
