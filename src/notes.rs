//! Note events
//!
//! [`NoteEvent`] is the unit passed between every pipeline stage: detectors
//! produce them, the merger consolidates them and the evaluator consumes them.
//! Fields are validated once, at construction (including deserialization).

use crate::error::{Result, TranscriptionError};
use crate::scale::ScaleDegree;
use serde::{Deserialize, Serialize};

/// Reference pitch for MIDI conversion (A4)
pub const A4_HZ: f32 = 440.0;

/// MIDI note number of A4
pub const A4_MIDI: f32 = 69.0;

/// Convert a frequency in Hz to a fractional MIDI note number
pub fn hz_to_midi(hz: f32) -> f32 {
    A4_MIDI + 12.0 * (hz / A4_HZ).log2()
}

/// Convert a (fractional) MIDI note number to Hz
pub fn midi_to_hz(midi: f32) -> f32 {
    A4_HZ * 2.0f32.powf((midi - A4_MIDI) / 12.0)
}

/// Pitch of a note, either as a MIDI note number or a raw frequency
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pitch {
    /// MIDI note number (0-127)
    Midi(u8),
    /// Frequency in Hz
    Hz(f32),
}

impl Pitch {
    /// Frequency in Hz
    pub fn hz(&self) -> f32 {
        match *self {
            Pitch::Midi(note) => midi_to_hz(note as f32),
            Pitch::Hz(hz) => hz,
        }
    }

    /// Fractional MIDI note number
    pub fn midi(&self) -> f32 {
        match *self {
            Pitch::Midi(note) => note as f32,
            Pitch::Hz(hz) => hz_to_midi(hz),
        }
    }

    /// Nearest integer MIDI note, clamped to 0-127
    pub fn midi_note(&self) -> u8 {
        match *self {
            Pitch::Midi(note) => note,
            Pitch::Hz(hz) => hz_to_midi(hz).round().clamp(0.0, 127.0) as u8,
        }
    }

    fn validate(&self) -> Result<()> {
        match *self {
            Pitch::Midi(note) if note > 127 => Err(TranscriptionError::InvalidInput(format!(
                "MIDI note must be in 0-127, got {}",
                note
            ))),
            Pitch::Hz(hz) if !(hz.is_finite() && hz > 0.0) => {
                Err(TranscriptionError::InvalidFrequency(hz))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Deserialize)]
struct RawNoteEvent {
    start_time: f32,
    end_time: f32,
    pitch: Pitch,
    #[serde(default)]
    velocity: f32,
    #[serde(default)]
    scale_degree: Option<ScaleDegree>,
}

impl TryFrom<RawNoteEvent> for NoteEvent {
    type Error = TranscriptionError;

    fn try_from(raw: RawNoteEvent) -> Result<Self> {
        let note = NoteEvent::new(raw.start_time, raw.end_time, raw.pitch, raw.velocity)?;
        Ok(match raw.scale_degree {
            Some(degree) => note.with_scale_degree(degree),
            None => note,
        })
    }
}

/// A single transcribed or annotated note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNoteEvent")]
pub struct NoteEvent {
    start_time: f32,
    end_time: f32,
    pitch: Pitch,
    velocity: f32,
    scale_degree: Option<ScaleDegree>,
}

impl NoteEvent {
    /// Create a note event
    ///
    /// # Arguments
    ///
    /// * `start_time` - Onset in seconds (>= 0)
    /// * `end_time` - Offset in seconds (> `start_time`)
    /// * `pitch` - MIDI note or frequency
    /// * `velocity` - Velocity or amplitude (>= 0)
    ///
    /// # Errors
    ///
    /// `InvalidInput` for bad timing or velocity, `InvalidFrequency` for a
    /// non-positive Hz pitch.
    pub fn new(start_time: f32, end_time: f32, pitch: Pitch, velocity: f32) -> Result<Self> {
        if !start_time.is_finite() || start_time < 0.0 {
            return Err(TranscriptionError::InvalidInput(format!(
                "Note start time must be finite and >= 0, got {}",
                start_time
            )));
        }
        if !end_time.is_finite() || end_time <= start_time {
            return Err(TranscriptionError::InvalidInput(format!(
                "Note end time ({}) must be finite and after start time ({})",
                end_time, start_time
            )));
        }
        if !velocity.is_finite() || velocity < 0.0 {
            return Err(TranscriptionError::InvalidInput(format!(
                "Note velocity must be finite and >= 0, got {}",
                velocity
            )));
        }
        pitch.validate()?;

        Ok(Self {
            start_time,
            end_time,
            pitch,
            velocity,
            scale_degree: None,
        })
    }

    /// Tag the note with the scale degree it was quantized to
    pub fn with_scale_degree(mut self, degree: ScaleDegree) -> Self {
        self.scale_degree = Some(degree);
        self
    }

    /// Onset in seconds
    pub fn start_time(&self) -> f32 {
        self.start_time
    }

    /// Offset in seconds
    pub fn end_time(&self) -> f32 {
        self.end_time
    }

    /// `end_time - start_time`
    pub fn duration(&self) -> f32 {
        self.end_time - self.start_time
    }

    /// Pitch as stored
    pub fn pitch(&self) -> Pitch {
        self.pitch
    }

    /// Frequency in Hz
    pub fn hz(&self) -> f32 {
        self.pitch.hz()
    }

    /// Fractional MIDI note number
    pub fn midi(&self) -> f32 {
        self.pitch.midi()
    }

    /// Velocity or amplitude
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Scale degree, if the note was quantized
    pub fn scale_degree(&self) -> Option<ScaleDegree> {
        self.scale_degree
    }
}

/// Sort notes by onset, then by frequency
pub fn sort_by_onset(notes: &mut [NoteEvent]) {
    notes.sort_by(|a, b| {
        a.start_time
            .partial_cmp(&b.start_time)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                a.hz()
                    .partial_cmp(&b.hz())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });
}
