//! Standard MIDI File import and export
//!
//! Export writes a single-track SMF: tempo, program change, then note
//! on/off pairs. Import reads every non-drum channel of a metrical SMF into
//! notes, honouring tempo changes.

use crate::error::{Result, TranscriptionError};
use crate::notes::{sort_by_onset, NoteEvent, Pitch};
use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// General MIDI percussion channel (zero-based)
const DRUM_CHANNEL: u8 = 9;

/// SMF export parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiExportConfig {
    /// Tempo written to the file (default: 120.0)
    pub tempo_bpm: f32,

    /// Ticks per quarter note (default: 480)
    pub ppq: u16,

    /// General MIDI program (default: 24, nylon guitar)
    pub program: u8,

    /// Zero-based MIDI channel (default: 0)
    pub channel: u8,
}

impl Default for MidiExportConfig {
    fn default() -> Self {
        Self {
            tempo_bpm: 120.0,
            ppq: 480,
            program: 24,
            channel: 0,
        }
    }
}

/// Map a note velocity to MIDI 1-127
///
/// Velocities up to 1.0 are treated as normalized amplitudes; larger values
/// as MIDI velocities.
fn midi_velocity(velocity: f32) -> u8 {
    let scaled = if velocity <= 1.0 {
        velocity * 127.0
    } else {
        velocity
    };
    scaled.round().clamp(1.0, 127.0) as u8
}

/// Encode notes as SMF bytes
///
/// # Errors
///
/// `MidiExportError` for a non-positive tempo, zero or oversized PPQ, an
/// out-of-range program/channel, or a writer failure.
pub fn notes_to_smf_bytes(notes: &[NoteEvent], config: &MidiExportConfig) -> Result<Vec<u8>> {
    if !config.tempo_bpm.is_finite() || config.tempo_bpm <= 0.0 {
        return Err(TranscriptionError::MidiExportError(format!(
            "Tempo must be > 0, got {}",
            config.tempo_bpm
        )));
    }
    if config.ppq == 0 || config.ppq > 0x7FFF {
        return Err(TranscriptionError::MidiExportError(format!(
            "PPQ must be in 1..=32767, got {}",
            config.ppq
        )));
    }
    if config.program > 127 || config.channel > 15 {
        return Err(TranscriptionError::MidiExportError(format!(
            "Program {} or channel {} out of range",
            config.program, config.channel
        )));
    }

    let ticks_per_second = config.ppq as f32 * config.tempo_bpm / 60.0;
    let to_ticks = |seconds: f32| (seconds * ticks_per_second).round() as u32;
    let channel = u4::from(config.channel);

    // (tick, note-off before note-on at equal ticks, message)
    let mut timed: Vec<(u32, u8, MidiMessage)> = Vec::with_capacity(notes.len() * 2);
    for note in notes {
        let key = u7::from(note.pitch().midi_note());
        let start = to_ticks(note.start_time());
        let end = to_ticks(note.end_time()).max(start + 1);
        timed.push((
            start,
            1,
            MidiMessage::NoteOn {
                key,
                vel: u7::from(midi_velocity(note.velocity())),
            },
        ));
        timed.push((
            end,
            0,
            MidiMessage::NoteOff {
                key,
                vel: u7::from(0),
            },
        ));
    }
    timed.sort_by_key(|&(tick, order, _)| (tick, order));

    let tempo_uspq = (60_000_000.0 / config.tempo_bpm).round() as u32;
    let mut track = vec![
        TrackEvent {
            delta: u28::from(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::from(tempo_uspq.min(0xFF_FFFF)))),
        },
        TrackEvent {
            delta: u28::from(0),
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::ProgramChange {
                    program: u7::from(config.program),
                },
            },
        },
    ];

    let mut current_tick = 0u32;
    for (tick, _, message) in timed {
        track.push(TrackEvent {
            delta: u28::from(tick - current_tick),
            kind: TrackEventKind::Midi { channel, message },
        });
        current_tick = tick;
    }
    track.push(TrackEvent {
        delta: u28::from(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let smf = Smf {
        header: Header {
            format: Format::SingleTrack,
            timing: Timing::Metrical(u15::from(config.ppq)),
        },
        tracks: vec![track],
    };

    let mut bytes = Vec::new();
    smf.write(&mut bytes).map_err(|e| {
        TranscriptionError::MidiExportError(format!("Failed to write MIDI data: {:?}", e))
    })?;

    log::debug!(
        "Encoded {} notes as {} bytes of SMF ({} BPM, {} PPQ)",
        notes.len(),
        bytes.len(),
        config.tempo_bpm,
        config.ppq
    );

    Ok(bytes)
}

/// Write notes to a `.mid` file
pub fn write_midi<P: AsRef<Path>>(
    notes: &[NoteEvent],
    path: P,
    config: &MidiExportConfig,
) -> Result<()> {
    let bytes = notes_to_smf_bytes(notes, config)?;
    std::fs::write(path.as_ref(), bytes)?;
    log::debug!("Wrote MIDI file {}", path.as_ref().display());
    Ok(())
}

/// Seconds at each tempo change, for converting absolute ticks
struct TempoMap {
    /// (tick, seconds at tick, microseconds per quarter note from tick on)
    segments: Vec<(u64, f64, f64)>,
    ppq: f64,
}

impl TempoMap {
    fn new(mut changes: Vec<(u64, u32)>, ppq: u16) -> Self {
        changes.sort_by_key(|&(tick, _)| tick);
        let ppq = ppq as f64;

        let mut segments = vec![(0u64, 0.0f64, 500_000.0f64)];
        for (tick, uspq) in changes {
            let (last_tick, last_seconds, last_uspq) = segments[segments.len() - 1];
            let seconds = last_seconds + (tick - last_tick) as f64 * last_uspq / ppq / 1e6;
            if tick == last_tick {
                segments.pop();
            }
            segments.push((tick, seconds, uspq as f64));
        }

        Self { segments, ppq }
    }

    fn seconds(&self, tick: u64) -> f32 {
        let index = self.segments.partition_point(|&(t, _, _)| t <= tick).saturating_sub(1);
        let (segment_tick, segment_seconds, uspq) = self.segments[index];
        (segment_seconds + (tick - segment_tick) as f64 * uspq / self.ppq / 1e6) as f32
    }
}

/// Decode the notes of an SMF
///
/// Drum-channel notes are skipped. A note-on with velocity 0 ends a note.
/// Overlapping notes on the same key end first-in, first-out; notes still
/// sounding at the end of their track are dropped.
///
/// # Errors
///
/// `SerializationError` for unparsable data, `InvalidInput` for
/// timecode-based files.
pub fn notes_from_smf_bytes(bytes: &[u8]) -> Result<Vec<NoteEvent>> {
    let smf = Smf::parse(bytes).map_err(|e| {
        TranscriptionError::SerializationError(format!("Failed to parse MIDI data: {}", e))
    })?;

    let ppq = match smf.header.timing {
        Timing::Metrical(ppq) => ppq.as_int(),
        Timing::Timecode(_, _) => {
            return Err(TranscriptionError::InvalidInput(
                "Timecode-based MIDI files are not supported".to_string(),
            ))
        }
    };
    if ppq == 0 {
        return Err(TranscriptionError::InvalidInput("MIDI PPQ is 0".to_string()));
    }

    let mut tempo_changes = Vec::new();
    for track in &smf.tracks {
        let mut tick = 0u64;
        for event in track {
            tick += event.delta.as_int() as u64;
            if let TrackEventKind::Meta(MetaMessage::Tempo(uspq)) = event.kind {
                tempo_changes.push((tick, uspq.as_int()));
            }
        }
    }
    let tempo = TempoMap::new(tempo_changes, ppq);

    let mut notes = Vec::new();
    for track in &smf.tracks {
        let mut tick = 0u64;
        let mut sounding: HashMap<(u8, u8), Vec<(u64, u8)>> = HashMap::new();

        for event in track {
            tick += event.delta.as_int() as u64;
            let (channel, message) = match event.kind {
                TrackEventKind::Midi { channel, message } => (channel.as_int(), message),
                _ => continue,
            };
            if channel == DRUM_CHANNEL {
                continue;
            }

            let (key, velocity, is_on) = match message {
                MidiMessage::NoteOn { key, vel } => (key.as_int(), vel.as_int(), vel.as_int() > 0),
                MidiMessage::NoteOff { key, vel } => (key.as_int(), vel.as_int(), false),
                _ => continue,
            };

            if is_on {
                sounding.entry((channel, key)).or_default().push((tick, velocity));
                continue;
            }

            let started = match sounding.get_mut(&(channel, key)) {
                Some(queue) if !queue.is_empty() => queue.remove(0),
                _ => continue,
            };
            let (start_tick, start_velocity) = started;
            let start = tempo.seconds(start_tick);
            let end = tempo.seconds(tick);
            if end > start {
                notes.push(NoteEvent::new(
                    start,
                    end,
                    Pitch::Midi(key),
                    start_velocity as f32,
                )?);
            }
        }
    }

    sort_by_onset(&mut notes);
    log::debug!("Decoded {} notes from SMF ({} PPQ)", notes.len(), ppq);
    Ok(notes)
}

/// Read the notes of a `.mid` file
pub fn read_midi<P: AsRef<Path>>(path: P) -> Result<Vec<NoteEvent>> {
    let bytes = std::fs::read(path.as_ref())?;
    notes_from_smf_bytes(&bytes)
}
