//! Melodic, rhythmic and pitch-distribution statistics
//!
//! Reference-free descriptors of a note list. Notes are taken in the order
//! given; transcriptions from this crate are already sorted by onset.

use crate::notes::NoteEvent;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Number of entries kept in "most common" lists
pub const TOP_N: usize = 10;

/// Shortest interval pattern counted
pub const MIN_PATTERN_LENGTH: usize = 2;

/// Longest interval pattern counted
pub const MAX_PATTERN_LENGTH: usize = 5;

/// Occurrences of one melodic interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalCount {
    /// Interval in semitones (signed)
    pub interval: i32,

    /// Number of occurrences
    pub count: usize,
}

/// Occurrences of one interval sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternCount {
    /// Consecutive intervals in semitones
    pub intervals: Vec<i32>,

    /// Number of occurrences
    pub count: usize,
}

/// Interval statistics of a melody
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MelodicPatterns {
    /// Semitone interval between each pair of consecutive notes
    pub intervals: Vec<i32>,

    /// Most common intervals, most frequent first
    pub common_intervals: Vec<IntervalCount>,

    /// Most common interval sequences, most frequent first
    pub common_patterns: Vec<PatternCount>,

    /// Number of distinct interval sequences seen
    pub distinct_patterns: usize,
}

/// Timing statistics of a note list
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RhythmicFeatures {
    /// Onset-to-onset intervals in seconds
    pub inter_onset_intervals: Vec<f32>,

    /// Note durations in seconds
    pub note_durations: Vec<f32>,

    /// Notes per minute (60 / mean IOI)
    pub tempo_bpm: f32,

    /// Mean inter-onset interval
    pub mean_ioi: f32,

    /// Population standard deviation of the inter-onset intervals
    pub std_ioi: f32,

    /// Coefficient of variation of the inter-onset intervals
    pub rhythmic_variability: f32,
}

/// Occurrences of one (rounded) MIDI pitch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitchCount {
    /// MIDI note number
    pub midi: u8,

    /// Number of notes
    pub count: usize,
}

/// Pitch histogram statistics
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PitchDistribution {
    /// Highest minus lowest pitch in semitones
    pub pitch_range_semitones: f32,

    /// Note count per MIDI pitch, ascending pitch
    pub histogram: Vec<PitchCount>,

    /// Most common pitches, most frequent first
    pub common_pitches: Vec<PitchCount>,

    /// Number of distinct MIDI pitches
    pub distinct_pitches: usize,

    /// Shannon entropy of the histogram in bits
    pub entropy_bits: f32,
}

/// Reference-free quality indicators
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TranscriptionQuality {
    /// Notes per second of audio
    pub note_density: f32,

    /// Highest minus lowest pitch in semitones
    pub pitch_range_semitones: f32,

    /// Mean velocity
    pub average_velocity: f32,

    /// Summed note duration over the last note's end time
    pub temporal_coverage: f32,
}

/// Sort `(key, count)` pairs by count, most frequent first, and keep the top entries
///
/// The sort is stable, so ties keep their incoming order.
fn top_counts<K>(mut counts: Vec<(K, usize)>, n: usize) -> Vec<(K, usize)> {
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(n);
    counts
}

/// Melodic interval statistics
///
/// Intervals are rounded to whole semitones. Sequences of 2 to 5
/// consecutive intervals are counted, limited to lengths shorter than the
/// interval list. Fewer than two notes yields empty statistics.
pub fn melodic_patterns(notes: &[NoteEvent]) -> MelodicPatterns {
    if notes.len() < 2 {
        return MelodicPatterns::default();
    }

    let intervals: Vec<i32> = notes
        .windows(2)
        .map(|pair| (pair[1].midi() - pair[0].midi()).round() as i32)
        .collect();

    let mut interval_counts: BTreeMap<i32, usize> = BTreeMap::new();
    for &interval in &intervals {
        *interval_counts.entry(interval).or_insert(0) += 1;
    }
    let common_intervals = top_counts(interval_counts.into_iter().collect(), TOP_N)
        .into_iter()
        .map(|(interval, count)| IntervalCount { interval, count })
        .collect();

    // First-seen order breaks ties between equally common patterns
    let mut pattern_counts: Vec<(Vec<i32>, usize)> = Vec::new();
    let mut index: HashMap<Vec<i32>, usize> = HashMap::new();
    let longest = MAX_PATTERN_LENGTH.min(intervals.len().saturating_sub(1));
    for length in MIN_PATTERN_LENGTH..=longest {
        for window in intervals.windows(length) {
            match index.get(window) {
                Some(&i) => pattern_counts[i].1 += 1,
                None => {
                    index.insert(window.to_vec(), pattern_counts.len());
                    pattern_counts.push((window.to_vec(), 1));
                }
            }
        }
    }
    let distinct_patterns = pattern_counts.len();
    let common_patterns = top_counts(pattern_counts, TOP_N)
        .into_iter()
        .map(|(intervals, count)| PatternCount { intervals, count })
        .collect();

    MelodicPatterns {
        intervals,
        common_intervals,
        common_patterns,
        distinct_patterns,
    }
}

/// Inter-onset and duration statistics
///
/// Fewer than two notes yields zero tempo and variability.
pub fn rhythmic_features(notes: &[NoteEvent]) -> RhythmicFeatures {
    let note_durations: Vec<f32> = notes.iter().map(NoteEvent::duration).collect();
    if notes.len() < 2 {
        return RhythmicFeatures {
            note_durations,
            ..RhythmicFeatures::default()
        };
    }

    let inter_onset_intervals: Vec<f32> = notes
        .windows(2)
        .map(|pair| pair[1].start_time() - pair[0].start_time())
        .collect();

    let n = inter_onset_intervals.len() as f32;
    let mean_ioi = inter_onset_intervals.iter().sum::<f32>() / n;
    let std_ioi = (inter_onset_intervals
        .iter()
        .map(|ioi| (ioi - mean_ioi) * (ioi - mean_ioi))
        .sum::<f32>()
        / n)
        .sqrt();

    let (tempo_bpm, rhythmic_variability) = if mean_ioi > 0.0 {
        (60.0 / mean_ioi, std_ioi / mean_ioi)
    } else {
        (0.0, 0.0)
    };

    RhythmicFeatures {
        inter_onset_intervals,
        note_durations,
        tempo_bpm,
        mean_ioi,
        std_ioi,
        rhythmic_variability,
    }
}

/// Shannon entropy in bits of a count distribution
///
/// Zero counts are ignored; an empty or all-zero distribution has entropy 0.
pub fn entropy(counts: &[usize]) -> f32 {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }

    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f32 / total as f32;
            -p * p.log2()
        })
        .sum()
}

fn pitch_range_semitones(notes: &[NoteEvent]) -> f32 {
    if notes.is_empty() {
        return 0.0;
    }
    let (low, high) = notes.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), note| {
        (lo.min(note.midi()), hi.max(note.midi()))
    });
    high - low
}

/// Pitch histogram over MIDI notes rounded to the nearest semitone
pub fn pitch_distribution(notes: &[NoteEvent]) -> PitchDistribution {
    if notes.is_empty() {
        return PitchDistribution::default();
    }

    let mut counts: BTreeMap<u8, usize> = BTreeMap::new();
    for note in notes {
        *counts.entry(note.pitch().midi_note()).or_insert(0) += 1;
    }

    let histogram: Vec<PitchCount> = counts
        .iter()
        .map(|(&midi, &count)| PitchCount { midi, count })
        .collect();
    let common_pitches = top_counts(counts.iter().map(|(&m, &c)| (m, c)).collect(), TOP_N)
        .into_iter()
        .map(|(midi, count)| PitchCount { midi, count })
        .collect();
    let entropy_bits = entropy(&counts.values().copied().collect::<Vec<_>>());

    PitchDistribution {
        pitch_range_semitones: pitch_range_semitones(notes),
        distinct_pitches: histogram.len(),
        histogram,
        common_pitches,
        entropy_bits,
    }
}

/// Reference-free quality indicators
///
/// # Arguments
///
/// * `notes` - Transcribed notes
/// * `duration_seconds` - Length of the transcribed audio; density is 0 when not positive
pub fn transcription_quality(notes: &[NoteEvent], duration_seconds: f32) -> TranscriptionQuality {
    let note_density = if duration_seconds > 0.0 {
        notes.len() as f32 / duration_seconds
    } else {
        0.0
    };

    if notes.is_empty() {
        return TranscriptionQuality {
            note_density,
            ..TranscriptionQuality::default()
        };
    }

    let average_velocity =
        notes.iter().map(NoteEvent::velocity).sum::<f32>() / notes.len() as f32;
    let last_end = notes
        .iter()
        .map(NoteEvent::end_time)
        .fold(0.0f32, f32::max);
    let covered: f32 = notes.iter().map(NoteEvent::duration).sum();

    TranscriptionQuality {
        note_density,
        pitch_range_semitones: pitch_range_semitones(notes),
        average_velocity,
        temporal_coverage: if last_end > 0.0 { covered / last_end } else { 0.0 },
    }
}
