//! Near-duplicate note consolidation
//!
//! Single left-to-right scan with one open group. A candidate joins the
//! group when both its start time and its frequency are within tolerance of
//! the last member added; otherwise the group is collapsed into one note and
//! a new group starts. A closed group whose merged note is still within
//! both tolerances of the previously emitted note is folded into that note's
//! group, so no two adjacent outputs are near each other.

use crate::config::MergeConfig;
use crate::error::Result;
use crate::notes::{sort_by_onset, NoteEvent, Pitch};

/// Merges candidate notes that are close in onset and frequency
#[derive(Debug, Clone, Copy, Default)]
pub struct NoteEventMerger {
    config: MergeConfig,
}

impl NoteEventMerger {
    /// Create a merger
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    /// Create a merger from explicit tolerances
    pub fn with_tolerances(time_tolerance: f32, frequency_tolerance: f32) -> Self {
        Self::new(MergeConfig {
            time_tolerance,
            frequency_tolerance,
        })
    }

    /// Tolerances in use
    pub fn config(&self) -> MergeConfig {
        self.config
    }

    /// Merge near-duplicate candidates
    ///
    /// # Arguments
    ///
    /// * `candidates` - Candidate notes; sorted by onset before scanning
    ///
    /// # Returns
    ///
    /// Time-ordered notes. Singleton groups are returned unchanged; larger
    /// groups become one note with the mean start time, frequency and
    /// velocity, lasting from the mean start for the spread of member starts.
    ///
    /// # Errors
    ///
    /// Only if a merged note fails validation, which cannot happen for
    /// validated inputs.
    pub fn merge(&self, mut candidates: Vec<NoteEvent>) -> Result<Vec<NoteEvent>> {
        log::debug!(
            "Merging {} candidates (time_tolerance={:.3}s, frequency_tolerance={:.3})",
            candidates.len(),
            self.config.time_tolerance,
            self.config.frequency_tolerance
        );

        if candidates.len() < 2 {
            return Ok(candidates);
        }

        sort_by_onset(&mut candidates);

        let mut groups: Vec<(Vec<NoteEvent>, NoteEvent)> = Vec::with_capacity(candidates.len());
        let mut group: Vec<NoteEvent> = Vec::new();

        for candidate in candidates {
            let joins = group.last().map_or(false, |last| self.is_near(last, &candidate));
            if !joins && !group.is_empty() {
                self.close_group(&mut groups, std::mem::take(&mut group))?;
            }
            group.push(candidate);
        }
        if !group.is_empty() {
            self.close_group(&mut groups, group)?;
        }

        let mut merged: Vec<NoteEvent> = groups.into_iter().map(|(_, note)| note).collect();
        sort_by_onset(&mut merged);
        log::debug!("Merged into {} notes", merged.len());

        Ok(merged)
    }

    /// Emit a finished group, folding it into earlier groups while their merged notes are near
    fn close_group(
        &self,
        groups: &mut Vec<(Vec<NoteEvent>, NoteEvent)>,
        mut members: Vec<NoteEvent>,
    ) -> Result<()> {
        let mut note = merge_group(&members)?;
        while let Some((_, previous)) = groups.last() {
            if !self.is_near(previous, &note) {
                break;
            }
            if let Some((mut earlier, _)) = groups.pop() {
                earlier.append(&mut members);
                members = earlier;
                note = merge_group(&members)?;
            }
        }
        groups.push((members, note));
        Ok(())
    }

    fn is_near(&self, last: &NoteEvent, candidate: &NoteEvent) -> bool {
        (candidate.start_time() - last.start_time()).abs() <= self.config.time_tolerance
            && (candidate.hz() - last.hz()).abs() <= self.config.frequency_tolerance
    }
}

/// Collapse a group of notes into one
fn merge_group(group: &[NoteEvent]) -> Result<NoteEvent> {
    if let [single] = group {
        return Ok(single.clone());
    }

    let count = group.len() as f32;
    let mean = |value: fn(&NoteEvent) -> f32| group.iter().map(value).sum::<f32>() / count;

    let start_time = mean(NoteEvent::start_time);
    let velocity = mean(NoteEvent::velocity);
    let earliest = group
        .iter()
        .map(NoteEvent::start_time)
        .fold(f32::INFINITY, f32::min);
    let latest = group
        .iter()
        .map(NoteEvent::start_time)
        .fold(f32::NEG_INFINITY, f32::max);

    // Coincident starts have no spread; keep the members' typical length
    let span = latest - earliest;
    let duration = if span > 0.0 {
        span
    } else {
        mean(NoteEvent::duration)
    };

    let first = &group[0];
    let pitch = if group.iter().all(|note| note.pitch() == first.pitch()) {
        first.pitch()
    } else {
        Pitch::Hz(mean(NoteEvent::hz))
    };
    let degree = first
        .scale_degree()
        .filter(|&degree| group.iter().all(|note| note.scale_degree() == Some(degree)));

    let note = NoteEvent::new(start_time, start_time + duration, pitch, velocity)?;
    Ok(match degree {
        Some(degree) => note.with_scale_degree(degree),
        None => note,
    })
}
