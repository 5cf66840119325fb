//! JSON persistence for note lists and contours
//!
//! Note lists are stored as a JSON array of note objects:
//!
//! ```json
//! [{"start_time": 0.0, "end_time": 0.5, "pitch": {"midi": 60}, "velocity": 100.0}]
//! ```
//!
//! `pitch` is either `{"midi": n}` or `{"hz": f}`; `velocity` and
//! `scale_degree` are optional. Every note is validated on load.

use crate::error::Result;
use crate::features::contour::FrequencyContour;
use crate::notes::NoteEvent;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

fn save_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Load a note list
///
/// # Errors
///
/// `IoError` if the file cannot be read, `SerializationError` for malformed
/// JSON or notes that fail validation.
pub fn load_notes<P: AsRef<Path>>(path: P) -> Result<Vec<NoteEvent>> {
    let path = path.as_ref();
    let notes: Vec<NoteEvent> = load_json(path)?;
    log::debug!("Loaded {} notes from {}", notes.len(), path.display());
    Ok(notes)
}

/// Save a note list as pretty-printed JSON
pub fn save_notes<P: AsRef<Path>>(notes: &[NoteEvent], path: P) -> Result<()> {
    let path = path.as_ref();
    save_json(notes, path)?;
    log::debug!("Saved {} notes to {}", notes.len(), path.display());
    Ok(())
}

/// Load a pitch contour (`{"hop_duration": s, "frames": [...]}`)
pub fn load_contour<P: AsRef<Path>>(path: P) -> Result<FrequencyContour> {
    let path = path.as_ref();
    let contour: FrequencyContour = load_json(path)?;
    log::debug!(
        "Loaded contour with {} frames from {}",
        contour.len(),
        path.display()
    );
    Ok(contour)
}

/// Save a pitch contour
pub fn save_contour<P: AsRef<Path>>(contour: &FrequencyContour, path: P) -> Result<()> {
    save_json(contour, path.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TranscriptionError;
    use crate::features::contour::ContourFrame;
    use crate::notes::Pitch;

    #[test]
    fn test_notes_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");
        let notes = vec![
            NoteEvent::new(0.0, 0.5, Pitch::Midi(60), 100.0).unwrap(),
            NoteEvent::new(0.5, 0.75, Pitch::Hz(440.0), 0.4).unwrap(),
        ];

        save_notes(&notes, &path).unwrap();
        assert_eq!(load_notes(&path).unwrap(), notes);
    }

    #[test]
    fn test_contour_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contour.json");
        let contour = FrequencyContour::new(
            0.01,
            vec![
                ContourFrame::voiced(0.0, 440.0, 0.9),
                ContourFrame::unvoiced(0.01),
            ],
        )
        .unwrap();

        save_contour(&contour, &path).unwrap();
        assert_eq!(load_contour(&path).unwrap(), contour);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_notes(dir.path().join("missing.json")),
            Err(TranscriptionError::IoError(_))
        ));

        let path = dir.path().join("bad.json");
        std::fs::write(
            &path,
            r#"[{"start_time": 1.0, "end_time": 0.5, "pitch": {"midi": 60}}]"#,
        )
        .unwrap();
        assert!(matches!(
            load_notes(&path),
            Err(TranscriptionError::SerializationError(_))
        ));
    }
}
