//! Note list I/O
//!
//! JSON persistence via serde_json and Standard MIDI Files via midly.

pub mod annotations;
pub mod midi;

pub use annotations::{load_contour, load_notes, save_contour, save_notes};
pub use midi::{read_midi, write_midi, MidiExportConfig};
