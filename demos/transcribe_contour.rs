//! Example: Transcribe a pitch contour into phin notes
//!
//! Usage:
//!   cargo run --release --example transcribe_contour -- [--json] [--midi out.mid] [--notes out.json] <contour.json>
//!
//! The contour file is `{"hop_duration": s, "frames": [{"time": t, "frequency": f, "voiced_probability": p}, ...]}`.
//! Set `RUST_LOG=debug` to see per-stage logging.

use phin_transcription::io::{load_contour, save_notes, write_midi, MidiExportConfig};
use phin_transcription::{analyze_contour, TranscriptionConfig};
use std::env;
use std::time::Instant;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let mut json = false;
    let mut midi_out: Option<String> = None;
    let mut notes_out: Option<String> = None;
    let mut path: Option<String> = None;

    while let Some(a) = args.first().cloned() {
        args.remove(0);
        match a.as_str() {
            "--json" => json = true,
            "--midi" => {
                midi_out = Some(args.first().ok_or("--midi requires a path")?.clone());
                args.remove(0);
            }
            "--notes" => {
                notes_out = Some(args.first().ok_or("--notes requires a path")?.clone());
                args.remove(0);
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: transcribe_contour [--json] [--midi out.mid] [--notes out.json] <contour.json>\n\
                     \n\
                     --json         Print the full analysis as JSON\n\
                     --midi PATH    Write the notes as a Standard MIDI File\n\
                     --notes PATH   Write the notes as JSON\n"
                );
                return Ok(());
            }
            _ => path = Some(a),
        }
    }

    let Some(path) = path else {
        eprintln!("ERROR: Provide a contour JSON path. Use --help for usage.");
        std::process::exit(2);
    };

    let config = TranscriptionConfig::default();
    let t0 = Instant::now();

    let contour = load_contour(&path)?;
    let analysis = analyze_contour(&contour, &config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        println!("{}: {} frames, {} notes", path, contour.len(), analysis.notes.len());
        for note in &analysis.notes {
            println!(
                "  {:>8.3}s - {:>8.3}s  {:>8.2} Hz  midi={:>6.2}  degree={}  vel={:.3}",
                note.start_time(),
                note.end_time(),
                note.hz(),
                note.midi(),
                note.scale_degree()
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                note.velocity()
            );
        }
        println!(
            "Scale adherence: {:.1}%  Vibrato: {} ({:.2} Hz, {:.1} cents)",
            analysis.frame_scale_adherence * 100.0,
            if analysis.vibrato.present { "yes" } else { "no" },
            analysis.vibrato.rate_hz,
            analysis.vibrato.extent_cents
        );
        println!(
            "Density: {:.2} notes/s  Range: {:.1} semitones  Tempo: {:.1} BPM",
            analysis.quality.note_density,
            analysis.quality.pitch_range_semitones,
            analysis.rhythmic.tempo_bpm
        );
    }

    if let Some(out) = midi_out {
        write_midi(&analysis.notes, &out, &MidiExportConfig::default())?;
        eprintln!("Wrote {}", out);
    }
    if let Some(out) = notes_out {
        save_notes(&analysis.notes, &out)?;
        eprintln!("Wrote {}", out);
    }

    eprintln!("Done in {:.0}ms", t0.elapsed().as_secs_f64() * 1000.0);
    Ok(())
}
