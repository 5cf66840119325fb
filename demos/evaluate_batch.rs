//! Example: Score many transcriptions against their references in parallel
//!
//! Usage:
//!   cargo run --release --example evaluate_batch -- [--jobs N] [--json] <ref1.json> <pred1.json> [<ref2.json> <pred2.json> ...]
//!
//! Notes:
//! - Arguments are (reference, prediction) pairs of note-list JSON or `.mid` files.
//! - Default workers: (available CPU threads - 1), keeping one core free for the system.

use phin_transcription::analysis::batch::evaluate_batch;
use phin_transcription::io::{load_notes, read_midi};
use phin_transcription::{EvaluationConfig, NoteEvent, TranscriptionEvaluator};
use std::env;
use std::path::Path;
use std::time::Instant;

fn load_any(path: &str) -> phin_transcription::Result<Vec<NoteEvent>> {
    let is_midi = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("mid") || e.eq_ignore_ascii_case("midi"))
        .unwrap_or(false);
    if is_midi {
        read_midi(path)
    } else {
        load_notes(path)
    }
}

fn default_jobs() -> usize {
    let n = std::thread::available_parallelism().map(|v| v.get()).unwrap_or(1);
    std::cmp::max(1, n.saturating_sub(1))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let mut json = false;
    let mut jobs: Option<usize> = None;
    let mut paths: Vec<String> = Vec::new();

    while let Some(a) = args.first().cloned() {
        args.remove(0);
        match a.as_str() {
            "--json" => json = true,
            "--jobs" => {
                let v = args
                    .first()
                    .ok_or("--jobs requires a value")?
                    .parse::<usize>()?;
                args.remove(0);
                jobs = Some(std::cmp::max(1, v));
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: evaluate_batch [--jobs N] [--json] <ref1> <pred1> [<ref2> <pred2> ...]\n\
                     \n\
                     --jobs N   Parallel workers (default: CPU-1)\n\
                     --json     Emit the batch report as JSON\n"
                );
                return Ok(());
            }
            _ => paths.push(a),
        }
    }

    if paths.is_empty() || paths.len() % 2 != 0 {
        eprintln!("ERROR: Provide (reference, prediction) path pairs. Use --help for usage.");
        std::process::exit(2);
    }

    let mut references = Vec::with_capacity(paths.len() / 2);
    let mut predictions = Vec::with_capacity(paths.len() / 2);
    for pair in paths.chunks(2) {
        references.push(load_any(&pair[0])?);
        predictions.push(load_any(&pair[1])?);
    }

    let jobs = jobs.unwrap_or_else(default_jobs);
    eprintln!("Batch: {} pairs, jobs={}", references.len(), jobs);

    let evaluator = TranscriptionEvaluator::new(EvaluationConfig::default())?;

    let t0 = Instant::now();
    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;
    let report = pool.install(|| evaluate_batch(&evaluator, &references, &predictions))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for (idx, (pair, r)) in paths.chunks(2).zip(&report.reports).enumerate() {
            println!(
                "[{}/{}] {} vs {}: onset F1={:.3} (P={:.3} R={:.3}) pitch F1={:.3} scale={:.1}%",
                idx + 1,
                report.total_evaluations,
                pair[0],
                pair[1],
                r.onset_f1,
                r.onset_precision,
                r.onset_recall,
                r.pitch_f1,
                r.scale.adherence * 100.0
            );
        }
        println!(
            "onset_f1: mean={:.3} std={:.3} median={:.3} min={:.3} max={:.3}",
            report.onset_f1.mean,
            report.onset_f1.std,
            report.onset_f1.median,
            report.onset_f1.min,
            report.onset_f1.max
        );
        println!(
            "pitch_f1: mean={:.3} std={:.3} median={:.3} min={:.3} max={:.3}",
            report.pitch_f1.mean,
            report.pitch_f1.std,
            report.pitch_f1.median,
            report.pitch_f1.min,
            report.pitch_f1.max
        );
    }

    eprintln!("Done: wall={:.0}ms", t0.elapsed().as_secs_f64() * 1000.0);
    Ok(())
}
