//! Performance benchmarks for the transcription stages

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::Array2;
use phin_transcription::features::spectrogram::{
    cqt_bin_frequencies, PHIN_CQT_BINS, PHIN_CQT_BINS_PER_OCTAVE, PHIN_CQT_FMIN,
};
use phin_transcription::{
    evaluate_batch, transcribe_contour, transcribe_spectrogram, FrequencyContour,
    MagnitudeSpectrogram, NoteEvent, Pitch, TranscriptionConfig,
};

/// 30 s contour at 100 frames/s cycling through the scale with light vibrato
fn synthetic_contour() -> FrequencyContour {
    let degrees = [293.33_f32, 330.0, 366.67, 391.0, 440.0, 489.0, 524.8];
    let f0: Vec<Option<f32>> = (0..3000)
        .map(|i| {
            let base = degrees[(i / 25) % degrees.len()];
            let t = i as f32 * 0.01;
            Some(base * (1.0 + 0.003 * (2.0 * std::f32::consts::PI * 5.5 * t).sin()))
        })
        .collect();
    FrequencyContour::from_f0(&f0, &vec![0.9; f0.len()], 0.01).unwrap()
}

/// 10 s CQT-shaped spectrogram with three alternating partials
fn synthetic_spectrogram() -> MagnitudeSpectrogram {
    let n_frames = 500;
    let mut magnitudes = Array2::<f32>::from_elem((PHIN_CQT_BINS, n_frames), 0.01);
    for t in 0..n_frames {
        let bin = [40, 54, 62][(t / 20) % 3];
        let envelope = 1.0 - (t % 20) as f32 / 20.0;
        magnitudes[[bin, t]] += envelope;
        magnitudes[[bin + 24, t]] += 0.5 * envelope;
    }
    let bins = cqt_bin_frequencies(PHIN_CQT_FMIN, PHIN_CQT_BINS, PHIN_CQT_BINS_PER_OCTAVE);
    MagnitudeSpectrogram::new(magnitudes, bins, 0.02).unwrap()
}

fn bench_transcribe_contour(c: &mut Criterion) {
    let _ = env_logger::builder().is_test(true).try_init();
    let contour = synthetic_contour();
    let config = TranscriptionConfig::default();

    c.bench_function("transcribe_contour_30s", |b| {
        b.iter(|| {
            let _ = transcribe_contour(black_box(&contour), black_box(&config));
        });
    });
}

fn bench_transcribe_spectrogram(c: &mut Criterion) {
    let spectrogram = synthetic_spectrogram();
    let config = TranscriptionConfig::default();

    c.bench_function("transcribe_spectrogram_10s", |b| {
        b.iter(|| {
            let _ = transcribe_spectrogram(black_box(&spectrogram), black_box(&config));
        });
    });
}

fn bench_evaluate_batch(c: &mut Criterion) {
    let notes: Vec<NoteEvent> = (0..200)
        .map(|i| {
            let start = i as f32 * 0.25;
            NoteEvent::new(start, start + 0.2, Pitch::Midi(60 + (i % 12) as u8), 80.0).unwrap()
        })
        .collect();
    let shifted: Vec<NoteEvent> = notes
        .iter()
        .map(|n| NoteEvent::new(n.start_time() + 0.05, n.end_time() + 0.05, n.pitch(), 80.0).unwrap())
        .collect();
    let references = vec![notes; 32];
    let predictions = vec![shifted; 32];

    c.bench_function("evaluate_batch_32x200", |b| {
        b.iter(|| {
            let _ = evaluate_batch(black_box(&references), black_box(&predictions));
        });
    });
}

criterion_group!(
    benches,
    bench_transcribe_contour,
    bench_transcribe_spectrogram,
    bench_evaluate_batch
);
criterion_main!(benches);
