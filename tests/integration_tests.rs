//! Integration tests for the transcription pipeline

use ndarray::Array2;
use phin_transcription::io::{load_notes, read_midi, save_notes, write_midi, MidiExportConfig};
use phin_transcription::{
    analyze_contour, detect_polyphonic_notes, evaluate, evaluate_batch, merge_notes, quantize,
    segment_contour, transcribe_contour, transcribe_spectrogram, FrequencyContour,
    MagnitudeSpectrogram, NoteEvent, Pitch, ScaleDegree, ScaleQuantizer, ScaleTuning,
    TranscriptionConfig, TranscriptionError,
};

fn note(start: f32, midi: u8) -> NoteEvent {
    NoteEvent::new(start, start + 0.25, Pitch::Midi(midi), 80.0).unwrap()
}

fn contour(f0: &[Option<f32>], hop: f32) -> FrequencyContour {
    let voicing: Vec<f32> = f0.iter().map(|f| if f.is_some() { 0.9 } else { 0.1 }).collect();
    FrequencyContour::from_f0(f0, &voicing, hop).unwrap()
}

/// Canonical degree frequencies for a 440 Hz fifth
const DEGREES: [f32; 7] = [293.33, 330.0, 366.67, 391.07, 440.0, 488.85, 524.64];

/// One bin carrying decaying pulses every 10 frames
fn pulsed_spectrogram() -> (Array2<f32>, Vec<f32>) {
    let bins = vec![293.33, 330.0, 366.67, 391.07, 440.0, 488.85, 524.64, 600.0];
    let mut magnitudes = Array2::<f32>::zeros((bins.len(), 60));
    for t in 0..60 {
        let phase = (t + 5) % 10;
        magnitudes[[4, t]] = 1.0 - phase as f32 * 0.09;
    }
    (magnitudes, bins)
}

#[test]
fn test_quantize_scenario() {
    let q = quantize(300.0, 440.0).unwrap();
    assert_eq!(q.degree, ScaleDegree::TONIC);
    assert!((q.frequency - 293.33).abs() < 0.01);
}

#[test]
fn test_canonical_frequencies_are_fixed_points() {
    let quantizer = ScaleQuantizer::new(ScaleTuning::phin(), 440.0).unwrap();
    for degree in ScaleDegree::all() {
        let canonical = quantizer.canonical_frequency(degree);
        assert!((canonical - DEGREES[degree.index()]).abs() < 0.2);

        let q = quantizer.quantize(canonical).unwrap();
        assert_eq!(q.frequency, canonical);
        assert_eq!(q.degree, degree);
    }
}

#[test]
fn test_quantize_rejects_bad_frequencies() {
    assert_eq!(
        quantize(0.0, 440.0),
        Err(TranscriptionError::InvalidFrequency(0.0))
    );
    assert!(matches!(
        quantize(-12.0, 440.0),
        Err(TranscriptionError::InvalidFrequency(_))
    ));
    assert!(matches!(
        quantize(f32::NAN, 440.0),
        Err(TranscriptionError::InvalidFrequency(_))
    ));
}

#[test]
fn test_scale_adherence_is_monotonic() {
    let quantizer = ScaleQuantizer::with_tonic(ScaleTuning::phin(), 440.0).unwrap();
    assert_eq!(quantizer.scale_adherence(&[]).unwrap(), 0.0);

    let mut frequencies = vec![1000.0];
    let mut previous = quantizer.scale_adherence(&frequencies).unwrap();
    assert_eq!(previous, 0.0);

    for adherent in [440.0, 495.0, 550.0] {
        frequencies.push(adherent);
        let current = quantizer.scale_adherence(&frequencies).unwrap();
        assert!(current >= previous);
        previous = current;
    }
    assert!((previous - 0.75).abs() < 1e-6);
}

#[test]
fn test_segment_contour_properties() {
    assert!(segment_contour(&contour(&[None; 40], 0.01)).unwrap().is_empty());

    let notes = segment_contour(&contour(&[Some(440.0); 50], 0.01)).unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].start_time(), 0.0);
    assert!((notes[0].end_time() - 0.49).abs() < 1e-5);
    assert_eq!(notes[0].scale_degree(), Some(ScaleDegree::FIFTH));
}

#[test]
fn test_transcribe_contour_with_rest() {
    let mut f0 = vec![Some(441.0); 30];
    f0.extend(vec![None; 10]);
    f0.extend(vec![Some(331.0); 30]);

    let notes = transcribe_contour(&contour(&f0, 0.01), &TranscriptionConfig::default()).unwrap();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0].hz(), 440.0);
    assert!((notes[0].end_time() - 0.30).abs() < 1e-5);
    assert!((notes[1].start_time() - 0.40).abs() < 1e-5);
    assert!((notes[1].hz() - 330.0).abs() < 0.01);
}

#[test]
fn test_merge_notes_is_idempotent() {
    let f0: Vec<Option<f32>> = (0..80)
        .map(|i| Some(if (i / 3) % 2 == 0 { 441.0 } else { 489.0 }))
        .collect();
    let raw = segment_contour(&contour(&f0, 0.01)).unwrap();
    assert!(raw.len() > 10);

    let once = merge_notes(raw, 0.1, 0.5).unwrap();
    let twice = merge_notes(once.clone(), 0.1, 0.5).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_merge_notes_is_idempotent_on_raw_frequencies() {
    let hz = |start: f32, hz: f32| NoteEvent::new(start, start + 0.02, Pitch::Hz(hz), 1.0).unwrap();
    let candidates = vec![
        hz(0.00, 440.0),
        hz(0.05, 440.5),
        hz(0.06, 439.9),
        hz(0.40, 330.2),
        hz(0.45, 330.6),
        hz(0.47, 330.0),
    ];

    let once = merge_notes(candidates, 0.1, 0.5).unwrap();
    assert_eq!(once.len(), 2);
    assert_eq!(merge_notes(once.clone(), 0.1, 0.5).unwrap(), once);
    assert_eq!(merge_notes(once.clone(), 0.15, 0.8).unwrap(), once);
}

#[test]
fn test_detect_polyphonic_notes() {
    let (magnitudes, bins) = pulsed_spectrogram();
    let notes = detect_polyphonic_notes(magnitudes.clone(), bins.clone(), 0.02).unwrap();

    assert!(!notes.is_empty());
    assert!(notes.iter().any(|n| n.hz() == 440.0));
    assert!(notes
        .windows(2)
        .all(|w| w[0].start_time() <= w[1].start_time()));

    let quantizer = ScaleQuantizer::default();
    for n in &notes {
        assert!(quantizer.degree_frequencies().contains(&n.hz()));
        assert!((n.duration() - 0.02).abs() < 1e-5);
    }

    // Seeded decomposition is reproducible
    let again = detect_polyphonic_notes(magnitudes, bins, 0.02).unwrap();
    assert_eq!(notes, again);
}

#[test]
fn test_detect_polyphonic_silent_and_invalid() {
    let bins = vec![220.0, 440.0];
    assert!(detect_polyphonic_notes(Array2::zeros((2, 30)), bins.clone(), 0.02)
        .unwrap()
        .is_empty());
    assert!(detect_polyphonic_notes(Array2::zeros((2, 0)), bins.clone(), 0.02)
        .unwrap()
        .is_empty());
    assert!(matches!(
        detect_polyphonic_notes(Array2::zeros((3, 30)), bins, 0.02),
        Err(TranscriptionError::InvalidInput(_))
    ));
}

#[test]
fn test_transcribe_spectrogram_merges_candidates() {
    let (magnitudes, bins) = pulsed_spectrogram();
    let spectrogram = MagnitudeSpectrogram::new(magnitudes, bins, 0.02).unwrap();
    let config = TranscriptionConfig::default();

    let candidates = phin_transcription::PolyphonicNoteDetector::new(&config)
        .unwrap()
        .detect(&spectrogram)
        .unwrap();
    let notes = transcribe_spectrogram(&spectrogram, &config).unwrap();

    assert!(!notes.is_empty());
    assert!(notes.len() <= candidates.len());
    assert!(notes
        .windows(2)
        .all(|w| w[0].start_time() <= w[1].start_time()));
    assert_eq!(merge_notes(notes.clone(), 0.1, 0.5).unwrap(), notes);
}

#[test]
fn test_evaluate_scenarios() {
    let report = evaluate(&[note(0.0, 60)], &[note(0.05, 60)], 0.3, 0.2).unwrap();
    assert_eq!(report.onset_f1, 1.0);
    assert_eq!(report.pitch_f1, 1.0);

    let report = evaluate(&[note(0.0, 60), note(1.0, 60)], &[note(5.0, 60)], 0.3, 0.2).unwrap();
    assert_eq!(report.onset_f1, 0.0);
    assert_eq!(report.onset_matches, 0);
}

#[test]
fn test_evaluate_empty_prediction() {
    let report = evaluate(&[note(0.0, 60), note(0.5, 62)], &[], 0.3, 0.2).unwrap();
    assert_eq!(report.onset_f1, 0.0);
    assert_eq!(report.pitch_f1, 0.0);
    assert_eq!(report.pitch_accuracy, 0.0);
    assert_eq!(report.reference_notes, 2);
    assert_eq!(report.predicted_notes, 0);
}

#[test]
fn test_evaluate_batch() {
    let references = vec![vec![note(0.0, 60)], vec![note(0.0, 60), note(1.0, 62)]];
    let predictions = vec![vec![note(0.05, 60)], vec![note(5.0, 60)]];

    let report = evaluate_batch(&references, &predictions).unwrap();
    assert_eq!(report.total_evaluations, 2);
    assert_eq!(report.reports.len(), 2);
    assert_eq!(report.reports[0].onset_f1, 1.0);
    assert_eq!(report.reports[1].onset_f1, 0.0);
    assert!((report.onset_f1.mean - 0.5).abs() < 1e-6);
    assert!((report.onset_f1.std - 0.5).abs() < 1e-6);
    assert_eq!(report.onset_f1.min, 0.0);
    assert_eq!(report.onset_f1.max, 1.0);
}

#[test]
fn test_evaluate_batch_length_mismatch() {
    let references = vec![vec![note(0.0, 60)], vec![]];
    let predictions = vec![vec![note(0.0, 60)]];

    assert_eq!(
        evaluate_batch(&references, &predictions),
        Err(TranscriptionError::LengthMismatch {
            reference: 2,
            predicted: 1,
        })
    );
}

#[test]
fn test_analyze_contour_with_vibrato() {
    let hop = 0.01;
    let f0: Vec<Option<f32>> = (0..200)
        .map(|i| {
            let t = i as f32 * hop;
            Some(440.0 * (1.0 + 0.01 * (2.0 * std::f32::consts::PI * 6.0 * t).sin()))
        })
        .collect();

    let analysis = analyze_contour(&contour(&f0, hop), &TranscriptionConfig::default()).unwrap();
    assert_eq!(analysis.notes.len(), 1);
    assert_eq!(analysis.frame_scale_adherence, 1.0);
    assert!(analysis.vibrato.present);
    assert!((analysis.vibrato.rate_hz - 6.0).abs() < 0.6);
    assert_eq!(analysis.vibrato.voiced_frames, 200);
    assert!(analysis.quality.temporal_coverage > 0.9);
}

#[test]
fn test_notes_json_and_midi_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let notes = vec![note(0.0, 60), note(0.5, 64), note(1.0, 67)];

    let json_path = dir.path().join("notes.json");
    save_notes(&notes, &json_path).unwrap();
    assert_eq!(load_notes(&json_path).unwrap(), notes);

    let midi_path = dir.path().join("notes.mid");
    write_midi(&notes, &midi_path, &MidiExportConfig::default()).unwrap();
    let decoded = read_midi(&midi_path).unwrap();

    assert_eq!(decoded.len(), notes.len());
    for (a, b) in notes.iter().zip(&decoded) {
        assert_eq!(a.pitch().midi_note(), b.pitch().midi_note());
        assert!((a.start_time() - b.start_time()).abs() < 1e-3);
        assert!((a.end_time() - b.end_time()).abs() < 1e-3);
    }

    let report = evaluate(&notes, &decoded, 0.3, 0.2).unwrap();
    assert_eq!(report.onset_f1, 1.0);
    assert_eq!(report.pitch_f1, 1.0);
}
