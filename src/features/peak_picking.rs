//! Peak detection utilities
//!
//! Finds local maxima in 1D signals (component activations, spectra).

/// A detected peak
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    /// Index into the signal
    pub index: usize,

    /// Signal value at `index`
    pub value: f32,
}

/// Find peaks in a signal
///
/// Detects local maxima at or above `min_height` that are separated by at
/// least `min_distance` samples.
///
/// # Arguments
///
/// * `signal` - Signal to find peaks in
/// * `min_height` - Minimum peak height (absolute)
/// * `min_distance` - Minimum distance between kept peaks, in samples
/// * `include_edges` - Also accept the first/last sample when it exceeds its only neighbour
///
/// # Returns
///
/// Peaks sorted by index
///
/// # Algorithm
///
/// 1. Find all local maxima; a flat top counts once, at its (left-rounded) middle
/// 2. Filter by height
/// 3. Enforce minimum distance, keeping the higher peak when two are too close
/// 4. Sort by index
///
/// # Example
///
/// ```
/// use phin_transcription::features::peak_picking::find_peaks;
///
/// let signal = vec![0.0, 0.5, 1.0, 0.7, 0.3, 0.9, 0.2];
/// let peaks = find_peaks(&signal, 0.5, 2, false);
/// assert_eq!(peaks.iter().map(|p| p.index).collect::<Vec<_>>(), vec![2, 5]);
/// ```
pub fn find_peaks(
    signal: &[f32],
    min_height: f32,
    min_distance: usize,
    include_edges: bool,
) -> Vec<Peak> {
    log::debug!(
        "Finding peaks in signal of length {}, min_height={:.4}, min_distance={}",
        signal.len(),
        min_height,
        min_distance
    );

    if signal.len() < 2 {
        return vec![];
    }

    let mut peaks = Vec::new();
    let last = signal.len() - 1;

    if include_edges && signal[0] > signal[1] && signal[0] >= min_height {
        peaks.push(Peak {
            index: 0,
            value: signal[0],
        });
    }

    // Interior maxima, including plateaus
    let mut i = 1;
    while i < last {
        if signal[i - 1] < signal[i] {
            let mut ahead = i + 1;
            while ahead < last && signal[ahead] == signal[i] {
                ahead += 1;
            }
            if signal[ahead] < signal[i] {
                let index = (i + ahead - 1) / 2;
                if signal[index] >= min_height {
                    peaks.push(Peak {
                        index,
                        value: signal[index],
                    });
                }
                i = ahead;
                continue;
            }
        }
        i += 1;
    }

    if include_edges && signal[last] > signal[last - 1] && signal[last] >= min_height {
        peaks.push(Peak {
            index: last,
            value: signal[last],
        });
    }

    // Enforce minimum distance
    if min_distance > 1 && peaks.len() > 1 {
        // Highest first; ties keep the earlier peak
        peaks.sort_by(|a, b| {
            b.value
                .partial_cmp(&a.value)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.index.cmp(&b.index))
        });

        let mut kept: Vec<Peak> = Vec::with_capacity(peaks.len());
        for peak in peaks {
            let too_close = kept
                .iter()
                .any(|existing| existing.index.abs_diff(peak.index) < min_distance);
            if !too_close {
                kept.push(peak);
            }
        }
        peaks = kept;
    }

    peaks.sort_by_key(|p| p.index);

    log::debug!("Found {} peaks", peaks.len());

    peaks
}
