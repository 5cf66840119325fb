//! Non-negative spectrogram decomposition
//!
//! Factors a `(frames, bins)` magnitude matrix `V` into per-frame component
//! activations `W` (frames × k) and per-component spectral loadings `H`
//! (k × bins) so that `V ≈ W·H`.
//!
//! The factorization sits behind the [`Decomposer`] trait so detection can be
//! driven by a seeded NMF ([`NmfDecomposer`]) or by any deterministic
//! alternative.
//!
//! # Reference
//!
//! Lee, D. D., & Seung, H. S. (2001).
//! Algorithms for Non-negative Matrix Factorization.
//! *Advances in Neural Information Processing Systems*, 13, 556-562.

use crate::config::PolyphonicConfig;
use crate::error::{Result, TranscriptionError};
use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Check convergence every this many iterations
const CONVERGENCE_CHECK_INTERVAL: usize = 10;

/// Activation and loading matrices of a decomposition
#[derive(Debug, Clone)]
pub struct Decomposition {
    /// Component activations shaped `(frames, components)`
    pub activations: Array2<f32>,

    /// Component spectral profiles shaped `(components, bins)`
    pub loadings: Array2<f32>,
}

impl Decomposition {
    /// Number of components
    pub fn n_components(&self) -> usize {
        self.activations.ncols()
    }

    /// Activation time series of one component
    pub fn activation(&self, component: usize) -> Vec<f32> {
        self.activations.column(component).to_vec()
    }

    /// Highest-loading frequency bin of a component
    ///
    /// Ties go to the lower bin. `None` if the component or its profile is empty.
    pub fn dominant_bin(&self, component: usize) -> Option<usize> {
        if component >= self.loadings.nrows() {
            return None;
        }

        let mut best: Option<(usize, f32)> = None;
        for (bin, &loading) in self.loadings.row(component).iter().enumerate() {
            match best {
                Some((_, value)) if loading <= value => {}
                _ => best = Some((bin, loading)),
            }
        }
        best.map(|(bin, _)| bin)
    }
}

/// Strategy for factoring a non-negative `(frames, bins)` matrix
pub trait Decomposer {
    /// Factor `data` into `n_components` additive components
    ///
    /// # Errors
    ///
    /// `InvalidInput` for negative input or zero components,
    /// `DecompositionError` if the factorization cannot be computed.
    fn decompose(&self, data: ArrayView2<f32>, n_components: usize) -> Result<Decomposition>;
}

/// Component budget for a spectrogram with `n_frames` frames
///
/// `min(max_components, max(1, n_frames / frames_per_component))`
pub fn component_budget(n_frames: usize, max_components: usize, frames_per_component: usize) -> usize {
    let per = frames_per_component.max(1);
    (n_frames / per).max(1).min(max_components.max(1))
}

/// Seeded multiplicative-update NMF (Frobenius loss)
#[derive(Debug, Clone)]
pub struct NmfDecomposer {
    /// RNG seed for the initial factors
    pub seed: u64,

    /// Maximum update iterations
    pub max_iterations: usize,

    /// Relative reconstruction-error improvement below which iteration stops
    pub tolerance: f32,
}

impl NmfDecomposer {
    /// Create a decomposer with an explicit seed
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Build from polyphonic detection parameters
    pub fn from_config(config: &PolyphonicConfig) -> Self {
        Self {
            seed: config.seed,
            max_iterations: config.max_iterations,
            tolerance: config.convergence_tolerance,
        }
    }
}

impl Default for NmfDecomposer {
    fn default() -> Self {
        Self {
            seed: 42,
            max_iterations: 200,
            tolerance: 1e-4,
        }
    }
}

fn reconstruction_error(data: &ArrayView2<f32>, w: &Array2<f32>, h: &Array2<f32>) -> f32 {
    let approximation = w.dot(h);
    data.iter()
        .zip(approximation.iter())
        .map(|(v, a)| (v - a) * (v - a))
        .sum::<f32>()
        .sqrt()
}

impl Decomposer for NmfDecomposer {
    fn decompose(&self, data: ArrayView2<f32>, n_components: usize) -> Result<Decomposition> {
        let (n_frames, n_bins) = data.dim();
        log::debug!(
            "NMF: {} frames x {} bins, k={}, seed={}",
            n_frames,
            n_bins,
            n_components,
            self.seed
        );

        if n_components == 0 {
            return Err(TranscriptionError::InvalidInput(
                "Number of components must be > 0".to_string(),
            ));
        }
        if n_frames == 0 || n_bins == 0 {
            return Err(TranscriptionError::InvalidInput(format!(
                "Cannot decompose an empty {}x{} matrix",
                n_frames, n_bins
            )));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(TranscriptionError::DecompositionError(
                "Input contains non-finite values".to_string(),
            ));
        }
        if data.iter().any(|&v| v < 0.0) {
            return Err(TranscriptionError::InvalidInput(
                "NMF input must be non-negative".to_string(),
            ));
        }

        // Scale the random init so W·H starts at the data's mean level
        let mean = data.iter().sum::<f32>() / (n_frames * n_bins) as f32;
        let scale = (mean / n_components as f32).sqrt();

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut w = Array2::from_shape_fn((n_frames, n_components), |_| {
            scale * rng.gen::<f32>()
        });
        let mut h = Array2::from_shape_fn((n_components, n_bins), |_| scale * rng.gen::<f32>());

        let initial_error = reconstruction_error(&data, &w, &h);
        let mut previous_error = initial_error;
        let mut iterations = 0;

        for iteration in 1..=self.max_iterations {
            iterations = iteration;

            // H <- H * (W^T V) / (W^T W H)
            let numerator = w.t().dot(&data);
            let denominator = w.t().dot(&w).dot(&h);
            h.zip_mut_with(&numerator, |value, &n| *value *= n);
            h.zip_mut_with(&denominator, |value, &d| *value /= d + EPSILON);

            // W <- W * (V H^T) / (W H H^T)
            let numerator = data.dot(&h.t());
            let denominator = w.dot(&h).dot(&h.t());
            w.zip_mut_with(&numerator, |value, &n| *value *= n);
            w.zip_mut_with(&denominator, |value, &d| *value /= d + EPSILON);

            if iteration % CONVERGENCE_CHECK_INTERVAL == 0 && initial_error > 0.0 {
                let error = reconstruction_error(&data, &w, &h);
                if (previous_error - error) / initial_error < self.tolerance {
                    break;
                }
                previous_error = error;
            }
        }

        if w.iter().chain(h.iter()).any(|v| !v.is_finite()) {
            return Err(TranscriptionError::DecompositionError(format!(
                "Factorization diverged after {} iterations",
                iterations
            )));
        }

        log::debug!(
            "NMF finished after {} iterations, error {:.6} -> {:.6}",
            iterations,
            initial_error,
            reconstruction_error(&data, &w, &h)
        );

        Ok(Decomposition {
            activations: w,
            loadings: h,
        })
    }
}
