//! Deterministic noise helpers for synthetic datasets.
//!
//! The functions here avoid thread-local RNGs. Samples are a pure function of
//! `(seed, view_idx, point_idx)`, which keeps synthetic datasets stable across
//! versions and platforms and lets a test scale one fixed noise pattern.

use crate::{CorrespondenceView, Pt2, Real, Vec2};
use std::f64::consts::TAU;

/// A per-pixel noise source keyed by view and point index.
pub trait PixelNoise {
    /// Sample a deterministic 2D noise vector (pixels).
    fn sample(&self, view_idx: usize, point_idx: usize) -> Vec2;

    /// Return a copy of `view` with noise added to every pixel observation.
    fn perturb_view(&self, view_idx: usize, view: &CorrespondenceView) -> CorrespondenceView {
        let points_2d = view
            .points_2d
            .iter()
            .enumerate()
            .map(|(point_idx, uv)| {
                let d = self.sample(view_idx, point_idx);
                Pt2::new(uv.x + d.x, uv.y + d.y)
            })
            .collect();
        CorrespondenceView {
            points_3d: view.points_3d.clone(),
            points_2d,
        }
    }
}

/// Deterministic uniform pixel noise in `[-max_abs_px, +max_abs_px]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UniformPixelNoise {
    /// Base seed controlling the pseudo-random sequence.
    pub seed: u64,
    /// Maximum absolute per-axis noise (pixels).
    pub max_abs_px: Real,
}

impl PixelNoise for UniformPixelNoise {
    fn sample(&self, view_idx: usize, point_idx: usize) -> Vec2 {
        let max_abs = self.max_abs_px.abs();
        if max_abs == 0.0 {
            return Vec2::zeros();
        }

        let (u, v) = unit_pair(self.seed, view_idx, point_idx);

        // Map [0, 1) -> [-max_abs, +max_abs].
        Vec2::new((u - 0.5) * 2.0 * max_abs, (v - 0.5) * 2.0 * max_abs)
    }
}

/// Deterministic isotropic Gaussian pixel noise with standard deviation `sigma_px`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GaussianPixelNoise {
    pub seed: u64,
    /// Per-axis standard deviation (pixels).
    pub sigma_px: Real,
}

impl PixelNoise for GaussianPixelNoise {
    fn sample(&self, view_idx: usize, point_idx: usize) -> Vec2 {
        let sigma = self.sigma_px.abs();
        if sigma == 0.0 {
            return Vec2::zeros();
        }

        // Box-Muller; `1 - u` keeps the log argument in (0, 1].
        let (u, v) = unit_pair(self.seed, view_idx, point_idx);
        let r = (-2.0 * (1.0 - u).ln()).sqrt();
        let theta = TAU * v;
        Vec2::new(sigma * r * theta.cos(), sigma * r * theta.sin())
    }
}

#[inline]
fn unit_pair(seed: u64, view_idx: usize, point_idx: usize) -> (Real, Real) {
    let key = mix_key(seed, view_idx, point_idx);
    let u = u64_to_unit_f64(splitmix64(key));
    let v = u64_to_unit_f64(splitmix64(key ^ 0x94D0_49BB_1331_11EB));
    (u, v)
}

#[inline]
fn mix_key(seed: u64, view_idx: usize, point_idx: usize) -> u64 {
    seed ^ (view_idx as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (point_idx as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9)
}

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[inline]
fn u64_to_unit_f64(x: u64) -> Real {
    // Top 53 bits -> [0, 1).
    let mantissa = x >> 11;
    (mantissa as Real) * (1.0 / ((1u64 << 53) as Real))
}
