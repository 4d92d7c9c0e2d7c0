//! Gaussian (heat) kernel.

use super::traits::AffinityKernel;
use crate::params::Params;

/// `exp(-(d / radius)^2)`, clamped below at the smallest positive normal
/// `f64` so every stored entry stays strictly positive.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gaussian;

impl Gaussian {
    /// Create the kernel.
    pub fn new() -> Self {
        Self
    }
}

impl AffinityKernel for Gaussian {
    fn name(&self) -> &str {
        "gaussian"
    }

    fn similarity(&self, distance: f64, radius: f64, _params: &Params) -> f64 {
        let t = distance / radius;
        (-(t * t)).exp().max(f64::MIN_POSITIVE)
    }
}
