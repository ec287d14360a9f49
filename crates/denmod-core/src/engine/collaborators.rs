use crate::core::models::grid::MapGrid;
use crate::core::models::hl::HlCoefficients;
use crate::core::models::miller::{AmplitudeData, ReflectionSet};
use crate::core::models::phase::PhaseSet;
use nalgebra::{Complex, Matrix3, Vector3};
use std::error::Error;
use thiserror::Error;

/// Default number of discretized phase angles used by the
/// phase-probability integration.
pub const DEFAULT_INTEGRATION_STEPS: usize = 360;

/// A failure inside an external numeric collaborator.
///
/// The engine performs no retry or fallback: collaborator errors surface
/// unchanged to the caller, since a failed cycle leaves derived state
/// that cannot be safely resumed.
#[derive(Debug, Error)]
#[error("{operation} failed: {source}")]
pub struct CollaboratorError {
    pub operation: &'static str,
    #[source]
    pub source: Box<dyn Error + Send + Sync>,
}

impl CollaboratorError {
    pub fn new(
        operation: &'static str,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        Self {
            operation,
            source: source.into(),
        }
    }
}

/// The FFT/real-space transform between structure factors and map grids.
pub trait MapTransform {
    /// Synthesizes a real-space map from per-reflection complex
    /// coefficients aligned to `set`, sampled at a grid spacing of about
    /// `d_min * resolution_factor`.
    fn map_from_coefficients(
        &self,
        set: &ReflectionSet,
        coefficients: &[Complex<f64>],
        resolution_factor: f64,
    ) -> Result<MapGrid, CollaboratorError>;

    /// Back-transforms a map into complex structure factors for every
    /// reflection of `set`, in the set's order.
    fn coefficients_from_map(
        &self,
        set: &ReflectionSet,
        map: &MapGrid,
    ) -> Result<Vec<Complex<f64>>, CollaboratorError>;
}

/// The phase-probability integrator: converts Hendrickson-Lattman
/// coefficients into centroid phase estimates (figure of merit x phase)
/// by integrating over `n_steps` discretized phase angles.
pub trait PhaseIntegrator {
    fn integrate(
        &self,
        set: &ReflectionSet,
        hl: &HlCoefficients,
        n_steps: usize,
    ) -> Result<PhaseSet, CollaboratorError>;
}

/// Per-reflection output of the sigma-A estimation.
#[derive(Debug, Clone)]
pub struct SigmaAEstimate {
    /// Correlation coefficient between normalized observed and model
    /// structure-factor magnitudes.
    pub c: Vec<f64>,
    /// Normalized observed amplitudes (E-values).
    pub e_obs: Vec<f64>,
    /// Normalized model amplitudes (E-values).
    pub e_mod: Vec<f64>,
    /// The D factor weighting the model contribution in map coefficients.
    pub dd: Vec<f64>,
}

pub trait SigmaAEstimator {
    fn estimate(
        &self,
        set: &ReflectionSet,
        f_obs: &AmplitudeData,
        f_calc: &[Complex<f64>],
    ) -> Result<SigmaAEstimate, CollaboratorError>;
}

/// An anisotropic relative scaling of model amplitudes onto observed
/// amplitudes: overall scale `p_scale` plus B-factor tensor `u_star`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalingFit {
    pub p_scale: f64,
    pub u_star: Matrix3<f64>,
}

impl ScalingFit {
    pub fn identity() -> Self {
        Self {
            p_scale: 0.0,
            u_star: Matrix3::zeros(),
        }
    }

    /// The multiplicative correction for one reflection:
    /// exp(p_scale) * exp(-2 pi^2 h^T u_star h).
    pub fn factor(&self, hkl: crate::core::models::miller::Miller) -> f64 {
        let h = Vector3::new(hkl.h as f64, hkl.k as f64, hkl.l as f64);
        let quad = (h.transpose() * self.u_star * h)[(0, 0)];
        (self.p_scale - 2.0 * std::f64::consts::PI.powi(2) * quad).exp()
    }

    /// Applies the fit to every coefficient, in the set's order.
    pub fn apply(&self, set: &ReflectionSet, f_calc: &[Complex<f64>]) -> Vec<Complex<f64>> {
        set.indices()
            .iter()
            .zip(f_calc)
            .map(|(&hkl, &f)| f * self.factor(hkl))
            .collect()
    }
}

pub trait RelativeScaler {
    fn fit(
        &self,
        set: &ReflectionSet,
        f_obs: &AmplitudeData,
        f_calc: &[Complex<f64>],
    ) -> Result<ScalingFit, CollaboratorError>;
}

/// The bundle of external collaborators one run borrows.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub transform: &'a dyn MapTransform,
    pub integrator: &'a dyn PhaseIntegrator,
    pub sigma_a: &'a dyn SigmaAEstimator,
    pub scaler: &'a dyn RelativeScaler,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::miller::Miller;

    #[test]
    fn identity_fit_leaves_coefficients_unchanged() {
        let fit = ScalingFit::identity();
        assert!((fit.factor(Miller::new(3, -1, 2)) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn positive_p_scale_inflates_every_reflection_equally() {
        let fit = ScalingFit {
            p_scale: 0.5,
            u_star: Matrix3::zeros(),
        };
        let expected = 0.5f64.exp();
        assert!((fit.factor(Miller::new(1, 0, 0)) - expected).abs() < 1e-12);
        assert!((fit.factor(Miller::new(0, 5, -3)) - expected).abs() < 1e-12);
    }

    #[test]
    fn anisotropic_tensor_attenuates_high_order_reflections_more() {
        let fit = ScalingFit {
            p_scale: 0.0,
            u_star: Matrix3::identity() * 1e-3,
        };
        assert!(fit.factor(Miller::new(5, 0, 0)) < fit.factor(Miller::new(1, 0, 0)));
    }
}
