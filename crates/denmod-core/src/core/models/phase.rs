use nalgebra::Complex;

/// Per-reflection centroid phase estimates, aligned to a `ReflectionSet`.
///
/// Each value is fom * exp(i*phi): the modulus is the figure of merit
/// (clamped to [0,1] at construction) and the argument is the centroid
/// phase. A `PhaseSet` is always derived by the phase-probability
/// integrator from HL coefficients and never hand-edited.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSet {
    values: Vec<Complex<f64>>,
}

impl PhaseSet {
    pub fn from_centroids(centroids: Vec<Complex<f64>>) -> Self {
        let values = centroids
            .into_iter()
            .map(|z| {
                let norm = z.norm();
                if norm > 1.0 { z / norm } else { z }
            })
            .collect();
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Complex<f64>] {
        &self.values
    }

    /// Figure of merit of reflection `i`, in [0,1].
    pub fn fom(&self, i: usize) -> f64 {
        self.values[i].norm()
    }

    /// Centroid phase of reflection `i`, in radians.
    pub fn phase(&self, i: usize) -> f64 {
        self.values[i].arg()
    }

    pub fn mean_fom(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().map(|z| z.norm()).sum::<f64>() / self.values.len() as f64
    }

    /// Mean absolute phase difference against another estimate, in degrees.
    ///
    /// Differences are wrapped into (-180, 180] before taking magnitudes.
    pub fn mean_absolute_phase_difference_deg(&self, other: &Self) -> f64 {
        debug_assert_eq!(self.len(), other.len());
        if self.values.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| {
                let mut delta = (a.arg() - b.arg()).to_degrees();
                while delta > 180.0 {
                    delta -= 360.0;
                }
                while delta <= -180.0 {
                    delta += 360.0;
                }
                delta.abs()
            })
            .sum();
        sum / self.values.len() as f64
    }
}
