use super::miller::{Miller, ReflectionSet};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum HlError {
    #[error("HL coefficient arrays cover different index sets ({left} vs {right} reflections)")]
    LengthMismatch { left: usize, right: usize },
}

/// Per-reflection Hendrickson-Lattman coefficients (A,B,C,D), aligned to
/// a [`ReflectionSet`].
///
/// Each row encodes a phase probability distribution
/// P(phi) ~ exp(A cos phi + B sin phi + C cos 2phi + D sin 2phi).
/// Independent sources of phase evidence combine by addition, which is
/// only meaningful when both operands cover the same completed index set;
/// [`HlCoefficients::combined_with`] enforces this.
#[derive(Debug, Clone, PartialEq)]
pub struct HlCoefficients {
    rows: Vec<[f64; 4]>,
}

impl HlCoefficients {
    /// A neutral (all-zero) distribution for every reflection of `len`.
    pub fn neutral(len: usize) -> Self {
        Self {
            rows: vec![[0.0; 4]; len],
        }
    }

    pub fn from_rows(rows: Vec<[f64; 4]>) -> Self {
        Self { rows }
    }

    /// Fills coefficients for every index of `set` from sparse input.
    ///
    /// Indices absent from `known` receive the neutral (0,0,0,0) row, per
    /// the completeness invariant's zero-fill policy.
    pub fn from_sparse(set: &ReflectionSet, known: &HashMap<Miller, [f64; 4]>) -> Self {
        let rows = set
            .indices()
            .iter()
            .map(|hkl| {
                known
                    .get(&hkl.friedel_canonical())
                    .copied()
                    .unwrap_or([0.0; 4])
            })
            .collect();
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, i: usize) -> [f64; 4] {
        self.rows[i]
    }

    pub fn rows(&self) -> &[[f64; 4]] {
        &self.rows
    }

    /// Adds two sources of phase evidence, leaving both operands intact.
    pub fn combined_with(&self, other: &Self) -> Result<Self, HlError> {
        if self.len() != other.len() {
            return Err(HlError::LengthMismatch {
                left: self.len(),
                right: other.len(),
            });
        }
        let rows = self
            .rows
            .iter()
            .zip(&other.rows)
            .map(|(a, b)| [a[0] + b[0], a[1] + b[1], a[2] + b[2], a[3] + b[3]])
            .collect();
        Ok(Self { rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_coefficients_are_all_zero() {
        let hl = HlCoefficients::neutral(3);
        assert_eq!(hl.len(), 3);
        for i in 0..3 {
            assert_eq!(hl.row(i), [0.0; 4]);
        }
    }

    #[test]
    fn combination_adds_rows_elementwise() {
        let a = HlCoefficients::from_rows(vec![[1.0, 2.0, 3.0, 4.0], [0.5, 0.0, -1.0, 0.0]]);
        let b = HlCoefficients::from_rows(vec![[0.1, 0.2, 0.3, 0.4], [-0.5, 1.0, 1.0, 2.0]]);
        let c = a.combined_with(&b).unwrap();
        assert_eq!(c.row(0), [1.1, 2.2, 3.3, 4.4]);
        assert_eq!(c.row(1), [0.0, 1.0, 0.0, 2.0]);
    }

    #[test]
    fn combination_with_neutral_is_identity() {
        let a = HlCoefficients::from_rows(vec![[1.0, -2.0, 0.5, 0.0]]);
        let c = a.combined_with(&HlCoefficients::neutral(1)).unwrap();
        assert_eq!(c, a);
    }

    #[test]
    fn combination_over_different_index_sets_is_rejected() {
        let a = HlCoefficients::neutral(2);
        let b = HlCoefficients::neutral(3);
        assert_eq!(
            a.combined_with(&b),
            Err(HlError::LengthMismatch { left: 2, right: 3 })
        );
    }
}
