use super::cell::ChangeOfBasis;
use super::miller::Miller;
use nalgebra::{Matrix3, Vector3};

/// The rotation parts of a space group's symmetry operations.
///
/// Only the point-group information needed by the density-modification
/// engine is carried: the rotation parts determine reflection centricity.
/// Translation parts (and therefore systematic absences) belong to the
/// collaborators that produce the input reflection data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceGroup {
    rotations: Vec<Matrix3<i32>>,
}

impl SpaceGroup {
    /// Builds a space group from rotation parts, deduplicating and
    /// ensuring the identity is present.
    pub fn from_rotations(rotations: Vec<Matrix3<i32>>) -> Self {
        let mut ops = vec![Matrix3::identity()];
        for r in rotations {
            if !ops.contains(&r) {
                ops.push(r);
            }
        }
        Self { rotations: ops }
    }

    /// Space group P1 (identity only).
    pub fn p1() -> Self {
        Self::from_rotations(vec![])
    }

    /// Space group P-1 (identity plus inversion).
    pub fn p1_bar() -> Self {
        Self::from_rotations(vec![-Matrix3::identity()])
    }

    pub fn order(&self) -> usize {
        self.rotations.len()
    }

    pub fn rotations(&self) -> &[Matrix3<i32>] {
        &self.rotations
    }

    /// Re-expresses the group in another setting of the same lattice by
    /// conjugating every rotation part (R' = M^-1 R M).
    ///
    /// Data re-expressed with the same `ChangeOfBasis` keep their
    /// symmetry relations: a reflection is centric in the new setting
    /// exactly when its pre-image was centric in the old one.
    pub fn change_basis(&self, cob: &ChangeOfBasis) -> Self {
        Self::from_rotations(
            self.rotations
                .iter()
                .map(|r| cob.transform_rotation(r))
                .collect(),
        )
    }

    /// Whether a reflection is centric: some symmetry operation maps
    /// h to -h, constraining its phase to one of two values.
    pub fn is_centric(&self, hkl: Miller) -> bool {
        let h = Vector3::new(hkl.h, hkl.k, hkl.l);
        self.rotations
            .iter()
            .any(|r| r.transpose() * h == -h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p1_has_no_centric_reflections_off_origin() {
        let sg = SpaceGroup::p1();
        assert_eq!(sg.order(), 1);
        assert!(!sg.is_centric(Miller::new(1, 2, 3)));
        assert!(!sg.is_centric(Miller::new(0, 0, 1)));
    }

    #[test]
    fn p1_bar_makes_every_reflection_centric() {
        let sg = SpaceGroup::p1_bar();
        assert_eq!(sg.order(), 2);
        assert!(sg.is_centric(Miller::new(1, 2, 3)));
        assert!(sg.is_centric(Miller::new(-4, 0, 7)));
    }

    #[test]
    fn twofold_along_c_makes_h_k_zero_reflections_centric() {
        // Rotation part of a 2-fold axis along c.
        let two_fold = Matrix3::new(-1, 0, 0, 0, -1, 0, 0, 0, 1);
        let sg = SpaceGroup::from_rotations(vec![two_fold]);
        assert!(sg.is_centric(Miller::new(3, -2, 0)));
        assert!(!sg.is_centric(Miller::new(3, -2, 1)));
    }

    #[test]
    fn from_rotations_deduplicates_and_keeps_identity() {
        let sg = SpaceGroup::from_rotations(vec![Matrix3::identity(), -Matrix3::identity()]);
        assert_eq!(sg.order(), 2);
    }

    #[test]
    fn centricity_is_preserved_under_a_change_of_basis() {
        use crate::core::models::cell::UnitCell;

        // This cell Niggli-reduces with an axis-permuting basis change,
        // so the 2-fold axis no longer lies along the third basis vector
        // in the new setting.
        let cell = UnitCell::new(30.0, 10.0, 20.0, 90.0, 90.0, 90.0);
        let (_, cob) = cell.niggli_reduce();
        assert!(!cob.is_identity());

        let two_fold = Matrix3::new(-1, 0, 0, 0, -1, 0, 0, 0, 1);
        let sg = SpaceGroup::from_rotations(vec![two_fold]);
        let transformed = sg.change_basis(&cob);
        assert_eq!(transformed.order(), sg.order());
        for hkl in [
            Miller::new(3, -2, 0),
            Miller::new(3, -2, 1),
            Miller::new(0, 0, 4),
            Miller::new(1, 0, 0),
        ] {
            assert_eq!(
                sg.is_centric(hkl),
                transformed.is_centric(cob.transform_miller(hkl)),
                "centricity of {hkl:?} changed across the basis change"
            );
        }
    }
}
