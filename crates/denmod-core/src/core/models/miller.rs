use super::cell::{ChangeOfBasis, UnitCell};
use super::symmetry::SpaceGroup;
use std::collections::HashMap;
use std::ops::Neg;

/// A Miller index (h,k,l) identifying one unique reflection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Miller {
    pub h: i32,
    pub k: i32,
    pub l: i32,
}

impl Miller {
    pub fn new(h: i32, k: i32, l: i32) -> Self {
        Self { h, k, l }
    }

    pub fn is_zero(&self) -> bool {
        self.h == 0 && self.k == 0 && self.l == 0
    }

    /// The Friedel mate (-h,-k,-l).
    pub fn friedel_mate(&self) -> Self {
        -*self
    }

    /// The canonical representative of this index's Friedel pair.
    ///
    /// Exactly one of (h,k,l) and (-h,-k,-l) is canonical; the
    /// lexicographically greater triple is chosen.
    pub fn friedel_canonical(&self) -> Self {
        let mate = self.friedel_mate();
        if *self >= mate { *self } else { mate }
    }
}

impl Neg for Miller {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.h, -self.k, -self.l)
    }
}

/// An ordered collection of unique Miller indices with crystal symmetry
/// and a resolution limit.
///
/// This struct is the alignment backbone for all per-reflection arrays
/// (amplitudes, Hendrickson-Lattman coefficients, phase sets): every array
/// derived from the same set holds exactly one entry per index, in the
/// set's order. A set built with [`ReflectionSet::complete_to_d_min`]
/// satisfies the completeness invariant: every unique index up to `d_min`
/// is present.
#[derive(Debug, Clone)]
pub struct ReflectionSet {
    cell: UnitCell,
    space_group: SpaceGroup,
    d_min: f64,
    indices: Vec<Miller>,
    positions: HashMap<Miller, usize>,
    centric: Vec<bool>,
}

impl ReflectionSet {
    /// Generates the complete set of unique reflections with d >= `d_min`.
    ///
    /// One index per Friedel pair is kept (the canonical representative);
    /// (0,0,0) is excluded. Indices are sorted for deterministic order.
    pub fn complete_to_d_min(cell: UnitCell, space_group: SpaceGroup, d_min: f64) -> Self {
        let h_max = (cell.a / d_min).ceil() as i32;
        let k_max = (cell.b / d_min).ceil() as i32;
        let l_max = (cell.c / d_min).ceil() as i32;

        let mut indices = Vec::new();
        for h in -h_max..=h_max {
            for k in -k_max..=k_max {
                for l in -l_max..=l_max {
                    let hkl = Miller::new(h, k, l);
                    if hkl.is_zero() || hkl.friedel_canonical() != hkl {
                        continue;
                    }
                    if cell.d_spacing(hkl) >= d_min {
                        indices.push(hkl);
                    }
                }
            }
        }
        indices.sort();
        Self::from_indices(cell, space_group, d_min, indices)
    }

    fn from_indices(
        cell: UnitCell,
        space_group: SpaceGroup,
        d_min: f64,
        indices: Vec<Miller>,
    ) -> Self {
        let positions = indices
            .iter()
            .enumerate()
            .map(|(i, &hkl)| (hkl, i))
            .collect();
        let centric = indices
            .iter()
            .map(|&hkl| space_group.is_centric(hkl))
            .collect();
        Self {
            cell,
            space_group,
            d_min,
            indices,
            positions,
            centric,
        }
    }

    pub fn cell(&self) -> &UnitCell {
        &self.cell
    }

    pub fn space_group(&self) -> &SpaceGroup {
        &self.space_group
    }

    pub fn d_min(&self) -> f64 {
        self.d_min
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn indices(&self) -> &[Miller] {
        &self.indices
    }

    /// The position of an index in the set's order, if present.
    ///
    /// Lookup is performed on the canonical Friedel representative, so a
    /// query with either mate of a pair succeeds.
    pub fn position(&self, hkl: Miller) -> Option<usize> {
        self.positions.get(&hkl.friedel_canonical()).copied()
    }

    pub fn is_centric(&self, i: usize) -> bool {
        self.centric[i]
    }

    pub fn d_spacing(&self, i: usize) -> f64 {
        self.cell.d_spacing(self.indices[i])
    }
}

/// Per-reflection amplitudes aligned to a [`ReflectionSet`].
#[derive(Debug, Clone, PartialEq)]
pub struct AmplitudeData {
    values: Vec<f64>,
}

impl AmplitudeData {
    /// Fills amplitudes for every index of `set` from sparse observations.
    ///
    /// Indices absent from `observed` receive amplitude 0, which is the
    /// explicit zero-fill policy of the completeness invariant.
    pub fn from_sparse(set: &ReflectionSet, observed: &HashMap<Miller, f64>) -> Self {
        let values = set
            .indices()
            .iter()
            .map(|hkl| {
                observed
                    .get(&hkl.friedel_canonical())
                    .copied()
                    .unwrap_or(0.0)
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

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cubic_cell() -> UnitCell {
        UnitCell::new(10.0, 10.0, 10.0, 90.0, 90.0, 90.0)
    }

    #[test]
    fn friedel_canonical_keeps_exactly_one_mate_per_pair() {
        let hkl = Miller::new(-1, 2, 3);
        assert_eq!(hkl.friedel_canonical(), hkl.friedel_mate().friedel_canonical());
    }

    #[test]
    fn complete_set_contains_every_index_up_to_d_min() {
        let set = ReflectionSet::complete_to_d_min(cubic_cell(), SpaceGroup::p1(), 2.5);
        let cell = cubic_cell();
        for h in -5..=5 {
            for k in -5..=5 {
                for l in -5..=5 {
                    let hkl = Miller::new(h, k, l);
                    if hkl.is_zero() {
                        continue;
                    }
                    if cell.d_spacing(hkl) >= 2.5 {
                        assert!(
                            set.position(hkl).is_some(),
                            "missing reflection {hkl:?} within the resolution limit"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn complete_set_excludes_reflections_beyond_d_min() {
        let set = ReflectionSet::complete_to_d_min(cubic_cell(), SpaceGroup::p1(), 2.5);
        // d(5,0,0) = 2.0 < 2.5
        assert!(set.position(Miller::new(5, 0, 0)).is_none());
    }

    #[test]
    fn complete_set_keeps_one_index_per_friedel_pair() {
        let set = ReflectionSet::complete_to_d_min(cubic_cell(), SpaceGroup::p1(), 2.5);
        for &hkl in set.indices() {
            assert_eq!(hkl, hkl.friedel_canonical());
        }
        let p1 = set.position(Miller::new(1, 2, 0));
        let p2 = set.position(Miller::new(-1, -2, 0));
        assert!(p1.is_some());
        assert_eq!(p1, p2);
    }

    #[test]
    fn amplitudes_from_sparse_zero_fill_missing_reflections() {
        let set = ReflectionSet::complete_to_d_min(cubic_cell(), SpaceGroup::p1(), 4.0);
        let mut observed = HashMap::new();
        observed.insert(Miller::new(1, 0, 0).friedel_canonical(), 12.5);
        let data = AmplitudeData::from_sparse(&set, &observed);
        assert_eq!(data.len(), set.len());
        let pos = set.position(Miller::new(1, 0, 0)).unwrap();
        assert_eq!(data.values()[pos], 12.5);
        let other = set.position(Miller::new(0, 1, 0)).unwrap();
        assert_eq!(data.values()[other], 0.0);
    }

    #[test]
    fn centric_flags_follow_the_space_group() {
        let set = ReflectionSet::complete_to_d_min(cubic_cell(), SpaceGroup::p1_bar(), 4.0);
        for i in 0..set.len() {
            assert!(set.is_centric(i));
        }
        let set = ReflectionSet::complete_to_d_min(cubic_cell(), SpaceGroup::p1(), 4.0);
        for i in 0..set.len() {
            assert!(!set.is_centric(i));
        }
    }
}
