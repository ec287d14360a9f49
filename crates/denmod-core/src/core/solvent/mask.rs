use super::local_rms::local_rms_map;
use crate::core::models::cell::UnitCell;
use crate::core::models::grid::MapGrid;
use crate::core::models::mask::{MaskStatistics, SolventMask};

/// Default number of histogram bins used for the cutoff selection.
pub const DEFAULT_HISTOGRAM_BINS: usize = 10000;

/// Result of one solvent-mask computation: the local-RMS map the
/// classification was derived from, the mask itself, and the per-class
/// density statistics of the input map under that mask.
#[derive(Debug, Clone)]
pub struct MaskComputation {
    pub local_rms: MapGrid,
    pub mask: SolventMask,
    pub statistics: MaskStatistics,
}

/// Derives a binary solvent/protein mask at a target solvent fraction.
///
/// The calculator is a pure function of its inputs: computing the mask
/// twice on an unmodified map with identical parameters yields identical
/// results. The cutoff is a deterministic order statistic over a
/// fixed-bin histogram of local-RMS values, so the requested solvent
/// fraction is achieved by construction up to bin granularity. Inputs
/// that would produce a single-class mask are not guarded against.
#[derive(Debug, Clone, Copy)]
pub struct SolventMaskCalculator {
    pub solvent_fraction: f64,
    pub histogram_bins: usize,
}

impl SolventMaskCalculator {
    pub fn new(solvent_fraction: f64) -> Self {
        Self {
            solvent_fraction,
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
        }
    }

    /// Computes the local-RMS map at `radius` (biased by `bias`) and
    /// classifies grid points: the `floor(n * (1 - solvent_fraction))`
    /// points with the lowest local RMS are protein, the rest solvent.
    pub fn compute(
        &self,
        map: &MapGrid,
        cell: &UnitCell,
        radius: f64,
        bias: f64,
    ) -> MaskComputation {
        let local_rms = local_rms_map(map, cell, radius, bias);
        let cutoff = self.protein_cutoff(&local_rms);

        let flags: Vec<bool> = local_rms.values().iter().map(|&v| v >= cutoff).collect();
        let (nu, nv, nw) = map.dimensions();
        let mask = SolventMask::new(nu, nv, nw, flags);
        let statistics = mask.statistics(map);
        MaskComputation {
            local_rms,
            mask,
            statistics,
        }
    }

    /// The local-RMS value below which exactly the protein-target number
    /// of points lie (up to histogram bin granularity).
    fn protein_cutoff(&self, local_rms: &MapGrid) -> f64 {
        let values = local_rms.values();
        let n_protein_target =
            (values.len() as f64 * (1.0 - self.solvent_fraction)).floor() as usize;

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !(max > min) {
            // Degenerate flat statistic: every point lands in one bin.
            return max;
        }

        let bin_width = (max - min) / self.histogram_bins as f64;
        let mut histogram = vec![0usize; self.histogram_bins];
        for &v in values {
            let bin = (((v - min) / bin_width) as usize).min(self.histogram_bins - 1);
            histogram[bin] += 1;
        }

        let mut cumulative = 0usize;
        for (bin, &count) in histogram.iter().enumerate() {
            cumulative += count;
            if cumulative >= n_protein_target {
                return min + (bin + 1) as f64 * bin_width;
            }
        }
        max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cubic_cell() -> UnitCell {
        UnitCell::new(10.0, 10.0, 10.0, 90.0, 90.0, 90.0)
    }

    fn structured_map() -> MapGrid {
        // A blob of strong density in one octant over a rippled background;
        // the ripple keeps local-RMS values distinct so the histogram
        // cutoff is not dominated by ties.
        let n = 8;
        let mut map = MapGrid::zeros(n, n, n);
        for u in 0..n {
            for v in 0..n {
                for w in 0..n {
                    let idx = map.linear_index(u, v, w);
                    let ripple = 0.05 * ((idx as f64) * 12.9898).sin();
                    map.values_mut()[idx] = if u < 3 && v < 3 && w < 3 {
                        5.0 + (u + v + w) as f64 + ripple
                    } else {
                        0.1 + ripple
                    };
                }
            }
        }
        map
    }

    #[test]
    fn computed_mask_achieves_the_requested_solvent_fraction() {
        let calculator = SolventMaskCalculator::new(0.4);
        let result = calculator.compute(&structured_map(), &cubic_cell(), 1.5, 0.0);
        let achieved = result.statistics.solvent_fraction;
        // Exact up to histogram bin granularity.
        assert!(
            (achieved - 0.4).abs() < 0.08,
            "achieved solvent fraction {achieved} too far from target"
        );
    }

    #[test]
    fn mask_computation_is_idempotent() {
        let calculator = SolventMaskCalculator::new(0.35);
        let map = structured_map();
        let first = calculator.compute(&map, &cubic_cell(), 2.0, 0.25);
        let second = calculator.compute(&map, &cubic_cell(), 2.0, 0.25);
        assert_eq!(first.mask, second.mask);
        assert_eq!(first.local_rms, second.local_rms);
        assert_eq!(first.statistics, second.statistics);
    }

    #[test]
    fn per_class_means_match_direct_averages_over_the_map() {
        let calculator = SolventMaskCalculator::new(0.4);
        let map = structured_map();
        let result = calculator.compute(&map, &cubic_cell(), 1.5, 0.0);

        let mut sum = [0.0f64; 2];
        let mut count = [0usize; 2];
        for (i, &rho) in map.values().iter().enumerate() {
            let class = result.mask.is_solvent(i) as usize;
            sum[class] += rho;
            count[class] += 1;
        }
        assert!((result.statistics.mean_protein - sum[0] / count[0] as f64).abs() < 1e-12);
        assert!((result.statistics.mean_solvent - sum[1] / count[1] as f64).abs() < 1e-12);
    }

    #[test]
    fn low_local_rms_points_are_classified_as_protein() {
        let calculator = SolventMaskCalculator::new(0.5);
        let map = structured_map();
        let result = calculator.compute(&map, &cubic_cell(), 1.5, 0.0);
        let mut max_protein_rms = f64::NEG_INFINITY;
        let mut min_solvent_rms = f64::INFINITY;
        for (i, &v) in result.local_rms.values().iter().enumerate() {
            if result.mask.is_solvent(i) {
                min_solvent_rms = min_solvent_rms.min(v);
            } else {
                max_protein_rms = max_protein_rms.max(v);
            }
        }
        assert!(max_protein_rms <= min_solvent_rms);
    }
}
