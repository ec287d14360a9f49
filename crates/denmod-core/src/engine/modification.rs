use crate::core::models::grid::MapGrid;
use crate::core::models::mask::SolventMask;
use tracing::debug;

/// Bin count shared by the density-truncation histograms.
const TRUNCATION_HISTOGRAM_BINS: usize = 10000;

/// Outcome of one density-truncation pass over the protein region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruncationOutcome {
    /// Percentage of protein points clamped up to the low cutoff.
    pub truncated_min_percent: f64,
    /// Percentage of protein points clamped down to the high cutoff.
    pub truncated_max_percent: f64,
    /// Mean protein density recomputed after clamping.
    pub mean_protein_density: f64,
}

/// Clamps the extreme tails of the protein-region density distribution.
///
/// Within the protein-classed region only, the lowest `fraction_min` of
/// values are raised to the low cutoff and the highest `fraction_max`
/// lowered to the high cutoff, both cutoffs selected from a fixed-bin
/// histogram of the protein values. Solvent points are untouched.
pub fn truncate_density(
    map: &mut MapGrid,
    mask: &SolventMask,
    fraction_min: Option<f64>,
    fraction_max: Option<f64>,
) -> TruncationOutcome {
    let protein: Vec<f64> = map
        .values()
        .iter()
        .enumerate()
        .filter(|(i, _)| !mask.is_solvent(*i))
        .map(|(_, &v)| v)
        .collect();
    let n_protein = protein.len();

    let min = protein.iter().copied().fold(f64::INFINITY, f64::min);
    let max = protein.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let (cutoff_low, cutoff_high) = if max > min {
        let bin_width = (max - min) / TRUNCATION_HISTOGRAM_BINS as f64;
        let mut histogram = vec![0usize; TRUNCATION_HISTOGRAM_BINS];
        for &v in &protein {
            let bin = (((v - min) / bin_width) as usize).min(TRUNCATION_HISTOGRAM_BINS - 1);
            histogram[bin] += 1;
        }
        let low = fraction_min.map(|f| {
            let target = (n_protein as f64 * f) as usize;
            let mut cumulative = 0usize;
            for (bin, &count) in histogram.iter().enumerate() {
                cumulative += count;
                if cumulative >= target {
                    return min + bin as f64 * bin_width;
                }
            }
            min
        });
        let high = fraction_max.map(|f| {
            let target = (n_protein as f64 * f) as usize;
            let mut cumulative = 0usize;
            for (bin, &count) in histogram.iter().enumerate().rev() {
                cumulative += count;
                if cumulative >= target {
                    return min + (bin + 1) as f64 * bin_width;
                }
            }
            max
        });
        (low, high)
    } else {
        (None, None)
    };

    let mut n_low = 0usize;
    let mut n_high = 0usize;
    let mut protein_sum = 0.0;
    for (i, v) in map.values_mut().iter_mut().enumerate() {
        if mask.is_solvent(i) {
            continue;
        }
        if let Some(low) = cutoff_low {
            if *v < low {
                *v = low;
                n_low += 1;
            }
        }
        if let Some(high) = cutoff_high {
            if *v > high {
                *v = high;
                n_high += 1;
            }
        }
        protein_sum += *v;
    }

    let outcome = TruncationOutcome {
        truncated_min_percent: 100.0 * n_low as f64 / n_protein as f64,
        truncated_max_percent: 100.0 * n_high as f64 / n_protein as f64,
        mean_protein_density: protein_sum / n_protein as f64,
    };
    debug!(
        low = outcome.truncated_min_percent,
        high = outcome.truncated_max_percent,
        "Density truncation applied."
    );
    outcome
}

/// The solvent-flipping factor for one cycle.
///
/// Every cycle except the last uses `-(1 - solvent_fraction) / solvent_fraction`,
/// optionally rescaled by `(rms_protein_new / rms_protein_old)^2`; the
/// final cycle uses 0 so the flip step is the identity.
pub fn solvent_flip_factor(
    solvent_fraction: f64,
    is_final_cycle: bool,
    scale: Option<(f64, f64)>,
) -> f64 {
    if is_final_cycle {
        return 0.0;
    }
    let mut k = -(1.0 - solvent_fraction) / solvent_fraction;
    if let Some((rms_new, rms_old)) = scale {
        k *= (rms_new / rms_old).powi(2);
    }
    k
}

/// Flips solvent density about `mean_solvent`:
/// `v <- mean + k_flip * (v - mean)`.
///
/// Returns the mean solvent density recomputed from the flipped map.
pub fn flip_solvent(
    map: &mut MapGrid,
    mask: &SolventMask,
    mean_solvent: f64,
    k_flip: f64,
) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for (i, v) in map.values_mut().iter_mut().enumerate() {
        if mask.is_solvent(i) {
            *v = mean_solvent + k_flip * (*v - mean_solvent);
            sum += *v;
            count += 1;
        }
    }
    sum / count as f64
}

/// Sets every solvent-classed point to `mean_solvent`, unconditionally.
pub fn flatten_solvent(map: &mut MapGrid, mask: &SolventMask, mean_solvent: f64) {
    for (i, v) in map.values_mut().iter_mut().enumerate() {
        if mask.is_solvent(i) {
            *v = mean_solvent;
        }
    }
}

/// Result of the optional solvent level adjustment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolventAdjustment {
    /// The constant added to every solvent point.
    pub solvent_add: f64,
    /// The analytically updated mean solvent density.
    pub mean_solvent_density: f64,
}

/// Raises the solvent level toward the protein level.
///
/// `solvent_add = (mean_protein - min_protein) / protein_solvent_ratio
///                + min_protein - mean_solvent` is added to every solvent
/// point; the carried mean solvent density is then updated analytically
/// (not by re-reading the grid) to
/// `(1 - solvent_fraction) * (mean_solvent + solvent_add - mean_protein)`.
pub fn adjust_solvent_level(
    map: &mut MapGrid,
    mask: &SolventMask,
    mean_protein: f64,
    min_protein: f64,
    mean_solvent: f64,
    solvent_fraction: f64,
    protein_solvent_ratio: f64,
) -> SolventAdjustment {
    let solvent_add =
        (mean_protein - min_protein) / protein_solvent_ratio + min_protein - mean_solvent;
    for (i, v) in map.values_mut().iter_mut().enumerate() {
        if mask.is_solvent(i) {
            *v += solvent_add;
        }
    }
    SolventAdjustment {
        solvent_add,
        mean_solvent_density: (1.0 - solvent_fraction)
            * (mean_solvent + solvent_add - mean_protein),
    }
}

/// The overall density level implied by the protein and solvent means,
/// the f000-equivalent of the modified map:
/// `((mean_protein / ratio) - mean_solvent) * (ratio / (ratio - 1))`.
pub fn overall_solvent_level(mean_protein: f64, mean_solvent: f64, ratio: f64) -> f64 {
    ((mean_protein / ratio) - mean_solvent) * (ratio / (ratio - 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn half_solvent_setup() -> (MapGrid, SolventMask) {
        let map = MapGrid::new(2, 2, 2, vec![10.0, 12.0, 8.0, 14.0, 1.0, 3.0, 2.0, 4.0]);
        let mask = SolventMask::new(
            2,
            2,
            2,
            vec![false, false, false, false, true, true, true, true],
        );
        (map, mask)
    }

    #[test]
    fn flattening_sets_every_solvent_point_to_the_mean_exactly() {
        let (mut map, mask) = half_solvent_setup();
        let mean_solvent = mask.statistics(&map).mean_solvent;
        flatten_solvent(&mut map, &mask, mean_solvent);
        for (i, &v) in map.values().iter().enumerate() {
            if mask.is_solvent(i) {
                assert_eq!(v, mean_solvent);
            }
        }
    }

    #[test]
    fn flattening_leaves_protein_points_untouched() {
        let (mut map, mask) = half_solvent_setup();
        let before: Vec<f64> = map.values().to_vec();
        flatten_solvent(&mut map, &mask, 2.5);
        for (i, &v) in map.values().iter().enumerate() {
            if !mask.is_solvent(i) {
                assert_eq!(v, before[i]);
            }
        }
    }

    #[test]
    fn final_cycle_flip_factor_is_zero() {
        // The cycle engine treats a zero factor as "no flip" and skips the
        // application, so solvent values pass the final cycle unchanged.
        assert_eq!(solvent_flip_factor(0.4, true, None), 0.0);
        assert_eq!(solvent_flip_factor(0.4, true, Some((2.0, 1.0))), 0.0);
    }

    #[test]
    fn flip_factor_matches_the_solvent_fraction_formula() {
        let k = solvent_flip_factor(0.4, false, None);
        assert!((k - (-1.5)).abs() < TOLERANCE);
    }

    #[test]
    fn scale_flip_rescales_by_squared_rms_ratio() {
        let base = solvent_flip_factor(0.4, false, None);
        let scaled = solvent_flip_factor(0.4, false, Some((2.0, 4.0)));
        assert!((scaled - base * 0.25).abs() < TOLERANCE);
    }

    #[test]
    fn flipping_inverts_density_about_the_solvent_mean() {
        let (mut map, mask) = half_solvent_setup();
        let mean_solvent = mask.statistics(&map).mean_solvent; // 2.5
        let new_mean = flip_solvent(&mut map, &mask, mean_solvent, -1.0);
        let solvent_idx = map.linear_index(1, 0, 0); // was 1.0
        assert!((map.values()[solvent_idx] - 4.0).abs() < TOLERANCE);
        assert!((new_mean - 2.5).abs() < TOLERANCE);
    }

    #[test]
    fn truncation_clamps_the_requested_tails_of_the_protein_region() {
        let (mut map, mask) = half_solvent_setup();
        let outcome = truncate_density(&mut map, &mask, Some(0.25), Some(0.25));
        // One of four protein points clamped on each side.
        assert!(outcome.truncated_min_percent <= 25.0 + TOLERANCE);
        assert!(outcome.truncated_max_percent <= 25.0 + TOLERANCE);
        let max_protein = map
            .values()
            .iter()
            .enumerate()
            .filter(|(i, _)| !mask.is_solvent(*i))
            .map(|(_, &v)| v)
            .fold(f64::NEG_INFINITY, f64::max);
        assert!(max_protein < 14.0);
        // Solvent untouched.
        let solvent_idx = map.linear_index(1, 0, 0);
        assert_eq!(map.values()[solvent_idx], 1.0);
    }

    #[test]
    fn truncation_recomputes_the_protein_mean_after_clamping() {
        let (mut map, mask) = half_solvent_setup();
        let outcome = truncate_density(&mut map, &mask, None, Some(0.25));
        let direct: f64 = map
            .values()
            .iter()
            .enumerate()
            .filter(|(i, _)| !mask.is_solvent(*i))
            .map(|(_, &v)| v)
            .sum::<f64>()
            / 4.0;
        assert!((outcome.mean_protein_density - direct).abs() < TOLERANCE);
    }

    #[test]
    fn solvent_adjustment_uses_the_analytic_mean_update() {
        let (mut map, mask) = half_solvent_setup();
        let adjustment =
            adjust_solvent_level(&mut map, &mask, 11.0, 8.0, 2.5, 0.4, 1.31);
        let expected_add = (11.0 - 8.0) / 1.31 + 8.0 - 2.5;
        assert!((adjustment.solvent_add - expected_add).abs() < TOLERANCE);
        let expected_mean = 0.6 * (2.5 + expected_add - 11.0);
        assert!((adjustment.mean_solvent_density - expected_mean).abs() < TOLERANCE);
        let solvent_idx = map.linear_index(1, 0, 0);
        assert!((map.values()[solvent_idx] - (1.0 + expected_add)).abs() < TOLERANCE);
    }

    #[test]
    fn overall_solvent_level_matches_the_reference_formula() {
        let value = overall_solvent_level(10.0, 2.0, 1.31);
        let expected = ((10.0 / 1.31) - 2.0) * (1.31 / 0.31);
        assert!((value - expected).abs() < 1e-3);
        assert!((value - 738.0 / 31.0).abs() < 1e-9);
    }
}
