use super::collaborators::SigmaAEstimate;
use crate::core::models::hl::HlCoefficients;
use crate::core::models::miller::{AmplitudeData, ReflectionSet};
use crate::core::models::phase::PhaseSet;
use itertools::izip;
use nalgebra::Complex;

/// Fo/Fc weights used when building map coefficients: (2, 1) for
/// acentric reflections, (1, 0) for centric ones.
#[inline]
pub fn map_coefficient_scales(is_centric: bool) -> (f64, f64) {
    if is_centric { (1.0, 0.0) } else { (2.0, 1.0) }
}

/// Converts one cycle's sigma-A estimate into an HL evidence increment.
///
/// The increment strength is `xc = 2 c e_obs e_mod / (1 - c^2)`, laid
/// onto the (A,B) axes through the phase of the back-transformed (and
/// scaled) model structure factor; C and D stay zero. Each cycle's
/// increment is added to the *starting* HL coefficients, never to the
/// running total, so evidence does not compound across cycles.
pub fn hl_increment_from_sigma_a(
    estimate: &SigmaAEstimate,
    f_calc: &[Complex<f64>],
) -> HlCoefficients {
    let rows = izip!(&estimate.c, &estimate.e_obs, &estimate.e_mod, f_calc)
        .map(|(&c, &e_obs, &e_mod, f)| {
            let xc = 2.0 * c * e_obs * e_mod / (1.0 - c * c);
            let phase = f.arg();
            [xc * phase.cos(), xc * phase.sin(), 0.0, 0.0]
        })
        .collect();
    HlCoefficients::from_rows(rows)
}

/// Builds the next cycle's map coefficients:
/// `(fo_scale * m * Fo - fc_scale * D * |Fc|) * exp(i * phi_combined)`,
/// with the centric/acentric scale selection of
/// [`map_coefficient_scales`]. Both terms are phase-transferred by the
/// combined phase estimate.
pub fn map_coefficients(
    set: &ReflectionSet,
    f_obs: &AmplitudeData,
    phases: &PhaseSet,
    dd: &[f64],
    f_calc: &[Complex<f64>],
) -> Vec<Complex<f64>> {
    (0..set.len())
        .map(|i| {
            let (fo_scale, fc_scale) = map_coefficient_scales(set.is_centric(i));
            let amplitude = fo_scale * phases.fom(i) * f_obs.values()[i]
                - fc_scale * dd[i] * f_calc[i].norm();
            Complex::from_polar(amplitude, phases.phase(i))
        })
        .collect()
}

/// R1 = sum(w |Fo - k Fc|) / sum(w Fo), with the scale k fitted by
/// least squares over the same weighted arrays.
pub fn r1_factor(f_obs: &[f64], f_calc_amplitudes: &[f64], weights: Option<&[f64]>) -> f64 {
    debug_assert_eq!(f_obs.len(), f_calc_amplitudes.len());
    let weight = |i: usize| weights.map_or(1.0, |w| w[i]);

    let mut num_scale = 0.0;
    let mut den_scale = 0.0;
    for i in 0..f_obs.len() {
        let w = weight(i);
        num_scale += w * f_obs[i] * f_calc_amplitudes[i];
        den_scale += w * f_calc_amplitudes[i] * f_calc_amplitudes[i];
    }
    let k = if den_scale > 0.0 {
        num_scale / den_scale
    } else {
        1.0
    };

    let mut num = 0.0;
    let mut den = 0.0;
    for i in 0..f_obs.len() {
        let w = weight(i);
        num += w * (f_obs[i] - k * f_calc_amplitudes[i]).abs();
        den += w * f_obs[i];
    }
    if den > 0.0 { num / den } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::cell::UnitCell;
    use crate::core::models::miller::Miller;
    use crate::core::models::symmetry::SpaceGroup;
    use std::collections::HashMap;

    const TOLERANCE: f64 = 1e-9;

    #[test]
    fn centric_reflections_use_fo_only_scales() {
        assert_eq!(map_coefficient_scales(true), (1.0, 0.0));
    }

    #[test]
    fn acentric_reflections_use_two_fo_minus_fc_scales() {
        assert_eq!(map_coefficient_scales(false), (2.0, 1.0));
    }

    #[test]
    fn hl_increment_lies_along_the_model_phase() {
        let estimate = SigmaAEstimate {
            c: vec![0.5],
            e_obs: vec![1.2],
            e_mod: vec![0.8],
            dd: vec![0.5],
        };
        let phase = 0.7f64;
        let f_calc = vec![Complex::from_polar(3.0, phase)];
        let hl = hl_increment_from_sigma_a(&estimate, &f_calc);
        let xc = 2.0 * 0.5 * 1.2 * 0.8 / (1.0 - 0.25);
        let row = hl.row(0);
        assert!((row[0] - xc * phase.cos()).abs() < TOLERANCE);
        assert!((row[1] - xc * phase.sin()).abs() < TOLERANCE);
        assert_eq!(row[2], 0.0);
        assert_eq!(row[3], 0.0);
    }

    #[test]
    fn map_coefficients_select_scales_by_centricity() {
        // A centrosymmetric crystal makes every reflection centric; P1
        // makes every reflection acentric. Compare one reflection across
        // the two settings.
        let cell = UnitCell::new(10.0, 10.0, 10.0, 90.0, 90.0, 90.0);
        let hkl = Miller::new(1, 0, 0);
        let mut observed = HashMap::new();
        observed.insert(hkl.friedel_canonical(), 4.0);

        let phase = 0.3f64;
        let mut results = Vec::new();
        for sg in [SpaceGroup::p1_bar(), SpaceGroup::p1()] {
            let set = crate::core::models::miller::ReflectionSet::complete_to_d_min(
                cell, sg, 5.0,
            );
            let f_obs = AmplitudeData::from_sparse(&set, &observed);
            let phases = PhaseSet::from_centroids(vec![
                Complex::from_polar(0.5, phase);
                set.len()
            ]);
            let dd = vec![0.9; set.len()];
            let f_calc = vec![Complex::from_polar(2.0, phase); set.len()];
            let coeffs = map_coefficients(&set, &f_obs, &phases, &dd, &f_calc);
            results.push(coeffs[set.position(hkl).unwrap()]);
        }

        // Centric: 1 * m * Fo = 0.5 * 4.0 = 2.0
        assert!((results[0].norm() - 2.0).abs() < TOLERANCE);
        // Acentric: 2 * m * Fo - 1 * D * |Fc| = 4.0 - 1.8 = 2.2
        assert!((results[1].norm() - 2.2).abs() < TOLERANCE);
        assert!((results[1].arg() - phase).abs() < TOLERANCE);
    }

    #[test]
    fn r1_of_perfectly_scaled_model_is_zero() {
        let f_obs = [10.0, 20.0, 30.0];
        let f_calc = [5.0, 10.0, 15.0];
        assert!(r1_factor(&f_obs, &f_calc, None) < TOLERANCE);
    }

    #[test]
    fn r1_grows_with_model_disagreement() {
        let f_obs = [10.0, 20.0, 30.0];
        let close = [10.0, 21.0, 29.0];
        let far = [30.0, 5.0, 11.0];
        assert!(r1_factor(&f_obs, &close, None) < r1_factor(&f_obs, &far, None));
    }

    #[test]
    fn zero_weight_removes_a_reflection_from_the_residual() {
        let f_obs = [10.0, 20.0];
        let f_calc = [10.0, 999.0];
        let weighted = r1_factor(&f_obs, &f_calc, Some(&[1.0, 0.0]));
        let unweighted = r1_factor(&f_obs, &f_calc, None);
        assert!(weighted < TOLERANCE);
        assert!(unweighted > 0.1);
    }
}
