use crate::core::models::cell::UnitCell;
use crate::core::models::grid::MapGrid;
use nalgebra::Vector3;

/// Computes a local-RMS density map by a spherical sliding-window second
/// moment about `bias`.
///
/// For every grid point the returned value is
/// `sqrt(mean((rho - bias)^2))` over all points within `radius`
/// (Angstroms) of it, with periodic wrapping at the cell boundaries.
/// The bias recenters the statistic: passing the previous cycle's mean
/// solvent density keeps the solvent threshold consistent from cycle to
/// cycle instead of drifting with a naive variance.
pub fn local_rms_map(map: &MapGrid, cell: &UnitCell, radius: f64, bias: f64) -> MapGrid {
    let (nu, nv, nw) = map.dimensions();
    let offsets = ball_offsets(cell, (nu, nv, nw), radius);
    debug_assert!(!offsets.is_empty());

    let mut out = vec![0.0; map.len()];
    for u in 0..nu {
        for v in 0..nv {
            for w in 0..nw {
                let mut sum_sq = 0.0;
                for &(du, dv, dw) in &offsets {
                    let rho =
                        map.get_periodic(u as isize + du, v as isize + dv, w as isize + dw);
                    let d = rho - bias;
                    sum_sq += d * d;
                }
                out[map.linear_index(u, v, w)] = (sum_sq / offsets.len() as f64).sqrt();
            }
        }
    }
    MapGrid::new(nu, nv, nw, out)
}

/// Grid offsets within `radius` of the origin, measured with the cell
/// metric so that the window is spherical in Cartesian space.
fn ball_offsets(
    cell: &UnitCell,
    dims: (usize, usize, usize),
    radius: f64,
) -> Vec<(isize, isize, isize)> {
    let (nu, nv, nw) = dims;
    let g = cell.metric_tensor();
    let reach = |len: f64, n: usize| (radius * n as f64 / len).ceil() as isize + 1;
    let (su, sv, sw) = (reach(cell.a, nu), reach(cell.b, nv), reach(cell.c, nw));

    let r_sq = radius * radius;
    let mut offsets = Vec::new();
    for du in -su..=su {
        for dv in -sv..=sv {
            for dw in -sw..=sw {
                let frac = Vector3::new(
                    du as f64 / nu as f64,
                    dv as f64 / nv as f64,
                    dw as f64 / nw as f64,
                );
                let dist_sq = (frac.transpose() * g * frac)[(0, 0)];
                if dist_sq <= r_sq {
                    offsets.push((du, dv, dw));
                }
            }
        }
    }
    offsets
}
