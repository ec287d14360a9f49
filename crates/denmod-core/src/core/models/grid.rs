use super::cell::UnitCell;

/// A real-valued sampling of the unit cell on a regular 3-D grid.
///
/// Points are stored in row-major order (u fastest is *not* used; the
/// layout is `(u * nv + v) * nw + w`). Indexing is periodic: out-of-range
/// indices wrap around the unit cell. During a density-modification run
/// the grid is owned exclusively by the cycle engine and replaced
/// wholesale at every cycle boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct MapGrid {
    nu: usize,
    nv: usize,
    nw: usize,
    data: Vec<f64>,
}

impl MapGrid {
    pub fn new(nu: usize, nv: usize, nw: usize, data: Vec<f64>) -> Self {
        assert_eq!(data.len(), nu * nv * nw);
        Self { nu, nv, nw, data }
    }

    pub fn zeros(nu: usize, nv: usize, nw: usize) -> Self {
        Self::new(nu, nv, nw, vec![0.0; nu * nv * nw])
    }

    pub fn dimensions(&self) -> (usize, usize, usize) {
        (self.nu, self.nv, self.nw)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.data
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    #[inline]
    pub fn linear_index(&self, u: usize, v: usize, w: usize) -> usize {
        (u * self.nv + v) * self.nw + w
    }

    /// Value at (u,v,w) with periodic wrapping.
    #[inline]
    pub fn get_periodic(&self, u: isize, v: isize, w: isize) -> f64 {
        let u = u.rem_euclid(self.nu as isize) as usize;
        let v = v.rem_euclid(self.nv as isize) as usize;
        let w = w.rem_euclid(self.nw as isize) as usize;
        self.data[self.linear_index(u, v, w)]
    }

    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f64>() / self.data.len() as f64
    }

    /// Root-mean-square deviation about the grid mean.
    pub fn rms(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let var = self
            .data
            .iter()
            .map(|&x| (x - mean) * (x - mean))
            .sum::<f64>()
            / self.data.len() as f64;
        var.sqrt()
    }

    /// Third standardized moment of the density distribution.
    pub fn skewness(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let n = self.data.len() as f64;
        let m2 = self.data.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n;
        let m3 = self.data.iter().map(|&x| (x - mean).powi(3)).sum::<f64>() / n;
        if m2 <= 0.0 { 0.0 } else { m3 / m2.powf(1.5) }
    }
}

/// Grid dimensions giving a sampling interval of about
/// `d_min * resolution_factor` along each cell axis.
pub fn grid_dimensions_for(cell: &UnitCell, d_min: f64, resolution_factor: f64) -> (usize, usize, usize) {
    let spacing = d_min * resolution_factor;
    let dim = |len: f64| ((len / spacing).ceil() as usize).max(2);
    (dim(cell.a), dim(cell.b), dim(cell.c))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    #[test]
    fn periodic_indexing_wraps_both_directions() {
        let mut grid = MapGrid::zeros(2, 2, 2);
        let idx = grid.linear_index(1, 0, 1);
        grid.values_mut()[idx] = 7.0;
        assert_eq!(grid.get_periodic(1, 0, 1), 7.0);
        assert_eq!(grid.get_periodic(-1, 2, 3), 7.0);
        assert_eq!(grid.get_periodic(3, -2, -1), 7.0);
    }

    #[test]
    fn mean_and_rms_of_constant_grid() {
        let grid = MapGrid::new(2, 2, 2, vec![3.0; 8]);
        assert!((grid.mean() - 3.0).abs() < TOLERANCE);
        assert!(grid.rms() < TOLERANCE);
    }

    #[test]
    fn skewness_of_symmetric_distribution_is_zero() {
        let grid = MapGrid::new(2, 2, 1, vec![-1.0, 1.0, -2.0, 2.0]);
        assert!(grid.skewness().abs() < TOLERANCE);
    }

    #[test]
    fn skewness_is_positive_for_right_tailed_distribution() {
        let grid = MapGrid::new(2, 2, 1, vec![0.0, 0.0, 0.0, 10.0]);
        assert!(grid.skewness() > 0.0);
    }

    #[test]
    fn grid_dimensions_follow_the_resolution_factor() {
        let cell = UnitCell::new(10.0, 20.0, 10.0, 90.0, 90.0, 90.0);
        let (nu, nv, nw) = grid_dimensions_for(&cell, 2.0, 0.25);
        assert_eq!((nu, nv, nw), (20, 40, 20));
    }
}
