use super::grid::MapGrid;

/// Per-grid-point solvent/protein classification.
///
/// A mask is recomputed once per cycle from the current map and is
/// read-only until replaced; it always has the same dimensions as the
/// map it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolventMask {
    nu: usize,
    nv: usize,
    nw: usize,
    solvent: Vec<bool>,
}

impl SolventMask {
    pub fn new(nu: usize, nv: usize, nw: usize, solvent: Vec<bool>) -> Self {
        assert_eq!(solvent.len(), nu * nv * nw);
        Self {
            nu,
            nv,
            nw,
            solvent,
        }
    }

    pub fn dimensions(&self) -> (usize, usize, usize) {
        (self.nu, self.nv, self.nw)
    }

    pub fn len(&self) -> usize {
        self.solvent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solvent.is_empty()
    }

    #[inline]
    pub fn is_solvent(&self, i: usize) -> bool {
        self.solvent[i]
    }

    pub fn flags(&self) -> &[bool] {
        &self.solvent
    }

    pub fn n_solvent(&self) -> usize {
        self.solvent.iter().filter(|&&s| s).count()
    }

    pub fn n_protein(&self) -> usize {
        self.len() - self.n_solvent()
    }

    /// Per-class density statistics of `map` under this mask.
    ///
    /// A single-class mask produces NaN means for the empty class; the
    /// engine does not guard against that degenerate case (documented
    /// surface risk).
    pub fn statistics(&self, map: &MapGrid) -> MaskStatistics {
        debug_assert_eq!(self.len(), map.len());
        let mut sum = [0.0f64; 2];
        let mut count = [0usize; 2];
        for (i, &rho) in map.values().iter().enumerate() {
            let class = self.solvent[i] as usize;
            sum[class] += rho;
            count[class] += 1;
        }
        let mean_protein = sum[0] / count[0] as f64;
        let mean_solvent = sum[1] / count[1] as f64;

        let mut sq = [0.0f64; 2];
        let mut min_protein = f64::INFINITY;
        for (i, &rho) in map.values().iter().enumerate() {
            if self.solvent[i] {
                sq[1] += (rho - mean_solvent) * (rho - mean_solvent);
            } else {
                sq[0] += (rho - mean_protein) * (rho - mean_protein);
                min_protein = min_protein.min(rho);
            }
        }
        MaskStatistics {
            n_protein: count[0],
            n_solvent: count[1],
            mean_protein,
            mean_solvent,
            rms_protein: (sq[0] / count[0] as f64).sqrt(),
            rms_solvent: (sq[1] / count[1] as f64).sqrt(),
            min_protein,
            solvent_fraction: count[1] as f64 / self.len() as f64,
        }
    }
}

/// Scalar per-class statistics derived from a map and its solvent mask.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskStatistics {
    pub n_protein: usize,
    pub n_solvent: usize,
    pub mean_protein: f64,
    pub mean_solvent: f64,
    /// RMS deviation about the protein-class mean.
    pub rms_protein: f64,
    /// RMS deviation about the solvent-class mean.
    pub rms_solvent: f64,
    pub min_protein: f64,
    /// Fraction of grid points classified as solvent.
    pub solvent_fraction: f64,
}
