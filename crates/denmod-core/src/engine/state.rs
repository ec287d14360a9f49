/// Mutable per-cycle engine state carried across cycle boundaries.
///
/// Created at engine construction (cycle 0, before the loop) and updated
/// exactly once per cycle; per-cycle diagnostics are recorded separately
/// in the append-only statistics table.
#[derive(Debug, Clone, Copy)]
pub struct CycleState {
    /// Index of the cycle currently executing (or about to execute).
    pub cycle: usize,
    /// Averaging radius used for the current mask computation.
    pub radius: f64,
    /// Mean solvent density carried into the next mask computation as the
    /// local-RMS bias.
    pub mean_solvent_density: f64,
    /// Protein-region RMS of the previous cycle, used by scale-flip.
    pub rms_protein_density: f64,
}

impl CycleState {
    pub fn initial(radius: f64) -> Self {
        Self {
            cycle: 0,
            radius,
            mean_solvent_density: 0.0,
            rms_protein_density: 0.0,
        }
    }
}
