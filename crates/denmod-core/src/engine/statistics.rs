use serde::Serialize;
use std::fmt::Write as _;
use std::io;

/// Diagnostics of one density-modification cycle.
///
/// Cycle 0 is the pre-loop record made right after the initial map and
/// mask are built; it has no modification or phase-recombination fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleRecord {
    pub cycle: usize,
    pub radius: f64,
    pub mean_protein_density: f64,
    pub mean_solvent_density: f64,
    pub rms_protein_density: f64,
    pub rms_solvent_density: f64,
    pub truncated_min_percent: Option<f64>,
    pub truncated_max_percent: Option<f64>,
    pub k_flip: Option<f64>,
    pub solvent_add: Option<f64>,
    /// The f000-equivalent overall density level implied by the cycle's
    /// protein and solvent means.
    pub overall_density_level: Option<f64>,
    /// Mean absolute phase change vs. the previous cycle, degrees.
    pub mean_phase_change_previous: Option<f64>,
    /// Mean absolute phase change vs. the initial estimate, degrees.
    pub mean_phase_change_initial: Option<f64>,
    pub r1_factor: Option<f64>,
    pub r1_factor_fom_weighted: Option<f64>,
    pub mean_fom: f64,
    pub map_skewness: f64,
}

/// Append-only per-cycle diagnostics of one run.
///
/// Records are never mutated after being added; the table grows by one
/// record per cycle (plus the cycle-0 record) and is exposed whole in
/// the run result.
#[derive(Debug, Clone, Default)]
pub struct CycleStatistics {
    records: Vec<CycleRecord>,
}

/// Column names exported by [`CycleStatistics::as_table`], in order.
pub const TABLE_COLUMNS: [&str; 8] = [
    "cycle",
    "radius",
    "mean_protein_density",
    "mean_solvent_density",
    "rms_protein_density",
    "rms_solvent_density",
    "mean_fom",
    "map_skewness",
];

impl CycleStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: CycleRecord) {
        self.records.push(record);
    }

    pub fn get(&self, i: usize) -> Option<&CycleRecord> {
        self.records.get(i)
    }

    pub fn last(&self) -> Option<&CycleRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CycleRecord> {
        self.records.iter()
    }

    /// Renders a fixed-layout textual report for record `i`.
    pub fn format_summary(&self, i: usize) -> Option<String> {
        let r = self.get(i)?;
        let mut out = String::new();
        let _ = writeln!(out, "Cycle {:>3}  (averaging radius {:.3} A)", r.cycle, r.radius);
        let _ = writeln!(
            out,
            "  protein density: mean {:>10.4}  rms {:>10.4}",
            r.mean_protein_density, r.rms_protein_density
        );
        let _ = writeln!(
            out,
            "  solvent density: mean {:>10.4}  rms {:>10.4}",
            r.mean_solvent_density, r.rms_solvent_density
        );
        if let (Some(lo), Some(hi)) = (r.truncated_min_percent, r.truncated_max_percent) {
            let _ = writeln!(out, "  truncated: {lo:.2}% low, {hi:.2}% high");
        }
        if let Some(k) = r.k_flip {
            let _ = writeln!(out, "  k_flip: {k:.4}");
        }
        if let Some(add) = r.solvent_add {
            let _ = writeln!(out, "  solvent level adjustment: {add:.4}");
        }
        if let Some(level) = r.overall_density_level {
            let _ = writeln!(out, "  overall density level: {level:.4}");
        }
        if let (Some(prev), Some(init)) =
            (r.mean_phase_change_previous, r.mean_phase_change_initial)
        {
            let _ = writeln!(
                out,
                "  mean |d phi|: {prev:>7.2} deg (previous)  {init:>7.2} deg (initial)"
            );
        }
        if let (Some(r1), Some(r1w)) = (r.r1_factor, r.r1_factor_fom_weighted) {
            let _ = writeln!(out, "  R1: {r1:.4}  R1 (fom-weighted): {r1w:.4}");
        }
        let _ = writeln!(
            out,
            "  mean fom: {:.4}  map skewness: {:.4}",
            r.mean_fom, r.map_skewness
        );
        Some(out)
    }

    /// Exports the scalar per-cycle columns (for plotting FOM vs. cycle,
    /// density means vs. cycle, and so on).
    pub fn as_table(&self) -> Vec<(&'static str, Vec<f64>)> {
        let col = |f: fn(&CycleRecord) -> f64| self.records.iter().map(f).collect::<Vec<_>>();
        vec![
            ("cycle", col(|r| r.cycle as f64)),
            ("radius", col(|r| r.radius)),
            ("mean_protein_density", col(|r| r.mean_protein_density)),
            ("mean_solvent_density", col(|r| r.mean_solvent_density)),
            ("rms_protein_density", col(|r| r.rms_protein_density)),
            ("rms_solvent_density", col(|r| r.rms_solvent_density)),
            ("mean_fom", col(|r| r.mean_fom)),
            ("map_skewness", col(|r| r.map_skewness)),
        ]
    }

    /// Writes all records as CSV, one row per cycle.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for record in &self.records {
            csv_writer.serialize(record)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}
