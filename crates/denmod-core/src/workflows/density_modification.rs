use crate::core::models::cell::{ChangeOfBasis, UnitCell};
use crate::core::models::grid::MapGrid;
use crate::core::models::hl::HlCoefficients;
use crate::core::models::miller::{AmplitudeData, Miller, ReflectionSet};
use crate::core::models::phase::PhaseSet;
use crate::core::models::symmetry::SpaceGroup;
use crate::core::solvent::SolventMaskCalculator;
use crate::engine::collaborators::{Collaborators, DEFAULT_INTEGRATION_STEPS};
use crate::engine::config::{DensityModificationConfig, SolventModificationMethod};
use crate::engine::error::EngineError;
use crate::engine::modification::{
    adjust_solvent_level, flatten_solvent, flip_solvent, overall_solvent_level,
    solvent_flip_factor, truncate_density,
};
use crate::engine::phases::{hl_increment_from_sigma_a, map_coefficients, r1_factor};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::schedule::RadiusSchedule;
use crate::engine::state::CycleState;
use crate::engine::statistics::{CycleRecord, CycleStatistics};
use crate::engine::timing::{RunTimings, TimedPhase};
use nalgebra::Complex;
use std::collections::HashMap;
use tracing::{info, instrument};

/// Experimental input to one density-modification run.
///
/// Amplitudes and Hendrickson-Lattman coefficients are sparse maps; the
/// run completes both to the resolution limit with the zero-fill policy
/// during initialization.
#[derive(Debug, Clone)]
pub struct DensityModificationInput {
    pub cell: UnitCell,
    pub space_group: SpaceGroup,
    /// Resolution of the input data; the run's d_min unless overridden
    /// in the configuration.
    pub d_min: f64,
    pub f_obs: HashMap<Miller, f64>,
    pub hl_coefficients: HashMap<Miller, [f64; 4]>,
}

/// Final products of a completed run.
#[derive(Debug, Clone)]
pub struct DensityModificationResult {
    /// Combined map coefficients, expressed in the input cell setting
    /// (the Niggli basis change, if any, is undone).
    pub map_coefficients: Vec<(Miller, Complex<f64>)>,
    /// Phase estimates of the last cycle.
    pub phases: PhaseSet,
    pub statistics: CycleStatistics,
    pub timings: RunTimings,
}

/// Executes the full density-modification schedule.
///
/// The loop is strictly sequential and owns all mutable state; any
/// collaborator failure aborts the run immediately. A run either
/// completes every cycle or returns an error, with no partial
/// completion mode.
#[instrument(skip_all, name = "density_modification_workflow")]
pub fn run(
    input: &DensityModificationInput,
    config: &DensityModificationConfig,
    collaborators: Collaborators<'_>,
    reporter: &ProgressReporter<'_>,
) -> Result<DensityModificationResult, EngineError> {
    let mut engine = CycleEngine::initialize(input, config, collaborators)?;
    let total_cycles = engine.schedule.max_iterations();
    reporter.report(Progress::RunStart { total_cycles });
    info!(
        total_cycles,
        reflections = engine.set.len(),
        "Density modification initialized."
    );

    for i in 0..total_cycles {
        reporter.report(Progress::CycleStart { cycle: i + 1 });
        engine.advance(i)?;
        let record = engine
            .statistics
            .last()
            .ok_or_else(|| EngineError::Internal("cycle produced no record".into()))?;
        reporter.report(Progress::CycleFinish {
            cycle: i + 1,
            mean_fom: record.mean_fom,
        });
        if config.verbose {
            if let Some(summary) = engine.statistics.format_summary(engine.statistics.len() - 1) {
                reporter.report(Progress::Message(summary));
            }
        }
    }

    reporter.report(Progress::RunFinish);
    info!("Density modification complete.");
    Ok(engine.finish())
}

/// The owner of all per-run mutable state.
///
/// The map grid and solvent statistics are replaced wholesale at every
/// cycle boundary; nothing outside the engine retains references that
/// outlive a cycle.
struct CycleEngine<'a> {
    config: &'a DensityModificationConfig,
    collaborators: Collaborators<'a>,
    calculator: SolventMaskCalculator,
    schedule: RadiusSchedule,
    set: ReflectionSet,
    f_obs: AmplitudeData,
    hl_start: HlCoefficients,
    phases_initial: PhaseSet,
    phases_previous: PhaseSet,
    map: MapGrid,
    last_coefficients: Vec<Complex<f64>>,
    state: CycleState,
    statistics: CycleStatistics,
    timings: RunTimings,
    change_of_basis: Option<ChangeOfBasis>,
}

impl<'a> CycleEngine<'a> {
    /// INIT: validates the setting, completes the data to d_min, builds
    /// the first map and mask, and records the pre-loop cycle-0 state.
    fn initialize(
        input: &DensityModificationInput,
        config: &'a DensityModificationConfig,
        collaborators: Collaborators<'a>,
    ) -> Result<Self, EngineError> {
        let d_min = config.d_min.unwrap_or(input.d_min);
        let final_radius = config
            .solvent_mask
            .averaging_radius
            .final_radius
            .unwrap_or(d_min);
        let initial_radius = config
            .solvent_mask
            .averaging_radius
            .initial
            .unwrap_or(final_radius + 1.0);
        let schedule = RadiusSchedule {
            initial_radius,
            final_radius,
            initial_steps: config.initial_steps,
            shrink_steps: config.shrink_steps,
            final_steps: config.final_steps,
        };

        // Optional re-expression in the Niggli-reduced cell; undone at
        // the end of the run.
        let (cell, change_of_basis) = if config.change_basis_to_niggli_cell {
            let (reduced, cob) = input.cell.niggli_reduce();
            (reduced, Some(cob))
        } else {
            (input.cell, None)
        };
        let canonicalize = |hkl: Miller| {
            let transformed = match &change_of_basis {
                Some(cob) => cob.transform_miller(hkl),
                None => hkl,
            };
            transformed.friedel_canonical()
        };
        let f_obs_sparse: HashMap<Miller, f64> = input
            .f_obs
            .iter()
            .map(|(&hkl, &f)| (canonicalize(hkl), f))
            .collect();
        let hl_sparse: HashMap<Miller, [f64; 4]> = input
            .hl_coefficients
            .iter()
            .map(|(&hkl, &row)| (canonicalize(hkl), row))
            .collect();

        // The space group must be re-expressed alongside the indices, or
        // centricity would be evaluated with the wrong group in the new
        // setting.
        let space_group = match &change_of_basis {
            Some(cob) => input.space_group.change_basis(cob),
            None => input.space_group.clone(),
        };
        let set = ReflectionSet::complete_to_d_min(cell, space_group, d_min);
        let f_obs = AmplitudeData::from_sparse(&set, &f_obs_sparse);
        let hl_start = HlCoefficients::from_sparse(&set, &hl_sparse);

        let mut timings = RunTimings::new();
        let phases_initial = timings.measure(TimedPhase::PhaseIntegration, || {
            collaborators
                .integrator
                .integrate(&set, &hl_start, DEFAULT_INTEGRATION_STEPS)
        })?;

        // First map: fom-weighted observed amplitudes, zero where the
        // figure of merit vanishes.
        let initial_coefficients: Vec<Complex<f64>> = (0..set.len())
            .map(|i| {
                let fom = phases_initial.fom(i);
                if fom <= 0.0 {
                    Complex::new(0.0, 0.0)
                } else {
                    Complex::from_polar(f_obs.values()[i] * fom, phases_initial.phase(i))
                }
            })
            .collect();
        let map = timings.measure(TimedPhase::MapTransform, || {
            collaborators.transform.map_from_coefficients(
                &set,
                &initial_coefficients,
                config.grid_resolution_factor,
            )
        })?;

        let calculator = SolventMaskCalculator::new(config.solvent_fraction);
        let radius = schedule.radius(0);
        let mask = timings.measure(TimedPhase::MaskComputation, || {
            calculator.compute(&map, set.cell(), radius, 0.0)
        });

        let mut statistics = CycleStatistics::new();
        statistics.add(CycleRecord {
            cycle: 0,
            radius,
            mean_protein_density: mask.statistics.mean_protein,
            mean_solvent_density: mask.statistics.mean_solvent,
            rms_protein_density: mask.statistics.rms_protein,
            rms_solvent_density: mask.statistics.rms_solvent,
            truncated_min_percent: None,
            truncated_max_percent: None,
            k_flip: None,
            solvent_add: None,
            overall_density_level: None,
            mean_phase_change_previous: None,
            mean_phase_change_initial: None,
            r1_factor: None,
            r1_factor_fom_weighted: None,
            mean_fom: phases_initial.mean_fom(),
            map_skewness: map.skewness(),
        });

        let mut state = CycleState::initial(radius);
        state.mean_solvent_density = mask.statistics.mean_solvent;
        state.rms_protein_density = mask.statistics.rms_protein;

        Ok(Self {
            config,
            collaborators,
            calculator,
            schedule,
            set,
            f_obs,
            hl_start,
            phases_previous: phases_initial.clone(),
            phases_initial,
            map,
            last_coefficients: initial_coefficients,
            state,
            statistics,
            timings,
            change_of_basis,
        })
    }

    /// One modification cycle, steps in the fixed order: mask, truncate,
    /// flip/flatten, adjust, recombine phases, rebuild the map, record.
    fn advance(&mut self, i: usize) -> Result<(), EngineError> {
        // NCS averaging is exposed but deliberately unimplemented; it
        // fails the moment it would execute.
        if self.config.ncs_averaging {
            return Err(EngineError::NotSupported {
                feature: "NCS averaging",
            });
        }

        let radius = self.schedule.radius(i);
        let mask = self.timings.measure(TimedPhase::MaskComputation, || {
            self.calculator.compute(
                &self.map,
                self.set.cell(),
                radius,
                self.state.mean_solvent_density,
            )
        });
        let mask_stats = mask.statistics;

        let truncation = if self.config.density_truncation.is_enabled() {
            Some(self.timings.measure(TimedPhase::DensityModification, || {
                truncate_density(
                    &mut self.map,
                    &mask.mask,
                    self.config.density_truncation.fraction_min,
                    self.config.density_truncation.fraction_max,
                )
            }))
        } else {
            None
        };
        let mean_protein =
            truncation.map_or(mask_stats.mean_protein, |t| t.mean_protein_density);

        let is_final_cycle = i + 1 == self.schedule.max_iterations();
        let mut mean_solvent = mask_stats.mean_solvent;
        let mut k_flip = None;
        match self.config.solvent_modification.method {
            SolventModificationMethod::Flipping => {
                let scale = if self.config.solvent_modification.scale_flip
                    && self.state.rms_protein_density > 0.0
                {
                    Some((mask_stats.rms_protein, self.state.rms_protein_density))
                } else {
                    None
                };
                let k = solvent_flip_factor(self.config.solvent_fraction, is_final_cycle, scale);
                if k != 0.0 {
                    mean_solvent = self.timings.measure(TimedPhase::DensityModification, || {
                        flip_solvent(&mut self.map, &mask.mask, mask_stats.mean_solvent, k)
                    });
                }
                k_flip = Some(k);
            }
            SolventModificationMethod::Flattening => {
                self.timings.measure(TimedPhase::DensityModification, || {
                    flatten_solvent(&mut self.map, &mask.mask, mask_stats.mean_solvent)
                });
            }
        }

        let mut solvent_add = None;
        if self.config.solvent_adjust {
            let adjustment = self.timings.measure(TimedPhase::DensityModification, || {
                adjust_solvent_level(
                    &mut self.map,
                    &mask.mask,
                    mean_protein,
                    mask_stats.min_protein,
                    mean_solvent,
                    self.config.solvent_fraction,
                    self.config.protein_solvent_ratio,
                )
            });
            mean_solvent = adjustment.mean_solvent_density;
            solvent_add = Some(adjustment.solvent_add);
        }

        // Recombine phase evidence from the modified map.
        let f_model = self.timings.measure(TimedPhase::MapTransform, || {
            self.collaborators
                .transform
                .coefficients_from_map(&self.set, &self.map)
        })?;
        let fit = self.timings.measure(TimedPhase::Scaling, || {
            self.collaborators.scaler.fit(&self.set, &self.f_obs, &f_model)
        })?;
        let f_scaled = fit.apply(&self.set, &f_model);
        let estimate = self.timings.measure(TimedPhase::SigmaA, || {
            self.collaborators
                .sigma_a
                .estimate(&self.set, &self.f_obs, &f_scaled)
        })?;

        // Each cycle recombines against the starting coefficients, not
        // the running total, so evidence never compounds across cycles.
        let increment = hl_increment_from_sigma_a(&estimate, &f_scaled);
        let combined = self.hl_start.combined_with(&increment)?;
        let phases = self.timings.measure(TimedPhase::PhaseIntegration, || {
            self.collaborators
                .integrator
                .integrate(&self.set, &combined, DEFAULT_INTEGRATION_STEPS)
        })?;

        let coefficients =
            map_coefficients(&self.set, &self.f_obs, &phases, &estimate.dd, &f_scaled);
        self.map = self.timings.measure(TimedPhase::MapTransform, || {
            self.collaborators.transform.map_from_coefficients(
                &self.set,
                &coefficients,
                self.config.grid_resolution_factor,
            )
        })?;

        let f_scaled_amplitudes: Vec<f64> = f_scaled.iter().map(|f| f.norm()).collect();
        let fom_weights: Vec<f64> = (0..phases.len()).map(|j| phases.fom(j)).collect();
        let record = CycleRecord {
            cycle: i + 1,
            radius,
            mean_protein_density: mean_protein,
            mean_solvent_density: mean_solvent,
            rms_protein_density: mask_stats.rms_protein,
            rms_solvent_density: mask_stats.rms_solvent,
            truncated_min_percent: truncation.map(|t| t.truncated_min_percent),
            truncated_max_percent: truncation.map(|t| t.truncated_max_percent),
            k_flip,
            solvent_add,
            overall_density_level: Some(overall_solvent_level(
                mean_protein,
                mean_solvent,
                self.config.protein_solvent_ratio,
            )),
            mean_phase_change_previous: Some(
                phases.mean_absolute_phase_difference_deg(&self.phases_previous),
            ),
            mean_phase_change_initial: Some(
                phases.mean_absolute_phase_difference_deg(&self.phases_initial),
            ),
            r1_factor: Some(r1_factor(
                self.f_obs.values(),
                &f_scaled_amplitudes,
                None,
            )),
            r1_factor_fom_weighted: Some(r1_factor(
                self.f_obs.values(),
                &f_scaled_amplitudes,
                Some(&fom_weights),
            )),
            mean_fom: phases.mean_fom(),
            map_skewness: self.map.skewness(),
        };
        info!(
            cycle = record.cycle,
            mean_fom = record.mean_fom,
            r1 = record.r1_factor,
            "Cycle complete."
        );
        self.statistics.add(record);

        self.state = CycleState {
            cycle: i + 1,
            radius,
            mean_solvent_density: mean_solvent,
            rms_protein_density: mask_stats.rms_protein,
        };
        self.phases_previous = phases;
        self.last_coefficients = coefficients;
        Ok(())
    }

    /// DONE: expose the final products, transformed back to the input
    /// cell setting when a Niggli basis change was applied.
    fn finish(self) -> DensityModificationResult {
        let inverse = self.change_of_basis.as_ref().map(ChangeOfBasis::inverse);
        let map_coefficients = self
            .set
            .indices()
            .iter()
            .zip(&self.last_coefficients)
            .map(|(&hkl, &f)| {
                let out = match &inverse {
                    Some(inv) => inv.transform_miller(hkl),
                    None => hkl,
                };
                (out, f)
            })
            .collect();
        DensityModificationResult {
            map_coefficients,
            phases: self.phases_previous,
            statistics: self.statistics,
            timings: self.timings,
        }
    }
}
