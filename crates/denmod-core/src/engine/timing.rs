use std::time::{Duration, Instant};

/// The instrumented phases of one density-modification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimedPhase {
    MaskComputation,
    DensityModification,
    MapTransform,
    Scaling,
    SigmaA,
    PhaseIntegration,
}

/// Per-invocation timing accumulators.
///
/// The run owns one of these and returns it with the result; there is no
/// process-wide timing state.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunTimings {
    pub mask_computation: Duration,
    pub density_modification: Duration,
    pub map_transform: Duration,
    pub scaling: Duration,
    pub sigma_a: Duration,
    pub phase_integration: Duration,
    pub total: Duration,
}

impl RunTimings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` and adds its wall time to the accumulator for `phase`.
    pub fn measure<T>(&mut self, phase: TimedPhase, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();
        *self.slot(phase) += elapsed;
        result
    }

    fn slot(&mut self, phase: TimedPhase) -> &mut Duration {
        match phase {
            TimedPhase::MaskComputation => &mut self.mask_computation,
            TimedPhase::DensityModification => &mut self.density_modification,
            TimedPhase::MapTransform => &mut self.map_transform,
            TimedPhase::Scaling => &mut self.scaling,
            TimedPhase::SigmaA => &mut self.sigma_a,
            TimedPhase::PhaseIntegration => &mut self.phase_integration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_returns_the_closure_result() {
        let mut timings = RunTimings::new();
        let value = timings.measure(TimedPhase::MaskComputation, || 41 + 1);
        assert_eq!(value, 42);
    }

    #[test]
    fn measure_accumulates_into_the_selected_phase() {
        let mut timings = RunTimings::new();
        timings.measure(TimedPhase::Scaling, || {
            std::thread::sleep(Duration::from_millis(1))
        });
        assert!(timings.scaling >= Duration::from_millis(1));
        assert_eq!(timings.sigma_a, Duration::ZERO);
    }
}
