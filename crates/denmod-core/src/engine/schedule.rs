/// The averaging-radius schedule of a run: constant at `initial_radius`
/// for the initial steps, shrinking linearly over the shrink steps, and
/// constant at `final_radius` for the remaining cycles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusSchedule {
    pub initial_radius: f64,
    pub final_radius: f64,
    pub initial_steps: usize,
    pub shrink_steps: usize,
    pub final_steps: usize,
}

impl RadiusSchedule {
    pub fn max_iterations(&self) -> usize {
        self.initial_steps + self.shrink_steps + self.final_steps
    }

    /// Per-shrink-step radius decrement; zero when there is no shrink phase.
    pub fn radius_delta(&self) -> f64 {
        if self.shrink_steps > 0 {
            (self.initial_radius - self.final_radius) / self.shrink_steps as f64
        } else {
            0.0
        }
    }

    /// The averaging radius for cycle `i`.
    ///
    /// Evaluated fresh on every call; nothing is cached.
    pub fn radius(&self, i: usize) -> f64 {
        if i < self.initial_steps {
            self.initial_radius
        } else if i < self.initial_steps + self.shrink_steps {
            self.initial_radius - self.radius_delta() * (i - self.initial_steps + 1) as f64
        } else {
            self.final_radius
        }
    }
}
