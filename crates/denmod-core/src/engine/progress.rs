/// Cycle-boundary events published by the density-modification run.
///
/// The engine has no dependency on any UI or reporting framework; a host
/// that wants progress output installs a callback and renders the events
/// however it likes.
#[derive(Debug, Clone)]
pub enum Progress {
    RunStart { total_cycles: usize },
    CycleStart { cycle: usize },
    CycleFinish { cycle: usize, mean_fom: f64 },
    Message(String),
    RunFinish,
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn reporter_without_callback_ignores_events() {
        let reporter = ProgressReporter::new();
        reporter.report(Progress::RunStart { total_cycles: 3 });
    }

    #[test]
    fn reporter_forwards_events_to_the_callback() {
        let seen = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::CycleStart { cycle } = event {
                seen.lock().unwrap().push(cycle);
            }
        }));
        reporter.report(Progress::CycleStart { cycle: 0 });
        reporter.report(Progress::CycleStart { cycle: 1 });
        drop(reporter);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
    }
}
