/// Observability seam for experiment application.
///
/// Invoked once per experiment that makes it into the resolved selection.
/// Transport is out of scope here; implementations bridge to whatever metrics
/// pipeline the process runs.
pub trait ExperimentRecorder: Send + Sync {
    fn record_experiment(&self, name: &str);
}

/// Recorder that only emits a log line, for processes without a metrics
/// pipeline wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogExperimentRecorder;

impl ExperimentRecorder for LogExperimentRecorder {
    fn record_experiment(&self, name: &str) {
        log::debug!("The experiment {name:?} is applied");
    }
}
