use domain::model::SchedulerKind;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "Default::default")]
    pub scheduler: SchedulerConfig,

    /// Seconds between status polls while waiting on a job.
    #[serde(default = "DispatchConfig::default_poll_interval")]
    pub poll_interval: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "SchedulerConfig::default_kind")]
    pub kind: SchedulerKind,

    #[serde(default = "Default::default")]
    pub queue: Option<String>,

    /// Worker count for the local pool.
    #[serde(default = "SchedulerConfig::default_nproc")]
    pub nproc: usize,

    /// Whether array dispatcher scripts redirect each task's output to a
    /// per-script logfile, or leave logging to the scheduler's own
    /// templated array logs.
    #[serde(default = "SchedulerConfig::default_redirect_task_logs")]
    pub redirect_task_logs: bool,
}

impl DispatchConfig {
    pub fn default_poll_interval() -> u64 {
        30
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            kind: Self::default_kind(),
            queue: None,
            nproc: Self::default_nproc(),
            redirect_task_logs: Self::default_redirect_task_logs(),
        }
    }
}

impl SchedulerConfig {
    pub fn default_kind() -> SchedulerKind {
        SchedulerKind::Local
    }

    pub fn default_nproc() -> usize {
        1
    }

    pub fn default_redirect_task_logs() -> bool {
        true
    }
}
