use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;
use strum::{Display, EnumString};
use typed_builder::TypedBuilder;

/// Target execution environment for submitted scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SchedulerKind {
    Local,
    Sge,
    Lsf,
}

/// Raw key/value snapshot of a job as reported by its backend.
///
/// Keys are backend vocabulary and are not normalized across backends. An
/// empty map means the job is unknown to the backend, i.e. finished or
/// expired.
pub type StatusMap = HashMap<String, String>;

/// The uniform parameter set accepted by every backend's submit operation.
///
/// Only `command` is mandatory; each backend maps the optional fields onto
/// its native flags and ignores the ones it has no equivalent for.
#[derive(Debug, Clone, TypedBuilder)]
pub struct Submission {
    /// One or more shell-executable scripts. More than one entry turns the
    /// submission into an array job on grid backends.
    #[builder(setter(into))]
    pub command: Vec<PathBuf>,

    /// Working directory; the caller's current directory when unset.
    #[builder(default)]
    pub directory: Option<PathBuf>,

    /// Native job ids that must reach a done state before this one starts.
    #[builder(default)]
    pub deps: Vec<String>,

    /// Logfile for stdout.
    #[builder(default)]
    pub log: Option<PathBuf>,

    #[builder(default, setter(strip_option, into))]
    pub name: Option<String>,

    /// Parallel-environment keywords, passed through verbatim.
    #[builder(default, setter(strip_option, into))]
    pub pe_opts: Option<String>,

    /// Threads-per-node hint for backends that express it as a span.
    #[builder(default, setter(strip_option))]
    pub threads: Option<usize>,

    #[builder(default, setter(strip_option))]
    pub priority: Option<i32>,

    #[builder(default, setter(strip_option, into))]
    pub queue: Option<String>,

    /// Absolute path to the shell to run the job in.
    #[builder(default)]
    pub shell: Option<PathBuf>,

    /// Maximum wall-clock runtime, advisory to the scheduler.
    #[builder(default, setter(strip_option))]
    pub runtime: Option<u64>,

    /// Submit but hold the job.
    #[builder(default)]
    pub hold: bool,

    /// Worker count for the local pool.
    #[builder(default, setter(strip_option))]
    pub nproc: Option<usize>,

    /// Allow individual scripts to exit non-zero.
    #[builder(default)]
    pub permit_nonzero: bool,
}
