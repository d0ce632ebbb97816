mod job_scheduler;

#[rustfmt::skip]
pub use self::job_scheduler::{ControlOutcome, JobScheduler};
