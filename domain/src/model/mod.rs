pub mod job;

#[rustfmt::skip]
pub use self::job::{SchedulerKind, StatusMap, Submission};
