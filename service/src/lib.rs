pub mod job;

pub use self::job::Job;
