pub mod local_client;

#[rustfmt::skip]
pub use self::local_client::{CheckSuccess, LocalPool, LocalScheduler};
