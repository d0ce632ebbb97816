pub mod lsf_client;
pub mod models;

#[rustfmt::skip]
pub use self::lsf_client::LsfClient;
