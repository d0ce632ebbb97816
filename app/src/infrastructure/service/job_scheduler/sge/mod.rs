pub mod models;
pub mod sge_client;

#[rustfmt::skip]
pub use self::sge_client::SgeClient;
