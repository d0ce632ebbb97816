pub mod array;
pub mod local;
pub mod lsf;
pub mod sge;

#[rustfmt::skip]
pub use self::{
    local::LocalScheduler,
    lsf::LsfClient,
    sge::SgeClient,
};
