pub mod exec;

pub use self::exec::Exec;
