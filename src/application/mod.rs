pub mod runtime;

pub use runtime::{FlagRuntime, ShutdownReport};
