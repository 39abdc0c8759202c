//! Command implementations.

pub mod flag;
