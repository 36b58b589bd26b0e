//! Process-wide logging setup shared by the ledger binaries.

pub mod tracing;

pub use crate::tracing::{init, init_with, LogFormat};
