//! Schema module - Configuration, parameter space and report types.

mod evolution;
mod parameters;
mod report;

pub use evolution::*;
pub use parameters::*;
pub use report::*;
