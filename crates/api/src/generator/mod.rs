//! Module generation: the orchestrator, its resource lookup, the on-disk
//! artifact writer and the teardown/compensation steps.

pub mod artifacts;
pub mod lookup;
pub mod orchestrator;
pub mod teardown;

pub use orchestrator::{GenerationOutcome, ModuleGenerator};
pub use teardown::TeardownReport;
