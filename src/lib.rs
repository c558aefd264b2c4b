//! School timetable generation.
//!
//! A run goes feasibility analysis → demand-first construction → local
//! search → hard-rule validation, with an optional exact model as fallback.
//! [`Timetabler`] drives the whole pipeline over one [`Snapshot`].

pub mod catalog;
pub mod construct;
pub mod data;
pub mod error;
pub mod exact;
pub mod feasibility;
pub mod improve;
pub mod pipeline;
pub mod quality;
pub mod server;
pub mod state;
pub mod validate;

#[cfg(test)]
mod testing;

pub use catalog::Catalog;
pub use data::{SlotAssignment, Snapshot};
pub use error::SolverError;
#[cfg(feature = "exact")]
pub use exact::HighsExactSolver;
pub use exact::{ExactOutcome, ExactSolver};
pub use feasibility::FeasibilityResult;
pub use pipeline::{GenerationOutcome, GenerationParams, Timetabler};
pub use validate::ValidationResult;
