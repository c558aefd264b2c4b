use thiserror::Error;

use crate::data::Period;

/// Conditions that make a run impossible to start. Infeasibility and rule
/// violations are reported as data, never through this type.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SolverError {
    #[error("school configuration has no teaching days")]
    NoTeachingDays,
    #[error("school configuration has zero periods per day")]
    NoPeriods,
    #[error("none of the {periods_per_day} periods per day is a class period")]
    NoTeachingPeriods { periods_per_day: u32 },
    #[error("duplicate {entity} id {id}")]
    DuplicateId { entity: &'static str, id: u32 },
    #[error("availability window for teacher {teacher_id} is inverted ({start} > {end})")]
    InvertedAvailability {
        teacher_id: u32,
        start: Period,
        end: Period,
    },
    #[error("quality weights must be finite and non-negative")]
    InvalidWeights,
    #[error("server on {addr} failed: {message}")]
    Server { addr: String, message: String },
}
