mod engine;
mod error;
mod matrix;
mod types;

pub use engine::{elapsed_service, real_value, run_projection};
pub use error::ProjectError;
pub use matrix::{MAX_INDEX, MAX_LEVEL, PayMatrix};
pub use types::{
    BenefitScheme, BenefitYear, EventRecord, IncrementMonth, Inputs, Projection, Promotion,
    RealValues, ServiceLength, YearSnapshot,
};
