use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProjectError {
    #[error("retirement date must be after the date of joining")]
    RetirementBeforeJoining,

    #[error("retirement date must be in the future")]
    RetirementNotInFuture,

    #[error("promotion dated {date} must be in the future")]
    PromotionNotInFuture { date: NaiveDate },
}
