use thiserror::Error;

pub type Result<T> = std::result::Result<T, EstimateError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimateError {
    /// A demand record failed validation; names the offending course.
    #[error("invalid input for course {course_id}: {reason}")]
    InvalidInput { course_id: String, reason: String },
}

impl EstimateError {
    pub fn invalid(course_id: &str, reason: impl Into<String>) -> Self {
        EstimateError::InvalidInput {
            course_id: course_id.to_string(),
            reason: reason.into(),
        }
    }

    pub fn course_id(&self) -> &str {
        match self {
            EstimateError::InvalidInput { course_id, .. } => course_id,
        }
    }
}
