use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid run ID: {0}")]
    InvalidId(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// A payload rejection, annotated with the path of the offending field.
///
/// Validation is all-or-nothing: the first failure aborts the whole
/// submission, so one error describes the rejection completely.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{path}: {reason}")]
pub struct ValidationError {
    pub path: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
