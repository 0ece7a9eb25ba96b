use std::fmt::{self, Display};

/// Errors produced when parsing wire vocabulary from user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    UnknownDateSelector(String),
    UnknownSearchField(String),
    UnknownTaskAction(String),
    InvalidDate(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::UnknownDateSelector(raw) => {
                write!(f, "unknown date selector '{raw}'")
            }
            ModelError::UnknownSearchField(raw) => {
                write!(f, "unknown search field '{raw}'")
            }
            ModelError::UnknownTaskAction(raw) => {
                write!(f, "unknown task action '{raw}'")
            }
            ModelError::InvalidDate(raw) => {
                write!(f, "invalid date '{raw}', expected YYYY-MM-DD")
            }
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
