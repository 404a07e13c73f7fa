use std::fmt;

use crate::pattern::PatternError;

/// Errors raised by the query-comparison engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogicError {
    /// Two truth tables with different vocabularies were compared. Both
    /// tables must come from the same `generate_truthtable` call.
    VocabularyMismatch,
    /// A recursive literal's sub-pattern text failed to parse during
    /// normalization.
    BadRecursivePattern(PatternError),
}

impl fmt::Display for LogicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VocabularyMismatch => {
                write!(f, "truth tables have different property vocabularies")
            }
            Self::BadRecursivePattern(e) => {
                write!(f, "recursive sub-pattern failed to parse: {e}")
            }
        }
    }
}

impl std::error::Error for LogicError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::BadRecursivePattern(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PatternError> for LogicError {
    fn from(e: PatternError) -> Self {
        Self::BadRecursivePattern(e)
    }
}
