use std::fmt;

use thiserror::Error;

/// Which client-supplied string failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Filter,
    Sort,
    Aggregation,
    Projection,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::Filter => write!(f, "filter"),
            InputKind::Sort => write!(f, "sort"),
            InputKind::Aggregation => write!(f, "aggregation"),
            InputKind::Projection => write!(f, "projection"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("malformed {input} input: {source}")]
    Parse {
        input: InputKind,
        #[source]
        source: serde_json::Error,
    },
    #[error("filter must contain at least one condition")]
    EmptyFilter,
    #[error("invalid condition on `{label}` ({operator}): {reason}")]
    InvalidCondition {
        label: String,
        operator: String,
        reason: String,
    },
    #[error("invalid {input} field `{field}`: {reason}")]
    InvalidField {
        input: InputKind,
        field: String,
        reason: String,
    },
    #[error("unknown filter operator: {0}")]
    UnknownOperator(String),
    #[error("unknown aggregation operation: {0}")]
    UnknownAccumulator(String),
    #[error("unknown sort direction: {0}")]
    UnknownDirection(String),
}

impl CompileError {
    pub(crate) fn parse(input: InputKind, source: serde_json::Error) -> Self {
        CompileError::Parse { input, source }
    }
}
