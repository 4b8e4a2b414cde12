//! Error types for bibliography reading and record validation

use thiserror::Error;

/// Why a raw bibliography record was rejected by the normalizer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The record is not a JSON object
    #[error("record is not an object")]
    NotAnObject,

    /// The record has no field list (absent or null)
    #[error("record has no field list")]
    MissingFields,

    /// The record's field list is present but is not an array
    #[error("record field list is not an array (found {0})")]
    FieldsNotAList(&'static str),
}

/// Syntax failure while reading `.bib` text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("bibliography syntax error on line {line}: {message}")]
pub struct SyntaxError {
    /// 1-based line number where the problem was detected
    pub line: usize,
    pub message: String,
}

impl SyntaxError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// A tag that names none of the six entity types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown entity type: '{0}'")]
pub struct UnknownEntityType(pub String);
