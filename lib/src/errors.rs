// Error types surfaced by the library. Everything else travels as anyhow::Error.

use std::fmt;

/// Rejected input: raised before a single triple is emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    MissingField(&'static str),
    InvalidIri { field: String, value: String },
    MissingCodelist { variable: String },
    MissingValues { variable: String },
    DuplicateVariable(String),
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InputError::MissingField(field) => write!(f, "Missing required field '{}'", field),
            InputError::InvalidIri { field, value } => {
                write!(f, "Field '{}' is not a valid absolute IRI: '{}'", field, value)
            }
            InputError::MissingCodelist { variable } => {
                write!(f, "Coded variable '{}' has no codelist", variable)
            }
            InputError::MissingValues { variable } => {
                write!(f, "Variable '{}' has no values", variable)
            }
            InputError::DuplicateVariable(id) => write!(f, "Duplicate variable id '{}'", id),
        }
    }
}

impl std::error::Error for InputError {}

/// A request to a remote SPARQL service failed or was refused.
#[derive(Debug)]
pub struct TransportError {
    pub url: String,
    pub status: Option<u16>,
    pub message: String,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.status {
            Some(status) => write!(
                f,
                "Request to {} failed with status {}: {}",
                self.url, status, self.message
            ),
            None => write!(f, "Request to {} failed: {}", self.url, self.message),
        }
    }
}

impl std::error::Error for TransportError {}
