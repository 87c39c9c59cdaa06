use thiserror::Error;

pub type Result<T> = std::result::Result<T, CascataError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CascataError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("style error: {0}")]
    Style(#[from] StyleError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("invalid CSS at line {line}, column {column}: {message}")]
    InvalidCss {
        message: String,
        line: u32,
        column: u32,
    },

    #[error("invalid selector: {selector}")]
    InvalidSelector { selector: String },

    #[error("invalid value for property '{property}': {value}")]
    InvalidValue { property: String, value: String },

    #[error("legacy syntax '{marker}' for property '{property}'")]
    LegacySyntax { property: String, marker: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StyleError {
    #[error("circular reference through custom property '{property}'")]
    CircularReference { property: String },

    #[error("cannot convert {got} to {wanted}")]
    UnitMismatch { wanted: String, got: String },

    #[error("attr() read of '{attribute}' is not allowed here")]
    DisallowedAttribute { attribute: String },

    #[error("cannot compute value for property '{property}': {reason}")]
    CannotComputeValue { property: String, reason: String },
}

/// Severity attached to an accumulated issue. Errors mean the declaration was
/// dropped or fell back; warnings mean non-standard input was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// One recorded problem, kept by the resolution context rather than thrown.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub property: String,
    pub error: CascataError,
    pub severity: Severity,
}

impl Issue {
    pub fn error(property: impl Into<String>, error: impl Into<CascataError>) -> Self {
        Self {
            property: property.into(),
            error: error.into(),
            severity: Severity::Error,
        }
    }

    pub fn warning(property: impl Into<String>, error: impl Into<CascataError>) -> Self {
        Self {
            property: property.into(),
            error: error.into(),
            severity: Severity::Warning,
        }
    }
}
