//! Error taxonomy shared by every pipeline stage.
//!
//! Resolution and consolidation errors abort the whole batch. A failing
//! validation is not an error of the validator itself: it is returned as a
//! report and only turned into [`Error::ValidationFailure`] by callers that
//! decide a failing report is fatal.

use thiserror::Error;

use crate::cache::CacheError;
use crate::core::region::Locus;

/// Coarse error category, stable across releases and used for exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// I/O or unexpected internal failure
    Internal,
    /// Malformed user input (coordinates, pipe records, BED lines)
    InvalidInput,
    /// Validation completed but found discrepancies
    ValidationFailed,
    /// An identifier could not be turned into regions
    Resolution,
    /// The same named region resolved to two places
    Conflict,
    /// The formatting policy cannot be honoured
    Policy,
    /// A collaborator service failed after retries
    ExternalService,
}

impl ErrorCategory {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Internal => 1,
            Self::InvalidInput => 2,
            Self::ValidationFailed => 3,
            Self::Resolution => 4,
            Self::Conflict => 5,
            Self::Policy => 6,
            Self::ExternalService => 7,
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unresolved identifier '{identifier}': {reason}")]
    UnresolvedIdentifier { identifier: String, reason: String },

    #[error(
        "Ambiguous identifier '{identifier}': {} equally valid candidates ({}); specify one explicitly",
        candidates.len(),
        candidates.join(", ")
    )]
    AmbiguousIdentifier {
        identifier: String,
        candidates: Vec<String>,
    },

    #[error("Unknown gene '{gene}': no transcripts found")]
    UnknownGene { gene: String },

    #[error("Invalid coordinate for region '{region_id}': {reason}")]
    InvalidCoordinate { region_id: String, reason: String },

    #[error("Conflicting coordinates for region '{region_id}': {first} vs {second}")]
    Conflict {
        region_id: String,
        first: Locus,
        second: Locus,
    },

    #[error("Unsupported formatting policy '{policy_id}': {reason}")]
    UnsupportedPolicy { policy_id: String, reason: String },

    #[error(
        "Validation failed: {missing} missing, {extra} extra, {mismatched} mismatched region(s)"
    )]
    ValidationFailure {
        missing: usize,
        extra: usize,
        mismatched: usize,
    },

    #[error("External service '{service}' failed: {message}")]
    ExternalService { service: String, message: String },

    #[error("Malformed BED line {line}: {reason}")]
    MalformedBed { line: usize, reason: String },

    #[error("Invalid pipe input: {0}")]
    Pipe(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnresolvedIdentifier { .. }
            | Self::AmbiguousIdentifier { .. }
            | Self::UnknownGene { .. } => ErrorCategory::Resolution,
            Self::InvalidCoordinate { .. }
            | Self::MalformedBed { .. }
            | Self::Pipe(_)
            | Self::InvalidInput(_)
            | Self::Json(_) => ErrorCategory::InvalidInput,
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::UnsupportedPolicy { .. } => ErrorCategory::Policy,
            Self::ValidationFailure { .. } => ErrorCategory::ValidationFailed,
            Self::ExternalService { .. } => ErrorCategory::ExternalService,
            Self::Cache(_) | Self::Io(_) => ErrorCategory::Internal,
        }
    }

    pub(crate) fn unresolved(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnresolvedIdentifier {
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
