//! Unified error types for model construction
//!
//! [`RestoreError`] is the single error type crossing crate boundaries.
//! Configuration errors carry the entity, parameter and (where relevant)
//! flow and year so a modeler can go straight to the offending cell.
//!
//! Note that an *unconfigured optional* parameter is not an error: getters
//! return `None` and constraint generators return
//! `Outcome::Skip`. Only values that must exist, or that exist but are
//! impossible, surface here.
//!
//! # Example
//!
//! ```ignore
//! use restore_core::{RestoreError, RestoreResult};
//!
//! fn initial_capacity(store: &ConfigStore, entity: &str) -> RestoreResult<f64> {
//!     store.get_annual(entity, "actual_capacity", 2020)
//! }
//! ```

use std::fmt;

use thiserror::Error;

use crate::ids::Year;

/// Unified error type for all restore operations.
#[derive(Error, Debug)]
pub enum RestoreError {
    /// A required lookup found no entry, or an empty cell.
    #[error("missing required value: {}", Location::new(.entity, .parameter, .flow, .year))]
    MissingRequiredValue {
        entity: String,
        parameter: String,
        flow: Option<String>,
        year: Option<Year>,
    },

    /// A value resolved but is semantically impossible.
    #[error("invalid configuration for '{entity}' ({parameter}): {reason}")]
    InvalidConfiguration {
        entity: String,
        parameter: String,
        reason: String,
    },

    /// The clustered demand shape sums to zero and cannot be rescaled.
    #[error("degenerate clustering: {0}")]
    ClusteringDegenerate(String),

    /// I/O errors (file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Solver hand-off errors
    #[error("Solver error: {0}")]
    Solver(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

impl RestoreError {
    pub fn missing(entity: impl Into<String>, parameter: impl Into<String>) -> Self {
        RestoreError::MissingRequiredValue {
            entity: entity.into(),
            parameter: parameter.into(),
            flow: None,
            year: None,
        }
    }

    pub fn missing_annual(entity: impl Into<String>, parameter: impl Into<String>, year: Year) -> Self {
        RestoreError::MissingRequiredValue {
            entity: entity.into(),
            parameter: parameter.into(),
            flow: None,
            year: Some(year),
        }
    }

    pub fn missing_fxe(
        entity: impl Into<String>,
        parameter: impl Into<String>,
        flow: impl Into<String>,
        year: Option<Year>,
    ) -> Self {
        RestoreError::MissingRequiredValue {
            entity: entity.into(),
            parameter: parameter.into(),
            flow: Some(flow.into()),
            year,
        }
    }

    pub fn invalid(
        entity: impl Into<String>,
        parameter: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        RestoreError::InvalidConfiguration {
            entity: entity.into(),
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by the input tables rather than the runtime.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            RestoreError::MissingRequiredValue { .. } | RestoreError::InvalidConfiguration { .. }
        )
    }
}

/// Display helper for the `(entity, parameter[, flow][, year])` tuple.
struct Location<'a> {
    entity: &'a str,
    parameter: &'a str,
    flow: Option<&'a str>,
    year: Option<Year>,
}

impl<'a> Location<'a> {
    fn new(
        entity: &'a str,
        parameter: &'a str,
        flow: &'a Option<String>,
        year: &'a Option<Year>,
    ) -> Self {
        Self {
            entity,
            parameter,
            flow: flow.as_deref(),
            year: *year,
        }
    }
}

impl fmt::Display for Location<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity '{}', parameter '{}'", self.entity, self.parameter)?;
        if let Some(flow) = self.flow {
            write!(f, ", flow '{}'", flow)?;
        }
        if let Some(year) = self.year {
            write!(f, ", year {}", year)?;
        }
        Ok(())
    }
}

/// Convenience type alias for Results using RestoreError.
pub type RestoreResult<T> = Result<T, RestoreError>;

// Conversion from anyhow::Error
impl From<anyhow::Error> for RestoreError {
    fn from(err: anyhow::Error) -> Self {
        RestoreError::Other(err.to_string())
    }
}

impl From<String> for RestoreError {
    fn from(s: String) -> Self {
        RestoreError::Other(s)
    }
}

impl From<&str> for RestoreError {
    fn from(s: &str) -> Self {
        RestoreError::Other(s.to_string())
    }
}
