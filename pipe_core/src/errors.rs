//! # Error Types
//!
//! Structured error types for pipe_core. These errors are designed to be
//! informative for both humans and LLMs, providing enough context to
//! understand and fix issues programmatically.
//!
//! Errors are only raised on the scalar path. When a calculation runs over an
//! array of load cases, a failing case becomes `NaN` in the output and the
//! rest of the batch is still evaluated (see [`crate::quantity::Quantity`]).
//!
//! ## Example
//!
//! ```rust
//! use pipe_core::errors::{CalcError, CalcResult};
//!
//! fn validate_wall(wt_m: f64) -> CalcResult<()> {
//!     if wt_m <= 0.0 {
//!         return Err(CalcError::invalid_input(
//!             "wt",
//!             wt_m.to_string(),
//!             "Wall thickness must be positive",
//!         ));
//!     }
//!     Ok(())
//! }
//!
//! assert!(validate_wall(-0.01).is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for pipe_core operations
pub type CalcResult<T> = Result<T, CalcError>;

/// Structured error type for calculation operations.
///
/// Each variant provides specific context about what went wrong,
/// enabling programmatic error handling by LLMs and other consumers.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum CalcError {
    /// An input value is invalid (out of range, geometrically impossible, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// A required field is missing
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// Fewer than two of outer diameter, inner diameter and wall thickness were given
    #[error("Insufficient pipe dimensions: need two of d_o, d_i, wt (given: {provided:?})")]
    InsufficientDimensions { provided: Vec<String> },

    /// All three radial dimensions were given and they disagree
    #[error("Inconsistent pipe dimensions: d_o={d_o}, d_i={d_i}, wt={wt} (d_o - d_i - 2*wt = {mismatch:e})")]
    DimensionInconsistency {
        d_o: f64,
        d_i: f64,
        wt: f64,
        mismatch: f64,
    },

    /// Neither a derating value nor a (temperature, material) pair was supplied
    #[error("Unresolved material strength: {reason}")]
    UnresolvedMaterial { reason: String },

    /// Material family name not recognised
    #[error("Material not found: {material_name}")]
    MaterialNotFound { material_name: String },

    /// Characteristic collapse pressure could not be solved
    #[error("Collapse pressure solve failed ({method}): {reason}")]
    CollapseSolve { method: String, reason: String },

    /// Array inputs of different lengths that cannot be broadcast together
    #[error("Shape mismatch for '{field}': expected {expected} cases, found {found}")]
    ShapeMismatch {
        field: String,
        expected: usize,
        found: usize,
    },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },
}

impl CalcError {
    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a MissingField error
    pub fn missing_field(field: impl Into<String>) -> Self {
        CalcError::MissingField {
            field: field.into(),
        }
    }

    /// Create a MaterialNotFound error
    pub fn material_not_found(material_name: impl Into<String>) -> Self {
        CalcError::MaterialNotFound {
            material_name: material_name.into(),
        }
    }

    /// Create an UnresolvedMaterial error
    pub fn unresolved_material(reason: impl Into<String>) -> Self {
        CalcError::UnresolvedMaterial {
            reason: reason.into(),
        }
    }

    /// Create a CollapseSolve error
    pub fn collapse_solve(method: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::CollapseSolve {
            method: method.into(),
            reason: reason.into(),
        }
    }

    /// Create a ShapeMismatch error
    pub fn shape_mismatch(field: impl Into<String>, expected: usize, found: usize) -> Self {
        CalcError::ShapeMismatch {
            field: field.into(),
            expected,
            found,
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Check if the error is tied to a single load case.
    ///
    /// Case-local errors are converted to `NaN` when evaluating arrays;
    /// structural errors (missing inputs, shape mismatches) always propagate.
    pub fn is_case_local(&self) -> bool {
        matches!(
            self,
            CalcError::InvalidInput { .. }
                | CalcError::DimensionInconsistency { .. }
                | CalcError::CollapseSolve { .. }
        )
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            CalcError::InvalidInput { .. } => "INVALID_INPUT",
            CalcError::MissingField { .. } => "MISSING_FIELD",
            CalcError::InsufficientDimensions { .. } => "INSUFFICIENT_DIMENSIONS",
            CalcError::DimensionInconsistency { .. } => "DIMENSION_INCONSISTENCY",
            CalcError::UnresolvedMaterial { .. } => "UNRESOLVED_MATERIAL",
            CalcError::MaterialNotFound { .. } => "MATERIAL_NOT_FOUND",
            CalcError::CollapseSolve { .. } => "COLLAPSE_SOLVE",
            CalcError::ShapeMismatch { .. } => "SHAPE_MISMATCH",
            CalcError::FileError { .. } => "FILE_ERROR",
            CalcError::SerializationError { .. } => "SERIALIZATION_ERROR",
        }
    }
}

impl From<serde_json::Error> for CalcError {
    fn from(err: serde_json::Error) -> Self {
        CalcError::SerializationError {
            reason: err.to_string(),
        }
    }
}
