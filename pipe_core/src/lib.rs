//! # pipe_core - Subsea Pipeline Design Calculation Engine
//!
//! `pipe_core` computes cross-section properties and DNV-ST-F101 limit-state
//! checks for subsea pipelines: pressure containment, collapse and
//! propagation buckling, plus composite coated/lined section weights. All
//! inputs and outputs are JSON-serializable.
//!
//! ## Design Philosophy
//!
//! - **Stateless**: Pure functions that take input and return results
//! - **Batch-aware**: Every numeric value is a [`Quantity`], one value or one per load case
//! - **JSON-First**: All types implement Serialize/Deserialize
//! - **Rich Errors**: Structured error types, not just strings
//!
//! ## Quick Start
//!
//! ```rust
//! use pipe_core::calculations::CalculationItem;
//!
//! let json = r#"{
//!     "type": "Collapse",
//!     "label": "KP 12.4",
//!     "d_o": 0.6176,
//!     "t_nom": 0.0212,
//!     "t_fab": 0.001,
//!     "t_corr": 0.0005,
//!     "material": { "smys": 450.0e6, "temperature": 60.0, "family": "CMn" },
//!     "h_l": [-340.0, -800.0]
//! }"#;
//!
//! let item: CalculationItem = serde_json::from_str(json).unwrap();
//! let output = item.calculate().unwrap();
//! assert!(output.passes());
//! ```
//!
//! ## Modules
//!
//! - [`calculations`] - Code checks and the weight calculation (`*Input` → `*Result`)
//! - [`equations`] - DNV-ST-F101 formulas over quantities
//! - [`section`] - Pipe dimensions, characteristic wall thicknesses, layer stacks
//! - [`materials`] - Line pipe steel and temperature derating
//! - [`factors`] - Safety and resistance factor tables
//! - [`quantity`] - Scalar/array numeric values with broadcasting
//! - [`errors`] - Structured error types
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade: factor range warnings, array
//! cases replaced by `NaN`, and formula validity ranges at `warn`; solver
//! iterations at `debug`. Install any logger to see them.

pub mod calculations;
pub mod equations;
pub mod errors;
pub mod factors;
pub mod materials;
pub mod quantity;
pub mod section;

// Re-export commonly used types at crate root for convenience
pub use calculations::{CalculationItem, CalculationOutput, UnityConvention};
pub use errors::{CalcError, CalcResult};
pub use factors::{CodeFactorTables, FactorRangeWarning, FactorSpec};
pub use materials::PipeMaterial;
pub use quantity::Quantity;
pub use section::{PipeDimensions, PipeSection};
