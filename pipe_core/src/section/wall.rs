//! Characteristic wall thicknesses (DNV-ST-F101 Table 5-5).
//!
//! - `t₁` is used where failure is driven by a low-capacity point
//!   (burst, collapse). It deducts the fabrication tolerance.
//! - `t₂` is used where failure is driven by average capacity
//!   (propagation buckling).
//!
//! Before operation (system pressure test) no corrosion or erosion has
//! occurred yet, so those allowances are not deducted.

use serde::{Deserialize, Serialize};

use crate::errors::CalcResult;
use crate::quantity::Quantity;

/// Life phase the wall thickness applies to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesignPhase {
    /// In service: corrosion and erosion allowances deducted
    #[default]
    Operation,
    /// System pressure test and installation
    PreOperation,
}

impl DesignPhase {
    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            DesignPhase::Operation => "Operation",
            DesignPhase::PreOperation => "Pre-operation",
        }
    }
}

/// Characteristic wall thicknesses for one phase (m)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallThickness {
    /// t₁, burst and collapse thickness
    pub t_1: Quantity,
    /// t₂, propagation buckling thickness
    pub t_2: Quantity,
}

/// Characteristic wall thicknesses t₁ and t₂.
///
/// | Phase         | t₁                              | t₂                     |
/// |---------------|---------------------------------|------------------------|
/// | Operation     | t_nom − t_fab − t_corr − t_ero  | t_nom − t_corr − t_ero |
/// | Pre-operation | t_nom − t_fab                   | t_nom                  |
///
/// # Example
///
/// ```rust
/// use pipe_core::quantity::Quantity;
/// use pipe_core::section::{characteristic_wall_thickness, DesignPhase};
///
/// let wt = characteristic_wall_thickness(
///     &Quantity::from(0.0212),
///     &Quantity::from(0.001),
///     &Quantity::from(0.0005),
///     &Quantity::from(0.0),
///     DesignPhase::Operation,
/// );
/// assert!((wt.t_1.get(0) - 0.0197).abs() < 1e-12);
/// assert!((wt.t_2.get(0) - 0.0207).abs() < 1e-12);
/// ```
pub fn characteristic_wall_thickness(
    t_nom: &Quantity,
    t_fab: &Quantity,
    t_corr: &Quantity,
    t_ero: &Quantity,
    phase: DesignPhase,
) -> WallThickness {
    match phase {
        DesignPhase::Operation => {
            let t_2 = t_nom - t_corr - t_ero;
            WallThickness {
                t_1: &t_2 - t_fab,
                t_2,
            }
        }
        DesignPhase::PreOperation => WallThickness {
            t_1: t_nom - t_fab,
            t_2: t_nom.clone(),
        },
    }
}

/// Minimum wall thickness for the mill pressure test, t_min = t_nom − t_fab
pub fn mill_test_thickness(t_nom: &Quantity, t_fab: &Quantity) -> Quantity {
    t_nom - t_fab
}

/// Require a positive wall after the allowances are deducted.
///
/// A scalar thickness at or below zero is an error; array cases become `NaN`.
pub fn remaining_wall(thickness: &Quantity, field: &str) -> CalcResult<Quantity> {
    thickness.require(field, "Allowances leave no wall thickness", |v| v > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_operation_ignores_corrosion() {
        let wt = characteristic_wall_thickness(
            &Quantity::from(0.0212),
            &Quantity::from(0.001),
            &Quantity::from(0.003),
            &Quantity::from(0.0005),
            DesignPhase::PreOperation,
        );
        assert!((wt.t_1.get(0) - 0.0202).abs() < 1e-12);
        assert!((wt.t_2.get(0) - 0.0212).abs() < 1e-12);
    }

    #[test]
    fn test_operation_array() {
        let wt = characteristic_wall_thickness(
            &Quantity::from(vec![0.0212, 0.025]),
            &Quantity::from(0.001),
            &Quantity::from(0.003),
            &Quantity::from(0.0),
            DesignPhase::Operation,
        );
        assert!((wt.t_1.get(1) - 0.021).abs() < 1e-12);
        assert!((wt.t_2.get(0) - 0.0182).abs() < 1e-12);
    }

    #[test]
    fn test_mill_test_thickness() {
        let t_min = mill_test_thickness(&Quantity::from(0.0212), &Quantity::from(0.001));
        assert!((t_min.get(0) - 0.0202).abs() < 1e-12);
    }

    #[test]
    fn test_remaining_wall() {
        let t_1 = Quantity::from(vec![0.0197, -0.0048]);
        let checked = remaining_wall(&t_1, "t_1").unwrap();
        assert_eq!(checked.get(0), 0.0197);
        assert!(checked.get(1).is_nan());

        let err = remaining_wall(&Quantity::from(0.0), "t_1").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_phase_serialization() {
        assert_eq!(serde_json::to_string(&DesignPhase::PreOperation).unwrap(), "\"pre_operation\"");
    }
}
