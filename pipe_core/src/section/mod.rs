//! # Pipe Cross-Section
//!
//! Radial geometry of a circular pipe wall: outer diameter, inner diameter
//! and wall thickness. Any two of the three determine the third.
//!
//! ## Submodules
//!
//! - [`wall`] - Characteristic wall thicknesses (t₁, t₂, t_min) per DNV-ST-F101
//! - [`layers`] - Multi-layer composite sections (coatings, claddings, liners)
//!
//! ## Example
//!
//! ```rust
//! use pipe_core::quantity::Quantity;
//! use pipe_core::section::resolve_dimensions;
//!
//! let d_o = Quantity::from(0.660);
//! let wt = Quantity::from(0.0214);
//!
//! let section = resolve_dimensions(Some(&d_o), None, Some(&wt)).unwrap();
//! assert!((section.d_i.get(0) - 0.6172).abs() < 1e-12);
//! ```

pub mod layers;
pub mod wall;

pub use layers::{aggregate_layers, CompositeSection, Layer, LayerSeed, ReferenceDiameter};
pub use wall::{characteristic_wall_thickness, mill_test_thickness, remaining_wall, DesignPhase, WallThickness};

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};
use crate::quantity::Quantity;

/// Relative tolerance on `d_o - d_i - 2·wt`, as a fraction of `d_o`
pub const DIMENSION_REL_TOL: f64 = 1e-9;

/// Absolute floor on the dimension consistency tolerance (m)
pub const DIMENSION_ABS_TOL: f64 = 1e-12;

/// Area of an annulus between two diameters: π/4·(outer² − inner²)
pub fn annulus_area(outer: &Quantity, inner: &Quantity) -> Quantity {
    (outer.powi(2) - inner.powi(2)) * (PI / 4.0)
}

/// Resolved pipe wall geometry.
///
/// All values in metres. Satisfies `d_o == d_i + 2·wt` within
/// [`DIMENSION_REL_TOL`].
///
/// ## JSON Example
///
/// ```json
/// { "d_o": 0.660, "d_i": 0.6172, "wt": 0.0214 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipeSection {
    /// Outer diameter (m)
    pub d_o: Quantity,
    /// Inner diameter (m)
    pub d_i: Quantity,
    /// Wall thickness (m)
    pub wt: Quantity,
}

impl PipeSection {
    /// Cross-sectional steel area π/4·(d_o² − d_i²) in m²
    pub fn area(&self) -> Quantity {
        annulus_area(&self.d_o, &self.d_i)
    }

    /// Second moment of area π/64·(d_o⁴ − d_i⁴) in m⁴
    pub fn second_moment(&self) -> Quantity {
        (self.d_o.powi(4) - self.d_i.powi(4)) * (PI / 64.0)
    }

    /// Mass per unit length (kg/m) for a wall density in kg/m³
    pub fn mass_per_length(&self, density: &Quantity) -> Quantity {
        self.area() * density
    }

    /// Outer diameter to wall thickness ratio
    pub fn d_over_t(&self) -> Quantity {
        &self.d_o / &self.wt
    }
}

/// Partially specified pipe dimensions, as supplied by callers.
///
/// At least two of the three fields must be present.
///
/// ## JSON Example
///
/// ```json
/// { "d_o": 0.660, "wt": 0.0214 }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipeDimensions {
    /// Outer diameter (m)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d_o: Option<Quantity>,
    /// Inner diameter (m)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d_i: Option<Quantity>,
    /// Wall thickness (m)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wt: Option<Quantity>,
}

impl PipeDimensions {
    /// Resolve into a complete [`PipeSection`]
    pub fn resolve(&self) -> CalcResult<PipeSection> {
        resolve_dimensions(self.d_o.as_ref(), self.d_i.as_ref(), self.wt.as_ref())
    }
}

/// Resolve outer diameter, inner diameter and wall thickness from any two.
///
/// # Formulas
///
/// - `wt = (d_o − d_i)/2`
/// - `d_i = d_o − 2·wt`
/// - `d_o = d_i + 2·wt`
///
/// When all three are given they are checked for consistency. On the scalar
/// path a mismatch returns [`CalcError::DimensionInconsistency`]; on the array
/// path the inconsistent case becomes `NaN` in all three outputs.
///
/// # Errors
///
/// - [`CalcError::InsufficientDimensions`] if fewer than two are given
/// - [`CalcError::ShapeMismatch`] if array lengths disagree
/// - [`CalcError::DimensionInconsistency`] (scalar path only)
pub fn resolve_dimensions(
    d_o: Option<&Quantity>,
    d_i: Option<&Quantity>,
    wt: Option<&Quantity>,
) -> CalcResult<PipeSection> {
    match (d_o, d_i, wt) {
        (Some(d_o), Some(d_i), Some(wt)) => {
            let len = Quantity::broadcast_len(&[("d_o", d_o), ("d_i", d_i), ("wt", wt)])?;
            let checked = Quantity::try_from_cases(len, "resolve_dimensions", |i| {
                check_consistency(d_o.get(i), d_i.get(i), wt.get(i))
            })?;
            Ok(PipeSection {
                d_o: checked.clone(),
                d_i: d_i.masked_by(&checked),
                wt: wt.masked_by(&checked),
            })
        }
        (Some(d_o), Some(d_i), None) => {
            Quantity::broadcast_len(&[("d_o", d_o), ("d_i", d_i)])?;
            Ok(PipeSection {
                wt: (d_o - d_i) / 2.0,
                d_o: d_o.clone(),
                d_i: d_i.clone(),
            })
        }
        (Some(d_o), None, Some(wt)) => {
            Quantity::broadcast_len(&[("d_o", d_o), ("wt", wt)])?;
            Ok(PipeSection {
                d_i: d_o - wt * 2.0,
                d_o: d_o.clone(),
                wt: wt.clone(),
            })
        }
        (None, Some(d_i), Some(wt)) => {
            Quantity::broadcast_len(&[("d_i", d_i), ("wt", wt)])?;
            Ok(PipeSection {
                d_o: d_i + wt * 2.0,
                d_i: d_i.clone(),
                wt: wt.clone(),
            })
        }
        _ => {
            let provided = [("d_o", d_o), ("d_i", d_i), ("wt", wt)]
                .iter()
                .filter(|(_, q)| q.is_some())
                .map(|(name, _)| name.to_string())
                .collect();
            Err(CalcError::InsufficientDimensions { provided })
        }
    }
}

fn check_consistency(d_o: f64, d_i: f64, wt: f64) -> CalcResult<f64> {
    let mismatch = d_o - d_i - 2.0 * wt;
    let tolerance = (DIMENSION_REL_TOL * d_o.abs()).max(DIMENSION_ABS_TOL);
    if mismatch.abs() > tolerance {
        return Err(CalcError::DimensionInconsistency {
            d_o,
            d_i,
            wt,
            mismatch,
        });
    }
    Ok(d_o)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_from_any_two() {
        let d_o = Quantity::from(0.6176);
        let d_i = Quantity::from(0.5752);
        let wt = Quantity::from(0.0212);

        let from_o_i = resolve_dimensions(Some(&d_o), Some(&d_i), None).unwrap();
        let from_o_t = resolve_dimensions(Some(&d_o), None, Some(&wt)).unwrap();
        let from_i_t = resolve_dimensions(None, Some(&d_i), Some(&wt)).unwrap();

        for section in [&from_o_i, &from_o_t, &from_i_t] {
            assert!((section.d_o.get(0) - 0.6176).abs() < 1e-12);
            assert!((section.d_i.get(0) - 0.5752).abs() < 1e-12);
            assert!((section.wt.get(0) - 0.0212).abs() < 1e-12);
        }
    }

    #[test]
    fn test_consistent_triple_accepted() {
        let section = resolve_dimensions(
            Some(&Quantity::from(0.66)),
            Some(&Quantity::from(0.62)),
            Some(&Quantity::from(0.02)),
        )
        .unwrap();
        assert_eq!(section.d_o, Quantity::Scalar(0.66));
    }

    #[test]
    fn test_inconsistent_scalar_rejected() {
        let err = resolve_dimensions(
            Some(&Quantity::from(0.66)),
            Some(&Quantity::from(0.5)),
            Some(&Quantity::from(0.05)),
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "DIMENSION_INCONSISTENCY");
    }

    #[test]
    fn test_inconsistent_array_case_is_nan() {
        let d_o = Quantity::from(vec![0.66, 0.66, 0.66]);
        let d_i = Quantity::from(vec![0.62, 0.50, 0.60]);
        let wt = Quantity::from(vec![0.02, 0.05, 0.03]);
        let section = resolve_dimensions(Some(&d_o), Some(&d_i), Some(&wt)).unwrap();

        assert!((section.wt.get(0) - 0.02).abs() < 1e-15);
        assert!(section.d_o.get(1).is_nan());
        assert!(section.d_i.get(1).is_nan());
        assert!(section.wt.get(1).is_nan());
        assert!((section.d_i.get(2) - 0.60).abs() < 1e-15);
    }

    #[test]
    fn test_insufficient_dimensions() {
        let err = resolve_dimensions(Some(&Quantity::from(0.66)), None, None).unwrap_err();
        assert_eq!(
            err,
            CalcError::InsufficientDimensions {
                provided: vec!["d_o".to_string()]
            }
        );
    }

    #[test]
    fn test_shape_mismatch() {
        let d_o = Quantity::from(vec![0.66, 0.70]);
        let wt = Quantity::from(vec![0.02, 0.02, 0.02]);
        let err = resolve_dimensions(Some(&d_o), None, Some(&wt)).unwrap_err();
        assert_eq!(err.error_code(), "SHAPE_MISMATCH");
    }

    #[test]
    fn test_section_properties() {
        let section = resolve_dimensions(Some(&Quantity::from(0.2)), Some(&Quantity::from(0.1)), None).unwrap();
        let expected_area = PI / 4.0 * (0.04 - 0.01);
        let expected_i = PI / 64.0 * (0.0016 - 0.0001);
        assert!((section.area().get(0) - expected_area).abs() < 1e-15);
        assert!((section.second_moment().get(0) - expected_i).abs() < 1e-15);
        assert!((section.mass_per_length(&Quantity::from(7850.0)).get(0) - expected_area * 7850.0).abs() < 1e-9);
        assert!((section.d_over_t().get(0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_dimensions_from_json() {
        let dims: PipeDimensions = serde_json::from_str(r#"{"d_o": 0.6176, "wt": [0.0212, 0.025]}"#).unwrap();
        let section = dims.resolve().unwrap();
        assert_eq!(section.d_i.len(), 2);
        assert!((section.d_i.get(1) - 0.5676).abs() < 1e-12);
    }
}
