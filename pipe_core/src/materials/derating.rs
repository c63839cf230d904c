//! Temperature derating of steel strength (DNV-ST-F101 Fig. 5-2).
//!
//! Derating is the reduction of SMYS/SMTS at elevated design temperature.
//! Curves are piecewise linear and held constant beyond their end points.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};
use crate::quantity::Quantity;

/// Steel family for the built-in derating curves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialFamily {
    /// Carbon-manganese steel
    #[serde(rename = "CMn", alias = "C-Mn", alias = "CMN")]
    CarbonManganese,
    /// 13% chromium martensitic steel
    #[serde(rename = "13Cr", alias = "13CR")]
    Chrome13,
    /// 22% chromium duplex stainless steel
    #[serde(rename = "22Cr", alias = "22CR", alias = "DSS")]
    Duplex22Cr,
    /// 25% chromium super duplex stainless steel
    #[serde(rename = "25Cr", alias = "25CR")]
    SuperDuplex25Cr,
}

impl MaterialFamily {
    /// All material families
    pub const ALL: [MaterialFamily; 4] = [
        MaterialFamily::CarbonManganese,
        MaterialFamily::Chrome13,
        MaterialFamily::Duplex22Cr,
        MaterialFamily::SuperDuplex25Cr,
    ];

    /// Parse ignoring case, spaces and hyphens ("C-Mn", "cmn", "22 Cr", "DSS")
    pub fn from_str_flexible(s: &str) -> CalcResult<Self> {
        match s.to_uppercase().replace([' ', '-', '_'], "").as_str() {
            "CMN" | "CARBONMANGANESE" => Ok(MaterialFamily::CarbonManganese),
            "13CR" => Ok(MaterialFamily::Chrome13),
            "22CR" | "DSS" | "DUPLEX" => Ok(MaterialFamily::Duplex22Cr),
            "25CR" | "SDSS" | "SUPERDUPLEX" => Ok(MaterialFamily::SuperDuplex25Cr),
            _ => Err(CalcError::material_not_found(s)),
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            MaterialFamily::CarbonManganese => "C-Mn",
            MaterialFamily::Chrome13 => "13Cr",
            MaterialFamily::Duplex22Cr => "22Cr",
            MaterialFamily::SuperDuplex25Cr => "25Cr",
        }
    }

    /// Built-in derating curve (temperature °C, derating Pa)
    pub fn derating_curve(&self) -> DeratingCurve {
        match self {
            MaterialFamily::CarbonManganese | MaterialFamily::Chrome13 => {
                DeratingCurve::from_points(vec![(50.0, 0.0), (100.0, 30.0e6), (200.0, 70.0e6)])
            }
            MaterialFamily::Duplex22Cr | MaterialFamily::SuperDuplex25Cr => DeratingCurve::from_points(vec![
                (20.0, 0.0),
                (50.0, 40.0e6),
                (100.0, 90.0e6),
                (150.0, 120.0e6),
                (200.0, 140.0e6),
            ]),
        }
    }
}

impl fmt::Display for MaterialFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Piecewise-linear derating curve.
///
/// ## JSON Example
///
/// ```json
/// [[40.0, 0.0], [100.0, 50.0e6], [200.0, 100.0e6]]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeratingCurve {
    points: Vec<(f64, f64)>,
}

impl DeratingCurve {
    fn from_points(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }

    /// Create a curve from (temperature, derating) points.
    ///
    /// Points must be non-empty with strictly increasing temperatures.
    pub fn new(points: Vec<(f64, f64)>) -> CalcResult<Self> {
        let curve = Self { points };
        curve.validate()?;
        Ok(curve)
    }

    /// Check the point list is usable for interpolation
    pub fn validate(&self) -> CalcResult<()> {
        if self.points.is_empty() {
            return Err(CalcError::invalid_input(
                "derating_curve",
                "[]",
                "Derating curve needs at least one point",
            ));
        }
        if self.points.windows(2).any(|w| w[1].0 <= w[0].0) {
            return Err(CalcError::invalid_input(
                "derating_curve",
                format!("{:?}", self.points),
                "Curve temperatures must be strictly increasing",
            ));
        }
        Ok(())
    }

    /// The (temperature, derating) points
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Derating at one temperature, clamped to the end values outside the curve.
    ///
    /// # Example
    ///
    /// ```rust
    /// use pipe_core::materials::MaterialFamily;
    ///
    /// let curve = MaterialFamily::CarbonManganese.derating_curve();
    /// assert_eq!(curve.interpolate(20.0), 0.0);
    /// assert!((curve.interpolate(60.0) - 6.0e6).abs() < 1e-6);
    /// assert_eq!(curve.interpolate(250.0), 70.0e6);
    /// ```
    pub fn interpolate(&self, temperature: f64) -> f64 {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return f64::NAN,
        };
        if temperature.is_nan() {
            return f64::NAN;
        }
        if temperature <= first.0 {
            return first.1;
        }
        if temperature >= last.0 {
            return last.1;
        }
        self.points
            .windows(2)
            .find(|w| temperature <= w[1].0)
            .map(|w| {
                let (t0, d0) = w[0];
                let (t1, d1) = w[1];
                d0 + (d1 - d0) * (temperature - t0) / (t1 - t0)
            })
            .unwrap_or(last.1)
    }

    /// Elementwise derating for a temperature quantity
    pub fn at(&self, temperature: &Quantity) -> Quantity {
        temperature.map(|t| self.interpolate(t))
    }
}

/// Resolve a strength derating value.
///
/// Precedence: explicit value, then temperature with a custom curve, then
/// temperature with a material family.
///
/// # Errors
///
/// - [`CalcError::UnresolvedMaterial`] if neither a value nor a temperature
///   with a curve or family is given
/// - [`CalcError::MaterialNotFound`] for an unknown family name
pub fn resolve_derating(
    value: Option<&Quantity>,
    temperature: Option<&Quantity>,
    material: Option<&str>,
    curve: Option<&DeratingCurve>,
) -> CalcResult<Quantity> {
    if let Some(value) = value {
        return Ok(value.clone());
    }
    let temperature = temperature.ok_or_else(|| {
        CalcError::unresolved_material("give a derating value or a design temperature")
    })?;
    if let Some(curve) = curve {
        curve.validate()?;
        return Ok(curve.at(temperature));
    }
    match material {
        Some(name) => {
            let family = MaterialFamily::from_str_flexible(name)?;
            log::debug!("derating {} at {} °C", family, temperature);
            Ok(family.derating_curve().at(temperature))
        }
        None => Err(CalcError::unresolved_material(
            "a design temperature needs a material family or a derating curve",
        )),
    }
}
