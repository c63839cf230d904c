//! # Pipe Materials
//!
//! Line pipe steel properties and characteristic strengths per DNV-ST-F101.
//!
//! ## Characteristic Strength
//!
//! ```text
//! f_y = (SMYS − f_y,temp) × α_U
//! f_u = (SMTS − f_u,temp) × α_U
//! ```
//!
//! The derating `f_temp` is either given directly or read from a
//! temperature curve (see [`derating`]). When only the yield derating is
//! known it is applied to SMTS as well.
//!
//! ## Example
//!
//! ```rust
//! use pipe_core::materials::PipeMaterial;
//! use pipe_core::quantity::Quantity;
//!
//! let steel = PipeMaterial {
//!     smts: Some(Quantity::from(535.0e6)),
//!     temperature: Some(Quantity::from(60.0)),
//!     family: Some("CMn".to_string()),
//!     ..PipeMaterial::new(450.0e6)
//! };
//!
//! let f_y = steel.f_y(1.0).unwrap();
//! assert!((f_y.get(0) - 444.0e6).abs() < 1.0);
//! ```

pub mod derating;

pub use derating::{resolve_derating, DeratingCurve, MaterialFamily};

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};
use crate::quantity::Quantity;

/// Young's modulus of line pipe steel (Pa)
pub const STEEL_YOUNGS_MODULUS: f64 = 207.0e9;

/// Poisson's ratio of line pipe steel
pub const STEEL_POISSON_RATIO: f64 = 0.3;

/// Density of carbon steel (kg/m³)
pub const STEEL_DENSITY: f64 = 7850.0;

fn default_youngs_modulus() -> Quantity {
    Quantity::Scalar(STEEL_YOUNGS_MODULUS)
}

fn default_poisson_ratio() -> f64 {
    STEEL_POISSON_RATIO
}

/// Characteristic strength (base − derating)·α_U
///
/// ```rust
/// use pipe_core::materials::characteristic_strength;
/// use pipe_core::quantity::Quantity;
///
/// let f_y = characteristic_strength(&Quantity::from(450.0e6), &Quantity::from(35.0e6), 1.0);
/// assert_eq!(f_y.get(0), 415.0e6);
/// ```
pub fn characteristic_strength(base: &Quantity, derating: &Quantity, alpha_u: f64) -> Quantity {
    (base - derating) * alpha_u
}

/// Line pipe steel grade and design temperature.
///
/// ## JSON Example
///
/// ```json
/// {
///   "smys": 450.0e6,
///   "smts": 535.0e6,
///   "temperature": 60.0,
///   "family": "C-Mn"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipeMaterial {
    /// Specified minimum yield stress (Pa)
    pub smys: Quantity,

    /// Specified minimum tensile strength (Pa)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smts: Option<Quantity>,

    /// Yield strength derating f_y,temp (Pa); overrides the temperature lookup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub f_ytemp: Option<Quantity>,

    /// Tensile strength derating f_u,temp (Pa); defaults to the yield derating
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub f_utemp: Option<Quantity>,

    /// Design temperature (°C)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Quantity>,

    /// Material family for the built-in derating curves ("CMn", "13Cr", "22Cr", "25Cr", "DSS")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    /// Custom derating curve; takes precedence over `family`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derating_curve: Option<DeratingCurve>,

    /// Young's modulus (Pa)
    #[serde(default = "default_youngs_modulus")]
    pub youngs_modulus: Quantity,

    /// Poisson's ratio
    #[serde(default = "default_poisson_ratio")]
    pub poisson_ratio: f64,
}

impl PipeMaterial {
    /// Material with only SMYS given; derating must still be supplied
    pub fn new(smys: f64) -> Self {
        Self {
            smys: Quantity::from(smys),
            smts: None,
            f_ytemp: None,
            f_utemp: None,
            temperature: None,
            family: None,
            derating_curve: None,
            youngs_modulus: default_youngs_modulus(),
            poisson_ratio: STEEL_POISSON_RATIO,
        }
    }

    /// Validate input parameters.
    pub fn validate(&self) -> CalcResult<()> {
        self.screened().map(|_| ())
    }

    /// Copy with out-of-range array cases set to `NaN`.
    ///
    /// Out-of-range scalars are an error.
    pub fn screened(&self) -> CalcResult<PipeMaterial> {
        if !(0.0..0.5).contains(&self.poisson_ratio) {
            return Err(CalcError::invalid_input(
                "poisson_ratio",
                self.poisson_ratio.to_string(),
                "Poisson's ratio must be in [0, 0.5)",
            ));
        }
        let smts = match &self.smts {
            Some(smts) => Some(smts.require("smts", "SMTS must be positive", |v| v > 0.0)?),
            None => None,
        };
        Ok(PipeMaterial {
            smys: self.smys.require("smys", "SMYS must be positive", |v| v > 0.0)?,
            smts,
            youngs_modulus: self
                .youngs_modulus
                .require("youngs_modulus", "Young's modulus must be positive", |v| v > 0.0)?,
            ..self.clone()
        })
    }

    /// Yield strength derating f_y,temp (Pa)
    pub fn yield_derating(&self) -> CalcResult<Quantity> {
        resolve_derating(
            self.f_ytemp.as_ref(),
            self.temperature.as_ref(),
            self.family.as_deref(),
            self.derating_curve.as_ref(),
        )
    }

    /// Tensile strength derating f_u,temp (Pa)
    pub fn tensile_derating(&self) -> CalcResult<Quantity> {
        match &self.f_utemp {
            Some(value) => Ok(value.clone()),
            None => self.yield_derating(),
        }
    }

    /// Characteristic yield strength f_y (Pa)
    pub fn f_y(&self, alpha_u: f64) -> CalcResult<Quantity> {
        Ok(characteristic_strength(&self.smys, &self.yield_derating()?, alpha_u))
    }

    /// Characteristic tensile strength f_u (Pa), if SMTS is given
    pub fn f_u(&self, alpha_u: f64) -> CalcResult<Option<Quantity>> {
        match &self.smts {
            Some(smts) => Ok(Some(characteristic_strength(smts, &self.tensile_derating()?, alpha_u))),
            None => Ok(None),
        }
    }
}
