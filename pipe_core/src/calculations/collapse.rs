//! # External Pressure Collapse Check
//!
//! DNV-ST-F101 Sec. 5.4.4. The characteristic collapse pressure p_c is the
//! root of the collapse cubic in elastic collapse p_el, plastic collapse p_p
//! and ovality O₀; see [`crate::equations::collapse`].
//!
//! ```text
//! (p_e − p_min)·γ_m·γ_SC,LB / p_c ≤ 1
//! ```
//!
//! ## Example
//!
//! ```rust
//! use pipe_core::calculations::collapse::{calculate, CollapseInput};
//! use pipe_core::materials::PipeMaterial;
//! use pipe_core::quantity::Quantity;
//!
//! let input = CollapseInput::new(
//!     0.660,
//!     0.0212,
//!     PipeMaterial { f_ytemp: Some(Quantity::from(0.0)), ..PipeMaterial::new(450.0e6) },
//!     Quantity::from(vec![-500.0, -1500.0, -2500.0]),
//! );
//! let result = calculate(&input).unwrap();
//!
//! // Deeper water, higher utilisation
//! let u = result.unity.to_vec();
//! assert!(u[0] < u[1] && u[1] < u[2]);
//! ```

use serde::{Deserialize, Serialize};

use super::{
    default_alpha_fab, default_alpha_u, default_gamma_m, default_gravity, default_safety_class,
    default_seawater_density, default_zero, UnityConvention,
};
use crate::equations::collapse::{
    characteristic_collapse_pressure, collapse_unity, elastic_collapse_pressure, ovality, plastic_collapse_pressure,
    CollapseMethod,
};
use crate::equations::pressure::external_pressure;
use crate::errors::{CalcError, CalcResult};
use crate::factors::{
    dnv_ref, CodeFactorTables, FabricationMethod, FactorRangeWarning, FactorResolver, FactorSpec, LimitState, SafetyClass,
    StrengthBasis,
};
use crate::materials::PipeMaterial;
use crate::quantity::Quantity;
use crate::section::{characteristic_wall_thickness, remaining_wall, DesignPhase};

/// Input parameters for a collapse check.
///
/// ## JSON Example
///
/// ```json
/// {
///   "label": "Deepest point",
///   "d_o": 0.660,
///   "t_nom": 0.0212,
///   "t_fab": 0.001,
///   "t_corr": 0.0005,
///   "d_max": 0.6633,
///   "d_min": 0.6567,
///   "material": { "smys": 450.0e6, "temperature": 60.0, "family": "CMn" },
///   "h_l": -1200.0,
///   "alpha_fab": "UOE",
///   "method": "closed_form"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollapseInput {
    /// User label
    #[serde(default)]
    pub label: String,

    /// Outer diameter (m)
    pub d_o: Quantity,

    /// Nominal wall thickness (m)
    pub t_nom: Quantity,

    /// Fabrication thickness tolerance (m)
    #[serde(default = "default_zero")]
    pub t_fab: Quantity,

    /// Corrosion allowance (m)
    #[serde(default = "default_zero")]
    pub t_corr: Quantity,

    /// Erosion allowance (m)
    #[serde(default = "default_zero")]
    pub t_ero: Quantity,

    /// Life phase for t₁
    #[serde(default)]
    pub phase: DesignPhase,

    /// Largest measured outer diameter (m); defaults to `d_o`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d_max: Option<Quantity>,

    /// Smallest measured outer diameter (m); defaults to `d_o`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d_min: Option<Quantity>,

    /// Line pipe material
    pub material: PipeMaterial,

    /// Elevation of the local point (m, negative below sea level)
    pub h_l: Quantity,

    /// Seawater density (kg/m³)
    #[serde(default = "default_seawater_density")]
    pub rho_seawater: Quantity,

    /// Gravitational acceleration (m/s²)
    #[serde(default = "default_gravity")]
    pub g: f64,

    /// Minimum internal pressure that can be sustained (Pa)
    #[serde(default = "default_zero")]
    pub p_min: Quantity,

    #[serde(default = "default_gamma_m")]
    pub gamma_m: FactorSpec<LimitState>,

    /// Local buckling safety class factor γ_SC,LB
    #[serde(default = "default_safety_class")]
    pub gamma_sc_lb: FactorSpec<SafetyClass>,

    #[serde(default = "default_alpha_u")]
    pub alpha_u: FactorSpec<StrengthBasis>,

    /// Fabrication factor α_fab, value or fabrication method
    #[serde(default = "default_alpha_fab")]
    pub alpha_fab: FactorSpec<FabricationMethod>,

    /// Strategy for the collapse cubic
    #[serde(default)]
    pub method: CollapseMethod,

    /// Starting point for the iterative solver (Pa)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_c_seed: Option<Quantity>,

    #[serde(default)]
    pub unity_convention: UnityConvention,
}

impl CollapseInput {
    /// Input with the required values and code defaults for everything else
    pub fn new(d_o: f64, t_nom: f64, material: PipeMaterial, h_l: impl Into<Quantity>) -> Self {
        Self {
            label: String::new(),
            d_o: Quantity::from(d_o),
            t_nom: Quantity::from(t_nom),
            t_fab: default_zero(),
            t_corr: default_zero(),
            t_ero: default_zero(),
            phase: DesignPhase::default(),
            d_max: None,
            d_min: None,
            material,
            h_l: h_l.into(),
            rho_seawater: default_seawater_density(),
            g: default_gravity(),
            p_min: default_zero(),
            gamma_m: default_gamma_m(),
            gamma_sc_lb: default_safety_class(),
            alpha_u: default_alpha_u(),
            alpha_fab: default_alpha_fab(),
            method: CollapseMethod::default(),
            p_c_seed: None,
            unity_convention: UnityConvention::default(),
        }
    }

    /// Validate input parameters.
    pub fn validate(&self) -> CalcResult<()> {
        self.screened().map(|_| ())
    }

    /// Copy with out-of-range array cases set to `NaN`.
    ///
    /// Out-of-range scalars are an error.
    pub fn screened(&self) -> CalcResult<Self> {
        if self.g <= 0.0 {
            return Err(CalcError::invalid_input("g", self.g.to_string(), "Gravity must be positive"));
        }
        Ok(Self {
            d_o: self.d_o.require("d_o", "Outer diameter must be positive", |v| v > 0.0)?,
            t_nom: self.t_nom.require("t_nom", "Wall thickness must be positive", |v| v > 0.0)?,
            t_fab: self.t_fab.require("t_fab", "Allowance cannot be negative", |v| v >= 0.0)?,
            t_corr: self.t_corr.require("t_corr", "Allowance cannot be negative", |v| v >= 0.0)?,
            t_ero: self.t_ero.require("t_ero", "Allowance cannot be negative", |v| v >= 0.0)?,
            material: self.material.screened()?,
            ..self.clone()
        })
    }

    fn check_shapes(&self) -> CalcResult<Option<usize>> {
        let mut shapes = vec![
            ("d_o", &self.d_o),
            ("t_nom", &self.t_nom),
            ("t_fab", &self.t_fab),
            ("t_corr", &self.t_corr),
            ("t_ero", &self.t_ero),
            ("h_l", &self.h_l),
            ("rho_seawater", &self.rho_seawater),
            ("p_min", &self.p_min),
            ("material.smys", &self.material.smys),
            ("material.youngs_modulus", &self.material.youngs_modulus),
        ];
        let optional = [
            ("d_max", self.d_max.as_ref()),
            ("d_min", self.d_min.as_ref()),
            ("p_c_seed", self.p_c_seed.as_ref()),
            ("material.f_ytemp", self.material.f_ytemp.as_ref()),
            ("material.temperature", self.material.temperature.as_ref()),
        ];
        shapes.extend(optional.into_iter().filter_map(|(name, q)| q.map(|q| (name, q))));
        Quantity::broadcast_len(&shapes)
    }
}

/// Factors used by the collapse check after resolution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollapseFactors {
    pub gamma_m: f64,
    pub gamma_sc_lb: f64,
    pub alpha_u: f64,
    pub alpha_fab: f64,
}

/// Results of a collapse check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollapseResult {
    /// Characteristic wall thickness t₁ (m)
    pub t_1: Quantity,
    /// Characteristic yield strength (Pa)
    pub f_y: Quantity,
    /// D/t₁
    pub d_over_t: Quantity,
    /// Elastic collapse pressure (Pa)
    pub p_el: Quantity,
    /// Plastic collapse pressure (Pa)
    pub p_p: Quantity,
    /// Ovality, floored at 0.005
    pub o_0: Quantity,
    /// Characteristic collapse pressure (Pa)
    pub p_c: Quantity,
    /// External hydrostatic pressure (Pa)
    pub p_e: Quantity,
    /// Collapse unity in `unity_convention`
    pub unity: Quantity,
    pub method: CollapseMethod,
    pub factors: CollapseFactors,
    pub unity_convention: UnityConvention,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub factor_warnings: Vec<FactorRangeWarning>,
}

impl CollapseResult {
    /// Check if every case passes
    pub fn passes(&self) -> bool {
        self.unity_convention.passes(&self.unity)
    }

    /// Format as a multi-line string for reports
    pub fn format_report(&self) -> String {
        format!(
            "External Pressure Collapse ({})\n\
             ================================================\n\
             gamma_m     = {:.3}    {}\n\
             gamma_SC,LB = {:.3}    {}\n\
             alpha_U     = {:.3}    {}\n\
             alpha_fab   = {:.3}    {}\n\
             ------------------------------------------------\n\
             O_0  = {}    {}\n\
             p_el = {} Pa\n\
             p_p  = {} Pa\n\
             p_c  = {} Pa    {} ({:?})\n\
             p_e  = {} Pa    {}\n\
             ------------------------------------------------\n\
             Collapse unity = {}    {}",
            self.unity_convention.display_name(),
            self.factors.gamma_m, dnv_ref::GAMMA_M,
            self.factors.gamma_sc_lb, dnv_ref::GAMMA_SC,
            self.factors.alpha_u, dnv_ref::ALPHA_U,
            self.factors.alpha_fab, dnv_ref::ALPHA_FAB,
            self.o_0, dnv_ref::OVALITY,
            self.p_el,
            self.p_p,
            self.p_c, dnv_ref::COLLAPSE_PRESSURE, self.method,
            self.p_e, dnv_ref::LOCAL_PRESSURES,
            self.unity, dnv_ref::COLLAPSE,
        )
    }
}

/// Run the collapse check with the default DNV-ST-F101 factor tables.
///
/// # Errors
///
/// - [`CalcError::CollapseSolve`] on the scalar path when the cubic cannot be
///   solved (array cases become `NaN` instead)
/// - [`CalcError::ShapeMismatch`] if array lengths disagree
/// - Material resolution and input validation errors
pub fn calculate(input: &CollapseInput) -> CalcResult<CollapseResult> {
    calculate_with_tables(input, &CodeFactorTables::default())
}

/// Run the collapse check against the given factor tables
pub fn calculate_with_tables(input: &CollapseInput, tables: &CodeFactorTables) -> CalcResult<CollapseResult> {
    input.check_shapes()?;
    let input = &input.screened()?;

    let mut resolver = FactorResolver::new(tables);
    let factors = CollapseFactors {
        gamma_m: resolver.gamma_m(&input.gamma_m)?,
        gamma_sc_lb: resolver.gamma_sc_lb(&input.gamma_sc_lb)?,
        alpha_u: resolver.alpha_u(&input.alpha_u)?,
        alpha_fab: resolver.alpha_fab(&input.alpha_fab)?,
    };
    let factor_warnings = resolver.into_warnings();

    let wall = characteristic_wall_thickness(&input.t_nom, &input.t_fab, &input.t_corr, &input.t_ero, input.phase);
    let t_1 = remaining_wall(&wall.t_1, "t_1")?;
    let f_y = input.material.f_y(factors.alpha_u)?;
    let d = &input.d_o;

    let p_el = elastic_collapse_pressure(&t_1, d, &input.material.youngs_modulus, input.material.poisson_ratio);
    let p_p = plastic_collapse_pressure(&t_1, d, &f_y, factors.alpha_fab);
    let o_0 = ovality(d, input.d_max.as_ref(), input.d_min.as_ref());
    let d_over_t = d / &t_1;
    let p_c = characteristic_collapse_pressure(&p_el, &p_p, &o_0, &d_over_t, input.method, input.p_c_seed.as_ref())?;

    let p_e = external_pressure(&input.h_l, &input.rho_seawater, input.g);
    let utilisation = collapse_unity(&p_e, &input.p_min, factors.gamma_m, factors.gamma_sc_lb, &p_c);

    Ok(CollapseResult {
        unity: input.unity_convention.express(&utilisation),
        t_1,
        f_y,
        d_over_t,
        p_el,
        p_p,
        o_0,
        p_c,
        p_e,
        method: input.method,
        factors,
        unity_convention: input.unity_convention,
        factor_warnings,
    })
}
