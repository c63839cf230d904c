//! # Propagation Buckling Check
//!
//! DNV-ST-F101 Sec. 5.4.5. A buckle started by an impact or by collapse
//! runs along the line while the external pressure exceeds the propagation
//! pressure p_pr (computed on t₂). Where the check fails, buckle arrestors
//! can be placed at intervals; their capacity is the crossover pressure p_x.
//!
//! ## Example
//!
//! ```rust
//! use pipe_core::calculations::propagation::{calculate, BuckleArrestor, PropagationInput};
//! use pipe_core::materials::PipeMaterial;
//! use pipe_core::quantity::Quantity;
//!
//! let mut input = PropagationInput::new(
//!     0.660,
//!     0.0212,
//!     PipeMaterial { f_ytemp: Some(Quantity::from(0.0)), ..PipeMaterial::new(450.0e6) },
//!     -410.0,
//! );
//! let bare = calculate(&input).unwrap();
//! assert!(!bare.passes());
//!
//! input.buckle_arrestor = Some(BuckleArrestor::new(0.0319, 12.2));
//! let arrested = calculate(&input).unwrap();
//! assert!(arrested.arrestor_passes());
//! ```

use serde::{Deserialize, Serialize};

use super::{
    default_alpha_fab, default_alpha_u, default_gamma_m, default_gravity, default_safety_class,
    default_seawater_density, default_zero, UnityConvention,
};
use crate::equations::pressure::external_pressure;
use crate::equations::propagation::{arrestor_unity, crossover_pressure, propagation_pressure, propagation_unity};
use crate::errors::{CalcError, CalcResult};
use crate::factors::{
    dnv_ref, CodeFactorTables, FabricationMethod, FactorRangeWarning, FactorResolver, FactorSpec, LimitState, SafetyClass,
    StrengthBasis,
};
use crate::materials::PipeMaterial;
use crate::quantity::Quantity;
use crate::section::{characteristic_wall_thickness, remaining_wall, DesignPhase};

/// Thick-walled joint that stops a running buckle.
///
/// The arrestor sees the same allowances and phase as the line pipe.
///
/// ## JSON Example
///
/// ```json
/// { "t_nom": 0.0319, "length": 12.2 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuckleArrestor {
    /// Nominal arrestor wall thickness (m)
    pub t_nom: Quantity,

    /// Arrestor length L_BA (m)
    pub length: Quantity,

    /// Arrestor material; defaults to the line pipe material
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<PipeMaterial>,

    /// Arrestor fabrication factor; defaults to the line pipe value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha_fab: Option<FactorSpec<FabricationMethod>>,
}

impl BuckleArrestor {
    /// Arrestor of the line pipe material
    pub fn new(t_nom: f64, length: f64) -> Self {
        Self {
            t_nom: Quantity::from(t_nom),
            length: Quantity::from(length),
            material: None,
            alpha_fab: None,
        }
    }

    fn screened(&self) -> CalcResult<Self> {
        let material = match &self.material {
            Some(material) => Some(material.screened()?),
            None => None,
        };
        Ok(Self {
            t_nom: self.t_nom.require(
                "buckle_arrestor.t_nom",
                "Arrestor wall thickness must be positive",
                |v| v > 0.0,
            )?,
            length: self
                .length
                .require("buckle_arrestor.length", "Arrestor length cannot be negative", |v| v >= 0.0)?,
            material,
            alpha_fab: self.alpha_fab,
        })
    }
}

/// Input parameters for a propagation buckling check.
///
/// ## JSON Example
///
/// ```json
/// {
///   "label": "Deep section",
///   "d_o": 0.660,
///   "t_nom": 0.0212,
///   "t_corr": 0.0005,
///   "material": { "smys": 450.0e6, "temperature": 60.0, "family": "CMn" },
///   "h_l": -410.0,
///   "rho_seawater": 1027.0,
///   "alpha_fab": 0.85,
///   "buckle_arrestor": { "t_nom": 0.0319, "length": 12.2 }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropagationInput {
    /// User label
    #[serde(default)]
    pub label: String,

    /// Outer diameter (m)
    pub d_o: Quantity,

    /// Nominal wall thickness (m)
    pub t_nom: Quantity,

    /// Fabrication thickness tolerance (m); does not affect t₂
    #[serde(default = "default_zero")]
    pub t_fab: Quantity,

    /// Corrosion allowance (m)
    #[serde(default = "default_zero")]
    pub t_corr: Quantity,

    /// Erosion allowance (m)
    #[serde(default = "default_zero")]
    pub t_ero: Quantity,

    /// Life phase for t₂
    #[serde(default)]
    pub phase: DesignPhase,

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

    #[serde(default = "default_safety_class")]
    pub gamma_sc_lb: FactorSpec<SafetyClass>,

    #[serde(default = "default_alpha_u")]
    pub alpha_u: FactorSpec<StrengthBasis>,

    #[serde(default = "default_alpha_fab")]
    pub alpha_fab: FactorSpec<FabricationMethod>,

    /// Optional buckle arrestor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buckle_arrestor: Option<BuckleArrestor>,

    #[serde(default)]
    pub unity_convention: UnityConvention,
}

impl PropagationInput {
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
            material,
            h_l: h_l.into(),
            rho_seawater: default_seawater_density(),
            g: default_gravity(),
            p_min: default_zero(),
            gamma_m: default_gamma_m(),
            gamma_sc_lb: default_safety_class(),
            alpha_u: default_alpha_u(),
            alpha_fab: default_alpha_fab(),
            buckle_arrestor: None,
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
        let buckle_arrestor = match &self.buckle_arrestor {
            Some(arrestor) => Some(arrestor.screened()?),
            None => None,
        };
        Ok(Self {
            d_o: self.d_o.require("d_o", "Outer diameter must be positive", |v| v > 0.0)?,
            t_nom: self.t_nom.require("t_nom", "Wall thickness must be positive", |v| v > 0.0)?,
            t_fab: self.t_fab.require("t_fab", "Allowance cannot be negative", |v| v >= 0.0)?,
            t_corr: self.t_corr.require("t_corr", "Allowance cannot be negative", |v| v >= 0.0)?,
            t_ero: self.t_ero.require("t_ero", "Allowance cannot be negative", |v| v >= 0.0)?,
            material: self.material.screened()?,
            buckle_arrestor,
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
        ];
        if let Some(arrestor) = &self.buckle_arrestor {
            shapes.push(("buckle_arrestor.t_nom", &arrestor.t_nom));
            shapes.push(("buckle_arrestor.length", &arrestor.length));
        }
        Quantity::broadcast_len(&shapes)
    }
}

/// Buckle arrestor results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrestorResult {
    /// Arrestor t₂ (m)
    pub t_2: Quantity,
    /// Arrestor characteristic yield strength (Pa)
    pub f_y: Quantity,
    /// Propagation pressure of an infinitely long arrestor (Pa)
    pub p_pr_ba: Quantity,
    /// Crossover pressure (Pa)
    pub p_x: Quantity,
    /// Arrestor unity in the result's convention
    pub unity: Quantity,
    pub alpha_fab: f64,
}

/// Factors used by the propagation check after resolution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropagationFactors {
    pub gamma_m: f64,
    pub gamma_sc_lb: f64,
    pub alpha_u: f64,
    pub alpha_fab: f64,
}

/// Results of a propagation buckling check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropagationResult {
    /// Characteristic wall thickness t₂ (m)
    pub t_2: Quantity,
    /// Characteristic yield strength (Pa)
    pub f_y: Quantity,
    /// Propagation pressure (Pa)
    pub p_pr: Quantity,
    /// External hydrostatic pressure (Pa)
    pub p_e: Quantity,
    /// Propagation unity in `unity_convention`
    pub unity: Quantity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrestor: Option<ArrestorResult>,
    pub factors: PropagationFactors,
    pub unity_convention: UnityConvention,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub factor_warnings: Vec<FactorRangeWarning>,
}

impl PropagationResult {
    /// Check if every case passes without relying on arrestors
    pub fn passes(&self) -> bool {
        self.unity_convention.passes(&self.unity)
    }

    /// Check if the arrestor stops a buckle in every case (false without an arrestor)
    pub fn arrestor_passes(&self) -> bool {
        self.arrestor
            .as_ref()
            .is_some_and(|a| self.unity_convention.passes(&a.unity))
    }

    /// Format as a multi-line string for reports
    pub fn format_report(&self) -> String {
        let mut report = format!(
            "Propagation Buckling ({})\n\
             ================================================\n\
             gamma_m     = {:.3}    {}\n\
             gamma_SC,LB = {:.3}    {}\n\
             alpha_U     = {:.3}    {}\n\
             alpha_fab   = {:.3}    {}\n\
             ------------------------------------------------\n\
             t_2  = {} m\n\
             p_pr = {} Pa    {}\n\
             p_e  = {} Pa    {}\n\
             ------------------------------------------------\n\
             Propagation unity = {}    {}",
            self.unity_convention.display_name(),
            self.factors.gamma_m, dnv_ref::GAMMA_M,
            self.factors.gamma_sc_lb, dnv_ref::GAMMA_SC,
            self.factors.alpha_u, dnv_ref::ALPHA_U,
            self.factors.alpha_fab, dnv_ref::ALPHA_FAB,
            self.t_2,
            self.p_pr, dnv_ref::PROPAGATION_PRESSURE,
            self.p_e, dnv_ref::LOCAL_PRESSURES,
            self.unity, dnv_ref::PROPAGATION,
        );
        if let Some(ba) = &self.arrestor {
            report.push_str(&format!(
                "\nArrestor p_x = {} Pa, unity = {}    {}",
                ba.p_x, ba.unity, dnv_ref::BUCKLE_ARRESTOR
            ));
        }
        report
    }
}

/// Run the propagation check with the default DNV-ST-F101 factor tables
pub fn calculate(input: &PropagationInput) -> CalcResult<PropagationResult> {
    calculate_with_tables(input, &CodeFactorTables::default())
}

/// Run the propagation check against the given factor tables
pub fn calculate_with_tables(input: &PropagationInput, tables: &CodeFactorTables) -> CalcResult<PropagationResult> {
    input.check_shapes()?;
    let input = &input.screened()?;

    let mut resolver = FactorResolver::new(tables);
    let factors = PropagationFactors {
        gamma_m: resolver.gamma_m(&input.gamma_m)?,
        gamma_sc_lb: resolver.gamma_sc_lb(&input.gamma_sc_lb)?,
        alpha_u: resolver.alpha_u(&input.alpha_u)?,
        alpha_fab: resolver.alpha_fab(&input.alpha_fab)?,
    };
    let arrestor_alpha_fab = match input.buckle_arrestor.as_ref().and_then(|a| a.alpha_fab.as_ref()) {
        Some(spec) => resolver.alpha_fab(spec)?,
        None => factors.alpha_fab,
    };
    let factor_warnings = resolver.into_warnings();

    let convention = input.unity_convention;
    let d = &input.d_o;
    let wall = characteristic_wall_thickness(&input.t_nom, &input.t_fab, &input.t_corr, &input.t_ero, input.phase);
    let t_2 = remaining_wall(&wall.t_2, "t_2")?;
    let f_y = input.material.f_y(factors.alpha_u)?;
    let p_pr = propagation_pressure(&t_2, d, &f_y, factors.alpha_fab);
    let p_e = external_pressure(&input.h_l, &input.rho_seawater, input.g);
    let utilisation = propagation_unity(&p_e, &input.p_min, factors.gamma_m, factors.gamma_sc_lb, &p_pr);

    let arrestor = match &input.buckle_arrestor {
        Some(ba) => {
            let ba_wall =
                characteristic_wall_thickness(&ba.t_nom, &input.t_fab, &input.t_corr, &input.t_ero, input.phase);
            let ba_t_2 = remaining_wall(&ba_wall.t_2, "buckle_arrestor.t_2")?.masked_by(&t_2);
            let ba_f_y = ba.material.as_ref().unwrap_or(&input.material).f_y(factors.alpha_u)?;
            let p_pr_ba = propagation_pressure(&ba_t_2, d, &ba_f_y, arrestor_alpha_fab);
            let p_x = crossover_pressure(&p_pr, &p_pr_ba, d, &t_2, &ba.length);
            let ba_utilisation = arrestor_unity(&p_e, &input.p_min, factors.gamma_m, factors.gamma_sc_lb, &p_x);
            Some(ArrestorResult {
                unity: convention.express(&ba_utilisation),
                t_2: ba_t_2,
                f_y: ba_f_y,
                p_pr_ba,
                p_x,
                alpha_fab: arrestor_alpha_fab,
            })
        }
        None => None,
    };

    Ok(PropagationResult {
        unity: convention.express(&utilisation),
        t_2,
        f_y,
        p_pr,
        p_e,
        arrestor,
        factors,
        unity_convention: convention,
        factor_warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn test_input() -> PropagationInput {
        PropagationInput {
            t_corr: Quantity::from(0.0005),
            rho_seawater: Quantity::from(1027.0),
            g: 9.81,
            alpha_u: FactorSpec::Value(1.0),
            alpha_fab: FactorSpec::Value(0.85),
            ..PropagationInput::new(
                0.660,
                0.0212,
                PipeMaterial {
                    temperature: Some(Quantity::from(60.0)),
                    family: Some("CMn".to_string()),
                    ..PipeMaterial::new(450.0e6)
                },
                -410.0,
            )
        }
    }

    #[test]
    fn test_propagation_pressure() {
        let r = calculate(&test_input()).unwrap();
        assert!((r.t_2.get(0) - 0.0207).abs() < 1e-12);
        assert!((r.f_y.get(0) - 444.0e6).abs() < 1e-3);
        assert_relative_eq!(r.p_pr.get(0), 2_301_102.5, max_relative = 1e-6);

        let p_e = 1027.0 * 9.81 * 410.0;
        let expected = p_e * 1.15 * 1.14 / r.p_pr.get(0);
        assert!((r.unity.get(0) - expected).abs() < 1e-9);
        assert!(!r.passes());
        assert!(!r.arrestor_passes());
    }

    #[test]
    fn test_buckle_arrestor() {
        let mut input = test_input();
        input.buckle_arrestor = Some(BuckleArrestor::new(0.0319, 12.2));
        let r = calculate(&input).unwrap();
        let ba = r.arrestor.as_ref().unwrap();

        assert!((ba.t_2.get(0) - 0.0314).abs() < 1e-12);
        let p_pr_ba = 35.0 * 444.0e6 * 0.85 * (0.0314_f64 / 0.660).powf(2.5);
        assert_relative_eq!(ba.p_pr_ba.get(0), p_pr_ba, max_relative = 1e-9);

        let p_pr = r.p_pr.get(0);
        let decay = (-20.0 * 0.0207 * 12.2 / (0.660 * 0.660_f64)).exp();
        assert_relative_eq!(ba.p_x.get(0), p_pr + (p_pr_ba - p_pr) * (1.0 - decay), max_relative = 1e-9);
        assert!(ba.p_x.get(0) > p_pr);
        assert!(r.arrestor_passes());
    }

    #[test]
    fn test_arrestor_own_fabrication() {
        let mut input = test_input();
        input.buckle_arrestor = Some(BuckleArrestor {
            alpha_fab: Some(FactorSpec::Category(FabricationMethod::Seamless)),
            ..BuckleArrestor::new(0.0319, 12.2)
        });
        let r = calculate(&input).unwrap();
        let ba = r.arrestor.unwrap();
        assert_eq!(ba.alpha_fab, 1.0);
        assert_eq!(r.factors.alpha_fab, 0.85);
    }

    #[test]
    fn test_pre_operation_uses_nominal() {
        let mut input = test_input();
        input.phase = DesignPhase::PreOperation;
        let r = calculate(&input).unwrap();
        assert_eq!(r.t_2.get(0), 0.0212);
    }

    #[test]
    fn test_bad_cases_are_blanked() {
        let mut input = test_input();
        input.t_nom = Quantity::from(vec![0.0212, -0.0212, 0.0212]);
        input.t_corr = Quantity::from(vec![0.0005, 0.0005, 0.03]);
        input.buckle_arrestor = Some(BuckleArrestor::new(0.0319, 12.2));
        let r = calculate(&input).unwrap();

        assert_relative_eq!(r.p_pr.get(0), 2_301_102.5, max_relative = 1e-6);
        assert!(r.unity.get(1).is_nan());
        assert!(r.t_2.get(2).is_nan());
        assert!(r.unity.get(2).is_nan());

        let ba = r.arrestor.as_ref().unwrap();
        assert!(ba.unity.get(0).is_finite());
        assert!(ba.unity.get(2).is_nan());
        assert!(!r.arrestor_passes());
    }

    #[test]
    fn test_no_wall_left_is_rejected() {
        let mut input = test_input();
        input.t_corr = Quantity::from(0.03);
        assert_eq!(calculate(&input).unwrap_err().error_code(), "INVALID_INPUT");

        // Arrestor thinner than its allowances
        let mut input = test_input();
        input.buckle_arrestor = Some(BuckleArrestor::new(0.0004, 12.2));
        assert_eq!(calculate(&input).unwrap_err().error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_report_cites_clauses() {
        let bare = calculate(&test_input()).unwrap().format_report();
        assert!(bare.contains(dnv_ref::PROPAGATION_PRESSURE));
        assert!(!bare.contains(dnv_ref::BUCKLE_ARRESTOR));

        let mut input = test_input();
        input.buckle_arrestor = Some(BuckleArrestor::new(0.0319, 12.2));
        let arrested = calculate(&input).unwrap().format_report();
        assert!(arrested.contains(dnv_ref::BUCKLE_ARRESTOR));
    }

    #[test]
    fn test_serialization() {
        let mut input = test_input();
        input.buckle_arrestor = Some(BuckleArrestor::new(0.0319, 12.2));
        let json = serde_json::to_string_pretty(&input).unwrap();
        let roundtrip: PropagationInput = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip.buckle_arrestor, input.buckle_arrestor);
        assert_eq!(roundtrip.alpha_fab, FactorSpec::Value(0.85));
    }
}
