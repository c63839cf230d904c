//! # Pressure Containment Check
//!
//! Checks the wall against internal overpressure per DNV-ST-F101 Sec. 5.4.2.
//!
//! ## Method
//!
//! The demand is the local incidental overpressure `Δp = p_li − p_e`. It is
//! compared with three limits:
//!
//! | Limit      | Value                        |
//! |------------|------------------------------|
//! | Burst      | p_b(t₁) / (γ_m·γ_SC,PC)      |
//! | Local test | p_lt / α_spt − p_e           |
//! | Mill test  | p_mpt · α_U / α_mpt          |
//!
//! The containment unity uses the most restrictive limit, which is reported
//! per case as the governing limit. A separate system test check compares
//! `p_lt − p_e` with `min(p_b/(γ_m·γ_SC,PC), p_mpt)`, with p_b evaluated on
//! the pre-operation t₁. It is reported but not part of [`ContainmentResult::passes`].
//!
//! ## Example
//!
//! ```rust
//! use pipe_core::calculations::containment::{calculate, ContainmentInput, ContainmentLimit};
//! use pipe_core::factors::FactorSpec;
//! use pipe_core::materials::PipeMaterial;
//! use pipe_core::quantity::Quantity;
//!
//! let input = ContainmentInput {
//!     t_fab: Quantity::from(0.001),
//!     t_corr: Quantity::from(0.0005),
//!     h_ref: Quantity::from(30.0),
//!     rho_cont: Quantity::from(275.0),
//!     rho_seawater: Quantity::from(1027.0),
//!     alpha_u: FactorSpec::Value(1.0),
//!     g: 9.81,
//!     ..ContainmentInput::new(
//!         0.6176,
//!         0.0212,
//!         PipeMaterial {
//!             smts: Some(Quantity::from(535.0e6)),
//!             temperature: Some(Quantity::from(60.0)),
//!             family: Some("CMn".to_string()),
//!             ..PipeMaterial::new(450.0e6)
//!         },
//!         240.0e5,
//!         -340.0,
//!     )
//! };
//!
//! let result = calculate(&input).unwrap();
//! assert!((result.containment_unity.get(0) - 0.9286).abs() < 1e-4);
//! assert_eq!(result.governing, vec![Some(ContainmentLimit::Burst)]);
//! assert!(result.passes());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{
    default_alpha_u, default_end_cap_factor, default_gamma_inc, default_gamma_m, default_gravity,
    default_safety_class, default_seawater_density, default_zero, UnityConvention,
};
use crate::equations::pressure::{
    burst_resistance, containment_strength, external_pressure, hoop_stress, local_incidental_pressure,
    local_test_pressure, mill_test_pressure, system_test_pressure,
};
use crate::errors::{CalcError, CalcResult};
use crate::factors::{
    dnv_ref, CodeFactorTables, FactorRangeWarning, FactorResolver, FactorSpec, LimitState, SafetyClass,
    StrengthBasis,
};
use crate::materials::PipeMaterial;
use crate::quantity::Quantity;
use crate::section::{characteristic_wall_thickness, mill_test_thickness, remaining_wall, DesignPhase};

/// Limit that can govern the containment check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainmentLimit {
    /// Factored burst resistance
    Burst,
    /// Local system test pressure
    LocalTest,
    /// Mill test pressure
    MillTest,
}

impl ContainmentLimit {
    /// All limits, in the order they are compared
    pub const ALL: [ContainmentLimit; 3] = [
        ContainmentLimit::Burst,
        ContainmentLimit::LocalTest,
        ContainmentLimit::MillTest,
    ];

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            ContainmentLimit::Burst => "Burst resistance",
            ContainmentLimit::LocalTest => "Local test pressure",
            ContainmentLimit::MillTest => "Mill test pressure",
        }
    }
}

impl fmt::Display for ContainmentLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Input parameters for a pressure containment check.
///
/// SI units. SMTS is required on the material (mill test pressure).
///
/// ## JSON Example
///
/// ```json
/// {
///   "label": "Riser base",
///   "d_o": 0.6176,
///   "t_nom": 0.0212,
///   "t_fab": 0.001,
///   "t_corr": 0.0005,
///   "material": {
///     "smys": 450.0e6,
///     "smts": 535.0e6,
///     "temperature": 60.0,
///     "family": "CMn"
///   },
///   "p_d": 240.0e5,
///   "h_l": -340.0,
///   "h_ref": 30.0,
///   "rho_cont": 275.0,
///   "rho_t": 1027.0,
///   "rho_seawater": 1027.0,
///   "alpha_u": 1.0,
///   "alpha_mpt": "medium"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainmentInput {
    /// User label (e.g., "KP 0.0 - 2.5")
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

    /// Line pipe material
    pub material: PipeMaterial,

    /// Design pressure at the reference elevation (Pa)
    pub p_d: Quantity,

    /// Incidental to design pressure ratio
    #[serde(default = "default_gamma_inc")]
    pub gamma_inc: f64,

    /// Elevation of the local point (m, negative below sea level)
    pub h_l: Quantity,

    /// Elevation of the pressure reference point (m)
    #[serde(default = "default_zero")]
    pub h_ref: Quantity,

    /// Contents density (kg/m³)
    #[serde(default = "default_zero")]
    pub rho_cont: Quantity,

    /// Test fluid density (kg/m³)
    #[serde(default = "default_seawater_density")]
    pub rho_t: Quantity,

    /// Seawater density (kg/m³)
    #[serde(default = "default_seawater_density")]
    pub rho_seawater: Quantity,

    /// Gravitational acceleration (m/s²)
    #[serde(default = "default_gravity")]
    pub g: f64,

    /// Material resistance factor γ_m, value or limit state
    #[serde(default = "default_gamma_m")]
    pub gamma_m: FactorSpec<LimitState>,

    /// Pressure containment safety class factor γ_SC,PC, value or safety class
    #[serde(default = "default_safety_class")]
    pub gamma_sc_pc: FactorSpec<SafetyClass>,

    /// Material strength factor α_U, value or strength basis
    #[serde(default = "default_alpha_u")]
    pub alpha_u: FactorSpec<StrengthBasis>,

    /// System pressure test factor α_spt, value or safety class
    #[serde(default = "default_safety_class")]
    pub alpha_spt: FactorSpec<SafetyClass>,

    /// Mill pressure test factor α_mpt; derived from γ_m·γ_SC,PC when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha_mpt: Option<FactorSpec<SafetyClass>>,

    /// Mill test end-cap factor k
    #[serde(default = "default_end_cap_factor")]
    pub k_end_cap: f64,

    /// How unity ratios are reported
    #[serde(default)]
    pub unity_convention: UnityConvention,
}

impl ContainmentInput {
    /// Input with the required values and code defaults for everything else
    pub fn new(d_o: f64, t_nom: f64, material: PipeMaterial, p_d: f64, h_l: f64) -> Self {
        Self {
            label: String::new(),
            d_o: Quantity::from(d_o),
            t_nom: Quantity::from(t_nom),
            t_fab: default_zero(),
            t_corr: default_zero(),
            t_ero: default_zero(),
            phase: DesignPhase::default(),
            material,
            p_d: Quantity::from(p_d),
            gamma_inc: default_gamma_inc(),
            h_l: Quantity::from(h_l),
            h_ref: default_zero(),
            rho_cont: default_zero(),
            rho_t: default_seawater_density(),
            rho_seawater: default_seawater_density(),
            g: default_gravity(),
            gamma_m: default_gamma_m(),
            gamma_sc_pc: default_safety_class(),
            alpha_u: default_alpha_u(),
            alpha_spt: default_safety_class(),
            alpha_mpt: None,
            k_end_cap: default_end_cap_factor(),
            unity_convention: UnityConvention::default(),
        }
    }

    /// Validate input parameters.
    pub fn validate(&self) -> CalcResult<()> {
        self.screened().map(|_| ())
    }

    /// Copy with out-of-range array cases set to `NaN`.
    ///
    /// Out-of-range scalars and non-positive factors are an error.
    pub fn screened(&self) -> CalcResult<Self> {
        self.check_factors()?;
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

    fn check_factors(&self) -> CalcResult<()> {
        if self.g <= 0.0 {
            return Err(CalcError::invalid_input("g", self.g.to_string(), "Gravity must be positive"));
        }
        if self.gamma_inc <= 0.0 {
            return Err(CalcError::invalid_input(
                "gamma_inc",
                self.gamma_inc.to_string(),
                "Incidental pressure ratio must be positive",
            ));
        }
        if self.k_end_cap <= 0.0 {
            return Err(CalcError::invalid_input(
                "k_end_cap",
                self.k_end_cap.to_string(),
                "End-cap factor must be positive",
            ));
        }
        Ok(())
    }

    fn check_shapes(&self) -> CalcResult<Option<usize>> {
        let mut shapes = vec![
            ("d_o", &self.d_o),
            ("t_nom", &self.t_nom),
            ("t_fab", &self.t_fab),
            ("t_corr", &self.t_corr),
            ("t_ero", &self.t_ero),
            ("p_d", &self.p_d),
            ("h_l", &self.h_l),
            ("h_ref", &self.h_ref),
            ("rho_cont", &self.rho_cont),
            ("rho_t", &self.rho_t),
            ("rho_seawater", &self.rho_seawater),
            ("material.smys", &self.material.smys),
        ];
        let optional = [
            ("material.smts", self.material.smts.as_ref()),
            ("material.f_ytemp", self.material.f_ytemp.as_ref()),
            ("material.f_utemp", self.material.f_utemp.as_ref()),
            ("material.temperature", self.material.temperature.as_ref()),
        ];
        shapes.extend(optional.into_iter().filter_map(|(name, q)| q.map(|q| (name, q))));
        Quantity::broadcast_len(&shapes)
    }
}

/// Factors used by the containment check after resolution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContainmentFactors {
    pub gamma_m: f64,
    pub gamma_sc_pc: f64,
    pub alpha_u: f64,
    pub alpha_spt: f64,
    pub alpha_mpt: f64,
    pub gamma_inc: f64,
}

impl ContainmentFactors {
    /// Format as a multi-line string for reports
    pub fn format_report(&self) -> String {
        format!(
            "gamma_m     = {:.3}    {}\n\
             gamma_SC,PC = {:.3}    {}\n\
             alpha_U     = {:.3}    {}\n\
             alpha_spt   = {:.3}    {}\n\
             alpha_mpt   = {:.3}    {}\n\
             gamma_inc   = {:.3}    {}",
            self.gamma_m, dnv_ref::GAMMA_M,
            self.gamma_sc_pc, dnv_ref::GAMMA_SC,
            self.alpha_u, dnv_ref::ALPHA_U,
            self.alpha_spt, dnv_ref::PRESSURE_TEST_FACTORS,
            self.alpha_mpt, dnv_ref::PRESSURE_TEST_FACTORS,
            self.gamma_inc, dnv_ref::LOCAL_PRESSURES,
        )
    }
}

/// Results of a pressure containment check.
///
/// Every numeric field holds one value per load case. Unity fields are
/// reported in `unity_convention`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainmentResult {
    // === Geometry and strength ===
    /// Characteristic wall thickness t₁ (m)
    pub t_1: Quantity,
    /// Mill test wall thickness t_min (m)
    pub t_min: Quantity,
    /// Characteristic yield strength (Pa)
    pub f_y: Quantity,
    /// Characteristic tensile strength (Pa)
    pub f_u: Quantity,
    /// Burst strength min(f_y, f_u/1.15) (Pa)
    pub f_cb: Quantity,

    // === Pressures ===
    /// Local incidental pressure (Pa)
    pub p_li: Quantity,
    /// External hydrostatic pressure (Pa)
    pub p_e: Quantity,
    /// System test pressure at the reference elevation (Pa)
    pub p_t: Quantity,
    /// Local test pressure (Pa)
    pub p_lt: Quantity,
    /// Unfactored burst resistance (Pa)
    pub p_b: Quantity,
    /// Mill test pressure (Pa)
    pub p_mpt: Quantity,

    // === Limits and demand ===
    /// p_b / (γ_m·γ_SC,PC) (Pa)
    pub limit_burst: Quantity,
    /// p_lt / α_spt − p_e (Pa)
    pub limit_local_test: Quantity,
    /// p_mpt·α_U / α_mpt (Pa)
    pub limit_mill_test: Quantity,
    /// p_li − p_e (Pa)
    pub demand: Quantity,
    /// Hoop stress from the demand on t₁ (Pa)
    pub hoop_stress: Quantity,

    // === Unity checks ===
    pub burst_unity: Quantity,
    pub local_test_unity: Quantity,
    pub mill_test_unity: Quantity,
    /// Demand against the most restrictive limit
    pub containment_unity: Quantity,
    /// Most restrictive limit per case (`None` where the case is `NaN`)
    pub governing: Vec<Option<ContainmentLimit>>,

    // === System test ===
    /// Pre-operation t₁ used for the system test (m)
    pub t_1_system_test: Quantity,
    /// min(p_b(t₁,pre)/(γ_m·γ_SC,PC), p_mpt) (Pa)
    pub limit_system_test: Quantity,
    /// p_lt − p_e (Pa)
    pub system_test_demand: Quantity,
    /// System test demand against min(limit_burst, p_mpt)
    pub system_test_unity: Quantity,
    /// Governing system test limit per case (burst or mill test)
    pub system_test_governing: Vec<Option<ContainmentLimit>>,

    pub factors: ContainmentFactors,
    pub unity_convention: UnityConvention,
    /// Literal factors outside the code range
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub factor_warnings: Vec<FactorRangeWarning>,
}

impl ContainmentResult {
    /// Check if every case passes the containment check
    pub fn passes(&self) -> bool {
        self.unity_convention.passes(&self.containment_unity)
    }

    /// Check if every case passes the system test check
    pub fn system_test_passes(&self) -> bool {
        self.unity_convention.passes(&self.system_test_unity)
    }

    /// Governing limit of each case as text
    pub fn governing_condition(&self) -> Vec<&'static str> {
        self.governing
            .iter()
            .map(|g| g.map_or("Undetermined", |limit| limit.display_name()))
            .collect()
    }

    /// Format as a multi-line string for reports
    pub fn format_report(&self) -> String {
        format!(
            "Pressure Containment ({})\n\
             ================================================\n\
             {}\n\
             ------------------------------------------------\n\
             f_y   = {} Pa    {}, {}\n\
             p_li  = {} Pa    {}\n\
             p_lt  = {} Pa    {}\n\
             p_b   = {} Pa    {}\n\
             p_mpt = {} Pa    {}\n\
             ------------------------------------------------\n\
             Burst unity       = {}    {}\n\
             Local test unity  = {}    {}\n\
             Mill test unity   = {}    {}\n\
             Containment unity = {}    governed by {}\n\
             System test unity = {}    {}",
            self.unity_convention.display_name(),
            self.factors.format_report(),
            self.f_y, dnv_ref::CHARACTERISTIC_STRENGTH, dnv_ref::DERATING,
            self.p_li, dnv_ref::LOCAL_PRESSURES,
            self.p_lt, dnv_ref::LOCAL_PRESSURES,
            self.p_b, dnv_ref::BURST_RESISTANCE,
            self.p_mpt, dnv_ref::MILL_TEST,
            self.burst_unity, dnv_ref::PRESSURE_CONTAINMENT,
            self.local_test_unity, dnv_ref::LOCAL_TEST,
            self.mill_test_unity, dnv_ref::MILL_TEST,
            self.containment_unity, self.governing_condition().join(", "),
            self.system_test_unity, dnv_ref::PRESSURE_CONTAINMENT,
        )
    }
}

/// Run the containment check with the default DNV-ST-F101 factor tables.
///
/// # Errors
///
/// - [`CalcError::InvalidInput`] for non-positive geometry or factors
/// - [`CalcError::MissingField`] when the material has no SMTS
/// - [`CalcError::ShapeMismatch`] if array lengths disagree
/// - Material resolution errors ([`CalcError::UnresolvedMaterial`], [`CalcError::MaterialNotFound`])
pub fn calculate(input: &ContainmentInput) -> CalcResult<ContainmentResult> {
    calculate_with_tables(input, &CodeFactorTables::default())
}

/// Run the containment check against the given factor tables
pub fn calculate_with_tables(input: &ContainmentInput, tables: &CodeFactorTables) -> CalcResult<ContainmentResult> {
    input.check_shapes()?;
    let input = &input.screened()?;

    let smts = input
        .material
        .smts
        .as_ref()
        .ok_or_else(|| CalcError::missing_field("material.smts"))?;

    // Factors
    let mut resolver = FactorResolver::new(tables);
    let gamma_m = resolver.gamma_m(&input.gamma_m)?;
    let gamma_sc_pc = resolver.gamma_sc_pc(&input.gamma_sc_pc)?;
    let alpha_u = resolver.alpha_u(&input.alpha_u)?;
    let alpha_spt = resolver.alpha_spt(&input.alpha_spt)?;
    let alpha_mpt = resolver.alpha_mpt(input.alpha_mpt.as_ref(), gamma_m, gamma_sc_pc)?;
    let factor_warnings = resolver.into_warnings();

    // Geometry and strength
    let wall = characteristic_wall_thickness(&input.t_nom, &input.t_fab, &input.t_corr, &input.t_ero, input.phase);
    let t_1 = remaining_wall(&wall.t_1, "t_1")?;
    let t_min = remaining_wall(&mill_test_thickness(&input.t_nom, &input.t_fab), "t_min")?.masked_by(&t_1);
    let f_y = input.material.f_y(alpha_u)?;
    let f_u = input
        .material
        .f_u(alpha_u)?
        .ok_or_else(|| CalcError::missing_field("material.smts"))?;
    let f_cb = containment_strength(&f_y, Some(&f_u));

    // Pressures
    let g = input.g;
    let p_li = local_incidental_pressure(&input.p_d, input.gamma_inc, &input.rho_cont, &input.h_l, &input.h_ref, g);
    let p_e = external_pressure(&input.h_l, &input.rho_seawater, g);
    let p_t = system_test_pressure(&input.p_d, input.gamma_inc, alpha_spt);
    let p_lt = local_test_pressure(&p_t, &input.rho_t, &input.h_l, &input.h_ref, g);
    let p_b = burst_resistance(&input.d_o, &t_1, &f_cb);
    let p_mpt = mill_test_pressure(&input.d_o, &t_min, &input.material.smys, smts, input.k_end_cap);

    // Limits
    let limit_burst = &p_b / (gamma_m * gamma_sc_pc);
    let limit_local_test = &p_lt / alpha_spt - &p_e;
    let limit_mill_test = &p_mpt * (alpha_u / alpha_mpt);
    let demand = &p_li - &p_e;

    let governing_limit = limit_burst.min(&limit_local_test).min(&limit_mill_test);
    let governing = Quantity::argmin_cases(&[&limit_burst, &limit_local_test, &limit_mill_test])
        .into_iter()
        .map(|index| index.map(|i| ContainmentLimit::ALL[i]))
        .collect();

    let t_1_system_test = characteristic_wall_thickness(
        &input.t_nom,
        &input.t_fab,
        &input.t_corr,
        &input.t_ero,
        DesignPhase::PreOperation,
    )
    .t_1
    .masked_by(&t_1);
    let limit_burst_test = burst_resistance(&input.d_o, &t_1_system_test, &f_cb) / (gamma_m * gamma_sc_pc);
    let system_test_demand = &p_lt - &p_e;
    let limit_system_test = limit_burst_test.min(&p_mpt);
    let system_test_governing = Quantity::argmin_cases(&[&limit_burst_test, &p_mpt])
        .into_iter()
        .map(|index| {
            index.map(|i| match i {
                0 => ContainmentLimit::Burst,
                _ => ContainmentLimit::MillTest,
            })
        })
        .collect();

    let convention = input.unity_convention;
    let result = ContainmentResult {
        burst_unity: convention.express(&(&demand / &limit_burst)),
        local_test_unity: convention.express(&(&demand / &limit_local_test)),
        mill_test_unity: convention.express(&(&demand / &limit_mill_test)),
        containment_unity: convention.express(&(&demand / &governing_limit)),
        governing,
        system_test_unity: convention.express(&(&system_test_demand / &limit_system_test)),
        system_test_governing,
        t_1_system_test,
        limit_system_test,
        system_test_demand,
        hoop_stress: hoop_stress(&demand, &input.d_o, &t_1),
        t_1,
        t_min,
        f_y,
        f_u,
        f_cb,
        p_li,
        p_e,
        p_t,
        p_lt,
        p_b,
        p_mpt,
        limit_burst,
        limit_local_test,
        limit_mill_test,
        demand,
        factors: ContainmentFactors {
            gamma_m,
            gamma_sc_pc,
            alpha_u,
            alpha_spt,
            alpha_mpt,
            gamma_inc: input.gamma_inc,
        },
        unity_convention: convention,
        factor_warnings,
    };

    log::debug!(
        "containment '{}': unity {} governed by {:?}",
        input.label,
        result.containment_unity,
        result.governing
    );
    Ok(result)
}
