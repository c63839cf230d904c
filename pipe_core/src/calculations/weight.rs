//! # Pipe Weight and Buoyancy
//!
//! Mass per length of a steel pipe with internal layers (cladding, liners)
//! and external layers (anti-corrosion and concrete coatings), its contents,
//! buoyancy and submerged weight.
//!
//! ## Method
//!
//! - Internal layers are stacked inward from the pipe bore, listed from the
//!   steel surface toward the centre
//! - External layers are stacked outward from the pipe outer diameter,
//!   listed from the steel surface outward
//! - Buoyancy acts on the outermost diameter: `π/4·D_outer²·ρ_sw`
//! - Contents fill the remaining bore: `π/4·D_bore²·ρ_cont`
//!
//! ## Flotation Check
//!
//! DNV-ST-F101 Sec. 5.5.5.3 (Eq. 5.42), DNV-RP-F109 Sec. 3.2:
//!
//! ```text
//! γ_w · b / (W_sub + b) ≤ 1
//! ```
//!
//! with `b` the buoyancy force and `W_sub` the submerged weight including
//! contents, both per unit length. γ_w defaults to 1.1.
//!
//! ## Example
//!
//! ```rust
//! use pipe_core::calculations::weight::{calculate, WeightInput};
//! use pipe_core::section::{Layer, PipeDimensions};
//! use pipe_core::quantity::Quantity;
//!
//! let input = WeightInput {
//!     external_layers: vec![
//!         Layer::new(0.0032, 900.0).with_label("3LPP"),
//!         Layer::new(0.060, 3040.0).with_label("Concrete"),
//!     ],
//!     ..WeightInput::new(PipeDimensions {
//!         d_o: Some(Quantity::from(0.660)),
//!         wt: Some(Quantity::from(0.0212)),
//!         ..Default::default()
//!     })
//! };
//!
//! let result = calculate(&input).unwrap();
//! assert!((result.buoyancy_diameter.get(0) - 0.7864).abs() < 1e-12);
//! assert!(result.submerged_mass.get(0) > 0.0);
//! ```

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::{default_gravity, default_seawater_density, UnityConvention};
use crate::errors::{CalcError, CalcResult};
use crate::factors::dnv_ref;
use crate::materials::STEEL_DENSITY;
use crate::quantity::Quantity;
use crate::section::{aggregate_layers, CompositeSection, Layer, PipeDimensions, PipeSection, ReferenceDiameter};

/// Safety factor on weight for on-bottom flotation, γ_w
pub const FLOTATION_SAFETY_FACTOR: f64 = 1.1;

fn default_steel_density() -> Quantity {
    Quantity::Scalar(STEEL_DENSITY)
}

fn default_gamma_w() -> f64 {
    FLOTATION_SAFETY_FACTOR
}

/// Input parameters for a pipe weight calculation.
///
/// ## JSON Example
///
/// ```json
/// {
///   "label": "Coated line pipe",
///   "pipe": { "d_o": 0.3229, "wt": 0.0185 },
///   "internal_layers": [ { "thickness": 0.003, "density": 7000.0, "label": "CRA clad" } ],
///   "external_layers": [ { "thickness": 0.0032, "density": 900.0, "label": "3LPP" } ],
///   "contents_density": 275.0,
///   "rho_seawater": 1027.0
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightInput {
    /// User label
    #[serde(default)]
    pub label: String,

    /// Steel pipe dimensions, any two of d_o, d_i, wt
    pub pipe: PipeDimensions,

    /// Steel density (kg/m³)
    #[serde(default = "default_steel_density")]
    pub steel_density: Quantity,

    /// Layers inside the steel, listed inward from the bore
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub internal_layers: Vec<Layer>,

    /// Layers outside the steel, listed outward from the outer surface
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_layers: Vec<Layer>,

    /// Contents density (kg/m³); empty pipe when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents_density: Option<Quantity>,

    /// Seawater density (kg/m³)
    #[serde(default = "default_seawater_density")]
    pub rho_seawater: Quantity,

    /// Gravitational acceleration (m/s²)
    #[serde(default = "default_gravity")]
    pub g: f64,

    /// Flotation safety factor γ_w
    #[serde(default = "default_gamma_w")]
    pub gamma_w: f64,

    /// How the flotation unity is reported
    #[serde(default)]
    pub unity_convention: UnityConvention,
}

impl WeightInput {
    /// Bare steel pipe in seawater
    pub fn new(pipe: PipeDimensions) -> Self {
        Self {
            label: String::new(),
            pipe,
            steel_density: default_steel_density(),
            internal_layers: Vec::new(),
            external_layers: Vec::new(),
            contents_density: None,
            rho_seawater: default_seawater_density(),
            g: default_gravity(),
            gamma_w: default_gamma_w(),
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
        if self.gamma_w <= 0.0 {
            return Err(CalcError::invalid_input(
                "gamma_w",
                self.gamma_w.to_string(),
                "Flotation safety factor must be positive",
            ));
        }
        let contents_density = match &self.contents_density {
            Some(rho) => Some(rho.require("contents_density", "Contents density cannot be negative", |v| v >= 0.0)?),
            None => None,
        };
        Ok(Self {
            steel_density: self
                .steel_density
                .require("steel_density", "Steel density must be positive", |v| v > 0.0)?,
            rho_seawater: self
                .rho_seawater
                .require("rho_seawater", "Seawater density must be positive", |v| v > 0.0)?,
            contents_density,
            ..self.clone()
        })
    }
}

/// Mass, buoyancy and weight per unit length
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightResult {
    /// Resolved steel section
    pub section: PipeSection,
    /// Steel mass (kg/m)
    pub steel_mass: Quantity,
    /// Internal layer stack
    pub internal: CompositeSection,
    /// External layer stack
    pub external: CompositeSection,
    /// Free bore diameter inside the internal layers (m)
    pub bore_diameter: Quantity,
    /// Outermost diameter, used for buoyancy (m)
    pub buoyancy_diameter: Quantity,
    /// Steel plus all layers (kg/m)
    pub dry_mass: Quantity,
    /// Contents (kg/m)
    pub contents_mass: Quantity,
    /// Displaced seawater (kg/m)
    pub buoyancy_mass: Quantity,
    /// Dry mass plus contents minus buoyancy (kg/m)
    pub submerged_mass: Quantity,
    /// Submerged weight (N/m)
    pub submerged_weight: Quantity,
    /// Dry mass plus contents over the gross area (kg/m³)
    pub equivalent_density: Quantity,
    /// Equivalent density over seawater density; below 1.0 the pipe floats
    pub specific_gravity: Quantity,
    /// Buoyancy force b (N/m)
    pub buoyancy_force: Quantity,
    /// γ_w·b / (W_sub + b) in `unity_convention`
    pub flotation_unity: Quantity,
    pub gamma_w: f64,
    pub unity_convention: UnityConvention,
}

impl WeightResult {
    /// Check if every case sinks
    pub fn is_negatively_buoyant(&self) -> bool {
        self.specific_gravity.all(|sg| sg > 1.0)
    }

    /// Check if every case is stable against flotation with the safety factor
    pub fn passes(&self) -> bool {
        self.unity_convention.passes(&self.flotation_unity)
    }

    /// Format as a multi-line string for reports
    pub fn format_report(&self) -> String {
        format!(
            "Weight and Flotation ({})\n\
             ================================================\n\
             Dry mass       = {} kg/m\n\
             Contents mass  = {} kg/m\n\
             Buoyancy mass  = {} kg/m\n\
             Submerged mass = {} kg/m\n\
             Specific gravity = {}\n\
             ------------------------------------------------\n\
             gamma_w = {:.2}\n\
             Flotation unity = {}    {}",
            self.unity_convention.display_name(),
            self.dry_mass,
            self.contents_mass,
            self.buoyancy_mass,
            self.submerged_mass,
            self.specific_gravity,
            self.gamma_w,
            self.flotation_unity, dnv_ref::FLOTATION,
        )
    }
}

/// Compute mass, buoyancy and submerged weight.
///
/// # Errors
///
/// - Dimension resolution errors ([`CalcError::InsufficientDimensions`],
///   [`CalcError::DimensionInconsistency`])
/// - [`CalcError::InvalidInput`] for non-positive densities or an internal
///   stack that fills the bore
/// - [`CalcError::ShapeMismatch`] if array lengths disagree
pub fn calculate(input: &WeightInput) -> CalcResult<WeightResult> {
    let input = &input.screened()?;

    let section = input.pipe.resolve()?;
    let mut shapes = vec![
        ("pipe.d_o", &section.d_o),
        ("steel_density", &input.steel_density),
        ("rho_seawater", &input.rho_seawater),
    ];
    if let Some(rho) = &input.contents_density {
        shapes.push(("contents_density", rho));
    }
    Quantity::broadcast_len(&shapes)?;

    let steel_mass = section.mass_per_length(&input.steel_density);
    let internal = aggregate_layers(
        &ReferenceDiameter::OuterDiameter(section.d_i.clone()),
        &input.internal_layers,
        None,
    )?;
    let external = aggregate_layers(
        &ReferenceDiameter::InnerDiameter(section.d_o.clone()),
        &input.external_layers,
        None,
    )?;

    let bore_diameter = internal.equivalent_inner_diameter.clone();
    let buoyancy_diameter = external.equivalent_outer_diameter.clone();
    let gross_area = buoyancy_diameter.powi(2) * (PI / 4.0);

    let dry_mass = &steel_mass + &internal.mass_per_length + &external.mass_per_length;
    let contents_mass = match &input.contents_density {
        Some(rho) => bore_diameter.powi(2) * (PI / 4.0) * rho,
        None => Quantity::Scalar(0.0),
    };
    let buoyancy_mass = &gross_area * &input.rho_seawater;
    let submerged_mass = &dry_mass + &contents_mass - &buoyancy_mass;
    let equivalent_density = (&dry_mass + &contents_mass) / &gross_area;
    let submerged_weight = &submerged_mass * input.g;
    let buoyancy_force = &buoyancy_mass * input.g;
    let flotation = &buoyancy_force * input.gamma_w / (&submerged_weight + &buoyancy_force);

    log::debug!(
        "weight '{}': dry {} kg/m, submerged {} kg/m",
        input.label,
        dry_mass,
        submerged_mass
    );

    Ok(WeightResult {
        flotation_unity: input.unity_convention.express(&flotation),
        specific_gravity: &equivalent_density / &input.rho_seawater,
        submerged_weight,
        buoyancy_force,
        gamma_w: input.gamma_w,
        unity_convention: input.unity_convention,
        section,
        steel_mass,
        internal,
        external,
        bore_diameter,
        buoyancy_diameter,
        dry_mass,
        contents_mass,
        buoyancy_mass,
        submerged_mass,
        equivalent_density,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bare_pipe() -> WeightInput {
        WeightInput::new(PipeDimensions {
            d_o: Some(Quantity::from(0.3229)),
            wt: Some(Quantity::from(0.0185)),
            ..Default::default()
        })
    }

    #[test]
    fn test_bare_pipe() {
        let r = calculate(&bare_pipe()).unwrap();
        let area = PI / 4.0 * (0.3229_f64.powi(2) - 0.2859_f64.powi(2));
        assert_relative_eq!(r.steel_mass.get(0), area * 7850.0, max_relative = 1e-12);
        assert_eq!(r.dry_mass, r.steel_mass);
        assert_eq!(r.contents_mass.get(0), 0.0);
        assert_relative_eq!(r.buoyancy_mass.get(0), PI / 4.0 * 0.3229_f64.powi(2) * 1025.0, max_relative = 1e-12);
        assert!(r.is_negatively_buoyant());
    }

    #[test]
    fn test_clad_pipe_matches_layer_stack() {
        // Steel wall plus 3 mm cladding equals the two-layer inward stack from d_o
        let mut input = bare_pipe();
        input.internal_layers = vec![Layer::new(0.003, 7000.0)];
        let r = calculate(&input).unwrap();
        assert_relative_eq!(r.dry_mass.get(0), 157.54267202070224, max_relative = 1e-10);
        assert!((r.bore_diameter.get(0) - 0.2799).abs() < 1e-12);
    }

    #[test]
    fn test_coating_and_contents() {
        let mut input = bare_pipe();
        input.external_layers = vec![Layer::new(0.05, 2400.0)];
        input.contents_density = Some(Quantity::from(1000.0));
        let r = calculate(&input).unwrap();

        assert!((r.buoyancy_diameter.get(0) - 0.4229).abs() < 1e-12);
        let coating = PI / 4.0 * (0.4229_f64.powi(2) - 0.3229_f64.powi(2)) * 2400.0;
        assert_relative_eq!(r.external.mass_per_length.get(0), coating, max_relative = 1e-12);
        let contents = PI / 4.0 * 0.2859_f64.powi(2) * 1000.0;
        assert_relative_eq!(r.contents_mass.get(0), contents, max_relative = 1e-12);

        let expected = r.dry_mass.get(0) + contents - r.buoyancy_mass.get(0);
        assert_relative_eq!(r.submerged_mass.get(0), expected, max_relative = 1e-12);
        assert_relative_eq!(r.submerged_weight.get(0), expected * 9.80665, max_relative = 1e-12);
        assert_relative_eq!(
            r.specific_gravity.get(0),
            (r.dry_mass.get(0) + contents) / r.buoyancy_mass.get(0),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_buoyant_pipe() {
        let mut input = bare_pipe();
        input.external_layers = vec![Layer::new(0.1, 100.0)];
        let r = calculate(&input).unwrap();
        assert!(r.submerged_mass.get(0) < 0.0);
        assert!(!r.is_negatively_buoyant());
    }

    #[test]
    fn test_array_of_wall_thicknesses() {
        let mut input = bare_pipe();
        input.pipe.wt = Some(Quantity::from(vec![0.0159, 0.0185, 0.0206]));
        let r = calculate(&input).unwrap();
        assert_eq!(r.steel_mass.len(), 3);
        let masses = r.steel_mass.to_vec();
        assert!(masses[0] < masses[1] && masses[1] < masses[2]);
        assert_eq!(r.buoyancy_mass.len(), 1);
    }

    #[test]
    fn test_flotation_check() {
        let r = calculate(&bare_pipe()).unwrap();
        assert_relative_eq!(r.flotation_unity.get(0), 0.6648238882740977, max_relative = 1e-10);
        assert_relative_eq!(r.flotation_unity.get(0), 1.1 / r.specific_gravity.get(0), max_relative = 1e-12);
        assert!(r.passes());

        let mut light = bare_pipe();
        light.external_layers = vec![Layer::new(0.1, 100.0)];
        assert!(!calculate(&light).unwrap().passes());
    }

    #[test]
    fn test_flotation_of_clad_coated_pipe() {
        // Clad pipe with a seven-layer coating and gas contents
        let input = WeightInput {
            internal_layers: vec![Layer::new(0.003, 8000.0)],
            external_layers: vec![
                Layer::new(0.0003, 1300.0),
                Layer::new(0.0003, 900.0),
                Layer::new(0.0094, 900.0),
                Layer::new(0.031, 620.0),
                Layer::new(0.003, 900.0),
                Layer::new(0.031, 620.0),
                Layer::new(0.004, 900.0),
            ],
            contents_density: Some(Quantity::from(10.0)),
            rho_seawater: Quantity::from(1027.0),
            ..bare_pipe()
        };
        let r = calculate(&input).unwrap();
        assert!((r.buoyancy_diameter.get(0) - 0.4809).abs() < 1e-12);
        assert_relative_eq!(r.dry_mass.get(0), 227.85600808553642, max_relative = 1e-10);
        assert_relative_eq!(r.submerged_weight.get(0), 411.2146016234786, max_relative = 1e-9);
        assert_relative_eq!(r.buoyancy_force.get(0), 1829.323673569696, max_relative = 1e-10);
        assert_relative_eq!(r.flotation_unity.get(0), 0.8981127719200303, max_relative = 1e-10);
        assert!(r.passes());

        let mut reserve = input.clone();
        reserve.unity_convention = UnityConvention::CapacityOverDemand;
        let r = calculate(&reserve).unwrap();
        assert_relative_eq!(r.flotation_unity.get(0), 1.0 / 0.8981127719200303, max_relative = 1e-10);
        assert!(r.passes());
    }

    #[test]
    fn test_report_cites_flotation_clause() {
        let report = calculate(&bare_pipe()).unwrap().format_report();
        assert!(report.contains("gamma_w = 1.10"));
        assert!(report.contains(dnv_ref::FLOTATION));
    }

    #[test]
    fn test_negative_density_case_is_blanked() {
        let mut input = bare_pipe();
        input.steel_density = Quantity::from(vec![7850.0, -7850.0]);
        let r = calculate(&input).unwrap();
        assert!(r.dry_mass.get(0).is_finite());
        assert!(r.dry_mass.get(1).is_nan());
        assert!(r.flotation_unity.get(1).is_nan());

        input.steel_density = Quantity::from(-7850.0);
        assert_eq!(calculate(&input).unwrap_err().error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_oversized_liner_rejected() {
        let mut input = bare_pipe();
        input.internal_layers = vec![Layer::new(0.2, 900.0)];
        assert_eq!(calculate(&input).unwrap_err().error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_insufficient_dimensions() {
        let input = WeightInput::new(PipeDimensions {
            d_o: Some(Quantity::from(0.3229)),
            ..Default::default()
        });
        assert_eq!(calculate(&input).unwrap_err().error_code(), "INSUFFICIENT_DIMENSIONS");
    }

    #[test]
    fn test_json_input() {
        let json = r#"{
            "pipe": { "d_i": 0.2859, "wt": 0.0185 },
            "external_layers": [ { "thickness": 0.0032, "density": 900.0, "label": "3LPP" } ]
        }"#;
        let input: WeightInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.external_layers[0].label.as_deref(), Some("3LPP"));
        let r = calculate(&input).unwrap();
        assert!((r.section.d_o.get(0) - 0.3229).abs() < 1e-12);
    }
}
