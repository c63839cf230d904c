//! # Limit-State Calculations
//!
//! Each calculation follows the pattern:
//!
//! - `*Input` - Input parameters (JSON-serializable, code defaults filled in by serde)
//! - `*Result` - Calculation results (JSON-serializable)
//! - `calculate(input) -> CalcResult<*Result>` - Pure calculation function using
//!   the default DNV-ST-F101 factor tables
//! - `calculate_with_tables(input, tables)` - Same, against caller-supplied tables
//!
//! Every numeric input is a [`Quantity`], so one input describes either a
//! single load case or a batch of them. Array inputs must share a length
//! (length-1 arrays broadcast like scalars).
//!
//! ## Available Calculations
//!
//! - [`containment`] - Pressure containment (burst, local test, mill test)
//! - [`collapse`] - External pressure collapse
//! - [`propagation`] - Propagation buckling and buckle arrestors
//! - [`weight`] - Coated and lined pipe mass, buoyancy and submerged weight

pub mod collapse;
pub mod containment;
pub mod propagation;
pub mod weight;

use serde::{Deserialize, Serialize};

use crate::equations::pressure::{END_CAP_FACTOR, GAMMA_INC, STANDARD_GRAVITY};
use crate::errors::CalcResult;
use crate::factors::{CodeFactorTables, FabricationMethod, FactorSpec, LimitState, SafetyClass, StrengthBasis};
use crate::quantity::Quantity;

pub use collapse::{CollapseInput, CollapseResult};
pub use containment::{ContainmentInput, ContainmentLimit, ContainmentResult};
pub use propagation::{BuckleArrestor, PropagationInput, PropagationResult};
pub use weight::{WeightInput, WeightResult};

/// Seawater density used when none is given (kg/m³)
pub const SEAWATER_DENSITY: f64 = 1025.0;

// ============================================================================
// Unity Convention
// ============================================================================

/// How unity ratios are reported.
///
/// Calculations work internally with the utilisation `demand / capacity`.
/// The convention decides what is written to the result.
///
/// | Convention           | Reported value      | Passes when |
/// |----------------------|---------------------|-------------|
/// | `DemandOverCapacity` | demand / capacity   | ≤ 1.0       |
/// | `CapacityOverDemand` | capacity / demand   | ≥ 1.0       |
///
/// Under `CapacityOverDemand` a non-positive demand reports `+∞`, which
/// serializes to JSON `null`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnityConvention {
    #[default]
    DemandOverCapacity,
    CapacityOverDemand,
}

impl UnityConvention {
    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            UnityConvention::DemandOverCapacity => "Demand / Capacity",
            UnityConvention::CapacityOverDemand => "Capacity / Demand",
        }
    }

    /// Express a utilisation (demand / capacity) in this convention
    ///
    /// ```rust
    /// use pipe_core::calculations::UnityConvention;
    /// use pipe_core::quantity::Quantity;
    ///
    /// let u = Quantity::from(vec![0.5, 2.0, -1.0]);
    /// let reserve = UnityConvention::CapacityOverDemand.express(&u);
    /// assert_eq!(reserve.to_vec(), vec![2.0, 0.5, f64::INFINITY]);
    /// ```
    pub fn express(&self, utilisation: &Quantity) -> Quantity {
        match self {
            UnityConvention::DemandOverCapacity => utilisation.clone(),
            UnityConvention::CapacityOverDemand => utilisation.map(|u| {
                if u.is_nan() {
                    f64::NAN
                } else if u <= 0.0 {
                    f64::INFINITY
                } else {
                    1.0 / u
                }
            }),
        }
    }

    /// Whether a single reported value passes. `NaN` never passes.
    pub fn value_passes(&self, value: f64) -> bool {
        match self {
            UnityConvention::DemandOverCapacity => value <= 1.0,
            UnityConvention::CapacityOverDemand => value >= 1.0,
        }
    }

    /// Whether every case of a reported unity passes
    pub fn passes(&self, unity: &Quantity) -> bool {
        unity.all(|v| self.value_passes(v))
    }
}

// ============================================================================
// Serde defaults
// ============================================================================

pub(crate) fn default_gravity() -> f64 {
    STANDARD_GRAVITY
}

pub(crate) fn default_gamma_inc() -> f64 {
    GAMMA_INC
}

pub(crate) fn default_end_cap_factor() -> f64 {
    END_CAP_FACTOR
}

pub(crate) fn default_zero() -> Quantity {
    Quantity::Scalar(0.0)
}

pub(crate) fn default_seawater_density() -> Quantity {
    Quantity::Scalar(SEAWATER_DENSITY)
}

pub(crate) fn default_gamma_m() -> FactorSpec<LimitState> {
    FactorSpec::Category(LimitState::Ultimate)
}

pub(crate) fn default_safety_class() -> FactorSpec<SafetyClass> {
    FactorSpec::Category(SafetyClass::Medium)
}

pub(crate) fn default_alpha_u() -> FactorSpec<StrengthBasis> {
    FactorSpec::Category(StrengthBasis::Normal)
}

pub(crate) fn default_alpha_fab() -> FactorSpec<FabricationMethod> {
    FactorSpec::Category(FabricationMethod::Seamless)
}

// ============================================================================
// Calculation dispatch
// ============================================================================

/// Enum wrapper for all calculation types.
///
/// Stores heterogeneous calculations in a single collection and dispatches
/// each to its calculation.
///
/// ## JSON Example
///
/// ```json
/// {
///   "type": "Collapse",
///   "label": "KP 12.4",
///   "d_o": 0.6176,
///   "t_nom": 0.0212,
///   "t_fab": 0.001,
///   "t_corr": 0.0005,
///   "material": { "smys": 450.0e6, "temperature": 60.0, "family": "CMn" },
///   "h_l": -340.0
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CalculationItem {
    /// Pressure containment check
    Containment(ContainmentInput),
    /// External pressure collapse check
    Collapse(CollapseInput),
    /// Propagation buckling check
    Propagation(PropagationInput),
    /// Mass and submerged weight
    Weight(WeightInput),
}

impl CalculationItem {
    /// Get the user-provided label for this calculation
    pub fn label(&self) -> &str {
        match self {
            CalculationItem::Containment(c) => &c.label,
            CalculationItem::Collapse(c) => &c.label,
            CalculationItem::Propagation(p) => &p.label,
            CalculationItem::Weight(w) => &w.label,
        }
    }

    /// Get the calculation type as a string
    pub fn calc_type(&self) -> &'static str {
        match self {
            CalculationItem::Containment(_) => "Containment",
            CalculationItem::Collapse(_) => "Collapse",
            CalculationItem::Propagation(_) => "Propagation",
            CalculationItem::Weight(_) => "Weight",
        }
    }

    /// Run the calculation with the default factor tables
    pub fn calculate(&self) -> CalcResult<CalculationOutput> {
        self.calculate_with_tables(&CodeFactorTables::default())
    }

    /// Run the calculation against the given factor tables
    pub fn calculate_with_tables(&self, tables: &CodeFactorTables) -> CalcResult<CalculationOutput> {
        log::debug!("running {} calculation '{}'", self.calc_type(), self.label());
        Ok(match self {
            CalculationItem::Containment(input) => {
                CalculationOutput::Containment(containment::calculate_with_tables(input, tables)?)
            }
            CalculationItem::Collapse(input) => {
                CalculationOutput::Collapse(collapse::calculate_with_tables(input, tables)?)
            }
            CalculationItem::Propagation(input) => {
                CalculationOutput::Propagation(propagation::calculate_with_tables(input, tables)?)
            }
            CalculationItem::Weight(input) => CalculationOutput::Weight(weight::calculate(input)?),
        })
    }
}

/// Result of any [`CalculationItem`]
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum CalculationOutput {
    Containment(ContainmentResult),
    Collapse(CollapseResult),
    Propagation(PropagationResult),
    Weight(WeightResult),
}

impl CalculationOutput {
    /// Pass/fail of the code check (flotation for the weight calculation)
    pub fn passes(&self) -> bool {
        match self {
            CalculationOutput::Containment(r) => r.passes(),
            CalculationOutput::Collapse(r) => r.passes(),
            CalculationOutput::Propagation(r) => r.passes(),
            CalculationOutput::Weight(r) => r.passes(),
        }
    }

    /// Text report citing the code clauses behind each value
    pub fn format_report(&self) -> String {
        match self {
            CalculationOutput::Containment(r) => r.format_report(),
            CalculationOutput::Collapse(r) => r.format_report(),
            CalculationOutput::Propagation(r) => r.format_report(),
            CalculationOutput::Weight(r) => r.format_report(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unity_conventions() {
        let u = Quantity::from(vec![0.8, 1.25]);
        let demand = UnityConvention::DemandOverCapacity;
        let reserve = UnityConvention::CapacityOverDemand;

        assert_eq!(demand.express(&u), u);
        let r = reserve.express(&u);
        assert!((r.get(0) - 1.25).abs() < 1e-12);
        assert!((r.get(1) - 0.8).abs() < 1e-12);

        assert!(demand.value_passes(0.8));
        assert!(!demand.value_passes(1.25));
        assert!(reserve.value_passes(1.25));
        assert!(reserve.value_passes(f64::INFINITY));
        assert!(!reserve.value_passes(f64::NAN));
        assert!(!demand.passes(&u));
    }

    #[test]
    fn test_item_dispatch_from_json() {
        let json = r#"{
            "type": "Collapse",
            "label": "KP 12.4",
            "d_o": 0.6176,
            "t_nom": 0.0212,
            "t_fab": 0.001,
            "t_corr": 0.0005,
            "material": { "smys": 450.0e6, "temperature": 60.0, "family": "CMn" },
            "alpha_u": 1.0,
            "h_l": -340.0
        }"#;
        let item: CalculationItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.label(), "KP 12.4");
        assert_eq!(item.calc_type(), "Collapse");

        let output = item.calculate().unwrap();
        assert!(output.passes());
        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["type"], "Collapse");
    }

    #[test]
    fn test_weight_reports_flotation() {
        let json = r#"{ "type": "Weight", "pipe": { "d_o": 0.3229, "wt": 0.0185 } }"#;
        let item: CalculationItem = serde_json::from_str(json).unwrap();
        assert!(item.calculate().unwrap().passes());

        let json = r#"{
            "type": "Weight",
            "pipe": { "d_o": 0.3229, "wt": 0.0185 },
            "external_layers": [ { "thickness": 0.1, "density": 100.0 } ]
        }"#;
        let item: CalculationItem = serde_json::from_str(json).unwrap();
        assert!(!item.calculate().unwrap().passes());
    }
}
