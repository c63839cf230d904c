//! # DNV-ST-F101 Safety and Strength Factors
//!
//! Partial safety factors and strength factors for limit-state checks per
//! DNV-ST-F101 (2017-12).
//!
//! ## Overview
//!
//! Each factor is given either as a literal number or as a category that is
//! looked up in [`CodeFactorTables`]:
//!
//! ```json
//! { "gamma_m": "ULS", "gamma_sc_pc": "medium", "alpha_fab": 0.93 }
//! ```
//!
//! ## Factor Summary
//!
//! | Factor   | Description                       | Keyed by         | Range         |
//! |----------|-----------------------------------|------------------|---------------|
//! | γ_m      | Material resistance factor        | Limit state      | 1.00 - 1.15   |
//! | γ_SC,PC  | Safety class, pressure containment| Safety class     | 1.046 - 1.308 |
//! | γ_SC,LB  | Safety class, local buckling      | Safety class     | 1.04 - 1.26   |
//! | α_spt    | System pressure test factor       | Safety class     | 1.03 - 1.05   |
//! | α_mpt    | Mill pressure test factor         | Safety class     | 1.000 - 1.251 |
//! | α_U      | Material strength factor          | Strength basis   | 0.96 - 1.00   |
//! | α_fab    | Fabrication factor                | Pipe fabrication | 0.85 - 1.00   |
//!
//! A literal outside its range is accepted, logged at `warn` level and
//! reported as a [`FactorRangeWarning`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};

// ============================================================================
// DNV-ST-F101 Clause References
// ============================================================================

/// DNV-ST-F101 (2017-12) clause references for traceable results.
pub mod dnv_ref {
    // Factor tables
    /// Material resistance factor γ_m
    pub const GAMMA_M: &str = "DNV-ST-F101 Table 5-1";
    /// Safety class resistance factors γ_SC
    pub const GAMMA_SC: &str = "DNV-ST-F101 Table 5-2";
    /// Material strength factor α_U
    pub const ALPHA_U: &str = "DNV-ST-F101 Table 5-3";
    /// Fabrication factor α_fab
    pub const ALPHA_FAB: &str = "DNV-ST-F101 Table 5-4";
    /// Pressure test factors α_spt, α_mpt
    pub const PRESSURE_TEST_FACTORS: &str = "DNV-ST-F101 Table 5-8";

    // Material
    /// Characteristic yield and tensile strength
    pub const CHARACTERISTIC_STRENGTH: &str = "DNV-ST-F101 Eq. 5.4/5.5";
    /// Temperature derating curves
    pub const DERATING: &str = "DNV-ST-F101 Fig. 5-2";

    // Pressures
    /// Incidental and local test pressures
    pub const LOCAL_PRESSURES: &str = "DNV-ST-F101 Eq. 4.1/4.2";
    /// Pressure containment criterion
    pub const PRESSURE_CONTAINMENT: &str = "DNV-ST-F101 Eq. 5.6";
    /// Local test pressure criterion
    pub const LOCAL_TEST: &str = "DNV-ST-F101 Eq. 5.7";
    /// Burst resistance p_b(t)
    pub const BURST_RESISTANCE: &str = "DNV-ST-F101 Eq. 5.8";
    /// Mill test pressure
    pub const MILL_TEST: &str = "DNV-ST-F101 Eq. 7.3";

    // Buckling
    /// External pressure (collapse) criterion
    pub const COLLAPSE: &str = "DNV-ST-F101 Eq. 5.10";
    /// Characteristic collapse pressure cubic
    pub const COLLAPSE_PRESSURE: &str = "DNV-ST-F101 Eq. 5.11";
    /// Ovality
    pub const OVALITY: &str = "DNV-ST-F101 Eq. 5.14";
    /// Propagating buckle criterion
    pub const PROPAGATION: &str = "DNV-ST-F101 Eq. 5.15";
    /// Propagating buckle pressure
    pub const PROPAGATION_PRESSURE: &str = "DNV-ST-F101 Eq. 5.16";
    /// Buckle arrestor criterion
    pub const BUCKLE_ARRESTOR: &str = "DNV-ST-F101 Eq. 5.17/5.18";

    // Stability
    /// On-bottom flotation criterion
    pub const FLOTATION: &str = "DNV-ST-F101 Eq. 5.42";
}

// ============================================================================
// Factor Categories
// ============================================================================

/// Limit state category, selects γ_m
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LimitState {
    /// Serviceability limit state
    #[serde(rename = "SLS")]
    Serviceability,
    /// Ultimate limit state
    #[default]
    #[serde(rename = "ULS")]
    Ultimate,
    /// Accidental limit state
    #[serde(rename = "ALS")]
    Accidental,
    /// Fatigue limit state
    #[serde(rename = "FLS")]
    Fatigue,
}

impl LimitState {
    /// All limit states
    pub const ALL: [LimitState; 4] = [
        LimitState::Serviceability,
        LimitState::Ultimate,
        LimitState::Accidental,
        LimitState::Fatigue,
    ];

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            LimitState::Serviceability => "SLS",
            LimitState::Ultimate => "ULS",
            LimitState::Accidental => "ALS",
            LimitState::Fatigue => "FLS",
        }
    }
}

/// Safety class, selects γ_SC,PC, γ_SC,LB, α_spt and α_mpt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyClass {
    /// Low consequence of failure
    Low,
    /// Medium consequence (typical for operation of hydrocarbon lines)
    Medium,
    /// High consequence (e.g. near platforms)
    High,
}

impl SafetyClass {
    /// All safety classes
    pub const ALL: [SafetyClass; 3] = [SafetyClass::Low, SafetyClass::Medium, SafetyClass::High];

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            SafetyClass::Low => "Low",
            SafetyClass::Medium => "Medium",
            SafetyClass::High => "High",
        }
    }
}

/// Material strength basis, selects α_U
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrengthBasis {
    /// Normal material: α_U = 0.96
    #[serde(rename = "normal")]
    Normal,
    /// Supplementary requirement U fulfilled: α_U = 1.00
    #[serde(rename = "U")]
    SupplementaryU,
}

impl StrengthBasis {
    /// All strength bases
    pub const ALL: [StrengthBasis; 2] = [StrengthBasis::Normal, StrengthBasis::SupplementaryU];
}

/// Pipe fabrication process, selects α_fab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FabricationMethod {
    /// Seamless pipe
    #[serde(rename = "seamless", alias = "SMLS")]
    Seamless,
    /// UO pipe
    #[serde(rename = "UO")]
    Uo,
    /// Three-roll bending
    #[serde(rename = "TRB")]
    Trb,
    /// Electric resistance welded
    #[serde(rename = "ERW")]
    Erw,
    /// High-frequency welded
    #[serde(rename = "HFW")]
    Hfw,
    /// UO pipe with expansion
    #[serde(rename = "UOE")]
    Uoe,
}

impl FabricationMethod {
    /// All fabrication methods
    pub const ALL: [FabricationMethod; 6] = [
        FabricationMethod::Seamless,
        FabricationMethod::Uo,
        FabricationMethod::Trb,
        FabricationMethod::Erw,
        FabricationMethod::Hfw,
        FabricationMethod::Uoe,
    ];
}

// ============================================================================
// Factor Tables
// ============================================================================

/// Permitted range for a factor value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorRange {
    pub min: f64,
    pub max: f64,
}

impl FactorRange {
    /// Inclusive range check; `NaN` is out of range
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// A literal factor fell outside its code range.
///
/// Non-fatal: the literal is still used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorRangeWarning {
    /// Factor name (e.g., "gamma_m")
    pub factor: String,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

impl fmt::Display for FactorRangeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} = {} is outside the code range [{}, {}]",
            self.factor, self.value, self.min, self.max
        )
    }
}

/// A factor given as a literal value or a table category.
///
/// Deserializes from a bare number or a category string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactorSpec<K> {
    Value(f64),
    Category(K),
}

impl<K> From<f64> for FactorSpec<K> {
    fn from(value: f64) -> Self {
        FactorSpec::Value(value)
    }
}

/// Lookup table for one factor
#[derive(Debug, Clone, PartialEq)]
pub struct FactorTable<K> {
    pub entries: Vec<(K, f64)>,
    pub range: FactorRange,
}

impl<K: Copy + PartialEq + fmt::Debug> FactorTable<K> {
    fn new(entries: &[(K, f64)], min: f64, max: f64) -> Self {
        Self {
            entries: entries.to_vec(),
            range: FactorRange { min, max },
        }
    }

    /// Value for a category, if present
    pub fn lookup(&self, key: K) -> Option<f64> {
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    /// Resolve a literal or category to a value.
    ///
    /// Returns the value and, for out-of-range literals, a warning (also
    /// logged). A category missing from the table is an `InvalidInput` error.
    pub fn resolve(&self, factor: &str, spec: &FactorSpec<K>) -> CalcResult<(f64, Option<FactorRangeWarning>)> {
        match spec {
            FactorSpec::Category(key) => self
                .lookup(*key)
                .map(|value| (value, None))
                .ok_or_else(|| {
                    CalcError::invalid_input(factor, format!("{:?}", key), "Category not present in factor table")
                }),
            FactorSpec::Value(value) => {
                if self.range.contains(*value) {
                    return Ok((*value, None));
                }
                let warning = FactorRangeWarning {
                    factor: factor.to_string(),
                    value: *value,
                    min: self.range.min,
                    max: self.range.max,
                };
                log::warn!("{}", warning);
                Ok((*value, Some(warning)))
            }
        }
    }
}

/// Immutable set of factor tables.
///
/// `Default` gives the DNV-ST-F101 (2017-12) values.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeFactorTables {
    pub gamma_m: FactorTable<LimitState>,
    pub gamma_sc_pc: FactorTable<SafetyClass>,
    pub gamma_sc_lb: FactorTable<SafetyClass>,
    pub alpha_spt: FactorTable<SafetyClass>,
    pub alpha_mpt: FactorTable<SafetyClass>,
    pub alpha_u: FactorTable<StrengthBasis>,
    pub alpha_fab: FactorTable<FabricationMethod>,
}

impl Default for CodeFactorTables {
    fn default() -> Self {
        use FabricationMethod as Fab;
        use SafetyClass::{High, Low, Medium};

        Self {
            gamma_m: FactorTable::new(
                &[
                    (LimitState::Serviceability, 1.15),
                    (LimitState::Ultimate, 1.15),
                    (LimitState::Accidental, 1.15),
                    (LimitState::Fatigue, 1.00),
                ],
                1.00,
                1.15,
            ),
            gamma_sc_pc: FactorTable::new(&[(Low, 1.046), (Medium, 1.138), (High, 1.308)], 1.046, 1.308),
            gamma_sc_lb: FactorTable::new(&[(Low, 1.04), (Medium, 1.14), (High, 1.26)], 1.04, 1.26),
            alpha_spt: FactorTable::new(&[(Low, 1.03), (Medium, 1.05), (High, 1.05)], 1.03, 1.05),
            alpha_mpt: FactorTable::new(&[(Low, 1.000), (Medium, 1.088), (High, 1.251)], 1.000, 1.251),
            alpha_u: FactorTable::new(
                &[(StrengthBasis::Normal, 0.96), (StrengthBasis::SupplementaryU, 1.00)],
                0.96,
                1.00,
            ),
            alpha_fab: FactorTable::new(
                &[
                    (Fab::Seamless, 1.00),
                    (Fab::Uo, 0.93),
                    (Fab::Trb, 0.93),
                    (Fab::Erw, 0.93),
                    (Fab::Hfw, 0.93),
                    (Fab::Uoe, 0.85),
                ],
                0.85,
                1.00,
            ),
        }
    }
}

/// Mill pressure test factor derived from the containment factors:
/// α_mpt = γ_m·γ_SC,PC·0.96·√3/2
pub fn derived_alpha_mpt(gamma_m: f64, gamma_sc_pc: f64) -> f64 {
    gamma_m * gamma_sc_pc * 0.96 * 3.0_f64.sqrt() / 2.0
}

/// Resolves factor specs against a table set and collects range warnings.
///
/// ```rust
/// use pipe_core::factors::{CodeFactorTables, FactorResolver, FactorSpec, LimitState};
///
/// let tables = CodeFactorTables::default();
/// let mut factors = FactorResolver::new(&tables);
/// let gamma_m = factors.gamma_m(&FactorSpec::Category(LimitState::Ultimate)).unwrap();
/// assert_eq!(gamma_m, 1.15);
///
/// factors.gamma_m(&FactorSpec::Value(1.3)).unwrap();
/// assert_eq!(factors.into_warnings().len(), 1);
/// ```
#[derive(Debug)]
pub struct FactorResolver<'a> {
    tables: &'a CodeFactorTables,
    warnings: Vec<FactorRangeWarning>,
}

impl<'a> FactorResolver<'a> {
    pub fn new(tables: &'a CodeFactorTables) -> Self {
        Self {
            tables,
            warnings: Vec::new(),
        }
    }

    fn take<K: Copy + PartialEq + fmt::Debug>(
        &mut self,
        table: &FactorTable<K>,
        factor: &str,
        spec: &FactorSpec<K>,
    ) -> CalcResult<f64> {
        let (value, warning) = table.resolve(factor, spec)?;
        self.warnings.extend(warning);
        Ok(value)
    }

    /// γ_m
    pub fn gamma_m(&mut self, spec: &FactorSpec<LimitState>) -> CalcResult<f64> {
        let tables = self.tables;
        self.take(&tables.gamma_m, "gamma_m", spec)
    }

    /// γ_SC,PC
    pub fn gamma_sc_pc(&mut self, spec: &FactorSpec<SafetyClass>) -> CalcResult<f64> {
        let tables = self.tables;
        self.take(&tables.gamma_sc_pc, "gamma_sc_pc", spec)
    }

    /// γ_SC,LB
    pub fn gamma_sc_lb(&mut self, spec: &FactorSpec<SafetyClass>) -> CalcResult<f64> {
        let tables = self.tables;
        self.take(&tables.gamma_sc_lb, "gamma_sc_lb", spec)
    }

    /// α_spt
    pub fn alpha_spt(&mut self, spec: &FactorSpec<SafetyClass>) -> CalcResult<f64> {
        let tables = self.tables;
        self.take(&tables.alpha_spt, "alpha_spt", spec)
    }

    /// α_mpt, derived from γ_m and γ_SC,PC when not given
    pub fn alpha_mpt(
        &mut self,
        spec: Option<&FactorSpec<SafetyClass>>,
        gamma_m: f64,
        gamma_sc_pc: f64,
    ) -> CalcResult<f64> {
        match spec {
            Some(spec) => {
                let tables = self.tables;
                self.take(&tables.alpha_mpt, "alpha_mpt", spec)
            }
            None => Ok(derived_alpha_mpt(gamma_m, gamma_sc_pc)),
        }
    }

    /// α_U
    pub fn alpha_u(&mut self, spec: &FactorSpec<StrengthBasis>) -> CalcResult<f64> {
        let tables = self.tables;
        self.take(&tables.alpha_u, "alpha_u", spec)
    }

    /// α_fab
    pub fn alpha_fab(&mut self, spec: &FactorSpec<FabricationMethod>) -> CalcResult<f64> {
        let tables = self.tables;
        self.take(&tables.alpha_fab, "alpha_fab", spec)
    }

    /// Warnings collected so far
    pub fn into_warnings(self) -> Vec<FactorRangeWarning> {
        self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tables() {
        let t = CodeFactorTables::default();
        assert_eq!(t.gamma_m.lookup(LimitState::Fatigue), Some(1.00));
        assert_eq!(t.gamma_sc_pc.lookup(SafetyClass::Medium), Some(1.138));
        assert_eq!(t.gamma_sc_lb.lookup(SafetyClass::High), Some(1.26));
        assert_eq!(t.alpha_spt.lookup(SafetyClass::Low), Some(1.03));
        assert_eq!(t.alpha_mpt.lookup(SafetyClass::Medium), Some(1.088));
        assert_eq!(t.alpha_u.lookup(StrengthBasis::Normal), Some(0.96));
        assert_eq!(t.alpha_fab.lookup(FabricationMethod::Uoe), Some(0.85));
    }

    #[test]
    fn test_every_category_in_range() {
        let t = CodeFactorTables::default();
        for ls in LimitState::ALL {
            assert!(t.gamma_m.range.contains(t.gamma_m.lookup(ls).unwrap()));
        }
        for sc in SafetyClass::ALL {
            assert!(t.gamma_sc_pc.range.contains(t.gamma_sc_pc.lookup(sc).unwrap()));
            assert!(t.alpha_mpt.range.contains(t.alpha_mpt.lookup(sc).unwrap()));
        }
        for fab in FabricationMethod::ALL {
            assert!(t.alpha_fab.range.contains(t.alpha_fab.lookup(fab).unwrap()));
        }
    }

    #[test]
    fn test_out_of_range_literal_warns() {
        let t = CodeFactorTables::default();
        let (value, warning) = t.gamma_sc_pc.resolve("gamma_sc_pc", &FactorSpec::Value(1.5)).unwrap();
        assert_eq!(value, 1.5);
        let warning = warning.unwrap();
        assert_eq!(warning.min, 1.046);
        assert!(warning.to_string().contains("gamma_sc_pc"));

        let (_, none) = t.gamma_sc_pc.resolve("gamma_sc_pc", &FactorSpec::Value(1.2)).unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_derived_alpha_mpt() {
        // ULS, medium: 1.15 * 1.138 * 0.96 * 0.866 = 1.088
        let alpha = derived_alpha_mpt(1.15, 1.138);
        assert!((alpha - 1.088).abs() < 1e-3);

        let tables = CodeFactorTables::default();
        let mut r = FactorResolver::new(&tables);
        assert_eq!(r.alpha_mpt(None, 1.15, 1.138).unwrap(), alpha);
    }

    #[test]
    fn test_spec_deserialization() {
        let spec: FactorSpec<LimitState> = serde_json::from_str("\"FLS\"").unwrap();
        assert_eq!(spec, FactorSpec::Category(LimitState::Fatigue));

        let spec: FactorSpec<SafetyClass> = serde_json::from_str("1.2").unwrap();
        assert_eq!(spec, FactorSpec::Value(1.2));

        let spec: FactorSpec<FabricationMethod> = serde_json::from_str("\"UOE\"").unwrap();
        assert_eq!(spec, FactorSpec::Category(FabricationMethod::Uoe));

        let spec: FactorSpec<StrengthBasis> = serde_json::from_str("\"U\"").unwrap();
        assert_eq!(spec, FactorSpec::Category(StrengthBasis::SupplementaryU));
    }

    #[test]
    fn test_custom_table_missing_category() {
        let mut tables = CodeFactorTables::default();
        tables.alpha_fab.entries.retain(|(k, _)| *k != FabricationMethod::Uoe);
        let mut r = FactorResolver::new(&tables);
        let err = r.alpha_fab(&FactorSpec::Category(FabricationMethod::Uoe)).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }
}
