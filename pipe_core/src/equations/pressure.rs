//! # Pressure Formulas
//!
//! Internal and external pressures, pressure resistances and hoop stress
//! for pressure containment checks.
//!
//! ## Notation
//!
//! - `p_d` = Design pressure at the reference elevation
//! - `γ_inc` = Incidental to design pressure ratio (typically 1.1)
//! - `h_l` = Elevation of the local point (negative below sea level)
//! - `h_ref` = Elevation of the pressure reference point
//! - `ρ` = Density of contents, test fluid or seawater
//! - `D` = Outer diameter, `t` = wall thickness
//!
//! ## Sign Conventions
//!
//! - Elevations positive upward; a point below the reference sees extra head
//! - Pressures positive in compression on the wall from the loaded side
//!
//! ## References
//!
//! - DNV-ST-F101 (2017-12) Sec. 4.2.2 (Eq. 4.1-4.3), Sec. 5.4.2 (Eq. 5.6-5.8)
//! - DNV-ST-F101 (2017-12) Sec. 7.5.1 (Eq. 7.3)

use crate::quantity::Quantity;

/// Standard gravity (m/s²)
pub const STANDARD_GRAVITY: f64 = 9.80665;

/// Incidental to design pressure ratio
pub const GAMMA_INC: f64 = 1.1;

/// Mill test end-cap factor
pub const END_CAP_FACTOR: f64 = 1.15;

// =============================================================================
// INTERNAL PRESSURES
// =============================================================================

/// Incidental reference pressure p_inc = p_d·γ_inc
///
/// ```rust
/// use pipe_core::equations::pressure::incidental_reference_pressure;
/// use pipe_core::quantity::Quantity;
///
/// let p_inc = incidental_reference_pressure(&Quantity::from(100.0e5), 1.1);
/// assert!((p_inc.get(0) - 110.0e5).abs() < 1e-6);
/// ```
pub fn incidental_reference_pressure(p_d: &Quantity, gamma_inc: f64) -> Quantity {
    p_d * gamma_inc
}

/// Pressure at a local elevation given the pressure at the reference elevation
///
/// # Formula
/// p_local = p_ref − ρ·g·(h_l − h_ref)
pub fn local_pressure(p_ref: &Quantity, rho: &Quantity, h_l: &Quantity, h_ref: &Quantity, g: f64) -> Quantity {
    p_ref - rho * g * (h_l - h_ref)
}

/// Local incidental pressure p_li (DNV-ST-F101 Eq. 4.1)
///
/// # Formula
/// p_li = p_d·γ_inc − ρ_cont·g·(h_l − h_ref)
///
/// # Example
/// ```rust
/// use pipe_core::equations::pressure::local_incidental_pressure;
/// use pipe_core::quantity::Quantity;
///
/// // 240 bar at the platform (30 m above sea), point at 340 m water depth
/// let p_li = local_incidental_pressure(
///     &Quantity::from(240.0e5),
///     1.1,
///     &Quantity::from(200.0),
///     &Quantity::from(-340.0),
///     &Quantity::from(30.0),
///     9.81,
/// );
/// assert!((p_li.get(0) - 27_125_940.0).abs() < 1.0);
/// ```
pub fn local_incidental_pressure(
    p_d: &Quantity,
    gamma_inc: f64,
    rho_cont: &Quantity,
    h_l: &Quantity,
    h_ref: &Quantity,
    g: f64,
) -> Quantity {
    local_pressure(&incidental_reference_pressure(p_d, gamma_inc), rho_cont, h_l, h_ref, g)
}

/// System test pressure p_t = p_d·γ_inc·α_spt
pub fn system_test_pressure(p_d: &Quantity, gamma_inc: f64, alpha_spt: f64) -> Quantity {
    p_d * (gamma_inc * alpha_spt)
}

/// Local test pressure p_lt = p_t − ρ_t·g·(h_l − h_ref) (DNV-ST-F101 Eq. 4.2)
pub fn local_test_pressure(p_t: &Quantity, rho_t: &Quantity, h_l: &Quantity, h_ref: &Quantity, g: f64) -> Quantity {
    local_pressure(p_t, rho_t, h_l, h_ref, g)
}

// =============================================================================
// EXTERNAL PRESSURE
// =============================================================================

/// Hydrostatic external pressure p_e = |h_l|·ρ_sw·g
///
/// The depth is taken as the magnitude of the elevation, so `-340.0` and
/// `340.0` give the same pressure.
///
/// ```rust
/// use pipe_core::equations::pressure::external_pressure;
/// use pipe_core::quantity::Quantity;
///
/// let p_e = external_pressure(&Quantity::from(-340.0), &Quantity::from(1027.0), 9.81);
/// assert!((p_e.get(0) - 3_425_455.8).abs() < 0.01);
/// ```
pub fn external_pressure(h_l: &Quantity, rho_seawater: &Quantity, g: f64) -> Quantity {
    h_l.abs() * rho_seawater * g
}

// =============================================================================
// RESISTANCES
// =============================================================================

/// Strength used for burst, f_cb = min(f_y, f_u/1.15), or f_y if f_u is unknown
pub fn containment_strength(f_y: &Quantity, f_u: Option<&Quantity>) -> Quantity {
    match f_u {
        Some(f_u) => f_y.min(&(f_u / 1.15)),
        None => f_y.clone(),
    }
}

/// Unfactored pressure containment (burst) resistance (DNV-ST-F101 Eq. 5.8)
///
/// # Formula
/// p_b = 2t/(D − t) · f_cb · 2/√3
///
/// # Arguments
/// * `d` - Outer diameter (m)
/// * `t` - Wall thickness, normally t₁ (m)
/// * `f_cb` - Containment strength from [`containment_strength`] (Pa)
pub fn burst_resistance(d: &Quantity, t: &Quantity, f_cb: &Quantity) -> Quantity {
    t * 2.0 / (d - t) * f_cb * (2.0 / 3.0_f64.sqrt())
}

/// Mill test pressure (DNV-ST-F101 Eq. 7.3)
///
/// # Formula
/// p_mpt = k · 2t_min/(D − t_min) · min(0.96·SMYS, 0.84·SMTS)
///
/// # Example
/// ```rust
/// use pipe_core::equations::pressure::mill_test_pressure;
/// use pipe_core::quantity::Quantity;
///
/// let p_mpt = mill_test_pressure(
///     &Quantity::from(0.660),
///     &Quantity::from(0.0202),
///     &Quantity::from(450.0e6),
///     &Quantity::from(535.0e6),
///     1.15,
/// );
/// assert!((p_mpt.get(0) - 31.37e6).abs() < 0.01e6);
/// ```
pub fn mill_test_pressure(d: &Quantity, t_min: &Quantity, smys: &Quantity, smts: &Quantity, k: f64) -> Quantity {
    let strength = (smys * 0.96).min(&(smts * 0.84));
    t_min * (2.0 * k) / (d - t_min) * strength
}

/// Hoop stress by Barlow's formula σ_h = p·D/(2t)
///
/// ```rust
/// use pipe_core::equations::pressure::hoop_stress;
/// use pipe_core::quantity::Quantity;
///
/// let sigma = hoop_stress(&Quantity::from(10.0e6), &Quantity::from(0.5), &Quantity::from(0.02));
/// assert!((sigma.get(0) - 125.0e6).abs() < 1e-3);
/// ```
pub fn hoop_stress(p: &Quantity, d: &Quantity, t: &Quantity) -> Quantity {
    p * d / (t * 2.0)
}
