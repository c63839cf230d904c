//! # Propagation Buckling Formulas
//!
//! Once a local buckle forms, it can run along the line if external
//! pressure exceeds the propagation pressure. Buckle arrestors (short
//! thick-walled joints) stop it (DNV-ST-F101 Sec. 5.4.5).
//!
//! ## References
//!
//! - DNV-ST-F101 (2017-12) Eq. 5.15, 5.16 (propagation)
//! - DNV-ST-F101 (2017-12) Eq. 5.17, 5.18 (buckle arrestor)

use std::ops::RangeInclusive;

use crate::quantity::Quantity;

/// D/t range over which the propagation pressure formula is valid
pub const VALID_D_OVER_T: RangeInclusive<f64> = 15.0..=45.0;

/// Factor on external pressure in the buckle arrestor criterion
pub const ARRESTOR_PRESSURE_FACTOR: f64 = 1.1;

/// Characteristic propagation pressure (Eq. 5.16)
///
/// # Formula
/// p_pr = 35·f_y·α_fab·(t₂/D)^2.5
///
/// Cases with D/t outside [`VALID_D_OVER_T`] are still computed but logged
/// at `warn` level.
///
/// # Example
/// ```rust
/// use pipe_core::equations::propagation::propagation_pressure;
/// use pipe_core::quantity::Quantity;
///
/// let p_pr = propagation_pressure(
///     &Quantity::from(0.0207),
///     &Quantity::from(0.660),
///     &Quantity::from(444.0e6),
///     0.85,
/// );
/// assert!((p_pr.get(0) - 2.30e6).abs() < 0.01e6);
/// ```
pub fn propagation_pressure(t_2: &Quantity, d: &Quantity, f_y: &Quantity, alpha_fab: f64) -> Quantity {
    let ratio = d / t_2;
    if ratio.any(|r| !VALID_D_OVER_T.contains(&r)) {
        log::warn!(
            "D/t = {} outside the valid range {:?} for the propagation pressure formula",
            ratio,
            VALID_D_OVER_T
        );
    }
    f_y * (35.0 * alpha_fab) * (t_2 / d).powf(2.5)
}

/// Propagation buckling unity (Eq. 5.15): (p_e − p_min)·γ_m·γ_SC,LB / p_pr
pub fn propagation_unity(p_e: &Quantity, p_min: &Quantity, gamma_m: f64, gamma_sc_lb: f64, p_pr: &Quantity) -> Quantity {
    (p_e - p_min) * (gamma_m * gamma_sc_lb) / p_pr
}

/// Crossover pressure of a buckle arrestor (Eq. 5.18)
///
/// # Formula
/// p_x = p_pr + (p_prBA − p_pr)·(1 − e^(−20·t₂·L_BA/D²))
///
/// # Arguments
/// * `p_pr` - Propagation pressure of the line pipe (Pa)
/// * `p_pr_ba` - Propagation pressure of an infinitely long arrestor (Pa)
/// * `d` - Outer diameter of the line pipe (m)
/// * `t_2` - Line pipe wall thickness t₂ (m)
/// * `l_ba` - Arrestor length (m)
pub fn crossover_pressure(p_pr: &Quantity, p_pr_ba: &Quantity, d: &Quantity, t_2: &Quantity, l_ba: &Quantity) -> Quantity {
    let decay = (t_2 * l_ba * -20.0 / d.powi(2)).exp();
    p_pr + (p_pr_ba - p_pr) * (1.0 - decay)
}

/// Buckle arrestor unity (Eq. 5.17): (p_e − p_min)·1.1·γ_m·γ_SC,LB / p_x
pub fn arrestor_unity(p_e: &Quantity, p_min: &Quantity, gamma_m: f64, gamma_sc_lb: f64, p_x: &Quantity) -> Quantity {
    (p_e - p_min) * (ARRESTOR_PRESSURE_FACTOR * gamma_m * gamma_sc_lb) / p_x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_propagation_pressure() {
        let p_pr = propagation_pressure(
            &Quantity::from(0.02),
            &Quantity::from(0.6),
            &Quantity::from(450.0e6),
            1.0,
        );
        let expected = 35.0 * 450.0e6 * (0.02_f64 / 0.6).powf(2.5);
        assert!((p_pr.get(0) - expected).abs() < 1e-3);
    }

    #[test]
    fn test_crossover_limits() {
        let p_pr = Quantity::from(2.0e6);
        let p_pr_ba = Quantity::from(10.0e6);
        let d = Quantity::from(0.66);
        let t_2 = Quantity::from(0.02);

        // Zero length arrestor gives no benefit, a very long one gives p_prBA
        let short = crossover_pressure(&p_pr, &p_pr_ba, &d, &t_2, &Quantity::from(0.0));
        let long = crossover_pressure(&p_pr, &p_pr_ba, &d, &t_2, &Quantity::from(1.0e3));
        assert!((short.get(0) - 2.0e6).abs() < 1e-6);
        assert!((long.get(0) - 10.0e6).abs() < 1e-3);

        let mid = crossover_pressure(&p_pr, &p_pr_ba, &d, &t_2, &Quantity::from(2.0));
        let expected = 2.0e6 + 8.0e6 * (1.0 - (-20.0_f64 * 0.02 * 2.0 / (0.66 * 0.66)).exp());
        assert!((mid.get(0) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_unities() {
        let p_e = Quantity::from(4.0e6);
        let p_min = Quantity::from(0.0);
        let u = propagation_unity(&p_e, &p_min, 1.15, 1.14, &Quantity::from(2.0e6));
        assert!((u.get(0) - 4.0e6 * 1.15 * 1.14 / 2.0e6).abs() < 1e-12);

        let ba = arrestor_unity(&p_e, &p_min, 1.15, 1.14, &Quantity::from(8.0e6));
        assert!((ba.get(0) - 4.0e6 * 1.1 * 1.15 * 1.14 / 8.0e6).abs() < 1e-12);
    }
}
