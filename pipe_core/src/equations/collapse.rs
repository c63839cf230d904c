//! # Collapse Formulas
//!
//! Characteristic collapse pressure of a pipe under external overpressure
//! (DNV-ST-F101 Sec. 5.4.4).
//!
//! ## Notation
//!
//! - `p_el` = Elastic collapse pressure
//! - `p_p` = Plastic collapse pressure
//! - `O₀` = Out-of-roundness (ovality), not less than 0.5%
//! - `p_c` = Characteristic collapse pressure
//!
//! ## Governing Equation (Eq. 5.11)
//!
//! ```text
//! (p_c − p_el)·(p_c² − p_p²) = p_c·p_el·p_p·O₀·D/t
//! ```
//!
//! The cubic has exactly one root in `[0, min(p_el, p_p)]`, which is `p_c`.
//! It is solved either by safeguarded Newton iteration or by the
//! trigonometric closed form; the two agree to well under 1e-6.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};
use crate::quantity::Quantity;

/// Minimum ovality used in collapse checks
pub const MIN_OVALITY: f64 = 0.005;

/// Iteration limit for the Newton solver
pub const NEWTON_MAX_ITERATIONS: usize = 100;

/// Relative step size at which the Newton solver stops
pub const NEWTON_REL_TOL: f64 = 1e-12;

/// Elastic collapse pressure (Eq. 5.12)
///
/// # Formula
/// p_el = 2E·(t/D)³ / (1 − ν²)
pub fn elastic_collapse_pressure(t: &Quantity, d: &Quantity, youngs_modulus: &Quantity, poisson_ratio: f64) -> Quantity {
    youngs_modulus * 2.0 * (t / d).powi(3) / (1.0 - poisson_ratio * poisson_ratio)
}

/// Plastic collapse pressure (Eq. 5.13)
///
/// # Formula
/// p_p = f_y·α_fab·2t/D
pub fn plastic_collapse_pressure(t: &Quantity, d: &Quantity, f_y: &Quantity, alpha_fab: f64) -> Quantity {
    f_y * (2.0 * alpha_fab) * t / d
}

/// Ovality O₀ = (D_max − D_min)/D, floored at [`MIN_OVALITY`] (Eq. 5.14)
///
/// Missing D_max or D_min default to D, giving the minimum ovality.
///
/// ```rust
/// use pipe_core::equations::collapse::ovality;
/// use pipe_core::quantity::Quantity;
///
/// let d = Quantity::from(0.660);
/// assert_eq!(ovality(&d, None, None).get(0), 0.005);
///
/// let o = ovality(&d, Some(&Quantity::from(0.67)), Some(&Quantity::from(0.65)));
/// assert!((o.get(0) - 0.02 / 0.66).abs() < 1e-12);
/// ```
pub fn ovality(d: &Quantity, d_max: Option<&Quantity>, d_min: Option<&Quantity>) -> Quantity {
    let d_max = d_max.unwrap_or(d);
    let d_min = d_min.unwrap_or(d);
    ((d_max - d_min) / d).max_scalar(MIN_OVALITY)
}

/// Residual of the collapse cubic at `p`
pub fn collapse_residual(p: f64, p_el: f64, p_p: f64, o_0: f64, d_over_t: f64) -> f64 {
    (p - p_el) * (p * p - p_p * p_p) - p * p_el * p_p * o_0 * d_over_t
}

/// Derivative of [`collapse_residual`] with respect to `p`
pub fn collapse_residual_derivative(p: f64, p_el: f64, p_p: f64, o_0: f64, d_over_t: f64) -> f64 {
    3.0 * p * p - 2.0 * p * p_el - p_p * p_p - p_el * p_p * o_0 * d_over_t
}

fn check_collapse_inputs(method: &str, p_el: f64, p_p: f64, o_0: f64, d_over_t: f64) -> CalcResult<()> {
    let positive = [p_el, p_p, d_over_t].iter().all(|v| v.is_finite() && *v > 0.0);
    if !positive || !(o_0.is_finite() && o_0 >= 0.0) {
        return Err(CalcError::collapse_solve(
            method,
            format!("non-physical inputs p_el={p_el}, p_p={p_p}, O_0={o_0}, D/t={d_over_t}"),
        ));
    }
    Ok(())
}

/// Solve the collapse cubic by Newton iteration.
///
/// Starts from `seed`, or the plastic collapse pressure `p_p` when none is
/// given. The root is bracketed in `[0, min(p_el, p_p)]` and the start is
/// clamped into it. Any Newton step that leaves the current bracket is
/// replaced by bisection, so the iteration cannot settle on the negative
/// or upper root.
///
/// # Errors
///
/// [`CalcError::CollapseSolve`] for non-positive inputs or when
/// [`NEWTON_MAX_ITERATIONS`] is exceeded.
pub fn collapse_pressure_newton(p_el: f64, p_p: f64, o_0: f64, d_over_t: f64, seed: Option<f64>) -> CalcResult<f64> {
    check_collapse_inputs("iterative", p_el, p_p, o_0, d_over_t)?;

    let mut lo = 0.0;
    let mut hi = p_el.min(p_p);
    let mut p = seed.filter(|s| s.is_finite()).unwrap_or(p_p).clamp(lo, hi);

    for iteration in 0..NEWTON_MAX_ITERATIONS {
        let f = collapse_residual(p, p_el, p_p, o_0, d_over_t);
        if f == 0.0 {
            return Ok(p);
        }
        if f > 0.0 {
            lo = p;
        } else {
            hi = p;
        }

        let df = collapse_residual_derivative(p, p_el, p_p, o_0, d_over_t);
        let mut next = p - f / df;
        if !next.is_finite() || next <= lo || next >= hi {
            next = 0.5 * (lo + hi);
        }

        log::debug!("collapse newton iteration {}: p_c = {:.6e}", iteration, next);

        if (next - p).abs() <= NEWTON_REL_TOL * next.abs() || hi - lo <= NEWTON_REL_TOL * hi {
            return Ok(next);
        }
        p = next;
    }

    Err(CalcError::collapse_solve(
        "iterative",
        format!("no convergence after {} iterations", NEWTON_MAX_ITERATIONS),
    ))
}

/// Solve the collapse cubic with the trigonometric closed form.
///
/// ```text
/// b = −p_el
/// c = −(p_p² + p_el·p_p·O₀·D/t)
/// d = p_el·p_p²
/// u = (−b²/3 + c)/3
/// v = (2b³/27 − bc/3 + d)/2
/// φ = acos(−v/√(−u³))
/// p_c = −2√(−u)·cos(φ/3 + 60°) − b/3
/// ```
///
/// # Errors
///
/// [`CalcError::CollapseSolve`] unless `u < 0` and `|−v/√(−u³)| ≤ 1`.
pub fn collapse_pressure_closed_form(p_el: f64, p_p: f64, o_0: f64, d_over_t: f64) -> CalcResult<f64> {
    check_collapse_inputs("closed_form", p_el, p_p, o_0, d_over_t)?;

    let b = -p_el;
    let c = -(p_p * p_p + p_el * p_p * o_0 * d_over_t);
    let d = p_el * p_p * p_p;
    let u = (-b * b / 3.0 + c) / 3.0;
    let v = (2.0 * b.powi(3) / 27.0 - b * c / 3.0 + d) / 2.0;

    if u.is_nan() || u >= 0.0 {
        return Err(CalcError::collapse_solve("closed_form", format!("u = {u:e} is not negative")));
    }
    let ratio = -v / (-u.powi(3)).sqrt();
    if ratio.is_nan() || ratio.abs() > 1.0 {
        return Err(CalcError::collapse_solve(
            "closed_form",
            format!("acos argument {ratio} outside [-1, 1]"),
        ));
    }

    let phi = ratio.acos();
    let y = -2.0 * (-u).sqrt() * (phi / 3.0 + PI / 3.0).cos();
    Ok(y - b / 3.0)
}

/// Strategy for solving the collapse cubic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollapseMethod {
    /// Safeguarded Newton iteration
    Iterative,
    /// Trigonometric closed form
    ClosedForm,
    /// Newton iteration, falling back to the closed form
    #[default]
    Auto,
}

impl CollapseMethod {
    /// Solve one case
    pub fn solve(&self, p_el: f64, p_p: f64, o_0: f64, d_over_t: f64, seed: Option<f64>) -> CalcResult<f64> {
        match self {
            CollapseMethod::Iterative => collapse_pressure_newton(p_el, p_p, o_0, d_over_t, seed),
            CollapseMethod::ClosedForm => collapse_pressure_closed_form(p_el, p_p, o_0, d_over_t),
            CollapseMethod::Auto => collapse_pressure_newton(p_el, p_p, o_0, d_over_t, seed).or_else(|err| {
                log::warn!("iterative collapse solve failed ({}), trying closed form", err);
                collapse_pressure_closed_form(p_el, p_p, o_0, d_over_t).map_err(|fallback| {
                    CalcError::collapse_solve("auto", format!("iterative: {err}; closed form: {fallback}"))
                })
            }),
        }
    }
}

/// Characteristic collapse pressure p_c for every case.
///
/// On the scalar path a solver failure is returned as an error; on the
/// array path the failing case becomes `NaN`.
///
/// # Example
///
/// ```rust
/// use pipe_core::equations::collapse::{characteristic_collapse_pressure, CollapseMethod};
/// use pipe_core::quantity::Quantity;
///
/// let p_c = characteristic_collapse_pressure(
///     &Quantity::from(14.765e6),
///     &Quantity::from(28.325e6),
///     &Quantity::from(0.005),
///     &Quantity::from(31.35),
///     CollapseMethod::Auto,
///     None,
/// )
/// .unwrap();
/// assert!((p_c.get(0) - 13.36e6).abs() < 0.01e6);
/// ```
pub fn characteristic_collapse_pressure(
    p_el: &Quantity,
    p_p: &Quantity,
    o_0: &Quantity,
    d_over_t: &Quantity,
    method: CollapseMethod,
    seed: Option<&Quantity>,
) -> CalcResult<Quantity> {
    let mut shapes = vec![("p_el", p_el), ("p_p", p_p), ("o_0", o_0), ("d_over_t", d_over_t)];
    if let Some(seed) = seed {
        shapes.push(("p_c_seed", seed));
    }
    let len = Quantity::broadcast_len(&shapes)?;
    Quantity::try_from_cases(len, "characteristic_collapse_pressure", |i| {
        method.solve(
            p_el.get(i),
            p_p.get(i),
            o_0.get(i),
            d_over_t.get(i),
            seed.map(|s| s.get(i)),
        )
    })
}

/// Collapse unity (Eq. 5.10): (p_e − p_min)·γ_m·γ_SC,LB / p_c
pub fn collapse_unity(p_e: &Quantity, p_min: &Quantity, gamma_m: f64, gamma_sc_lb: f64, p_c: &Quantity) -> Quantity {
    (p_e - p_min) * (gamma_m * gamma_sc_lb) / p_c
}
