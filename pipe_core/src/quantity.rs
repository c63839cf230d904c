//! # Quantity
//!
//! Every input and output of the engine is a [`Quantity`]: either a single
//! value or an array holding one value per load case. Arithmetic is
//! elementwise with broadcasting, so a formula written once works for a
//! single case and for a batch.
//!
//! ## Broadcasting Rules
//!
//! - scalar ⊕ scalar → scalar
//! - scalar ⊕ array → array (scalar applied to every case)
//! - array ⊕ array → array, lengths must match (a length-1 array acts as a scalar)
//!
//! Arrays that cannot be broadcast produce an all-`NaN` array of the longer
//! length. Calculation entry points check shapes up front with
//! [`Quantity::broadcast_len`] and report [`CalcError::ShapeMismatch`] instead.
//!
//! ## JSON
//!
//! A quantity serializes as a bare number or a number array:
//!
//! ```json
//! { "t_nom": 0.0212, "h_l": [-340.0, -300.0, 0.0] }
//! ```
//!
//! `NaN` entries serialize as `null`.
//!
//! ## Example
//!
//! ```rust
//! use pipe_core::quantity::Quantity;
//!
//! let d_o = Quantity::from(0.6176);
//! let t = Quantity::from(vec![0.0197, 0.0212]);
//!
//! // D/t for both cases
//! let ratio = &d_o / &t;
//! assert_eq!(ratio.len(), 2);
//! assert!((ratio.get(1) - 0.6176 / 0.0212).abs() < 1e-12);
//! ```

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};

/// A scalar or an array of per-case values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    /// A single value shared by all cases
    Scalar(f64),
    /// One value per load case
    Array(Vec<f64>),
}

impl Default for Quantity {
    fn default() -> Self {
        Quantity::Scalar(0.0)
    }
}

impl From<f64> for Quantity {
    fn from(value: f64) -> Self {
        Quantity::Scalar(value)
    }
}

impl From<Vec<f64>> for Quantity {
    fn from(values: Vec<f64>) -> Self {
        Quantity::Array(values)
    }
}

impl From<&[f64]> for Quantity {
    fn from(values: &[f64]) -> Self {
        Quantity::Array(values.to_vec())
    }
}

impl<const N: usize> From<[f64; N]> for Quantity {
    fn from(values: [f64; N]) -> Self {
        Quantity::Array(values.to_vec())
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantity::Scalar(v) => write!(f, "{}", v),
            Quantity::Array(values) => write!(f, "{:?}", values),
        }
    }
}

/// `min` that returns `NaN` when either side is `NaN`.
///
/// `f64::min` silently discards `NaN`, which would hide a failed case
/// behind a valid one when picking the governing limit.
fn nan_min(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.min(b)
    }
}

fn nan_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.max(b)
    }
}

impl Quantity {
    /// Number of values held (1 for a scalar)
    pub fn len(&self) -> usize {
        match self {
            Quantity::Scalar(_) => 1,
            Quantity::Array(values) => values.len(),
        }
    }

    /// True for an empty array
    pub fn is_empty(&self) -> bool {
        matches!(self, Quantity::Array(values) if values.is_empty())
    }

    /// True for the scalar variant
    pub fn is_scalar(&self) -> bool {
        matches!(self, Quantity::Scalar(_))
    }

    /// Value for case `index`, broadcasting scalars and length-1 arrays.
    ///
    /// Out-of-range indices return `NaN`.
    pub fn get(&self, index: usize) -> f64 {
        match self {
            Quantity::Scalar(v) => *v,
            Quantity::Array(values) if values.len() == 1 => values[0],
            Quantity::Array(values) => values.get(index).copied().unwrap_or(f64::NAN),
        }
    }

    /// The single value, if this quantity describes exactly one case
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Quantity::Scalar(v) => Some(*v),
            Quantity::Array(values) if values.len() == 1 => Some(values[0]),
            Quantity::Array(_) => None,
        }
    }

    /// Borrow the raw values
    pub fn values(&self) -> &[f64] {
        match self {
            Quantity::Scalar(v) => std::slice::from_ref(v),
            Quantity::Array(values) => values,
        }
    }

    /// Copy the raw values into a vector
    pub fn to_vec(&self) -> Vec<f64> {
        self.values().to_vec()
    }

    /// Apply `f` to every value, keeping the shape
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Quantity {
        match self {
            Quantity::Scalar(v) => Quantity::Scalar(f(*v)),
            Quantity::Array(values) => Quantity::Array(values.iter().map(|&v| f(v)).collect()),
        }
    }

    /// Combine two quantities elementwise with broadcasting
    pub fn zip_with(&self, other: &Quantity, f: impl Fn(f64, f64) -> f64) -> Quantity {
        match (self, other) {
            (Quantity::Scalar(a), Quantity::Scalar(b)) => Quantity::Scalar(f(*a, *b)),
            (Quantity::Scalar(a), Quantity::Array(b)) => {
                Quantity::Array(b.iter().map(|&b| f(*a, b)).collect())
            }
            (Quantity::Array(a), Quantity::Scalar(b)) => {
                Quantity::Array(a.iter().map(|&a| f(a, *b)).collect())
            }
            (Quantity::Array(a), Quantity::Array(b)) if a.len() == b.len() => {
                Quantity::Array(a.iter().zip(b).map(|(&a, &b)| f(a, b)).collect())
            }
            (Quantity::Array(a), Quantity::Array(b)) if a.len() == 1 => {
                Quantity::Array(b.iter().map(|&b| f(a[0], b)).collect())
            }
            (Quantity::Array(a), Quantity::Array(b)) if b.len() == 1 => {
                Quantity::Array(a.iter().map(|&a| f(a, b[0])).collect())
            }
            (Quantity::Array(a), Quantity::Array(b)) => {
                log::warn!(
                    "cannot broadcast arrays of length {} and {}; result set to NaN",
                    a.len(),
                    b.len()
                );
                Quantity::Array(vec![f64::NAN; a.len().max(b.len())])
            }
        }
    }

    /// Common number of cases for a set of named inputs.
    ///
    /// Returns `Ok(None)` when every input is a scalar, `Ok(Some(n))` when at
    /// least one input is an array, and [`CalcError::ShapeMismatch`] naming the
    /// first offending input when array lengths disagree.
    pub fn broadcast_len(inputs: &[(&str, &Quantity)]) -> CalcResult<Option<usize>> {
        let mut len: Option<usize> = None;
        let mut reference = "";
        for (name, quantity) in inputs {
            if let Quantity::Array(values) = quantity {
                let n = values.len();
                match len {
                    None => {
                        len = Some(n);
                        reference = name;
                    }
                    Some(current) if current == n || n == 1 => {}
                    Some(1) => {
                        len = Some(n);
                        reference = name;
                    }
                    Some(current) => {
                        log::debug!("'{}' has {} cases but '{}' has {}", name, n, reference, current);
                        return Err(CalcError::shape_mismatch(*name, current, n));
                    }
                }
            }
        }
        Ok(len)
    }

    /// Build a quantity by evaluating `f` for each case index.
    ///
    /// `None` produces a scalar from `f(0)`.
    pub fn from_cases(len: Option<usize>, f: impl Fn(usize) -> f64) -> Quantity {
        match len {
            None => Quantity::Scalar(f(0)),
            Some(n) => Quantity::Array((0..n).map(f).collect()),
        }
    }

    /// Build a quantity from a fallible per-case evaluation.
    ///
    /// On the scalar path (`len == None`) the error is returned to the caller.
    /// On the array path a case-local error (see [`CalcError::is_case_local`])
    /// becomes `NaN` for that case and the remaining cases are still computed;
    /// any other error aborts.
    pub fn try_from_cases(
        len: Option<usize>,
        context: &str,
        f: impl Fn(usize) -> CalcResult<f64>,
    ) -> CalcResult<Quantity> {
        match len {
            None => f(0).map(Quantity::Scalar),
            Some(n) => {
                let mut values = Vec::with_capacity(n);
                for index in 0..n {
                    match f(index) {
                        Ok(value) => values.push(value),
                        Err(err) if err.is_case_local() => {
                            log::warn!("{}: case {} set to NaN: {}", context, index, err);
                            values.push(f64::NAN);
                        }
                        Err(err) => return Err(err),
                    }
                }
                Ok(Quantity::Array(values))
            }
        }
    }

    /// Check a per-case condition on a named value.
    ///
    /// A scalar that fails `ok` is an [`CalcError::InvalidInput`]. In an
    /// array the failing cases become `NaN` and the others are kept.
    ///
    /// ```rust
    /// use pipe_core::quantity::Quantity;
    ///
    /// let t = Quantity::from(vec![0.02, 0.0, 0.03]);
    /// let checked = t.require("t_nom", "must be positive", |v| v > 0.0).unwrap();
    /// assert!(checked.get(1).is_nan());
    ///
    /// assert!(Quantity::from(0.0).require("t_nom", "must be positive", |v| v > 0.0).is_err());
    /// ```
    pub fn require(&self, field: &str, reason: &str, ok: impl Fn(f64) -> bool) -> CalcResult<Quantity> {
        let len = match self {
            Quantity::Scalar(_) => None,
            Quantity::Array(values) => Some(values.len()),
        };
        Quantity::try_from_cases(len, field, |i| {
            let value = self.get(i);
            if ok(value) {
                Ok(value)
            } else {
                Err(CalcError::invalid_input(field, value.to_string(), reason))
            }
        })
    }

    /// Elementwise integer power
    pub fn powi(&self, n: i32) -> Quantity {
        self.map(|v| v.powi(n))
    }

    /// Elementwise real power
    pub fn powf(&self, n: f64) -> Quantity {
        self.map(|v| v.powf(n))
    }

    /// Elementwise square root
    pub fn sqrt(&self) -> Quantity {
        self.map(f64::sqrt)
    }

    /// Elementwise absolute value
    pub fn abs(&self) -> Quantity {
        self.map(f64::abs)
    }

    /// Elementwise exponential
    pub fn exp(&self) -> Quantity {
        self.map(f64::exp)
    }

    /// Elementwise minimum, `NaN` if either side is `NaN`
    pub fn min(&self, other: &Quantity) -> Quantity {
        self.zip_with(other, nan_min)
    }

    /// Elementwise maximum, `NaN` if either side is `NaN`
    pub fn max(&self, other: &Quantity) -> Quantity {
        self.zip_with(other, nan_max)
    }

    /// Elementwise floor at `lower`
    pub fn max_scalar(&self, lower: f64) -> Quantity {
        self.map(|v| nan_max(v, lower))
    }

    /// Copy of `self` with `NaN` wherever `mask` is `NaN` (broadcast to the mask's shape)
    pub fn masked_by(&self, mask: &Quantity) -> Quantity {
        self.zip_with(mask, |v, m| if m.is_nan() { f64::NAN } else { v })
    }

    /// True when `pred` holds for every value
    pub fn all(&self, pred: impl Fn(f64) -> bool) -> bool {
        self.values().iter().all(|&v| pred(v))
    }

    /// True when `pred` holds for at least one value
    pub fn any(&self, pred: impl Fn(f64) -> bool) -> bool {
        self.values().iter().any(|&v| pred(v))
    }

    /// Index of the smallest candidate for each case.
    ///
    /// A case where any candidate is `NaN` yields `None`. Ties resolve to the
    /// earliest candidate. The result always has one entry per case
    /// (a single entry when every candidate is scalar).
    pub fn argmin_cases(candidates: &[&Quantity]) -> Vec<Option<usize>> {
        let len = candidates
            .iter()
            .filter(|q| !q.is_scalar())
            .map(|q| q.len())
            .max()
            .unwrap_or(1);
        (0..len)
            .map(|case| {
                let mut best: Option<(usize, f64)> = None;
                for (index, candidate) in candidates.iter().enumerate() {
                    let value = candidate.get(case);
                    if value.is_nan() {
                        return None;
                    }
                    match best {
                        Some((_, current)) if current <= value => {}
                        _ => best = Some((index, value)),
                    }
                }
                best.map(|(index, _)| index)
            })
            .collect()
    }
}

// ============================================================================
// Arithmetic Implementations (macro to reduce boilerplate)
// ============================================================================

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait<&Quantity> for &Quantity {
            type Output = Quantity;
            fn $method(self, rhs: &Quantity) -> Quantity {
                self.zip_with(rhs, |a, b| a $op b)
            }
        }

        impl $trait<Quantity> for Quantity {
            type Output = Quantity;
            fn $method(self, rhs: Quantity) -> Quantity {
                $trait::$method(&self, &rhs)
            }
        }

        impl $trait<&Quantity> for Quantity {
            type Output = Quantity;
            fn $method(self, rhs: &Quantity) -> Quantity {
                $trait::$method(&self, rhs)
            }
        }

        impl $trait<Quantity> for &Quantity {
            type Output = Quantity;
            fn $method(self, rhs: Quantity) -> Quantity {
                $trait::$method(self, &rhs)
            }
        }

        impl $trait<f64> for &Quantity {
            type Output = Quantity;
            fn $method(self, rhs: f64) -> Quantity {
                self.map(|a| a $op rhs)
            }
        }

        impl $trait<f64> for Quantity {
            type Output = Quantity;
            fn $method(self, rhs: f64) -> Quantity {
                $trait::$method(&self, rhs)
            }
        }

        impl $trait<&Quantity> for f64 {
            type Output = Quantity;
            fn $method(self, rhs: &Quantity) -> Quantity {
                rhs.map(|b| self $op b)
            }
        }

        impl $trait<Quantity> for f64 {
            type Output = Quantity;
            fn $method(self, rhs: Quantity) -> Quantity {
                $trait::$method(self, &rhs)
            }
        }
    };
}

impl_binary_op!(Add, add, +);
impl_binary_op!(Sub, sub, -);
impl_binary_op!(Mul, mul, *);
impl_binary_op!(Div, div, /);

impl Neg for &Quantity {
    type Output = Quantity;
    fn neg(self) -> Quantity {
        self.map(|v| -v)
    }
}

impl Neg for Quantity {
    type Output = Quantity;
    fn neg(self) -> Quantity {
        -&self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_arithmetic() {
        let a = Quantity::from(10.0);
        let b = Quantity::from(4.0);
        assert_eq!(&a + &b, Quantity::Scalar(14.0));
        assert_eq!(&a - &b, Quantity::Scalar(6.0));
        assert_eq!(&a * 2.0, Quantity::Scalar(20.0));
        assert_eq!(1.0 / &b, Quantity::Scalar(0.25));
        assert_eq!(-a, Quantity::Scalar(-10.0));
    }

    #[test]
    fn test_scalar_array_broadcast() {
        let d = Quantity::from(0.6);
        let t = Quantity::from(vec![0.02, 0.03]);
        let ratio = &d / &t;
        assert_eq!(ratio.len(), 2);
        assert!((ratio.get(0) - 30.0).abs() < 1e-9);
        assert!((ratio.get(1) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_length_one_array_broadcasts() {
        let a = Quantity::from(vec![2.0]);
        let b = Quantity::from(vec![1.0, 2.0, 3.0]);
        assert_eq!(&a * &b, Quantity::Array(vec![2.0, 4.0, 6.0]));
    }

    #[test]
    fn test_mismatched_arrays_become_nan() {
        let a = Quantity::from(vec![1.0, 2.0]);
        let b = Quantity::from(vec![1.0, 2.0, 3.0]);
        let c = &a + &b;
        assert_eq!(c.len(), 3);
        assert!(c.all(f64::is_nan));
    }

    #[test]
    fn test_broadcast_len() {
        let s = Quantity::from(1.0);
        let a3 = Quantity::from(vec![1.0, 2.0, 3.0]);
        let a1 = Quantity::from(vec![5.0]);
        let a2 = Quantity::from(vec![1.0, 2.0]);

        assert_eq!(Quantity::broadcast_len(&[("s", &s)]).unwrap(), None);
        assert_eq!(Quantity::broadcast_len(&[("s", &s), ("a3", &a3)]).unwrap(), Some(3));
        assert_eq!(Quantity::broadcast_len(&[("a1", &a1), ("a3", &a3)]).unwrap(), Some(3));

        let err = Quantity::broadcast_len(&[("a3", &a3), ("a2", &a2)]).unwrap_err();
        assert_eq!(err, CalcError::shape_mismatch("a2", 3, 2));
    }

    #[test]
    fn test_min_propagates_nan() {
        let a = Quantity::from(vec![1.0, f64::NAN]);
        let b = Quantity::from(vec![2.0, 0.5]);
        let m = a.min(&b);
        assert_eq!(m.get(0), 1.0);
        assert!(m.get(1).is_nan());
    }

    #[test]
    fn test_try_from_cases_scalar_raises() {
        let result = Quantity::try_from_cases(None, "test", |_| {
            Err(CalcError::collapse_solve("newton", "diverged"))
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_try_from_cases_array_isolates_failure() {
        let result = Quantity::try_from_cases(Some(3), "test", |i| {
            if i == 1 {
                Err(CalcError::collapse_solve("newton", "diverged"))
            } else {
                Ok(i as f64)
            }
        })
        .unwrap();
        assert_eq!(result.get(0), 0.0);
        assert!(result.get(1).is_nan());
        assert_eq!(result.get(2), 2.0);
    }

    #[test]
    fn test_try_from_cases_structural_error_aborts() {
        let result = Quantity::try_from_cases(Some(2), "test", |_| {
            Err(CalcError::missing_field("t_nom"))
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_require_masks_array_cases() {
        let t = Quantity::from(vec![0.0212, 0.0, -0.01, 0.0254]);
        let checked = t.require("t_nom", "Wall thickness must be positive", |v| v > 0.0).unwrap();
        assert_eq!(checked.len(), 4);
        assert_eq!(checked.get(0), 0.0212);
        assert!(checked.get(1).is_nan());
        assert!(checked.get(2).is_nan());
        assert_eq!(checked.get(3), 0.0254);

        let err = Quantity::from(-0.01)
            .require("t_nom", "Wall thickness must be positive", |v| v > 0.0)
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_argmin_cases() {
        let a = Quantity::from(vec![3.0, 1.0, f64::NAN]);
        let b = Quantity::from(2.0);
        assert_eq!(Quantity::argmin_cases(&[&a, &b]), vec![Some(1), Some(0), None]);

        let s1 = Quantity::from(5.0);
        let s2 = Quantity::from(5.0);
        assert_eq!(Quantity::argmin_cases(&[&s1, &s2]), vec![Some(0)]);
    }

    #[test]
    fn test_serialization() {
        let s = Quantity::from(12.5);
        assert_eq!(serde_json::to_string(&s).unwrap(), "12.5");

        let a: Quantity = serde_json::from_str("[1.0, 2.0]").unwrap();
        assert_eq!(a, Quantity::Array(vec![1.0, 2.0]));

        let roundtrip: Quantity = serde_json::from_str(&serde_json::to_string(&s).unwrap()).unwrap();
        assert_eq!(s, roundtrip);
    }
}
