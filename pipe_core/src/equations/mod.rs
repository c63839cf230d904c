//! # Pipeline Design Equations
//!
//! Design-code formulas used by the calculations, kept in one place so they
//! can be checked line by line against DNV-ST-F101.
//!
//! Every formula operates on [`Quantity`](crate::quantity::Quantity) values,
//! so the same function evaluates one load case or an array of them.
//! Safety factors are plain `f64` values resolved beforehand by
//! [`crate::factors`].
//!
//! ## Modules
//!
//! - [`pressure`] - Incidental, test, external and mill test pressures; burst resistance
//! - [`collapse`] - Elastic/plastic collapse pressures, ovality and the collapse cubic
//! - [`propagation`] - Propagation buckling and buckle arrestor crossover
//!
//! ## Units
//!
//! SI throughout: m, Pa, kg/m³, m/s².
//!
//! ## References
//!
//! - DNV-ST-F101 (2017-12): Submarine pipeline systems

pub mod collapse;
pub mod pressure;
pub mod propagation;

pub use collapse::{
    characteristic_collapse_pressure,
    collapse_pressure_closed_form,
    collapse_pressure_newton,
    collapse_unity,
    elastic_collapse_pressure,
    ovality,
    plastic_collapse_pressure,
    CollapseMethod,
};

pub use pressure::{
    burst_resistance,
    containment_strength,
    external_pressure,
    hoop_stress,
    incidental_reference_pressure,
    local_incidental_pressure,
    local_test_pressure,
    mill_test_pressure,
    system_test_pressure,
};

pub use propagation::{arrestor_unity, crossover_pressure, propagation_pressure, propagation_unity};
