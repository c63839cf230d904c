//! # Layered Composite Sections
//!
//! Stacks concentric material layers (coatings, claddings, liners) onto a
//! reference surface and reduces them to one equivalent homogeneous annulus.
//!
//! ## Layer Order
//!
//! Layers are listed in the order they are applied, starting at the
//! reference surface:
//!
//! - [`ReferenceDiameter::InnerDiameter`]: layers grow outward (external
//!   coatings on a pipe of known outer diameter).
//! - [`ReferenceDiameter::OuterDiameter`]: layers grow inward (a steel wall
//!   and its internal cladding, listed outer layer first).
//!
//! The inward list is the physical inner-to-outer list reversed.
//!
//! ## Example
//!
//! A 0.3229 m pipe with an 18.5 mm steel wall and a 3 mm internal cladding:
//!
//! ```rust
//! use pipe_core::quantity::Quantity;
//! use pipe_core::section::{aggregate_layers, Layer, ReferenceDiameter};
//!
//! let layers = vec![
//!     Layer::new(0.0185, 7850.0).with_label("steel"),
//!     Layer::new(0.003, 7000.0).with_label("cladding"),
//! ];
//! let reference = ReferenceDiameter::OuterDiameter(Quantity::from(0.3229));
//!
//! let composite = aggregate_layers(&reference, &layers, None).unwrap();
//! assert!((composite.total_thickness.get(0) - 0.0215).abs() < 1e-12);
//! assert!((composite.equivalent_density.get(0) - 7738.675329).abs() < 1e-5);
//! assert!((composite.mass_per_length.get(0) - 157.542672).abs() < 1e-5);
//! ```

use serde::{Deserialize, Serialize};

use super::annulus_area;
use crate::errors::{CalcError, CalcResult};
use crate::quantity::Quantity;

/// One concentric material layer.
///
/// ## JSON Example
///
/// ```json
/// { "thickness": 0.05, "density": 2250.0, "label": "concrete" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Radial thickness (m)
    pub thickness: Quantity,

    /// Material density (kg/m³)
    pub density: Quantity,

    /// Optional name (e.g., "FBE", "concrete", "liner")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Layer {
    /// Create an unlabelled layer from scalar values
    pub fn new(thickness: f64, density: f64) -> Self {
        Self {
            thickness: Quantity::from(thickness),
            density: Quantity::from(density),
            label: None,
        }
    }

    /// Attach a label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Surface the layer stack starts from.
///
/// ## JSON Example
///
/// ```json
/// { "outer_diameter": 0.3229 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceDiameter {
    /// Layers are applied outward from this diameter
    InnerDiameter(Quantity),
    /// Layers are applied inward from this diameter
    OuterDiameter(Quantity),
}

impl ReferenceDiameter {
    /// The reference diameter value (m)
    pub fn diameter(&self) -> &Quantity {
        match self {
            ReferenceDiameter::InnerDiameter(d) | ReferenceDiameter::OuterDiameter(d) => d,
        }
    }

    /// +1 for outward growth, −1 for inward
    fn direction(&self) -> f64 {
        match self {
            ReferenceDiameter::InnerDiameter(_) => 1.0,
            ReferenceDiameter::OuterDiameter(_) => -1.0,
        }
    }
}

/// Pre-existing area and mass added to the layer totals (e.g. a bare pipe wall)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSeed {
    /// Area (m²)
    pub area: Quantity,
    /// Mass per length (kg/m)
    pub mass_per_length: Quantity,
}

/// Equivalent homogeneous annulus of a layer stack.
///
/// The diameters bound the layers only; seed area and mass are included in
/// `area`, `mass_per_length` and `equivalent_density`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeSection {
    /// Outermost diameter of the stack (m)
    pub equivalent_outer_diameter: Quantity,
    /// Innermost diameter of the stack (m)
    pub equivalent_inner_diameter: Quantity,
    /// Sum of layer thicknesses (m)
    pub total_thickness: Quantity,
    /// Total mass / total area (kg/m³); `NaN` for an empty stack without seed
    pub equivalent_density: Quantity,
    /// Total mass per length (kg/m)
    pub mass_per_length: Quantity,
    /// Total area (m²)
    pub area: Quantity,
}

/// Aggregate a layer stack into an equivalent section.
///
/// For each layer the far bound is `running ± 2·thickness`, the annular area
/// `π/4·(outer² − inner²)` and mass `area·density` are accumulated, and the
/// running diameter advances.
///
/// # Errors
///
/// - [`CalcError::ShapeMismatch`] if array lengths disagree
/// - [`CalcError::InvalidInput`] (scalar path) for a negative thickness or
///   density, or an inward stack that consumes the reference bore. On the
///   array path such cases become `NaN`.
pub fn aggregate_layers(
    reference: &ReferenceDiameter,
    layers: &[Layer],
    seed: Option<&LayerSeed>,
) -> CalcResult<CompositeSection> {
    let names: Vec<(String, String)> = (0..layers.len())
        .map(|k| (format!("layers[{k}].thickness"), format!("layers[{k}].density")))
        .collect();
    let mut shapes: Vec<(&str, &Quantity)> = vec![("reference", reference.diameter())];
    for (layer, (t_name, rho_name)) in layers.iter().zip(&names) {
        shapes.push((t_name.as_str(), &layer.thickness));
        shapes.push((rho_name.as_str(), &layer.density));
    }
    if let Some(seed) = seed {
        shapes.push(("seed.area", &seed.area));
        shapes.push(("seed.mass_per_length", &seed.mass_per_length));
    }
    let len = Quantity::broadcast_len(&shapes)?;

    let direction = reference.direction();
    let start = reference.diameter();
    let mut running = start.clone();
    let mut area = seed.map_or(Quantity::Scalar(0.0), |s| s.area.clone());
    let mut mass = seed.map_or(Quantity::Scalar(0.0), |s| s.mass_per_length.clone());
    let mut total_thickness = Quantity::Scalar(0.0);

    for layer in layers {
        let next = &running + &layer.thickness * (2.0 * direction);
        let layer_area = if direction > 0.0 {
            annulus_area(&next, &running)
        } else {
            annulus_area(&running, &next)
        };
        mass = mass + &layer_area * &layer.density;
        area = area + layer_area;
        total_thickness = total_thickness + &layer.thickness;
        running = next;
    }

    let valid = Quantity::try_from_cases(len, "aggregate_layers", |i| {
        check_stack(layers, direction, running.get(i), i)
    })?;

    let (outer, inner) = if direction > 0.0 {
        (running, start.clone())
    } else {
        (start.clone(), running)
    };

    Ok(CompositeSection {
        equivalent_outer_diameter: outer.masked_by(&valid),
        equivalent_inner_diameter: inner.masked_by(&valid),
        total_thickness: total_thickness.masked_by(&valid),
        equivalent_density: (&mass / &area).masked_by(&valid),
        mass_per_length: mass.masked_by(&valid),
        area: area.masked_by(&valid),
    })
}

fn check_stack(layers: &[Layer], direction: f64, far_diameter: f64, case: usize) -> CalcResult<f64> {
    for (k, layer) in layers.iter().enumerate() {
        let thickness = layer.thickness.get(case);
        if thickness < 0.0 {
            return Err(CalcError::invalid_input(
                format!("layers[{k}].thickness"),
                thickness.to_string(),
                "Layer thickness cannot be negative",
            ));
        }
        let density = layer.density.get(case);
        if density < 0.0 {
            return Err(CalcError::invalid_input(
                format!("layers[{k}].density"),
                density.to_string(),
                "Layer density cannot be negative",
            ));
        }
    }
    if direction < 0.0 && far_diameter < 0.0 {
        return Err(CalcError::invalid_input(
            "layers",
            far_diameter.to_string(),
            "Inward layer stack is thicker than the reference bore radius",
        ));
    }
    Ok(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn two_layers() -> Vec<Layer> {
        vec![Layer::new(0.0185, 7850.0), Layer::new(0.003, 7000.0)]
    }

    #[test]
    fn test_inward_reference_case() {
        let reference = ReferenceDiameter::OuterDiameter(Quantity::from(0.3229));
        let c = aggregate_layers(&reference, &two_layers(), None).unwrap();
        assert_relative_eq!(c.total_thickness.get(0), 0.0215, max_relative = 1e-12);
        assert_relative_eq!(c.equivalent_density.get(0), 7738.675329084429, max_relative = 1e-10);
        assert_relative_eq!(c.mass_per_length.get(0), 157.54267202070224, max_relative = 1e-10);
        assert_relative_eq!(c.equivalent_inner_diameter.get(0), 0.2799, max_relative = 1e-12);
        assert_relative_eq!(c.equivalent_outer_diameter.get(0), 0.3229, max_relative = 1e-12);
    }

    #[test]
    fn test_mass_conservation() {
        let reference = ReferenceDiameter::InnerDiameter(Quantity::from(0.5));
        let layers = vec![
            Layer::new(0.0005, 1450.0),
            Layer::new(0.003, 950.0),
            Layer::new(0.06, 2400.0),
        ];
        let c = aggregate_layers(&reference, &layers, None).unwrap();

        let mut d = 0.5;
        let mut expected = 0.0;
        for (t, rho) in [(0.0005, 1450.0), (0.003, 950.0), (0.06, 2400.0)] {
            let d_next = d + 2.0 * t;
            expected += PI / 4.0 * (d_next * d_next - d * d) * rho;
            d = d_next;
        }
        assert_relative_eq!(c.mass_per_length.get(0), expected, max_relative = 1e-12);
        assert_relative_eq!(c.equivalent_outer_diameter.get(0), d, max_relative = 1e-12);
    }

    #[test]
    fn test_layer_order_matters() {
        let reference = ReferenceDiameter::InnerDiameter(Quantity::from(0.3));
        let forward = aggregate_layers(&reference, &two_layers(), None).unwrap();
        let mut reversed = two_layers();
        reversed.reverse();
        let backward = aggregate_layers(&reference, &reversed, None).unwrap();

        assert_relative_eq!(forward.total_thickness.get(0), backward.total_thickness.get(0));
        // The denser layer carries more mass when it sits further out
        assert!(backward.mass_per_length.get(0) > forward.mass_per_length.get(0));
    }

    #[test]
    fn test_inward_equals_reversed_outward() {
        // Physical inner-to-outer: cladding then steel, bore 0.2799
        let physical = vec![Layer::new(0.003, 7000.0), Layer::new(0.0185, 7850.0)];
        let outward = aggregate_layers(
            &ReferenceDiameter::InnerDiameter(Quantity::from(0.2799)),
            &physical,
            None,
        )
        .unwrap();

        let mut inward_list = physical.clone();
        inward_list.reverse();
        let inward = aggregate_layers(
            &ReferenceDiameter::OuterDiameter(Quantity::from(0.3229)),
            &inward_list,
            None,
        )
        .unwrap();

        assert_relative_eq!(outward.mass_per_length.get(0), inward.mass_per_length.get(0), max_relative = 1e-10);
        assert_relative_eq!(outward.total_thickness.get(0), inward.total_thickness.get(0), max_relative = 1e-12);
        assert_relative_eq!(outward.equivalent_outer_diameter.get(0), 0.3229, max_relative = 1e-12);
    }

    #[test]
    fn test_seed_included_in_density() {
        let seed = LayerSeed {
            area: Quantity::from(0.01),
            mass_per_length: Quantity::from(78.5),
        };
        let reference = ReferenceDiameter::InnerDiameter(Quantity::from(0.4));
        let empty = aggregate_layers(&reference, &[], Some(&seed)).unwrap();
        assert_relative_eq!(empty.equivalent_density.get(0), 7850.0, max_relative = 1e-12);
        assert_eq!(empty.total_thickness.get(0), 0.0);

        let no_seed = aggregate_layers(&reference, &[], None).unwrap();
        assert!(no_seed.equivalent_density.get(0).is_nan());
    }

    #[test]
    fn test_stack_consuming_bore_rejected() {
        let reference = ReferenceDiameter::OuterDiameter(Quantity::from(0.1));
        let err = aggregate_layers(&reference, &[Layer::new(0.06, 7850.0)], None).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_stack_consuming_bore_array_case_is_nan() {
        let reference = ReferenceDiameter::OuterDiameter(Quantity::from(0.1));
        let layer = Layer {
            thickness: Quantity::from(vec![0.01, 0.06]),
            density: Quantity::from(7850.0),
            label: None,
        };
        let c = aggregate_layers(&reference, &[layer], None).unwrap();
        assert!(c.mass_per_length.get(0).is_finite());
        assert!(c.mass_per_length.get(1).is_nan());
        assert!(c.equivalent_inner_diameter.get(1).is_nan());
    }

    #[test]
    fn test_layer_serialization() {
        let json = r#"{"thickness": [0.05, 0.06], "density": 2250.0, "label": "concrete"}"#;
        let layer: Layer = serde_json::from_str(json).unwrap();
        assert_eq!(layer.thickness.len(), 2);
        assert_eq!(layer.label.as_deref(), Some("concrete"));

        let reference: ReferenceDiameter = serde_json::from_str(r#"{"outer_diameter": 0.3229}"#).unwrap();
        assert_eq!(reference, ReferenceDiameter::OuterDiameter(Quantity::Scalar(0.3229)));
    }
}
