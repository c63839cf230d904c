use approx::assert_relative_eq;
use pipe_core::calculations::containment::{self, ContainmentInput, ContainmentLimit};
use pipe_core::calculations::{collapse, propagation, CalculationItem, CalculationOutput};
use pipe_core::factors::FactorSpec;
use pipe_core::{PipeMaterial, Quantity};

/// 24" X65 line at 340 m water depth, 240 bar design pressure at a platform
/// 30 m above sea level. Reference values were computed with g = 9.81.
fn reference_containment() -> ContainmentInput {
    ContainmentInput {
        label: "Reference".to_string(),
        t_fab: Quantity::from(0.001),
        t_corr: Quantity::from(0.0005),
        h_ref: Quantity::from(30.0),
        rho_cont: Quantity::from(275.0),
        rho_t: Quantity::from(1027.0),
        rho_seawater: Quantity::from(1027.0),
        g: 9.81,
        gamma_m: FactorSpec::Value(1.15),
        gamma_sc_pc: FactorSpec::Value(1.138),
        alpha_u: FactorSpec::Value(1.0),
        alpha_spt: FactorSpec::Value(1.05),
        alpha_mpt: Some(FactorSpec::Value(1.088)),
        ..ContainmentInput::new(
            0.6176,
            0.0212,
            PipeMaterial {
                smts: Some(Quantity::from(535.0e6)),
                temperature: Some(Quantity::from(60.0)),
                family: Some("CMn".to_string()),
                ..PipeMaterial::new(450.0e6)
            },
            240.0e5,
            -340.0,
        )
    }
}

#[test]
fn containment_reference_case() {
    let r = containment::calculate(&reference_containment()).expect("containment calc");

    assert!((r.containment_unity.get(0) - 0.9286).abs() < 1e-4, "unity={}", r.containment_unity);
    assert!((r.p_li.get(0) - 27_398_167.5).abs() < 0.1, "p_li={}", r.p_li);
    assert!((r.p_e.get(0) - 3_425_455.8).abs() < 0.1, "p_e={}", r.p_e);
    assert!((r.f_y.get(0) - 444.0e6).abs() < 1e-3);
    assert!((r.t_1.get(0) - 0.0197).abs() < 1e-12);
    assert!((r.limit_burst.get(0) - 25_815_462.0).abs() < 1.0);
    assert!((r.limit_mill_test.get(0) - 30_879_399.0).abs() < 1.0);
    assert!((r.mill_test_unity.get(0) - 0.77633).abs() < 1e-5);
    assert_eq!(r.governing, vec![Some(ContainmentLimit::Burst)]);
    assert!(r.passes());
}

#[test]
fn containment_broadcasts_wall_thickness() {
    let thicknesses = [0.0159, 0.0212, 0.0254];

    let mut batch_input = reference_containment();
    batch_input.t_nom = Quantity::from(thicknesses.to_vec());
    let batch = containment::calculate(&batch_input).expect("batch calc");
    assert_eq!(batch.containment_unity.len(), 3);
    assert_eq!(batch.governing.len(), 3);

    for (i, t_nom) in thicknesses.iter().enumerate() {
        let mut input = reference_containment();
        input.t_nom = Quantity::from(*t_nom);
        let single = containment::calculate(&input).expect("scalar calc");

        assert_relative_eq!(batch.containment_unity.get(i), single.containment_unity.get(0), max_relative = 1e-12);
        assert_relative_eq!(batch.limit_burst.get(i), single.limit_burst.get(0), max_relative = 1e-12);
        assert_relative_eq!(batch.p_mpt.get(i), single.p_mpt.get(0), max_relative = 1e-12);
        assert_eq!(batch.governing[i], single.governing[0]);
    }

    // Thicker wall, lower utilisation
    let u = batch.containment_unity.to_vec();
    assert!(u[0] > u[1] && u[1] > u[2]);
}

#[test]
fn collapse_and_propagation_share_reference_pipe() {
    let material = reference_containment().material;

    let collapse_input = collapse::CollapseInput {
        t_fab: Quantity::from(0.001),
        t_corr: Quantity::from(0.0005),
        rho_seawater: Quantity::from(1027.0),
        g: 9.81,
        alpha_u: FactorSpec::Value(1.0),
        ..collapse::CollapseInput::new(0.6176, 0.0212, material.clone(), -340.0)
    };
    let c = collapse::calculate(&collapse_input).expect("collapse calc");
    assert_relative_eq!(c.p_c.get(0), 13_360_935.56, max_relative = 1e-6);
    assert!(c.passes());

    let propagation_input = propagation::PropagationInput {
        t_corr: Quantity::from(0.0005),
        rho_seawater: Quantity::from(1027.0),
        g: 9.81,
        alpha_u: FactorSpec::Value(1.0),
        alpha_fab: FactorSpec::Value(0.85),
        ..propagation::PropagationInput::new(0.660, 0.0212, material, -410.0)
    };
    let p = propagation::calculate(&propagation_input).expect("propagation calc");
    assert_relative_eq!(p.p_pr.get(0), 2_301_102.5, max_relative = 1e-6);
}

#[test]
fn items_run_from_json_batch() {
    let json = r#"[
        {
            "type": "Containment",
            "label": "Riser base",
            "d_o": 0.6176,
            "t_nom": 0.0212,
            "t_fab": 0.001,
            "t_corr": 0.0005,
            "material": { "smys": 450.0e6, "smts": 535.0e6, "temperature": 60, "family": "C-Mn" },
            "p_d": 240.0e5,
            "h_l": -340,
            "h_ref": 30,
            "rho_cont": 275,
            "rho_t": 1027,
            "rho_seawater": 1027,
            "g": 9.81,
            "alpha_u": "U",
            "alpha_mpt": "medium"
        },
        {
            "type": "Weight",
            "label": "Clad pipe",
            "pipe": { "d_o": 0.3229, "wt": 0.0185 },
            "internal_layers": [ { "thickness": 0.003, "density": 7000 } ]
        }
    ]"#;
    let items: Vec<CalculationItem> = serde_json::from_str(json).expect("parse items");
    assert_eq!(items.len(), 2);

    match items[0].calculate().expect("containment item") {
        CalculationOutput::Containment(r) => {
            assert!((r.containment_unity.get(0) - 0.9286).abs() < 1e-4);
        }
        other => panic!("unexpected output {:?}", other),
    }
    match items[1].calculate().expect("weight item") {
        CalculationOutput::Weight(r) => {
            assert_relative_eq!(r.dry_mass.get(0), 157.54267202070224, max_relative = 1e-10);
        }
        other => panic!("unexpected output {:?}", other),
    }
}

#[test]
fn failing_array_case_is_local() {
    // An inconsistent d_o/d_i/wt triple only blanks its own case
    let json = r#"{
        "type": "Weight",
        "pipe": { "d_o": [0.3229, 0.3229], "d_i": [0.2859, 0.2000], "wt": 0.0185 }
    }"#;
    let item: CalculationItem = serde_json::from_str(json).expect("parse item");
    match item.calculate().expect("weight item") {
        CalculationOutput::Weight(r) => {
            assert!(r.steel_mass.get(0).is_finite());
            assert!(r.steel_mass.get(1).is_nan());
        }
        other => panic!("unexpected output {:?}", other),
    }
}
