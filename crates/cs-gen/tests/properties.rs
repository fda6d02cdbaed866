use cs_components::ElementKind;
use cs_gen::{GenError, GridGenerator, Validator};
use cs_graph::Circuit;
use cs_project::GenerationConfig;
use proptest::prelude::*;

fn assert_no_dangling(circuit: &Circuit) {
    for node in circuit.nodes() {
        assert!(circuit.degree(node.id) >= 2, "node {} dangles", node.name);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn generated_circuits_are_valid(seed in any::<u64>()) {
        let config = GenerationConfig::default();
        let generator = GridGenerator::new(&config).unwrap();
        match generator.generate(seed) {
            Ok(generated) => {
                let circuit = &generated.circuit;
                assert_no_dangling(circuit);
                prop_assert_eq!(circuit.connected_sections(), 1);
                prop_assert_eq!(circuit.count(ElementKind::VoltageSource), 1);
                prop_assert_eq!(circuit.count(ElementKind::CurrentSource), 0);
                prop_assert!(Validator::new(&config).check(circuit).is_accept());
                prop_assert!(generated.attempts <= config.max_attempts);
            }
            Err(GenError::GenerationExhausted { attempts, .. }) => {
                prop_assert_eq!(attempts, config.max_attempts);
            }
            Err(other) => prop_assert!(false, "unexpected error {other}"),
        }
    }

    #[test]
    fn rlc_circuits_have_reactive_elements(seed in any::<u64>()) {
        let config = GenerationConfig { rlc: true, ..GenerationConfig::default() };
        let generator = GridGenerator::new(&config).unwrap();
        if let Ok(generated) = generator.generate(seed) {
            let circuit = &generated.circuit;
            prop_assert_eq!(circuit.count_where(ElementKind::is_independent_source), 1);
            prop_assert!(circuit.count_where(ElementKind::is_reactive) >= 1);
            for elem in circuit.elements() {
                if let Some(spec) = elem.part.spec()
                    && spec.kind == ElementKind::VoltageSource
                {
                    prop_assert!(!spec.probe.is_active());
                }
            }
        }
    }

    #[test]
    fn integrator_circuits_have_exactly_one(seed in any::<u64>()) {
        let config = GenerationConfig { integrator: true, ..GenerationConfig::default() };
        let generator = GridGenerator::new(&config).unwrap();
        if let Ok(generated) = generator.generate(seed) {
            prop_assert_eq!(generated.circuit.count(ElementKind::OpAmpIntegrator), 1);
        }
    }

    #[test]
    fn simple_mode_respects_grid_sizes(seed in any::<u64>()) {
        let config = GenerationConfig { simple: true, max_grid: Some(3), ..GenerationConfig::default() };
        let generator = GridGenerator::new(&config).unwrap();
        if let Ok(generated) = generator.generate(seed) {
            prop_assert!(generated.grid.rows() <= 3);
            prop_assert!(generated.grid.cols() <= 3);
        }
    }
}

#[test]
fn most_seeds_succeed_under_default_config() {
    let config = GenerationConfig::default();
    let generator = GridGenerator::new(&config).unwrap();
    let ok = (0..40).filter(|&s| generator.generate(s).is_ok()).count();
    assert!(ok >= 30, "only {ok} of 40 seeds produced a circuit");
}
