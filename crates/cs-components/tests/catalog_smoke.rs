//! Smoke tests for the element catalog.

use cs_components::{ComponentSpec, ElementKind, Measure, Palette, Probe};

#[test]
fn palette_survives_yaml() {
    let palette = Palette::standard();
    let yaml = serde_yaml::to_string(&palette).unwrap();
    assert!(yaml.contains("resistor"));
    let back: Palette = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(back, palette);
}

#[test]
fn hand_written_palette_parses() {
    let yaml = "inner:\n  resistor: 3\n  capacitor: 1\nouter:\n  short: 2\n";
    let palette: Palette = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(palette.inner.weight(ElementKind::Resistor), 3);
    assert_eq!(palette.outer.weight(ElementKind::Short), 2);
    assert!(palette.allows_reactive());
    assert!(!palette.allows(ElementKind::Inductor));
}

#[test]
fn every_dependent_source_names_a_gain_symbol() {
    for kind in ElementKind::ALL.into_iter().filter(|k| k.is_dependent_source()) {
        let spec = ComponentSpec::new(kind, 1, 2).with_control(0);
        let symbol = spec.symbol();
        assert!(symbol.starts_with("x_") || symbol.starts_with("y_"), "{symbol}");
    }
}

#[test]
fn probe_measure_round_trip() {
    let spec = ComponentSpec::new(ElementKind::Resistor, 1, 10).with_probe(Probe::current(7));
    assert_eq!(spec.probe.measure, Measure::Current);
    assert_eq!(spec.probe.label, Some(7));
    spec.check_probe().unwrap();
}
