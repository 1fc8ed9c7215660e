//! JSON snapshot integration tests: save, reload and replay.

mod common;

use common::*;
use rusty_logic::components::{
    Counter, Edge, EdgeTrigger, FlipFlop, FlipFlopKind, Gate, GateKind, LogicInput, LogicOutput, Ram,
};
use rusty_logic::{
    Circuit, CircuitSnapshot, Component, ComponentFactory, ComponentId, InputEvent, LogicValue, PinLayout,
    Properties, RecalcContext, SimConfig, SnapshotError,
};
use std::any::Any;

/// A small sequential circuit: a counter clocked by a switch, a D flip-flop
/// sampling the counter's low bit, a gate and a RAM cell fed by the same
/// switches.
fn build_sample() -> (Circuit, Vec<ComponentId>) {
    let mut c = Circuit::new(SimConfig::default().with_seed(3));
    let (clk_sw, clk) = switch(&mut c, false);
    let (en_sw, en) = switch(&mut c, true);
    let counter = c.add_component(Counter::new(3, EdgeTrigger::new(Edge::Rising)));
    let ff = c.add_component(FlipFlop::new(FlipFlopKind::D, EdgeTrigger::new(Edge::Falling)));
    let and = c.add_component(Gate::new(GateKind::And));
    let ram = c.add_component(Ram::new(1, 3, EdgeTrigger::new(Edge::Rising)));
    let (_, probe_in) = probe(&mut c);

    drive(&mut c, clk, counter, "CLK");
    drive(&mut c, clk, ff, "CLK");
    let q0 = c.pin(counter, "Q0").unwrap();
    drive(&mut c, q0, ff, "D");
    let ff_q = c.pin(ff, "Q").unwrap();
    drive(&mut c, ff_q, and, "I0");
    drive(&mut c, en, and, "I1");
    let and_out = c.output_node(and, 0).unwrap();
    let w = wire(&mut c, and_out, probe_in);
    c.set_wire_delay(w, Some(2)).unwrap();
    for i in 0..3 {
        let q = c.pin(counter, &format!("Q{}", i)).unwrap();
        drive(&mut c, q, ram, &format!("D{}", i));
    }
    drive(&mut c, en, ram, "WE");
    drive(&mut c, clk, ram, "CLK");
    c.set_label(clk_sw, Some("clk".into())).unwrap();
    c.set_label(en_sw, Some("en".into())).unwrap();
    c.settle(10);
    (c, vec![clk_sw, en_sw])
}

fn outputs(c: &Circuit) -> Vec<Vec<LogicValue>> {
    c.component_ids()
        .into_iter()
        .map(|id| c.output_values(id).unwrap())
        .collect()
}

/// Apply the same toggles to a circuit and record every output after each
/// round.
fn replay(c: &mut Circuit, script: &[&str]) -> Vec<Vec<Vec<LogicValue>>> {
    script
        .iter()
        .map(|label| {
            if !label.is_empty() {
                let id = c.find_labeled(label).unwrap();
                c.enqueue(InputEvent::ToggleInput { component: id });
            }
            c.step();
            outputs(c)
        })
        .collect()
}

const SCRIPT: &[&str] = &["clk", "clk", "", "clk", "en", "clk", "", "", "clk", "clk", "en", "", ""];

#[cfg(test)]
mod round_trip_tests {
    use super::*;

    #[test]
    fn test_reload_replays_identically() {
        let (mut original, switches) = build_sample();
        for _ in 0..3 {
            pulse(&mut original, switches[0]);
        }
        original.settle(10);
        assert!(original.is_quiescent());

        let json = original.save_json().unwrap();
        let (mut loaded, report) = Circuit::load_json(&json).unwrap();
        assert!(report.is_clean());
        loaded.step();
        original.step();
        assert_eq!(outputs(&loaded), outputs(&original));

        assert_eq!(replay(&mut loaded, SCRIPT), replay(&mut original, SCRIPT));
        assert_eq!(loaded.now(), original.now());
    }

    #[test]
    fn test_saved_state_survives_a_file() {
        let (mut c, switches) = build_sample();
        pulse(&mut c, switches[0]);
        pulse(&mut c, switches[0]);
        c.settle(10);
        let counter = c.component_ids()[2];
        assert_eq!(c.component_as::<Counter>(counter).unwrap().count(), 2);

        let path = std::env::temp_dir().join(format!("rusty_logic_snapshot_{}.json", std::process::id()));
        let path = path.to_string_lossy().to_string();
        c.snapshot().save_to_file(&path).unwrap();
        let snapshot = CircuitSnapshot::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(snapshot, c.snapshot());
        let (loaded, _) = Circuit::from_snapshot(&snapshot);
        let counter = loaded.component_ids()[2];
        assert_eq!(loaded.component_as::<Counter>(counter).unwrap().count(), 2);
        assert_eq!(loaded.find_labeled("en").map(|id| loaded.component_as::<LogicInput>(id).is_some()), Some(true));
    }

    #[test]
    fn test_reload_mid_delay_keeps_deliveries() {
        let mut original = circuit();
        let (sw, out) = switch(&mut original, false);
        let (_, input) = probe(&mut original);
        let w = wire(&mut original, out, input);
        original.set_wire_delay(w, Some(3)).unwrap();
        original.step();
        original.enqueue(InputEvent::ToggleInput { component: sw });
        original.step();
        original.enqueue(InputEvent::ToggleInput { component: sw });
        original.step();
        assert_eq!(original.timeline().len(), 2);

        let snapshot = original.snapshot();
        assert_eq!(snapshot.pending.len(), 2);
        assert_eq!((snapshot.pending[0].at, snapshot.pending[0].value), (4, LogicValue::True));
        assert_eq!((snapshot.pending[1].at, snapshot.pending[1].value), (5, LogicValue::False));

        let (mut loaded, report) = Circuit::load_json(&snapshot.to_json_string().unwrap()).unwrap();
        assert!(report.is_clean());
        assert_eq!(loaded.timeline().len(), 2);

        let serial = original.node(input).unwrap().serial();
        let trace = |c: &mut Circuit| {
            let node = c.node_by_serial(serial).unwrap();
            (0..5)
                .map(|_| {
                    c.step();
                    value(c, node)
                })
                .collect::<Vec<_>>()
        };
        let expected = vec![LogicValue::False, LogicValue::True, LogicValue::False, LogicValue::False, LogicValue::False];
        assert_eq!(trace(&mut original), expected);
        assert_eq!(trace(&mut loaded), expected);
    }

    #[test]
    fn test_build_uses_given_config() {
        let (c, _) = build_sample();
        let snapshot = c.snapshot();
        assert_eq!(snapshot.config.as_ref().map(|cfg| cfg.seed), Some(3));

        let (loaded, report) = ComponentFactory::new().build(&snapshot, SimConfig::default().with_max_iterations(5));
        assert!(report.is_clean());
        assert_eq!(loaded.config().max_iterations, 5);
        assert_eq!(loaded.wires().count(), c.wires().count());
    }
}

#[cfg(test)]
mod malformed_snapshot_tests {
    use super::*;

    const DAMAGED: &str = r#"{
        "time": 12,
        "components": [
            { "type": "input", "first_node": 0, "nodes": "1", "value": true },
            { "type": "not", "first_node": 1, "nodes": "10" },
            { "type": "time_machine", "first_node": 3 },
            { "type": "counter", "first_node": 5, "bits": 99 },
            { "type": "output", "first_node": 2 },
            { "type": "output", "first_node": 20 }
        ],
        "wires": [
            { "start": 0, "end": 1 },
            { "start": 2, "end": 20 },
            { "start": 2, "end": 7 }
        ]
    }"#;

    #[test]
    fn test_bad_entries_are_reported_and_the_rest_loads() {
        let (mut circuit, report) = Circuit::load_json(DAMAGED).unwrap();
        assert!(!report.is_clean());
        assert_eq!(circuit.component_count(), 3);
        assert_eq!(circuit.now().ticks(), 12);

        let skipped: Vec<usize> = report.skipped.iter().map(|s| s.index).collect();
        assert_eq!(skipped, vec![2, 3, 4]);
        assert!(matches!(report.skipped[0].error, SnapshotError::UnknownComponentType(_)));
        assert!(matches!(report.skipped[1].error, SnapshotError::InvalidProperty { .. }));
        assert!(matches!(report.skipped[2].error, SnapshotError::NodeIdCollision(2)));
        assert_eq!(report.skipped_wires.len(), 1);
        assert_eq!(report.skipped_wires[0].index, 2);

        circuit.step();
        // input -> not -> output survived intact.
        let probe = *circuit.component_ids().last().unwrap();
        assert_eq!(circuit.node_value(circuit.input_node(probe, 0).unwrap()).unwrap(), LogicValue::False);
    }

    #[test]
    fn test_node_ids_at_the_end_of_the_range() {
        let json = r#"{
            "components": [
                { "type": "and", "first_node": 4294967295 },
                { "type": "and", "first_node": 4294967292 },
                { "type": "input", "first_node": 0, "value": true },
                { "type": "input", "first_node": 0 }
            ],
            "wires": [
                { "start": 0, "end": 4294967292 },
                { "start": 4294967295, "end": 4294967293 }
            ],
            "pending": [
                { "at": 5, "start": 0, "end": 4294967293, "value": "True" }
            ]
        }"#;
        let (mut circuit, report) = Circuit::load_json(json).unwrap();
        assert_eq!(circuit.component_count(), 2);

        let skipped: Vec<usize> = report.skipped.iter().map(|s| s.index).collect();
        assert_eq!(skipped, vec![0, 3]);
        assert!(matches!(
            report.skipped[0].error,
            SnapshotError::InvalidProperty { ref key, .. } if key == "first_node"
        ));
        assert!(matches!(report.skipped[1].error, SnapshotError::NodeIdCollision(0)));

        // The second wire points at the gate that was left out.
        assert_eq!(report.skipped_wires.len(), 1);
        assert_eq!(report.skipped_wires[0].index, 1);
        assert!(matches!(report.skipped_wires[0].error, SnapshotError::DanglingWire(4294967295)));
        assert_eq!(report.skipped_pending.len(), 1);
        assert!(matches!(
            report.skipped_pending[0].error,
            SnapshotError::UnknownDelivery { start: 0, end: 4294967293 }
        ));

        circuit.step();
        let gate_in = circuit.node_by_serial(4294967292).unwrap();
        assert_eq!(circuit.node_value(gate_in).unwrap(), LogicValue::True);

        // Serials past the top are exhausted; new parts take the lowest gap.
        let probe = circuit.add_component(LogicOutput::new());
        let probe_in = circuit.input_node(probe, 0).unwrap();
        assert_eq!(circuit.node(probe_in).unwrap().serial(), 1);
    }

    #[test]
    fn test_truncated_json_fails_whole_load() {
        assert!(matches!(
            CircuitSnapshot::from_json_str(&DAMAGED[..40]),
            Err(SnapshotError::Json(_))
        ));
    }
}

/// Always drives its single output high.
#[derive(Debug)]
struct Pullup;

impl Component for Pullup {
    fn kind(&self) -> &'static str {
        "pullup"
    }

    fn layout(&self) -> PinLayout {
        PinLayout::new().output("OUT")
    }

    fn recalc_value(&mut self, _inputs: &[LogicValue], _ctx: &mut RecalcContext<'_>) -> Vec<LogicValue> {
        vec![LogicValue::True]
    }

    fn properties(&self) -> Properties {
        Properties::new()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod factory_tests {
    use super::*;

    #[test]
    fn test_custom_component_registration() {
        let mut factory = ComponentFactory::empty();
        factory.register("pullup", |_| Ok(Box::new(Pullup)));
        factory.register("not", |p| Ok(Box::new(Gate::from_properties(GateKind::Not, p)?)));
        assert_eq!(factory.kinds(), vec!["not", "pullup"]);

        let snapshot = CircuitSnapshot::from_json_str(
            r#"{
                "components": [
                    { "type": "pullup", "first_node": 0 },
                    { "type": "not", "first_node": 1 },
                    { "type": "input", "first_node": 3 }
                ],
                "wires": [ { "start": 0, "end": 1 } ]
            }"#,
        )
        .unwrap();
        let (mut circuit, report) = factory.build(&snapshot, SimConfig::default());
        assert_eq!(report.skipped.len(), 1);
        assert!(matches!(report.skipped[0].error, SnapshotError::UnknownComponentType(ref t) if t == "input"));

        circuit.step();
        let not = circuit.component_ids()[1];
        assert_eq!(circuit.output_values(not).unwrap(), vec![LogicValue::False]);
        assert_eq!(circuit.snapshot().components[0].kind, "pullup");
    }
}
