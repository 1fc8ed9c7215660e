//! Circuit builders shared by the integration tests.

#![allow(dead_code)]

use rusty_logic::components::{LogicInput, LogicOutput};
use rusty_logic::{Circuit, ComponentId, InputEvent, LogicValue, NodeId, SimConfig, WireId};

pub fn circuit() -> Circuit {
    Circuit::new(SimConfig::default())
}

/// A switch and its output node.
pub fn switch(c: &mut Circuit, value: bool) -> (ComponentId, NodeId) {
    let id = c.add_component(LogicInput::new(value));
    let out = c.output_node(id, 0).unwrap();
    (id, out)
}

/// One switch per bit of `word`, least significant first.
pub fn switch_bus(c: &mut Circuit, word: u64, width: usize) -> Vec<(ComponentId, NodeId)> {
    (0..width).map(|i| switch(c, (word >> i) & 1 == 1)).collect()
}

/// A probe and its input node.
pub fn probe(c: &mut Circuit) -> (ComponentId, NodeId) {
    let id = c.add_component(LogicOutput::new());
    let input = c.input_node(id, 0).unwrap();
    (id, input)
}

pub fn wire(c: &mut Circuit, from: NodeId, to: NodeId) -> WireId {
    c.connect(from, to).unwrap().wire()
}

/// Wire a switch to a named pin of `target`.
pub fn drive(c: &mut Circuit, source: NodeId, target: ComponentId, pin: &str) -> WireId {
    let to = c.pin(target, pin).unwrap();
    wire(c, source, to)
}

pub fn value(c: &Circuit, node: NodeId) -> LogicValue {
    c.node_value(node).unwrap()
}

pub fn pin_value(c: &Circuit, component: ComponentId, pin: &str) -> LogicValue {
    value(c, c.pin(component, pin).unwrap())
}

/// Queue the toggles that bring a bus of switches to `word`.
pub fn set_bus(c: &mut Circuit, bus: &[(ComponentId, NodeId)], word: u64) {
    for (i, (id, _)) in bus.iter().enumerate() {
        let want = (word >> i) & 1 == 1;
        let have = c.component_as::<LogicInput>(*id).map(LogicInput::value);
        if have != Some(want) {
            c.enqueue(InputEvent::ToggleInput { component: *id });
        }
    }
}

/// Raise then lower a switch used as a clock, one round each.
pub fn pulse(c: &mut Circuit, clock: ComponentId) {
    let high = c.component_as::<LogicInput>(clock).map_or(false, LogicInput::value);
    if high {
        c.enqueue(InputEvent::ToggleInput { component: clock });
        c.step();
    }
    c.enqueue(InputEvent::ToggleInput { component: clock });
    c.step();
    c.enqueue(InputEvent::ToggleInput { component: clock });
    c.step();
}
