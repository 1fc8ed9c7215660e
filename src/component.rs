use crate::node::{Node, NodeId};
use crate::types::SimTime;
use crate::value::LogicValue;
use rand::rngs::StdRng;
use serde_json::Value;
use slotmap::{new_key_type, SlotMap};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

new_key_type! {
    /// Arena handle of a component inside a [`Circuit`](crate::circuit::Circuit).
    pub struct ComponentId;
}

/// Type-specific persisted fields of a component.
pub type Properties = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPin {
    pub name: String,
    /// A change on this input always gets its own recompute, even when it
    /// flips back before the owner would otherwise run.
    pub prefer_spike: bool,
}

/// Fixed pin arity of a component, declared once when it enters a circuit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinLayout {
    pub inputs: Vec<InputPin>,
    pub outputs: Vec<String>,
    /// Two inputs that are brothers (the pair of a two-input gate).
    pub brothers: Option<(usize, usize)>,
}

impl PinLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, name: &str) -> Self {
        self.inputs.push(InputPin {
            name: name.to_string(),
            prefer_spike: false,
        });
        self
    }

    pub fn spike_input(mut self, name: &str) -> Self {
        self.inputs.push(InputPin {
            name: name.to_string(),
            prefer_spike: true,
        });
        self
    }

    /// `count` inputs named `prefix0`, `prefix1`, ...
    pub fn input_bus(mut self, prefix: &str, count: usize) -> Self {
        for i in 0..count {
            self = self.input(&format!("{}{}", prefix, i));
        }
        self
    }

    pub fn output(mut self, name: &str) -> Self {
        self.outputs.push(name.to_string());
        self
    }

    pub fn output_bus(mut self, prefix: &str, count: usize) -> Self {
        for i in 0..count {
            self = self.output(&format!("{}{}", prefix, i));
        }
        self
    }

    pub fn with_brothers(mut self, a: usize, b: usize) -> Self {
        self.brothers = Some((a, b));
        self
    }

    pub fn node_count(&self) -> usize {
        self.inputs.len() + self.outputs.len()
    }

    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|p| p.name == name)
    }

    pub fn output_index(&self, name: &str) -> Option<usize> {
        self.outputs.iter().position(|p| p == name)
    }
}

/// What a recompute may read besides its inputs.
pub struct RecalcContext<'a> {
    pub now: SimTime,
    /// Milliseconds from the circuit's wall-time source.
    pub wall_ms: u64,
    /// Seeded generator owned by the circuit.
    pub rng: &'a mut StdRng,
}

/// Write access to one component's output nodes during propagation.
pub struct OutputPins<'a> {
    nodes: &'a mut SlotMap<NodeId, Node>,
    handles: &'a [NodeId],
}

impl<'a> OutputPins<'a> {
    pub(crate) fn new(nodes: &'a mut SlotMap<NodeId, Node>, handles: &'a [NodeId]) -> Self {
        OutputPins { nodes, handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn set(&mut self, index: usize, value: LogicValue) {
        if let Some(node) = self.handles.get(index).and_then(|id| self.nodes.get_mut(*id)) {
            node.set_value(value);
        }
    }
}

/// A node-owning unit of a circuit.
///
/// `recalc_value` is a function of the current input values and the
/// component's own state and must not touch outputs. `propagate_value` is
/// the only place output values change.
pub trait Component: Any + Send + fmt::Debug {
    /// Type tag used by snapshots.
    fn kind(&self) -> &'static str;

    fn layout(&self) -> PinLayout;

    fn recalc_value(&mut self, inputs: &[LogicValue], ctx: &mut RecalcContext<'_>) -> Vec<LogicValue>;

    fn propagate_value(&mut self, new_state: &[LogicValue], outputs: &mut OutputPins<'_>) {
        for (i, value) in new_state.iter().enumerate() {
            outputs.set(i, *value);
        }
    }

    /// Recomputed every round regardless of input changes (clocks).
    fn is_time_driven(&self) -> bool {
        false
    }

    /// Persisted configuration and state.
    fn properties(&self) -> Properties;

    /// Flip a user-operated switch. Returns false if this component has none.
    fn toggle(&mut self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
