//! # Snapshot Persistence
//!
//! JSON form of a circuit: one entry per component (type tag, editor
//! position, first node id, type-specific fields) and one per wire, joined
//! by stable node ids.
//!
//! ```json
//! {
//!   "config": { "default_wire_delay": 0, "max_iterations": 100, "seed": 0 },
//!   "time": 12,
//!   "components": [
//!     { "type": "input", "first_node": 0, "nodes": "1", "value": true },
//!     { "type": "not", "first_node": 1, "nodes": "10" }
//!   ],
//!   "wires": [ { "start": 0, "end": 1, "delay": 3 } ],
//!   "pending": [ { "at": 14, "start": 0, "end": 1, "value": "True" } ]
//! }
//! ```
//!
//! A malformed component or wire entry is skipped and reported in the
//! [`LoadReport`]; the rest of the circuit is still built.

use crate::circuit::Circuit;
use crate::component::{Component, Properties};
use crate::components::{
    Alu, Clock, Comparator, Counter, Decoder, Demux, FlipFlop, FlipFlopKind, Gate, GateKind, LogicInput,
    LogicOutput, Mux, Ram, RandomBit, Register, Rom, ShiftRegister, SrLatch, TriStateBuffer,
};
use crate::config::SimConfig;
use crate::error::SnapshotError;
use crate::node::{Node, NodeId, NodeSerial};
use crate::types::SimTime;
use crate::value::LogicValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CircuitSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<SimConfig>,
    /// Round clock at save time.
    #[serde(default)]
    pub time: u64,
    #[serde(default)]
    pub components: Vec<ComponentSnapshot>,
    #[serde(default)]
    pub wires: Vec<WireSnapshot>,
    /// Deliveries still travelling along delayed wires, in apply order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending: Vec<DeliverySnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSnapshot {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Id of the first node; the rest follow consecutively, inputs first.
    pub first_node: NodeSerial,
    /// Stored node levels, inputs then outputs, one `0/1/Z/X` char each.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<String>,
    #[serde(flatten)]
    pub properties: Properties,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireSnapshot {
    pub start: NodeSerial,
    pub end: NodeSerial,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,
}

/// A value on its way from `start` to `end` over a delayed wire, due at
/// round `at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverySnapshot {
    pub at: u64,
    pub start: NodeSerial,
    pub end: NodeSerial,
    pub value: LogicValue,
}

impl CircuitSnapshot {
    pub fn from_json_str(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &str) -> Result<Self, SnapshotError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn to_json_string(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save_to_file(&self, path: &str) -> Result<(), SnapshotError> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}

/// An entry that was left out of a loaded circuit.
#[derive(Debug)]
pub struct SkippedEntry {
    /// Position in the snapshot's `components` or `wires` list.
    pub index: usize,
    pub kind: String,
    pub error: SnapshotError,
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub skipped: Vec<SkippedEntry>,
    pub skipped_wires: Vec<SkippedEntry>,
    pub skipped_pending: Vec<SkippedEntry>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.skipped_wires.is_empty() && self.skipped_pending.is_empty()
    }
}

pub type Constructor = Box<dyn Fn(&Properties) -> Result<Box<dyn Component>, SnapshotError> + Send + Sync>;

/// Builds components from their type tag and persisted properties.
pub struct ComponentFactory {
    component_registry: HashMap<String, Constructor>,
}

impl Default for ComponentFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentFactory {
    pub fn new() -> Self {
        let mut factory = ComponentFactory {
            component_registry: HashMap::new(),
        };
        factory.register_default_components();
        factory
    }

    /// A factory that knows no types.
    pub fn empty() -> Self {
        ComponentFactory {
            component_registry: HashMap::new(),
        }
    }

    fn register_default_components(&mut self) {
        self.register("input", |p| Ok(Box::new(LogicInput::from_properties(p)?)));
        self.register("output", |_| Ok(Box::new(LogicOutput::new())));
        self.register("clock", |p| Ok(Box::new(Clock::from_properties(p)?)));
        self.register("tristate", |_| Ok(Box::new(TriStateBuffer::new())));
        for kind in GateKind::ALL {
            self.register(kind.tag(), move |p| Ok(Box::new(Gate::from_properties(kind, p)?)));
        }

        self.register("sr_latch", |p| Ok(Box::new(SrLatch::from_properties(p)?)));
        for kind in [FlipFlopKind::D, FlipFlopKind::T, FlipFlopKind::Jk] {
            self.register(kind.tag(), move |p| Ok(Box::new(FlipFlop::from_properties(kind, p)?)));
        }
        self.register("register", |p| Ok(Box::new(Register::from_properties(p)?)));
        self.register("shift_register", |p| Ok(Box::new(ShiftRegister::from_properties(p)?)));
        self.register("counter", |p| Ok(Box::new(Counter::from_properties(p)?)));
        self.register("random", |p| Ok(Box::new(RandomBit::from_properties(p)?)));

        self.register("ram", |p| Ok(Box::new(Ram::from_properties(p)?)));
        self.register("rom", |p| Ok(Box::new(Rom::from_properties(p)?)));

        self.register("mux", |p| Ok(Box::new(Mux::from_properties(p)?)));
        self.register("demux", |p| Ok(Box::new(Demux::from_properties(p)?)));
        self.register("decoder", |p| Ok(Box::new(Decoder::from_properties(p)?)));
        self.register("alu", |p| Ok(Box::new(Alu::from_properties(p)?)));
        self.register("comparator", |p| Ok(Box::new(Comparator::from_properties(p)?)));
    }

    pub fn register<F>(&mut self, tag: &str, constructor: F)
    where
        F: Fn(&Properties) -> Result<Box<dyn Component>, SnapshotError> + Send + Sync + 'static,
    {
        self.component_registry.insert(tag.to_string(), Box::new(constructor));
    }

    pub fn create(&self, tag: &str, properties: &Properties) -> Result<Box<dyn Component>, SnapshotError> {
        let constructor = self
            .component_registry
            .get(tag)
            .ok_or_else(|| SnapshotError::UnknownComponentType(tag.to_string()))?;
        constructor(properties)
    }

    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.component_registry.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Rebuild a circuit. Entries that fail are skipped and listed in the
    /// report.
    pub fn build(&self, snapshot: &CircuitSnapshot, config: SimConfig) -> (Circuit, LoadReport) {
        let mut circuit = Circuit::new(config);
        let mut report = LoadReport::default();
        let mut restored = Vec::new();

        for (index, entry) in snapshot.components.iter().enumerate() {
            match self.restore_component(&mut circuit, entry) {
                Ok(restore) => restored.push(restore),
                Err(error) => {
                    warn!("skipping component #{} ({}): {}", index, entry.kind, error);
                    report.skipped.push(SkippedEntry {
                        index,
                        kind: entry.kind.clone(),
                        error,
                    });
                }
            }
        }

        for (index, wire) in snapshot.wires.iter().enumerate() {
            if let Err(error) = restore_wire(&mut circuit, wire) {
                warn!("skipping wire #{} ({} -> {}): {}", index, wire.start, wire.end, error);
                report.skipped_wires.push(SkippedEntry {
                    index,
                    kind: "wire".to_string(),
                    error,
                });
            }
        }

        // Wiring re-sent driver levels; put the saved levels back.
        circuit.clear_timeline();
        for (nodes, values) in &restored {
            for (node, value) in nodes.iter().zip(values) {
                circuit.restore_node_value(*node, *value);
            }
        }
        circuit.resolve_all_groups();
        circuit.set_now(SimTime::new(snapshot.time));

        for (index, delivery) in snapshot.pending.iter().enumerate() {
            if let Err(error) = restore_delivery(&mut circuit, delivery) {
                warn!(
                    "dropping delivery #{} ({} -> {} at {}): {}",
                    index, delivery.start, delivery.end, delivery.at, error
                );
                report.skipped_pending.push(SkippedEntry {
                    index,
                    kind: "delivery".to_string(),
                    error,
                });
            }
        }
        circuit.mark_all_dirty();

        debug!(
            "loaded {} components and {} wires ({} skipped)",
            circuit.component_count(),
            circuit.wires().count(),
            report.skipped.len() + report.skipped_wires.len() + report.skipped_pending.len()
        );
        (circuit, report)
    }

    fn restore_component(
        &self,
        circuit: &mut Circuit,
        entry: &ComponentSnapshot,
    ) -> Result<(Vec<NodeId>, Vec<LogicValue>), SnapshotError> {
        let component = self.create(&entry.kind, &entry.properties)?;
        let expected = component.layout().node_count();
        let values = match &entry.nodes {
            Some(encoded) => {
                let values = LogicValue::decode(encoded);
                if values.len() != expected {
                    return Err(SnapshotError::NodeCountMismatch {
                        kind: entry.kind.clone(),
                        expected,
                        found: values.len(),
                    });
                }
                values
            }
            None => Vec::new(),
        };

        let id = circuit.insert_component_at(component, entry.first_node)?;
        circuit.set_label(id, entry.label.clone())?;
        circuit.set_position(id, entry.position)?;
        let nodes = circuit
            .entry(id)
            .map(|e| e.inputs().iter().chain(e.outputs()).copied().collect())
            .unwrap_or_default();
        Ok((nodes, values))
    }
}

fn restore_wire(circuit: &mut Circuit, wire: &WireSnapshot) -> Result<(), SnapshotError> {
    let start = circuit
        .node_by_serial(wire.start)
        .ok_or(SnapshotError::DanglingWire(wire.start))?;
    let end = circuit
        .node_by_serial(wire.end)
        .ok_or(SnapshotError::DanglingWire(wire.end))?;
    let id = circuit.connect(start, end)?.wire();
    circuit.set_wire_delay(id, wire.delay)?;
    Ok(())
}

/// Put a saved delivery back on the timeline of the directional wire it was
/// travelling on.
fn restore_delivery(circuit: &mut Circuit, delivery: &DeliverySnapshot) -> Result<(), SnapshotError> {
    let start = circuit
        .node_by_serial(delivery.start)
        .ok_or(SnapshotError::DanglingWire(delivery.start))?;
    let end = circuit
        .node_by_serial(delivery.end)
        .ok_or(SnapshotError::DanglingWire(delivery.end))?;
    let wire = circuit
        .wires()
        .find(|(_, w)| w.is_driving() && w.start() == start && w.end() == Some(end))
        .map(|(id, _)| id)
        .ok_or(SnapshotError::UnknownDelivery {
            start: delivery.start,
            end: delivery.end,
        })?;
    circuit.schedule_delivery(wire, SimTime::new(delivery.at), end, delivery.value);
    Ok(())
}

impl Circuit {
    /// Current state as a snapshot, including deliveries still in flight.
    pub fn snapshot(&self) -> CircuitSnapshot {
        let components = self
            .component_ids()
            .into_iter()
            .filter_map(|id| self.entry(id))
            .map(|entry| {
                let nodes: Vec<&Node> = entry
                    .inputs()
                    .iter()
                    .chain(entry.outputs())
                    .filter_map(|n| self.node(*n))
                    .collect();
                let values: Vec<LogicValue> = nodes.iter().map(|n| n.driven_value()).collect();
                ComponentSnapshot {
                    kind: entry.component().kind().to_string(),
                    position: entry.position(),
                    label: entry.label().map(str::to_string),
                    first_node: nodes.first().map_or(0, |n| n.serial()),
                    nodes: Some(LogicValue::encode(&values)),
                    properties: entry.component().properties(),
                }
            })
            .collect();

        let mut wires: Vec<WireSnapshot> = self
            .wires()
            .filter(|(_, w)| !w.is_provisional())
            .filter_map(|(_, w)| {
                let start = self.node(w.start())?.serial();
                let end = self.node(w.end()?)?.serial();
                Some(WireSnapshot {
                    start,
                    end,
                    delay: w.delay(),
                })
            })
            .collect();
        wires.sort_by_key(|w| (w.start, w.end));

        let pending = self
            .timeline()
            .pending_ordered()
            .into_iter()
            .filter_map(|event| {
                let wire = self.wire(event.wire)?;
                Some(DeliverySnapshot {
                    at: event.at.ticks(),
                    start: self.node(wire.start())?.serial(),
                    end: self.node(event.node)?.serial(),
                    value: event.value,
                })
            })
            .collect();

        CircuitSnapshot {
            config: Some(self.config().clone()),
            time: self.now().ticks(),
            components,
            wires,
            pending,
        }
    }

    /// Rebuild with the default factory and the snapshot's own config.
    pub fn from_snapshot(snapshot: &CircuitSnapshot) -> (Circuit, LoadReport) {
        let config = snapshot.config.clone().unwrap_or_default();
        ComponentFactory::new().build(snapshot, config)
    }

    pub fn load_json(json: &str) -> Result<(Circuit, LoadReport), SnapshotError> {
        Ok(Circuit::from_snapshot(&CircuitSnapshot::from_json_str(json)?))
    }

    pub fn save_json(&self) -> Result<String, SnapshotError> {
        self.snapshot().to_json_string()
    }
}
