//! # Circuit Evaluation Context
//!
//! Owns the node, wire and component arenas of one circuit and advances it
//! in discrete rounds.
//!
//! ## Round Structure
//!
//! 1. queued [`InputEvent`]s are applied in the order they were enqueued
//! 2. wires with a dead endpoint are destroyed
//! 3. timeline deliveries due at the current time are applied (FIFO on ties)
//! 4. time-driven components (clocks) are marked dirty
//! 5. dirty components are recomputed in passes, ordered by topological rank,
//!    until none is dirty or `max_iterations` passes have run
//! 6. the round clock advances by one tick
//!
//! ## Usage
//!
//! ```rust
//! use rusty_logic::{Circuit, InputEvent, LogicValue, SimConfig};
//! use rusty_logic::components::{Gate, GateKind, LogicInput};
//!
//! let mut circuit = Circuit::new(SimConfig::default());
//! let switch = circuit.add_component(LogicInput::new(false));
//! let not = circuit.add_component(Gate::new(GateKind::Not));
//! circuit
//!     .connect(circuit.output_node(switch, 0)?, circuit.input_node(not, 0)?)
//!     .expect("free input");
//! circuit.step();
//! assert_eq!(circuit.node_value(circuit.output_node(not, 0)?)?, LogicValue::True);
//!
//! circuit.enqueue(InputEvent::ToggleInput { component: switch });
//! circuit.step();
//! assert_eq!(circuit.node_value(circuit.output_node(not, 0)?)?, LogicValue::False);
//! # Ok::<(), rusty_logic::CircuitError>(())
//! ```

use crate::component::{Component, ComponentId, OutputPins, RecalcContext};
use crate::components::clock::{Clock, SystemTimeSource, TimeSource};
use crate::config::SimConfig;
use crate::error::{CircuitError, EvalWarning, SnapshotError};
use crate::event::InputEvent;
use crate::node::{Direction, Node, NodeId, NodeSerial};
use crate::scheduler::Timeline;
use crate::types::SimTime;
use crate::value::LogicValue;
use crate::wire::{classify_completion, Completion, Wire, WireId, WireKind, WireOutcome};
use rand::rngs::StdRng;
use rand::SeedableRng;
use slotmap::SlotMap;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::ops::Range;
use tracing::{debug, trace, warn};

/// A component together with the nodes it owns.
#[derive(Debug)]
pub struct ComponentEntry {
    serial: u64,
    component: Box<dyn Component>,
    inputs: Vec<NodeId>,
    outputs: Vec<NodeId>,
    rank: u32,
    time_driven: bool,
    label: Option<String>,
    position: Option<[f64; 2]>,
}

impl ComponentEntry {
    /// Insertion order; snapshots list components by it.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn component(&self) -> &dyn Component {
        self.component.as_ref()
    }

    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[NodeId] {
        &self.outputs
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Editor metadata. The engine never reads it.
    pub fn position(&self) -> Option<[f64; 2]> {
        self.position
    }

    fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.inputs.iter().chain(&self.outputs).copied()
    }
}

/// Outcome of one [`Circuit::step`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundReport {
    pub time: SimTime,
    /// Component recomputes run in this round.
    pub recomputed: usize,
    pub passes: usize,
    /// Timeline deliveries applied at the start of the round.
    pub applied_events: usize,
    /// Wires destroyed because an endpoint no longer exists.
    pub removed_wires: usize,
    /// Queued input events that could not be applied.
    pub rejected: Vec<CircuitError>,
    pub warning: Option<EvalWarning>,
}

impl RoundReport {
    pub fn is_stable(&self) -> bool {
        self.warning.is_none()
    }
}

type DirtyKey = (u32, u64, ComponentId);

/// Components awaiting recompute, ordered by `(rank, serial)`.
///
/// During a pass the last popped key is the cursor. A component marked at
/// or before the cursor runs in the next pass; one marked after it still
/// runs in the current pass.
#[derive(Debug, Default)]
struct DirtyQueue {
    current: BTreeSet<DirtyKey>,
    next: BTreeSet<DirtyKey>,
    cursor: Option<DirtyKey>,
}

impl DirtyQueue {
    fn mark(&mut self, key: DirtyKey) {
        match self.cursor {
            Some(cursor) if key <= cursor => {
                self.next.insert(key);
            }
            _ => {
                self.current.insert(key);
            }
        }
    }

    fn begin_pass(&mut self) {
        self.cursor = None;
        let next = std::mem::take(&mut self.next);
        self.current.extend(next);
    }

    fn pop(&mut self) -> Option<ComponentId> {
        let key = self.current.pop_first()?;
        self.cursor = Some(key);
        Some(key.2)
    }

    fn end_pass(&mut self) {
        self.cursor = None;
    }

    fn is_empty(&self) -> bool {
        self.current.is_empty() && self.next.is_empty()
    }

    fn remove(&mut self, id: ComponentId) {
        self.current.retain(|k| k.2 != id);
        self.next.retain(|k| k.2 != id);
    }

    fn pending(&self) -> Vec<ComponentId> {
        let mut seen = HashSet::new();
        self.current
            .iter()
            .chain(&self.next)
            .map(|k| k.2)
            .filter(|id| seen.insert(*id))
            .collect()
    }

    fn rekey(&mut self, key_of: impl Fn(ComponentId) -> Option<DirtyKey>) {
        let pending = self.pending();
        self.current.clear();
        self.next.clear();
        self.cursor = None;
        self.current.extend(pending.into_iter().filter_map(key_of));
    }
}

/// The single evaluation context of a circuit. Only the engine mutates node
/// values; outside callers go through [`Circuit::enqueue`].
pub struct Circuit {
    config: SimConfig,
    nodes: SlotMap<NodeId, Node>,
    components: SlotMap<ComponentId, ComponentEntry>,
    wires: SlotMap<WireId, Wire>,
    timeline: Timeline,
    pending: VecDeque<InputEvent>,
    drawing: Option<WireId>,
    dirty: DirtyQueue,
    now: SimTime,
    rng: StdRng,
    time_source: Box<dyn TimeSource>,
    node_by_serial: HashMap<NodeSerial, NodeId>,
    next_component_serial: u64,
    next_node_serial: NodeSerial,
    ranks_stale: bool,
}

impl Circuit {
    pub fn new(config: SimConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Circuit {
            config,
            nodes: SlotMap::with_key(),
            components: SlotMap::with_key(),
            wires: SlotMap::with_key(),
            timeline: Timeline::new(),
            pending: VecDeque::new(),
            drawing: None,
            dirty: DirtyQueue::default(),
            now: SimTime::ZERO,
            rng,
            time_source: Box::new(SystemTimeSource::new()),
            node_by_serial: HashMap::new(),
            next_component_serial: 0,
            next_node_serial: 0,
            ranks_stale: false,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub(crate) fn set_now(&mut self, now: SimTime) {
        self.now = now;
    }

    /// Replace the wall-time source clocks read from.
    pub fn set_time_source(&mut self, source: Box<dyn TimeSource>) {
        self.time_source = source;
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    // ---- components ------------------------------------------------------

    pub fn add_component<C: Component>(&mut self, component: C) -> ComponentId {
        self.add_boxed(Box::new(component))
    }

    pub fn add_boxed(&mut self, component: Box<dyn Component>) -> ComponentId {
        let count = component.layout().node_count() as NodeSerial;
        let first = self.free_serials(count);
        self.insert_entry(component, first..first.saturating_add(count))
    }

    /// Insert with node serials starting at `first_node`, as recorded in a
    /// snapshot.
    pub(crate) fn insert_component_at(
        &mut self,
        component: Box<dyn Component>,
        first_node: NodeSerial,
    ) -> Result<ComponentId, SnapshotError> {
        let count = NodeSerial::try_from(component.layout().node_count())
            .map_err(|_| SnapshotError::invalid_property("first_node", "too many nodes"))?;
        let end = first_node.checked_add(count).ok_or_else(|| {
            SnapshotError::invalid_property("first_node", format!("{} + {} nodes is out of range", first_node, count))
        })?;
        if let Some(serial) = (first_node..end).find(|s| self.node_by_serial.contains_key(s)) {
            return Err(SnapshotError::NodeIdCollision(serial));
        }
        Ok(self.insert_entry(component, first_node..end))
    }

    /// First of `count` consecutive unused node serials. Serials past the
    /// highest one in use are preferred; once those run out the lowest gap
    /// is taken.
    fn free_serials(&self, count: NodeSerial) -> NodeSerial {
        if self.next_node_serial.checked_add(count).is_some() {
            return self.next_node_serial;
        }
        let mut used: Vec<NodeSerial> = self.node_by_serial.keys().copied().collect();
        used.sort_unstable();
        let mut candidate: NodeSerial = 0;
        for serial in used {
            if serial.saturating_sub(candidate) >= count {
                break;
            }
            candidate = candidate.max(serial.saturating_add(1));
        }
        candidate
    }

    /// `serials` must hold exactly one unused serial per node of `component`.
    fn insert_entry(&mut self, component: Box<dyn Component>, mut serials: Range<NodeSerial>) -> ComponentId {
        let layout = component.layout();
        let serial = self.next_component_serial;
        self.next_component_serial += 1;
        let (first_node, end) = (serials.start, serials.end);
        let time_driven = component.is_time_driven();
        let id = self.components.insert(ComponentEntry {
            serial,
            component,
            inputs: Vec::with_capacity(layout.inputs.len()),
            outputs: Vec::with_capacity(layout.outputs.len()),
            rank: u32::MAX,
            time_driven,
            label: None,
            position: None,
        });

        let mut inputs = Vec::with_capacity(layout.inputs.len());
        for ((index, pin), node_serial) in layout.inputs.iter().enumerate().zip(&mut serials) {
            let mut node = Node::new(node_serial, Direction::Input, id, index, pin.name.clone());
            node.set_prefer_spike(pin.prefer_spike);
            let node_id = self.nodes.insert(node);
            self.node_by_serial.insert(node_serial, node_id);
            inputs.push(node_id);
        }
        let mut outputs = Vec::with_capacity(layout.outputs.len());
        for ((index, name), node_serial) in layout.outputs.iter().enumerate().zip(&mut serials) {
            let node_id = self
                .nodes
                .insert(Node::new(node_serial, Direction::Output, id, index, name.clone()));
            self.node_by_serial.insert(node_serial, node_id);
            outputs.push(node_id);
        }
        self.next_node_serial = self.next_node_serial.max(end);

        if let Some((a, b)) = layout.brothers {
            if let (Some(&na), Some(&nb)) = (inputs.get(a), inputs.get(b)) {
                if let Some(node) = self.nodes.get_mut(na) {
                    node.set_brother(nb);
                }
                if let Some(node) = self.nodes.get_mut(nb) {
                    node.set_brother(na);
                }
            }
        }

        if let Some(entry) = self.components.get_mut(id) {
            entry.inputs = inputs;
            entry.outputs = outputs;
        }
        self.ranks_stale = true;
        self.mark_dirty(id);
        trace!("added component {:?} (serial {}, first node {})", id, serial, first_node);
        id
    }

    /// Remove a component, destroying its nodes and every wire touching
    /// them. Pending deliveries to those nodes are cancelled.
    pub fn remove_component(&mut self, id: ComponentId) -> Result<Box<dyn Component>, CircuitError> {
        let node_ids: Vec<NodeId> = self
            .components
            .get(id)
            .ok_or(CircuitError::ComponentNotFound(id))?
            .nodes()
            .collect();

        for node_id in &node_ids {
            let wires = self.nodes.get(*node_id).map(|n| n.wires().to_vec()).unwrap_or_default();
            for wire in wires {
                self.destroy_wire(wire);
            }
        }
        for node_id in &node_ids {
            self.timeline.cancel_node(*node_id);
            if let Some(node) = self.nodes.remove(*node_id) {
                self.node_by_serial.remove(&node.serial());
            }
        }

        self.dirty.remove(id);
        self.ranks_stale = true;
        let entry = self.components.remove(id).ok_or(CircuitError::ComponentNotFound(id))?;
        debug!("removed component {} ({:?})", entry.component.kind(), id);
        Ok(entry.component)
    }

    pub fn entry(&self, id: ComponentId) -> Option<&ComponentEntry> {
        self.components.get(id)
    }

    pub fn component(&self, id: ComponentId) -> Option<&dyn Component> {
        self.components.get(id).map(|e| e.component.as_ref())
    }

    pub fn component_as<T: Component>(&self, id: ComponentId) -> Option<&T> {
        self.components.get(id)?.component.as_any().downcast_ref::<T>()
    }

    /// Mutable access for setup (e.g. preloading memory). The component is
    /// recomputed in the next round.
    pub fn component_as_mut<T: Component>(&mut self, id: ComponentId) -> Option<&mut T> {
        self.mark_dirty(id);
        self.components.get_mut(id)?.component.as_any_mut().downcast_mut::<T>()
    }

    /// Component ids in insertion order.
    pub fn component_ids(&self) -> Vec<ComponentId> {
        let mut ids: Vec<(u64, ComponentId)> = self.components.iter().map(|(id, e)| (e.serial, id)).collect();
        ids.sort();
        ids.into_iter().map(|(_, id)| id).collect()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn set_label(&mut self, id: ComponentId, label: Option<String>) -> Result<(), CircuitError> {
        let entry = self.components.get_mut(id).ok_or(CircuitError::ComponentNotFound(id))?;
        entry.label = label;
        Ok(())
    }

    pub fn set_position(&mut self, id: ComponentId, position: Option<[f64; 2]>) -> Result<(), CircuitError> {
        let entry = self.components.get_mut(id).ok_or(CircuitError::ComponentNotFound(id))?;
        entry.position = position;
        Ok(())
    }

    /// Find a component by label.
    pub fn find_labeled(&self, label: &str) -> Option<ComponentId> {
        self.component_ids()
            .into_iter()
            .find(|id| self.components.get(*id).and_then(|e| e.label()) == Some(label))
    }

    // ---- nodes -----------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_value(&self, id: NodeId) -> Result<LogicValue, CircuitError> {
        self.nodes
            .get(id)
            .map(Node::value)
            .ok_or(CircuitError::NodeNotFound(id))
    }

    pub fn node_by_serial(&self, serial: NodeSerial) -> Option<NodeId> {
        self.node_by_serial.get(&serial).copied()
    }

    pub fn input_node(&self, component: ComponentId, index: usize) -> Result<NodeId, CircuitError> {
        let entry = self
            .components
            .get(component)
            .ok_or(CircuitError::ComponentNotFound(component))?;
        entry.inputs.get(index).copied().ok_or_else(|| CircuitError::InvalidConnection {
            reason: format!("{} has no input {}", entry.component.kind(), index),
        })
    }

    pub fn output_node(&self, component: ComponentId, index: usize) -> Result<NodeId, CircuitError> {
        let entry = self
            .components
            .get(component)
            .ok_or(CircuitError::ComponentNotFound(component))?;
        entry.outputs.get(index).copied().ok_or_else(|| CircuitError::InvalidConnection {
            reason: format!("{} has no output {}", entry.component.kind(), index),
        })
    }

    /// Look a node up by pin name, inputs first.
    pub fn pin(&self, component: ComponentId, name: &str) -> Result<NodeId, CircuitError> {
        let entry = self
            .components
            .get(component)
            .ok_or(CircuitError::ComponentNotFound(component))?;
        entry
            .nodes()
            .find(|id| self.nodes.get(*id).map_or(false, |n| n.name() == name))
            .ok_or_else(|| CircuitError::InvalidConnection {
                reason: format!("{} has no pin named {}", entry.component.kind(), name),
            })
    }

    /// Effective values of a component's outputs.
    pub fn output_values(&self, component: ComponentId) -> Result<Vec<LogicValue>, CircuitError> {
        let entry = self
            .components
            .get(component)
            .ok_or(CircuitError::ComponentNotFound(component))?;
        Ok(entry
            .outputs
            .iter()
            .map(|id| self.nodes.get(*id).map_or(LogicValue::Unknown, Node::value))
            .collect())
    }

    /// Store a node's value without notifying anyone. Used when restoring a
    /// snapshot, before the graph is settled.
    pub(crate) fn restore_node_value(&mut self, id: NodeId, value: LogicValue) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.set_value(value);
            node.set_spike_pending(false);
        }
    }

    /// Recompute the common value of every short-circuit group.
    pub(crate) fn resolve_all_groups(&mut self) {
        let mut done = HashSet::new();
        let ids: Vec<NodeId> = self.nodes.keys().collect();
        for id in ids {
            if done.contains(&id) {
                continue;
            }
            let group = self.short_group(id);
            done.extend(group.iter().copied());
            self.resolve_group(&group);
        }
    }

    /// Drop every pending delivery.
    pub(crate) fn clear_timeline(&mut self) {
        self.timeline.clear();
    }

    /// Queue `value` for `node` at round `at`, carried by `wire`.
    pub(crate) fn schedule_delivery(&mut self, wire: WireId, at: SimTime, node: NodeId, value: LogicValue) {
        self.timeline.schedule(at, wire, node, value);
    }

    // ---- wires -----------------------------------------------------------

    pub fn wire(&self, id: WireId) -> Option<&Wire> {
        self.wires.get(id)
    }

    pub fn wires(&self) -> impl Iterator<Item = (WireId, &Wire)> {
        self.wires.iter()
    }

    /// The provisional wire being drawn, if any.
    pub fn drawing(&self) -> Option<WireId> {
        self.drawing
    }

    /// Start drawing a wire at `node`. A wire already being drawn is
    /// discarded.
    pub fn begin_wire(&mut self, node: NodeId) -> Result<WireId, CircuitError> {
        let start = self.nodes.get(node).ok_or(CircuitError::NodeNotFound(node))?;
        if !start.is_free_capable() {
            return Err(CircuitError::InvalidConnection {
                reason: format!("input {} already has a driving wire", start.name()),
            });
        }
        if let Some(previous) = self.drawing.take() {
            self.destroy_wire(previous);
        }
        let wire = self.wires.insert(Wire::provisional(node));
        if let Some(start) = self.nodes.get_mut(node) {
            start.connect(node, wire, false)?;
        }
        self.drawing = Some(wire);
        Ok(wire)
    }

    /// Finish the wire being drawn at `node`. A rejected completion
    /// discards the provisional wire and leaves the circuit unchanged.
    pub fn complete_wire(&mut self, node: NodeId) -> Result<WireOutcome, CircuitError> {
        let wire = self.drawing.take().ok_or(CircuitError::NoWireInProgress)?;
        let start_id = match self.wires.get(wire) {
            Some(w) => w.start(),
            None => return Err(CircuitError::WireNotFound(wire)),
        };
        let classified = match (self.nodes.get(start_id), self.nodes.get(node)) {
            (Some(start), Some(end)) => Ok(classify_completion(start_id, start, node, end)),
            (None, _) => Err(CircuitError::NodeNotFound(start_id)),
            (_, None) => Err(CircuitError::NodeNotFound(node)),
        };
        let completion = match classified {
            Ok(completion) => completion,
            Err(err) => {
                self.destroy_wire(wire);
                return Err(err);
            }
        };

        match completion {
            Completion::Directional { driver, driven } => {
                if let Err(err) = self.attach(wire, driver, driven, WireKind::Directional, false) {
                    self.destroy_wire(wire);
                    return Err(err);
                }
                debug!("wire {:?} connected", wire);
                self.transmit(wire);
                Ok(WireOutcome::Connected(wire))
            }
            Completion::ShortCircuit { start, end } => {
                self.attach(wire, start, end, WireKind::ShortCircuit, false)?;
                debug!("wire {:?} shorts two {:?} nodes", wire, self.nodes.get(start).map(Node::direction));
                self.settle_groups(&[start, end], |_| {});
                Ok(WireOutcome::ShortCircuit(wire))
            }
            Completion::Bridge { start, end } => {
                self.destroy_wire(wire);
                let bridge = self.wires.insert(Wire::finished(start, end, WireKind::ShortCircuit, true));
                self.attach(bridge, start, end, WireKind::ShortCircuit, true)?;
                debug!("wire {:?} bridges a gate's inputs", bridge);
                self.settle_groups(&[start, end], |_| {});
                Ok(WireOutcome::Bridged(bridge))
            }
            Completion::Reject(reason) => {
                debug!("discarding provisional wire {:?}: {}", wire, reason);
                self.destroy_wire(wire);
                Err(CircuitError::InvalidConnection { reason })
            }
        }
    }

    /// Draw a complete wire from `from` to `to` in one call.
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<WireOutcome, CircuitError> {
        self.begin_wire(from)?;
        self.complete_wire(to)
    }

    fn attach(
        &mut self,
        wire: WireId,
        start: NodeId,
        end: NodeId,
        kind: WireKind,
        bridge: bool,
    ) -> Result<(), CircuitError> {
        let driving = kind == WireKind::Directional;
        // The provisional wire may have been rooted at either endpoint.
        for id in [start, end] {
            if let Some(node) = self.nodes.get_mut(id) {
                node.disconnect(wire, false);
            }
        }
        if let Some(node) = self.nodes.get_mut(end) {
            node.connect(end, wire, driving)?;
        }
        if let Some(node) = self.nodes.get_mut(start) {
            node.connect(start, wire, false)?;
        }
        if let Some(w) = self.wires.get_mut(wire) {
            w.finish(start, end, kind, bridge);
        }
        self.ranks_stale = true;
        Ok(())
    }

    pub fn set_wire_delay(&mut self, wire: WireId, delay: Option<u64>) -> Result<(), CircuitError> {
        let w = self.wires.get_mut(wire).ok_or(CircuitError::WireNotFound(wire))?;
        w.set_delay(delay);
        Ok(())
    }

    /// Delete a wire. Its pending deliveries are cancelled and a freed input
    /// drops back to `False`.
    pub fn remove_wire(&mut self, wire: WireId) -> Result<(), CircuitError> {
        self.destroy_wire(wire)
            .map(|_| ())
            .ok_or(CircuitError::WireNotFound(wire))
    }

    fn destroy_wire(&mut self, id: WireId) -> Option<Wire> {
        let wire = self.wires.remove(id)?;
        self.timeline.cancel_wire(id);
        if self.drawing == Some(id) {
            self.drawing = None;
        }

        let driving = wire.is_driving();
        let mut freed = None;
        for node_id in std::iter::once(wire.start()).chain(wire.end()) {
            if let Some(node) = self.nodes.get_mut(node_id) {
                if node.disconnect(id, driving) {
                    freed = Some(node_id);
                }
            }
        }

        if wire.is_short_circuit() {
            let ends: Vec<NodeId> = std::iter::once(wire.start())
                .chain(wire.end())
                .filter(|n| self.nodes.contains_key(*n))
                .collect();
            self.settle_groups(&ends, |_| {});
        }
        if let Some(input) = freed {
            self.apply_node_value(input, LogicValue::False);
        }
        if !wire.is_provisional() {
            self.ranks_stale = true;
            debug!("wire {:?} destroyed", id);
        }
        Some(wire)
    }

    fn sweep_dead_wires(&mut self) -> usize {
        let dead: Vec<WireId> = self
            .wires
            .iter()
            .filter(|(_, w)| {
                !self.nodes.contains_key(w.start()) || w.end().map_or(false, |e| !self.nodes.contains_key(e))
            })
            .map(|(id, _)| id)
            .collect();
        for id in &dead {
            debug!("wire {:?} lost an endpoint", id);
            self.destroy_wire(*id);
        }
        dead.len()
    }

    // ---- value propagation -----------------------------------------------

    /// Nodes tied to `root` through short-circuit wires, `root` first.
    fn short_group(&self, root: NodeId) -> Vec<NodeId> {
        let mut group = vec![root];
        let mut seen: HashSet<NodeId> = HashSet::from([root]);
        let mut i = 0;
        while i < group.len() {
            if let Some(node) = self.nodes.get(group[i]) {
                for wire in node.wires() {
                    let Some(w) = self.wires.get(*wire) else { continue };
                    if !w.is_short_circuit() {
                        continue;
                    }
                    if let Some(other) = w.other(group[i]) {
                        if self.nodes.contains_key(other) && seen.insert(other) {
                            group.push(other);
                        }
                    }
                }
            }
            i += 1;
        }
        group
    }

    fn resolve_group(&mut self, group: &[NodeId]) {
        if group.len() < 2 {
            if let Some(node) = group.first().and_then(|id| self.nodes.get_mut(*id)) {
                node.set_resolved(None);
            }
            return;
        }
        let common = group
            .iter()
            .filter_map(|id| self.nodes.get(*id))
            .map(Node::asserted_value)
            .reduce(LogicValue::resolve)
            .unwrap_or(LogicValue::HighImpedance);
        for id in group {
            if let Some(node) = self.nodes.get_mut(*id) {
                node.set_resolved(Some(common));
            }
        }
    }

    /// Run `change`, then re-resolve the short groups of `roots` and notify
    /// every node whose effective value moved.
    fn settle_groups(&mut self, roots: &[NodeId], change: impl FnOnce(&mut Self)) {
        let mut members = Vec::new();
        let mut seen = HashSet::new();
        for root in roots {
            for id in self.short_group(*root) {
                if seen.insert(id) {
                    members.push(id);
                }
            }
        }
        let before: Vec<LogicValue> = members
            .iter()
            .map(|id| self.nodes.get(*id).map_or(LogicValue::Unknown, Node::value))
            .collect();

        change(self);

        let mut resolved = HashSet::new();
        for root in roots {
            if resolved.contains(root) || !self.nodes.contains_key(*root) {
                continue;
            }
            let group = self.short_group(*root);
            resolved.extend(group.iter().copied());
            self.resolve_group(&group);
        }

        for (id, old) in members.into_iter().zip(before) {
            let now = self.nodes.get(id).map(Node::value);
            if now.map_or(false, |v| v != old) {
                self.node_changed(id);
            }
        }
    }

    /// Change a node's stored value through the engine.
    fn mutate_node(&mut self, id: NodeId, change: impl FnOnce(&mut Node)) {
        if !self.nodes.contains_key(id) {
            return;
        }
        // A spike input that moves again before its owner ran gets the
        // owner recomputed on the intermediate level first.
        let spiking: Vec<ComponentId> = self
            .short_group(id)
            .into_iter()
            .filter_map(|n| self.nodes.get(n))
            .filter(|n| n.is_input() && n.spike_pending())
            .map(Node::owner)
            .collect();
        for owner in spiking {
            trace!("flushing spike on {:?}", owner);
            self.recompute(owner);
        }

        self.settle_groups(&[id], |circuit| {
            if let Some(node) = circuit.nodes.get_mut(id) {
                change(node);
            }
        });
    }

    fn apply_node_value(&mut self, id: NodeId, value: LogicValue) {
        self.mutate_node(id, |node| {
            node.set_value(value);
        });
    }

    fn node_changed(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id) else { return };
        match node.direction() {
            Direction::Input => {
                if node.prefers_spike() {
                    node.set_spike_pending(true);
                }
                let owner = node.owner();
                self.mark_dirty(owner);
            }
            Direction::Output => {
                let driving: Vec<WireId> = node
                    .wires()
                    .iter()
                    .copied()
                    .filter(|w| self.wires.get(*w).map_or(false, |w| w.is_driving() && w.start() == id))
                    .collect();
                for wire in driving {
                    self.transmit(wire);
                }
            }
        }
    }

    /// Carry the start node's effective value along a directional wire,
    /// immediately or through the timeline.
    fn transmit(&mut self, wire: WireId) {
        let Some(w) = self.wires.get(wire) else { return };
        let Some(end) = w.end() else { return };
        let Some(value) = self.nodes.get(w.start()).map(Node::value) else { return };
        let delay = w.delay().unwrap_or(self.config.default_wire_delay);
        if delay == 0 {
            self.apply_node_value(end, value);
        } else {
            let at = self.now.after(delay);
            trace!("scheduling {} on {:?} at {}", value, end, at);
            self.timeline.schedule(at, wire, end, value);
        }
    }

    /// Pin `node` to `value`, or release it with `None`.
    fn force_node(&mut self, node: NodeId, value: Option<LogicValue>) -> Result<(), CircuitError> {
        if !self.nodes.contains_key(node) {
            return Err(CircuitError::NodeNotFound(node));
        }
        self.mutate_node(node, |n| n.set_forced(value));
        Ok(())
    }

    // ---- evaluation ------------------------------------------------------

    fn mark_dirty(&mut self, id: ComponentId) {
        if let Some(entry) = self.components.get(id) {
            self.dirty.mark((entry.rank, entry.serial, id));
        }
    }

    /// Mark every component for recompute in the next round.
    pub fn mark_all_dirty(&mut self) {
        for id in self.component_ids() {
            self.mark_dirty(id);
        }
    }

    fn recompute(&mut self, id: ComponentId) {
        let wall_ms = self.time_source.now_ms();
        let Some(entry) = self.components.get_mut(id) else { return };

        let inputs: Vec<LogicValue> = entry
            .inputs
            .iter()
            .map(|n| self.nodes.get(*n).map_or(LogicValue::Unknown, Node::value))
            .collect();
        for n in &entry.inputs {
            if let Some(node) = self.nodes.get_mut(*n) {
                node.set_spike_pending(false);
            }
        }

        let mut ctx = RecalcContext {
            now: self.now,
            wall_ms,
            rng: &mut self.rng,
        };
        let state = entry.component.recalc_value(&inputs, &mut ctx);
        trace!("recomputed {} {:?}: {}", entry.component.kind(), id, LogicValue::encode(&state));
        let outputs = entry.outputs.clone();

        self.settle_groups(&outputs, |circuit| {
            if let Some(entry) = circuit.components.get_mut(id) {
                let mut pins = OutputPins::new(&mut circuit.nodes, &outputs);
                entry.component.propagate_value(&state, &mut pins);
            }
        });
    }

    fn refresh_ranks(&mut self) {
        let mut successors: HashMap<ComponentId, Vec<ComponentId>> = HashMap::new();
        let mut indegree: HashMap<ComponentId, usize> = self.components.keys().map(|id| (id, 0)).collect();
        for (_, wire) in self.wires.iter().filter(|(_, w)| w.is_driving()) {
            let from = self.nodes.get(wire.start()).map(Node::owner);
            let to = wire.end().and_then(|e| self.nodes.get(e)).map(Node::owner);
            if let (Some(from), Some(to)) = (from, to) {
                if from != to {
                    successors.entry(from).or_default().push(to);
                    *indegree.entry(to).or_default() += 1;
                }
            }
        }

        let serial = |id: ComponentId| self.components.get(id).map_or(u64::MAX, |e| e.serial);
        let mut ready: BTreeSet<(u64, ComponentId)> = indegree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| (serial(*id), *id))
            .collect();
        let mut ranks: HashMap<ComponentId, u32> = HashMap::new();
        while let Some((_, id)) = ready.pop_first() {
            ranks.insert(id, ranks.len() as u32);
            for succ in successors.get(&id).into_iter().flatten() {
                if let Some(d) = indegree.get_mut(succ) {
                    *d -= 1;
                    if *d == 0 {
                        ready.insert((serial(*succ), *succ));
                    }
                }
            }
        }
        // Members of feedback loops keep insertion order after the rest.
        for id in self.component_ids() {
            let next = ranks.len() as u32;
            ranks.entry(id).or_insert(next);
        }

        for (id, rank) in &ranks {
            if let Some(entry) = self.components.get_mut(*id) {
                entry.rank = *rank;
            }
        }
        let components = &self.components;
        self.dirty
            .rekey(|id| components.get(id).map(|e| (e.rank, e.serial, id)));
        self.ranks_stale = false;
    }

    /// Queue an interaction for the next round.
    pub fn enqueue(&mut self, event: InputEvent) {
        self.pending.push_back(event);
    }

    pub fn pending_events(&self) -> usize {
        self.pending.len()
    }

    fn apply_event(&mut self, event: InputEvent) -> Result<(), CircuitError> {
        trace!("applying {}", event);
        match event {
            InputEvent::SetNodeValue { node, value } => {
                if !self.nodes.contains_key(node) {
                    return Err(CircuitError::NodeNotFound(node));
                }
                self.apply_node_value(node, value);
            }
            InputEvent::ToggleInput { component } => {
                let entry = self
                    .components
                    .get_mut(component)
                    .ok_or(CircuitError::ComponentNotFound(component))?;
                if !entry.component.toggle() {
                    return Err(CircuitError::NotAnInput(component));
                }
                self.mark_dirty(component);
            }
            InputEvent::BeginWire { node } => {
                self.begin_wire(node)?;
            }
            InputEvent::CompleteWire { node } => {
                self.complete_wire(node)?;
            }
            InputEvent::ForceNode { node, value } => self.force_node(node, value)?,
            InputEvent::ReconfigureClock {
                component,
                period_ms,
                duty_cycle,
            } => {
                let entry = self
                    .components
                    .get_mut(component)
                    .ok_or(CircuitError::ComponentNotFound(component))?;
                let clock = entry
                    .component
                    .as_any_mut()
                    .downcast_mut::<Clock>()
                    .ok_or(CircuitError::NotAClock(component))?;
                clock.reconfigure(period_ms, duty_cycle);
                self.mark_dirty(component);
            }
        }
        Ok(())
    }

    /// Run one round.
    pub fn step(&mut self) -> RoundReport {
        let mut report = RoundReport {
            time: self.now,
            ..RoundReport::default()
        };

        while let Some(event) = self.pending.pop_front() {
            if let Err(err) = self.apply_event(event) {
                debug!("input event rejected: {}", err);
                report.rejected.push(err);
            }
        }

        report.removed_wires = self.sweep_dead_wires();

        while let Some(event) = self.timeline.pop_due(self.now) {
            self.apply_node_value(event.node, event.value);
            report.applied_events += 1;
        }

        let clocks: Vec<ComponentId> = self
            .components
            .iter()
            .filter(|(_, e)| e.time_driven)
            .map(|(id, _)| id)
            .collect();
        for id in clocks {
            self.mark_dirty(id);
        }

        if self.ranks_stale {
            self.refresh_ranks();
        }

        let cap = self.config.max_iterations.max(1);
        while !self.dirty.is_empty() {
            if report.passes == cap {
                let pending = self.dirty.pending();
                warn!(
                    "round {}: {} components still changing after {} passes",
                    self.now,
                    pending.len(),
                    cap
                );
                report.warning = Some(EvalWarning::UnstableCombinationalLoop { passes: cap, pending });
                break;
            }
            report.passes += 1;
            self.dirty.begin_pass();
            while let Some(id) = self.dirty.pop() {
                self.recompute(id);
                report.recomputed += 1;
            }
            self.dirty.end_pass();
        }

        self.now.inc();
        report
    }

    /// Run `rounds` rounds.
    pub fn run(&mut self, rounds: usize) -> Vec<RoundReport> {
        (0..rounds).map(|_| self.step()).collect()
    }

    /// True when nothing is queued, scheduled or dirty.
    pub fn is_quiescent(&self) -> bool {
        self.pending.is_empty() && self.timeline.is_empty() && self.dirty.is_empty()
    }

    /// Step until the circuit is quiescent or `max_rounds` have run. Clocks
    /// keep a circuit from ever going quiet; the cap bounds that case.
    pub fn settle(&mut self, max_rounds: usize) -> Vec<RoundReport> {
        let mut reports = Vec::new();
        while reports.len() < max_rounds {
            reports.push(self.step());
            if self.is_quiescent() {
                break;
            }
        }
        reports
    }
}
