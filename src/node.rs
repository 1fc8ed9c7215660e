use crate::component::ComponentId;
use crate::error::CircuitError;
use crate::value::LogicValue;
use crate::wire::WireId;
use slotmap::new_key_type;
use std::fmt;

new_key_type! {
    /// Arena handle of a [`Node`].
    pub struct NodeId;
}

/// Stable node identifier that survives a snapshot round-trip.
pub type NodeSerial = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
}

/// Whether an input node already has its driving wire. Output nodes fan out
/// to any number of wires and stay `Free`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occupancy {
    Free,
    Taken,
}

/// One pin of a component.
#[derive(Debug, Clone)]
pub struct Node {
    serial: NodeSerial,
    direction: Direction,
    owner: ComponentId,
    index: usize,
    name: String,
    value: LogicValue,
    resolved: Option<LogicValue>,
    forced: Option<LogicValue>,
    occupancy: Occupancy,
    wires: Vec<WireId>,
    brother: Option<NodeId>,
    prefer_spike: bool,
    spike_pending: bool,
}

impl Node {
    pub fn new(
        serial: NodeSerial,
        direction: Direction,
        owner: ComponentId,
        index: usize,
        name: String,
    ) -> Self {
        Node {
            serial,
            direction,
            owner,
            index,
            name,
            value: LogicValue::False,
            resolved: None,
            forced: None,
            occupancy: Occupancy::Free,
            wires: Vec::new(),
            brother: None,
            prefer_spike: false,
            spike_pending: false,
        }
    }

    pub fn serial(&self) -> NodeSerial {
        self.serial
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_input(&self) -> bool {
        self.direction == Direction::Input
    }

    pub fn is_output(&self) -> bool {
        self.direction == Direction::Output
    }

    pub fn owner(&self) -> ComponentId {
        self.owner
    }

    /// Position within the owner's input or output list.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Effective value: a forced value wins, then the resolution of a
    /// short-circuit group, then the value written by the driver.
    pub fn value(&self) -> LogicValue {
        self.forced.or(self.resolved).unwrap_or(self.value)
    }

    /// The value this node's own driver wrote, ignoring shorts and forcing.
    pub fn driven_value(&self) -> LogicValue {
        self.value
    }

    /// What this node contributes to a short-circuit group.
    pub(crate) fn asserted_value(&self) -> LogicValue {
        self.forced.unwrap_or(self.value)
    }

    /// Returns true if the stored value changed.
    pub fn set_value(&mut self, value: LogicValue) -> bool {
        let changed = self.value != value;
        self.value = value;
        changed
    }

    pub fn forced(&self) -> Option<LogicValue> {
        self.forced
    }

    pub(crate) fn set_forced(&mut self, forced: Option<LogicValue>) {
        self.forced = forced;
    }

    pub(crate) fn set_resolved(&mut self, resolved: Option<LogicValue>) {
        self.resolved = resolved;
    }

    pub fn occupancy(&self) -> Occupancy {
        self.occupancy
    }

    /// An input that is `Taken` cannot start or end another driving wire.
    pub fn is_free_capable(&self) -> bool {
        self.is_output() || self.occupancy == Occupancy::Free
    }

    pub fn wires(&self) -> &[WireId] {
        &self.wires
    }

    /// Attach `wire`. A `driving` wire occupies an input node; an input that
    /// is already occupied rejects it.
    pub fn connect(&mut self, id: NodeId, wire: WireId, driving: bool) -> Result<(), CircuitError> {
        if driving && self.is_input() {
            if self.occupancy == Occupancy::Taken {
                return Err(CircuitError::AlreadyConnected { node: id });
            }
            self.occupancy = Occupancy::Taken;
        }
        if !self.wires.contains(&wire) {
            self.wires.push(wire);
        }
        Ok(())
    }

    /// Detach `wire`. Returns true if an input node was freed by it.
    pub fn disconnect(&mut self, wire: WireId, driving: bool) -> bool {
        self.wires.retain(|w| *w != wire);
        if driving && self.is_input() && self.occupancy == Occupancy::Taken {
            self.occupancy = Occupancy::Free;
            return true;
        }
        false
    }

    pub fn brother(&self) -> Option<NodeId> {
        self.brother
    }

    pub(crate) fn set_brother(&mut self, brother: NodeId) {
        self.brother = Some(brother);
    }

    pub fn prefers_spike(&self) -> bool {
        self.prefer_spike
    }

    pub(crate) fn set_prefer_spike(&mut self, prefer: bool) {
        self.prefer_spike = prefer;
    }

    pub(crate) fn spike_pending(&self) -> bool {
        self.spike_pending
    }

    pub(crate) fn set_spike_pending(&mut self, pending: bool) {
        self.spike_pending = pending;
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}: {}", self.serial, self.name, self.value())?;
        if let Some(forced) = self.forced {
            write!(f, " (forced {})", forced.to_char())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn ids() -> (NodeId, ComponentId, WireId, WireId) {
        let mut nodes: SlotMap<NodeId, ()> = SlotMap::with_key();
        let mut comps: SlotMap<ComponentId, ()> = SlotMap::with_key();
        let mut wires: SlotMap<WireId, ()> = SlotMap::with_key();
        (nodes.insert(()), comps.insert(()), wires.insert(()), wires.insert(()))
    }

    #[test]
    fn test_node_creation() {
        let (_, owner, _, _) = ids();
        let node = Node::new(7, Direction::Input, owner, 0, "D".to_string());
        assert_eq!(node.serial(), 7);
        assert_eq!(node.value(), LogicValue::False);
        assert_eq!(node.occupancy(), Occupancy::Free);
        assert!(node.is_free_capable());
    }

    #[test]
    fn test_input_accepts_single_driver() {
        let (id, owner, w1, w2) = ids();
        let mut node = Node::new(0, Direction::Input, owner, 0, "A".to_string());
        node.connect(id, w1, true).unwrap();
        assert_eq!(node.occupancy(), Occupancy::Taken);
        assert_eq!(
            node.connect(id, w2, true),
            Err(CircuitError::AlreadyConnected { node: id })
        );
        assert!(node.disconnect(w1, true));
        assert_eq!(node.occupancy(), Occupancy::Free);
        assert!(node.wires().is_empty());
    }

    #[test]
    fn test_output_fans_out() {
        let (id, owner, w1, w2) = ids();
        let mut node = Node::new(0, Direction::Output, owner, 0, "Q".to_string());
        node.connect(id, w1, true).unwrap();
        node.connect(id, w2, true).unwrap();
        assert_eq!(node.wires().len(), 2);
        assert_eq!(node.occupancy(), Occupancy::Free);
    }

    #[test]
    fn test_forced_value_wins() {
        let (_, owner, _, _) = ids();
        let mut node = Node::new(0, Direction::Output, owner, 0, "Q".to_string());
        assert!(node.set_value(LogicValue::True));
        assert!(!node.set_value(LogicValue::True));
        node.set_resolved(Some(LogicValue::Unknown));
        assert_eq!(node.value(), LogicValue::Unknown);
        node.set_forced(Some(LogicValue::HighImpedance));
        assert_eq!(node.value(), LogicValue::HighImpedance);
        assert_eq!(node.driven_value(), LogicValue::True);
    }
}
