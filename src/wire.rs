//! Wires between nodes and the rules for completing a connection gesture.

use crate::node::{Direction, Node, NodeId};
use slotmap::new_key_type;

new_key_type! {
    /// Arena handle of a [`Wire`].
    pub struct WireId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireKind {
    /// Output drives input.
    Directional,
    /// Two same-direction nodes tied together; both resolve to a common value.
    ShortCircuit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Wire {
    start: NodeId,
    end: Option<NodeId>,
    kind: WireKind,
    delay: Option<u64>,
    bridge: bool,
}

impl Wire {
    /// A wire still being drawn from `start`.
    pub fn provisional(start: NodeId) -> Self {
        Wire {
            start,
            end: None,
            kind: WireKind::Directional,
            delay: None,
            bridge: false,
        }
    }

    pub fn start(&self) -> NodeId {
        self.start
    }

    pub fn end(&self) -> Option<NodeId> {
        self.end
    }

    pub fn kind(&self) -> WireKind {
        self.kind
    }

    pub fn is_provisional(&self) -> bool {
        self.end.is_none()
    }

    /// True for the short-circuit structure created when a gate's two
    /// inputs are wired to each other.
    pub fn is_bridge(&self) -> bool {
        self.bridge
    }

    /// Whether this wire occupies its end node.
    pub fn is_driving(&self) -> bool {
        self.kind == WireKind::Directional && self.end.is_some()
    }

    pub fn is_short_circuit(&self) -> bool {
        self.kind == WireKind::ShortCircuit && self.end.is_some()
    }

    /// Per-wire override of the circuit's default delay.
    pub fn delay(&self) -> Option<u64> {
        self.delay
    }

    pub fn set_delay(&mut self, delay: Option<u64>) {
        self.delay = delay;
    }

    pub fn touches(&self, node: NodeId) -> bool {
        self.start == node || self.end == Some(node)
    }

    /// The node on the other side of `node`, if this wire touches it.
    pub fn other(&self, node: NodeId) -> Option<NodeId> {
        if self.start == node {
            self.end
        } else if self.end == Some(node) {
            Some(self.start)
        } else {
            None
        }
    }

    pub(crate) fn finish(&mut self, start: NodeId, end: NodeId, kind: WireKind, bridge: bool) {
        self.start = start;
        self.end = Some(end);
        self.kind = kind;
        self.bridge = bridge;
    }

    pub(crate) fn finished(start: NodeId, end: NodeId, kind: WireKind, bridge: bool) -> Self {
        Wire {
            start,
            end: Some(end),
            kind,
            delay: None,
            bridge,
        }
    }
}

/// How a provisional wire from `start` to `end` is finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// `driver` is the output, `driven` the input.
    Directional { driver: NodeId, driven: NodeId },
    ShortCircuit { start: NodeId, end: NodeId },
    /// `end` is the brother of `start`: discard the provisional wire and tie
    /// the two inputs with a short-circuit structure.
    Bridge { start: NodeId, end: NodeId },
    Reject(String),
}

/// Apply the completion tie-break rules in order: role swap for an
/// input→output gesture, brother bridge, same-direction short circuit, and
/// finally the single-driver check on the driven input.
pub fn classify_completion(
    start_id: NodeId,
    start: &Node,
    end_id: NodeId,
    end: &Node,
) -> Completion {
    if start_id == end_id {
        return Completion::Reject("a wire cannot start and end on the same node".to_string());
    }

    match (start.direction(), end.direction()) {
        (Direction::Output, Direction::Input) | (Direction::Input, Direction::Output) => {
            let (driver, driven, driven_node) = if start.is_output() {
                (start_id, end_id, end)
            } else {
                (end_id, start_id, start)
            };
            if !driven_node.is_free_capable() {
                return Completion::Reject(format!(
                    "input {} already has a driving wire",
                    driven_node.name()
                ));
            }
            Completion::Directional { driver, driven }
        }
        _ if start.brother() == Some(end_id) => Completion::Bridge {
            start: start_id,
            end: end_id,
        },
        _ => Completion::ShortCircuit {
            start: start_id,
            end: end_id,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireOutcome {
    Connected(WireId),
    ShortCircuit(WireId),
    /// The provisional wire was replaced by this bridge wire.
    Bridged(WireId),
}

impl WireOutcome {
    pub fn wire(&self) -> WireId {
        match self {
            WireOutcome::Connected(w) | WireOutcome::ShortCircuit(w) | WireOutcome::Bridged(w) => *w,
        }
    }
}
