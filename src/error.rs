//! Error types for the evaluation engine and the snapshot loader.

use crate::component::ComponentId;
use crate::node::NodeId;
use crate::wire::WireId;
use thiserror::Error;

/// Failures of graph-editing operations on a [`Circuit`](crate::circuit::Circuit).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CircuitError {
    #[error("node {0:?} does not exist")]
    NodeNotFound(NodeId),

    #[error("component {0:?} does not exist")]
    ComponentNotFound(ComponentId),

    #[error("wire {0:?} does not exist")]
    WireNotFound(WireId),

    /// An input node already has its single driving wire.
    #[error("input node {node:?} is already connected")]
    AlreadyConnected { node: NodeId },

    /// The provisional wire was discarded; nothing changed in the circuit.
    #[error("invalid connection: {reason}")]
    InvalidConnection { reason: String },

    #[error("no wire is being drawn")]
    NoWireInProgress,

    #[error("component {0:?} is not a clock")]
    NotAClock(ComponentId),

    #[error("component {0:?} is not a toggleable input")]
    NotAnInput(ComponentId),
}

/// A snapshot (or one entry of it) that cannot be turned back into a circuit.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("malformed snapshot json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown component type '{0}'")]
    UnknownComponentType(String),

    #[error("component '{kind}' expects {expected} nodes, snapshot has {found}")]
    NodeCountMismatch {
        kind: String,
        expected: usize,
        found: usize,
    },

    #[error("invalid property '{key}': {reason}")]
    InvalidProperty { key: String, reason: String },

    #[error("node id {0} is already in use")]
    NodeIdCollision(u32),

    #[error("wire references unknown node id {0}")]
    DanglingWire(u32),

    #[error("pending delivery {start} -> {end} has no delayed wire to travel on")]
    UnknownDelivery { start: u32, end: u32 },

    #[error("wire could not be restored: {0}")]
    Connection(#[from] CircuitError),
}

impl SnapshotError {
    pub fn invalid_property(key: &str, reason: impl Into<String>) -> Self {
        SnapshotError::InvalidProperty {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Non-fatal conditions attached to a round's report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalWarning {
    /// The fixed-point iteration cap was reached; `pending` components are
    /// still dirty and stay queued for the next round.
    UnstableCombinationalLoop {
        passes: usize,
        pending: Vec<ComponentId>,
    },
}

impl std::fmt::Display for EvalWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalWarning::UnstableCombinationalLoop { passes, pending } => write!(
                f,
                "unstable combinational loop: {} components still changing after {} passes",
                pending.len(),
                passes
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = CircuitError::InvalidConnection {
            reason: "input already driven".into(),
        };
        assert_eq!(e.to_string(), "invalid connection: input already driven");

        let e = SnapshotError::NodeCountMismatch {
            kind: "ram".into(),
            expected: 12,
            found: 3,
        };
        assert!(e.to_string().contains("expects 12 nodes"));
    }

    #[test]
    fn test_json_error_converts() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e: SnapshotError = err.into();
        assert!(matches!(e, SnapshotError::Json(_)));
    }

    #[test]
    fn test_warning_display() {
        let w = EvalWarning::UnstableCombinationalLoop {
            passes: 100,
            pending: Vec::new(),
        };
        assert!(w.to_string().contains("100 passes"));
    }
}
