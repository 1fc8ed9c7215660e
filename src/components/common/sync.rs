//! Shared clock-edge detection and preset/clear handling for the
//! synchronous parts (flip-flops, registers, counter, RAM, random source).

use crate::component::Properties;
use crate::error::SnapshotError;
use crate::value::LogicValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    #[default]
    Rising,
    Falling,
}

impl Edge {
    /// Only an exact `False -> True` (or `True -> False`) pair is an edge.
    pub fn is_edge(self, previous: LogicValue, current: LogicValue) -> bool {
        match self {
            Edge::Rising => previous == LogicValue::False && current == LogicValue::True,
            Edge::Falling => previous == LogicValue::True && current == LogicValue::False,
        }
    }

    pub fn to_str(self) -> &'static str {
        match self {
            Edge::Rising => "rising",
            Edge::Falling => "falling",
        }
    }
}

/// Clock edge memory of one synchronous component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeTrigger {
    edge: Edge,
    last_clock: LogicValue,
}

impl EdgeTrigger {
    pub fn new(edge: Edge) -> Self {
        EdgeTrigger {
            edge,
            last_clock: LogicValue::False,
        }
    }

    pub fn edge(&self) -> Edge {
        self.edge
    }

    pub fn last_clock(&self) -> LogicValue {
        self.last_clock
    }

    /// Record `clock` and report whether it completed the configured edge.
    /// Transitions through `Unknown` are remembered but never count.
    pub fn observe(&mut self, clock: LogicValue) -> bool {
        let fired = self.edge.is_edge(self.last_clock, clock);
        self.last_clock = clock;
        fired
    }

    pub fn save(&self, props: &mut Properties) {
        props.insert("trigger".into(), Value::from(self.edge.to_str()));
        props.insert("last_clock".into(), Value::from(self.last_clock.to_char().to_string()));
    }

    pub fn load(props: &Properties) -> Result<Self, SnapshotError> {
        let edge = match props.get("trigger") {
            None => Edge::Rising,
            Some(v) => serde_json::from_value(v.clone())
                .map_err(|e| SnapshotError::invalid_property("trigger", e.to_string()))?,
        };
        let last_clock = match props.get("last_clock").and_then(Value::as_str) {
            Some(s) => s.chars().next().map_or(LogicValue::False, LogicValue::from_char),
            None => LogicValue::False,
        };
        Ok(EdgeTrigger { edge, last_clock })
    }
}

/// Asynchronous override state from the preset/clear pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Normal,
    ForcedSet,
    ForcedClear,
    /// Preset and clear asserted together; outputs go `Unknown`.
    Invalid,
}

impl SyncState {
    /// Preset and clear are active-high; anything but `True` is released.
    pub fn from_controls(preset: LogicValue, clear: LogicValue) -> Self {
        match (preset.is_true(), clear.is_true()) {
            (false, false) => SyncState::Normal,
            (true, false) => SyncState::ForcedSet,
            (false, true) => SyncState::ForcedClear,
            (true, true) => SyncState::Invalid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LogicValue::*;

    #[test]
    fn test_rising_edge_detection() {
        let mut trigger = EdgeTrigger::new(Edge::Rising);
        assert!(!trigger.observe(False));
        assert!(trigger.observe(True));
        assert!(!trigger.observe(True));
        assert!(!trigger.observe(False));
    }

    #[test]
    fn test_falling_edge_detection() {
        let mut trigger = EdgeTrigger::new(Edge::Falling);
        assert!(!trigger.observe(True));
        assert!(trigger.observe(False));
    }

    #[test]
    fn test_unknown_is_not_an_edge() {
        let mut trigger = EdgeTrigger::new(Edge::Rising);
        assert!(!trigger.observe(Unknown));
        assert_eq!(trigger.last_clock(), Unknown);
        assert!(!trigger.observe(True));
        assert!(!trigger.observe(HighImpedance));
        assert!(!trigger.observe(True));
    }

    #[test]
    fn test_sync_state() {
        assert_eq!(SyncState::from_controls(False, False), SyncState::Normal);
        assert_eq!(SyncState::from_controls(True, False), SyncState::ForcedSet);
        assert_eq!(SyncState::from_controls(Unknown, True), SyncState::ForcedClear);
        assert_eq!(SyncState::from_controls(True, True), SyncState::Invalid);
    }

    #[test]
    fn test_trigger_persistence() {
        let mut trigger = EdgeTrigger::new(Edge::Falling);
        trigger.observe(True);
        let mut props = Properties::new();
        trigger.save(&mut props);
        assert_eq!(EdgeTrigger::load(&props).unwrap(), trigger);

        props.insert("trigger".into(), Value::from("sideways"));
        assert!(EdgeTrigger::load(&props).is_err());
    }
}
