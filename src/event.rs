use crate::component::ComponentId;
use crate::node::NodeId;
use crate::value::LogicValue;
use std::fmt;

/// An interaction from outside the engine. Events are queued and applied at
/// the start of the next round, never mid-round.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    SetNodeValue { node: NodeId, value: LogicValue },
    ToggleInput { component: ComponentId },
    BeginWire { node: NodeId },
    CompleteWire { node: NodeId },
    /// `None` releases a pinned node.
    ForceNode { node: NodeId, value: Option<LogicValue> },
    ReconfigureClock {
        component: ComponentId,
        period_ms: u64,
        duty_cycle: u8,
    },
}

impl fmt::Display for InputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputEvent::SetNodeValue { node, value } => write!(f, "Set({:?} = {})", node, value),
            InputEvent::ToggleInput { component } => write!(f, "Toggle({:?})", component),
            InputEvent::BeginWire { node } => write!(f, "BeginWire({:?})", node),
            InputEvent::CompleteWire { node } => write!(f, "CompleteWire({:?})", node),
            InputEvent::ForceNode { node, value: Some(v) } => {
                write!(f, "Force({:?} = {})", node, v)
            }
            InputEvent::ForceNode { node, value: None } => write!(f, "Release({:?})", node),
            InputEvent::ReconfigureClock {
                component,
                period_ms,
                duty_cycle,
            } => write!(
                f,
                "Clock({:?}, period {}ms, duty {}%)",
                component, period_ms, duty_cycle
            ),
        }
    }
}
