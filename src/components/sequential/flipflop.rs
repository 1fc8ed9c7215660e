use crate::component::{Component, PinLayout, Properties, RecalcContext};
use crate::components::common::{props, EdgeTrigger, SyncState};
use crate::error::SnapshotError;
use crate::value::LogicValue;
use serde_json::Value;
use std::any::Any;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlipFlopKind {
    D,
    T,
    Jk,
}

impl FlipFlopKind {
    pub fn tag(self) -> &'static str {
        match self {
            FlipFlopKind::D => "flipflop_d",
            FlipFlopKind::T => "flipflop_t",
            FlipFlopKind::Jk => "flipflop_jk",
        }
    }

    fn data_pins(self) -> &'static [&'static str] {
        match self {
            FlipFlopKind::D => &["D"],
            FlipFlopKind::T => &["T"],
            FlipFlopKind::Jk => &["J", "K"],
        }
    }

    /// Next stored level on a qualifying edge.
    pub fn next_state(self, current: LogicValue, data: &[LogicValue]) -> LogicValue {
        match self {
            FlipFlopKind::D => match data[0] {
                LogicValue::HighImpedance => LogicValue::Unknown,
                d => d,
            },
            FlipFlopKind::T => match data[0].to_bool() {
                Some(true) => current.not(),
                Some(false) => current,
                None => LogicValue::Unknown,
            },
            FlipFlopKind::Jk => match (data[0].to_bool(), data[1].to_bool()) {
                (Some(false), Some(false)) => current,
                (Some(true), Some(false)) => LogicValue::True,
                (Some(false), Some(true)) => LogicValue::False,
                (Some(true), Some(true)) => current.not(),
                _ => LogicValue::Unknown,
            },
        }
    }
}

/// Edge-triggered D, T or JK flip-flop with asynchronous preset and clear.
///
/// Inputs: data pins, `CLK`, `PRE`, `CLR`. Outputs: `Q`, `NQ`.
#[derive(Debug, Clone)]
pub struct FlipFlop {
    kind: FlipFlopKind,
    trigger: EdgeTrigger,
    state: LogicValue,
}

impl FlipFlop {
    pub fn new(kind: FlipFlopKind, trigger: EdgeTrigger) -> Self {
        FlipFlop {
            kind,
            trigger,
            state: LogicValue::False,
        }
    }

    pub fn from_properties(kind: FlipFlopKind, props: &Properties) -> Result<Self, SnapshotError> {
        let state = match props.get("state") {
            Some(Value::String(s)) => s.chars().next().map_or(LogicValue::False, LogicValue::from_char),
            _ => LogicValue::from_bool(props::get_bool(props, "state", false)?),
        };
        Ok(FlipFlop {
            kind,
            trigger: EdgeTrigger::load(props)?,
            state,
        })
    }

    pub fn flipflop_kind(&self) -> FlipFlopKind {
        self.kind
    }

    pub fn state(&self) -> LogicValue {
        self.state
    }

    fn data_count(&self) -> usize {
        self.kind.data_pins().len()
    }
}

impl Component for FlipFlop {
    fn kind(&self) -> &'static str {
        self.kind.tag()
    }

    fn layout(&self) -> PinLayout {
        let mut layout = PinLayout::new();
        for pin in self.kind.data_pins() {
            layout = layout.input(pin);
        }
        layout
            .spike_input("CLK")
            .spike_input("PRE")
            .spike_input("CLR")
            .output("Q")
            .output("NQ")
    }

    fn recalc_value(&mut self, inputs: &[LogicValue], _ctx: &mut RecalcContext<'_>) -> Vec<LogicValue> {
        let n = self.data_count();
        let (data, controls) = inputs.split_at(n);
        let (clock, preset, clear) = (controls[0], controls[1], controls[2]);

        // The edge memory follows the clock even while preset/clear hold the output.
        let edge = self.trigger.observe(clock);

        match SyncState::from_controls(preset, clear) {
            SyncState::Invalid => return vec![LogicValue::Unknown, LogicValue::Unknown],
            SyncState::ForcedSet => self.state = LogicValue::True,
            SyncState::ForcedClear => self.state = LogicValue::False,
            SyncState::Normal => {
                if edge {
                    self.state = self.kind.next_state(self.state, data);
                }
            }
        }

        vec![self.state, self.state.invert()]
    }

    fn properties(&self) -> Properties {
        let mut props = Properties::new();
        self.trigger.save(&mut props);
        props.insert("state".into(), Value::from(self.state.to_char().to_string()));
        props
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
