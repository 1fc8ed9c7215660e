use crate::component::{Component, PinLayout, Properties, RecalcContext};
use crate::components::common::{props, EdgeTrigger, SyncState};
use crate::error::SnapshotError;
use crate::value::LogicValue;
use serde_json::Value;
use std::any::Any;

pub const MAX_REGISTER_BITS: usize = 32;

fn load_bits(props: &Properties, width: usize) -> Vec<LogicValue> {
    let mut bits = props
        .get("state")
        .and_then(Value::as_str)
        .map(LogicValue::decode)
        .unwrap_or_default();
    bits.resize(width, LogicValue::False);
    bits
}

/// Parallel-load register.
///
/// Inputs: `D0..Dn-1`, `CLK`, `PRE`, `CLR`. Outputs: `Q0..Qn-1`.
#[derive(Debug, Clone)]
pub struct Register {
    width: usize,
    trigger: EdgeTrigger,
    state: Vec<LogicValue>,
}

impl Register {
    pub fn new(width: usize, trigger: EdgeTrigger) -> Self {
        let width = width.clamp(1, MAX_REGISTER_BITS);
        Register {
            width,
            trigger,
            state: vec![LogicValue::False; width],
        }
    }

    pub fn from_properties(props: &Properties) -> Result<Self, SnapshotError> {
        let width = props::get_width(props, "bits", 4, 1, MAX_REGISTER_BITS)?;
        Ok(Register {
            width,
            trigger: EdgeTrigger::load(props)?,
            state: load_bits(props, width),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn state(&self) -> &[LogicValue] {
        &self.state
    }
}

impl Component for Register {
    fn kind(&self) -> &'static str {
        "register"
    }

    fn layout(&self) -> PinLayout {
        PinLayout::new()
            .input_bus("D", self.width)
            .spike_input("CLK")
            .spike_input("PRE")
            .spike_input("CLR")
            .output_bus("Q", self.width)
    }

    fn recalc_value(&mut self, inputs: &[LogicValue], _ctx: &mut RecalcContext<'_>) -> Vec<LogicValue> {
        let (data, controls) = inputs.split_at(self.width);
        let edge = self.trigger.observe(controls[0]);

        match SyncState::from_controls(controls[1], controls[2]) {
            SyncState::Invalid => return vec![LogicValue::Unknown; self.width],
            SyncState::ForcedSet => self.state.fill(LogicValue::True),
            SyncState::ForcedClear => self.state.fill(LogicValue::False),
            SyncState::Normal => {
                if edge {
                    for (bit, d) in self.state.iter_mut().zip(data) {
                        *bit = if d.is_known() { *d } else { LogicValue::Unknown };
                    }
                }
            }
        }
        self.state.clone()
    }

    fn properties(&self) -> Properties {
        let mut props = Properties::new();
        props.insert("bits".into(), Value::from(self.width as u64));
        self.trigger.save(&mut props);
        props.insert("state".into(), Value::from(LogicValue::encode(&self.state)));
        props
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Serial-in shift register.
///
/// Inputs: `SIN`, `DIR`, `CLK`, `CLR`. Outputs: `Q0..Qn-1`. `DIR=0` shifts
/// toward higher indices and feeds `Q0`; `DIR=1` shifts toward lower
/// indices and feeds `Qn-1`.
#[derive(Debug, Clone)]
pub struct ShiftRegister {
    width: usize,
    trigger: EdgeTrigger,
    state: Vec<LogicValue>,
}

impl ShiftRegister {
    pub fn new(width: usize, trigger: EdgeTrigger) -> Self {
        let width = width.clamp(1, MAX_REGISTER_BITS);
        ShiftRegister {
            width,
            trigger,
            state: vec![LogicValue::False; width],
        }
    }

    pub fn from_properties(props: &Properties) -> Result<Self, SnapshotError> {
        let width = props::get_width(props, "bits", 4, 1, MAX_REGISTER_BITS)?;
        Ok(ShiftRegister {
            width,
            trigger: EdgeTrigger::load(props)?,
            state: load_bits(props, width),
        })
    }

    pub fn state(&self) -> &[LogicValue] {
        &self.state
    }

    fn shift(&mut self, serial_in: LogicValue, direction: LogicValue) {
        let serial_in = if serial_in.is_known() {
            serial_in
        } else {
            LogicValue::Unknown
        };
        match direction.to_bool() {
            Some(false) => {
                self.state.rotate_right(1);
                self.state[0] = serial_in;
            }
            Some(true) => {
                self.state.rotate_left(1);
                let last = self.width - 1;
                self.state[last] = serial_in;
            }
            None => self.state.fill(LogicValue::Unknown),
        }
    }
}

impl Component for ShiftRegister {
    fn kind(&self) -> &'static str {
        "shift_register"
    }

    fn layout(&self) -> PinLayout {
        PinLayout::new()
            .input("SIN")
            .input("DIR")
            .spike_input("CLK")
            .spike_input("CLR")
            .output_bus("Q", self.width)
    }

    fn recalc_value(&mut self, inputs: &[LogicValue], _ctx: &mut RecalcContext<'_>) -> Vec<LogicValue> {
        let edge = self.trigger.observe(inputs[2]);
        match SyncState::from_controls(LogicValue::False, inputs[3]) {
            SyncState::ForcedClear => self.state.fill(LogicValue::False),
            _ => {
                if edge {
                    self.shift(inputs[0], inputs[1]);
                }
            }
        }
        self.state.clone()
    }

    fn properties(&self) -> Properties {
        let mut props = Properties::new();
        props.insert("bits".into(), Value::from(self.width as u64));
        self.trigger.save(&mut props);
        props.insert("state".into(), Value::from(LogicValue::encode(&self.state)));
        props
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
