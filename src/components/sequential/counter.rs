use crate::component::{Component, PinLayout, Properties, RecalcContext};
use crate::components::common::{props, EdgeTrigger, SyncState};
use crate::error::SnapshotError;
use crate::value::{word_mask, LogicValue};
use serde_json::Value;
use std::any::Any;

pub const MAX_COUNTER_BITS: usize = 32;

/// Binary up-counter with asynchronous clear.
///
/// Inputs: `CLK`, `CLR`. Outputs: `Q0..Qn-1`, `OVF`. `OVF` is raised by the
/// edge that wraps the count to zero and dropped by the next edge.
#[derive(Debug, Clone)]
pub struct Counter {
    width: usize,
    trigger: EdgeTrigger,
    count: u64,
    overflow: bool,
}

impl Counter {
    pub fn new(width: usize, trigger: EdgeTrigger) -> Self {
        Counter {
            width: width.clamp(1, MAX_COUNTER_BITS),
            trigger,
            count: 0,
            overflow: false,
        }
    }

    pub fn from_properties(props: &Properties) -> Result<Self, SnapshotError> {
        let width = props::get_width(props, "bits", 4, 1, MAX_COUNTER_BITS)?;
        Ok(Counter {
            width,
            trigger: EdgeTrigger::load(props)?,
            count: props::get_u64(props, "value", 0)? & word_mask(width),
            overflow: props::get_bool(props, "overflow", false)?,
        })
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn overflow(&self) -> bool {
        self.overflow
    }

    pub fn set_count(&mut self, count: u64) {
        self.count = count & word_mask(self.width);
    }

    fn advance(&mut self) {
        let next = self.count + 1;
        if next > word_mask(self.width) {
            self.count = 0;
            self.overflow = true;
        } else {
            self.count = next;
            self.overflow = false;
        }
    }

    fn outputs(&self) -> Vec<LogicValue> {
        let mut out = LogicValue::bits_from_word(self.count, self.width);
        out.push(LogicValue::from_bool(self.overflow));
        out
    }
}

impl Component for Counter {
    fn kind(&self) -> &'static str {
        "counter"
    }

    fn layout(&self) -> PinLayout {
        PinLayout::new()
            .spike_input("CLK")
            .spike_input("CLR")
            .output_bus("Q", self.width)
            .output("OVF")
    }

    fn recalc_value(&mut self, inputs: &[LogicValue], _ctx: &mut RecalcContext<'_>) -> Vec<LogicValue> {
        let edge = self.trigger.observe(inputs[0]);
        match SyncState::from_controls(LogicValue::False, inputs[1]) {
            SyncState::ForcedClear => {
                self.count = 0;
                self.overflow = false;
            }
            _ => {
                if edge {
                    self.advance();
                }
            }
        }
        self.outputs()
    }

    fn properties(&self) -> Properties {
        let mut props = Properties::new();
        props.insert("bits".into(), Value::from(self.width as u64));
        self.trigger.save(&mut props);
        props.insert("value".into(), Value::from(self.count));
        props.insert("overflow".into(), Value::from(self.overflow));
        props
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
