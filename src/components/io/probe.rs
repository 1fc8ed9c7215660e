use crate::component::{Component, PinLayout, Properties, RecalcContext};
use crate::value::LogicValue;
use std::any::Any;

/// Sink that only observes its single input, e.g. an LED.
#[derive(Debug, Clone, Default)]
pub struct LogicOutput {
    last: LogicValue,
}

impl LogicOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Level seen on the most recent recompute.
    pub fn last(&self) -> LogicValue {
        self.last
    }
}

impl Component for LogicOutput {
    fn kind(&self) -> &'static str {
        "output"
    }

    fn layout(&self) -> PinLayout {
        PinLayout::new().input("IN")
    }

    fn recalc_value(&mut self, inputs: &[LogicValue], _ctx: &mut RecalcContext<'_>) -> Vec<LogicValue> {
        self.last = inputs[0];
        Vec::new()
    }

    fn properties(&self) -> Properties {
        Properties::new()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
