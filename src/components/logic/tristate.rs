use crate::component::{Component, PinLayout, Properties, RecalcContext};
use crate::value::LogicValue;
use std::any::Any;

/// Passes `IN` while `EN` is high, stops driving (`HighImpedance`) while it
/// is low.
#[derive(Debug, Clone, Default)]
pub struct TriStateBuffer;

impl TriStateBuffer {
    pub fn new() -> Self {
        TriStateBuffer
    }
}

impl Component for TriStateBuffer {
    fn kind(&self) -> &'static str {
        "tristate"
    }

    fn layout(&self) -> PinLayout {
        PinLayout::new().input("IN").input("EN").output("OUT")
    }

    fn recalc_value(&mut self, inputs: &[LogicValue], _ctx: &mut RecalcContext<'_>) -> Vec<LogicValue> {
        let out = match inputs[1].to_bool() {
            Some(true) => inputs[0],
            Some(false) => LogicValue::HighImpedance,
            None => LogicValue::Unknown,
        };
        vec![out]
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
