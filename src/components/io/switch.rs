use crate::component::{Component, PinLayout, Properties, RecalcContext};
use crate::components::common::props;
use crate::error::SnapshotError;
use crate::value::LogicValue;
use serde_json::Value;
use std::any::Any;

/// User-operated source with a single output.
#[derive(Debug, Clone, Default)]
pub struct LogicInput {
    value: bool,
}

impl LogicInput {
    pub fn new(value: bool) -> Self {
        LogicInput { value }
    }

    pub fn from_properties(props: &Properties) -> Result<Self, SnapshotError> {
        Ok(LogicInput {
            value: props::get_bool(props, "value", false)?,
        })
    }

    pub fn value(&self) -> bool {
        self.value
    }

    pub fn set(&mut self, value: bool) {
        self.value = value;
    }
}

impl Component for LogicInput {
    fn kind(&self) -> &'static str {
        "input"
    }

    fn layout(&self) -> PinLayout {
        PinLayout::new().output("OUT")
    }

    fn recalc_value(&mut self, _inputs: &[LogicValue], _ctx: &mut RecalcContext<'_>) -> Vec<LogicValue> {
        vec![LogicValue::from_bool(self.value)]
    }

    fn properties(&self) -> Properties {
        let mut props = Properties::new();
        props.insert("value".into(), Value::from(self.value));
        props
    }

    fn toggle(&mut self) -> bool {
        self.value = !self.value;
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
