use crate::component::{Component, PinLayout, Properties, RecalcContext};
use crate::components::common::props;
use crate::error::SnapshotError;
use crate::value::LogicValue;
use serde_json::Value;
use std::any::Any;

pub const MAX_DECODER_BITS: usize = 6;

/// `A0..An-1` to one-hot `Y0..Y(2^n - 1)`.
#[derive(Debug, Clone)]
pub struct Decoder {
    bits: usize,
}

impl Decoder {
    pub fn new(bits: usize) -> Self {
        Decoder {
            bits: bits.clamp(1, MAX_DECODER_BITS),
        }
    }

    pub fn from_properties(props: &Properties) -> Result<Self, SnapshotError> {
        Ok(Decoder {
            bits: props::get_width(props, "bits", 2, 1, MAX_DECODER_BITS)?,
        })
    }
}

impl Component for Decoder {
    fn kind(&self) -> &'static str {
        "decoder"
    }

    fn layout(&self) -> PinLayout {
        PinLayout::new()
            .input_bus("A", self.bits)
            .output_bus("Y", 1 << self.bits)
    }

    fn recalc_value(&mut self, inputs: &[LogicValue], _ctx: &mut RecalcContext<'_>) -> Vec<LogicValue> {
        let outputs = 1 << self.bits;
        match LogicValue::word_from_bits(inputs) {
            Some(selected) => (0..outputs)
                .map(|i| LogicValue::from_bool(i == selected as usize))
                .collect(),
            None => vec![LogicValue::Unknown; outputs],
        }
    }

    fn properties(&self) -> Properties {
        let mut props = Properties::new();
        props.insert("bits".into(), Value::from(self.bits as u64));
        props
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
