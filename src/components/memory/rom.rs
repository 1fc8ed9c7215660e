use crate::component::{Component, PinLayout, Properties, RecalcContext};
use crate::components::common::props;
use crate::components::memory::ram::{load_words, MAX_ADDRESS_BITS, MAX_DATA_BITS};
use crate::error::SnapshotError;
use crate::value::LogicValue;
use serde_json::Value;
use std::any::Any;

/// Combinational read-only memory. Inputs: `A0..`. Outputs: `Q0..`.
#[derive(Debug, Clone)]
pub struct Rom {
    address_bits: usize,
    data_bits: usize,
    memory: Vec<u64>,
}

impl Rom {
    pub fn new(address_bits: usize, data_bits: usize, contents: &[u64]) -> Result<Self, SnapshotError> {
        let address_bits = address_bits.clamp(1, MAX_ADDRESS_BITS);
        let data_bits = data_bits.clamp(1, MAX_DATA_BITS);
        let mut memory = vec![0; 1 << address_bits];
        load_words(&mut memory, contents, data_bits)?;
        Ok(Rom {
            address_bits,
            data_bits,
            memory,
        })
    }

    pub fn from_properties(props: &Properties) -> Result<Self, SnapshotError> {
        let address_bits = props::get_width(props, "address_bits", 4, 1, MAX_ADDRESS_BITS)?;
        let data_bits = props::get_width(props, "data_bits", 4, 1, MAX_DATA_BITS)?;
        Rom::new(address_bits, data_bits, &props::get_words(props, "memory")?)
    }

    pub fn read_word(&self, address: usize) -> Option<u64> {
        self.memory.get(address).copied()
    }
}

impl Component for Rom {
    fn kind(&self) -> &'static str {
        "rom"
    }

    fn layout(&self) -> PinLayout {
        PinLayout::new()
            .input_bus("A", self.address_bits)
            .output_bus("Q", self.data_bits)
    }

    fn recalc_value(&mut self, inputs: &[LogicValue], _ctx: &mut RecalcContext<'_>) -> Vec<LogicValue> {
        match LogicValue::word_from_bits(inputs).and_then(|a| self.read_word(a as usize)) {
            Some(word) => LogicValue::bits_from_word(word, self.data_bits),
            None => vec![LogicValue::Unknown; self.data_bits],
        }
    }

    fn properties(&self) -> Properties {
        let mut props = Properties::new();
        props.insert("address_bits".into(), Value::from(self.address_bits as u64));
        props.insert("data_bits".into(), Value::from(self.data_bits as u64));
        props.insert("memory".into(), props::words_value(&self.memory));
        props
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
