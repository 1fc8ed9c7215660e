use crate::component::{Component, PinLayout, Properties, RecalcContext};
use crate::components::common::{props, EdgeTrigger, SyncState};
use crate::error::SnapshotError;
use crate::value::{word_mask, LogicValue};
use serde_json::Value;
use std::any::Any;

pub const MAX_ADDRESS_BITS: usize = 16;
pub const MAX_DATA_BITS: usize = 32;

/// Load a flat word array into `memory`, masking each word to `data_bits`.
/// Words past the end of memory are an error.
pub(crate) fn load_words(
    memory: &mut [u64],
    words: &[u64],
    data_bits: usize,
) -> Result<(), SnapshotError> {
    if words.len() > memory.len() {
        return Err(SnapshotError::invalid_property(
            "memory",
            format!("{} words do not fit {} cells", words.len(), memory.len()),
        ));
    }
    for (cell, word) in memory.iter_mut().zip(words) {
        *cell = word & word_mask(data_bits);
    }
    Ok(())
}

/// Clocked-write, combinational-read memory.
///
/// Inputs: `A0..`, `D0..`, `WE`, `CLK`, `CLR`. Outputs: `Q0..`. `Q` always
/// shows the addressed cell; a qualifying edge with `WE` high stores `D`
/// first. `CLR` zeroes every cell without waiting for the clock.
#[derive(Debug, Clone)]
pub struct Ram {
    address_bits: usize,
    data_bits: usize,
    trigger: EdgeTrigger,
    memory: Vec<u64>,
}

impl Ram {
    pub fn new(address_bits: usize, data_bits: usize, trigger: EdgeTrigger) -> Self {
        let address_bits = address_bits.clamp(1, MAX_ADDRESS_BITS);
        let data_bits = data_bits.clamp(1, MAX_DATA_BITS);
        Ram {
            address_bits,
            data_bits,
            trigger,
            memory: vec![0; 1 << address_bits],
        }
    }

    pub fn from_properties(props: &Properties) -> Result<Self, SnapshotError> {
        let address_bits = props::get_width(props, "address_bits", 4, 1, MAX_ADDRESS_BITS)?;
        let data_bits = props::get_width(props, "data_bits", 4, 1, MAX_DATA_BITS)?;
        let mut ram = Ram::new(address_bits, data_bits, EdgeTrigger::load(props)?);
        load_words(&mut ram.memory, &props::get_words(props, "memory")?, data_bits)?;
        Ok(ram)
    }

    pub fn size(&self) -> usize {
        self.memory.len()
    }

    pub fn read_word(&self, address: usize) -> Option<u64> {
        self.memory.get(address).copied()
    }

    pub fn write_word(&mut self, address: usize, word: u64) -> bool {
        match self.memory.get_mut(address) {
            Some(cell) => {
                *cell = word & word_mask(self.data_bits);
                true
            }
            None => false,
        }
    }

    pub fn load_data(&mut self, words: &[u64]) -> Result<(), SnapshotError> {
        load_words(&mut self.memory, words, self.data_bits)
    }

    pub fn clear_memory(&mut self) {
        self.memory.fill(0);
    }

    pub fn memory(&self) -> &[u64] {
        &self.memory
    }
}

impl Component for Ram {
    fn kind(&self) -> &'static str {
        "ram"
    }

    fn layout(&self) -> PinLayout {
        PinLayout::new()
            .input_bus("A", self.address_bits)
            .input_bus("D", self.data_bits)
            .input("WE")
            .spike_input("CLK")
            .spike_input("CLR")
            .output_bus("Q", self.data_bits)
    }

    fn recalc_value(&mut self, inputs: &[LogicValue], _ctx: &mut RecalcContext<'_>) -> Vec<LogicValue> {
        let (address, rest) = inputs.split_at(self.address_bits);
        let (data, controls) = rest.split_at(self.data_bits);
        let (write_enable, clock, clear) = (controls[0], controls[1], controls[2]);
        let edge = self.trigger.observe(clock);
        let address = LogicValue::word_from_bits(address).map(|a| a as usize);

        if SyncState::from_controls(LogicValue::False, clear) == SyncState::ForcedClear {
            self.clear_memory();
        } else if edge && write_enable.is_true() {
            // A partially known address or data word writes nothing.
            if let (Some(a), Some(word)) = (address, LogicValue::word_from_bits(data)) {
                self.write_word(a, word);
            }
        }

        match address.and_then(|a| self.read_word(a)) {
            Some(word) => LogicValue::bits_from_word(word, self.data_bits),
            None => vec![LogicValue::Unknown; self.data_bits],
        }
    }

    fn properties(&self) -> Properties {
        let mut props = Properties::new();
        props.insert("address_bits".into(), Value::from(self.address_bits as u64));
        props.insert("data_bits".into(), Value::from(self.data_bits as u64));
        self.trigger.save(&mut props);
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
