use super::{driven, group_prefix, MAX_GROUP_WIDTH, MAX_SELECT_BITS};
use crate::component::{Component, PinLayout, Properties, RecalcContext};
use crate::components::common::props;
use crate::error::SnapshotError;
use crate::value::LogicValue;
use serde_json::Value;
use std::any::Any;

/// Routes `D0..` to output group `Y<s>_*`; unselected groups are low.
#[derive(Debug, Clone)]
pub struct Demux {
    select_bits: usize,
    width: usize,
}

impl Demux {
    pub fn new(select_bits: usize, width: usize) -> Self {
        Demux {
            select_bits: select_bits.clamp(1, MAX_SELECT_BITS),
            width: width.clamp(1, MAX_GROUP_WIDTH),
        }
    }

    pub fn from_properties(props: &Properties) -> Result<Self, SnapshotError> {
        Ok(Demux {
            select_bits: props::get_width(props, "select_bits", 1, 1, MAX_SELECT_BITS)?,
            width: props::get_width(props, "width", 1, 1, MAX_GROUP_WIDTH)?,
        })
    }

    pub fn groups(&self) -> usize {
        1 << self.select_bits
    }
}

impl Component for Demux {
    fn kind(&self) -> &'static str {
        "demux"
    }

    fn layout(&self) -> PinLayout {
        let mut layout = PinLayout::new()
            .input_bus("D", self.width)
            .input_bus("S", self.select_bits);
        for group in 0..self.groups() {
            layout = layout.output_bus(&group_prefix("Y", group), self.width);
        }
        layout
    }

    fn recalc_value(&mut self, inputs: &[LogicValue], _ctx: &mut RecalcContext<'_>) -> Vec<LogicValue> {
        let (data, select) = inputs.split_at(self.width);
        let total = self.groups() * self.width;
        let Some(group) = LogicValue::word_from_bits(select) else {
            return vec![LogicValue::Unknown; total];
        };
        let mut out = vec![LogicValue::False; total];
        let start = group as usize * self.width;
        for (slot, value) in out[start..start + self.width].iter_mut().zip(data) {
            *slot = driven(*value);
        }
        out
    }

    fn properties(&self) -> Properties {
        let mut props = Properties::new();
        props.insert("select_bits".into(), Value::from(self.select_bits as u64));
        props.insert("width".into(), Value::from(self.width as u64));
        props
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::common::test_support::recalc;
    use LogicValue::*;

    #[test]
    fn test_demux_routes_data() {
        let mut demux = Demux::new(1, 2);
        assert_eq!(recalc(&mut demux, &[True, False, False]), vec![True, False, False, False]);
        assert_eq!(recalc(&mut demux, &[True, True, True]), vec![False, False, True, True]);
    }

    #[test]
    fn test_demux_unknown_select() {
        let mut demux = Demux::new(1, 1);
        assert_eq!(recalc(&mut demux, &[True, HighImpedance]), vec![Unknown, Unknown]);
    }
}
