use super::{driven, group_prefix, MAX_GROUP_WIDTH, MAX_SELECT_BITS};
use crate::component::{Component, PinLayout, Properties, RecalcContext};
use crate::components::common::props;
use crate::error::SnapshotError;
use crate::value::LogicValue;
use serde_json::Value;
use std::any::Any;

/// `2^select_bits` input groups of `width` bits each, then `S0..`.
/// Outputs `Y0..` carry the selected group.
#[derive(Debug, Clone)]
pub struct Mux {
    select_bits: usize,
    width: usize,
}

impl Mux {
    pub fn new(select_bits: usize, width: usize) -> Self {
        Mux {
            select_bits: select_bits.clamp(1, MAX_SELECT_BITS),
            width: width.clamp(1, MAX_GROUP_WIDTH),
        }
    }

    pub fn from_properties(props: &Properties) -> Result<Self, SnapshotError> {
        Ok(Mux {
            select_bits: props::get_width(props, "select_bits", 1, 1, MAX_SELECT_BITS)?,
            width: props::get_width(props, "width", 1, 1, MAX_GROUP_WIDTH)?,
        })
    }

    pub fn groups(&self) -> usize {
        1 << self.select_bits
    }
}

impl Component for Mux {
    fn kind(&self) -> &'static str {
        "mux"
    }

    fn layout(&self) -> PinLayout {
        let mut layout = PinLayout::new();
        for group in 0..self.groups() {
            layout = layout.input_bus(&group_prefix("I", group), self.width);
        }
        layout
            .input_bus("S", self.select_bits)
            .output_bus("Y", self.width)
    }

    fn recalc_value(&mut self, inputs: &[LogicValue], _ctx: &mut RecalcContext<'_>) -> Vec<LogicValue> {
        let (data, select) = inputs.split_at(self.groups() * self.width);
        match LogicValue::word_from_bits(select) {
            Some(group) => {
                let start = group as usize * self.width;
                data[start..start + self.width].iter().copied().map(driven).collect()
            }
            None => vec![LogicValue::Unknown; self.width],
        }
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
    use crate::components::common::test_support::{bits, recalc};
    use LogicValue::*;

    #[test]
    fn test_mux_selects_group() {
        let mut mux = Mux::new(2, 2);
        let mut inputs = Vec::new();
        for group in 0..4 {
            inputs.extend(bits(group, 2));
        }
        let mut with_select = |s: u64| {
            let mut v = inputs.clone();
            v.extend(bits(s, 2));
            recalc(&mut mux, &v)
        };
        assert_eq!(with_select(0), bits(0, 2));
        assert_eq!(with_select(2), bits(2, 2));
        assert_eq!(with_select(3), bits(3, 2));
    }

    #[test]
    fn test_mux_unknown_select() {
        let mut mux = Mux::new(1, 1);
        assert_eq!(recalc(&mut mux, &[True, True, Unknown]), vec![Unknown]);
        assert_eq!(recalc(&mut mux, &[HighImpedance, True, False]), vec![Unknown]);
    }

    #[test]
    fn test_mux_layout() {
        let layout = Mux::new(1, 4).layout();
        assert_eq!(layout.input_index("I1_3"), Some(7));
        assert_eq!(layout.input_index("S0"), Some(8));
        assert_eq!(layout.outputs.len(), 4);
    }
}
