use crate::component::{Component, PinLayout, Properties, RecalcContext};
use crate::components::common::props;
use crate::error::SnapshotError;
use crate::value::LogicValue;
use serde_json::Value;
use std::any::Any;
use std::cmp::Ordering;

pub const MAX_COMPARATOR_BITS: usize = 32;

/// Unsigned magnitude comparator. Outputs `LT`, `EQ`, `GT` for `A` vs `B`.
#[derive(Debug, Clone)]
pub struct Comparator {
    width: usize,
}

impl Comparator {
    pub fn new(width: usize) -> Self {
        Comparator {
            width: width.clamp(1, MAX_COMPARATOR_BITS),
        }
    }

    pub fn from_properties(props: &Properties) -> Result<Self, SnapshotError> {
        Ok(Comparator {
            width: props::get_width(props, "bits", 4, 1, MAX_COMPARATOR_BITS)?,
        })
    }
}

impl Component for Comparator {
    fn kind(&self) -> &'static str {
        "comparator"
    }

    fn layout(&self) -> PinLayout {
        PinLayout::new()
            .input_bus("A", self.width)
            .input_bus("B", self.width)
            .output("LT")
            .output("EQ")
            .output("GT")
    }

    fn recalc_value(&mut self, inputs: &[LogicValue], _ctx: &mut RecalcContext<'_>) -> Vec<LogicValue> {
        let (a, b) = inputs.split_at(self.width);
        match (LogicValue::word_from_bits(a), LogicValue::word_from_bits(b)) {
            (Some(a), Some(b)) => {
                let ord = a.cmp(&b);
                [Ordering::Less, Ordering::Equal, Ordering::Greater]
                    .iter()
                    .map(|o| LogicValue::from_bool(ord == *o))
                    .collect()
            }
            _ => vec![LogicValue::Unknown; 3],
        }
    }

    fn properties(&self) -> Properties {
        let mut props = Properties::new();
        props.insert("bits".into(), Value::from(self.width as u64));
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

    fn compare(a: u64, b: u64) -> Vec<LogicValue> {
        let mut inputs = bits(a, 3);
        inputs.extend(bits(b, 3));
        recalc(&mut Comparator::new(3), &inputs)
    }

    #[test]
    fn test_orderings() {
        assert_eq!(compare(2, 5), vec![True, False, False]);
        assert_eq!(compare(5, 5), vec![False, True, False]);
        assert_eq!(compare(7, 0), vec![False, False, True]);
    }

    #[test]
    fn test_unknown_bit() {
        let mut inputs = bits(1, 3);
        inputs.extend([Unknown, False, False]);
        assert_eq!(recalc(&mut Comparator::new(3), &inputs), vec![Unknown; 3]);
    }
}
