use crate::component::{Component, PinLayout, Properties, RecalcContext};
use crate::components::common::props;
use crate::error::SnapshotError;
use crate::value::{word_mask, LogicValue};
use serde_json::Value;
use std::any::Any;

pub const MAX_ALU_BITS: usize = 32;

/// Operation selected by `OP1 OP0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Sub,
    And,
    Or,
}

impl AluOp {
    pub fn from_code(code: u64) -> Self {
        match code & 0b11 {
            0 => AluOp::Add,
            1 => AluOp::Sub,
            2 => AluOp::And,
            _ => AluOp::Or,
        }
    }

    /// Returns `(result, overflow)` for `width`-bit unsigned operands.
    /// Overflow is the carry out of an add or the borrow out of a subtract.
    pub fn apply(self, a: u64, b: u64, carry_in: u64, width: usize) -> (u64, bool) {
        let mask = word_mask(width);
        match self {
            AluOp::Add => {
                let sum = a as u128 + b as u128 + carry_in as u128;
                ((sum as u64) & mask, sum > mask as u128)
            }
            AluOp::Sub => {
                let diff = a as i128 - b as i128 - carry_in as i128;
                ((diff as u64) & mask, diff < 0)
            }
            AluOp::And => (a & b, false),
            AluOp::Or => (a | b, false),
        }
    }
}

/// Inputs: `A0..`, `B0..`, `OP0`, `OP1`, `CIN`. Outputs: `S0..`, `V`, `Z`.
/// Any input that is not a known level makes every output `Unknown`.
#[derive(Debug, Clone)]
pub struct Alu {
    width: usize,
}

impl Alu {
    pub fn new(width: usize) -> Self {
        Alu {
            width: width.clamp(1, MAX_ALU_BITS),
        }
    }

    pub fn from_properties(props: &Properties) -> Result<Self, SnapshotError> {
        Ok(Alu {
            width: props::get_width(props, "bits", 4, 1, MAX_ALU_BITS)?,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }
}

impl Component for Alu {
    fn kind(&self) -> &'static str {
        "alu"
    }

    fn layout(&self) -> PinLayout {
        PinLayout::new()
            .input_bus("A", self.width)
            .input_bus("B", self.width)
            .input("OP0")
            .input("OP1")
            .input("CIN")
            .output_bus("S", self.width)
            .output("V")
            .output("Z")
    }

    fn recalc_value(&mut self, inputs: &[LogicValue], _ctx: &mut RecalcContext<'_>) -> Vec<LogicValue> {
        let w = self.width;
        let operands = (
            LogicValue::word_from_bits(&inputs[..w]),
            LogicValue::word_from_bits(&inputs[w..2 * w]),
            LogicValue::word_from_bits(&inputs[2 * w..2 * w + 2]),
            inputs[2 * w + 2].to_bool(),
        );
        let (Some(a), Some(b), Some(op), Some(carry_in)) = operands else {
            return vec![LogicValue::Unknown; w + 2];
        };

        let (result, overflow) = AluOp::from_code(op).apply(a, b, carry_in as u64, w);
        let mut out = LogicValue::bits_from_word(result, w);
        out.push(LogicValue::from_bool(overflow));
        out.push(LogicValue::from_bool(result == 0));
        out
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
