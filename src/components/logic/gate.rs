use crate::component::{Component, PinLayout, Properties, RecalcContext};
use crate::components::common::props;
use crate::error::SnapshotError;
use crate::value::LogicValue;
use serde_json::Value;
use std::any::Any;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateKind {
    Not,
    And,
    Or,
    Nand,
    Nor,
    Xor,
    Xnor,
}

impl GateKind {
    pub const ALL: [GateKind; 7] = [
        GateKind::Not,
        GateKind::And,
        GateKind::Or,
        GateKind::Nand,
        GateKind::Nor,
        GateKind::Xor,
        GateKind::Xnor,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            GateKind::Not => "not",
            GateKind::And => "and",
            GateKind::Or => "or",
            GateKind::Nand => "nand",
            GateKind::Nor => "nor",
            GateKind::Xor => "xor",
            GateKind::Xnor => "xnor",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        GateKind::ALL.iter().copied().find(|k| k.tag() == tag)
    }

    /// Fold the inputs pairwise and apply the output inversion.
    pub fn evaluate(self, inputs: &[LogicValue]) -> LogicValue {
        let fold = |op: fn(LogicValue, LogicValue) -> LogicValue| {
            inputs
                .iter()
                .copied()
                .reduce(op)
                .unwrap_or(LogicValue::Unknown)
        };
        match self {
            GateKind::Not => inputs.first().map_or(LogicValue::Unknown, |v| v.not()),
            GateKind::And => fold(LogicValue::and),
            GateKind::Or => fold(LogicValue::or),
            GateKind::Nand => fold(LogicValue::and).not(),
            GateKind::Nor => fold(LogicValue::or).not(),
            GateKind::Xor => fold(LogicValue::xor),
            GateKind::Xnor => fold(LogicValue::xor).not(),
        }
    }
}

/// Combinational gate with one output. NOT is unary, the rest take two or
/// more inputs.
#[derive(Debug, Clone)]
pub struct Gate {
    kind: GateKind,
    arity: usize,
}

impl Gate {
    pub const MAX_INPUTS: usize = 16;

    pub fn new(kind: GateKind) -> Self {
        let arity = if kind == GateKind::Not { 1 } else { 2 };
        Gate { kind, arity }
    }

    pub fn with_inputs(kind: GateKind, arity: usize) -> Self {
        let arity = if kind == GateKind::Not {
            1
        } else {
            arity.clamp(2, Self::MAX_INPUTS)
        };
        Gate { kind, arity }
    }

    pub fn from_properties(kind: GateKind, props: &Properties) -> Result<Self, SnapshotError> {
        if kind == GateKind::Not {
            return Ok(Gate::new(kind));
        }
        let arity = props::get_width(props, "inputs", 2, 2, Self::MAX_INPUTS)?;
        Ok(Gate { kind, arity })
    }

    pub fn gate_kind(&self) -> GateKind {
        self.kind
    }

    pub fn arity(&self) -> usize {
        self.arity
    }
}

impl Component for Gate {
    fn kind(&self) -> &'static str {
        self.kind.tag()
    }

    fn layout(&self) -> PinLayout {
        let layout = PinLayout::new().input_bus("I", self.arity).output("OUT");
        if self.arity == 2 {
            layout.with_brothers(0, 1)
        } else {
            layout
        }
    }

    fn recalc_value(&mut self, inputs: &[LogicValue], _ctx: &mut RecalcContext<'_>) -> Vec<LogicValue> {
        vec![self.kind.evaluate(inputs)]
    }

    fn properties(&self) -> Properties {
        let mut props = Properties::new();
        if self.kind != GateKind::Not {
            props.insert("inputs".into(), Value::from(self.arity as u64));
        }
        props
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
