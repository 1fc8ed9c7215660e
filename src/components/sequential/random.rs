use crate::component::{Component, PinLayout, Properties, RecalcContext};
use crate::components::common::{props, EdgeTrigger};
use crate::error::SnapshotError;
use crate::value::LogicValue;
use rand::Rng;
use serde_json::Value;
use std::any::Any;

/// Draws a new bit on every qualifying clock edge; `OUT` is true with the
/// stored probability.
#[derive(Debug, Clone)]
pub struct RandomBit {
    probability: f64,
    trigger: EdgeTrigger,
    value: bool,
}

impl RandomBit {
    /// `probability` is clamped to `0..=1`; NaN falls back to 0.5.
    pub fn new(probability: f64, trigger: EdgeTrigger) -> Self {
        let probability = if probability.is_nan() {
            0.5
        } else {
            probability.clamp(0.0, 1.0)
        };
        RandomBit {
            probability,
            trigger,
            value: false,
        }
    }

    pub fn from_properties(props: &Properties) -> Result<Self, SnapshotError> {
        let probability = props::get_f64(props, "probability", 0.5)?;
        if !(0.0..=1.0).contains(&probability) {
            return Err(SnapshotError::invalid_property(
                "probability",
                format!("{} is outside 0..=1", probability),
            ));
        }
        Ok(RandomBit {
            probability,
            trigger: EdgeTrigger::load(props)?,
            value: props::get_bool(props, "value", false)?,
        })
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }
}

impl Component for RandomBit {
    fn kind(&self) -> &'static str {
        "random"
    }

    fn layout(&self) -> PinLayout {
        PinLayout::new().spike_input("CLK").output("OUT")
    }

    fn recalc_value(&mut self, inputs: &[LogicValue], ctx: &mut RecalcContext<'_>) -> Vec<LogicValue> {
        if self.trigger.observe(inputs[0]) {
            self.value = ctx.rng.gen_bool(self.probability);
        }
        vec![LogicValue::from_bool(self.value)]
    }

    fn properties(&self) -> Properties {
        let mut props = Properties::new();
        props.insert("probability".into(), Value::from(self.probability));
        props.insert("value".into(), Value::from(self.value));
        self.trigger.save(&mut props);
        props
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
