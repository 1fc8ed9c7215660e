use crate::component::{Component, PinLayout, Properties, RecalcContext};
use crate::components::common::props;
use crate::error::SnapshotError;
use crate::value::LogicValue;
use rand::Rng;
use serde_json::Value;
use std::any::Any;

/// Level-sensitive SR latch. Not clock-gated.
///
/// `S=1,R=1` is a race: the latch picks 0 or 1 from the circuit's seeded
/// generator once, and keeps that pick until the inputs change.
#[derive(Debug, Clone, Default)]
pub struct SrLatch {
    state: bool,
    race: Option<bool>,
}

impl SrLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_properties(props: &Properties) -> Result<Self, SnapshotError> {
        Ok(SrLatch {
            state: props::get_bool(props, "state", false)?,
            race: None,
        })
    }

    pub fn state(&self) -> bool {
        self.state
    }
}

impl Component for SrLatch {
    fn kind(&self) -> &'static str {
        "sr_latch"
    }

    fn layout(&self) -> PinLayout {
        PinLayout::new().input("S").input("R").output("Q").output("NQ")
    }

    fn recalc_value(&mut self, inputs: &[LogicValue], ctx: &mut RecalcContext<'_>) -> Vec<LogicValue> {
        let (s, r) = match (inputs[0].to_bool(), inputs[1].to_bool()) {
            (Some(s), Some(r)) => (s, r),
            _ => return vec![LogicValue::Unknown, LogicValue::Unknown],
        };

        if s && r {
            let pick = *self.race.get_or_insert_with(|| ctx.rng.gen_bool(0.5));
            self.state = pick;
        } else {
            self.race = None;
            if s {
                self.state = true;
            } else if r {
                self.state = false;
            }
        }

        let q = LogicValue::from_bool(self.state);
        vec![q, q.invert()]
    }

    fn properties(&self) -> Properties {
        let mut props = Properties::new();
        props.insert("state".into(), Value::from(self.state));
        props
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
