use crate::component::{Component, PinLayout, Properties, RecalcContext};
use crate::components::common::props;
use crate::error::SnapshotError;
use crate::value::LogicValue;
use serde_json::Value;
use std::any::Any;

/// Free-running square wave driven by wall time. Each period starts with
/// the low phase.
#[derive(Debug, Clone)]
pub struct Clock {
    period_ms: u64,
    duty_cycle: u8, // Percent of the period spent high
    high_ms: u64,
    low_ms: u64,
    phase_origin: Option<u64>,
}

impl Clock {
    pub const DEFAULT_PERIOD_MS: u64 = 1000;
    pub const DEFAULT_DUTY_CYCLE: u8 = 50;

    pub fn new(period_ms: u64, duty_cycle: u8) -> Self {
        let mut clock = Clock {
            period_ms: 0,
            duty_cycle: Self::DEFAULT_DUTY_CYCLE,
            high_ms: 0,
            low_ms: 0,
            phase_origin: None,
        };
        clock.reconfigure(period_ms, duty_cycle);
        clock
    }

    pub fn from_properties(props: &Properties) -> Result<Self, SnapshotError> {
        let period = props::get_u64(props, "period", Self::DEFAULT_PERIOD_MS)?;
        let duty = props::get_u64(props, "dutycycle", Self::DEFAULT_DUTY_CYCLE as u64)?;
        if period == 0 {
            return Err(SnapshotError::invalid_property("period", "must be positive"));
        }
        Ok(Clock::new(period, duty.min(100) as u8))
    }

    /// Change the waveform and restart the phase at the next recompute.
    pub fn reconfigure(&mut self, period_ms: u64, duty_cycle: u8) {
        self.period_ms = period_ms.max(1);
        self.duty_cycle = duty_cycle.clamp(1, 99);
        self.update_timing();
        self.phase_origin = None;
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    pub fn duty_cycle(&self) -> u8 {
        self.duty_cycle
    }

    fn update_timing(&mut self) {
        // Widened so huge periods cannot overflow; the quotient fits back.
        self.high_ms = (self.period_ms as u128 * self.duty_cycle as u128 / 100) as u64;
        self.low_ms = self.period_ms - self.high_ms;
    }

    /// Level at `now_ms`, anchoring the phase on first use.
    pub fn level_at(&mut self, now_ms: u64) -> LogicValue {
        let origin = *self.phase_origin.get_or_insert(now_ms);
        let phase = now_ms.saturating_sub(origin) % self.period_ms;
        LogicValue::from_bool(phase >= self.low_ms)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Clock::new(Self::DEFAULT_PERIOD_MS, Self::DEFAULT_DUTY_CYCLE)
    }
}

impl Component for Clock {
    fn kind(&self) -> &'static str {
        "clock"
    }

    fn layout(&self) -> PinLayout {
        PinLayout::new().output("CLK")
    }

    fn recalc_value(&mut self, _inputs: &[LogicValue], ctx: &mut RecalcContext<'_>) -> Vec<LogicValue> {
        vec![self.level_at(ctx.wall_ms)]
    }

    fn is_time_driven(&self) -> bool {
        true
    }

    fn properties(&self) -> Properties {
        let mut props = Properties::new();
        props.insert("period".into(), Value::from(self.period_ms));
        props.insert("dutycycle".into(), Value::from(self.duty_cycle as u64));
        props
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
