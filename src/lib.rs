//! # Rusty Logic Library
//!
//! A 4-state digital logic circuit evaluation engine written in Rust.
//!
//! This library provides:
//! - A four-valued signal algebra (`0`, `1`, unknown, high impedance)
//! - Round-based evaluation with fixed-point settling and per-wire delays
//! - Short-circuit groups resolved like a wired bus
//! - Gates, flip-flops, counters, memories, multiplexers and clocks
//! - JSON snapshots that restore a circuit to an identical state

pub mod circuit;
pub mod component;
pub mod components;
pub mod config;
pub mod error;
pub mod event;
pub mod node;
pub mod scheduler;
pub mod snapshot;
pub mod types;
pub mod value;
pub mod wire;

// Re-export commonly used items for easier importing
pub use circuit::{Circuit, ComponentEntry, RoundReport};
pub use component::{Component, ComponentId, OutputPins, PinLayout, Properties, RecalcContext};
pub use config::SimConfig;
pub use error::{CircuitError, EvalWarning, SnapshotError};
pub use event::InputEvent;
pub use node::{Direction, Node, NodeId, NodeSerial, Occupancy};
pub use scheduler::{Timeline, TimelineEvent};
pub use snapshot::{CircuitSnapshot, ComponentFactory, DeliverySnapshot, LoadReport};
pub use types::SimTime;
pub use value::LogicValue;
pub use wire::{Wire, WireId, WireKind, WireOutcome};
