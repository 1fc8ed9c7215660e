//! Combinational selectors. An unknown select word drives every output
//! `Unknown`.

use crate::value::LogicValue;

pub mod decoder;
pub mod demux;
pub mod mux;

pub use decoder::Decoder;
pub use demux::Demux;
pub use mux::Mux;

pub const MAX_SELECT_BITS: usize = 4;
pub const MAX_GROUP_WIDTH: usize = 32;

/// Pin prefix of one bit group, e.g. `I2_` for mux input group 2.
pub(crate) fn group_prefix(prefix: &str, group: usize) -> String {
    format!("{}{}_", prefix, group)
}

/// Value a selector drives for a data bit it forwards.
pub(crate) fn driven(value: LogicValue) -> LogicValue {
    if value.is_known() {
        value
    } else {
        LogicValue::Unknown
    }
}
