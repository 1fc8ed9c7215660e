use serde::{Deserialize, Serialize};
use std::fmt;

/// Four-state logic level carried by every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LogicValue {
    #[default]
    False,
    True,
    Unknown,
    HighImpedance, // Tri-state, "not driving"
}

impl LogicValue {
    pub const ALL: [LogicValue; 4] = [
        LogicValue::False,
        LogicValue::True,
        LogicValue::Unknown,
        LogicValue::HighImpedance,
    ];

    pub fn to_str(&self) -> &'static str {
        match self {
            LogicValue::False => "False",
            LogicValue::True => "True",
            LogicValue::Unknown => "Unknown",
            LogicValue::HighImpedance => "HighZ",
        }
    }

    /// Compact serialized form used in snapshots.
    pub fn to_char(&self) -> char {
        match self {
            LogicValue::False => '0',
            LogicValue::True => '1',
            LogicValue::HighImpedance => 'Z',
            LogicValue::Unknown => 'X',
        }
    }

    /// Inverse of [`LogicValue::to_char`]. Anything that is not `0`, `1` or
    /// `Z` reads back as `Unknown`.
    pub fn from_char(c: char) -> Self {
        match c {
            '0' => LogicValue::False,
            '1' => LogicValue::True,
            'Z' | 'z' => LogicValue::HighImpedance,
            _ => LogicValue::Unknown,
        }
    }

    pub fn from_bool(value: bool) -> Self {
        if value {
            LogicValue::True
        } else {
            LogicValue::False
        }
    }

    pub fn to_bool(&self) -> Option<bool> {
        match self {
            LogicValue::False => Some(false),
            LogicValue::True => Some(true),
            LogicValue::Unknown | LogicValue::HighImpedance => None,
        }
    }

    pub fn is_known(&self) -> bool {
        self.to_bool().is_some()
    }

    pub fn is_true(&self) -> bool {
        *self == LogicValue::True
    }

    /// `False` dominates: `False AND x == False` for every `x`.
    pub fn and(self, other: LogicValue) -> LogicValue {
        match (self.to_bool(), other.to_bool()) {
            (Some(false), _) | (_, Some(false)) => LogicValue::False,
            (Some(true), Some(true)) => LogicValue::True,
            _ => LogicValue::Unknown,
        }
    }

    /// `True` dominates: `True OR x == True` for every `x`.
    pub fn or(self, other: LogicValue) -> LogicValue {
        match (self.to_bool(), other.to_bool()) {
            (Some(true), _) | (_, Some(true)) => LogicValue::True,
            (Some(false), Some(false)) => LogicValue::False,
            _ => LogicValue::Unknown,
        }
    }

    pub fn xor(self, other: LogicValue) -> LogicValue {
        match (self.to_bool(), other.to_bool()) {
            (Some(a), Some(b)) => LogicValue::from_bool(a != b),
            _ => LogicValue::Unknown,
        }
    }

    /// Logical negation; a floating or unknown input yields `Unknown`.
    pub fn not(self) -> LogicValue {
        match self.to_bool() {
            Some(b) => LogicValue::from_bool(!b),
            None => LogicValue::Unknown,
        }
    }

    /// Flip a known level and pass `Unknown`/`HighImpedance` through
    /// untouched.
    pub fn invert(self) -> LogicValue {
        match self {
            LogicValue::False => LogicValue::True,
            LogicValue::True => LogicValue::False,
            other => other,
        }
    }

    /// Resolve two sources tied together. A `HighImpedance` side is not
    /// driving and yields to the other one; otherwise the levels are ORed.
    pub fn resolve(self, other: LogicValue) -> LogicValue {
        match (self, other) {
            (LogicValue::HighImpedance, v) | (v, LogicValue::HighImpedance) => v,
            (a, b) => a.or(b),
        }
    }

    /// Assemble an unsigned word from little-endian bits. Returns `None` if
    /// any bit is not a known level, or a bit past the 64th is set.
    pub fn word_from_bits(bits: &[LogicValue]) -> Option<u64> {
        let mut word = 0u64;
        for (i, bit) in bits.iter().enumerate() {
            if bit.to_bool()? {
                word |= u32::try_from(i).ok().and_then(|i| 1u64.checked_shl(i))?;
            }
        }
        Some(word)
    }

    /// Split `word` into `width` little-endian bits. Bits past the 64th are
    /// `False`.
    pub fn bits_from_word(word: u64, width: usize) -> Vec<LogicValue> {
        (0..width)
            .map(|i| {
                let bit = u32::try_from(i).ok().and_then(|i| word.checked_shr(i)).map_or(0, |w| w & 1);
                LogicValue::from_bool(bit == 1)
            })
            .collect()
    }

    pub fn encode(values: &[LogicValue]) -> String {
        values.iter().map(LogicValue::to_char).collect()
    }

    pub fn decode(encoded: &str) -> Vec<LogicValue> {
        encoded.chars().map(LogicValue::from_char).collect()
    }
}

impl From<bool> for LogicValue {
    fn from(value: bool) -> Self {
        LogicValue::from_bool(value)
    }
}

impl fmt::Display for LogicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

/// Mask covering the low `width` bits of a word.
pub fn word_mask(width: usize) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}
