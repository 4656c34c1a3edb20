//! This module defines the core data structures and types used throughout the simulator:
//! the symbolic program representation produced by the parser, the rule tokens that may
//! carry wildcards, tape declarations, execution outcomes, and the error type.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parser::Rule as GrammarRule;

/// Dense code of an alphabet symbol. `BLANK` is reserved.
pub type Symbol = usize;
/// Dense code of a machine state. `UNDEFINED` is reserved.
pub type State = usize;

/// The blank symbol code, the default content of every tape cell.
pub const BLANK: Symbol = 0;
/// The undefined (halted) state code.
pub const UNDEFINED: State = 0;
/// The reserved token which always resolves to code 0.
pub const NULL_TOKEN: &str = "null";
/// A token which is never a valid name.
pub const INVALID_TOKEN: &str = "(null)";
/// Wildcard spelling meaning "any value, replaced by a concrete target".
pub const ANY_TOKEN: &str = "*";
/// Wildcard spelling meaning "any value, left unchanged" (the keep marker in target slots).
pub const KEEP_TOKEN: &str = "_";

/// A Turing machine program as written by the user, before compilation.
///
/// States and symbols are still textual; the table compiler assigns codes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Program {
    /// The initial state.
    pub start: String,
    /// States flagged as accepting.
    pub finals: Vec<String>,
    /// Transition rules in declaration order. Later rules override earlier ones.
    pub rules: Vec<Rule>,
    /// Tape declarations in declaration order. Later entries override earlier ones.
    pub tape: Vec<TapeEntry>,
}

impl Program {
    /// Replaces the tape section, e.g. with entries loaded from a separate tape file.
    pub fn replace_tape(&mut self, entries: Vec<TapeEntry>) {
        self.tape = entries;
    }
}

/// One slot of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleToken {
    /// A concrete state or symbol name.
    Named(String),
    /// Any state or symbol. Only meaningful in a source slot.
    Wildcard,
    /// Leave the component unchanged. Only meaningful in a target slot.
    Keep,
    /// The `null` token: blank symbol or undefined state.
    Undefined,
}

impl RuleToken {
    /// Returns the concrete name, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            RuleToken::Named(name) => Some(name),
            _ => None,
        }
    }
}

/// A single transition rule: `<state> <symbol> -> <state> <symbol> <direction>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub state_from: RuleToken,
    pub symbol_from: RuleToken,
    pub state_to: RuleToken,
    pub symbol_to: RuleToken,
    pub direction: Direction,
}

/// Represents the possible directions the head can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Move the head one position to the left.
    Left,
    /// Move the head one position to the right.
    Right,
}

/// The range of positions covered by a tape declaration.
///
/// Bounds are inclusive. At most one side may be unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Extent {
    /// `[start, end]`.
    Finite { start: i64, end: i64 },
    /// `(-inf, end]`.
    LeftInfinite { end: i64 },
    /// `[start, +inf)`.
    RightInfinite { start: i64 },
}

impl Extent {
    /// Builds an extent from optional bounds (`None` is infinite on that side).
    ///
    /// Returns `None` for empty ranges and for ranges unbounded on both sides.
    pub fn from_bounds(start: Option<i64>, end: Option<i64>) -> Option<Self> {
        match (start, end) {
            (Some(start), Some(end)) if start <= end => Some(Extent::Finite { start, end }),
            (None, Some(end)) => Some(Extent::LeftInfinite { end }),
            (Some(start), None) => Some(Extent::RightInfinite { start }),
            _ => None,
        }
    }

    /// The first covered position, `None` if unbounded on the left.
    pub fn start(&self) -> Option<i64> {
        match *self {
            Extent::Finite { start, .. } | Extent::RightInfinite { start } => Some(start),
            Extent::LeftInfinite { .. } => None,
        }
    }

    /// The last covered position, `None` if unbounded on the right.
    pub fn end(&self) -> Option<i64> {
        match *self {
            Extent::Finite { end, .. } | Extent::LeftInfinite { end } => Some(end),
            Extent::RightInfinite { .. } => None,
        }
    }

    pub fn contains(&self, pos: i64) -> bool {
        self.start().map_or(true, |start| pos >= start) && self.end().map_or(true, |end| pos <= end)
    }

    /// The position at which the rotation shift is measured.
    ///
    /// Left-infinite extents are anchored just past their end, so that the last pattern
    /// symbol lands on `end` when the shift is zero. Saturates at `i64::MAX`.
    pub fn anchor(&self) -> i64 {
        match *self {
            Extent::Finite { start, .. } | Extent::RightInfinite { start } => start,
            Extent::LeftInfinite { end } => end.saturating_add(1),
        }
    }
}

/// A tape declaration: a periodic symbol sequence laid over an extent.
///
/// A plain placement `pos: a b c` is the finite entry `[pos, pos + 2]` with one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapeEntry {
    pub extent: Extent,
    /// Rotation offset into `symbols`.
    pub shift: usize,
    /// The repeated symbols. Never empty.
    pub symbols: Vec<String>,
}

impl TapeEntry {
    /// A placement of `symbols` starting at `pos`. `None` if there are no symbols or the
    /// last one would fall past `i64::MAX`.
    pub fn placement(pos: i64, symbols: Vec<String>) -> Option<Self> {
        let end = pos.checked_add(symbols.len() as i64 - 1)?;
        Self::pattern(Extent::from_bounds(Some(pos), Some(end))?, symbols)
    }

    /// A periodic entry over `extent`. `None` if there are no symbols.
    pub fn pattern(extent: Extent, symbols: Vec<String>) -> Option<Self> {
        if symbols.is_empty() {
            return None;
        }

        Some(Self {
            extent,
            shift: 0,
            symbols,
        })
    }

    pub fn period(&self) -> usize {
        self.symbols.len()
    }

    /// Index into `symbols` of the symbol shown at `pos`.
    pub fn index_at(&self, pos: i64) -> usize {
        let offset = i128::from(pos) - i128::from(self.extent.anchor()) + self.shift as i128;
        offset.rem_euclid(self.period() as i128) as usize
    }

    /// The symbol shown at `pos`, or `None` if `pos` is outside the entry.
    pub fn symbol_at(&self, pos: i64) -> Option<&str> {
        self.extent
            .contains(pos)
            .then(|| self.symbols[self.index_at(pos)].as_str())
    }

    /// Moves the entry onto `extent`, advancing the rotation so that every position that
    /// stays covered keeps its symbol.
    pub fn rebased(&self, extent: Extent) -> Self {
        let delta = i128::from(extent.anchor()) - i128::from(self.extent.anchor());
        Self {
            extent,
            shift: (self.shift as i128 + delta).rem_euclid(self.period() as i128) as usize,
            symbols: self.symbols.clone(),
        }
    }
}

/// Trailing-edge compaction policy of the tape.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Mode {
    /// Free trailing blocks that match the boundary pattern.
    #[default]
    Normal,
    /// Never free blocks. Constant-time steps, unbounded memory.
    Fast,
}

/// How a machine stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// Stopped in a state flagged final.
    Final,
    /// Stopped in the undefined state: no transition was defined.
    Undefined,
}

/// Represents the outcome of driving the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The machine can still take steps.
    Running,
    /// The machine has halted.
    Halted(Halt),
}

/// Represents the errors that can occur while loading and compiling a program.
///
/// Halting is never an error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MachineError {
    /// Indicates an error during the parsing of a program definition.
    #[error("Program parsing error: {0}")]
    ParseError(#[from] Box<pest::error::Error<GrammarRule>>),
    /// Indicates a structural problem which carries no source position.
    #[error("Program validation error: {0}")]
    ValidationError(String),
    /// Indicates a rule that the table compiler cannot expand.
    #[error("Compile error: {0}")]
    CompileError(String),
    /// Indicates an error related to reading program or tape files.
    #[error("File error: {0}")]
    FileError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_direction_serialization() {
        let left_json = serde_json::to_string(&Direction::Left).unwrap();
        let right_json = serde_json::to_string(&Direction::Right).unwrap();

        assert_eq!(left_json, "\"Left\"");
        assert_eq!(right_json, "\"Right\"");

        let left: Direction = serde_json::from_str(&left_json).unwrap();
        assert_eq!(left, Direction::Left);
    }

    #[test]
    fn test_extent_from_bounds() {
        assert_eq!(
            Extent::from_bounds(Some(1), Some(3)),
            Some(Extent::Finite { start: 1, end: 3 })
        );
        assert_eq!(Extent::from_bounds(Some(3), Some(2)), None);
        assert_eq!(Extent::from_bounds(None, None), None);
        assert_eq!(
            Extent::from_bounds(None, Some(-1)),
            Some(Extent::LeftInfinite { end: -1 })
        );
    }

    #[test]
    fn test_placement_covers_its_symbols() {
        let entry = TapeEntry::placement(4, symbols(&["a", "b", "c"])).unwrap();

        assert_eq!(entry.extent, Extent::Finite { start: 4, end: 6 });
        assert_eq!(entry.symbol_at(3), None);
        assert_eq!(entry.symbol_at(4), Some("a"));
        assert_eq!(entry.symbol_at(6), Some("c"));
        assert!(TapeEntry::placement(0, Vec::new()).is_none());
    }

    #[test]
    fn test_left_infinite_pattern_ends_on_last_symbol() {
        let entry =
            TapeEntry::pattern(Extent::LeftInfinite { end: -1 }, symbols(&["x", "y"])).unwrap();

        assert_eq!(entry.symbol_at(-1), Some("y"));
        assert_eq!(entry.symbol_at(-2), Some("x"));
        assert_eq!(entry.symbol_at(-3), Some("y"));
        assert_eq!(entry.symbol_at(0), None);
    }

    #[test]
    fn test_rebased_keeps_symbols_in_place() {
        let entry = TapeEntry::pattern(
            Extent::RightInfinite { start: 0 },
            symbols(&["a", "b", "c"]),
        )
        .unwrap();
        let trimmed = entry.rebased(Extent::Finite { start: 4, end: 9 });

        assert_eq!(trimmed.shift, 1);
        for pos in 4..=9 {
            assert_eq!(trimmed.symbol_at(pos), entry.symbol_at(pos));
        }
    }

    #[test]
    fn test_error_display() {
        let error = MachineError::CompileError("bad rule".to_string());
        assert_eq!(error.to_string(), "Compile error: bad rule");
    }
}
