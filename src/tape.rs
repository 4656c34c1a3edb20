//! The infinite tape: a block-allocated, bidirectionally growable array of symbol codes,
//! the head position and the current state.
//!
//! ```text
//!        block -2          block -1     |     block 0           block 1
//!   +--+--+--  ~~  --+  +--  ~~  --+--+ | +--+--+--  ~~  --+  +--  ~~  --+
//!   |  |  |          |  |          |  | | |  |  |          |  |          |
//!   +--+--+--  ~~  --+  +--  ~~  --+--+ | +--+--+--  ~~  --+  +--  ~~  --+
//!                                  -1   |  0  1
//!   <----------- materialized span [first * W, (first + len) * W) ----------->
//! ```
//!
//! Cells outside the materialized span are not stored. Their value is given by the
//! boundary patterns (or blank), so allocating a block never changes what a read returns.

use std::collections::VecDeque;
use std::ops::Range;

use tracing::trace;

use crate::types::{Direction, Mode, State, Symbol, BLANK};

/// Number of cells in a block. Power of two.
pub const BLOCK_SIZE: usize = 16;

const WIDTH: i64 = BLOCK_SIZE as i64;

type Block = [Symbol; BLOCK_SIZE];

/// A periodic run of symbols standing in for an unmaterialized infinite region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryPattern {
    start: i64,
    data: Vec<Symbol>,
}

impl BoundaryPattern {
    /// `data[0]` sits at `start` (and every `data.len()` cells from there).
    ///
    /// Returns `None` for an empty pattern.
    pub fn new(start: i64, data: Vec<Symbol>) -> Option<Self> {
        (!data.is_empty()).then_some(Self { start, data })
    }

    /// The pattern symbol at `pos`.
    pub fn at(&self, pos: i64) -> Symbol {
        let offset = i128::from(pos) - i128::from(self.start);
        self.data[offset.rem_euclid(self.data.len() as i128) as usize]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tape {
    blocks: VecDeque<Block>,
    /// Logical index of `blocks[0]`.
    first: i64,
    position: i64,
    state: State,
    mode: Mode,
    /// Applies to positions before `left.start`.
    left: Option<BoundaryPattern>,
    /// Applies to positions from `right.start` on.
    right: Option<BoundaryPattern>,
}

impl Tape {
    /// An all-blank tape with the head at 0 in state 1.
    pub fn new(mode: Mode) -> Self {
        Self::with_patterns(mode, None, None)
    }

    /// A tape whose unmaterialized cells follow the given patterns.
    ///
    /// The patterns are installed before the first block is allocated.
    pub fn with_patterns(
        mode: Mode,
        left: Option<BoundaryPattern>,
        right: Option<BoundaryPattern>,
    ) -> Self {
        let mut tape = Self {
            blocks: VecDeque::new(),
            first: 0,
            position: 0,
            state: 1,
            mode,
            left,
            right,
        };
        tape.blocks.push_back(tape.materialize(0));
        tape
    }

    /// Returns the head position.
    pub fn position(&self) -> i64 {
        self.position
    }

    /// Returns the current state.
    pub fn state(&self) -> State {
        self.state
    }

    pub fn set_state(&mut self, state: State) {
        self.state = state;
    }

    /// The materialized positions.
    pub fn allocated(&self) -> Range<i64> {
        self.first * WIDTH..(self.first + self.blocks.len() as i64) * WIDTH
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// The value an unmaterialized cell at `pos` would have.
    pub fn boundary_at(&self, pos: i64) -> Symbol {
        if let Some(left) = self.left.as_ref().filter(|left| pos < left.start) {
            return left.at(pos);
        }
        if let Some(right) = self.right.as_ref().filter(|right| pos >= right.start) {
            return right.at(pos);
        }
        BLANK
    }

    /// Reads the symbol at `pos`, materialized or not.
    pub fn read_at(&self, pos: i64) -> Symbol {
        match self.locate(pos) {
            Some((block, cell)) => self.blocks[block][cell],
            None => self.boundary_at(pos),
        }
    }

    /// Writes `symbol` at `pos`, allocating blocks up to `pos` as needed.
    pub fn write_at(&mut self, pos: i64, symbol: Symbol) {
        while pos < self.allocated().start {
            self.alloc(Direction::Left);
        }
        while pos >= self.allocated().end {
            self.alloc(Direction::Right);
        }

        if let Some((block, cell)) = self.locate(pos) {
            self.blocks[block][cell] = symbol;
        }
    }

    /// Reads the symbol under the head.
    pub fn read(&self) -> Symbol {
        self.read_at(self.position)
    }

    /// Writes a symbol under the head.
    pub fn write(&mut self, symbol: Symbol) {
        self.write_at(self.position, symbol);
    }

    /// Reads `len` cells starting at `pos`.
    pub fn read_mem(&self, pos: i64, len: usize) -> Vec<Symbol> {
        (pos..pos + len as i64).map(|p| self.read_at(p)).collect()
    }

    /// Writes `symbols` to consecutive cells starting at `pos`.
    pub fn write_mem(&mut self, pos: i64, symbols: &[Symbol]) {
        for (p, &symbol) in (pos..).zip(symbols) {
            self.write_at(p, symbol);
        }
    }

    /// First and last materialized cells holding a non-blank symbol.
    pub fn content_bounds(&self) -> Option<(i64, i64)> {
        let span = self.allocated();
        let first = span.clone().find(|&p| self.read_at(p) != BLANK)?;
        let last = span.rev().find(|&p| self.read_at(p) != BLANK)?;
        Some((first, last))
    }

    /// Allocates one block on the given side of the materialized span.
    pub fn alloc(&mut self, side: Direction) {
        match side {
            Direction::Left => {
                let block = self.materialize(self.first - 1);
                self.blocks.push_front(block);
                self.first -= 1;
            }
            Direction::Right => {
                let block = self.materialize(self.first + self.blocks.len() as i64);
                self.blocks.push_back(block);
            }
        }
        trace!(?side, blocks = self.blocks.len(), "tape block allocated");
    }

    /// Moves the head one cell, growing the tape if the head leaves the span.
    ///
    /// Outside of [`Mode::Fast`] the block at the trailing edge is freed afterwards if
    /// it holds nothing but boundary values.
    pub fn step(&mut self, direction: Direction) {
        let span = self.allocated();
        match direction {
            Direction::Left => {
                if self.position == span.start {
                    self.alloc(Direction::Left);
                }
                self.position -= 1;
            }
            Direction::Right => {
                if self.position == span.end - 1 {
                    self.alloc(Direction::Right);
                }
                self.position += 1;
            }
        }

        if self.mode == Mode::Normal {
            self.compact(direction);
        }
    }

    /// Frees the block opposite to `direction` if it matches the boundary.
    fn compact(&mut self, direction: Direction) {
        let head = self.position.div_euclid(WIDTH);
        let last = self.first + self.blocks.len() as i64 - 1;

        let trailing = match direction {
            Direction::Right if head > self.first => self.first,
            Direction::Left if head < last => last,
            _ => return,
        };

        let index = (trailing - self.first) as usize;
        let base = trailing * WIDTH;
        let redundant = self.blocks[index]
            .iter()
            .zip(base..)
            .all(|(&symbol, pos)| symbol == self.boundary_at(pos));

        if !redundant {
            return;
        }

        match direction {
            Direction::Right => {
                self.blocks.pop_front();
                self.first += 1;
            }
            Direction::Left => {
                self.blocks.pop_back();
            }
        }
        trace!(block = trailing, blocks = self.blocks.len(), "tape block freed");
    }

    /// Builds the block with logical index `block` from the current read values.
    fn materialize(&self, block: i64) -> Block {
        let base = block * WIDTH;
        let mut cells = [BLANK; BLOCK_SIZE];
        for (cell, pos) in cells.iter_mut().zip(base..) {
            *cell = self.read_at(pos);
        }
        cells
    }

    /// Maps `pos` to `(block index in the deque, cell index)` if it is materialized.
    fn locate(&self, pos: i64) -> Option<(usize, usize)> {
        if !self.allocated().contains(&pos) {
            return None;
        }
        let block = (pos.div_euclid(WIDTH) - self.first) as usize;
        let cell = pos.rem_euclid(WIDTH) as usize;
        Some((block, cell))
    }
}
