//! This module defines the `Machine`, a dense transition table indexed by
//! `(state - 1) * alphabet + symbol`, and the step/run operations that drive a [`Tape`].

use crate::tape::Tape;
use crate::types::{Direction, State, Symbol, UNDEFINED};

/// A single cell of the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// The state entered after the step.
    pub next: State,
    /// The symbol written under the head.
    pub write: Symbol,
    /// The direction the head moves after writing.
    pub direction: Direction,
}

/// A compiled single-tape Turing machine.
///
/// States are `1..=states`; state 0 is undefined and terminal. Symbols are
/// `0..alphabet`, where 0 is blank. Cells that were never defined send the
/// machine to the undefined state without touching the tape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Machine {
    alphabet: usize,
    states: usize,
    table: Vec<Option<Transition>>,
    finals: Vec<bool>,
}

impl Machine {
    /// Creates a machine with every transition undefined and no final states.
    ///
    /// # Arguments
    ///
    /// * `alphabet` - Number of symbols, blank included.
    /// * `states` - Number of states, the undefined state excluded.
    pub fn new(alphabet: usize, states: usize) -> Self {
        Self {
            alphabet,
            states,
            table: vec![None; alphabet * states],
            finals: vec![false; states],
        }
    }

    /// Returns the alphabet size, blank included.
    pub fn alphabet(&self) -> usize {
        self.alphabet
    }

    /// Returns the number of states, the undefined state excluded.
    pub fn states(&self) -> usize {
        self.states
    }

    /// Defines the transition taken in `from` when reading `read`.
    ///
    /// Redefining a cell overwrites it.
    pub fn define(&mut self, from: State, read: Symbol, transition: Transition) {
        if let Some(index) = self.index(from, read) {
            self.table[index] = Some(transition);
        }
    }

    /// Defines the transitions of `from` for every symbol, writing `write`.
    pub fn define_forall(&mut self, from: State, next: State, write: Symbol, direction: Direction) {
        for read in 0..self.alphabet {
            self.define(
                from,
                read,
                Transition {
                    next,
                    write,
                    direction,
                },
            );
        }
    }

    /// Defines the transitions of `from` for every symbol, writing back what was read.
    pub fn define_forall_readonly(&mut self, from: State, next: State, direction: Direction) {
        for read in 0..self.alphabet {
            self.define(
                from,
                read,
                Transition {
                    next,
                    write: read,
                    direction,
                },
            );
        }
    }

    /// Flags `state` as final.
    pub fn set_final(&mut self, state: State) {
        if let Some(flag) = state.checked_sub(1).and_then(|i| self.finals.get_mut(i)) {
            *flag = true;
        }
    }

    /// Checks if `state` is flagged final. The undefined state never is.
    pub fn is_final(&self, state: State) -> bool {
        state
            .checked_sub(1)
            .and_then(|i| self.finals.get(i))
            .copied()
            .unwrap_or(false)
    }

    /// Checks if a machine in `state` can take no further step.
    pub fn is_halted(&self, state: State) -> bool {
        state == UNDEFINED || self.is_final(state)
    }

    /// Looks up the transition for `state` reading `symbol`.
    pub fn transition(&self, state: State, symbol: Symbol) -> Option<Transition> {
        self.index(state, symbol).and_then(|index| self.table[index])
    }

    /// Executes a single step and returns the resulting state.
    ///
    /// A halted tape is left untouched. An undefined cell moves the tape into the
    /// undefined state without writing or moving.
    pub fn step(&self, tape: &mut Tape) -> State {
        let state = tape.state();
        if self.is_halted(state) {
            return state;
        }

        match self.transition(state, tape.read()) {
            Some(transition) => {
                tape.write(transition.write);
                tape.step(transition.direction);
                tape.set_state(transition.next);
            }
            None => tape.set_state(UNDEFINED),
        }

        tape.state()
    }

    /// Runs until the tape reaches the undefined state or a final state.
    ///
    /// Does not return for machines that never halt.
    pub fn run(&self, tape: &mut Tape) -> State {
        while !self.is_halted(tape.state()) {
            self.step(tape);
        }
        tape.state()
    }

    /// Runs at most `budget` steps and returns the state reached.
    pub fn run_restricted(&self, tape: &mut Tape, budget: u64) -> State {
        for _ in 0..budget {
            if self.is_halted(tape.state()) {
                break;
            }
            self.step(tape);
        }
        tape.state()
    }

    fn index(&self, state: State, symbol: Symbol) -> Option<usize> {
        if state == UNDEFINED || state > self.states || symbol >= self.alphabet {
            return None;
        }
        Some((state - 1) * self.alphabet + symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Mode, BLANK};

    /// Two states over {blank, 1}: state 1 writes 1 and moves right into state 2,
    /// state 2 reading blank writes 1 and moves left into state 1.
    fn create_ping_pong_machine() -> Machine {
        let mut machine = Machine::new(2, 2);
        machine.define(
            1,
            BLANK,
            Transition {
                next: 2,
                write: 1,
                direction: Direction::Right,
            },
        );
        machine.define(
            2,
            BLANK,
            Transition {
                next: 1,
                write: 1,
                direction: Direction::Left,
            },
        );
        machine
    }

    #[test]
    fn test_machine_creation() {
        let machine = Machine::new(3, 2);

        assert_eq!(machine.alphabet(), 3);
        assert_eq!(machine.states(), 2);
        assert_eq!(machine.transition(1, 0), None);
        assert!(!machine.is_final(1));
        assert!(machine.is_halted(UNDEFINED));
    }

    #[test]
    fn test_single_step() {
        let machine = create_ping_pong_machine();
        let mut tape = Tape::new(Mode::Normal);

        assert_eq!(machine.step(&mut tape), 2);
        assert_eq!(tape.read_at(0), 1);
        assert_eq!(tape.position(), 1);
    }

    #[test]
    fn test_undefined_cell_halts_without_touching_tape() {
        let machine = create_ping_pong_machine();
        let mut tape = Tape::new(Mode::Normal);

        assert_eq!(machine.run_restricted(&mut tape, 4), UNDEFINED);
        assert_eq!(tape.read_mem(-1, 3), vec![BLANK, 1, 1]);
        assert_eq!(tape.position(), 0);
    }

    #[test]
    fn test_step_is_idempotent_when_halted() {
        let mut machine = create_ping_pong_machine();
        machine.set_final(2);
        let mut tape = Tape::new(Mode::Normal);

        assert_eq!(machine.run(&mut tape), 2);
        let snapshot = tape.clone();

        assert_eq!(machine.step(&mut tape), 2);
        assert_eq!(tape, snapshot);

        tape.set_state(UNDEFINED);
        let snapshot = tape.clone();
        assert_eq!(machine.step(&mut tape), UNDEFINED);
        assert_eq!(tape, snapshot);
    }

    #[test]
    fn test_run_restricted_stops_on_budget() {
        let mut machine = Machine::new(1, 1);
        machine.define_forall_readonly(1, 1, Direction::Right);
        let mut tape = Tape::new(Mode::Normal);

        assert_eq!(machine.run_restricted(&mut tape, 100), 1);
        assert_eq!(tape.position(), 100);
        assert_eq!(machine.run_restricted(&mut tape, 0), 1);
        assert_eq!(tape.position(), 100);
    }

    #[test]
    fn test_define_forall_overwrites_every_symbol() {
        let mut machine = Machine::new(3, 1);
        machine.define_forall(1, 1, 2, Direction::Left);

        for symbol in 0..3 {
            assert_eq!(
                machine.transition(1, symbol),
                Some(Transition {
                    next: 1,
                    write: 2,
                    direction: Direction::Left,
                })
            );
        }

        machine.define_forall_readonly(1, 0, Direction::Right);
        assert_eq!(machine.transition(1, 2).map(|t| t.write), Some(2));
        assert_eq!(machine.transition(1, 2).map(|t| t.next), Some(0));
    }

    #[test]
    fn test_out_of_range_lookups() {
        let mut machine = Machine::new(2, 1);
        machine.set_final(5);
        machine.define_forall(1, 1, 1, Direction::Right);

        assert_eq!(machine.transition(2, 0), None);
        assert_eq!(machine.transition(1, 2), None);
        assert!(!machine.is_final(5));
    }
}
