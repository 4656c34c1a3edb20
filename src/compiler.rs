//! The table compiler: turns a symbolic [`Program`] into an [`Executable`].
//!
//! Compilation registers every state and symbol in two dictionaries, expands each rule
//! into the table cells it addresses (wildcards broadcast over every state or symbol),
//! and lays the resolved tape declarations onto a fresh [`Tape`].
//!
//! Rules are applied strictly in declaration order and every addressed cell is
//! overwritten, so the last rule touching a cell wins.

use tracing::debug;

use crate::dictionary::Dictionary;
use crate::machine::{Machine, Transition};
use crate::resolver::resolve;
use crate::tape::{BoundaryPattern, Tape};
use crate::types::{
    Direction, Extent, Halt, MachineError, Mode, Program, Rule, RuleToken, State, Status, Symbol,
    TapeEntry, BLANK, UNDEFINED,
};

/// Which states a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateSel {
    Every,
    One(State),
}

/// Which symbols a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolSel {
    Every,
    One(Symbol),
}

/// The state entered by the cells a rule writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextState {
    /// Stay in the source state of each cell.
    Keep,
    To(State),
}

/// The symbol written by the cells a rule writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteSymbol {
    /// Write back the symbol read in each cell.
    Keep,
    Put(Symbol),
}

/// The table update a single rule performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    pub from: StateSel,
    pub read: SymbolSel,
    pub next: NextState,
    pub write: WriteSymbol,
    pub direction: Direction,
}

/// Classifies `rule` into the table update it performs.
///
/// # Returns
///
/// * `Ok(Plan)` for a legal combination of tokens.
/// * `Err(MachineError::CompileError)` if a token appears in a slot where it has no
///   meaning, or names something missing from its dictionary.
pub fn plan(rule: &Rule, states: &Dictionary, symbols: &Dictionary) -> Result<Plan, MachineError> {
    let from = match &rule.state_from {
        RuleToken::Wildcard => StateSel::Every,
        RuleToken::Named(name) => match lookup(states, name, "state")? {
            UNDEFINED => return Err(undefined_source()),
            state => StateSel::One(state),
        },
        RuleToken::Undefined => return Err(undefined_source()),
        RuleToken::Keep => {
            return Err(MachineError::CompileError(
                "The keep marker cannot select a source state".to_string(),
            ))
        }
    };

    let read = match &rule.symbol_from {
        RuleToken::Wildcard => SymbolSel::Every,
        RuleToken::Named(name) => SymbolSel::One(lookup(symbols, name, "symbol")?),
        RuleToken::Undefined => SymbolSel::One(BLANK),
        RuleToken::Keep => {
            return Err(MachineError::CompileError(
                "The keep marker cannot select a source symbol".to_string(),
            ))
        }
    };

    let next = match &rule.state_to {
        RuleToken::Keep => NextState::Keep,
        RuleToken::Named(name) => NextState::To(lookup(states, name, "state")?),
        RuleToken::Undefined => NextState::To(UNDEFINED),
        RuleToken::Wildcard => {
            return Err(MachineError::CompileError(
                "A wildcard cannot be used as a target state".to_string(),
            ))
        }
    };

    let write = match &rule.symbol_to {
        RuleToken::Keep => WriteSymbol::Keep,
        RuleToken::Named(name) => WriteSymbol::Put(lookup(symbols, name, "symbol")?),
        RuleToken::Undefined => WriteSymbol::Put(BLANK),
        RuleToken::Wildcard => {
            return Err(MachineError::CompileError(
                "A wildcard cannot be used as a target symbol".to_string(),
            ))
        }
    };

    Ok(Plan {
        from,
        read,
        next,
        write,
        direction: rule.direction,
    })
}

/// Writes every cell addressed by `plan` into `machine`.
pub fn apply(machine: &mut Machine, plan: &Plan) {
    let sources = match plan.from {
        StateSel::Every => 1..=machine.states(),
        StateSel::One(state) => state..=state,
    };

    for state in sources {
        let next = match plan.next {
            NextState::Keep => state,
            NextState::To(next) => next,
        };

        match (plan.read, plan.write) {
            (SymbolSel::Every, WriteSymbol::Keep) => {
                machine.define_forall_readonly(state, next, plan.direction)
            }
            (SymbolSel::Every, WriteSymbol::Put(write)) => {
                machine.define_forall(state, next, write, plan.direction)
            }
            (SymbolSel::One(read), write) => {
                let write = match write {
                    WriteSymbol::Keep => read,
                    WriteSymbol::Put(write) => write,
                };
                machine.define(
                    state,
                    read,
                    Transition {
                        next,
                        write,
                        direction: plan.direction,
                    },
                );
            }
        }
    }
}

/// Compiles `program` into a ready-to-run [`Executable`].
///
/// # Arguments
///
/// * `program` - The parsed program.
/// * `mode` - The tape compaction policy.
///
/// # Returns
///
/// * `Ok(Executable)` positioned at 0 in the start state.
/// * `Err(MachineError::CompileError)` if the program cannot be turned into a table.
pub fn compile(program: &Program, mode: Mode) -> Result<Executable, MachineError> {
    let (states, symbols) = register(program)?;

    let mut machine = Machine::new(symbols.len() + 1, states.len());
    for rule in &program.rules {
        apply(&mut machine, &plan(rule, &states, &symbols)?);
    }
    for name in &program.finals {
        machine.set_final(lookup(&states, name, "state")?);
    }

    let mut tape = lay_tape(&program.tape, &symbols, mode)?;
    tape.set_state(lookup(&states, &program.start, "state")?);

    debug!(
        states = states.len(),
        symbols = symbols.len(),
        rules = program.rules.len(),
        blocks = tape.block_count(),
        "program compiled"
    );

    Ok(Executable {
        machine,
        initial: tape.clone(),
        tape,
        states,
        symbols,
        steps: 0,
    })
}

/// Builds both dictionaries.
///
/// States are registered start first, then the states of each rule, then the finals.
/// Symbols are registered rule by rule, then from the tape declarations.
fn register(program: &Program) -> Result<(Dictionary, Dictionary), MachineError> {
    let mut states = Dictionary::new();
    let mut symbols = Dictionary::new();

    if states.put(&program.start) == UNDEFINED {
        return Err(MachineError::CompileError(
            "The start state must be a named state".to_string(),
        ));
    }

    for rule in &program.rules {
        for token in [&rule.state_from, &rule.state_to] {
            if let Some(name) = token.name() {
                states.put(name);
            }
        }
        for token in [&rule.symbol_from, &rule.symbol_to] {
            if let Some(name) = token.name() {
                symbols.put(name);
            }
        }
    }

    for name in &program.finals {
        if states.put(name) == UNDEFINED {
            return Err(MachineError::CompileError(
                "The undefined state cannot be final".to_string(),
            ));
        }
    }

    for entry in &program.tape {
        for name in &entry.symbols {
            symbols.put(name);
        }
    }

    Ok((states, symbols))
}

/// Resolves the tape declarations and materializes them onto a new tape.
fn lay_tape(entries: &[TapeEntry], symbols: &Dictionary, mode: Mode) -> Result<Tape, MachineError> {
    let layout = resolve(entries.iter().cloned());

    let (left, right) = layout.boundaries();
    let left = left.map(|entry| boundary(entry, symbols)).transpose()?;
    let right = right.map(|entry| boundary(entry, symbols)).transpose()?;
    let mut tape = Tape::with_patterns(mode, left.flatten(), right.flatten());

    // Only cells that differ from the boundary patterns are stored.
    for entry in layout.finite() {
        if let Extent::Finite { start, end } = entry.extent {
            let codes = encode(&entry.symbols, symbols)?;
            for pos in start..=end {
                let code = codes[entry.index_at(pos)];
                if code != tape.boundary_at(pos) {
                    tape.write_at(pos, code);
                }
            }
        }
    }

    Ok(tape)
}

/// The boundary pattern standing in for an infinite entry.
fn boundary(
    entry: &TapeEntry,
    symbols: &Dictionary,
) -> Result<Option<BoundaryPattern>, MachineError> {
    let codes = encode(&entry.symbols, symbols)?;
    let period = codes.len();
    let data = (0..period)
        .map(|k| codes[(k + entry.shift) % period])
        .collect();

    Ok(BoundaryPattern::new(entry.extent.anchor(), data))
}

fn encode(names: &[String], symbols: &Dictionary) -> Result<Vec<Symbol>, MachineError> {
    names
        .iter()
        .map(|name| lookup(symbols, name, "symbol"))
        .collect()
}

fn lookup(dictionary: &Dictionary, name: &str, kind: &str) -> Result<usize, MachineError> {
    dictionary
        .lookup(name)
        .ok_or_else(|| MachineError::CompileError(format!("Unknown {kind} '{name}'")))
}

fn undefined_source() -> MachineError {
    MachineError::CompileError(
        "Transitions from the undefined state cannot be defined".to_string(),
    )
}

/// A compiled machine together with its tape and the dictionaries needed to print it.
#[derive(Debug, Clone)]
pub struct Executable {
    machine: Machine,
    tape: Tape,
    initial: Tape,
    states: Dictionary,
    symbols: Dictionary,
    steps: u64,
}

impl Executable {
    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn states(&self) -> &Dictionary {
        &self.states
    }

    pub fn symbols(&self) -> &Dictionary {
        &self.symbols
    }

    /// Returns the current state.
    pub fn state(&self) -> State {
        self.tape.state()
    }

    /// The name of the current state. `None` in the undefined state.
    pub fn state_name(&self) -> Option<&str> {
        self.states.resolve(self.tape.state())
    }

    /// The name of the symbol at `pos`. `None` for blank.
    pub fn symbol_at(&self, pos: i64) -> Option<&str> {
        self.symbols.resolve(self.tape.read_at(pos))
    }

    /// Executes a single step. Steps taken in a halted state are not counted.
    pub fn step(&mut self) -> State {
        if self.machine.is_halted(self.tape.state()) {
            return self.tape.state();
        }
        self.steps += 1;
        self.machine.step(&mut self.tape)
    }

    /// Runs until the machine halts.
    ///
    /// Does not return for machines that never halt; see [`Executable::run_restricted`].
    pub fn run(&mut self) -> State {
        while !self.machine.is_halted(self.tape.state()) {
            self.step();
        }
        self.tape.state()
    }

    /// Runs at most `budget` steps and returns the state reached.
    pub fn run_restricted(&mut self, budget: u64) -> State {
        for _ in 0..budget {
            if self.machine.is_halted(self.tape.state()) {
                break;
            }
            self.step();
        }
        self.tape.state()
    }

    /// Number of steps taken since compilation or the last reset.
    pub fn step_count(&self) -> u64 {
        self.steps
    }

    pub fn status(&self) -> Status {
        let state = self.tape.state();
        if state == UNDEFINED {
            Status::Halted(Halt::Undefined)
        } else if self.machine.is_final(state) {
            Status::Halted(Halt::Final)
        } else {
            Status::Running
        }
    }

    /// Restores the tape as it was right after compilation.
    pub fn reset(&mut self) {
        self.tape = self.initial.clone();
        self.steps = 0;
    }

    /// The process exit code for the current status: 0 in a final state, 1 in the
    /// undefined state, `None` while running.
    pub fn exit_code(&self) -> Option<i32> {
        match self.status() {
            Status::Running => None,
            Status::Halted(Halt::Final) => Some(0),
            Status::Halted(Halt::Undefined) => Some(1),
        }
    }
}
