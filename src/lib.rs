//! This crate provides the core of a single-tape Turing machine simulator.
//! It includes modules for parsing machine descriptions, resolving the declared initial
//! tape, compiling rules with wildcards into a dense transition table, and running the
//! result over a block-allocated infinite tape.

pub mod analyzer;
pub mod compiler;
pub mod dictionary;
pub mod loader;
pub mod machine;
pub mod parser;
pub mod programs;
pub mod resolver;
pub mod tape;
pub mod types;

/// Re-exports the `analyze` function and `AnalysisWarning` enum from the analyzer module.
pub use analyzer::{analyze, AnalysisWarning};
/// Re-exports the compiler entry point and the compiled `Executable`.
pub use compiler::{compile, Executable};
/// Re-exports the `Dictionary` struct from the dictionary module.
pub use dictionary::Dictionary;
/// Re-exports the `ProgramLoader` struct from the loader module.
pub use loader::ProgramLoader;
/// Re-exports the `Machine` table and its `Transition` cells from the machine module.
pub use machine::{Machine, Transition};
/// Re-exports the parsing functions from the parser module.
pub use parser::{parse, parse_tape};
/// Re-exports `ProgramInfo`, `ProgramManager`, and `PROGRAMS` from the programs module.
pub use programs::{ProgramInfo, ProgramManager, PROGRAMS};
/// Re-exports the interval resolver from the resolver module.
pub use resolver::{resolve, Layout};
/// Re-exports the `Tape` and its boundary patterns from the tape module.
pub use tape::{BoundaryPattern, Tape, BLOCK_SIZE};
/// Re-exports the program and execution types from the types module.
pub use types::{
    Direction, Extent, Halt, MachineError, Mode, Program, Rule, RuleToken, State, Status, Symbol,
    TapeEntry, BLANK, UNDEFINED,
};
