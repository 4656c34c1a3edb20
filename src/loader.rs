//! This module provides the `ProgramLoader` struct, responsible for loading machine
//! programs and standalone tape files from the filesystem or from strings.

use crate::parser::{parse, parse_tape};
use crate::types::{MachineError, Program, TapeEntry};
use std::fs;
use std::path::{Path, PathBuf};

/// File extension of machine description files.
pub const PROGRAM_EXTENSION: &str = "tm";

/// `ProgramLoader` is a utility struct for loading programs and tapes.
pub struct ProgramLoader;

impl ProgramLoader {
    /// Loads a single program from the specified file path.
    ///
    /// # Arguments
    ///
    /// * `path` - A reference to the `Path` of the program file to load.
    ///
    /// # Returns
    ///
    /// * `Ok(Program)` if the file is successfully read and parsed into a `Program`.
    /// * `Err(MachineError::FileError)` if the file cannot be read.
    /// * `Err(MachineError::ParseError)` if the file content is not a valid program.
    pub fn load_program(path: &Path) -> Result<Program, MachineError> {
        parse(&read(path)?)
    }

    /// Loads a single program from the provided string content, e.g. from standard input.
    pub fn load_program_from_string(content: &str) -> Result<Program, MachineError> {
        parse(content)
    }

    /// Loads a tape-only file: a list of tape entries with no header and no rules.
    ///
    /// The result is meant for [`Program::replace_tape`].
    pub fn load_tape(path: &Path) -> Result<Vec<TapeEntry>, MachineError> {
        parse_tape(&read(path)?)
    }

    /// Loads every program file (`.tm` extension) in a directory.
    ///
    /// Directories and files with other extensions are skipped. Each file yields either
    /// its path and `Program`, or the error that prevented loading it.
    pub fn load_programs(directory: &Path) -> Vec<Result<(PathBuf, Program), MachineError>> {
        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                return vec![Err(MachineError::FileError(format!(
                    "Failed to read directory {}: {}",
                    directory.display(),
                    e
                )))]
            }
        };

        entries
            .filter_map(|entry| {
                let path = match entry {
                    Ok(entry) => entry.path(),
                    Err(e) => {
                        return Some(Err(MachineError::FileError(format!(
                            "Failed to read directory entry: {}",
                            e
                        ))))
                    }
                };

                if path.is_dir() || path.extension().is_none_or(|ext| ext != PROGRAM_EXTENSION) {
                    return None;
                }

                Some(Self::load_program(&path).map(|program| (path, program)))
            })
            .collect()
    }
}

fn read(path: &Path) -> Result<String, MachineError> {
    fs::read_to_string(path).map_err(|e| {
        MachineError::FileError(format!("Failed to read file {}: {}", path.display(), e))
    })
}
