//! The registry of built-in programs embedded in the binary.

use crate::parser::parse;
use crate::types::{MachineError, Program};
use tracing::error;

/// Names and texts of the embedded programs.
const PROGRAM_TEXTS: [(&str, &str); 5] = [
    ("busy-beaver-3", include_str!("../programs/busy-beaver-3.tm")),
    ("unary-addition", include_str!("../programs/unary-addition.tm")),
    ("binary-increment", include_str!("../programs/binary-increment.tm")),
    ("binary-counter", include_str!("../programs/binary-counter.tm")),
    ("stripes", include_str!("../programs/stripes.tm")),
];

/// A parsed built-in program.
#[derive(Debug, Clone)]
pub struct ProgramInfo {
    pub name: &'static str,
    pub text: &'static str,
    pub program: Program,
}

lazy_static::lazy_static! {
    /// Every embedded program that parses. Failures are logged and skipped.
    pub static ref PROGRAMS: Vec<ProgramInfo> = PROGRAM_TEXTS
        .iter()
        .filter_map(|&(name, text)| match parse(text) {
            Ok(program) => Some(ProgramInfo { name, text, program }),
            Err(e) => {
                error!(program = name, error = %e, "failed to parse built-in program");
                None
            }
        })
        .collect();
}

pub struct ProgramManager;

impl ProgramManager {
    /// Get the number of available programs
    pub fn count() -> usize {
        PROGRAMS.len()
    }

    /// List all program names, in registration order
    pub fn names() -> Vec<&'static str> {
        PROGRAMS.iter().map(|info| info.name).collect()
    }

    /// Get a program by its name
    pub fn get(name: &str) -> Result<Program, MachineError> {
        Self::find(name).map(|info| info.program.clone())
    }

    /// Get the source text of a program by its name
    pub fn text(name: &str) -> Result<&'static str, MachineError> {
        Self::find(name).map(|info| info.text)
    }

    fn find(name: &str) -> Result<&'static ProgramInfo, MachineError> {
        PROGRAMS
            .iter()
            .find(|info| info.name == name)
            .ok_or_else(|| MachineError::ValidationError(format!("Program '{}' not found", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::compiler::compile;
    use crate::types::{Halt, Mode, Status};

    fn run(name: &str, budget: u64) -> crate::compiler::Executable {
        let program = ProgramManager::get(name).unwrap();
        let mut exe = compile(&program, Mode::Normal).unwrap();
        exe.run_restricted(budget);
        exe
    }

    fn tape_text(exe: &crate::compiler::Executable, from: i64, len: usize) -> String {
        exe.symbols().stringify(&exe.tape().read_mem(from, len))
    }

    #[test]
    fn test_all_programs_parse() {
        assert_eq!(ProgramManager::count(), PROGRAM_TEXTS.len());
        assert_eq!(
            ProgramManager::names(),
            PROGRAM_TEXTS.iter().map(|(name, _)| *name).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_all_programs_compile_without_warnings() {
        for name in ProgramManager::names() {
            let program = ProgramManager::get(name).unwrap();
            assert!(compile(&program, Mode::Fast).is_ok(), "{name}");
            assert!(analyze(&program).is_empty(), "{name}: {:?}", analyze(&program));
        }
    }

    #[test]
    fn test_unknown_program() {
        assert!(matches!(
            ProgramManager::get("nope"),
            Err(MachineError::ValidationError(_))
        ));
        assert!(ProgramManager::text("nope").is_err());
        assert!(ProgramManager::text("stripes").unwrap().contains("0~inf: 0 1"));
    }

    #[test]
    fn test_busy_beaver() {
        let exe = run("busy-beaver-3", 100);

        assert_eq!(exe.status(), Status::Halted(Halt::Final));
        assert_eq!(exe.step_count(), 13);
        assert_eq!(exe.tape().position(), 1);
        assert_eq!(tape_text(&exe, -5, 10), "111111");
        assert_eq!(exe.tape().content_bounds(), Some((-3, 2)));
    }

    #[test]
    fn test_unary_addition() {
        let exe = run("unary-addition", 100);

        assert_eq!(exe.state_name(), Some("done"));
        assert_eq!(exe.step_count(), 8);
        assert_eq!(tape_text(&exe, -2, 10), "11111");
        assert_eq!(exe.tape().position(), 4);
    }

    #[test]
    fn test_binary_increment() {
        let exe = run("binary-increment", 100);

        assert_eq!(exe.exit_code(), Some(0));
        assert_eq!(exe.step_count(), 8);
        assert_eq!(tape_text(&exe, 0, 4), "1100");
    }

    #[test]
    fn test_binary_counter_never_halts() {
        let mut exe = run("binary-counter", 1_000);

        assert_eq!(exe.status(), Status::Running);
        assert_eq!(exe.step_count(), 1_000);
        assert_eq!(tape_text(&exe, -7, 8), "11111110");

        exe.run_restricted(100_000);
        assert_eq!(exe.step_count(), 101_000);
        assert_eq!(exe.exit_code(), None);
    }

    #[test]
    fn test_stripes_find_defect() {
        let exe = run("stripes", 10_000);

        assert_eq!(exe.state_name(), Some("found"));
        assert_eq!(exe.step_count(), 38);
        assert_eq!(exe.tape().position(), 36);
        assert_eq!(tape_text(&exe, 34, 6), "010X01");
        assert_eq!(tape_text(&exe, -4, 4), "1010");
        assert_eq!(exe.tape().block_count(), 1);
    }
}
