//! Plain-text rendering of a running machine: the tape around the head, and the
//! compiled transition table written back out as program text.

use tmsim::types::NULL_TOKEN;
use tmsim::{Direction, Executable};

/// Cells shown on each side of the head in window mode.
pub const RADIUS: i64 = 12;

/// How blank cells are drawn.
const BLANK_CELL: &str = " ";

/// Which part of the tape to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// `RADIUS` cells on each side of the head.
    Window,
    /// Every non-blank cell, and the head.
    All,
}

/// Renders the tape and the current state.
///
/// # Arguments
///
/// * `exe` - The machine to draw.
/// * `view` - The range of cells to draw.
/// * `frame` - Draw cell borders and a caret under the head instead of brackets.
pub fn render_tape(exe: &Executable, view: View, frame: bool) -> String {
    let tape = exe.tape();
    let head = tape.position();

    let (from, to) = match view {
        View::Window => (head - RADIUS, head + RADIUS),
        View::All => {
            let (first, last) = tape.content_bounds().unwrap_or((head, head));
            (first.min(head), last.max(head))
        }
    };

    let cells: Vec<&str> = (from..=to)
        .map(|pos| exe.symbol_at(pos).unwrap_or(BLANK_CELL))
        .collect();
    let width = cells
        .iter()
        .map(|cell| cell.chars().count())
        .max()
        .unwrap_or(1);
    let head_index = (head - from) as usize;

    let mut lines = vec![format!(
        "state: {}  step: {}  head: {}",
        exe.state_name().unwrap_or(NULL_TOKEN),
        exe.step_count(),
        head
    )];

    if frame {
        let border: String = std::iter::once("+".to_string())
            .chain(cells.iter().map(|_| format!("{}+", "-".repeat(width + 2))))
            .collect();
        let row: String = std::iter::once("|".to_string())
            .chain(cells.iter().map(|cell| format!(" {cell:^width$} |")))
            .collect();
        let caret = format!(
            "{}^",
            " ".repeat(head_index * (width + 3) + 2 + width / 2)
        );

        lines.push(border.clone());
        lines.push(row);
        lines.push(border);
        lines.push(caret);
    } else {
        let row: String = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                if i == head_index {
                    format!("[{cell:^width$}]")
                } else {
                    format!(" {cell:^width$} ")
                }
            })
            .collect();
        lines.push(row.trim_end().to_string());
    }

    lines.join("\n")
}

/// Writes the compiled table back out as a program, one rule per defined cell.
///
/// Wildcard rules come out expanded. The tape section is not included.
pub fn render_table(exe: &Executable) -> String {
    let machine = exe.machine();
    let (states, symbols) = (exe.states(), exe.symbols());
    let state_name = |code| states.resolve(code).unwrap_or(NULL_TOKEN);
    let symbol_name = |code| symbols.resolve(code).unwrap_or(NULL_TOKEN);

    let finals: Vec<&str> = states
        .iter()
        .filter(|&(code, _)| machine.is_final(code))
        .map(|(_, name)| name)
        .collect();

    let mut lines = vec![
        format!("[:] {}", state_name(1)),
        format!("[.] {}", finals.join(" ")).trim_end().to_string(),
    ];

    for (state, name) in states.iter() {
        for symbol in 0..machine.alphabet() {
            if let Some(transition) = machine.transition(state, symbol) {
                let direction = match transition.direction {
                    Direction::Left => "l",
                    Direction::Right => "r",
                };
                lines.push(format!(
                    "{} {} -> {} {} {}",
                    name,
                    symbol_name(symbol),
                    state_name(transition.next),
                    symbol_name(transition.write),
                    direction
                ));
            }
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tmsim::{compile, parse, Mode};

    fn executable(input: &str) -> Executable {
        compile(&parse(input).unwrap(), Mode::Normal).unwrap()
    }

    #[test]
    fn test_render_window() {
        let exe = executable("[:] A\n[.]\nA a -> A b r\n=-=-=\n-1: x a y\n");
        let output = render_tape(&exe, View::Window, false);
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "state: A  step: 0  head: 0");
        assert!(lines[1].contains(" x [a] y"), "{output}");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_render_all_with_frame() {
        let mut exe = executable("[:] A\n[.] H\nA a -> H b r\n=-=-=\n0: a c\n");
        exe.run();
        let output = render_tape(&exe, View::All, true);
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "state: H  step: 1  head: 1");
        assert_eq!(lines[1], "+---+---+");
        assert_eq!(lines[2], "| b | c |");
        assert_eq!(lines[3], lines[1]);
        assert_eq!(lines[4], "      ^");
    }

    #[test]
    fn test_render_all_on_blank_tape() {
        let mut exe = executable("[:] A\n[.]\n");
        exe.step();
        let output = render_tape(&exe, View::All, false);

        assert_eq!(output, "state: null  step: 1  head: 0\n[ ]");
    }

    #[test]
    fn test_render_table_expands_wildcards() {
        let exe = executable("[:] A\n[.] B\n* x -> B y r\nA _ -> _ _ l\n");
        let table = render_table(&exe);

        assert_eq!(
            table,
            "[:] A\n[.] B\nA null -> A null l\nA x -> A x l\nA y -> A y l\nB x -> B y r"
        );

        let recompiled = executable(&table);
        assert_eq!(render_table(&recompiled), table);
    }
}
