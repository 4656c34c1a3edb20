//! This module provides the parser for machine description files, utilizing the `pest` crate.
//! It defines the grammar in `grammar.pest` and turns the parse tree into a symbolic
//! [`Program`], rejecting reserved-name misuse and illegal wildcard pairings on the way.

use crate::types::{
    Direction, Extent, MachineError, Program, Rule as TransitionRule, RuleToken, TapeEntry,
    ANY_TOKEN, INVALID_TOKEN, KEEP_TOKEN, NULL_TOKEN,
};
use pest::{
    error::{Error, ErrorVariant},
    iterators::{Pair, Pairs},
    Parser as PestParser, Span,
};
use pest_derive::Parser as PestParser;
use tracing::debug;

/// Characters allowed in names besides ASCII letters and digits.
const NAME_PUNCTUATION: &str = "-_.~+^<>[]{}()";

const OUT_OF_RANGE: &str = "Position out of range";

/// Derives a `PestParser` for the machine grammar defined in `grammar.pest`.
#[derive(PestParser)]
#[grammar = "grammar.pest"]
pub struct MachineParser;

/// Parses a complete machine description: header, rules and optional tape section.
///
/// # Arguments
///
/// * `input` - The program text.
///
/// # Returns
///
/// * `Ok(Program)` if the input is well-formed.
/// * `Err(MachineError::ParseError)` pointing at the offending line otherwise.
pub fn parse(input: &str) -> Result<Program, MachineError> {
    let root = MachineParser::parse(Rule::program, input)
        .map_err(|e| MachineError::ParseError(Box::new(e)))?
        .next()
        .ok_or_else(|| MachineError::ValidationError("Empty program".to_string()))?;

    let program = parse_program(root)?;

    debug!(
        start = %program.start,
        finals = program.finals.len(),
        rules = program.rules.len(),
        tape_entries = program.tape.len(),
        "program parsed"
    );

    Ok(program)
}

/// Parses a tape-only document: a list of tape entries without header or rules.
pub fn parse_tape(input: &str) -> Result<Vec<TapeEntry>, MachineError> {
    let root = MachineParser::parse(Rule::tape, input)
        .map_err(|e| MachineError::ParseError(Box::new(e)))?
        .next()
        .ok_or_else(|| MachineError::ValidationError("Empty tape description".to_string()))?;

    let mut entries = Vec::new();
    for pair in root.into_inner() {
        if pair.as_rule() == Rule::entry {
            entries.extend(parse_entry(pair)?);
        }
    }

    Ok(entries)
}

/// Walks the top-level pairs of a `program`.
fn parse_program(pair: Pair<Rule>) -> Result<Program, MachineError> {
    let mut program = Program::default();

    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::start => {
                let token = next_pair(&mut p.into_inner(), "start state")?;
                program.start = parse_declared_state(token, "the starting one")?;
            }
            Rule::finals => {
                for token in p.into_inner() {
                    program.finals.push(parse_declared_state(token, "final")?);
                }
            }
            Rule::rule => program.rules.push(parse_rule(p)?),
            Rule::entry => program.tape.extend(parse_entry(p)?),
            _ => {} // EOI
        }
    }

    Ok(program)
}

/// Parses a start or final state name, which must be a concrete state.
fn parse_declared_state(pair: Pair<Rule>, role: &str) -> Result<String, MachineError> {
    let span = pair.as_span();
    let name = parse_name(pair)?;

    match name.as_str() {
        NULL_TOKEN => Err(parse_error(
            &format!("Undefined state cannot be {role}"),
            span,
        )),
        ANY_TOKEN | KEEP_TOKEN => Err(parse_error(
            &format!("Wildcard state cannot be {role}"),
            span,
        )),
        _ => Ok(name),
    }
}

/// Parses a transition rule line.
///
/// Pairings of `*` and `_` are restricted:
/// - `*` in a source slot needs a concrete target (`* a -> s b`);
/// - `_` in a source slot needs `_` in the matching target (`_ a -> _ b`);
/// - `*` never appears in a target slot, and `null` never in the source state.
fn parse_rule(pair: Pair<Rule>) -> Result<TransitionRule, MachineError> {
    let span = pair.as_span();
    let mut pairs = pair.into_inner();

    let state_from = parse_name(next_pair(&mut pairs, "source state")?)?;
    let symbol_from = parse_name(next_pair(&mut pairs, "source symbol")?)?;
    let state_to = parse_name(next_pair(&mut pairs, "target state")?)?;
    let symbol_to = parse_name(next_pair(&mut pairs, "target symbol")?)?;
    let direction = parse_direction(next_pair(&mut pairs, "direction")?)?;

    if state_from == NULL_TOKEN {
        return Err(parse_error(
            "Illegal rule: transitions from the undefined state cannot be defined",
            span,
        ));
    }

    for (from, to, what) in [
        (&state_from, &state_to, "state"),
        (&symbol_from, &symbol_to, "symbol"),
    ] {
        check_pairing(from, to, what, span)?;
    }

    Ok(TransitionRule {
        state_from: source_token(state_from),
        symbol_from: source_token(symbol_from),
        state_to: target_token(state_to),
        symbol_to: target_token(symbol_to),
        direction,
    })
}

/// Checks one `from -> to` pairing of a rule.
fn check_pairing(from: &str, to: &str, what: &str, span: Span) -> Result<(), MachineError> {
    let message = match (from, to) {
        (_, ANY_TOKEN) => format!("Illegal rule: target {what} cannot be '*'"),
        (ANY_TOKEN, KEEP_TOKEN) => {
            format!("Illegal rule: '* -> _' is not allowed for a {what}, use '_ -> _'")
        }
        (KEEP_TOKEN, to) if to != KEEP_TOKEN => {
            format!("Illegal rule: source {what} '_' requires target '_'")
        }
        _ => return Ok(()),
    };

    Err(parse_error(&message, span))
}

fn source_token(name: String) -> RuleToken {
    match name.as_str() {
        ANY_TOKEN | KEEP_TOKEN => RuleToken::Wildcard,
        NULL_TOKEN => RuleToken::Undefined,
        _ => RuleToken::Named(name),
    }
}

fn target_token(name: String) -> RuleToken {
    match name.as_str() {
        KEEP_TOKEN => RuleToken::Keep,
        NULL_TOKEN => RuleToken::Undefined,
        _ => RuleToken::Named(name),
    }
}

/// Parses a single direction from a `Pair<Rule::direction>`.
///
/// Supports 'l' or '<' for Left and 'r' or '>' for Right.
fn parse_direction(pair: Pair<Rule>) -> Result<Direction, MachineError> {
    let span = pair.as_span();
    match pair.as_str() {
        "l" | "<" => Ok(Direction::Left),
        "r" | ">" => Ok(Direction::Right),
        other => Err(parse_error(
            &format!("Unsupported direction: {other} (expected one of l, <, r, >)"),
            span,
        )),
    }
}

/// Parses a tape entry. Empty placements (`pos:`) yield `None`.
fn parse_entry(pair: Pair<Rule>) -> Result<Option<TapeEntry>, MachineError> {
    let span = pair.as_span();
    let mut pairs = pair.into_inner();
    let head = next_pair(&mut pairs, "tape position")?;

    let symbols = pairs
        .map(parse_tape_symbol)
        .collect::<Result<Vec<_>, _>>()?;

    match head.as_rule() {
        Rule::position => {
            let pos = parse_integer(next_pair(&mut head.into_inner(), "position")?)?;
            if symbols.is_empty() {
                return Ok(None);
            }

            let end = pos
                .checked_add(symbols.len() as i64 - 1)
                .ok_or_else(|| parse_error(OUT_OF_RANGE, span))?;
            check_bounds(Some(pos), Some(end), span)?;
            Ok(TapeEntry::placement(pos, symbols))
        }
        _ => {
            let mut bounds = head.into_inner();
            let start = parse_bound(next_pair(&mut bounds, "range start")?)?;
            let end = parse_bound(next_pair(&mut bounds, "range end")?)?;

            let extent = match (start, end) {
                (Some(start), Some(end)) if end < start => {
                    return Err(parse_error(
                        "Starting index cannot be larger than ending one",
                        span,
                    ))
                }
                (None, None) => {
                    return Err(parse_error(
                        "Only one side of a tape entry may be infinite",
                        span,
                    ))
                }
                (start, end) => {
                    check_bounds(start, end, span)?;
                    Extent::from_bounds(start, end)
                }
            };

            let entry = extent.and_then(|extent| TapeEntry::pattern(extent, symbols));
            entry
                .map(Some)
                .ok_or_else(|| parse_error("Empty patterns are not allowed", span))
        }
    }
}

/// Every finite bound needs a neighbour on both sides, where older entries get cut.
fn check_bounds(start: Option<i64>, end: Option<i64>, span: Span) -> Result<(), MachineError> {
    let has_neighbours = |bound: Option<i64>| {
        bound.map_or(true, |b| b.checked_sub(1).and(b.checked_add(1)).is_some())
    };

    if has_neighbours(start) && has_neighbours(end) {
        Ok(())
    } else {
        Err(parse_error(OUT_OF_RANGE, span))
    }
}

/// Parses a range bound; `inf` yields `None`.
fn parse_bound(pair: Pair<Rule>) -> Result<Option<i64>, MachineError> {
    match pair.as_rule() {
        Rule::infinity => Ok(None),
        _ => parse_integer(pair).map(Some),
    }
}

fn parse_integer(pair: Pair<Rule>) -> Result<i64, MachineError> {
    pair.as_str()
        .parse::<i64>()
        .map_err(|e| parse_error(&format!("Invalid position: {e}"), pair.as_span()))
}

/// Parses a symbol written on the tape. Wildcards have no meaning there.
fn parse_tape_symbol(pair: Pair<Rule>) -> Result<String, MachineError> {
    let span = pair.as_span();
    let name = parse_name(pair)?;

    if name == ANY_TOKEN || name == KEEP_TOKEN {
        return Err(parse_error(
            &format!("Wildcard '{name}' cannot be placed on the tape"),
            span,
        ));
    }

    Ok(name)
}

/// Extracts a name and checks it against the allowed charset.
fn parse_name(pair: Pair<Rule>) -> Result<String, MachineError> {
    let name = pair.as_str();
    if !is_valid_name(name) {
        return Err(parse_error(
            &format!(
                "This name is invalid: {name}. A correct name uses only characters \
                 from [A-Za-z0-9{NAME_PUNCTUATION}] and is not {INVALID_TOKEN}"
            ),
            pair.as_span(),
        ));
    }

    Ok(name.to_string())
}

/// Checks whether a name uses only letters, digits and whitelisted punctuation.
pub fn is_valid_name(name: &str) -> bool {
    if matches!(name, ANY_TOKEN | KEEP_TOKEN | NULL_TOKEN) {
        return true;
    }

    name != INVALID_TOKEN
        && !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || NAME_PUNCTUATION.contains(c))
}

/// Takes the next pair of a node whose shape the grammar guarantees.
fn next_pair<'i>(pairs: &mut Pairs<'i, Rule>, what: &str) -> Result<Pair<'i, Rule>, MachineError> {
    pairs
        .next()
        .ok_or_else(|| MachineError::ValidationError(format!("Missing {what}")))
}

/// Creates a `MachineError::ParseError` from a message and a `Span`.
fn parse_error(msg: &str, span: Span) -> MachineError {
    MachineError::ParseError(Box::new(Error::new_from_span(
        ErrorVariant::CustomError {
            message: msg.to_string(),
        },
        span,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> RuleToken {
        RuleToken::Named(name.to_string())
    }

    fn assert_parse_error(input: &str, expected: &str) {
        let error = parse(input).unwrap_err();
        assert!(matches!(error, MachineError::ParseError(_)));
        assert!(
            error.to_string().contains(expected),
            "expected '{expected}' in: {error}"
        );
    }

    #[test]
    fn test_parse_simple_program() {
        let input = r#"
[:] q0
[.] halt
q0 a -> q1 b r
q1 null -> halt a <
"#;

        let program = parse(input).unwrap();
        assert_eq!(program.start, "q0");
        assert_eq!(program.finals, vec!["halt"]);
        assert_eq!(program.rules.len(), 2);
        assert_eq!(
            program.rules[0],
            TransitionRule {
                state_from: named("q0"),
                symbol_from: named("a"),
                state_to: named("q1"),
                symbol_to: named("b"),
                direction: Direction::Right,
            }
        );
        assert_eq!(program.rules[1].symbol_from, RuleToken::Undefined);
        assert_eq!(program.rules[1].direction, Direction::Left);
        assert!(program.tape.is_empty());
    }

    #[test]
    fn test_parse_wildcards_and_keep() {
        let input = "[:] s\n[.]\n* a -> t b >\n_ _ -> _ _ l\ns * -> _ c r\n";

        let program = parse(input).unwrap();
        assert!(program.finals.is_empty());
        assert_eq!(program.rules[0].state_from, RuleToken::Wildcard);
        assert_eq!(program.rules[1].state_from, RuleToken::Wildcard);
        assert_eq!(program.rules[1].state_to, RuleToken::Keep);
        assert_eq!(program.rules[1].symbol_to, RuleToken::Keep);
        assert_eq!(program.rules[2].symbol_from, RuleToken::Wildcard);
        assert_eq!(program.rules[2].state_to, RuleToken::Keep);
    }

    #[test]
    fn test_parse_comments_and_blank_lines() {
        let input = r#"
// a comment before the header
   [:] A

[.] B C   // trailing comment
// between rules
A x -> B y r

=-=-=
// tape comment
0: x x
"#;

        let program = parse(input).unwrap();
        assert_eq!(program.finals, vec!["B", "C"]);
        assert_eq!(program.rules.len(), 1);
        assert_eq!(program.tape.len(), 1);
    }

    #[test]
    fn test_parse_tape_entries() {
        let input = r#"
[:] A
[.]
A a -> A a r
=-=-=
0: a b c
-3~4: x
5~inf: y z
inf~-10: w
+2: null
7:
"#;

        let program = parse(input).unwrap();
        let extents: Vec<Extent> = program.tape.iter().map(|e| e.extent).collect();
        assert_eq!(
            extents,
            vec![
                Extent::Finite { start: 0, end: 2 },
                Extent::Finite { start: -3, end: 4 },
                Extent::RightInfinite { start: 5 },
                Extent::LeftInfinite { end: -10 },
                Extent::Finite { start: 2, end: 2 },
            ]
        );
        assert_eq!(program.tape[2].symbols, vec!["y", "z"]);
        assert_eq!(program.tape[4].symbols, vec!["null"]);
    }

    #[test]
    fn test_parse_tape_only_document() {
        let entries = parse_tape("\n0~inf: a\n\n-1: b c\n").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].extent, Extent::Finite { start: -1, end: 0 });

        assert!(parse_tape("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_missing_final_line() {
        let result = parse("[:] A\nA a -> A a r\n");
        assert!(matches!(result, Err(MachineError::ParseError(_))));
    }

    #[test]
    fn test_parse_malformed_rule() {
        let result = parse("[:] A\n[.]\nA a -> A r\n");
        assert!(matches!(result, Err(MachineError::ParseError(_))));

        let result = parse("[:] A\n[.]\nA a => A a r\n");
        assert!(matches!(result, Err(MachineError::ParseError(_))));
    }

    #[test]
    fn test_parse_unsupported_direction() {
        assert_parse_error("[:] A\n[.]\nA a -> A a x\n", "Unsupported direction: x");
    }

    #[test]
    fn test_parse_invalid_names() {
        assert_parse_error("[:] A\n[.]\nA a@ -> A a r\n", "This name is invalid: a@");
        assert_parse_error("[:] (null)\n[.]\n", "This name is invalid: (null)");
        assert_parse_error("[:] A\n[.]\n=-=-=\n0: a (null)\n", "This name is invalid");
    }

    #[test]
    fn test_parse_reserved_declared_states() {
        assert_parse_error("[:] null\n[.]\n", "Undefined state cannot be the starting one");
        assert_parse_error("[:] *\n[.]\n", "Wildcard state cannot be the starting one");
        assert_parse_error("[:] A\n[.] B null\n", "Undefined state cannot be final");
        assert_parse_error("[:] A\n[.] _\n", "Wildcard state cannot be final");
    }

    #[test]
    fn test_parse_illegal_pairings() {
        assert_parse_error("[:] A\n[.]\nnull a -> A a r\n", "undefined state");
        assert_parse_error("[:] A\n[.]\nA a -> * a r\n", "target state cannot be '*'");
        assert_parse_error("[:] A\n[.]\nA a -> A * r\n", "target symbol cannot be '*'");
        assert_parse_error("[:] A\n[.]\n* a -> _ a r\n", "'* -> _' is not allowed");
        assert_parse_error("[:] A\n[.]\nA * -> A _ r\n", "'* -> _' is not allowed");
        assert_parse_error("[:] A\n[.]\n_ a -> A a r\n", "source state '_' requires");
        assert_parse_error("[:] A\n[.]\nA _ -> A b r\n", "source symbol '_' requires");
    }

    #[test]
    fn test_parse_error_reports_source_line() {
        let error = parse("[:] A\n[.]\nA a -> A a r\nA b -> * a r\n").unwrap_err();
        let message = error.to_string();

        assert!(message.contains("4:1"), "{message}");
        assert!(message.contains("A b -> * a r"), "{message}");
    }

    #[test]
    fn test_parse_bad_tape_entries() {
        let header = "[:] A\n[.]\n=-=-=\n";
        assert_parse_error(&format!("{header}5~2: a\n"), "Starting index cannot be larger");
        assert_parse_error(&format!("{header}inf~inf: a\n"), "Only one side");
        assert_parse_error(&format!("{header}0~inf:\n"), "Empty patterns are not allowed");
        assert_parse_error(&format!("{header}0: a *\n"), "cannot be placed on the tape");

        let result = parse(&format!("{header}inf: a\n"));
        assert!(matches!(result, Err(MachineError::ParseError(_))));
        let result = parse(&format!("{header}99999999999999999999: a\n"));
        assert!(matches!(result, Err(MachineError::ParseError(_))));
    }

    #[test]
    fn test_parse_positions_at_integer_limits() {
        let header = "[:] A\n[.]\n=-=-=\n";
        assert_parse_error(&format!("{header}inf~9223372036854775807: x\n"), OUT_OF_RANGE);
        assert_parse_error(&format!("{header}9223372036854775807: a b\n"), OUT_OF_RANGE);
        assert_parse_error(&format!("{header}9223372036854775806: a b\n"), OUT_OF_RANGE);
        assert_parse_error(&format!("{header}-9223372036854775808~0: a\n"), OUT_OF_RANGE);
        assert_parse_error(&format!("{header}-9223372036854775808: a\n"), OUT_OF_RANGE);

        let program = parse(&format!(
            "{header}inf~9223372036854775806: x y\n-9223372036854775807~inf: z\n"
        ))
        .unwrap();
        let exe = crate::compiler::compile(&program, crate::types::Mode::Normal).unwrap();
        assert_eq!(exe.symbol_at(0), Some("z"));
        assert_eq!(exe.symbol_at(-i64::MAX), Some("z"));
        assert_eq!(exe.symbol_at(i64::MIN), Some("y"));
    }

    #[test]
    fn test_is_valid_name() {
        assert!(is_valid_name("q_0.~+^<>[]{}()-"));
        assert!(is_valid_name("null"));
        assert!(is_valid_name("*"));
        assert!(!is_valid_name("(null)"));
        assert!(!is_valid_name("a,b"));
        assert!(!is_valid_name("é"));
        assert!(!is_valid_name(""));
    }
}
