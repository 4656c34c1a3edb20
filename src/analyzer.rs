//! This module provides functions for analyzing programs to detect likely mistakes before
//! execution: a start state that halts at once, final states that cannot be entered,
//! states unreachable from the start, and tape symbols that no rule ever reads.
//!
//! None of these make a program invalid, so the findings are returned as warnings.

use crate::types::{Program, Rule, RuleToken, NULL_TOKEN};
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

/// Represents the issues that can be found during the analysis of a program.
#[derive(Debug, PartialEq, Eq, Clone, Error)]
pub enum AnalysisWarning {
    /// The start state has no applicable rule and is not final, so the machine halts
    /// in the undefined state right away.
    #[error("Start state '{0}' has no transitions and is not final")]
    StartStateHalts(String),
    /// Final states that no rule can enter.
    #[error("Final states never entered by any rule: {0:?}")]
    UnreachableFinalStates(Vec<String>),
    /// States mentioned in the rules that cannot be reached from the start state.
    #[error("States unreachable from the start state: {0:?}")]
    UnreachableStates(Vec<String>),
    /// Symbols on the initial tape that no rule reads.
    #[error("Tape symbols not read by any rule: {0:?}")]
    UnreadTapeSymbols(Vec<String>),
}

/// Analyzes a given `Program` and returns every warning found, in check order.
///
/// # Arguments
///
/// * `program` - A reference to the `Program` to be analyzed.
pub fn analyze(program: &Program) -> Vec<AnalysisWarning> {
    [
        check_start_state,
        check_final_states,
        check_unreachable_states,
        check_tape_symbols,
    ]
    .iter()
    .filter_map(|check| check(program))
    .collect()
}

/// Checks whether a rule can fire in `state`.
fn applies_to(rule: &Rule, state: &str) -> bool {
    match &rule.state_from {
        RuleToken::Wildcard => true,
        RuleToken::Named(name) => name == state,
        _ => false,
    }
}

/// Checks whether a rule moves the machine into `state`. Keep targets never change state.
fn can_enter(rule: &Rule, state: &str) -> bool {
    matches!(&rule.state_to, RuleToken::Named(name) if name == state)
}

fn check_start_state(program: &Program) -> Option<AnalysisWarning> {
    let start = &program.start;
    let is_final = program.finals.contains(start);
    let has_rule = program.rules.iter().any(|rule| applies_to(rule, start));

    (!is_final && !has_rule).then(|| AnalysisWarning::StartStateHalts(start.clone()))
}

/// Checks that every final state is either the start state or the target of some rule.
fn check_final_states(program: &Program) -> Option<AnalysisWarning> {
    let unreachable: Vec<String> = program
        .finals
        .iter()
        .filter(|&state| state != &program.start)
        .filter(|state| !program.rules.iter().any(|rule| can_enter(rule, state)))
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    (!unreachable.is_empty()).then_some(AnalysisWarning::UnreachableFinalStates(unreachable))
}

/// Walks the state graph from the start state.
///
/// Only named states are considered. Wildcard sources make a rule apply to every
/// state, and a keep target loops back to the state the rule fired in.
fn check_unreachable_states(program: &Program) -> Option<AnalysisWarning> {
    let all: BTreeSet<&str> = program
        .rules
        .iter()
        .flat_map(|rule| [&rule.state_from, &rule.state_to])
        .filter_map(RuleToken::name)
        .filter(|&name| name != NULL_TOKEN)
        .collect();

    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack = vec![program.start.as_str()];

    while let Some(state) = stack.pop() {
        if !visited.insert(state) || program.finals.iter().any(|f| f == state) {
            continue;
        }

        for rule in program.rules.iter().filter(|rule| applies_to(rule, state)) {
            match &rule.state_to {
                RuleToken::Named(next) if next != NULL_TOKEN => stack.push(next.as_str()),
                _ => {}
            }
        }
    }

    let unreachable: Vec<String> = all
        .into_iter()
        .filter(|state| !visited.contains(state))
        .map(String::from)
        .collect();

    (!unreachable.is_empty()).then_some(AnalysisWarning::UnreachableStates(unreachable))
}

/// Checks that every symbol on the initial tape is read by some rule.
fn check_tape_symbols(program: &Program) -> Option<AnalysisWarning> {
    let mut read = HashSet::new();
    for rule in &program.rules {
        match &rule.symbol_from {
            RuleToken::Wildcard => return None,
            RuleToken::Named(name) => {
                read.insert(name.as_str());
            }
            _ => {}
        }
    }

    let unread: Vec<String> = program
        .tape
        .iter()
        .flat_map(|entry| &entry.symbols)
        .map(String::as_str)
        .filter(|&symbol| symbol != NULL_TOKEN && !read.contains(symbol))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(String::from)
        .collect();

    (!unread.is_empty()).then_some(AnalysisWarning::UnreadTapeSymbols(unread))
}
