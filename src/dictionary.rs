//! Bidirectional mapping between textual tokens and dense integer codes.
//!
//! One dictionary is kept for states and one for alphabet symbols. Codes start at 1 and
//! are handed out in first-registration order; code 0 is reserved and is spelled `null`.

use std::collections::HashMap;

use crate::types::NULL_TOKEN;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    tokens: Vec<String>,
    codes: HashMap<String, usize>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `token` if it is new and returns its code.
    ///
    /// `null` is never registered and always yields 0.
    pub fn put(&mut self, token: &str) -> usize {
        if token == NULL_TOKEN {
            return 0;
        }

        if let Some(&code) = self.codes.get(token) {
            return code;
        }

        self.tokens.push(token.to_string());
        let code = self.tokens.len();
        self.codes.insert(token.to_string(), code);
        code
    }

    /// Returns the code of `token`, or 0 if it is `null` or unknown.
    pub fn get(&self, token: &str) -> usize {
        self.lookup(token).unwrap_or(0)
    }

    /// Like [`Dictionary::get`], but distinguishes unknown tokens (`None`) from `null`.
    pub fn lookup(&self, token: &str) -> Option<usize> {
        if token == NULL_TOKEN {
            return Some(0);
        }

        self.codes.get(token).copied()
    }

    /// Returns the token registered under `code`, if any. Code 0 has no token.
    pub fn resolve(&self, code: usize) -> Option<&str> {
        code.checked_sub(1)
            .and_then(|index| self.tokens.get(index))
            .map(String::as_str)
    }

    /// Concatenates the tokens of `codes`. Unregistered codes contribute nothing.
    pub fn stringify(&self, codes: &[usize]) -> String {
        codes
            .iter()
            .filter_map(|&code| self.resolve(code))
            .collect()
    }

    /// Number of registered tokens; the largest valid code.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Iterates over `(code, token)` pairs in code order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.tokens
            .iter()
            .enumerate()
            .map(|(index, token)| (index + 1, token.as_str()))
    }
}
