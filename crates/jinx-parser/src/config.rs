//! Parser configuration.

use std::collections::HashSet;

/// Tests that take a right-hand argument (`x is divisibleby 3`).
const TESTS_NEEDING_RIGHT_SIDE: &[&str] = &[
    "divisibleby",
    "eq",
    "equalto",
    "ne",
    "ge",
    "gt",
    "greaterthan",
    "le",
    "lt",
    "lessthan",
    "sameas",
    "in",
    "==",
    "!=",
    ">",
    ">=",
    "<",
    "<=",
];

/// Grammar knobs that depend on the host's test library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    /// Names of tests whose suffix form takes exactly one argument.
    pub tests_needing_right_side: HashSet<String>,
}

impl ParserConfig {
    /// Register a test that takes a right-hand argument.
    pub fn with_right_side_test(mut self, name: impl Into<String>) -> Self {
        self.tests_needing_right_side.insert(name.into());
        self
    }

    pub fn needs_right_side(&self, test: &str) -> bool {
        self.tests_needing_right_side.contains(test)
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            tests_needing_right_side: TESTS_NEEDING_RIGHT_SIDE
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}
