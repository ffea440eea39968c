//! Rules: one expression bound to up to two action lists.

use serde::{Deserialize, Serialize};

use super::{ExprId, ListId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    pub expression: ExprId,
    /// List executed when the expression is true.
    #[serde(default)]
    pub true_list: Option<ListId>,
    /// List executed when the expression is false.
    #[serde(default)]
    pub false_list: Option<ListId>,
    /// Evaluated only from a `NestedRule` item, never by arbitration or
    /// the main function.
    #[serde(default)]
    pub nested_only: bool,
}

impl RuleSpec {
    pub fn branch(&self, result: bool) -> Option<ListId> {
        if result { self.true_list } else { self.false_list }
    }
}

/// Rule with its derived scheduling class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRule {
    pub spec: RuleSpec,
    /// Evaluated by every main-function cycle.
    pub deferred: bool,
}
