//! Expression and rule evaluation.
//!
//! Both run inside the engine's critical section; they touch only the
//! expression / rule / list flags of the run-time context.

use crate::topology::{CompiledTopology, ExprId, ListExecution, ListId, RuleId};

use super::context::RunTimeContext;

/// Result of a logical expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tristate {
    True,
    False,
    /// At least one referenced port has never been reported.
    Undefined,
}

impl From<bool> for Tristate {
    fn from(b: bool) -> Self {
        if b { Self::True } else { Self::False }
    }
}

/// Evaluate an expression.  Once every referenced port is defined the
/// expression stays initialized for the lifetime of the context.
pub(crate) fn evaluate_expr(
    topology: &CompiledTopology,
    ctx: &mut RunTimeContext,
    id: ExprId,
) -> Tristate {
    let idx = id.index();
    let compiled = topology.expr(id);
    if !ctx.expr_initialized[idx] {
        if !compiled.ports.iter().all(|p| ctx.defined[p.index()]) {
            return Tristate::Undefined;
        }
        ctx.expr_initialized[idx] = true;
    }
    let result = compiled.expr.eval(topology.exprs(), &ctx.modes);
    ctx.expr_result[idx] = result;
    result.into()
}

/// Evaluate a rule and decide whether its bound list must run.
///
/// A `Trigger` list fires the first time its branch is taken and then only
/// when the rule result changed; a `Condition` list fires on every
/// determined evaluation.  The rule result is updated whenever the
/// expression is determined, even if the branch carries no list.
pub(crate) fn evaluate_rule(
    topology: &CompiledTopology,
    ctx: &mut RunTimeContext,
    id: RuleId,
) -> Option<ListId> {
    let rule = topology.rule(id);
    let result = match evaluate_expr(topology, ctx, rule.spec.expression) {
        Tristate::True => true,
        Tristate::False => false,
        Tristate::Undefined => return None,
    };

    let previous = ctx.rule_results[id.index()].replace(result);
    let list = rule.spec.branch(result)?;

    match topology.list(list).execution {
        ListExecution::Condition => Some(list),
        ListExecution::Trigger => {
            let triggered = &mut ctx.list_triggered[list.index()];
            if !*triggered || previous != Some(result) {
                *triggered = true;
                Some(list)
            } else {
                None
            }
        }
    }
}

/// Action lists activated during one arbitration step, deduplicated and
/// executed in ascending list order.
#[derive(Debug, Clone)]
pub(crate) struct ActivatedLists {
    flags: Vec<bool>,
    any: bool,
}

impl ActivatedLists {
    pub fn new(list_count: usize) -> Self {
        Self {
            flags: vec![false; list_count],
            any: false,
        }
    }

    pub fn insert(&mut self, list: ListId) {
        self.flags[list.index()] = true;
        self.any = true;
    }

    pub fn is_empty(&self) -> bool {
        !self.any
    }

    pub fn iter(&self) -> impl Iterator<Item = ListId> + '_ {
        self.flags
            .iter()
            .enumerate()
            .filter(|(_, on)| **on)
            .map(|(i, _)| ListId(i as u16))
    }
}
