//! Logical expressions over port modes.
//!
//! ```text
//!   Or ─┬─ Mode(port 0 == FULL_COM)
//!       └─ And ─┬─ Not(Mode(port 1 == 0))
//!               └─ Ref(#3)
//! ```
//!
//! An expression is only evaluated once every port it (transitively)
//! references has been defined; the engine checks that readiness against
//! the precomputed [`CompiledExpr::ports`] set before calling
//! [`Expr::eval`].
//!
//! Compilation bounds the evaluation depth (tree levels plus the levels of
//! every `Ref` target) by [`MAX_EXPRESSION_DEPTH`], so evaluation recursion
//! is bounded by configuration.

use serde::{Deserialize, Serialize};

use super::{ExprId, MAX_EXPRESSION_DEPTH, PortId};
use crate::error::ConfigError;

/// Comparison applied to a single port mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Equals(u32),
    NotEquals(u32),
    OneOf(Vec<u32>),
}

impl Comparison {
    pub fn matches(&self, mode: u32) -> bool {
        match self {
            Self::Equals(v) => mode == *v,
            Self::NotEquals(v) => mode != *v,
            Self::OneOf(set) => set.contains(&mode),
        }
    }
}

/// Condition tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Mode { port: PortId, op: Comparison },
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    /// True when an odd number of operands are true.
    Xor(Vec<Expr>),
    /// Another configured expression.
    Ref(ExprId),
}

impl Expr {
    pub fn mode_equals(port: u16, mode: u32) -> Self {
        Self::Mode {
            port: PortId(port),
            op: Comparison::Equals(mode),
        }
    }

    /// Evaluate against port modes.  All referenced ports must be defined;
    /// `Ref` targets are looked up in `table`.
    pub fn eval(&self, table: &[CompiledExpr], modes: &[u32]) -> bool {
        match self {
            Self::Mode { port, op } => op.matches(modes[port.index()]),
            Self::Not(inner) => !inner.eval(table, modes),
            Self::And(ops) => ops.iter().all(|e| e.eval(table, modes)),
            Self::Or(ops) => ops.iter().any(|e| e.eval(table, modes)),
            Self::Xor(ops) => ops.iter().filter(|e| e.eval(table, modes)).count() % 2 == 1,
            Self::Ref(id) => table[id.index()].expr.eval(table, modes),
        }
    }

    /// `level` is the tree depth of `self` within expression `id`.
    fn check(
        &self,
        id: u16,
        level: usize,
        port_count: usize,
        expr_count: usize,
    ) -> Result<(), ConfigError> {
        if level > MAX_EXPRESSION_DEPTH {
            return Err(ConfigError::ExpressionTooDeep(id));
        }
        match self {
            Self::Mode { port, .. } => {
                if port.index() >= port_count {
                    return Err(ConfigError::UnknownPort(port.0));
                }
            }
            Self::Not(inner) => inner.check(id, level + 1, port_count, expr_count)?,
            Self::And(ops) | Self::Or(ops) | Self::Xor(ops) => {
                if ops.is_empty() {
                    return Err(ConfigError::Invalid("empty expression operand list"));
                }
                for e in ops {
                    e.check(id, level + 1, port_count, expr_count)?;
                }
            }
            Self::Ref(r) => {
                if r.index() >= expr_count {
                    return Err(ConfigError::UnknownExpression(r.0));
                }
            }
        }
        Ok(())
    }

    /// Evaluation depth, given the depth of every `Ref` target.
    fn depth(&self, resolved: &[usize]) -> usize {
        match self {
            Self::Mode { .. } => 1,
            Self::Not(inner) => 1 + inner.depth(resolved),
            Self::And(ops) | Self::Or(ops) | Self::Xor(ops) => {
                1 + ops.iter().map(|e| e.depth(resolved)).max().unwrap_or(0)
            }
            Self::Ref(r) => 1 + resolved[r.index()],
        }
    }

    fn direct_refs(&self, out: &mut Vec<ExprId>) {
        match self {
            Self::Mode { .. } => {}
            Self::Not(inner) => inner.direct_refs(out),
            Self::And(ops) | Self::Or(ops) | Self::Xor(ops) => {
                for e in ops {
                    e.direct_refs(out);
                }
            }
            Self::Ref(id) => out.push(*id),
        }
    }

    fn direct_ports(&self, out: &mut Vec<PortId>) {
        match self {
            Self::Mode { port, .. } => out.push(*port),
            Self::Not(inner) => inner.direct_ports(out),
            Self::And(ops) | Self::Or(ops) | Self::Xor(ops) => {
                for e in ops {
                    e.direct_ports(out);
                }
            }
            Self::Ref(_) => {}
        }
    }
}

/// Expression with its transitive port set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledExpr {
    pub expr: Expr,
    /// Every port reachable through the tree and its `Ref`s, ascending.
    pub ports: Vec<PortId>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Validate references, reject `Ref` cycles and resolve transitive ports.
pub(super) fn compile(
    exprs: &[Expr],
    port_count: usize,
) -> Result<Vec<CompiledExpr>, ConfigError> {
    if exprs.len() > usize::from(u16::MAX) {
        return Err(ConfigError::TableTooLarge("expression"));
    }
    for (idx, e) in exprs.iter().enumerate() {
        e.check(idx as u16, 1, port_count, exprs.len())?;
    }

    let mut depths = vec![0; exprs.len()];
    let mut ports: Vec<Vec<PortId>> = vec![Vec::new(); exprs.len()];
    let mut refs = Vec::new();
    for idx in ref_order(exprs)? {
        let depth = exprs[idx].depth(&depths);
        if depth > MAX_EXPRESSION_DEPTH {
            return Err(ConfigError::ExpressionTooDeep(idx as u16));
        }
        depths[idx] = depth;

        let mut set = Vec::new();
        exprs[idx].direct_ports(&mut set);
        refs.clear();
        exprs[idx].direct_refs(&mut refs);
        for r in &refs {
            set.extend_from_slice(&ports[r.index()]);
        }
        set.sort_unstable();
        set.dedup();
        ports[idx] = set;
    }

    Ok(exprs
        .iter()
        .cloned()
        .zip(ports)
        .map(|(expr, ports)| CompiledExpr { expr, ports })
        .collect())
}

/// Every expression after the targets of its `Ref`s.  Depth-first over an
/// explicit stack; a `Ref` to an expression still in progress is a cycle.
fn ref_order(exprs: &[Expr]) -> Result<Vec<usize>, ConfigError> {
    let mut marks = vec![Mark::Unvisited; exprs.len()];
    let mut order = Vec::with_capacity(exprs.len());
    let mut stack = Vec::new();
    let mut refs = Vec::new();
    for root in 0..exprs.len() {
        stack.push(root);
        while let Some(&idx) = stack.last() {
            match marks[idx] {
                Mark::Unvisited => {
                    marks[idx] = Mark::InProgress;
                    refs.clear();
                    exprs[idx].direct_refs(&mut refs);
                    for r in &refs {
                        match marks[r.index()] {
                            Mark::InProgress => return Err(ConfigError::ExpressionCycle(r.0)),
                            Mark::Unvisited => stack.push(r.index()),
                            Mark::Done => {}
                        }
                    }
                }
                Mark::InProgress => {
                    marks[idx] = Mark::Done;
                    order.push(idx);
                    stack.pop();
                }
                Mark::Done => {
                    stack.pop();
                }
            }
        }
    }
    Ok(order)
}
