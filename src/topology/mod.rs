//! Static configuration tables and their compilation.
//!
//! ```text
//!   JSON / postcard blob ──▶ Topology (serde) ──compile()──▶ CompiledTopology
//!                                                            │
//!        ports ─┬─ sorted static keys (binary search)        │ immutable,
//!               └─ generic table (linear search)             │ shared by every
//!        rules ─── per-port dependency ranges                │ engine instance
//!        lists ─── flat item table + [head, tail) segments   │
//!        actions ─ dispatch table with resolved group masks  ▼
//! ```
//!
//! Everything that could make the interpreter fail at run time (dangling
//! indices, nesting cycles, trees deeper than the interpreter stack) is
//! rejected here.

pub mod action;
pub mod expr;
pub mod port;
pub mod rule;

use core::fmt;

use serde::{Deserialize, Serialize};

pub use action::{Action, ActionListSpec, ActionSpec, CompiledList, Item, ListExecution, TimerOp};
pub use expr::{CompiledExpr, Comparison, Expr};
pub use port::{PortKey, PortSpec, RequestProcessing, TimerSpec};
pub use rule::{CompiledRule, RuleSpec};

use crate::error::ConfigError;
use crate::groups::MAX_IPDU_GROUPS;
use crate::modes::SourceKind;

/// Depth of the interpreter stack; the deepest allowed list nesting.
pub const MAX_NESTING_DEPTH: usize = 8;

/// Deepest allowed expression evaluation, counting tree levels and `Ref`
/// hops.
pub const MAX_EXPRESSION_DEPTH: usize = 32;

// ---------------------------------------------------------------------------
// Table indices
// ---------------------------------------------------------------------------

macro_rules! table_index {
    ($($(#[$meta:meta])* $name:ident),+ $(,)?) => {$(
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u16);

        impl $name {
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "#{}", self.0)
            }
        }
    )+};
}

table_index! {
    /// Index into the port table.
    PortId,
    ExprId,
    RuleId,
    /// Index into the action-list table.
    ListId,
    ActionId,
    TimerId,
    /// Fault-memory event reported per action item.
    FaultId,
}

// ---------------------------------------------------------------------------
// Source configuration
// ---------------------------------------------------------------------------

/// Complete static configuration of one mode manager.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    /// Number of PDU groups addressable by group-control actions.
    #[serde(default)]
    pub ipdu_group_count: u16,
    pub ports: Vec<PortSpec>,
    #[serde(default)]
    pub expressions: Vec<Expr>,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
    #[serde(default)]
    pub action_lists: Vec<ActionListSpec>,
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
    #[serde(default)]
    pub timers: Vec<TimerSpec>,
}

impl Topology {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Compact binary form of the configuration.
    pub fn to_blob(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_blob(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }

    /// Validate every cross-reference and build the run-time tables.
    pub fn compile(&self) -> Result<CompiledTopology, ConfigError> {
        if usize::from(self.ipdu_group_count) > MAX_IPDU_GROUPS {
            return Err(ConfigError::Invalid("ipdu_group_count"));
        }
        if self.ports.len() > usize::from(u16::MAX) {
            return Err(ConfigError::TableTooLarge("port"));
        }
        if self.rules.len() > usize::from(u16::MAX) {
            return Err(ConfigError::TableTooLarge("rule"));
        }

        // --- Ports ---
        let mut static_keys = Vec::new();
        let mut generic_ports = Vec::new();
        for (idx, port) in self.ports.iter().enumerate() {
            let id = PortId(idx as u16);
            if let Some(mode) = port.initial_mode {
                if !port.accepts(mode) {
                    return Err(ConfigError::Invalid("port initial_mode out of range"));
                }
            }
            if port.source == SourceKind::Generic {
                generic_ports.push(id);
            } else {
                static_keys.push((port.key(), id));
            }
        }
        static_keys.sort_unstable_by_key(|(key, _)| *key);
        if let Some(dup) = static_keys.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(ConfigError::DuplicatePortKey(dup[1].1.0));
        }
        for (n, a) in generic_ports.iter().enumerate() {
            if generic_ports[n + 1..]
                .iter()
                .any(|b| self.ports[b.index()].channel == self.ports[a.index()].channel)
            {
                return Err(ConfigError::DuplicatePortKey(a.0));
            }
        }

        // --- Timers ---
        for (idx, timer) in self.timers.iter().enumerate() {
            let Some(port) = self.ports.get(timer.port.index()) else {
                return Err(ConfigError::UnknownPort(timer.port.0));
            };
            if port.source != SourceKind::Timer {
                return Err(ConfigError::TimerPortMismatch(idx as u16));
            }
        }

        // --- Expressions ---
        let exprs = expr::compile(&self.expressions, self.ports.len())?;

        // --- Action lists / rules ---
        for rule in &self.rules {
            if rule.expression.index() >= exprs.len() {
                return Err(ConfigError::UnknownExpression(rule.expression.0));
            }
            for list in [rule.true_list, rule.false_list].into_iter().flatten() {
                if list.index() >= self.action_lists.len() {
                    return Err(ConfigError::UnknownActionList(list.0));
                }
            }
        }
        let actions = action::compile_actions(
            &self.actions,
            self.ipdu_group_count,
            &self.timers,
            &self.ports,
        )?;
        let (lists, items) =
            action::compile_lists(&self.action_lists, actions.len(), self.rules.len())?;
        action::check_nesting(&self.action_lists, &self.rules)?;

        let rules: Vec<CompiledRule> = self
            .rules
            .iter()
            .map(|spec| {
                let refs_deferred = exprs[spec.expression.index()]
                    .ports
                    .iter()
                    .any(|p| !self.ports[p.index()].is_immediate());
                CompiledRule {
                    spec: spec.clone(),
                    deferred: refs_deferred && !spec.nested_only,
                }
            })
            .collect();

        let deferred_rules = (0..rules.len() as u16)
            .map(RuleId)
            .filter(|r| rules[r.index()].deferred)
            .collect();

        // --- Dependency ranges ---
        let mut dependents = Vec::new();
        let mut dep_ranges = Vec::with_capacity(self.ports.len());
        for idx in 0..self.ports.len() {
            let port = PortId(idx as u16);
            let head = dependents.len();
            for (r, rule) in rules.iter().enumerate() {
                if !rule.spec.nested_only
                    && exprs[rule.spec.expression.index()].ports.contains(&port)
                {
                    dependents.push(RuleId(r as u16));
                }
            }
            dep_ranges.push((head, dependents.len()));
        }

        Ok(CompiledTopology {
            ports: self.ports.clone(),
            static_keys,
            generic_ports,
            dep_ranges,
            dependents,
            exprs,
            rules,
            deferred_rules,
            lists,
            items,
            actions,
            timers: self.timers.clone(),
            ipdu_group_count: self.ipdu_group_count,
        })
    }
}

// ---------------------------------------------------------------------------
// Compiled form
// ---------------------------------------------------------------------------

/// Immutable run-time tables.
#[derive(Debug, Clone)]
pub struct CompiledTopology {
    ports: Vec<PortSpec>,
    static_keys: Vec<(PortKey, PortId)>,
    generic_ports: Vec<PortId>,
    dep_ranges: Vec<(usize, usize)>,
    dependents: Vec<RuleId>,
    exprs: Vec<CompiledExpr>,
    rules: Vec<CompiledRule>,
    deferred_rules: Vec<RuleId>,
    lists: Vec<CompiledList>,
    items: Vec<Item>,
    actions: Vec<Action>,
    timers: Vec<TimerSpec>,
    ipdu_group_count: u16,
}

impl CompiledTopology {
    /// Resolve a port key: binary search over static keys, linear search
    /// over the generic table.
    pub fn find_port(&self, key: PortKey) -> Option<PortId> {
        if key.source == SourceKind::Generic {
            return self
                .generic_ports
                .iter()
                .copied()
                .find(|p| self.ports[p.index()].channel == key.channel);
        }
        self.static_keys
            .binary_search_by_key(&key, |(k, _)| *k)
            .ok()
            .map(|i| self.static_keys[i].1)
    }

    pub fn port(&self, id: PortId) -> &PortSpec {
        &self.ports[id.index()]
    }

    pub fn ports(&self) -> &[PortSpec] {
        &self.ports
    }

    /// Non-nested rules reading `port`, ascending.
    pub fn dependents(&self, port: PortId) -> &[RuleId] {
        let (head, tail) = self.dep_ranges[port.index()];
        &self.dependents[head..tail]
    }

    pub fn expr(&self, id: ExprId) -> &CompiledExpr {
        &self.exprs[id.index()]
    }

    pub fn exprs(&self) -> &[CompiledExpr] {
        &self.exprs
    }

    pub fn rule(&self, id: RuleId) -> &CompiledRule {
        &self.rules[id.index()]
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn deferred_rules(&self) -> &[RuleId] {
        &self.deferred_rules
    }

    pub fn list(&self, id: ListId) -> &CompiledList {
        &self.lists[id.index()]
    }

    pub fn list_count(&self) -> usize {
        self.lists.len()
    }

    pub fn item(&self, idx: u16) -> Item {
        self.items[usize::from(idx)]
    }

    pub fn action(&self, id: ActionId) -> &Action {
        &self.actions[id.index()]
    }

    pub fn timers(&self) -> &[TimerSpec] {
        &self.timers
    }

    pub fn timer_for_port(&self, port: PortId) -> Option<TimerId> {
        self.timers
            .iter()
            .position(|t| t.port == port)
            .map(|i| TimerId(i as u16))
    }

    pub fn ipdu_group_count(&self) -> u16 {
        self.ipdu_group_count
    }
}
