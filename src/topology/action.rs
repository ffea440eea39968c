//! Actions and action lists.
//!
//! Action *specs* are what the configuration names; they compile into the
//! static dispatch table of [`Action`]s, where PDU group id lists have been
//! folded into enable / disable masks.
//!
//! Action lists are flattened into one item table:
//!
//! ```text
//!   items: [ a0 | a1 | L2 | a3 ][ a4 | R0 ][ ... ]
//!            ^head(L0)     tail^ ^head(L1)
//! ```

use serde::{Deserialize, Serialize};

use super::port::TimerSpec;
use super::rule::RuleSpec;
use super::{ActionId, FaultId, ListId, MAX_NESTING_DEPTH, RuleId, TimerId};
use crate::error::ConfigError;
use crate::groups::GroupMasks;
use crate::modes::{ComMMode, EcuMState, SourceKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerOp {
    Start { ticks: u32 },
    Stop,
}

/// Configured action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSpec {
    /// Enable / disable PDU groups; `reinit` also updates the re-init
    /// shadow so the groups restart with initialization.
    PduGroupSwitch {
        #[serde(default)]
        enable: Vec<u16>,
        #[serde(default)]
        disable: Vec<u16>,
        #[serde(default)]
        reinit: bool,
    },
    DeadlineMonitoringControl {
        #[serde(default)]
        enable: Vec<u16>,
        #[serde(default)]
        disable: Vec<u16>,
    },
    PduRouterControl { enable: bool, routing_groups: Vec<u16> },
    ComMAllowCom { channel: u8, allowed: bool },
    ComMModeSwitch { channel: u8, mode: ComMMode },
    ComMModeLimitation { channel: u8, limit_to_no_com: bool },
    EcuMStateSwitch { state: EcuMState },
    NmControl { channel: u8, enable: bool },
    PartitionReset { application: u8 },
    ModeSwitch { switch_port: u16, mode: u32 },
    TimerControl { timer: TimerId, op: TimerOp },
    UserCallout { callout: u16 },
}

/// Entry of the compiled dispatch table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    PduGroupSwitch { masks: GroupMasks, reinit: bool },
    DeadlineMonitoringControl { masks: GroupMasks },
    PduRouterControl { enable: bool, routing_groups: Vec<u16> },
    ComMAllowCom { channel: u8, allowed: bool },
    ComMModeSwitch { channel: u8, mode: ComMMode },
    ComMModeLimitation { channel: u8, limit_to_no_com: bool },
    EcuMStateSwitch { state: EcuMState },
    NmControl { channel: u8, enable: bool },
    PartitionReset { application: u8 },
    ModeSwitch { switch_port: u16, mode: u32 },
    TimerControl { timer: TimerId, op: TimerOp },
    UserCallout { callout: u16 },
}

impl Action {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PduGroupSwitch { .. } => "pdu_group_switch",
            Self::DeadlineMonitoringControl { .. } => "deadline_monitoring_control",
            Self::PduRouterControl { .. } => "pdu_router_control",
            Self::ComMAllowCom { .. } => "com_m_allow_com",
            Self::ComMModeSwitch { .. } => "com_m_mode_switch",
            Self::ComMModeLimitation { .. } => "com_m_mode_limitation",
            Self::EcuMStateSwitch { .. } => "ecu_m_state_switch",
            Self::NmControl { .. } => "nm_control",
            Self::PartitionReset { .. } => "partition_reset",
            Self::ModeSwitch { .. } => "mode_switch",
            Self::TimerControl { .. } => "timer_control",
            Self::UserCallout { .. } => "user_callout",
        }
    }
}

/// How a list reacts to repeated evaluations of the same result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListExecution {
    /// Fires once per change of the rule result.
    #[default]
    Trigger,
    /// Fires on every determined evaluation.
    Condition,
}

/// One entry of an action list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Item {
    Action {
        id: ActionId,
        #[serde(default)]
        abort_on_fail: bool,
        #[serde(default)]
        fault: Option<FaultId>,
    },
    NestedList(ListId),
    NestedRule(RuleId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionListSpec {
    pub name: String,
    #[serde(default)]
    pub execution: ListExecution,
    pub items: Vec<Item>,
}

/// Compiled list: a `[head, tail)` segment of the flat item table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledList {
    pub name: String,
    pub execution: ListExecution,
    pub head: u16,
    pub tail: u16,
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

fn check_groups(groups: &[u16], group_count: u16) -> Result<(), ConfigError> {
    match groups.iter().find(|g| **g >= group_count) {
        Some(g) => Err(ConfigError::GroupOutOfRange(*g)),
        None => Ok(()),
    }
}

fn masks(enable: &[u16], disable: &[u16], group_count: u16) -> Result<GroupMasks, ConfigError> {
    check_groups(enable, group_count)?;
    check_groups(disable, group_count)?;
    Ok(GroupMasks::new(enable, disable))
}

/// Resolve the dispatch table.
pub(super) fn compile_actions(
    specs: &[ActionSpec],
    group_count: u16,
    timers: &[TimerSpec],
    ports: &[super::PortSpec],
) -> Result<Vec<Action>, ConfigError> {
    if specs.len() > usize::from(u16::MAX) {
        return Err(ConfigError::TableTooLarge("action"));
    }
    specs
        .iter()
        .enumerate()
        .map(|(idx, spec)| {
            Ok(match spec {
                ActionSpec::PduGroupSwitch {
                    enable,
                    disable,
                    reinit,
                } => Action::PduGroupSwitch {
                    masks: masks(enable, disable, group_count)?,
                    reinit: *reinit,
                },
                ActionSpec::DeadlineMonitoringControl { enable, disable } => {
                    Action::DeadlineMonitoringControl {
                        masks: masks(enable, disable, group_count)?,
                    }
                }
                ActionSpec::PduRouterControl {
                    enable,
                    routing_groups,
                } => Action::PduRouterControl {
                    enable: *enable,
                    routing_groups: routing_groups.clone(),
                },
                ActionSpec::ComMAllowCom { channel, allowed } => Action::ComMAllowCom {
                    channel: *channel,
                    allowed: *allowed,
                },
                ActionSpec::ComMModeSwitch { channel, mode } => Action::ComMModeSwitch {
                    channel: *channel,
                    mode: *mode,
                },
                ActionSpec::ComMModeLimitation {
                    channel,
                    limit_to_no_com,
                } => Action::ComMModeLimitation {
                    channel: *channel,
                    limit_to_no_com: *limit_to_no_com,
                },
                ActionSpec::EcuMStateSwitch { state } => Action::EcuMStateSwitch { state: *state },
                ActionSpec::NmControl { channel, enable } => Action::NmControl {
                    channel: *channel,
                    enable: *enable,
                },
                ActionSpec::PartitionReset { application } => Action::PartitionReset {
                    application: *application,
                },
                ActionSpec::ModeSwitch { switch_port, mode } => Action::ModeSwitch {
                    switch_port: *switch_port,
                    mode: *mode,
                },
                ActionSpec::TimerControl { timer, op } => {
                    let Some(t) = timers.get(timer.index()) else {
                        return Err(ConfigError::UnknownTimer(timer.0));
                    };
                    if ports[t.port.index()].source != SourceKind::Timer {
                        return Err(ConfigError::TimerPortMismatch(timer.0));
                    }
                    if matches!(op, TimerOp::Start { ticks: 0 }) {
                        return Err(ConfigError::ZeroTimerTicks(idx as u16));
                    }
                    Action::TimerControl {
                        timer: *timer,
                        op: *op,
                    }
                }
                ActionSpec::UserCallout { callout } => Action::UserCallout { callout: *callout },
            })
        })
        .collect()
}

/// Flatten lists into one item table and validate every item reference.
pub(super) fn compile_lists(
    lists: &[ActionListSpec],
    action_count: usize,
    rule_count: usize,
) -> Result<(Vec<CompiledList>, Vec<Item>), ConfigError> {
    if lists.len() > usize::from(u16::MAX) {
        return Err(ConfigError::TableTooLarge("action list"));
    }
    let mut compiled = Vec::with_capacity(lists.len());
    let mut items = Vec::new();
    for list in lists {
        for item in &list.items {
            match item {
                Item::Action { id, .. } if id.index() >= action_count => {
                    return Err(ConfigError::UnknownAction(id.0));
                }
                Item::NestedList(id) if id.index() >= lists.len() => {
                    return Err(ConfigError::UnknownActionList(id.0));
                }
                Item::NestedRule(id) if id.index() >= rule_count => {
                    return Err(ConfigError::UnknownRule(id.0));
                }
                _ => {}
            }
        }
        let head = items.len();
        items.extend_from_slice(&list.items);
        if items.len() > usize::from(u16::MAX) {
            return Err(ConfigError::TableTooLarge("action item"));
        }
        compiled.push(CompiledList {
            name: list.name.clone(),
            execution: list.execution,
            head: head as u16,
            tail: items.len() as u16,
        });
    }
    Ok((compiled, items))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    OnPath,
    Depth(usize),
}

/// Nesting depth of every list: one for the list itself plus the deepest
/// nested list or nested-rule branch.  Cycles and trees deeper than the
/// interpreter stack are rejected; the walk stops at the first level past
/// the stack depth.
pub(super) fn check_nesting(
    lists: &[ActionListSpec],
    rules: &[RuleSpec],
) -> Result<Vec<usize>, ConfigError> {
    let mut visits = vec![Visit::Unvisited; lists.len()];
    let mut depths = Vec::with_capacity(lists.len());
    for root in 0..lists.len() {
        let walk = Walk {
            root: root as u16,
            lists,
            rules,
        };
        let depth = walk.depth_of(root, 1, &mut visits)?;
        if depth > MAX_NESTING_DEPTH {
            return Err(ConfigError::NestingTooDeep {
                list: walk.root,
                depth,
            });
        }
        depths.push(depth);
    }
    Ok(depths)
}

struct Walk<'a> {
    root: u16,
    lists: &'a [ActionListSpec],
    rules: &'a [RuleSpec],
}

impl Walk<'_> {
    /// `level` is the depth of `idx` on the current path from the root.
    fn depth_of(
        &self,
        idx: usize,
        level: usize,
        visits: &mut [Visit],
    ) -> Result<usize, ConfigError> {
        match visits[idx] {
            Visit::Depth(d) => return Ok(d),
            Visit::OnPath => return Err(ConfigError::ActionListCycle(idx as u16)),
            Visit::Unvisited => {}
        }
        if level > MAX_NESTING_DEPTH {
            return Err(ConfigError::NestingTooDeep {
                list: self.root,
                depth: level,
            });
        }
        visits[idx] = Visit::OnPath;

        let mut deepest = 0;
        for item in &self.lists[idx].items {
            let child = match item {
                Item::Action { .. } => 0,
                Item::NestedList(l) => self.depth_of(l.index(), level + 1, visits)?,
                Item::NestedRule(r) => {
                    let rule = &self.rules[r.index()];
                    let mut d = 0;
                    for l in [rule.true_list, rule.false_list].into_iter().flatten() {
                        d = d.max(self.depth_of(l.index(), level + 1, visits)?);
                    }
                    d
                }
            };
            deepest = deepest.max(child);
        }

        let depth = deepest + 1;
        visits[idx] = Visit::Depth(depth);
        Ok(depth)
    }
}
