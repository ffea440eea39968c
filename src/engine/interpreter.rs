//! Action-list interpreter.
//!
//! A bounded, explicit stack of cursors replaces recursion:
//!
//! ```text
//!   L1 = [a1, L2, a4]      L2 = [a2, a3]
//!
//!   push L1        [L1@0]
//!   a1             [L1@1]
//!   L2 → push back [L1@2, L2@0]
//!   a2, a3         [L1@2]           (L2 exhausted, popped)
//!   a4             []
//! ```
//!
//! Group-control actions are only collected while the stack runs; the
//! collected masks are applied and flushed to Com once, after every
//! activated list of the pass has completed.

use heapless::Vec as StackVec;
use log::{debug, error, trace};

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::diagnostics::bump;
use crate::error::{ActionResult, DevError};
use crate::ports::{BswPorts, FaultStatus, ServiceId};
use crate::topology::{Action, ActionId, Item, ListId, MAX_NESTING_DEPTH};

use super::Engine;
use super::evaluate::{ActivatedLists, evaluate_rule};
use super::timers;

/// Resumable position inside one action list (absolute item indices).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cursor {
    next: u16,
    tail: u16,
}

type Stack = StackVec<Cursor, MAX_NESTING_DEPTH>;

impl<M: RawMutex> Engine<M> {
    /// Execute every activated list in ascending order, then apply the
    /// collected group-control actions once.
    pub(super) fn execute_mode_control<B>(&self, bsw: &B, lists: &ActivatedLists)
    where
        B: BswPorts + ?Sized,
    {
        let mut deferred: Vec<ActionId> = Vec::new();
        for list in lists.iter() {
            self.execute_list(bsw, list, &mut deferred);
        }
        self.flush_group_control(bsw, &deferred);
    }

    fn execute_list<B>(&self, bsw: &B, root: ListId, deferred: &mut Vec<ActionId>)
    where
        B: BswPorts + ?Sized,
    {
        debug!("execute list {} '{}'", root, self.topology.list(root).name);
        self.with_ctx(|ctx| bump(&mut ctx.metrics.interpreter_passes));

        let mut stack = Stack::new();
        if !self.push(bsw, &mut stack, self.cursor_of(root)) {
            return;
        }

        while let Some(mut cursor) = stack.pop() {
            let mut interrupted = false;
            while !interrupted && cursor.next < cursor.tail {
                let item = self.topology.item(cursor.next);
                cursor.next += 1;

                match item {
                    Item::Action {
                        id,
                        abort_on_fail,
                        fault,
                    } => {
                        let result = self.dispatch(bsw, id, deferred);
                        if let Some(fault) = fault.filter(|_| self.config.fault_reporting) {
                            let status = if result.is_ok() {
                                FaultStatus::Passed
                            } else {
                                FaultStatus::Failed
                            };
                            bsw.report_fault_status(fault, status);
                        }
                        if let Err(e) = result {
                            debug!("action {id} failed: {e}");
                            self.with_ctx(|ctx| bump(&mut ctx.metrics.action_failures));
                            interrupted = abort_on_fail;
                        }
                    }
                    Item::NestedList(list) => {
                        if !self.push(bsw, &mut stack, cursor)
                            || !self.push(bsw, &mut stack, self.cursor_of(list))
                        {
                            return;
                        }
                        interrupted = true;
                    }
                    Item::NestedRule(rule) => {
                        let fired =
                            self.with_ctx(|ctx| evaluate_rule(&self.topology, ctx, rule));
                        if let Some(list) = fired {
                            if !self.push(bsw, &mut stack, cursor)
                                || !self.push(bsw, &mut stack, self.cursor_of(list))
                            {
                                return;
                            }
                            interrupted = true;
                        }
                    }
                }
            }
        }
    }

    fn cursor_of(&self, list: ListId) -> Cursor {
        let l = self.topology.list(list);
        Cursor {
            next: l.head,
            tail: l.tail,
        }
    }

    /// Push a cursor.  Overflow cannot happen with a compiled topology; if
    /// it does, the remaining list tree is abandoned.
    fn push<B>(&self, bsw: &B, stack: &mut Stack, cursor: Cursor) -> bool
    where
        B: BswPorts + ?Sized,
    {
        if stack.push(cursor).is_ok() {
            return true;
        }
        debug_assert!(false, "action list stack overflow");
        error!("action list nesting exceeds {MAX_NESTING_DEPTH}; list tree abandoned");
        self.report(bsw, ServiceId::Internal, DevError::Internal);
        false
    }

    /// Run one action from the dispatch table.  Group-control actions are
    /// only recorded and count as successful.
    fn dispatch<B>(&self, bsw: &B, id: ActionId, deferred: &mut Vec<ActionId>) -> ActionResult
    where
        B: BswPorts + ?Sized,
    {
        let action = self.topology.action(id);
        trace!("action {id} {}", action.name());
        match action {
            Action::PduGroupSwitch { .. } | Action::DeadlineMonitoringControl { .. } => {
                deferred.push(id);
                Ok(())
            }
            Action::PduRouterControl {
                enable,
                routing_groups,
            } => routing_groups.iter().fold(Ok(()), |acc, &group| {
                let r = if *enable {
                    bsw.enable_routing(group)
                } else {
                    bsw.disable_routing(group)
                };
                acc.and(r)
            }),
            Action::ComMAllowCom { channel, allowed } => bsw.comm_allow_com(*channel, *allowed),
            Action::ComMModeSwitch { channel, mode } => bsw.comm_request_mode(*channel, *mode),
            Action::ComMModeLimitation {
                channel,
                limit_to_no_com,
            } => bsw.comm_limit_to_no_com(*channel, *limit_to_no_com),
            Action::EcuMStateSwitch { state } => bsw.ecum_set_state(*state),
            Action::NmControl { channel, enable } => bsw.nm_control(*channel, *enable),
            Action::PartitionReset { application } => bsw.request_partition_reset(*application),
            Action::ModeSwitch { switch_port, mode } => bsw.switch_mode(*switch_port, *mode),
            Action::TimerControl { timer, op } => {
                self.with_ctx(|ctx| timers::control(&self.topology, ctx, *timer, *op));
                Ok(())
            }
            Action::UserCallout { callout } => bsw.callout(*callout),
        }
    }

    /// Apply collected group actions in the order they ran, then hand the
    /// resulting vectors to Com: re-init shadow, live vector, deadline
    /// monitoring.
    fn flush_group_control<B>(&self, bsw: &B, deferred: &[ActionId])
    where
        B: BswPorts + ?Sized,
    {
        let flush = self.with_ctx(|ctx| {
            for &id in deferred {
                match self.topology.action(id) {
                    Action::PduGroupSwitch { masks, reinit } => {
                        ctx.groups.apply_switch(masks, *reinit);
                    }
                    Action::DeadlineMonitoringControl { masks } => {
                        ctx.groups.apply_deadline_monitoring(masks);
                    }
                    _ => {}
                }
            }
            ctx.groups.take_flush()
        });

        if let Some(reinit) = flush.reinit {
            bsw.ipdu_group_control(&reinit, true);
        }
        if let Some(live) = flush.switch {
            bsw.ipdu_group_control(&live, false);
            self.with_ctx(|ctx| ctx.groups.resync_after_switch());
        }
        if let Some(dm) = flush.deadline_monitoring {
            bsw.reception_dm_control(&dm);
        }
    }
}
