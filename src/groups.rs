//! PDU group-control vectors.
//!
//! Three bit vectors are kept per engine instance:
//!
//! - the **live** vector handed to `ComPort::ipdu_group_control(.., false)`,
//! - the **re-init** shadow handed to `ComPort::ipdu_group_control(.., true)`,
//! - the **deadline-monitoring** vector handed to
//!   `ComPort::reception_dm_control`.
//!
//! Consistency rules between live and shadow:
//!
//! 1. A set in the live vector never sets the shadow.
//! 2. A clear in the live vector always clears the shadow.
//! 3. Any set or clear on the shadow is applied to the live vector too.
//! 4. After the live vector was flushed, the shadow is OR-ed with it.
//!
//! The masking order below is kept exactly as the rules require: enable
//! (`|=`) before disable (`&=`), shadow before live.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Maximum number of PDU groups addressable by a vector.
pub const MAX_IPDU_GROUPS: usize = 256;

const VECTOR_BYTES: usize = MAX_IPDU_GROUPS / 8;

/// A fixed-size bitset of PDU group ids.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupVector([u8; VECTOR_BYTES]);

impl GroupVector {
    pub const fn empty() -> Self {
        Self([0; VECTOR_BYTES])
    }

    pub const fn full() -> Self {
        Self([0xFF; VECTOR_BYTES])
    }

    /// Vector with exactly the given groups set.
    pub fn from_groups(groups: &[u16]) -> Self {
        let mut v = Self::empty();
        for &g in groups {
            v.set(g, true);
        }
        v
    }

    /// Set or clear one group.  Ids beyond the capacity are ignored.
    pub fn set(&mut self, group: u16, on: bool) {
        let idx = group as usize;
        if idx >= MAX_IPDU_GROUPS {
            return;
        }
        let bit = 1u8 << (idx % 8);
        if on {
            self.0[idx / 8] |= bit;
        } else {
            self.0[idx / 8] &= !bit;
        }
    }

    pub fn contains(&self, group: u16) -> bool {
        let idx = group as usize;
        idx < MAX_IPDU_GROUPS && self.0[idx / 8] & (1 << (idx % 8)) != 0
    }

    pub fn or_assign(&mut self, other: &Self) {
        for (a, b) in self.0.iter_mut().zip(other.0.iter()) {
            *a |= *b;
        }
    }

    pub fn and_assign(&mut self, other: &Self) {
        for (a, b) in self.0.iter_mut().zip(other.0.iter()) {
            *a &= *b;
        }
    }

    /// True if every group set in `self` is also set in `other`.
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.0.iter().zip(other.0.iter()).all(|(a, b)| a & !b == 0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Ids of all set groups, ascending.
    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        (0..MAX_IPDU_GROUPS as u16).filter(|g| self.contains(*g))
    }
}

impl Default for GroupVector {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for GroupVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Enable / disable masks of one group action, resolved at compile time.
///
/// `enable` is OR-ed in; `disable` is AND-ed in (a cleared bit disables).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMasks {
    pub enable: GroupVector,
    pub disable: GroupVector,
}

impl GroupMasks {
    pub fn new(enable: &[u16], disable: &[u16]) -> Self {
        let mut and_mask = GroupVector::full();
        for &g in disable {
            and_mask.set(g, false);
        }
        Self {
            enable: GroupVector::from_groups(enable),
            disable: and_mask,
        }
    }
}

// ---------------------------------------------------------------------------
// Group-control state
// ---------------------------------------------------------------------------

/// Live, shadow and deadline-monitoring vectors plus the flags that say
/// which of them must be flushed at the end of an interpreter pass.
#[derive(Debug, Clone, Default)]
pub struct GroupControl {
    pub vector: GroupVector,
    pub reinit_vector: GroupVector,
    pub dm_vector: GroupVector,
    switch_triggered: bool,
    reinit_triggered: bool,
    dm_triggered: bool,
}

/// What the flush has to hand to the Com collaborator, in call order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupFlush {
    pub reinit: Option<GroupVector>,
    pub switch: Option<GroupVector>,
    pub deadline_monitoring: Option<GroupVector>,
}

impl GroupControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one PDU group switch action.
    pub fn apply_switch(&mut self, masks: &GroupMasks, reinit: bool) {
        if reinit {
            self.reinit_triggered = true;
            self.reinit_vector.or_assign(&masks.enable);
            self.reinit_vector.and_assign(&masks.disable);
        } else {
            self.switch_triggered = true;
            self.reinit_vector.and_assign(&masks.disable);
        }

        self.vector.or_assign(&masks.enable);
        self.vector.and_assign(&masks.disable);

        self.dm_vector.or_assign(&masks.enable);
        self.dm_vector.and_assign(&masks.disable);
    }

    /// Apply one deadline-monitoring control action.
    pub fn apply_deadline_monitoring(&mut self, masks: &GroupMasks) {
        self.dm_triggered = true;
        self.dm_vector.or_assign(&masks.enable);
        self.dm_vector.and_assign(&masks.disable);
    }

    /// Take the pending flush and clear the trigger flags.
    ///
    /// The shadow resynchronisation happens in
    /// [`resync_after_switch`](Self::resync_after_switch), once the live
    /// vector was actually handed over.
    pub fn take_flush(&mut self) -> GroupFlush {
        let mut flush = GroupFlush::default();
        if core::mem::take(&mut self.reinit_triggered) {
            flush.reinit = Some(self.reinit_vector);
        }
        if core::mem::take(&mut self.switch_triggered) {
            flush.switch = Some(self.vector);
        }
        if core::mem::take(&mut self.dm_triggered) {
            flush.deadline_monitoring = Some(self.dm_vector);
        }
        flush
    }

    pub fn resync_after_switch(&mut self) {
        let live = self.vector;
        self.reinit_vector.or_assign(&live);
    }

    pub fn has_pending(&self) -> bool {
        self.reinit_triggered || self.switch_triggered || self.dm_triggered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_disable_clears_only_listed_groups() {
        let m = GroupMasks::new(&[1], &[2]);
        assert!(m.enable.contains(1));
        assert!(!m.disable.contains(2));
        assert!(m.disable.contains(1));
        assert!(m.disable.contains(200));
    }

    #[test]
    fn live_set_does_not_set_shadow() {
        let mut gc = GroupControl::new();
        gc.apply_switch(&GroupMasks::new(&[3], &[]), false);
        assert!(gc.vector.contains(3));
        assert!(!gc.reinit_vector.contains(3));
    }

    #[test]
    fn live_clear_clears_shadow() {
        let mut gc = GroupControl::new();
        gc.apply_switch(&GroupMasks::new(&[3], &[]), true);
        assert!(gc.reinit_vector.contains(3));
        gc.apply_switch(&GroupMasks::new(&[], &[3]), false);
        assert!(!gc.vector.contains(3));
        assert!(!gc.reinit_vector.contains(3));
    }

    #[test]
    fn shadow_write_mirrors_onto_live() {
        let mut gc = GroupControl::new();
        gc.apply_switch(&GroupMasks::new(&[5, 6], &[]), true);
        assert!(gc.vector.contains(5) && gc.vector.contains(6));
        gc.apply_switch(&GroupMasks::new(&[], &[6]), true);
        assert!(!gc.vector.contains(6));
        assert!(!gc.reinit_vector.contains(6));
    }

    #[test]
    fn enable_and_disable_same_group_disables() {
        let mut gc = GroupControl::new();
        gc.apply_switch(&GroupMasks::new(&[4], &[4]), false);
        assert!(!gc.vector.contains(4));
    }

    #[test]
    fn flush_order_and_resync() {
        let mut gc = GroupControl::new();
        gc.apply_switch(&GroupMasks::new(&[1], &[]), true);
        gc.apply_switch(&GroupMasks::new(&[2], &[]), false);
        let flush = gc.take_flush();
        assert_eq!(flush.reinit, Some(GroupVector::from_groups(&[1])));
        assert_eq!(flush.switch, Some(GroupVector::from_groups(&[1, 2])));
        assert_eq!(flush.deadline_monitoring, None);
        assert!(!gc.has_pending());

        gc.resync_after_switch();
        assert!(gc.reinit_vector.contains(2));
    }

    #[test]
    fn deadline_monitoring_is_flushed_separately() {
        let mut gc = GroupControl::new();
        gc.apply_deadline_monitoring(&GroupMasks::new(&[9], &[]));
        let flush = gc.take_flush();
        assert!(flush.switch.is_none());
        assert_eq!(flush.deadline_monitoring, Some(GroupVector::from_groups(&[9])));
    }

    #[test]
    fn out_of_range_group_is_ignored() {
        let mut v = GroupVector::empty();
        v.set(300, true);
        assert!(v.is_empty());
        assert!(!v.contains(300));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_op() -> impl Strategy<Value = (Vec<u16>, Vec<u16>, bool)> {
        (
            proptest::collection::vec(0u16..16, 0..4),
            proptest::collection::vec(0u16..16, 0..4),
            any::<bool>(),
        )
    }

    proptest! {
        /// After any sequence of switches followed by one flush, every group
        /// clear in the shadow is also clear in the live vector.
        #[test]
        fn live_is_subset_of_shadow_after_flush(ops in proptest::collection::vec(arb_op(), 1..40)) {
            let mut gc = GroupControl::new();
            for (enable, disable, reinit) in &ops {
                gc.apply_switch(&GroupMasks::new(enable, disable), *reinit);
            }
            let flush = gc.take_flush();
            if flush.switch.is_some() {
                gc.resync_after_switch();
            }
            prop_assert!(gc.vector.is_subset_of(&gc.reinit_vector));
        }

        /// Each disable clears its groups in both vectors immediately.
        #[test]
        fn disable_clears_both_vectors(ops in proptest::collection::vec(arb_op(), 1..40)) {
            let mut gc = GroupControl::new();
            for (enable, disable, reinit) in &ops {
                gc.apply_switch(&GroupMasks::new(enable, disable), *reinit);
                for g in disable {
                    prop_assert!(!gc.vector.contains(*g));
                    prop_assert!(!gc.reinit_vector.contains(*g));
                }
            }
        }
    }
}
