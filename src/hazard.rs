//! The hazard list (component B): the multiset of addresses currently
//! protected by some reader.

use core::ptr::NonNull;

use crate::slot_list::{Slot, SlotList};

/// The "pointers in use" list. A single address may be published by more
/// than one slot at once — one per concurrent reader holding it.
#[derive(Debug)]
pub(crate) struct HazardList {
    slots: SlotList,
}

impl HazardList {
    pub(crate) fn new() -> Self {
        Self {
            slots: SlotList::new(),
        }
    }

    /// Publishes `v` as a hazard, reusing a vacated slot if one is available.
    pub(crate) fn publish(&self, v: usize) -> Option<NonNull<Slot>> {
        self.slots.insert_or_append(v)
    }

    /// Clears a hazard for `v`, preferring the given slot but falling back to
    /// any slot still holding `v` if someone else already cleared ours.
    pub(crate) fn unpublish_slot_or_any(&self, slot: NonNull<Slot>, v: usize) {
        if !unsafe { slot.as_ref() }.try_clear(v) {
            self.slots.remove(v);
        }
    }

    /// Clears exactly one hazard slot holding `v`. Used by `Domain::release`,
    /// where the caller is asserting it owns a published hazard for `v`.
    pub(crate) fn unpublish(&self, v: usize) -> bool {
        self.slots.remove(v)
    }

    /// Whether any reader currently holds a hazard on `v`.
    pub(crate) fn contains(&self, v: usize) -> bool {
        self.slots.contains(v)
    }
}

#[cfg(all(test, not(feature = "check-loom")))]
mod tests {
    use super::*;

    #[test]
    fn publish_and_unpublish() {
        let hazards = HazardList::new();
        assert!(!hazards.contains(9));
        hazards.publish(9).unwrap();
        assert!(hazards.contains(9));
        assert!(hazards.unpublish(9));
        assert!(!hazards.contains(9));
    }
}
