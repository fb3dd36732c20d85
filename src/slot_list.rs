//! The lock-free, append-only intrusive slot list underlying both the hazard
//! list and the retired list.
//!
//! A slot list is a singly linked list of [`Slot`]s reachable from an atomic
//! head pointer. Slots are never physically unlinked: once appended, a slot
//! stays in the list for the lifetime of the list, and "removing" a value is
//! just a CAS of that slot's value back to the empty sentinel (`0`) so it can
//! be reused by a later insert. This is what lets every operation below be
//! walked concurrently by any number of threads without a lock.

use core::ptr::NonNull;

use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(feature = "check-loom")] {
        use loom::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};
    } else {
        use core::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};
    }
}

/// Sentinel value meaning "this slot is not currently holding anything".
const EMPTY: usize = 0;

/// One reusable cell in a [`SlotList`].
///
/// `next` is written exactly once, by the thread that allocates the slot,
/// before the slot is published into the list via the head CAS; after that
/// it is only ever read. This matches the structural invariant the whole
/// list depends on: a slot's successor never changes once reachable.
#[derive(Debug)]
pub(crate) struct Slot {
    value: AtomicUsize,
    next: AtomicPtr<Slot>,
}

// Slots are allocated on one thread and then shared by pointer across all
// threads walking the list.
unsafe impl Send for Slot {}
unsafe impl Sync for Slot {}

impl Slot {
    /// The value currently held by this slot, or `None` if empty.
    pub(crate) fn get(&self) -> Option<usize> {
        match self.value.load(Ordering::Acquire) {
            EMPTY => None,
            v => Some(v),
        }
    }

    /// Attempts to clear this exact slot if it still holds `expected`.
    pub(crate) fn try_clear(&self, expected: usize) -> bool {
        self.value
            .compare_exchange(expected, EMPTY, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }
}

/// A lock-free, growing-only pool of slots, each holding one non-zero
/// `usize` or `EMPTY`.
#[derive(Debug)]
pub(crate) struct SlotList {
    head: AtomicPtr<Slot>,
}

impl SlotList {
    cfg_if! {
        if #[cfg(feature = "check-loom")] {
            pub(crate) fn new() -> Self {
                Self {
                    head: AtomicPtr::new(core::ptr::null_mut()),
                }
            }
        } else {
            pub(crate) const fn new() -> Self {
                Self {
                    head: AtomicPtr::new(core::ptr::null_mut()),
                }
            }
        }
    }

    /// Finds an empty slot and claims it for `v`, or appends a freshly
    /// allocated slot holding `v`. Returns the slot written to, or `None` if
    /// allocation failed.
    ///
    /// `v` must be non-zero.
    pub(crate) fn insert_or_append(&self, v: usize) -> Option<NonNull<Slot>> {
        debug_assert_ne!(v, EMPTY, "cannot publish the empty sentinel");

        let mut cur = self.head.load(Ordering::Acquire);
        while let Some(slot) = unsafe { cur.as_ref() } {
            if slot
                .value
                .compare_exchange(EMPTY, v, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return NonNull::new(cur);
            }
            cur = slot.next.load(Ordering::Acquire);
        }

        self.append(v)
    }

    /// Allocates a new slot holding `v` and CAS-prepends it at the head.
    fn append(&self, v: usize) -> Option<NonNull<Slot>> {
        let new = Box::into_raw(Box::new(Slot {
            value: AtomicUsize::new(v),
            next: AtomicPtr::new(core::ptr::null_mut()),
        }));

        loop {
            let head = self.head.load(Ordering::Relaxed);
            unsafe { (*new).next.store(head, Ordering::Relaxed) };
            if self
                .head
                .compare_exchange_weak(head, new, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return NonNull::new(new);
            }
        }
    }

    /// Clears the first slot found holding `v`. Returns whether a slot was
    /// cleared; competing removers of the same value legitimately race, and
    /// at most one of them wins per occurrence.
    pub(crate) fn remove(&self, v: usize) -> bool {
        debug_assert_ne!(v, EMPTY);
        let mut cur = self.head.load(Ordering::Acquire);
        while let Some(slot) = unsafe { cur.as_ref() } {
            if slot.value.load(Ordering::Acquire) == v && slot.try_clear(v) {
                return true;
            }
            cur = slot.next.load(Ordering::Acquire);
        }
        false
    }

    /// Returns whether any slot currently holds `v`.
    pub(crate) fn contains(&self, v: usize) -> bool {
        debug_assert_ne!(v, EMPTY);
        let mut cur = self.head.load(Ordering::Acquire);
        while let Some(slot) = unsafe { cur.as_ref() } {
            if slot.value.load(Ordering::Acquire) == v {
                return true;
            }
            cur = slot.next.load(Ordering::Acquire);
        }
        false
    }

    /// Walks every slot currently in the list, calling `f` with its value if
    /// non-empty. Used by the retired-list scan in [`cleanup`](crate::Domain::cleanup).
    pub(crate) fn for_each(&self, mut f: impl FnMut(NonNull<Slot>, usize)) {
        let mut cur = self.head.load(Ordering::Acquire);
        while let Some(slot) = unsafe { cur.as_ref() } {
            if let Some(v) = slot.get() {
                f(NonNull::from(slot), v);
            }
            cur = slot.next.load(Ordering::Acquire);
        }
    }

    /// Frees every slot's storage. Not thread-safe: only call once no other
    /// thread can still be walking this list.
    pub(crate) fn free_all(&mut self) {
        let mut cur = self.head.load(Ordering::Relaxed);
        while !cur.is_null() {
            let next = unsafe { (*cur).next.load(Ordering::Relaxed) };
            drop(unsafe { Box::from_raw(cur) });
            cur = next;
        }
    }
}

impl Drop for SlotList {
    fn drop(&mut self) {
        self.free_all();
    }
}

#[cfg(all(test, not(feature = "check-loom")))]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn insert_then_contains() {
        let list = SlotList::new();
        list.insert_or_append(42).unwrap();
        assert!(list.contains(42));
        assert!(!list.contains(7));
    }

    #[test]
    fn remove_clears_membership() {
        let list = SlotList::new();
        list.insert_or_append(42).unwrap();
        assert!(list.remove(42));
        assert!(!list.contains(42));
        // a second remove of the same value finds nothing left to clear.
        assert!(!list.remove(42));
    }

    #[test]
    fn reuses_emptied_slots() {
        let list = SlotList::new();
        let slot = list.insert_or_append(1).unwrap();
        list.remove(1);
        let reused = list.insert_or_append(2).unwrap();
        assert_eq!(slot, reused);
    }

    #[test]
    fn concurrent_inserts_are_all_visible() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 256;

        let list = Arc::new(SlotList::new());
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let list = Arc::clone(&list);
                thread::spawn(move || {
                    for i in 0..PER_THREAD {
                        let v = t * PER_THREAD + i + 1;
                        list.insert_or_append(v).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let mut seen = HashSet::new();
        list.for_each(|_, v| {
            seen.insert(v);
        });
        assert_eq!(seen.len(), THREADS * PER_THREAD);
    }
}
