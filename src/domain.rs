//! The reclamation domain (component D) and its reclamation policy
//! (component E).

use core::marker::PhantomData;
use core::ptr;

use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(feature = "check-loom")] {
        use loom::sync::atomic::{AtomicPtr, Ordering};
    } else {
        use core::sync::atomic::{AtomicPtr, Ordering};
    }
}

use crate::error::HazardError;
use crate::hazard::HazardList;
use crate::retired::RetiredList;

/// How [`Domain::cleanup_ptr`] and [`Domain::cleanup`] should handle a value
/// that still has live hazards on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReclaimPolicy {
    /// Busy-wait until every hazard on the value clears, then reclaim it
    /// before returning. Bounds memory use at the cost of possibly
    /// unbounded latency against a slow reader.
    Block,
    /// Park the value in the retired list and return immediately; a later
    /// `cleanup` call will reclaim it once safe. Bounds latency at the cost
    /// of possibly unbounded memory if `cleanup` is never driven.
    Defer,
}

/// A hazard-pointer reclamation scope: one hazard list, one retired list,
/// and a destructor bound to the domain at construction time.
///
/// A `Domain<T>` mediates safe exchange of pointers held in caller-owned
/// [`AtomicPtr<T>`] protected slots. It does not own any protected slot
/// itself, only the bookkeeping needed to know when a retired pointer is
/// safe to free.
pub struct Domain<T> {
    hazards: HazardList,
    retired: RetiredList,
    destructor: Box<dyn Fn(*mut T) + Send + Sync>,
    _marker: PhantomData<fn(*mut T)>,
}

// The domain only ever moves pointer-sized addresses between threads and
// hands a `*mut T` to whichever thread wins a reclamation claim; reclaiming
// storage that originated on another thread requires `T: Send`.
unsafe impl<T: Send> Send for Domain<T> {}
unsafe impl<T: Send> Sync for Domain<T> {}

impl<T> Domain<T> {
    /// Creates an empty domain bound to `destructor`.
    pub fn new<F>(destructor: F) -> Self
    where
        F: Fn(*mut T) + Send + Sync + 'static,
    {
        Self {
            hazards: HazardList::new(),
            retired: RetiredList::new(),
            destructor: Box::new(destructor),
            _marker: PhantomData,
        }
    }

    /// Publishes a hazard on the current contents of `slot` and returns it.
    ///
    /// From the moment this returns `Ok(v)` with `v` non-null until the
    /// matching [`Domain::release`], the payload at `v` will not be freed by
    /// this domain. Returns `Ok(null)` if the slot legitimately holds null;
    /// fails only on internal allocation failure, in which case no hazard is
    /// published.
    pub fn load(&self, slot: &AtomicPtr<T>) -> Result<*mut T, HazardError> {
        loop {
            let v = slot.load(Ordering::SeqCst);
            if v.is_null() {
                return Ok(ptr::null_mut());
            }

            let node = self.hazards.publish(v as usize).ok_or_else(|| {
                tracing::warn!("failed to allocate a hazard slot during load");
                HazardError::Allocation
            })?;

            // The confirming re-read: this, paired with the writer's
            // exchange in `swap`, is the linearization point that makes the
            // published hazard visible before any retirement decision.
            if slot.load(Ordering::SeqCst) == v {
                tracing::trace!(ptr = ?v, "load confirmed, hazard published");
                return Ok(v);
            }

            tracing::trace!(ptr = ?v, "load superseded by a concurrent swap, retrying");
            self.hazards.unpublish_slot_or_any(node, v as usize);
        }
    }

    /// Clears the hazard published for `value` by a matching `load`/`swap`.
    ///
    /// # Safety
    ///
    /// `value` must be non-null and must have been returned by a previous
    /// `load` or passed as `new` to a previous `swap` on this domain, with no
    /// intervening `release` for that same publication.
    pub unsafe fn release(&self, value: *mut T) {
        if value.is_null() {
            return;
        }
        let cleared = self.hazards.unpublish(value as usize);
        debug_assert!(
            cleared,
            "release() called for a value with no published hazard"
        );
    }

    /// Atomically installs `new` into `slot` and returns the previous
    /// contents, guaranteeing `new` is already protected by a hazard by the
    /// time a concurrent reader could observe it in `slot`.
    ///
    /// The caller must balance the implicit protection on `new` with a
    /// [`Domain::release`] once it no longer itself needs to keep `new` alive
    /// through this domain. On allocation failure the slot is left
    /// untouched.
    pub fn swap(&self, slot: &AtomicPtr<T>, new: *mut T) -> Result<*mut T, HazardError> {
        if !new.is_null() {
            self.hazards.publish(new as usize).ok_or_else(|| {
                tracing::warn!("failed to allocate a hazard slot during swap");
                HazardError::Allocation
            })?;
        }
        let old = slot.swap(new, Ordering::SeqCst);
        tracing::debug!(old = ?old, new = ?new, "swapped protected slot");
        Ok(old)
    }

    /// Surrenders `value` to the domain, which will ensure the destructor
    /// runs exactly once on it, subject to `policy`.
    ///
    /// # Safety
    ///
    /// `value` must be non-null, must not be currently installed in any
    /// protected slot of this domain, and must not be dereferenced by the
    /// caller after this call.
    pub unsafe fn cleanup_ptr(&self, value: *mut T, policy: ReclaimPolicy) {
        if value.is_null() {
            return;
        }
        let addr = value as usize;

        if !self.hazards.contains(addr) {
            tracing::debug!(ptr = ?value, "no live hazards, reclaiming immediately");
            (self.destructor)(value);
            return;
        }

        match policy {
            ReclaimPolicy::Defer => {
                tracing::trace!(ptr = ?value, "parking retired pointer for later cleanup");
                self.retired.park(addr);
            }
            ReclaimPolicy::Block => {
                tracing::trace!(ptr = ?value, "blocking until hazards clear");
                Self::spin_until_free(&self.hazards, addr);
                tracing::debug!(ptr = ?value, "hazards cleared, reclaiming");
                (self.destructor)(value);
            }
        }
    }

    /// Walks the retired list, reclaiming every entry with no remaining
    /// hazards; under [`ReclaimPolicy::Block`], also spins on entries that
    /// still have hazards until they clear.
    pub fn cleanup(&self, policy: ReclaimPolicy) {
        let hazards = &self.hazards;
        let retired = &self.retired;

        let mut to_reclaim = Vec::new();
        retired.for_each(|addr| {
            if !hazards.contains(addr) {
                if retired.claim(addr) {
                    to_reclaim.push(addr);
                }
            } else if policy == ReclaimPolicy::Block {
                Self::spin_until_free(hazards, addr);
                if retired.claim(addr) {
                    to_reclaim.push(addr);
                }
            }
        });

        for addr in to_reclaim {
            tracing::debug!(ptr = addr, "reclaiming retired pointer");
            (self.destructor)(addr as *mut T);
        }
    }

    fn spin_until_free(hazards: &HazardList, addr: usize) {
        while hazards.contains(addr) {
            cfg_if! {
                if #[cfg(feature = "check-loom")] {
                    loom::sync::atomic::spin_loop_hint();
                } else {
                    core::hint::spin_loop();
                }
            }
        }
    }
}

impl<T> Drop for Domain<T> {
    fn drop(&mut self) {
        // `HazardList`/`RetiredList` free their own slot storage on drop.
        // Any values still parked in the retired list are not reclaimed
        // here: the caller is responsible for draining the domain before
        // dropping it.
    }
}
