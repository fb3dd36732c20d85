//! A hazard-pointer reclamation domain.
//!
//! This crate provides [`Domain`], a lock-free safe-memory-reclamation (SMR)
//! primitive: a set of registered hazard records, a retired-object list, and
//! the algorithms coordinating them so that many threads can read, replace,
//! and eventually free heap-resident objects referenced through a shared
//! atomic slot, without locks and without use-after-free.
//!
//! A reader publishes a hazard on whatever it [`Domain::load`]s from a
//! protected slot, and clears it with [`Domain::release`] once done. A writer
//! [`Domain::swap`]s a new pointer into the slot and hands the previous one
//! to [`Domain::cleanup_ptr`], which frees it immediately if no hazard
//! protects it, or parks/spins according to the chosen [`ReclaimPolicy`]. A
//! dedicated reclaimer thread can periodically drive [`Domain::cleanup`] to
//! drain anything parked by [`ReclaimPolicy::Defer`].
//!
//! The domain is a first-class value with its own lifecycle: there is no
//! crate-level global hazard registry. Dropping a [`Domain`] frees its
//! internal bookkeeping but does not run the destructor on anything still
//! parked in its retired list — the caller must drain the domain (via
//! [`Domain::cleanup`]) while quiesced before dropping it.
//!
//! ```
//! use std::sync::atomic::AtomicPtr;
//! use hazptr_domain::{Domain, ReclaimPolicy};
//!
//! let domain = Domain::new(|p: *mut u32| drop(unsafe { Box::from_raw(p) }));
//! let slot = AtomicPtr::new(Box::into_raw(Box::new(1u32)));
//!
//! // reader
//! let v = domain.load(&slot).unwrap();
//! unsafe { domain.release(v) };
//!
//! // writer
//! let new = Box::into_raw(Box::new(2u32));
//! let old = domain.swap(&slot, new).unwrap();
//! unsafe {
//!     domain.release(new);
//!     domain.cleanup_ptr(old, ReclaimPolicy::Defer);
//! }
//!
//! // reclaimer
//! domain.cleanup(ReclaimPolicy::Defer);
//!
//! # let last = slot.load(std::sync::atomic::Ordering::SeqCst);
//! # drop(unsafe { Box::from_raw(last) });
//! ```

mod domain;
mod error;
mod hazard;
mod retired;
mod slot_list;

pub use crate::domain::{Domain, ReclaimPolicy};
pub use crate::error::HazardError;
