//! Loom model-checked interleavings for the racier scenarios in the
//! domain's reader/writer protocol. Run with:
//!
//! ```text
//! RUSTFLAGS="--cfg loom" cargo test --test loom --features check-loom --release
//! ```

#![cfg(feature = "check-loom")]

use hazptr_domain::{Domain, ReclaimPolicy};
use loom::sync::Arc;
use loom::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};
use loom::thread;

fn leak(v: u32) -> *mut u32 {
    Box::into_raw(Box::new(v))
}

// S6: a reader racing a writer's swap-then-retire must never observe a
// value after its destructor has run, and the writer's blocking retire must
// not return until the reader has released its hazard.
#[test]
fn load_race_with_blocking_retire() {
    loom::model(|| {
        let reclaimed = Arc::new(AtomicUsize::new(0));
        let domain = Arc::new(Domain::new({
            let reclaimed = Arc::clone(&reclaimed);
            move |p: *mut u32| {
                drop(unsafe { Box::from_raw(p) });
                reclaimed.fetch_add(1, Ordering::SeqCst);
            }
        }));

        let a = leak(1);
        let b = leak(2);
        let slot = Arc::new(AtomicPtr::new(a));

        let reader = {
            let domain = Arc::clone(&domain);
            let slot = Arc::clone(&slot);
            thread::spawn(move || {
                let v = domain.load(&slot).unwrap();
                unsafe { domain.release(v) };
                v
            })
        };

        let old = domain.swap(&slot, b).unwrap();
        unsafe {
            domain.release(b);
            // BLOCK: must not return until the reader's hazard (if any) on
            // `old` clears, and the destructor must not observe anyone else
            // still holding it.
            domain.cleanup_ptr(old, ReclaimPolicy::Block);
        }

        reader.join().unwrap();

        let remaining = slot.load(Ordering::SeqCst);
        drop(unsafe { Box::from_raw(remaining) });

        assert_eq!(reclaimed.load(Ordering::SeqCst), 1);
    });
}

// S3/S4 collapsed: a deferred retirement only reclaims once every hazard on
// it has cleared, whether the reader releases before or after the retire
// call races in.
#[test]
fn deferred_retire_waits_for_reader_release() {
    loom::model(|| {
        let reclaimed = Arc::new(AtomicUsize::new(0));
        let domain = Arc::new(Domain::new({
            let reclaimed = Arc::clone(&reclaimed);
            move |p: *mut u32| {
                drop(unsafe { Box::from_raw(p) });
                reclaimed.fetch_add(1, Ordering::SeqCst);
            }
        }));

        let a = leak(1);
        let b = leak(2);
        let slot = Arc::new(AtomicPtr::new(a));

        let reader = {
            let domain = Arc::clone(&domain);
            let slot = Arc::clone(&slot);
            thread::spawn(move || {
                let v = domain.load(&slot).unwrap();
                unsafe { domain.release(v) };
            })
        };

        let old = domain.swap(&slot, b).unwrap();
        unsafe {
            domain.release(b);
            domain.cleanup_ptr(old, ReclaimPolicy::Defer);
        }

        reader.join().unwrap();
        domain.cleanup(ReclaimPolicy::Defer);

        let remaining = slot.load(Ordering::SeqCst);
        drop(unsafe { Box::from_raw(remaining) });

        assert_eq!(reclaimed.load(Ordering::SeqCst), 1);
    });
}
