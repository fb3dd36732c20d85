use thiserror::Error;

/// Failure modes surfaced by a [`Domain`](crate::Domain).
///
/// The only failure this crate's algorithms can produce is an allocation
/// failure while publishing a hazard; everything else (a legitimately empty
/// protected slot, a superseded read) is handled internally by the retry
/// loops in [`Domain::load`](crate::Domain::load) and is not an error.
#[derive(Debug, Error)]
pub enum HazardError {
    /// A new hazard slot could not be allocated.
    ///
    /// When this is returned, no hazard was published and, for `swap`, the
    /// protected slot was left untouched.
    #[error("failed to allocate a hazard slot")]
    Allocation,
}
