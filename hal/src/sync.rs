//! # Trap-Context Sharing
//!
//! On a single hart the trap path and the boot path never run at the same
//! time once interrupts are masked around handlers, so the driver state they
//! share needs no lock. [`TrapCell`] expresses that contract.

use core::cell::UnsafeCell;

/// Interior-mutable slot shared between boot code and the trap path
pub struct TrapCell<T> {
    inner: UnsafeCell<T>,
}

// SAFETY: access is serialised by the single-hart, non-nesting trap
// discipline documented on `get_mut`.
unsafe impl<T: Send> Sync for TrapCell<T> {}

impl<T> TrapCell<T> {
    /// Wrap a value
    pub const fn new(value: T) -> Self {
        Self {
            inner: UnsafeCell::new(value),
        }
    }

    /// Borrow the value mutably
    ///
    /// # Safety
    /// No other reference obtained from this cell may be used while the
    /// returned one is live. This holds on the trap path of a single hart
    /// with interrupts masked. On the boot path the borrow may span the
    /// point where interrupts are armed only if arming is its final use:
    /// nothing may read or write through it once `mstatus.MIE` is set.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get_mut(&self) -> &mut T {
        // SAFETY: exclusivity is guaranteed by the caller
        unsafe { &mut *self.inner.get() }
    }

    /// Unwrap the value
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T> core::fmt::Debug for TrapCell<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TrapCell").finish_non_exhaustive()
    }
}
