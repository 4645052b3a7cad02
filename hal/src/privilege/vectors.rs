//! # Trap Vector Management
//!
//! ## Vector Modes
//!
//! The mode field of `mtvec` (bits [1:0]) selects how traps are entered:
//!
//! - **Direct** (0): all traps jump to BASE
//! - **Vectored** (1): interrupts jump to BASE + 4*cause, exceptions to BASE
//! - **CLIC direct / vectored** (2, 3): core-local interrupt controller modes
//!
//! ## Vector Table Layout (Vectored Mode)
//!
//! ```text
//! BASE + 0x00: Exception handler (all exceptions)
//! BASE + 0x0C: Machine software interrupt
//! BASE + 0x1C: Machine timer interrupt
//! BASE + 0x2C: Machine external interrupt
//! every other slot: default vector
//! ```
//!
//! The handler behind each slot is a plain function pointer held in a
//! [`HandlerTable`]; the assembly table only funnels into the dispatcher.

use static_assertions::const_assert;

use crate::cpu::csr::{irq_cause, tvec};
use crate::driver::InterruptDriver;
use crate::error::{InterruptError, InterruptResult};
use crate::privilege::handlers;
use crate::privilege::traps::{ExceptionFrame, TrapCause, TrapOutcome};

// ============================================================================
// Trap Vector Configuration
// ============================================================================

/// Trap vector mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TrapVectorMode {
    /// Direct mode - all traps go to BASE
    Direct = 0,
    /// Vectored mode - interrupts go to BASE + 4*cause
    Vectored = 1,
    /// CLIC direct mode
    ClicDirect = 2,
    /// CLIC vectored mode
    ClicVectored = 3,
}

impl TrapVectorMode {
    /// Decode the mtvec mode field
    pub const fn from_bits(value: usize) -> Self {
        match value & tvec::MODE_MASK {
            0 => Self::Direct,
            1 => Self::Vectored,
            2 => Self::ClicDirect,
            _ => Self::ClicVectored,
        }
    }
}

/// Trap vector configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapVector {
    /// Base address of trap handler or table
    pub base: usize,
    /// Vector mode
    pub mode: TrapVectorMode,
}

impl TrapVector {
    /// Validate and build a trap vector
    pub const fn new(base: usize, mode: TrapVectorMode) -> InterruptResult<Self> {
        if base & tvec::MODE_MASK != 0 {
            return Err(InterruptError::MisalignedVectorBase(base));
        }
        Ok(Self { base, mode })
    }

    /// Encode as an mtvec value
    pub const fn to_mtvec(&self) -> usize {
        (self.base & tvec::BASE_MASK) | self.mode as usize
    }

    /// Decode an mtvec value
    pub const fn from_mtvec(mtvec: usize) -> Self {
        Self {
            base: mtvec & tvec::BASE_MASK,
            mode: TrapVectorMode::from_bits(mtvec),
        }
    }
}

// ============================================================================
// Vector Slots
// ============================================================================

/// Vectored-mode table entries (one per interrupt cause code)
pub const MAX_VECTORS: usize = 32;

const_assert!(MAX_VECTORS > irq_cause::MACHINE_EXTERNAL);

/// Interrupt slots with a dedicated handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorSlot {
    /// Machine software interrupt (cause 3)
    Software,
    /// Machine timer interrupt (cause 7)
    Timer,
    /// Machine external interrupt (cause 11)
    External,
    /// Every other interrupt cause
    Default,
}

impl VectorSlot {
    /// Slot serving interrupt cause `code`
    pub const fn from_code(code: usize) -> Self {
        match code {
            irq_cause::MACHINE_SOFTWARE => Self::Software,
            irq_cause::MACHINE_TIMER => Self::Timer,
            irq_cause::MACHINE_EXTERNAL => Self::External,
            _ => Self::Default,
        }
    }
}

// ============================================================================
// Handler Table
// ============================================================================

/// Interrupt handler run on the trap path
pub type InterruptHandler<B, C> = fn(&mut InterruptDriver<B, C>, TrapCause) -> TrapOutcome;

/// Exception handler run on the trap path
pub type ExceptionHandler<B, C> = fn(&mut InterruptDriver<B, C>, &ExceptionFrame) -> TrapOutcome;

/// Handlers behind the vector table
pub struct HandlerTable<B, C> {
    software: InterruptHandler<B, C>,
    timer: InterruptHandler<B, C>,
    external: InterruptHandler<B, C>,
    default_vector: InterruptHandler<B, C>,
    exception: ExceptionHandler<B, C>,
}

impl<B, C> HandlerTable<B, C>
where
    B: crate::mmio::RegisterBus + Copy,
    C: crate::cpu::ControlRegisters + Copy,
{
    /// Table populated with the stock handlers
    pub fn with_defaults() -> Self {
        Self {
            software: handlers::software::<B, C>,
            timer: handlers::timer::<B, C>,
            external: handlers::external::<B, C>,
            default_vector: handlers::default_vector::<B, C>,
            exception: handlers::exception::<B, C>,
        }
    }
}

impl<B, C> HandlerTable<B, C> {
    /// Handler for an interrupt slot
    pub fn interrupt(&self, slot: VectorSlot) -> InterruptHandler<B, C> {
        match slot {
            VectorSlot::Software => self.software,
            VectorSlot::Timer => self.timer,
            VectorSlot::External => self.external,
            VectorSlot::Default => self.default_vector,
        }
    }

    /// Replace an interrupt slot's handler
    pub fn set_interrupt(&mut self, slot: VectorSlot, handler: InterruptHandler<B, C>) {
        match slot {
            VectorSlot::Software => self.software = handler,
            VectorSlot::Timer => self.timer = handler,
            VectorSlot::External => self.external = handler,
            VectorSlot::Default => self.default_vector = handler,
        }
    }

    /// Exception handler
    pub fn exception(&self) -> ExceptionHandler<B, C> {
        self.exception
    }

    /// Replace the exception handler
    pub fn set_exception(&mut self, handler: ExceptionHandler<B, C>) {
        self.exception = handler;
    }
}

impl<B, C> Clone for HandlerTable<B, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B, C> Copy for HandlerTable<B, C> {}

impl<B, C> core::fmt::Debug for HandlerTable<B, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HandlerTable")
            .field("software", &(self.software as usize as *const ()))
            .field("timer", &(self.timer as usize as *const ()))
            .field("external", &(self.external as usize as *const ()))
            .field("default_vector", &(self.default_vector as usize as *const ()))
            .field("exception", &(self.exception as usize as *const ()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mtvec_encoding() {
        let vector = TrapVector::new(0x8000_0040, TrapVectorMode::Vectored).unwrap();
        assert_eq!(vector.to_mtvec(), 0x8000_0041);
        assert_eq!(TrapVector::from_mtvec(0x8000_0041), vector);

        for (bits, mode) in [
            (0, TrapVectorMode::Direct),
            (1, TrapVectorMode::Vectored),
            (2, TrapVectorMode::ClicDirect),
            (3, TrapVectorMode::ClicVectored),
        ] {
            assert_eq!(TrapVectorMode::from_bits(0x1000 | bits), mode);
            assert_eq!(mode as usize, bits);
        }
    }

    #[test]
    fn test_misaligned_base_rejected() {
        assert_eq!(
            TrapVector::new(0x8000_0002, TrapVectorMode::Vectored),
            Err(InterruptError::MisalignedVectorBase(0x8000_0002))
        );
    }

    #[test]
    fn test_slot_selection() {
        assert_eq!(VectorSlot::from_code(3), VectorSlot::Software);
        assert_eq!(VectorSlot::from_code(7), VectorSlot::Timer);
        assert_eq!(VectorSlot::from_code(11), VectorSlot::External);
        for code in [0, 1, 5, 9, 16, 31] {
            assert_eq!(VectorSlot::from_code(code), VectorSlot::Default);
        }
    }
}
