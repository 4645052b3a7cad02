//! # Trap Decoding and Dispatch State
//!
//! A trap is decoded from `mcause` into a [`TrapCause`], routed to the
//! handler for its vector slot, and finishes with a [`TrapOutcome`] telling
//! the assembly glue whether to `mret`, halt or exit.
//!
//! ## Dispatch States
//!
//! ```text
//!   Reset --install--> Installed --arm--> Armed <--> Dispatching
//!                                                       |
//!                                            Halt/Exit  v
//!                                                    Stopped
//! ```
//!
//! Handler registration and line configuration are only accepted before
//! `Armed`. Handlers run with interrupts masked and are never nested.

use crate::cpu::csr::{exception, irq_cause, CAUSE_CODE_MASK, CAUSE_INTERRUPT_BIT};
use crate::cpu::{ControlRegisters, Csr};
use crate::error::{InterruptError, InterruptResult};
use crate::privilege::vectors::{
    ExceptionHandler, HandlerTable, InterruptHandler, TrapVector, VectorSlot,
};

/// Exit code reported for a synchronous exception
pub const EXCEPTION_EXIT_CODE: i32 = 0xEE;

// ============================================================================
// Trap Cause
// ============================================================================

/// Decoded `mcause`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapCause {
    /// Asynchronous interrupt (true) or synchronous exception (false)
    pub is_interrupt: bool,
    /// Cause code
    pub code: usize,
}

impl TrapCause {
    /// Decode a raw `mcause` value
    pub const fn decode(mcause: usize) -> Self {
        Self {
            is_interrupt: mcause & CAUSE_INTERRUPT_BIT != 0,
            code: mcause & CAUSE_CODE_MASK,
        }
    }

    /// Vector slot for an interrupt, `None` for exceptions
    pub const fn slot(&self) -> Option<VectorSlot> {
        if self.is_interrupt {
            Some(VectorSlot::from_code(self.code))
        } else {
            None
        }
    }

    /// Human-readable cause name
    pub const fn name(&self) -> &'static str {
        if self.is_interrupt {
            match self.code {
                irq_cause::MACHINE_SOFTWARE => "Machine software interrupt",
                irq_cause::MACHINE_TIMER => "Machine timer interrupt",
                irq_cause::MACHINE_EXTERNAL => "Machine external interrupt",
                1 => "Supervisor software interrupt",
                5 => "Supervisor timer interrupt",
                9 => "Supervisor external interrupt",
                code if code >= irq_cause::LOCAL_BASE => "Platform local interrupt",
                _ => "Reserved interrupt",
            }
        } else {
            match self.code {
                exception::INSTRUCTION_MISALIGNED => "Instruction address misaligned",
                exception::INSTRUCTION_ACCESS_FAULT => "Instruction access fault",
                exception::ILLEGAL_INSTRUCTION => "Illegal instruction",
                exception::BREAKPOINT => "Breakpoint",
                exception::LOAD_MISALIGNED => "Load address misaligned",
                exception::LOAD_ACCESS_FAULT => "Load access fault",
                exception::STORE_MISALIGNED => "Store/AMO address misaligned",
                exception::STORE_ACCESS_FAULT => "Store/AMO access fault",
                exception::ECALL_FROM_U => "Environment call from U-mode",
                exception::ECALL_FROM_S => "Environment call from S-mode",
                exception::ECALL_FROM_M => "Environment call from M-mode",
                exception::INSTRUCTION_PAGE_FAULT => "Instruction page fault",
                exception::LOAD_PAGE_FAULT => "Load page fault",
                exception::STORE_PAGE_FAULT => "Store/AMO page fault",
                _ => "Reserved exception",
            }
        }
    }
}

impl core::fmt::Display for TrapCause {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({})", self.name(), self.code)
    }
}

/// Trap-time CSR snapshot handed to the exception handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionFrame {
    /// Raw mcause
    pub mcause: usize,
    /// Faulting PC
    pub mepc: usize,
    /// Faulting address or instruction bits
    pub mtval: usize,
}

impl ExceptionFrame {
    /// Capture from the trap CSRs
    pub fn capture<C: ControlRegisters>(csr: &C) -> Self {
        Self {
            mcause: csr.read(Csr::Mcause),
            mepc: csr.read(Csr::Mepc),
            mtval: csr.read(Csr::Mtval),
        }
    }

    /// Decoded cause
    pub const fn cause(&self) -> TrapCause {
        TrapCause::decode(self.mcause)
    }
}

// ============================================================================
// Outcome and State
// ============================================================================

/// What the glue does after a handler returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapOutcome {
    /// Return to the interrupted code
    Resume,
    /// Stop the hart
    Halt,
    /// Report an exit code and stop
    Exit(i32),
}

/// Driver lifecycle as seen by the trap path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Nothing installed
    Reset,
    /// mtvec written, interrupts still disabled
    Installed,
    /// Interrupts enabled
    Armed,
    /// Inside a handler
    Dispatching,
    /// A handler halted the hart
    Stopped,
}

impl DispatchState {
    /// Whether configuration is frozen
    pub const fn is_armed(self) -> bool {
        matches!(self, Self::Armed | Self::Dispatching | Self::Stopped)
    }
}

/// Handler table plus lifecycle bookkeeping
#[derive(Debug, Clone, Copy)]
pub struct TrapDispatcher<B, C> {
    state: DispatchState,
    vector: Option<TrapVector>,
    handlers: HandlerTable<B, C>,
}

impl<B, C> TrapDispatcher<B, C> {
    /// Start in `Reset` with the given handlers
    pub const fn new(handlers: HandlerTable<B, C>) -> Self {
        Self {
            state: DispatchState::Reset,
            vector: None,
            handlers,
        }
    }

    /// Current state
    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Installed vector, if any
    pub fn vector(&self) -> Option<TrapVector> {
        self.vector
    }

    /// Handler table
    pub fn handlers(&self) -> &HandlerTable<B, C> {
        &self.handlers
    }

    fn ensure_unarmed(&self) -> InterruptResult<()> {
        if self.state.is_armed() {
            Err(InterruptError::AlreadyArmed)
        } else {
            Ok(())
        }
    }

    /// Record the installed vector
    pub fn install(&mut self, vector: TrapVector) -> InterruptResult<()> {
        self.ensure_unarmed()?;
        self.vector = Some(vector);
        self.state = DispatchState::Installed;
        Ok(())
    }

    /// Move to `Armed`
    pub fn arm(&mut self) -> InterruptResult<()> {
        match self.state {
            DispatchState::Reset => Err(InterruptError::NotInstalled),
            DispatchState::Installed => {
                self.state = DispatchState::Armed;
                Ok(())
            },
            _ => Err(InterruptError::AlreadyArmed),
        }
    }

    /// Fail if configuration is frozen
    pub fn check_configurable(&self) -> InterruptResult<()> {
        self.ensure_unarmed()
    }

    /// Replace an interrupt handler
    pub fn register_interrupt(
        &mut self,
        slot: VectorSlot,
        handler: InterruptHandler<B, C>,
    ) -> InterruptResult<()> {
        self.ensure_unarmed()?;
        self.handlers.set_interrupt(slot, handler);
        Ok(())
    }

    /// Replace the exception handler
    pub fn register_exception(&mut self, handler: ExceptionHandler<B, C>) -> InterruptResult<()> {
        self.ensure_unarmed()?;
        self.handlers.set_exception(handler);
        Ok(())
    }

    /// Enter a handler, returning the state to restore
    pub fn enter(&mut self) -> DispatchState {
        let previous = self.state;
        self.state = DispatchState::Dispatching;
        previous
    }

    /// Leave a handler
    pub fn leave(&mut self, previous: DispatchState, outcome: TrapOutcome) {
        self.state = match outcome {
            TrapOutcome::Resume => previous,
            TrapOutcome::Halt | TrapOutcome::Exit(_) => DispatchState::Stopped,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_interrupt() {
        let cause = TrapCause::decode(CAUSE_INTERRUPT_BIT | 11);
        assert!(cause.is_interrupt);
        assert_eq!(cause.code, 11);
        assert_eq!(cause.slot(), Some(VectorSlot::External));
        assert_eq!(cause.name(), "Machine external interrupt");
    }

    #[test]
    fn test_decode_exception() {
        let cause = TrapCause::decode(7);
        assert!(!cause.is_interrupt);
        assert_eq!(cause.code, 7);
        assert_eq!(cause.slot(), None);
        assert_eq!(cause.name(), "Store/AMO access fault");
        assert_eq!(cause.to_string(), "Store/AMO access fault (7)");
    }

    #[test]
    fn test_code_mask() {
        let cause = TrapCause::decode(CAUSE_INTERRUPT_BIT | 0x1_0403);
        assert_eq!(cause.code, 0x003);
        assert_eq!(TrapCause::decode(CAUSE_INTERRUPT_BIT | 20).name(), "Platform local interrupt");
    }
}
