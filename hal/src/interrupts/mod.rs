//! # Interrupt Controller Framework
//!
//! ## Submodules
//!
//! - `plic`: Platform-Level Interrupt Controller (external interrupts)
//! - `lines`: board device-to-line mapping
//! - `demux`: routing of claimed lines to device routines
//!
//! This module also owns the hart-local side: the global enable in
//! `mstatus` and the per-cause enables in `mie`.

pub mod demux;
pub mod lines;
pub mod plic;

pub use demux::{DeviceDemux, DeviceRoutine};
pub use lines::{LineMapping, LineSource, MAX_DEVICES};
pub use plic::{ClaimToken, InterruptLine, LineId, Plic, PlicContext, PlicLayout};

use crate::cpu::csr::{irq_cause, LOCAL_INTERRUPT_COUNT, LOCAL_INTERRUPT_SHIFT};
use crate::cpu::{ControlRegisters, Csr, LocalEnable, MachineStatus};

// ============================================================================
// Local Interrupt Causes
// ============================================================================

/// Hart-local interrupt causes with an `mie` enable bit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalCause {
    /// Machine software interrupt
    Software,
    /// Machine timer interrupt
    Timer,
    /// Machine external interrupt (from PLIC)
    External,
    /// Platform-local interrupt `n` (mie bit 16 + n)
    Local(u8),
}

impl LocalCause {
    /// Get the `mie` bit(s) for this cause
    ///
    /// Local ids that do not fit in the register map to no bits.
    pub fn enable_bits(self) -> LocalEnable {
        match self {
            Self::Software => LocalEnable::SOFTWARE,
            Self::Timer => LocalEnable::TIMER,
            Self::External => LocalEnable::EXTERNAL,
            Self::Local(id) if id < LOCAL_INTERRUPT_COUNT => {
                LocalEnable::from_bits_retain(1 << (LOCAL_INTERRUPT_SHIFT + id as u32))
            },
            Self::Local(_) => LocalEnable::empty(),
        }
    }

    /// Get the interrupt cause code
    pub const fn cause_code(self) -> usize {
        match self {
            Self::Software => irq_cause::MACHINE_SOFTWARE,
            Self::Timer => irq_cause::MACHINE_TIMER,
            Self::External => irq_cause::MACHINE_EXTERNAL,
            Self::Local(id) => irq_cause::LOCAL_BASE + id as usize,
        }
    }
}

// ============================================================================
// Interrupt Control
// ============================================================================

/// Global and per-cause interrupt enables of the current hart
#[derive(Debug, Clone, Copy)]
pub struct LocalInterruptMask<C> {
    csr: C,
}

impl<C: ControlRegisters> LocalInterruptMask<C> {
    /// Wrap a CSR accessor
    pub const fn new(csr: C) -> Self {
        Self { csr }
    }

    /// Enable global interrupts (mstatus.MIE)
    #[inline]
    pub fn global_enable(&self) {
        self.csr.set_bits(Csr::Mstatus, MachineStatus::MIE.bits());
    }

    /// Disable global interrupts (mstatus.MIE)
    #[inline]
    pub fn global_disable(&self) {
        self.csr.clear_bits(Csr::Mstatus, MachineStatus::MIE.bits());
    }

    /// Disable global interrupts and return previous state
    #[inline]
    pub fn global_disable_save(&self) -> bool {
        let old = self.csr.clear_bits(Csr::Mstatus, MachineStatus::MIE.bits());
        MachineStatus::from_bits_truncate(old).contains(MachineStatus::MIE)
    }

    /// Check mstatus.MIE
    #[inline]
    pub fn globally_enabled(&self) -> bool {
        MachineStatus::from_bits_truncate(self.csr.read(Csr::Mstatus))
            .contains(MachineStatus::MIE)
    }

    /// Enable one cause in mie
    #[inline]
    pub fn enable(&self, cause: LocalCause) {
        self.enable_set(cause.enable_bits());
    }

    /// Disable one cause in mie
    #[inline]
    pub fn disable(&self, cause: LocalCause) {
        self.csr.clear_bits(Csr::Mie, cause.enable_bits().bits());
    }

    /// Enable several causes at once
    #[inline]
    pub fn enable_set(&self, set: LocalEnable) {
        if !set.is_empty() {
            self.csr.set_bits(Csr::Mie, set.bits());
        }
    }

    /// Check if a cause is enabled
    pub fn is_enabled(&self, cause: LocalCause) -> bool {
        let bits = cause.enable_bits();
        !bits.is_empty() && self.enabled().contains(bits)
    }

    /// Current mie contents
    pub fn enabled(&self) -> LocalEnable {
        LocalEnable::from_bits_retain(self.csr.read(Csr::Mie))
    }

    /// Check if a cause is pending in mip
    pub fn is_pending(&self, cause: LocalCause) -> bool {
        let bits = cause.enable_bits().bits();
        bits != 0 && self.csr.read(Csr::Mip) & bits == bits
    }
}

// ============================================================================
// Interrupt Statistics
// ============================================================================

/// Interrupt statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterruptStats {
    /// Number of timer interrupts
    pub timer_count: u64,
    /// Number of software interrupts
    pub software_count: u64,
    /// Number of claimed external interrupts
    pub external_count: u64,
    /// External traps whose claim returned 0
    pub spurious_claims: u64,
    /// Lines still pending after their routine returned
    pub pending_anomalies: u64,
    /// Causes that landed on the default vector
    pub default_vector_hits: u64,
    /// Per-line counts (first 64 lines)
    pub irq_counts: [u64; 64],
}

impl InterruptStats {
    /// Create new stats
    pub const fn new() -> Self {
        Self {
            timer_count: 0,
            software_count: 0,
            external_count: 0,
            spurious_claims: 0,
            pending_anomalies: 0,
            default_vector_hits: 0,
            irq_counts: [0; 64],
        }
    }

    /// Record a timer interrupt
    pub fn record_timer(&mut self) {
        self.timer_count += 1;
    }

    /// Record a software interrupt
    pub fn record_software(&mut self) {
        self.software_count += 1;
    }

    /// Record a claimed external interrupt
    pub fn record_external(&mut self, line: LineId) {
        self.external_count += 1;
        if let Some(count) = self.irq_counts.get_mut(line as usize) {
            *count += 1;
        }
    }

    /// Record an external trap with nothing to claim
    pub fn record_spurious(&mut self) {
        self.spurious_claims += 1;
    }

    /// Record a line still pending after service
    pub fn record_pending_anomaly(&mut self) {
        self.pending_anomalies += 1;
    }

    /// Record a default-vector trap
    pub fn record_default_vector(&mut self) {
        self.default_vector_hits += 1;
    }

    /// Get total interrupt count
    pub fn total(&self) -> u64 {
        self.timer_count + self.software_count + self.external_count
    }
}

impl Default for InterruptStats {
    fn default() -> Self {
        Self::new()
    }
}
