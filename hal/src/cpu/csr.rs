//! # Machine-Mode Control and Status Registers (CSRs)
//!
//! The subset of machine-level CSRs the interrupt path touches, the bit
//! layouts of `mstatus` and `mie`, and the [`ControlRegisters`] seam through
//! which the rest of the crate reads and modifies them.
//!
//! On RISC-V targets the seam is implemented by `arch::riscv::MachineCsr`
//! with `csrr`/`csrw`/`csrrs`/`csrrc`. Host tests use `sim::SimCsr`.

use bitflags::bitflags;

// ============================================================================
// CSR Identifiers
// ============================================================================

/// Machine-level CSRs used by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Csr {
    /// Machine status register
    Mstatus,
    /// Machine interrupt enable
    Mie,
    /// Machine interrupt pending
    Mip,
    /// Machine trap handler base address and mode
    Mtvec,
    /// Machine trap cause
    Mcause,
    /// Machine exception program counter
    Mepc,
    /// Machine trap value
    Mtval,
    /// Timer counter (read-only shadow of mtime)
    Time,
}

impl Csr {
    /// Number of distinct CSRs in this set
    pub const COUNT: usize = 8;

    /// Architectural CSR address
    pub const fn address(self) -> u16 {
        match self {
            Self::Mstatus => 0x300,
            Self::Mie => 0x304,
            Self::Mtvec => 0x305,
            Self::Mepc => 0x341,
            Self::Mcause => 0x342,
            Self::Mtval => 0x343,
            Self::Mip => 0x344,
            Self::Time => 0xC01,
        }
    }

    /// Dense index, used by the simulator
    pub const fn index(self) -> usize {
        match self {
            Self::Mstatus => 0,
            Self::Mie => 1,
            Self::Mip => 2,
            Self::Mtvec => 3,
            Self::Mcause => 4,
            Self::Mepc => 5,
            Self::Mtval => 6,
            Self::Time => 7,
        }
    }
}

// ============================================================================
// Register Bit Layouts
// ============================================================================

bitflags! {
    /// mstatus bits relevant to interrupt delivery
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MachineStatus: usize {
        /// Machine interrupt enable (global)
        const MIE = 1 << 3;
        /// Previous MIE, restored by mret
        const MPIE = 1 << 7;
    }
}

bitflags! {
    /// mie bits: one enable per local interrupt cause
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LocalEnable: usize {
        /// Machine software interrupt
        const SOFTWARE = 1 << 3;
        /// Machine timer interrupt
        const TIMER = 1 << 7;
        /// Machine external interrupt (PLIC)
        const EXTERNAL = 1 << 11;
        /// Platform-local interrupts 0..15 (bits 16..31)
        const LOCAL_ALL = 0xFFFF << 16;
    }
}

/// First mie bit used by platform-local interrupts
pub const LOCAL_INTERRUPT_SHIFT: u32 = 16;

/// Number of platform-local interrupt lines
pub const LOCAL_INTERRUPT_COUNT: u8 = 16;

// ============================================================================
// Trap Cause Encoding
// ============================================================================

/// mcause interrupt flag (top bit for the native XLEN)
pub const CAUSE_INTERRUPT_BIT: usize = 1 << (usize::BITS - 1);

/// mcause exception code field
pub const CAUSE_CODE_MASK: usize = 0x3FF;

/// Machine-mode interrupt cause codes
pub mod irq_cause {
    /// Machine software interrupt
    pub const MACHINE_SOFTWARE: usize = 3;
    /// Machine timer interrupt
    pub const MACHINE_TIMER: usize = 7;
    /// Machine external interrupt
    pub const MACHINE_EXTERNAL: usize = 11;
    /// First platform-local interrupt
    pub const LOCAL_BASE: usize = 16;
}

/// Synchronous exception codes
pub mod exception {
    /// Instruction address misaligned
    pub const INSTRUCTION_MISALIGNED: usize = 0;
    /// Instruction access fault
    pub const INSTRUCTION_ACCESS_FAULT: usize = 1;
    /// Illegal instruction
    pub const ILLEGAL_INSTRUCTION: usize = 2;
    /// Breakpoint
    pub const BREAKPOINT: usize = 3;
    /// Load address misaligned
    pub const LOAD_MISALIGNED: usize = 4;
    /// Load access fault
    pub const LOAD_ACCESS_FAULT: usize = 5;
    /// Store/AMO address misaligned
    pub const STORE_MISALIGNED: usize = 6;
    /// Store/AMO access fault
    pub const STORE_ACCESS_FAULT: usize = 7;
    /// Environment call from U-mode
    pub const ECALL_FROM_U: usize = 8;
    /// Environment call from S-mode
    pub const ECALL_FROM_S: usize = 9;
    /// Environment call from M-mode
    pub const ECALL_FROM_M: usize = 11;
    /// Instruction page fault
    pub const INSTRUCTION_PAGE_FAULT: usize = 12;
    /// Load page fault
    pub const LOAD_PAGE_FAULT: usize = 13;
    /// Store/AMO page fault
    pub const STORE_PAGE_FAULT: usize = 15;
}

/// mtvec field layout
pub mod tvec {
    /// Mode field (bits [1:0])
    pub const MODE_MASK: usize = 0b11;
    /// Base field
    pub const BASE_MASK: usize = !0b11;
}

// ============================================================================
// Access Seam
// ============================================================================

/// Read and atomically modify machine CSRs
///
/// `set_bits` and `clear_bits` must be single read-modify-write operations
/// (`csrrs`/`csrrc` on hardware) and return the value before the update.
pub trait ControlRegisters {
    /// Read a CSR
    fn read(&self, csr: Csr) -> usize;

    /// Write a CSR
    fn write(&self, csr: Csr, value: usize);

    /// Set bits, returning the previous value
    fn set_bits(&self, csr: Csr, mask: usize) -> usize;

    /// Clear bits, returning the previous value
    fn clear_bits(&self, csr: Csr, mask: usize) -> usize;

    /// Full 64-bit value of the `time` counter
    ///
    /// XLEN-wide reads only see the low half on RV32; implementations for
    /// such harts combine `time` with `timeh`.
    #[inline]
    fn read_time(&self) -> u64 {
        self.read(Csr::Time) as u64
    }
}

impl<T: ControlRegisters + ?Sized> ControlRegisters for &T {
    #[inline]
    fn read(&self, csr: Csr) -> usize {
        (**self).read(csr)
    }

    #[inline]
    fn write(&self, csr: Csr, value: usize) {
        (**self).write(csr, value);
    }

    #[inline]
    fn set_bits(&self, csr: Csr, mask: usize) -> usize {
        (**self).set_bits(csr, mask)
    }

    #[inline]
    fn clear_bits(&self, csr: Csr, mask: usize) -> usize {
        (**self).clear_bits(csr, mask)
    }

    #[inline]
    fn read_time(&self) -> u64 {
        (**self).read_time()
    }
}
