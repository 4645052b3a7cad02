//! # RISC-V Machine-Mode Glue
//!
//! - [`MachineCsr`]: `csrr`/`csrw`/`csrrs`/`csrrc` behind [`ControlRegisters`]
//! - `plic_vector_table`: 64-byte aligned vectored-mode table
//! - `plic_trap_entry`: saves caller-saved registers, calls into Rust, `mret`s
//!
//! Every table slot funnels into the same entry; the Rust side decodes
//! `mcause` and picks the handler. Callee-saved registers are preserved by
//! the Rust code itself.

use core::arch::{asm, global_asm};

use static_assertions::const_assert_eq;

use crate::cpu::{ControlRegisters, Csr};
use crate::privilege::traps::TrapOutcome;
use crate::privilege::vectors::MAX_VECTORS;

// ============================================================================
// CSR Access
// ============================================================================

macro_rules! read_csr {
    ($name:literal) => {{
        let value: usize;
        // SAFETY: reading a machine CSR has no side effects
        unsafe {
            asm!(concat!("csrr {0}, ", $name), out(reg) value, options(nomem, nostack, preserves_flags))
        };
        value
    }};
}

macro_rules! write_csr {
    ($name:literal, $value:expr) => {
        // SAFETY: we run in M-mode; the caller owns the CSR's semantics
        unsafe { asm!(concat!("csrw ", $name, ", {0}"), in(reg) $value, options(nostack, preserves_flags)) }
    };
}

macro_rules! set_csr {
    ($name:literal, $mask:expr) => {{
        let old: usize;
        // SAFETY: see `write_csr`
        unsafe {
            asm!(concat!("csrrs {0}, ", $name, ", {1}"), out(reg) old, in(reg) $mask, options(nostack, preserves_flags))
        };
        old
    }};
}

macro_rules! clear_csr {
    ($name:literal, $mask:expr) => {{
        let old: usize;
        // SAFETY: see `write_csr`
        unsafe {
            asm!(concat!("csrrc {0}, ", $name, ", {1}"), out(reg) old, in(reg) $mask, options(nostack, preserves_flags))
        };
        old
    }};
}

/// Expand `$op!` for every writable CSR; `time` takes the fallback
macro_rules! with_csr {
    ($csr:expr, $op:ident, $time:expr $(, $arg:expr)?) => {
        match $csr {
            Csr::Mstatus => $op!("mstatus" $(, $arg)?),
            Csr::Mie => $op!("mie" $(, $arg)?),
            Csr::Mip => $op!("mip" $(, $arg)?),
            Csr::Mtvec => $op!("mtvec" $(, $arg)?),
            Csr::Mcause => $op!("mcause" $(, $arg)?),
            Csr::Mepc => $op!("mepc" $(, $arg)?),
            Csr::Mtval => $op!("mtval" $(, $arg)?),
            Csr::Time => $time,
        }
    };
}

/// Machine CSRs of the executing hart
#[derive(Debug, Clone, Copy)]
pub struct MachineCsr {
    _private: (),
}

impl MachineCsr {
    /// Create the accessor
    ///
    /// # Safety
    /// The caller must be executing in machine mode.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl ControlRegisters for MachineCsr {
    #[inline]
    fn read(&self, csr: Csr) -> usize {
        with_csr!(csr, read_csr, read_csr!("time"))
    }

    #[inline]
    fn write(&self, csr: Csr, value: usize) {
        with_csr!(csr, write_csr, log::warn!("time CSR is read-only, write dropped"), value)
    }

    #[inline]
    fn set_bits(&self, csr: Csr, mask: usize) -> usize {
        with_csr!(
            csr,
            set_csr,
            {
                log::warn!("time CSR is read-only, set dropped");
                read_csr!("time")
            },
            mask
        )
    }

    #[inline]
    fn clear_bits(&self, csr: Csr, mask: usize) -> usize {
        with_csr!(
            csr,
            clear_csr,
            {
                log::warn!("time CSR is read-only, clear dropped");
                read_csr!("time")
            },
            mask
        )
    }

    #[cfg(target_arch = "riscv32")]
    fn read_time(&self) -> u64 {
        // Re-read when the low half wraps between the two high reads.
        loop {
            let hi = read_csr!("timeh");
            let lo = read_csr!("time");
            if read_csr!("timeh") == hi {
                return ((hi as u64) << 32) | lo as u64;
            }
        }
    }
}

// ============================================================================
// Vector Table and Trap Entry
// ============================================================================

// The table below emits one `j` per cause code.
const_assert_eq!(MAX_VECTORS, 32);

macro_rules! trap_entry_asm {
    ($store:literal, $load:literal, $regbytes:literal) => {
        global_asm!(
            concat!(".equ REGBYTES, ", $regbytes),
            ".macro SAVE_REG reg, slot",
            concat!("    ", $store, " \\reg, \\slot*REGBYTES(sp)"),
            ".endm",
            ".macro LOAD_REG reg, slot",
            concat!("    ", $load, " \\reg, \\slot*REGBYTES(sp)"),
            ".endm",
            "",
            ".pushsection .text.plic_trap, \"ax\"",
            ".balign 64",
            ".global plic_vector_table",
            "plic_vector_table:",
            ".rept 32",
            "    j plic_trap_entry",
            ".endr",
            "",
            ".balign 4",
            ".global plic_trap_entry",
            "plic_trap_entry:",
            "    addi sp, sp, -16*REGBYTES",
            "    SAVE_REG ra, 0",
            "    SAVE_REG t0, 1",
            "    SAVE_REG t1, 2",
            "    SAVE_REG t2, 3",
            "    SAVE_REG a0, 4",
            "    SAVE_REG a1, 5",
            "    SAVE_REG a2, 6",
            "    SAVE_REG a3, 7",
            "    SAVE_REG a4, 8",
            "    SAVE_REG a5, 9",
            "    SAVE_REG a6, 10",
            "    SAVE_REG a7, 11",
            "    SAVE_REG t3, 12",
            "    SAVE_REG t4, 13",
            "    SAVE_REG t5, 14",
            "    SAVE_REG t6, 15",
            "    call plic_trap_rust",
            "    LOAD_REG ra, 0",
            "    LOAD_REG t0, 1",
            "    LOAD_REG t1, 2",
            "    LOAD_REG t2, 3",
            "    LOAD_REG a0, 4",
            "    LOAD_REG a1, 5",
            "    LOAD_REG a2, 6",
            "    LOAD_REG a3, 7",
            "    LOAD_REG a4, 8",
            "    LOAD_REG a5, 9",
            "    LOAD_REG a6, 10",
            "    LOAD_REG a7, 11",
            "    LOAD_REG t3, 12",
            "    LOAD_REG t4, 13",
            "    LOAD_REG t5, 14",
            "    LOAD_REG t6, 15",
            "    addi sp, sp, 16*REGBYTES",
            "    mret",
            ".popsection",
        );
    };
}

#[cfg(target_arch = "riscv64")]
trap_entry_asm!("sd", "ld", "8");

#[cfg(target_arch = "riscv32")]
trap_entry_asm!("sw", "lw", "4");

extern "C" {
    static plic_vector_table: u8;
}

/// Address of the vectored-mode table, ready for `mtvec`
pub fn vector_table_base() -> usize {
    // SAFETY: only the address of the symbol is taken
    unsafe { core::ptr::addr_of!(plic_vector_table) as usize }
}

// ============================================================================
// Rust Trap Hooks
// ============================================================================

/// Board callbacks invoked from the trap entry
#[derive(Debug, Clone, Copy)]
pub struct TrapHooks {
    /// Run the driver's dispatcher
    pub dispatch: fn() -> TrapOutcome,
    /// Report an exit code and never return
    pub exit: fn(i32) -> !,
}

static HOOKS: spin::Once<TrapHooks> = spin::Once::new();

/// Install the trap callbacks (first call wins)
pub fn install_hooks(hooks: TrapHooks) -> &'static TrapHooks {
    HOOKS.call_once(|| hooks)
}

#[no_mangle]
extern "C" fn plic_trap_rust() {
    let Some(hooks) = HOOKS.get() else {
        halt();
    };

    match (hooks.dispatch)() {
        TrapOutcome::Resume => {},
        TrapOutcome::Halt => halt(),
        TrapOutcome::Exit(code) => (hooks.exit)(code),
    }
}

/// Stop this hart
pub fn halt() -> ! {
    loop {
        core::hint::spin_loop();
    }
}

/// Sleep until the next interrupt, forever
pub fn idle() -> ! {
    loop {
        // SAFETY: wfi has no architectural side effects beyond stalling
        unsafe { asm!("wfi", options(nomem, nostack, preserves_flags)) };
    }
}
