//! # PLIC Hardware Abstraction Layer
//!
//! Machine-mode interrupt handling for a single RISC-V hart behind a
//! SiFive-compatible Platform-Level Interrupt Controller.
//!
//! ## Layers
//!
//! ```text
//! +-----------------------------------------------------------+
//! |  driver: InterruptDriver (boot sequence, trap dispatch)   |
//! +----------------------------+------------------------------+
//! |  privilege: vectors, traps |  interrupts: plic, lines,    |
//! |  and stock handlers        |  demux, local enables        |
//! +----------------------------+------------------------------+
//! |  mmio: RegisterBus          |  cpu: ControlRegisters      |
//! +-----------------------------+-----------------------------+
//! |  arch::riscv (target)       |  sim (host tests)           |
//! +-----------------------------+-----------------------------+
//! ```
//!
//! Everything above `arch` is generic over the register and CSR seams, so
//! the whole interrupt path runs on the host against `sim`.

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod config;
pub mod cpu;
pub mod driver;
pub mod error;
pub mod interrupts;
pub mod mmio;
pub mod privilege;
pub mod sync;
pub mod timers;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use config::PlatformConfig;
pub use driver::InterruptDriver;
pub use error::{InterruptError, InterruptResult};
pub use interrupts::{ClaimToken, LineId, LineSource, Plic};
pub use mmio::{Mmio, RegisterBus};
pub use privilege::{TrapOutcome, VectorSlot};
pub use sync::TrapCell;
