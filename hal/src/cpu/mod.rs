//! # CPU-Level Registers
//!
//! - `csr`: machine-mode CSR identifiers, bit layouts and the access seam

pub mod csr;

pub use csr::{ControlRegisters, Csr, LocalEnable, MachineStatus};
