//! # Architecture Glue
//!
//! Hardware implementations of the CSR seam and the assembly trap entry.
//! Only built for RISC-V targets; everything above this module is
//! target-independent.

#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
pub mod riscv;
