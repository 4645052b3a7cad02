//! # SiFive Arty Board Profile
//!
//! Wires the PLIC driver to an Arty-style single-hart design: the static
//! device-to-line table, per-device routines, a console logger and the boot
//! sequence.
//!
//! On RISC-V targets `boot::start` is the hardware entry point; on the host
//! the same [`bring_up`] path runs against the `plic-hal` simulator.

#![cfg_attr(not(test), no_std)]

pub mod board;
pub mod boot;
pub mod logger;

pub use board::{ArtyBoard, Device, DEVICES};
pub use boot::{bring_up, BRING_UP_EXIT_CODE};
