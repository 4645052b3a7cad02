//! # Timer Framework
//!
//! - `mtime`: machine timer compare register and tick servicing

pub mod mtime;

pub use mtime::{MachineTimer, TimerConfig, TimerTick};

/// Real-time clock frequency on SiFive boards (Hz)
pub const RTC_FREQ: u64 = 32_768;

/// Default number of timebase periods between ticks
pub const DEFAULT_PERIODS_AHEAD: u64 = 100;

/// SiFive CLINT `mtimecmp` for hart 0
pub const SIFIVE_MTIMECMP: usize = 0x0200_4000;
