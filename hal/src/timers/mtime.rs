//! # Machine Timer (MTIME) Interface
//!
//! The timer interrupt fires while `mtime >= mtimecmp`. Servicing a tick
//! pushes `mtimecmp` a fixed interval past the current time, which both
//! acknowledges the interrupt and schedules the next one.

use crate::mmio::RegisterBus;

use super::{DEFAULT_PERIODS_AHEAD, RTC_FREQ, SIFIVE_MTIMECMP};

// ============================================================================
// Configuration
// ============================================================================

/// Timer compare location and tick interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    /// Address of this hart's 64-bit `mtimecmp`
    pub mtimecmp: usize,
    /// Timebase frequency (Hz)
    pub timebase_hz: u64,
    /// Timebase periods between ticks
    pub periods_ahead: u64,
}

impl TimerConfig {
    /// SiFive CLINT with the 32.768 kHz RTC
    pub const SIFIVE: Self = Self {
        mtimecmp: SIFIVE_MTIMECMP,
        timebase_hz: RTC_FREQ,
        periods_ahead: DEFAULT_PERIODS_AHEAD,
    };

    /// Counter ticks between timer interrupts
    #[inline]
    pub const fn interval(&self) -> u64 {
        self.periods_ahead.saturating_mul(self.timebase_hz)
    }
}

// ============================================================================
// Machine Timer
// ============================================================================

/// Result of servicing one timer interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTick {
    /// Service count before this tick
    pub count: u64,
    /// Counter value the tick was serviced at
    pub now: u64,
    /// New compare value
    pub deadline: u64,
}

/// Machine timer compare register and service counter
#[derive(Debug, Clone, Copy)]
pub struct MachineTimer<B> {
    bus: B,
    config: TimerConfig,
    serviced: u64,
}

impl<B: RegisterBus> MachineTimer<B> {
    /// Create a timer over `bus`
    pub const fn new(bus: B, config: TimerConfig) -> Self {
        Self {
            bus,
            config,
            serviced: 0,
        }
    }

    /// Timer configuration
    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    /// Ticks serviced so far
    #[inline]
    pub fn serviced(&self) -> u64 {
        self.serviced
    }

    /// Read `mtimecmp`
    #[inline]
    pub fn compare(&self) -> u64 {
        self.bus.read_dword(self.config.mtimecmp)
    }

    /// Write `mtimecmp`
    #[inline]
    pub fn set_compare(&self, deadline: u64) {
        self.bus.write_dword(self.config.mtimecmp, deadline);
    }

    /// Service a tick observed at counter value `now`
    pub fn service(&mut self, now: u64) -> TimerTick {
        let count = self.serviced;
        self.serviced = self.serviced.wrapping_add(1);

        let deadline = now.wrapping_add(self.config.interval());
        self.set_compare(deadline);

        TimerTick { count, now, deadline }
    }
}
