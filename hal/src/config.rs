//! # Platform Configuration
//!
//! Addresses, timer parameters and boot policy for a board. Presets cover
//! the SiFive Arty FPGA platform and the QEMU `virt` machine.

use crate::cpu::LocalEnable;
use crate::interrupts::plic::{PlicContext, PlicLayout};
use crate::privilege::vectors::TrapVectorMode;
use crate::timers::{TimerConfig, DEFAULT_PERIODS_AHEAD, RTC_FREQ, SIFIVE_MTIMECMP};

/// PLIC base on SiFive parts and QEMU `virt`
pub const PLIC_BASE: usize = 0x0C00_0000;

/// Board configuration consumed by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Board name for logs
    pub name: &'static str,
    /// PLIC registers of the context we serve
    pub plic: PlicLayout,
    /// Timer compare and interval
    pub timer: TimerConfig,
    /// mtvec mode to install
    pub vector_mode: TrapVectorMode,
    /// Priority given to every board line at boot
    pub default_priority: u32,
    /// PLIC threshold set at boot
    pub threshold: u32,
    /// mie causes enabled when arming
    pub local_causes: LocalEnable,
}

impl PlatformConfig {
    /// SiFive Arty (E31/E51 core complex)
    pub const SIFIVE_ARTY: Self = Self {
        name: "sifive-arty",
        plic: PlicLayout::for_context(PLIC_BASE, PlicContext::machine(0)),
        timer: TimerConfig {
            mtimecmp: SIFIVE_MTIMECMP,
            timebase_hz: RTC_FREQ,
            periods_ahead: DEFAULT_PERIODS_AHEAD,
        },
        vector_mode: TrapVectorMode::Vectored,
        default_priority: 2,
        threshold: 1,
        local_causes: LocalEnable::EXTERNAL,
    };

    /// QEMU `virt`, hart 0 machine context
    pub const QEMU_VIRT: Self = Self {
        name: "qemu-virt",
        plic: PlicLayout::for_context(PLIC_BASE, PlicContext::machine(0)),
        timer: TimerConfig {
            mtimecmp: SIFIVE_MTIMECMP,
            timebase_hz: 10_000_000,
            periods_ahead: 1,
        },
        vector_mode: TrapVectorMode::Vectored,
        default_priority: 2,
        threshold: 1,
        local_causes: LocalEnable::EXTERNAL,
    };

    /// Same board, also arming the timer
    pub const fn with_timer(mut self) -> Self {
        self.local_causes = self.local_causes.union(LocalEnable::TIMER);
        self
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self::SIFIVE_ARTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arty_addresses() {
        let cfg = PlatformConfig::SIFIVE_ARTY;
        assert_eq!(cfg.plic.enable_base, 0x0C00_2000);
        assert_eq!(cfg.plic.threshold, 0x0C20_0000);
        assert_eq!(cfg.plic.claim_complete, 0x0C20_0004);
        assert_eq!(cfg.timer.interval(), 100 * 32_768);
        assert_eq!(cfg.local_causes, LocalEnable::EXTERNAL);
    }

    #[test]
    fn test_with_timer() {
        let cfg = PlatformConfig::QEMU_VIRT.with_timer();
        assert!(cfg.local_causes.contains(LocalEnable::TIMER | LocalEnable::EXTERNAL));
    }
}
