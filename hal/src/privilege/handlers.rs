//! # Stock Trap Handlers
//!
//! The handlers installed by [`HandlerTable::with_defaults`]. Each runs on
//! the trap path with interrupts masked.
//!
//! [`HandlerTable::with_defaults`]: crate::privilege::vectors::HandlerTable::with_defaults

use crate::cpu::ControlRegisters;
use crate::driver::InterruptDriver;
use crate::mmio::RegisterBus;
use crate::privilege::traps::{ExceptionFrame, TrapCause, TrapOutcome, EXCEPTION_EXIT_CODE};

/// Machine external interrupt: claim, route, complete
///
/// A claim of 0 means another context got there first (or the line
/// dropped); nothing is routed or completed.
pub fn external<B, C>(driver: &mut InterruptDriver<B, C>, _cause: TrapCause) -> TrapOutcome
where
    B: RegisterBus + Copy,
    C: ControlRegisters + Copy,
{
    let Some(token) = driver.plic().claim() else {
        log::warn!("PLIC claim returned 0, nothing to service");
        driver.stats_mut().record_spurious();
        return TrapOutcome::Resume;
    };

    let line = token.line();
    log::info!("Handling PLIC interrupt id {}", line);
    driver.stats_mut().record_external(line);

    if driver.route_line(line).is_none() {
        log::trace!("No device wired to line {}", line);
    }

    if driver.plic().is_pending(line) {
        log::warn!("Line {} still pending before completion", line);
        driver.stats_mut().record_pending_anomaly();
    }

    driver.plic().complete(token);
    TrapOutcome::Resume
}

/// Machine timer interrupt: count the tick and reschedule
pub fn timer<B, C>(driver: &mut InterruptDriver<B, C>, _cause: TrapCause) -> TrapOutcome
where
    B: RegisterBus + Copy,
    C: ControlRegisters + Copy,
{
    let now = driver.csr().read_time();
    let tick = driver.timer_mut().service(now);
    log::info!("Timer tick {}, next at {}", tick.count, tick.deadline);
    driver.stats_mut().record_timer();
    TrapOutcome::Resume
}

/// Machine software interrupt
pub fn software<B, C>(driver: &mut InterruptDriver<B, C>, _cause: TrapCause) -> TrapOutcome
where
    B: RegisterBus + Copy,
    C: ControlRegisters + Copy,
{
    log::trace!("Software interrupt");
    driver.stats_mut().record_software();
    TrapOutcome::Resume
}

/// Any interrupt without a dedicated slot
pub fn default_vector<B, C>(driver: &mut InterruptDriver<B, C>, cause: TrapCause) -> TrapOutcome
where
    B: RegisterBus + Copy,
    C: ControlRegisters + Copy,
{
    log::error!("Unexpected interrupt: {}, halting", cause);
    driver.stats_mut().record_default_vector();
    TrapOutcome::Halt
}

/// Synchronous exception: report and exit
pub fn exception<B, C>(_driver: &mut InterruptDriver<B, C>, frame: &ExceptionFrame) -> TrapOutcome
where
    B: RegisterBus + Copy,
    C: ControlRegisters + Copy,
{
    let cause = frame.cause();
    log::error!(
        "Exception: mcause {:#x}, mepc {:#x}, mtval {:#x}",
        frame.mcause,
        frame.mepc,
        frame.mtval
    );
    log::error!("Exception code {}: {}", cause.code, cause.name());
    log::error!("Exiting with code {:#x}", EXCEPTION_EXIT_CODE);
    TrapOutcome::Exit(EXCEPTION_EXIT_CODE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlatformConfig;
    use crate::cpu::csr::CAUSE_INTERRUPT_BIT;
    use crate::interrupts::plic::{word_and_bit, LineId};
    use crate::mmio::RegisterWidth;
    use crate::sim::{SimBus, SimCsr};

    const VECTOR_BASE: usize = 0x8000_0100;
    const BOARD: [LineId; 3] = [5, 12, 40];

    /// Bus whose pending window keeps reporting one line
    #[derive(Debug, Clone, Copy)]
    struct StuckPending<'a> {
        sim: &'a SimBus,
        line: LineId,
    }

    impl RegisterBus for StuckPending<'_> {
        fn read(&self, width: RegisterWidth, addr: usize) -> u64 {
            let value = self.sim.read(width, addr);
            let layout = PlatformConfig::SIFIVE_ARTY.plic;
            if addr == layout.pending_addr(self.line) {
                value | 1 << word_and_bit(self.line).1
            } else {
                value
            }
        }

        fn write(&self, width: RegisterWidth, addr: usize, value: u64) {
            self.sim.write(width, addr, value);
        }
    }

    #[test]
    fn test_pending_after_claim_is_reported_and_still_completed() {
        let sim = SimBus::new(PlatformConfig::SIFIVE_ARTY.plic);
        let csr = SimCsr::new();
        let bus = StuckPending { sim: &sim, line: 12 };
        let mut driver = InterruptDriver::new(bus, &csr, PlatformConfig::SIFIVE_ARTY);
        driver.boot(VECTOR_BASE, &BOARD).unwrap();

        sim.raise(12);
        csr.enter_trap(CAUSE_INTERRUPT_BIT | 11, 0, 0);
        assert_eq!(driver.handle_trap(), TrapOutcome::Resume);

        assert_eq!(driver.stats().pending_anomalies, 1);
        assert_eq!(driver.stats().irq_counts[12], 1);
        assert_eq!(sim.completions(), 1);
        assert_eq!(sim.protocol_violations(), 0);
        assert!(!sim.is_claimed(12));
    }

    #[test]
    fn test_clean_claim_reports_no_anomaly() {
        let sim = SimBus::new(PlatformConfig::SIFIVE_ARTY.plic);
        let csr = SimCsr::new();
        let mut driver = InterruptDriver::new(&sim, &csr, PlatformConfig::SIFIVE_ARTY);
        driver.boot(VECTOR_BASE, &BOARD).unwrap();

        sim.raise(40);
        csr.enter_trap(CAUSE_INTERRUPT_BIT | 11, 0, 0);
        driver.handle_trap();
        assert_eq!(driver.stats().pending_anomalies, 0);
        assert_eq!(sim.completions(), 1);
    }

    #[test]
    fn test_timer_uses_full_width_counter() {
        let sim = SimBus::new(PlatformConfig::SIFIVE_ARTY.plic);
        let csr = SimCsr::new();
        let config = PlatformConfig::SIFIVE_ARTY.with_timer();
        let mut driver = InterruptDriver::new(&sim, &csr, config);
        driver.boot(VECTOR_BASE, &BOARD).unwrap();

        let now = 0x1_0000_0000 + 500;
        csr.set_time(now);
        csr.enter_trap(CAUSE_INTERRUPT_BIT | 7, 0, 0);
        assert_eq!(driver.handle_trap(), TrapOutcome::Resume);
        assert_eq!(sim.stored(config.timer.mtimecmp), Some(now + config.timer.interval()));
    }
}
