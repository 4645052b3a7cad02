//! Board-level interrupt scenarios against the simulated controller.

use plic_hal::cpu::csr::CAUSE_INTERRUPT_BIT;
use plic_hal::cpu::{Csr, LocalEnable, MachineStatus};
use plic_hal::privilege::{DispatchState, EXCEPTION_EXIT_CODE};
use plic_hal::sim::{SimBus, SimCsr};
use plic_hal::{InterruptDriver, InterruptError, LineId, PlatformConfig, TrapOutcome};
use plic_profile_arty::{board, bring_up, DEVICES};

const VECTOR_BASE: usize = 0x2000_0040;

fn rig() -> (SimBus, SimCsr) {
    (SimBus::new(PlatformConfig::SIFIVE_ARTY.plic), SimCsr::new())
}

fn external(csr: &SimCsr) {
    csr.enter_trap(CAUSE_INTERRUPT_BIT | 11, 0x2000_1000, 0);
}

#[test]
fn bring_up_enables_every_board_line() {
    let (bus, csr) = rig();
    let mut driver = InterruptDriver::new(&bus, &csr, PlatformConfig::SIFIVE_ARTY);
    bring_up(&mut driver, VECTOR_BASE).unwrap();

    for device in DEVICES {
        assert!(driver.plic().is_enabled(device.line), "{}", device.name);
        assert_eq!(driver.plic().priority(device.line), 2, "{}", device.name);
    }
    assert_eq!(driver.plic().threshold(), 1);
    assert_eq!(csr.get(Csr::Mtvec), VECTOR_BASE | 1);
    assert_eq!(csr.get(Csr::Mie), LocalEnable::EXTERNAL.bits());
    assert_ne!(csr.get(Csr::Mstatus) & MachineStatus::MIE.bits(), 0);
    assert_eq!(driver.state(), DispatchState::Armed);
}

#[test]
fn bring_up_twice_is_refused() {
    let (bus, csr) = rig();
    let mut driver = InterruptDriver::new(&bus, &csr, PlatformConfig::SIFIVE_ARTY);
    bring_up(&mut driver, VECTOR_BASE).unwrap();
    assert_eq!(bring_up(&mut driver, VECTOR_BASE), Err(InterruptError::AlreadyArmed));
}

#[test]
fn uart_interrupt_reaches_its_routine() {
    let (bus, csr) = rig();
    let mut driver = InterruptDriver::new(&bus, &csr, PlatformConfig::SIFIVE_ARTY);
    bring_up(&mut driver, VECTOR_BASE).unwrap();

    let before = board::serviced(0);
    bus.raise(DEVICES[0].line);
    external(&csr);

    assert_eq!(driver.handle_trap(), TrapOutcome::Resume);
    assert_eq!(board::serviced(0), before + 1);
    assert_eq!(bus.completions(), 1);
    assert_eq!(bus.protocol_violations(), 0);
    assert!(driver.plic().claim().is_none());
}

#[test]
fn equal_priorities_served_lowest_line_first() {
    let (bus, csr) = rig();
    let mut driver = InterruptDriver::new(&bus, &csr, PlatformConfig::SIFIVE_ARTY);
    bring_up(&mut driver, VECTOR_BASE).unwrap();

    bus.raise(9);
    bus.raise(3);

    external(&csr);
    driver.handle_trap();
    assert_eq!(driver.stats().irq_counts[3], 1);
    assert_eq!(driver.stats().irq_counts[9], 0);

    external(&csr);
    driver.handle_trap();
    assert_eq!(driver.stats().irq_counts[9], 1);

    // Nothing left: the third trap is spurious.
    external(&csr);
    driver.handle_trap();
    assert_eq!(driver.stats().spurious_claims, 1);
    assert_eq!(bus.completions(), 2);
}

#[test]
fn claim_route_complete_on_sparse_board() {
    let (bus, csr) = rig();
    let mut driver = InterruptDriver::new(&bus, &csr, PlatformConfig::SIFIVE_ARTY);
    let board: [LineId; 3] = [5, 12, 40];
    driver.register_device(1, board::service).unwrap();
    driver.boot(VECTOR_BASE, &board).unwrap();

    bus.raise(12);
    let token = driver.plic().claim().expect("line 12 pending");
    assert_eq!(token.line(), 12);
    assert_eq!(driver.route_line(token.line()), Some(1));

    driver.plic().complete(token);
    assert!(!bus.is_claimed(12));
    assert!(driver.plic().claim().is_none());
}

#[test]
fn store_fault_exits_with_ee() {
    let (bus, csr) = rig();
    let mut driver = InterruptDriver::new(&bus, &csr, PlatformConfig::SIFIVE_ARTY);
    bring_up(&mut driver, VECTOR_BASE).unwrap();

    csr.enter_trap(7, 0x2000_0400, 0x4000_0000);
    assert_eq!(driver.handle_trap(), TrapOutcome::Exit(EXCEPTION_EXIT_CODE));
    assert_eq!(EXCEPTION_EXIT_CODE, 0xEE);
}

#[test]
fn unexpected_interrupt_halts() {
    let (bus, csr) = rig();
    let mut driver = InterruptDriver::new(&bus, &csr, PlatformConfig::SIFIVE_ARTY);
    bring_up(&mut driver, VECTOR_BASE).unwrap();

    csr.enter_trap(CAUSE_INTERRUPT_BIT | 16, 0, 0);
    assert_eq!(driver.handle_trap(), TrapOutcome::Halt);
    assert_eq!(driver.state(), DispatchState::Stopped);
}

#[test]
fn timer_ticks_push_deadline_forward() {
    let (bus, csr) = rig();
    let config = PlatformConfig::SIFIVE_ARTY.with_timer();
    let mut driver = InterruptDriver::new(&bus, &csr, config);
    bring_up(&mut driver, VECTOR_BASE).unwrap();

    let interval = config.timer.interval();
    csr.set(Csr::Time, 50_000);
    csr.enter_trap(CAUSE_INTERRUPT_BIT | 7, 0, 0);
    driver.handle_trap();
    assert_eq!(bus.stored(config.timer.mtimecmp), Some(50_000 + interval));

    csr.set(Csr::Time, (50_000 + interval) as usize);
    csr.enter_trap(CAUSE_INTERRUPT_BIT | 7, 0, 0);
    driver.handle_trap();
    assert_eq!(bus.stored(config.timer.mtimecmp), Some(50_000 + 2 * interval));
    assert_eq!(driver.timer().serviced(), 2);
}
