//! # Board Bring-Up
//!
//! [`bring_up`] registers the device routines and runs the driver's boot
//! sequence. On RISC-V targets `start` wraps it with the hardware pieces:
//! logger, trap hooks, the vector table and the idle loop.

use plic_hal::cpu::ControlRegisters;
use plic_hal::{InterruptDriver, InterruptResult, RegisterBus};

use crate::board::{self, ArtyBoard, DEVICES};

/// Exit code when the interrupt controller cannot be brought up
pub const BRING_UP_EXIT_CODE: i32 = 0x77;

/// Register every device routine, then install, configure and arm
pub fn bring_up<B, C>(driver: &mut InterruptDriver<B, C>, vector_base: usize) -> InterruptResult<()>
where
    B: RegisterBus + Copy,
    C: ControlRegisters + Copy,
{
    for device in 0..DEVICES.len() {
        driver.register_device(device, board::service)?;
    }
    driver.boot(vector_base, &ArtyBoard)
}

#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
pub use hardware::start;

#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
mod hardware {
    use log::LevelFilter;
    use plic_hal::arch::riscv::{idle, install_hooks, vector_table_base, MachineCsr, TrapHooks};
    use plic_hal::{InterruptDriver, Mmio, PlatformConfig, TrapCell, TrapOutcome};

    use super::{bring_up, BRING_UP_EXIT_CODE};
    use crate::logger::{self, ConsoleSink};

    type BoardDriver = InterruptDriver<Mmio, MachineCsr>;

    static DRIVER: spin::Once<TrapCell<BoardDriver>> = spin::Once::new();

    fn dispatch() -> TrapOutcome {
        match DRIVER.get() {
            // SAFETY: trap context on the only hart, interrupts masked
            Some(cell) => unsafe { cell.get_mut() }.handle_trap(),
            None => TrapOutcome::Halt,
        }
    }

    /// Bring up interrupts on the Arty board and idle
    ///
    /// # Safety
    /// Must run once, in machine mode on hart 0, with the PLIC and CLINT
    /// mapped at the addresses in [`PlatformConfig::SIFIVE_ARTY`].
    pub unsafe fn start(console: ConsoleSink, exit: fn(i32) -> !) -> ! {
        // A logger installed earlier by the platform is kept.
        let _ = logger::init(console, LevelFilter::Info);
        install_hooks(TrapHooks { dispatch, exit });

        // SAFETY: machine mode and the register map are the caller's contract
        let driver = unsafe { BoardDriver::new(Mmio::new(), MachineCsr::new(), PlatformConfig::SIFIVE_ARTY) };
        let cell = DRIVER.call_once(|| TrapCell::new(driver));

        // SAFETY: arming is the final access through this borrow; the
        // driver does not touch itself after setting `mstatus.MIE`
        let result = bring_up(unsafe { cell.get_mut() }, vector_table_base());
        if let Err(err) = result {
            log::error!("Interrupt bring-up failed: {}", err);
            exit(BRING_UP_EXIT_CODE);
        }

        idle()
    }
}
