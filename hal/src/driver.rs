//! # Interrupt Driver
//!
//! Ties the PLIC, the hart-local enables, the machine timer and the trap
//! dispatcher together for one hart.
//!
//! ## Boot Sequence
//!
//! 1. [`install`](InterruptDriver::install): global disable, write `mtvec`
//! 2. [`configure_lines`](InterruptDriver::configure_lines): enable and
//!    prioritise every board line, then set the threshold
//! 3. [`arm`](InterruptDriver::arm): enable the configured `mie` causes,
//!    then the global enable
//!
//! [`boot`](InterruptDriver::boot) runs all three in order.

use crate::config::PlatformConfig;
use crate::cpu::{ControlRegisters, Csr, LocalEnable};
use crate::error::InterruptResult;
use crate::interrupts::{
    DeviceDemux, DeviceRoutine, InterruptLine, InterruptStats, LineId, LineMapping, LineSource,
    LocalInterruptMask, Plic,
};
use crate::mmio::RegisterBus;
use crate::privilege::{
    DispatchState, ExceptionFrame, ExceptionHandler, HandlerTable, InterruptHandler, TrapCause,
    TrapDispatcher, TrapOutcome, TrapVector, VectorSlot,
};
use crate::timers::MachineTimer;

/// Interrupt driver for one hart
#[derive(Debug)]
pub struct InterruptDriver<B, C> {
    config: PlatformConfig,
    plic: Plic<B>,
    timer: MachineTimer<B>,
    csr: C,
    mask: LocalInterruptMask<C>,
    mapping: LineMapping,
    demux: DeviceDemux,
    dispatcher: TrapDispatcher<B, C>,
    stats: InterruptStats,
}

impl<B, C> InterruptDriver<B, C>
where
    B: RegisterBus + Copy,
    C: ControlRegisters + Copy,
{
    /// Create a driver in the `Reset` state with the stock handlers
    pub fn new(bus: B, csr: C, config: PlatformConfig) -> Self {
        Self {
            config,
            plic: Plic::new(bus, config.plic),
            timer: MachineTimer::new(bus, config.timer),
            csr,
            mask: LocalInterruptMask::new(csr),
            mapping: LineMapping::empty(),
            demux: DeviceDemux::new(),
            dispatcher: TrapDispatcher::new(HandlerTable::with_defaults()),
            stats: InterruptStats::new(),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Board configuration
    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    /// PLIC of the served context
    pub fn plic(&self) -> &Plic<B> {
        &self.plic
    }

    /// CSR accessor
    pub fn csr(&self) -> &C {
        &self.csr
    }

    /// Hart-local enables
    pub fn mask(&self) -> &LocalInterruptMask<C> {
        &self.mask
    }

    /// Machine timer
    pub fn timer(&self) -> &MachineTimer<B> {
        &self.timer
    }

    /// Machine timer, mutably
    pub fn timer_mut(&mut self) -> &mut MachineTimer<B> {
        &mut self.timer
    }

    /// Board line mapping
    pub fn mapping(&self) -> &LineMapping {
        &self.mapping
    }

    /// Interrupt statistics
    pub fn stats(&self) -> &InterruptStats {
        &self.stats
    }

    /// Interrupt statistics, mutably
    pub fn stats_mut(&mut self) -> &mut InterruptStats {
        &mut self.stats
    }

    /// Lifecycle state
    pub fn state(&self) -> DispatchState {
        self.dispatcher.state()
    }

    /// Installed trap vector
    pub fn vector(&self) -> Option<TrapVector> {
        self.dispatcher.vector()
    }

    /// Current configuration of every mapped line
    pub fn lines(&self) -> impl Iterator<Item = InterruptLine> + '_ {
        self.mapping.iter().map(move |(_, line)| self.plic.line(line))
    }

    // ========================================================================
    // Setup
    // ========================================================================

    /// Disable interrupts and point `mtvec` at `vector_base`
    pub fn install(&mut self, vector_base: usize) -> InterruptResult<TrapVector> {
        self.dispatcher.check_configurable()?;
        self.mask.global_disable();

        let vector = TrapVector::new(vector_base, self.config.vector_mode)?;
        self.csr.write(Csr::Mtvec, vector.to_mtvec());
        self.dispatcher.install(vector)?;

        log::debug!(
            "{}: trap vector at {:#x} ({:?})",
            self.config.name,
            vector.base,
            vector.mode
        );
        Ok(vector)
    }

    /// Enable and prioritise every board line, then set the threshold
    ///
    /// Returns the number of devices mapped.
    pub fn configure_lines(&mut self, source: &dyn LineSource) -> InterruptResult<usize> {
        self.dispatcher.check_configurable()?;
        let mapping = LineMapping::from_source(source)?;

        for (device, line) in mapping.iter() {
            self.plic.set_enabled(line, true);
            self.plic.set_priority(line, self.config.default_priority);
            log::debug!(
                "Device {} on line {}, priority {}",
                device,
                line,
                self.config.default_priority
            );
        }
        self.plic.set_threshold(self.config.threshold);
        log::debug!("PLIC threshold {}", self.config.threshold);

        self.mapping = mapping;
        Ok(mapping.len())
    }

    /// Replace the handler behind an interrupt slot
    pub fn register_interrupt_handler(
        &mut self,
        slot: VectorSlot,
        handler: InterruptHandler<B, C>,
    ) -> InterruptResult<()> {
        self.dispatcher.register_interrupt(slot, handler)
    }

    /// Replace the exception handler
    pub fn register_exception_handler(
        &mut self,
        handler: ExceptionHandler<B, C>,
    ) -> InterruptResult<()> {
        self.dispatcher.register_exception(handler)
    }

    /// Register the routine for board device `device`
    pub fn register_device(&mut self, device: usize, routine: DeviceRoutine) -> InterruptResult<()> {
        self.dispatcher.check_configurable()?;
        self.demux.register(device, routine)
    }

    /// Enable the configured causes, then interrupts globally
    pub fn arm(&mut self) -> InterruptResult<()> {
        self.dispatcher.arm()?;

        if self.config.local_causes.contains(LocalEnable::TIMER) {
            let now = self.csr.read_time();
            self.timer.set_compare(now.wrapping_add(self.config.timer.interval()));
        }
        self.mask.enable_set(self.config.local_causes);

        log::info!(
            "{}: arming interrupts, mie {:#x}, {} device(s)",
            self.config.name,
            self.mask.enabled().bits(),
            self.mapping.len()
        );

        // Traps may arrive from here on; `self` is not touched again.
        self.mask.global_enable();
        Ok(())
    }

    /// Install, configure lines and arm
    pub fn boot(&mut self, vector_base: usize, source: &dyn LineSource) -> InterruptResult<()> {
        self.install(vector_base)?;
        self.configure_lines(source)?;
        self.arm()
    }

    // ========================================================================
    // Trap Path
    // ========================================================================

    /// Route a claimed line to its device routine
    pub fn route_line(&self, line: LineId) -> Option<usize> {
        self.demux.dispatch(&self.mapping, line)
    }

    /// Decode `mcause` and run the matching handler
    pub fn handle_trap(&mut self) -> TrapOutcome {
        let cause = TrapCause::decode(self.csr.read(Csr::Mcause));
        log::trace!("Trap: {}", cause);

        let handlers = *self.dispatcher.handlers();
        let previous = self.dispatcher.enter();

        let outcome = match cause.slot() {
            Some(slot) => (handlers.interrupt(slot))(self, cause),
            None => {
                let frame = ExceptionFrame::capture(&self.csr);
                (handlers.exception())(self, &frame)
            },
        };

        self.dispatcher.leave(previous, outcome);
        outcome
    }
}
