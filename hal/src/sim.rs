//! # Host-Side Simulation
//!
//! [`SimBus`] models a PLIC context (priorities, pending and enable bitmaps,
//! threshold, claim/complete with per-line gateways) plus a small word
//! store for any other address the driver touches, such as `mtimecmp`.
//! [`SimCsr`] is a register file for the machine CSRs.
//!
//! Available in unit tests and behind the `sim` feature for downstream
//! integration tests.

use spin::Mutex;

use crate::cpu::{ControlRegisters, Csr};
use crate::interrupts::plic::{LineId, PlicLayout, MAX_LINES, NO_INTERRUPT};
use crate::mmio::{RegisterBus, RegisterWidth};

const WORDS: usize = MAX_LINES / 32;
const WINDOW_BYTES: usize = WORDS * 4;
const STORE_SLOTS: usize = 16;

// ============================================================================
// PLIC Model
// ============================================================================

struct PlicState {
    priority: [u32; MAX_LINES],
    pending: [u32; WORDS],
    enable: [u32; WORDS],
    claimed: [u32; WORDS],
    deferred: [u32; WORDS],
    level: [u32; WORDS],
    threshold: u32,
    claims: u32,
    completions: u32,
    violations: u32,
    store: [(usize, u64); STORE_SLOTS],
    store_len: usize,
}

#[inline]
fn test_bit(map: &[u32; WORDS], line: usize) -> bool {
    (map[line / 32] >> (line % 32)) & 1 != 0
}

#[inline]
fn assign_bit(map: &mut [u32; WORDS], line: usize, value: bool) {
    if value {
        map[line / 32] |= 1 << (line % 32);
    } else {
        map[line / 32] &= !(1 << (line % 32));
    }
}

impl PlicState {
    const fn new() -> Self {
        Self {
            priority: [0; MAX_LINES],
            pending: [0; WORDS],
            enable: [0; WORDS],
            claimed: [0; WORDS],
            deferred: [0; WORDS],
            level: [0; WORDS],
            threshold: 0,
            claims: 0,
            completions: 0,
            violations: 0,
            store: [(0, 0); STORE_SLOTS],
            store_len: 0,
        }
    }

    fn claim(&mut self) -> LineId {
        let mut best: Option<(usize, u32)> = None;
        // Line 0 is reserved and never presented.
        for line in 1..MAX_LINES {
            if !test_bit(&self.pending, line) || !test_bit(&self.enable, line) {
                continue;
            }
            let priority = self.priority[line];
            if priority == 0 || priority <= self.threshold {
                continue;
            }
            // Strict comparison keeps the lowest id on ties.
            if best.map_or(true, |(_, p)| priority > p) {
                best = Some((line, priority));
            }
        }

        match best {
            Some((line, _)) => {
                if test_bit(&self.claimed, line) {
                    self.violations += 1;
                }
                assign_bit(&mut self.pending, line, false);
                assign_bit(&mut self.claimed, line, true);
                self.claims += 1;
                line as LineId
            },
            None => NO_INTERRUPT,
        }
    }

    fn complete(&mut self, id: u32) {
        let line = id as usize;
        if line == 0 || line >= MAX_LINES || !test_bit(&self.claimed, line) {
            self.violations += 1;
            return;
        }
        assign_bit(&mut self.claimed, line, false);
        self.completions += 1;
        if test_bit(&self.deferred, line) || test_bit(&self.level, line) {
            assign_bit(&mut self.deferred, line, false);
            assign_bit(&mut self.pending, line, true);
        }
    }

    fn store_read(&self, addr: usize) -> Option<u64> {
        self.store[..self.store_len]
            .iter()
            .find(|(a, _)| *a == addr)
            .map(|(_, v)| *v)
    }

    fn store_write(&mut self, addr: usize, value: u64) {
        if let Some(slot) = self.store[..self.store_len].iter_mut().find(|(a, _)| *a == addr) {
            slot.1 = value;
        } else if self.store_len < STORE_SLOTS {
            self.store[self.store_len] = (addr, value);
            self.store_len += 1;
        } else {
            log::warn!("SimBus: store full, dropping write to {:#x}", addr);
        }
    }
}

/// Simulated register space for one PLIC context
pub struct SimBus {
    layout: PlicLayout,
    state: Mutex<PlicState>,
}

enum Window {
    Priority(usize),
    Pending(usize),
    Enable(usize),
    Threshold,
    Claim,
    Other,
}

impl SimBus {
    /// Create a quiescent controller for `layout`
    pub const fn new(layout: PlicLayout) -> Self {
        Self {
            layout,
            state: Mutex::new(PlicState::new()),
        }
    }

    fn window(&self, addr: usize) -> Window {
        let l = &self.layout;
        if addr == l.threshold {
            Window::Threshold
        } else if addr == l.claim_complete {
            Window::Claim
        } else if (l.enable_base..l.enable_base + WINDOW_BYTES).contains(&addr) {
            Window::Enable((addr - l.enable_base) / 4)
        } else if (l.pending_base..l.pending_base + WINDOW_BYTES).contains(&addr) {
            Window::Pending((addr - l.pending_base) / 4)
        } else if (l.priority_base..l.priority_base + MAX_LINES * 4).contains(&addr) {
            Window::Priority((addr - l.priority_base) / 4)
        } else {
            Window::Other
        }
    }

    /// Assert a device line
    ///
    /// A line that is currently claimed is latched by its gateway and becomes
    /// pending again once completed.
    pub fn raise(&self, line: LineId) {
        let line = line as usize;
        if line == 0 || line >= MAX_LINES {
            return;
        }
        let mut state = self.state.lock();
        if test_bit(&state.claimed, line) {
            assign_bit(&mut state.deferred, line, true);
        } else {
            assign_bit(&mut state.pending, line, true);
        }
    }

    /// Hold a level-triggered line high until [`release`](Self::release)
    ///
    /// The line re-pends every time it is completed.
    pub fn hold(&self, line: LineId) {
        if line == 0 || line as usize >= MAX_LINES {
            return;
        }
        assign_bit(&mut self.state.lock().level, line as usize, true);
        self.raise(line);
    }

    /// Stop holding a level-triggered line
    pub fn release(&self, line: LineId) {
        if (line as usize) < MAX_LINES {
            assign_bit(&mut self.state.lock().level, line as usize, false);
        }
    }

    /// Set a line's pending bit even while it is claimed
    ///
    /// Models a faulty gateway that does not hold requests back during
    /// service. The next claim of such a line counts as a double claim.
    pub fn force_pending(&self, line: LineId) {
        let line = line as usize;
        if line == 0 || line >= MAX_LINES {
            return;
        }
        assign_bit(&mut self.state.lock().pending, line, true);
    }

    /// Drop a pending assertion without claiming it
    pub fn lower(&self, line: LineId) {
        let line = line as usize;
        if line >= MAX_LINES {
            return;
        }
        let mut state = self.state.lock();
        assign_bit(&mut state.pending, line, false);
        assign_bit(&mut state.deferred, line, false);
        assign_bit(&mut state.level, line, false);
    }

    /// Whether a line is claimed and not yet completed
    pub fn is_claimed(&self, line: LineId) -> bool {
        (line as usize) < MAX_LINES && test_bit(&self.state.lock().claimed, line as usize)
    }

    /// Enable bitmap of this context
    pub fn enable_words(&self) -> [u32; WORDS] {
        self.state.lock().enable
    }

    /// Successful claims so far
    pub fn claims(&self) -> u32 {
        self.state.lock().claims
    }

    /// Successful completions so far
    pub fn completions(&self) -> u32 {
        self.state.lock().completions
    }

    /// Completions of lines that were not claimed, plus double claims
    pub fn protocol_violations(&self) -> u32 {
        self.state.lock().violations
    }

    /// Read a non-PLIC word written by the driver
    pub fn stored(&self, addr: usize) -> Option<u64> {
        self.state.lock().store_read(addr)
    }
}

impl RegisterBus for SimBus {
    fn read(&self, width: RegisterWidth, addr: usize) -> u64 {
        let mut state = self.state.lock();
        let value = match self.window(addr) {
            Window::Priority(line) => state.priority[line] as u64,
            Window::Pending(word) => state.pending[word] as u64,
            Window::Enable(word) => state.enable[word] as u64,
            Window::Threshold => state.threshold as u64,
            Window::Claim => state.claim() as u64,
            Window::Other => state.store_read(addr).unwrap_or(0),
        };
        value & width.mask()
    }

    fn write(&self, width: RegisterWidth, addr: usize, value: u64) {
        let value = value & width.mask();
        let mut state = self.state.lock();
        match self.window(addr) {
            Window::Priority(line) => state.priority[line] = value as u32,
            Window::Pending(_) => {},
            Window::Enable(word) => state.enable[word] = value as u32,
            Window::Threshold => state.threshold = value as u32,
            Window::Claim => state.complete(value as u32),
            Window::Other => state.store_write(addr, value),
        }
    }
}

impl core::fmt::Debug for SimBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SimBus")
            .field("layout", &self.layout)
            .field("threshold", &state.threshold)
            .field("claims", &state.claims)
            .field("completions", &state.completions)
            .field("violations", &state.violations)
            .finish()
    }
}

// ============================================================================
// CSR Model
// ============================================================================

/// Simulated machine CSR file
///
/// `time` is kept as a full 64-bit counter; XLEN-wide reads of
/// [`Csr::Time`] see its low half, [`ControlRegisters::read_time`] all of it.
#[derive(Debug)]
pub struct SimCsr {
    regs: Mutex<[usize; Csr::COUNT]>,
    time: Mutex<u64>,
}

impl SimCsr {
    /// All registers zero
    pub const fn new() -> Self {
        Self {
            regs: Mutex::new([0; Csr::COUNT]),
            time: Mutex::new(0),
        }
    }

    /// Peek a register
    pub fn get(&self, csr: Csr) -> usize {
        self.regs.lock()[csr.index()]
    }

    /// Poke a register, e.g. to stage `mcause` before a trap
    pub fn set(&self, csr: Csr, value: usize) {
        if csr == Csr::Time {
            *self.time.lock() = value as u64;
        }
        self.regs.lock()[csr.index()] = value;
    }

    /// Set the 64-bit `time` counter
    pub fn set_time(&self, now: u64) {
        *self.time.lock() = now;
        self.regs.lock()[Csr::Time.index()] = now as usize;
    }

    /// Stage the CSRs the hardware writes on trap entry
    pub fn enter_trap(&self, mcause: usize, mepc: usize, mtval: usize) {
        let mut regs = self.regs.lock();
        regs[Csr::Mcause.index()] = mcause;
        regs[Csr::Mepc.index()] = mepc;
        regs[Csr::Mtval.index()] = mtval;
    }
}

impl Default for SimCsr {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlRegisters for SimCsr {
    fn read(&self, csr: Csr) -> usize {
        self.get(csr)
    }

    fn write(&self, csr: Csr, value: usize) {
        self.set(csr, value);
    }

    fn set_bits(&self, csr: Csr, mask: usize) -> usize {
        let mut regs = self.regs.lock();
        let old = regs[csr.index()];
        regs[csr.index()] = old | mask;
        old
    }

    fn clear_bits(&self, csr: Csr, mask: usize) -> usize {
        let mut regs = self.regs.lock();
        let old = regs[csr.index()];
        regs[csr.index()] = old & !mask;
        old
    }

    fn read_time(&self) -> u64 {
        *self.time.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupts::plic::PlicContext;

    fn bus() -> SimBus {
        SimBus::new(PlicLayout::for_context(0x0C00_0000, PlicContext::machine(0)))
    }

    #[test]
    fn test_completing_unclaimed_line_is_a_violation() {
        let sim = bus();
        let claim = sim.layout.claim_complete;
        sim.write_word(claim, 5);
        sim.write_word(claim, 0);
        assert_eq!(sim.protocol_violations(), 2);
        assert_eq!(sim.completions(), 0);
    }

    #[test]
    fn test_pending_window_is_read_only() {
        let sim = bus();
        sim.write_word(sim.layout.pending_base, u32::MAX);
        assert_eq!(sim.read_word(sim.layout.pending_base), 0);
    }

    #[test]
    fn test_other_addresses_are_plain_memory() {
        let sim = bus();
        sim.write_dword(0x0200_4000, 0x1_0000_0000);
        assert_eq!(sim.read_dword(0x0200_4000), 0x1_0000_0000);
        assert_eq!(sim.stored(0x0200_4000), Some(0x1_0000_0000));
        assert_eq!(sim.read_word(0x0200_4008), 0);
    }

    #[test]
    fn test_lower_discards_assertion() {
        let sim = bus();
        sim.write_word(sim.layout.priority_addr(3), 1);
        sim.write_word(sim.layout.enable_base, 1 << 3);
        sim.raise(3);
        sim.lower(3);
        assert_eq!(sim.read_word(sim.layout.claim_complete), 0);
    }

    #[test]
    fn test_level_line_repends_until_released() {
        let sim = bus();
        let claim = sim.layout.claim_complete;
        sim.write_word(sim.layout.priority_addr(8), 2);
        sim.write_word(sim.layout.enable_base, 1 << 8);

        sim.hold(8);
        assert_eq!(sim.read_word(claim), 8);
        sim.write_word(claim, 8);
        assert_eq!(sim.read_word(claim), 8);

        sim.release(8);
        sim.write_word(claim, 8);
        assert_eq!(sim.read_word(claim), 0);
        assert_eq!(sim.protocol_violations(), 0);
    }

    #[test]
    fn test_reclaiming_a_claimed_line_is_a_violation() {
        let sim = bus();
        let claim = sim.layout.claim_complete;
        sim.write_word(sim.layout.priority_addr(3), 1);
        sim.write_word(sim.layout.enable_base, 1 << 3);

        sim.raise(3);
        assert_eq!(sim.read_word(claim), 3);
        sim.raise(3);
        assert_eq!(sim.read_word(claim), 0);
        assert_eq!(sim.protocol_violations(), 0);

        sim.force_pending(3);
        assert_eq!(sim.read_word(claim), 3);
        assert_eq!(sim.protocol_violations(), 1);
    }

    #[test]
    fn test_time_keeps_high_half() {
        let csr = SimCsr::new();
        csr.set_time(0x1_0000_0010);
        assert_eq!(csr.read_time(), 0x1_0000_0010);
        assert_eq!(csr.get(Csr::Time) as u32, 0x10);

        csr.set(Csr::Time, 42);
        assert_eq!(csr.read_time(), 42);
    }

    #[test]
    fn test_csr_bit_ops_return_old_value() {
        let csr = SimCsr::new();
        assert_eq!(csr.set_bits(Csr::Mie, 0x800), 0);
        assert_eq!(csr.set_bits(Csr::Mie, 0x80), 0x800);
        assert_eq!(csr.clear_bits(Csr::Mie, 0x800), 0x880);
        assert_eq!(csr.get(Csr::Mie), 0x80);
    }
}
