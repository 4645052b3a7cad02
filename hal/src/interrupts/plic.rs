//! # Platform-Level Interrupt Controller (PLIC) Driver
//!
//! The PLIC multiplexes many device lines onto the single machine external
//! interrupt of a hart. This driver serves exactly one context (the
//! machine-mode context of the boot hart).
//!
//! ## Memory Map
//!
//! ```text
//! +------------------+---------+------------------------------------------+
//! | Offset           | Size    | Description                              |
//! +------------------+---------+------------------------------------------+
//! | 0x000000         | 4*N     | Priority registers (N sources)           |
//! | 0x001000         | 128     | Pending bits (1024 sources)              |
//! | 0x002000         | 128*C   | Enable bits (per context)                |
//! | 0x200000         | 0x1000*C| Threshold and Claim/Complete (per ctx)   |
//! +------------------+---------+------------------------------------------+
//! ```
//!
//! ## Claim/Complete
//!
//! ```text
//!   Idle --(device asserts)--> Pending --(claim read)--> Claimed
//!    ^                                                      |
//!    +------------------(complete write)--------------------+
//! ```
//!
//! Reading the claim register picks the highest-priority line that is
//! pending, enabled and above the threshold, clears its pending bit and
//! returns its id (0 when nothing qualifies). Writing the id back completes
//! it. [`ClaimToken`] is move-only and [`Plic::complete`] consumes it, so a
//! claim can be completed exactly once.

use static_assertions::const_assert_eq;

use crate::mmio::RegisterBus;

// ============================================================================
// PLIC Register Offsets
// ============================================================================

/// Priority register base (4 bytes per source, source 0 is reserved)
pub const PRIORITY_OFFSET: usize = 0x00_0000;

/// Pending bits base (bit per source)
pub const PENDING_OFFSET: usize = 0x00_1000;

/// Enable bits base (bit per source, per context)
pub const ENABLE_OFFSET: usize = 0x00_2000;

/// Enable block size per context
pub const ENABLE_BLOCK_SIZE: usize = 0x80;

/// Threshold and Claim/Complete base
pub const THRESHOLD_OFFSET: usize = 0x20_0000;

/// Threshold and Claim block size per context
pub const CONTEXT_BLOCK_SIZE: usize = 0x1000;

/// Claim register offset within context block
pub const CLAIM_OFFSET: usize = 0x04;

/// Maximum number of interrupt sources the register map can describe
pub const MAX_LINES: usize = 1024;

/// Maximum priority value (0 = disabled)
pub const MAX_PRIORITY: u32 = 7;

/// Sources per 32-bit pending/enable word
pub const LINES_PER_WORD: u32 = 32;

/// Enable words this driver manages
pub const ENABLE_WORDS: usize = 4;

/// Lines at or above this id are ignored by [`Plic::set_enabled`]
pub const ENABLE_CAPACITY: u32 = 128;

const_assert_eq!(ENABLE_WORDS as u32 * LINES_PER_WORD, ENABLE_CAPACITY);
const_assert_eq!(MAX_LINES / LINES_PER_WORD as usize * 4, ENABLE_BLOCK_SIZE);

/// Controller interrupt line number
pub type LineId = u32;

/// Claim register value meaning "nothing to service"
pub const NO_INTERRUPT: LineId = 0;

/// Word index and bit position of a line in a pending/enable bitmap
#[inline]
pub const fn word_and_bit(line: LineId) -> (usize, u32) {
    ((line / LINES_PER_WORD) as usize, line % LINES_PER_WORD)
}

// ============================================================================
// PLIC Context
// ============================================================================

/// PLIC context identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlicContext(u32);

impl PlicContext {
    /// Create a context from raw value
    pub const fn from_raw(value: u32) -> Self {
        Self(value)
    }

    /// Get the raw context value
    pub const fn as_raw(self) -> u32 {
        self.0
    }

    /// Get the M-mode context for a hart
    pub const fn machine(hart_id: usize) -> Self {
        Self((hart_id * 2) as u32)
    }

    /// Get the S-mode context for a hart
    pub const fn supervisor(hart_id: usize) -> Self {
        Self((hart_id * 2 + 1) as u32)
    }
}

// ============================================================================
// Register Layout
// ============================================================================

/// Absolute addresses of the register windows used by one context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlicLayout {
    /// Priority array base
    pub priority_base: usize,
    /// Pending bitmap base
    pub pending_base: usize,
    /// Enable bitmap base for this context
    pub enable_base: usize,
    /// Threshold register for this context
    pub threshold: usize,
    /// Claim/complete register for this context
    pub claim_complete: usize,
}

impl PlicLayout {
    /// Standard layout for `context` of a PLIC mapped at `base`
    pub const fn for_context(base: usize, context: PlicContext) -> Self {
        let ctx = context.as_raw() as usize;
        let context_block = base + THRESHOLD_OFFSET + ctx * CONTEXT_BLOCK_SIZE;
        Self {
            priority_base: base + PRIORITY_OFFSET,
            pending_base: base + PENDING_OFFSET,
            enable_base: base + ENABLE_OFFSET + ctx * ENABLE_BLOCK_SIZE,
            threshold: context_block,
            claim_complete: context_block + CLAIM_OFFSET,
        }
    }

    /// Priority register of a line
    ///
    /// Any `LineId` is accepted; the arithmetic wraps in the address space
    /// rather than overflowing on 32-bit harts.
    #[inline]
    pub const fn priority_addr(&self, line: LineId) -> usize {
        self.priority_base.wrapping_add((line as usize).wrapping_mul(4))
    }

    /// Pending word holding a line's bit
    #[inline]
    pub const fn pending_addr(&self, line: LineId) -> usize {
        self.pending_base + word_and_bit(line).0 * 4
    }

    /// Enable word by index
    #[inline]
    pub const fn enable_word_addr(&self, index: usize) -> usize {
        self.enable_base + index * 4
    }
}

// ============================================================================
// Lines and Claims
// ============================================================================

/// Configuration snapshot of one controller-managed line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptLine {
    /// Controller line number
    pub line_id: LineId,
    /// Priority (0 = never delivered)
    pub priority: u32,
    /// Enable bit for this context
    pub enabled: bool,
}

/// Proof of a successful claim, consumed by [`Plic::complete`]
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a claimed line stays masked until it is completed"]
pub struct ClaimToken {
    line: LineId,
}

impl ClaimToken {
    /// The claimed line
    #[inline]
    pub const fn line(&self) -> LineId {
        self.line
    }
}

// ============================================================================
// PLIC Structure
// ============================================================================

/// PLIC interface for a single context
#[derive(Debug, Clone, Copy)]
pub struct Plic<B> {
    bus: B,
    layout: PlicLayout,
}

impl<B: RegisterBus> Plic<B> {
    /// Create a PLIC driver over `bus`
    pub const fn new(bus: B, layout: PlicLayout) -> Self {
        Self { bus, layout }
    }

    /// Register layout in use
    pub fn layout(&self) -> &PlicLayout {
        &self.layout
    }

    // ========================================================================
    // Priority Registers
    // ========================================================================

    /// Set the priority of a line (0 = disabled)
    ///
    /// Valid active priorities are 1..=7. The value is written as given.
    #[inline]
    pub fn set_priority(&self, line: LineId, priority: u32) {
        self.bus.write_word(self.layout.priority_addr(line), priority);
    }

    /// Get the priority of a line
    #[inline]
    pub fn priority(&self, line: LineId) -> u32 {
        self.bus.read_word(self.layout.priority_addr(line))
    }

    // ========================================================================
    // Enable Registers
    // ========================================================================

    /// Set or clear a line's enable bit
    ///
    /// Lines at or above [`ENABLE_CAPACITY`] are ignored without touching
    /// the hardware.
    pub fn set_enabled(&self, line: LineId, enabled: bool) {
        if line >= ENABLE_CAPACITY {
            log::trace!("PLIC: line {} beyond enable capacity, ignored", line);
            return;
        }

        let (word, bit) = word_and_bit(line);
        let addr = self.layout.enable_word_addr(word);
        let current = self.bus.read_word(addr);
        let updated = if enabled {
            current | (1 << bit)
        } else {
            current & !(1 << bit)
        };
        self.bus.write_word(addr, updated);
    }

    /// Check whether a line is enabled for this context
    pub fn is_enabled(&self, line: LineId) -> bool {
        if line >= ENABLE_CAPACITY {
            return false;
        }
        let (word, bit) = word_and_bit(line);
        (self.enable_word(word) >> bit) & 1 != 0
    }

    /// Raw enable word (32 lines per word)
    #[inline]
    pub fn enable_word(&self, index: usize) -> u32 {
        self.bus.read_word(self.layout.enable_word_addr(index))
    }

    /// Set priority and enable state in one go
    pub fn configure_line(&self, line: LineId, priority: u32, enabled: bool) {
        self.set_enabled(line, enabled);
        self.set_priority(line, priority);
    }

    /// Read back a line's configuration
    pub fn line(&self, line: LineId) -> InterruptLine {
        InterruptLine {
            line_id: line,
            priority: self.priority(line),
            enabled: self.is_enabled(line),
        }
    }

    // ========================================================================
    // Threshold
    // ========================================================================

    /// Set the threshold; lines at or below it are not presented
    #[inline]
    pub fn set_threshold(&self, threshold: u32) {
        self.bus.write_word(self.layout.threshold, threshold);
    }

    /// Get the threshold
    #[inline]
    pub fn threshold(&self) -> u32 {
        self.bus.read_word(self.layout.threshold)
    }

    // ========================================================================
    // Pending and Claim/Complete
    // ========================================================================

    /// Check a line's pending bit
    #[inline]
    pub fn is_pending(&self, line: LineId) -> bool {
        let (_, bit) = word_and_bit(line);
        (self.bus.read_word(self.layout.pending_addr(line)) >> bit) & 1 != 0
    }

    /// Claim the highest-priority pending line
    ///
    /// Returns `None` when the controller reports 0.
    #[inline]
    pub fn claim(&self) -> Option<ClaimToken> {
        match self.bus.read_word(self.layout.claim_complete) {
            NO_INTERRUPT => None,
            line => Some(ClaimToken { line }),
        }
    }

    /// Complete a claimed line, letting it assert again
    #[inline]
    pub fn complete(&self, token: ClaimToken) {
        self.bus.write_word(self.layout.claim_complete, token.line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimBus;

    const BASE: usize = 0x0C00_0000;

    fn layout() -> PlicLayout {
        PlicLayout::for_context(BASE, PlicContext::machine(0))
    }

    #[test]
    fn test_context_layout() {
        let m0 = layout();
        assert_eq!(m0.priority_addr(5), BASE + 20);
        assert_eq!(m0.pending_addr(40), BASE + 0x1004);
        assert_eq!(m0.enable_word_addr(1), BASE + 0x2004);
        assert_eq!(m0.threshold, BASE + 0x20_0000);
        assert_eq!(m0.claim_complete, BASE + 0x20_0004);

        let s1 = PlicLayout::for_context(BASE, PlicContext::supervisor(1));
        assert_eq!(PlicContext::supervisor(1).as_raw(), 3);
        assert_eq!(s1.enable_base, BASE + 0x2000 + 3 * 0x80);
        assert_eq!(s1.claim_complete, BASE + 0x20_3004);
    }

    #[test]
    fn test_enable_sets_and_clears_every_line() {
        let sim = SimBus::new(layout());
        let plic = Plic::new(&sim, layout());

        for line in 0..ENABLE_CAPACITY {
            let (word, bit) = word_and_bit(line);

            plic.set_enabled(line, true);
            assert_ne!(plic.enable_word(word) & (1 << bit), 0, "line {}", line);
            assert!(plic.is_enabled(line));

            let before = plic.enable_word(word);
            plic.set_enabled(line, true);
            assert_eq!(plic.enable_word(word), before);

            plic.set_enabled(line, false);
            assert_eq!(plic.enable_word(word) & (1 << bit), 0, "line {}", line);
            assert!(!plic.is_enabled(line));
        }
    }

    #[test]
    fn test_enable_leaves_neighbours_alone() {
        let sim = SimBus::new(layout());
        let plic = Plic::new(&sim, layout());

        plic.set_enabled(33, true);
        plic.set_enabled(35, true);
        plic.set_enabled(33, false);

        assert_eq!(plic.enable_word(1), 1 << 3);
        assert_eq!(plic.enable_word(0), 0);
    }

    #[test]
    fn test_enable_beyond_capacity_is_ignored() {
        let sim = SimBus::new(layout());
        let plic = Plic::new(&sim, layout());
        plic.set_enabled(7, true);

        let before = sim.enable_words();
        for line in [128, 129, 200, 511, 1023, u32::MAX] {
            plic.set_enabled(line, true);
            assert!(!plic.is_enabled(line));
        }
        assert_eq!(sim.enable_words(), before);

        plic.set_enabled(128, false);
        assert_eq!(sim.enable_words(), before);
    }

    #[test]
    fn test_priority_written_as_given() {
        let sim = SimBus::new(layout());
        let plic = Plic::new(&sim, layout());

        plic.set_priority(3, 5);
        assert_eq!(plic.priority(3), 5);

        plic.set_priority(4, 9);
        assert_eq!(plic.priority(4), 9);
    }

    #[test]
    fn test_priority_addr_accepts_any_line() {
        let layout = PlicLayout::for_context(0x0C00_0000, PlicContext::machine(0));
        assert_eq!(layout.priority_addr(0), 0x0C00_0000);
        assert_eq!(layout.priority_addr(40), 0x0C00_00A0);
        assert_eq!(
            layout.priority_addr(LineId::MAX),
            0x0C00_0000usize.wrapping_add((LineId::MAX as usize).wrapping_mul(4))
        );
    }

    #[test]
    fn test_claim_clears_pending_and_blocks_reclaim() {
        let sim = SimBus::new(layout());
        let plic = Plic::new(&sim, layout());
        plic.configure_line(9, 3, true);

        sim.raise(9);
        assert!(plic.is_pending(9));

        let token = plic.claim().expect("line 9 should be claimable");
        assert_eq!(token.line(), 9);
        assert!(!plic.is_pending(9));

        // No new assertion: nothing to claim.
        assert!(plic.claim().is_none());

        // Re-assertion while claimed is held back by the gateway.
        sim.raise(9);
        assert!(plic.claim().is_none());

        plic.complete(token);
        let again = plic.claim().expect("line 9 re-asserted after completion");
        assert_eq!(again.line(), 9);
        plic.complete(again);

        assert_eq!(sim.protocol_violations(), 0);
        assert_eq!(sim.completions(), 2);
    }

    #[test]
    fn test_zero_priority_suppresses_delivery() {
        let sim = SimBus::new(layout());
        let plic = Plic::new(&sim, layout());
        plic.configure_line(6, 0, true);

        sim.raise(6);
        assert!(plic.is_pending(6));
        assert!(plic.claim().is_none());
    }

    #[test]
    fn test_threshold_gates_priorities() {
        let sim = SimBus::new(layout());
        let plic = Plic::new(&sim, layout());

        for t in 0..MAX_PRIORITY {
            plic.set_threshold(t);
            assert_eq!(plic.threshold(), t);

            plic.configure_line(10, t, true);
            sim.raise(10);
            assert!(plic.claim().is_none(), "priority {} at threshold {}", t, t);

            plic.set_priority(10, t + 1);
            let token = plic.claim().expect("priority above threshold is delivered");
            assert_eq!(token.line(), 10);
            plic.complete(token);
        }
        assert_eq!(sim.protocol_violations(), 0);
    }

    #[test]
    fn test_highest_priority_wins_ties_go_low() {
        let sim = SimBus::new(layout());
        let plic = Plic::new(&sim, layout());
        plic.configure_line(20, 2, true);
        plic.configure_line(21, 6, true);
        plic.configure_line(22, 6, true);

        for line in [20, 21, 22] {
            sim.raise(line);
        }

        let mut order = [0; 3];
        for slot in order.iter_mut() {
            let token = plic.claim().expect("three lines pending");
            *slot = token.line();
            plic.complete(token);
        }
        assert_eq!(order, [21, 22, 20]);
        assert!(plic.claim().is_none());
    }

    #[test]
    fn test_disabled_line_not_claimed() {
        let sim = SimBus::new(layout());
        let plic = Plic::new(&sim, layout());
        plic.configure_line(15, 4, false);

        sim.raise(15);
        assert!(plic.claim().is_none());

        plic.set_enabled(15, true);
        let token = plic.claim().expect("enabled now");
        assert_eq!(token.line(), 15);
        plic.complete(token);
    }

    #[test]
    fn test_line_snapshot() {
        let sim = SimBus::new(layout());
        let plic = Plic::new(&sim, layout());
        plic.configure_line(40, 2, true);

        assert_eq!(
            plic.line(40),
            InterruptLine { line_id: 40, priority: 2, enabled: true }
        );
    }
}
