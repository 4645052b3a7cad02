//! # Register Access Layer
//!
//! Typed reads and writes of fixed-width memory-mapped registers.
//!
//! Nothing here validates addresses. Callers must stay inside the register
//! windows documented for the device; a read may itself have hardware side
//! effects (reading the PLIC claim register claims an interrupt).

use core::ptr::{read_volatile, write_volatile};

// ============================================================================
// Register Width
// ============================================================================

/// Width of a single register access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RegisterWidth {
    /// 8-bit access
    Byte = 1,
    /// 32-bit access
    Word = 4,
    /// 64-bit access
    DoubleWord = 8,
}

impl RegisterWidth {
    /// Access size in bytes
    pub const fn bytes(self) -> usize {
        self as usize
    }

    /// Mask selecting the bits that fit in this width
    pub const fn mask(self) -> u64 {
        match self {
            Self::Byte => 0xFF,
            Self::Word => 0xFFFF_FFFF,
            Self::DoubleWord => u64::MAX,
        }
    }
}

// ============================================================================
// Register Bus
// ============================================================================

/// Something that can service fixed-width register reads and writes
///
/// Implemented by [`Mmio`] for real hardware and by the simulator in
/// `sim` for host-side tests.
pub trait RegisterBus {
    /// Read a register of the given width
    fn read(&self, width: RegisterWidth, addr: usize) -> u64;

    /// Write a register of the given width
    ///
    /// Bits beyond `width` are discarded.
    fn write(&self, width: RegisterWidth, addr: usize, value: u64);

    /// Read an 8-bit register
    #[inline]
    fn read_byte(&self, addr: usize) -> u8 {
        self.read(RegisterWidth::Byte, addr) as u8
    }

    /// Write an 8-bit register
    #[inline]
    fn write_byte(&self, addr: usize, value: u8) {
        self.write(RegisterWidth::Byte, addr, value as u64);
    }

    /// Read a 32-bit register
    #[inline]
    fn read_word(&self, addr: usize) -> u32 {
        self.read(RegisterWidth::Word, addr) as u32
    }

    /// Write a 32-bit register
    #[inline]
    fn write_word(&self, addr: usize, value: u32) {
        self.write(RegisterWidth::Word, addr, value as u64);
    }

    /// Read a 64-bit register
    #[inline]
    fn read_dword(&self, addr: usize) -> u64 {
        self.read(RegisterWidth::DoubleWord, addr)
    }

    /// Write a 64-bit register
    #[inline]
    fn write_dword(&self, addr: usize, value: u64) {
        self.write(RegisterWidth::DoubleWord, addr, value);
    }
}

impl<T: RegisterBus + ?Sized> RegisterBus for &T {
    #[inline]
    fn read(&self, width: RegisterWidth, addr: usize) -> u64 {
        (**self).read(width, addr)
    }

    #[inline]
    fn write(&self, width: RegisterWidth, addr: usize, value: u64) {
        (**self).write(width, addr, value);
    }
}

// ============================================================================
// Volatile MMIO
// ============================================================================

/// Direct volatile access to physical memory
#[derive(Debug, Clone, Copy)]
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// Create an MMIO accessor
    ///
    /// # Safety
    /// Every address later passed to this accessor must be a mapped device
    /// register (or RAM) that is valid for an access of the requested width.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl RegisterBus for Mmio {
    #[inline]
    fn read(&self, width: RegisterWidth, addr: usize) -> u64 {
        // SAFETY: guaranteed by the contract of `Mmio::new`
        unsafe {
            match width {
                RegisterWidth::Byte => read_volatile(addr as *const u8) as u64,
                RegisterWidth::Word => read_volatile(addr as *const u32) as u64,
                RegisterWidth::DoubleWord => read_volatile(addr as *const u64),
            }
        }
    }

    #[inline]
    fn write(&self, width: RegisterWidth, addr: usize, value: u64) {
        // SAFETY: guaranteed by the contract of `Mmio::new`
        unsafe {
            match width {
                RegisterWidth::Byte => write_volatile(addr as *mut u8, value as u8),
                RegisterWidth::Word => write_volatile(addr as *mut u32, value as u32),
                RegisterWidth::DoubleWord => write_volatile(addr as *mut u64, value),
            }
        }
    }
}

static_assertions::assert_impl_all!(Mmio: Copy, Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_geometry() {
        assert_eq!(RegisterWidth::Byte.bytes(), 1);
        assert_eq!(RegisterWidth::Word.bytes(), 4);
        assert_eq!(RegisterWidth::DoubleWord.bytes(), 8);
        assert_eq!(RegisterWidth::Word.mask(), 0xFFFF_FFFF);
    }

    #[test]
    fn test_mmio_roundtrip_on_ram() {
        let mut cell: u64 = 0;
        let addr = &mut cell as *mut u64 as usize;
        let bus = unsafe { Mmio::new() };

        bus.write_dword(addr, 0x1122_3344_5566_7788);
        assert_eq!(bus.read_dword(addr), 0x1122_3344_5566_7788);

        bus.write_word(addr, 0xDEAD_BEEF);
        assert_eq!(bus.read_word(addr), 0xDEAD_BEEF);

        bus.write_byte(addr, 0x5A);
        assert_eq!(bus.read_byte(addr), 0x5A);
    }

    #[test]
    fn test_reference_forwards() {
        let mut cell: u32 = 7;
        let addr = &mut cell as *mut u32 as usize;
        let bus = unsafe { Mmio::new() };
        let by_ref: &dyn RegisterBus = &bus;
        assert_eq!((&by_ref).read_word(addr), 7);
    }
}
