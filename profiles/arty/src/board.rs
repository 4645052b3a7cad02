//! # Arty Board Wiring
//!
//! Global interrupt lines of the Arty core complex and the routines that
//! service them.

use core::sync::atomic::{AtomicU32, Ordering};

use plic_hal::interrupts::LineSource;
use plic_hal::LineId;

/// One interrupt-generating peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Device {
    /// Peripheral name for logs
    pub name: &'static str,
    /// PLIC line it drives
    pub line: LineId,
}

/// Board devices in logical index order
pub const DEVICES: [Device; 6] = [
    Device { name: "uart0", line: 1 },
    Device { name: "uart1", line: 2 },
    Device { name: "spi0", line: 3 },
    Device { name: "gpio0", line: 8 },
    Device { name: "gpio1", line: 9 },
    Device { name: "pwm0", line: 40 },
];

const DEVICE_COUNT: usize = DEVICES.len();

/// The board's line table
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtyBoard;

impl LineSource for ArtyBoard {
    fn device_count(&self) -> usize {
        DEVICE_COUNT
    }

    fn line_for_device(&self, index: usize) -> LineId {
        DEVICES[index].line
    }
}

#[allow(clippy::declare_interior_mutable_const)]
const ZERO: AtomicU32 = AtomicU32::new(0);
static SERVICED: [AtomicU32; DEVICE_COUNT] = [ZERO; DEVICE_COUNT];

/// Routine registered for every board device
///
/// Peripheral-specific work (draining a FIFO, acknowledging a GPIO edge)
/// belongs here; the driver completes the line after this returns.
pub fn service(device: usize, line: LineId) {
    let Some(info) = DEVICES.get(device) else {
        log::warn!("Routine called for unknown device {}", device);
        return;
    };
    if let Some(count) = SERVICED.get(device) {
        count.fetch_add(1, Ordering::Relaxed);
    }
    log::debug!("{} serviced (line {})", info.name, line);
}

/// Times device `device` has been serviced
pub fn serviced(device: usize) -> u32 {
    SERVICED
        .get(device)
        .map_or(0, |count| count.load(Ordering::Relaxed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_are_unique_and_enableable() {
        for (i, a) in DEVICES.iter().enumerate() {
            assert!(a.line > 0 && a.line < 128, "{}", a.name);
            for b in &DEVICES[i + 1..] {
                assert_ne!(a.line, b.line);
            }
        }
    }

    #[test]
    fn test_line_source() {
        assert_eq!(ArtyBoard.device_count(), DEVICES.len());
        assert_eq!(ArtyBoard.line_for_device(5), 40);
    }

    #[test]
    fn test_service_counts() {
        let before = serviced(2);
        service(2, 3);
        assert_eq!(serviced(2), before + 1);
        service(99, 3);
        assert_eq!(serviced(99), 0);
    }
}
