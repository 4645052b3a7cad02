//! # External Interrupt Demultiplexing
//!
//! Routes a claimed line to the routine registered for the device wired to
//! it. Lines that belong to no device are dropped.

use crate::error::{InterruptError, InterruptResult};
use crate::interrupts::lines::{LineMapping, MAX_DEVICES};
use crate::interrupts::plic::LineId;

/// Per-device interrupt routine
pub type DeviceRoutine = fn(device: usize, line: LineId);

/// Device routine table
#[derive(Clone, Copy)]
pub struct DeviceDemux {
    routines: [Option<DeviceRoutine>; MAX_DEVICES],
}

impl DeviceDemux {
    /// Table with no routines
    pub const fn new() -> Self {
        Self {
            routines: [None; MAX_DEVICES],
        }
    }

    /// Register the routine for device `device`
    pub fn register(&mut self, device: usize, routine: DeviceRoutine) -> InterruptResult<()> {
        let slot = self
            .routines
            .get_mut(device)
            .ok_or(InterruptError::InvalidDevice(device))?;
        *slot = Some(routine);
        Ok(())
    }

    /// Remove the routine for device `device`
    pub fn unregister(&mut self, device: usize) -> Option<DeviceRoutine> {
        self.routines.get_mut(device).and_then(Option::take)
    }

    /// Whether device `device` has a routine
    pub fn is_registered(&self, device: usize) -> bool {
        matches!(self.routines.get(device), Some(Some(_)))
    }

    /// Route `line` to its device
    ///
    /// Returns the matched device index, or `None` when no device is wired
    /// to `line`. A matched device without a routine is still reported.
    pub fn dispatch(&self, mapping: &LineMapping, line: LineId) -> Option<usize> {
        let Some(device) = mapping.device_for_line(line) else {
            log::trace!("Demux: line {} has no device", line);
            return None;
        };

        match self.routines.get(device).copied().flatten() {
            Some(routine) => routine(device, line),
            None => log::trace!("Demux: device {} (line {}) has no routine", device, line),
        }
        Some(device)
    }
}

impl Default for DeviceDemux {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for DeviceDemux {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let registered = self.routines.iter().filter(|r| r.is_some()).count();
        f.debug_struct("DeviceDemux")
            .field("registered", &registered)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};

    static LAST_DEVICE: AtomicUsize = AtomicUsize::new(usize::MAX);
    static CALLS: AtomicUsize = AtomicUsize::new(0);

    fn record(device: usize, _line: LineId) {
        LAST_DEVICE.store(device, Ordering::SeqCst);
        CALLS.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn test_routes_to_matching_device() {
        let mapping = LineMapping::from_lines(&[5, 12, 40]).unwrap();
        let mut demux = DeviceDemux::new();
        demux.register(1, record).unwrap();

        let before = CALLS.load(Ordering::SeqCst);
        assert_eq!(demux.dispatch(&mapping, 12), Some(1));
        assert_eq!(LAST_DEVICE.load(Ordering::SeqCst), 1);
        assert_eq!(CALLS.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    fn test_unmatched_line_is_noop() {
        let mapping = LineMapping::from_lines(&[5, 12, 40]).unwrap();
        let demux = DeviceDemux::new();
        assert_eq!(demux.dispatch(&mapping, 13), None);
        // Matched but no routine.
        assert_eq!(demux.dispatch(&mapping, 40), Some(2));
    }

    #[test]
    fn test_register_bounds() {
        let mut demux = DeviceDemux::new();
        assert_eq!(
            demux.register(MAX_DEVICES, record),
            Err(InterruptError::InvalidDevice(MAX_DEVICES))
        );
        demux.register(3, record).unwrap();
        assert!(demux.is_registered(3));
        assert!(demux.unregister(3).is_some());
        assert!(!demux.is_registered(3));
    }
}
