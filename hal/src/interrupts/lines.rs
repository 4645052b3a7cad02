//! # Device Line Mapping
//!
//! Boards describe their device-to-line wiring through [`LineSource`]. The
//! driver copies it once into a fixed-capacity [`LineMapping`] that the
//! external-interrupt path searches when routing a claimed line.

use crate::error::{InterruptError, InterruptResult};
use crate::interrupts::plic::LineId;

/// Maximum number of devices a mapping can hold
pub const MAX_DEVICES: usize = 64;

/// Board-supplied device-to-line table
pub trait LineSource {
    /// Number of devices on the board
    fn device_count(&self) -> usize;

    /// Controller line wired to device `index`
    ///
    /// Only called with `index < device_count()`.
    fn line_for_device(&self, index: usize) -> LineId;
}

impl LineSource for [LineId] {
    fn device_count(&self) -> usize {
        self.len()
    }

    fn line_for_device(&self, index: usize) -> LineId {
        self[index]
    }
}

impl<const N: usize> LineSource for [LineId; N] {
    fn device_count(&self) -> usize {
        N
    }

    fn line_for_device(&self, index: usize) -> LineId {
        self[index]
    }
}

/// Fixed-capacity copy of a board's line table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineMapping {
    lines: [LineId; MAX_DEVICES],
    len: usize,
}

impl LineMapping {
    /// Mapping with no devices
    pub const fn empty() -> Self {
        Self {
            lines: [0; MAX_DEVICES],
            len: 0,
        }
    }

    /// Copy a board's table
    pub fn from_source<S: LineSource + ?Sized>(source: &S) -> InterruptResult<Self> {
        let count = source.device_count();
        if count > MAX_DEVICES {
            return Err(InterruptError::TooManyDevices {
                requested: count,
                capacity: MAX_DEVICES,
            });
        }

        let mut mapping = Self::empty();
        for (index, slot) in mapping.lines[..count].iter_mut().enumerate() {
            *slot = source.line_for_device(index);
        }
        mapping.len = count;
        Ok(mapping)
    }

    /// Build from a plain list of lines
    pub fn from_lines(lines: &[LineId]) -> InterruptResult<Self> {
        Self::from_source(lines)
    }

    /// Number of devices
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True when no devices are mapped
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Line of device `index`
    pub fn line(&self, index: usize) -> Option<LineId> {
        self.as_slice().get(index).copied()
    }

    /// First device wired to `line`
    pub fn device_for_line(&self, line: LineId) -> Option<usize> {
        self.as_slice().iter().position(|&l| l == line)
    }

    /// Mapped lines in device order
    pub fn as_slice(&self) -> &[LineId] {
        &self.lines[..self.len]
    }

    /// `(device, line)` pairs in device order
    pub fn iter(&self) -> impl Iterator<Item = (usize, LineId)> + '_ {
        self.as_slice().iter().copied().enumerate()
    }
}

impl Default for LineMapping {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sparse;

    impl LineSource for Sparse {
        fn device_count(&self) -> usize {
            3
        }

        fn line_for_device(&self, index: usize) -> LineId {
            [5, 12, 40][index]
        }
    }

    #[test]
    fn test_copy_from_board() {
        let mapping = LineMapping::from_source(&Sparse).unwrap();
        assert_eq!(mapping.len(), 3);
        assert_eq!(mapping.as_slice(), &[5, 12, 40]);
        assert_eq!(mapping.device_for_line(12), Some(1));
        assert_eq!(mapping.device_for_line(13), None);
        assert_eq!(mapping.line(2), Some(40));
        assert_eq!(mapping.line(3), None);
    }

    #[test]
    fn test_duplicate_line_resolves_to_first_device() {
        let mapping = LineMapping::from_lines(&[7, 9, 7]).unwrap();
        assert_eq!(mapping.device_for_line(7), Some(0));
    }

    #[test]
    fn test_capacity_enforced() {
        let lines: [LineId; MAX_DEVICES + 1] = [1; MAX_DEVICES + 1];
        assert_eq!(
            LineMapping::from_source(&lines),
            Err(InterruptError::TooManyDevices {
                requested: MAX_DEVICES + 1,
                capacity: MAX_DEVICES,
            })
        );
        let full: [LineId; MAX_DEVICES] = [1; MAX_DEVICES];
        assert!(LineMapping::from_source(&full).is_ok());
    }

    #[test]
    fn test_empty_board() {
        let mapping = LineMapping::from_lines(&[]).unwrap();
        assert!(mapping.is_empty());
        assert_eq!(mapping.iter().count(), 0);
    }
}
