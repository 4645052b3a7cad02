//! # Driver Errors
//!
//! Register accesses never fail at the software level. Only setup and
//! handler registration can be refused, and they report it here.

/// Setup and registration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptError {
    /// Handlers and line configuration are frozen once interrupts are armed
    AlreadyArmed,
    /// The trap vector has not been installed yet
    NotInstalled,
    /// mtvec base address is not 4-byte aligned
    MisalignedVectorBase(usize),
    /// Board reported more devices than the line mapping can hold
    TooManyDevices {
        /// Devices the board asked for
        requested: usize,
        /// Mapping capacity
        capacity: usize,
    },
    /// Device index outside the line mapping
    InvalidDevice(usize),
}

impl core::fmt::Display for InterruptError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AlreadyArmed => write!(f, "Interrupts already armed"),
            Self::NotInstalled => write!(f, "Trap vector not installed"),
            Self::MisalignedVectorBase(base) => {
                write!(f, "Vector table base {:#x} is not 4-byte aligned", base)
            },
            Self::TooManyDevices { requested, capacity } => write!(
                f,
                "Board maps {} devices but only {} are supported",
                requested, capacity
            ),
            Self::InvalidDevice(index) => write!(f, "No device at index {}", index),
        }
    }
}

/// Result type for driver setup operations
pub type InterruptResult<T> = Result<T, InterruptError>;
