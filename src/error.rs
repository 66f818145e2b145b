//! Transport and driver error types.

use crate::bringup::BringupError;

/// Error returned by the transport, the RX dispatcher and the driver.
///
/// `E` is the link fault type of the underlying [`SpiLink`](crate::link::SpiLink).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Ready line did not assert in time, or a send ran out of retry budget.
    Timeout,
    /// Chipset advertised less write capacity than the frame needs.
    BufferTooSmall,
    /// Host stack had no envelope for an inbound frame; the frame was dropped.
    AllocationFailure,
    /// Envelope kind cannot be sent to the controller, or the frame does not fit.
    InvalidPacket,
    /// Bring-up gave up on a step.
    Bringup(BringupError),
    /// Bus or GPIO fault reported by the link.
    LinkFault(E),
}

impl<E: core::fmt::Debug> core::fmt::Display for Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Timeout => write!(f, "timed out waiting for the chipset"),
            Error::BufferTooSmall => write!(f, "chipset write buffer too small"),
            Error::AllocationFailure => write!(f, "no inbound buffer available"),
            Error::InvalidPacket => write!(f, "packet cannot be sent to the controller"),
            Error::Bringup(e) => write!(f, "bring-up error: {}", e),
            Error::LinkFault(e) => write!(f, "link fault: {:?}", e),
        }
    }
}

impl<E: core::fmt::Debug> core::error::Error for Error<E> {}

impl<E: core::fmt::Debug> embedded_io::Error for Error<E> {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            Error::Timeout => embedded_io::ErrorKind::TimedOut,
            Error::BufferTooSmall | Error::AllocationFailure => embedded_io::ErrorKind::OutOfMemory,
            Error::InvalidPacket => embedded_io::ErrorKind::InvalidInput,
            Error::Bringup(_) => embedded_io::ErrorKind::TimedOut,
            Error::LinkFault(_) => embedded_io::ErrorKind::Other,
        }
    }
}

impl<E> From<BringupError> for Error<E> {
    fn from(e: BringupError) -> Self {
        Self::Bringup(e)
    }
}
