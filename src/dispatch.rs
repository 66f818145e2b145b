//! Polled RX path: one read transaction per tick, frames routed to the host.

use crate::error::Error;
use crate::frame::{self, PacketKind, MAX_FRAME_SIZE};
use crate::host::HostInbound;
use crate::link::SpiLink;
use crate::transport::SpiTransport;

/// Running counters of the RX path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxStats {
    /// Frames handed to the host.
    pub delivered: u32,
    /// Frames with a tag the host does not take (or no known tag at all).
    pub discarded: u32,
    /// Frames lost because the host had no envelope.
    pub dropped: u32,
}

pub struct RxDispatcher {
    buf: [u8; MAX_FRAME_SIZE],
    stats: RxStats,
}

impl Default for RxDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl RxDispatcher {
    pub const fn new() -> Self {
        Self {
            buf: [0; MAX_FRAME_SIZE],
            stats: RxStats {
                delivered: 0,
                discarded: 0,
                dropped: 0,
            },
        }
    }

    pub fn stats(&self) -> RxStats {
        self.stats
    }

    /// Run one polling tick.
    ///
    /// Returns the kind of the delivered frame, or `None` when nothing was
    /// delivered. An idle ready line means no bus transaction at all.
    pub fn tick<L, H>(
        &mut self,
        transport: &mut SpiTransport<L>,
        host: &mut H,
    ) -> Result<Option<PacketKind>, Error<L::Error>>
    where
        L: SpiLink,
        H: HostInbound + ?Sized,
    {
        if !transport.data_available() {
            return Ok(None);
        }

        let n = transport.receive(&mut self.buf)?;
        if n == 0 {
            return Ok(None);
        }

        let kind = match frame::classify(self.buf[0]) {
            Some(kind @ (PacketKind::Event | PacketKind::Acl)) => kind,
            other => {
                self.stats.discarded += 1;
                match other {
                    Some(kind) => {
                        debug!("[rx] discarding {:?} frame ({} bytes)", kind, n);
                    }
                    None => {
                        warn!(
                            "[rx] unknown packet indicator 0x{:02X}, {} bytes discarded",
                            self.buf[0],
                            n
                        );
                    }
                }
                return Ok(None);
            }
        };

        let Some(mut envelope) = host.alloc(kind) else {
            self.stats.dropped += 1;
            warn!("[rx] no host buffer for {:?} frame, {} bytes dropped", kind, n);
            return Err(Error::AllocationFailure);
        };

        if envelope.extend_from_slice(&self.buf[1..n]).is_err() {
            // Only reachable with a host envelope that is already partly filled.
            self.stats.dropped += 1;
            warn!("[rx] host buffer too small for {} bytes", n - 1);
            return Err(Error::AllocationFailure);
        }

        trace!("[rx] {:?}", envelope);
        host.recv(envelope);
        self.stats.delivered += 1;
        Ok(Some(kind))
    }
}
