//! BlueNRG SPI transport: header handshake, ready-line gating, timeouts and truncation.
//!
//! Write transaction:
//!
//! ```text
//! CS low ─ wait IRQ high ─ 0A xx xx 00 00 ─┬─ ready, capacity >= len: payload ─ CS high ─ wait IRQ low
//!                                          └─ otherwise: CS high, retry until budget spent
//! ```
//!
//! Read transaction:
//!
//! ```text
//! CS low ─ wait IRQ high ─ 0B 00 00 00 00 ─ min(queued, capacity) bytes ─ CS high ─ wait IRQ low
//! ```

use embassy_time::Instant;

use crate::config::{ConfigError, LinkConfig};
use crate::error::Error;
use crate::frame::{self, Direction, FrameHeader, HEADER_SIZE, MAX_FRAME_SIZE};
use crate::link::SpiLink;
use crate::utils::blocking_wait_timeout;

/// Dummy bytes clocked out while reading.
const FILL: [u8; MAX_FRAME_SIZE] = [0; MAX_FRAME_SIZE];

/// Blocking SPI transport that owns the link for its whole lifetime.
pub struct SpiTransport<L: SpiLink> {
    link: L,
    config: LinkConfig,
    scratch: [u8; MAX_FRAME_SIZE],
}

impl<L: SpiLink> SpiTransport<L> {
    /// Create a transport after validating `config`.
    pub fn new(link: L, config: LinkConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            link,
            config,
            scratch: [0; MAX_FRAME_SIZE],
        })
    }

    /// The configuration the transport was created with.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Give the link back.
    pub fn release(self) -> L {
        self.link
    }

    /// Whether the chipset currently signals pending data. No bus traffic.
    pub fn data_available(&mut self) -> bool {
        self.link.is_ready()
    }

    /// Make sure chip-select starts de-asserted.
    pub(crate) fn park(&mut self) -> Result<(), Error<L::Error>> {
        self.link.deselect().map_err(Error::LinkFault)
    }

    /// Send `payload` in a single transaction.
    ///
    /// Attempts that find too little write capacity are retried until
    /// `exchange_timeout` has elapsed since the call; then `BufferTooSmall` is
    /// returned. A ready line that never asserts ends the call with `Timeout`.
    /// Returns the number of payload bytes sent.
    pub fn send(&mut self, payload: &[u8]) -> Result<usize, Error<L::Error>> {
        let Ok(len) = u16::try_from(payload.len()) else {
            return Err(Error::BufferTooSmall);
        };

        let start = Instant::now();
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            match self.try_send(payload, len) {
                Ok(()) => {
                    trace!("[spi] sent {} bytes after {} attempt(s)", len, attempts);
                    return Ok(payload.len());
                }
                Err(Error::BufferTooSmall) if start.elapsed() <= self.config.exchange_timeout => {
                    continue;
                }
                Err(e) => {
                    debug!("[spi] send of {} bytes failed after {} attempt(s)", len, attempts);
                    return Err(e);
                }
            }
        }
    }

    fn try_send(&mut self, payload: &[u8], len: u16) -> Result<(), Error<L::Error>> {
        self.begin()?;

        let header = match self.exchange_header(Direction::Send, frame::encode_send_header(len)) {
            Ok(h) => h,
            Err(e) => return Err(self.abort(e)),
        };

        // A header that is not ready advertises nothing, whatever bytes 1..=4 say.
        if !header.is_ready() || header.write_capacity() < len {
            trace!(
                "[spi] write capacity {} < {} (status {:02X})",
                header.write_capacity(),
                len,
                header.status()
            );
            self.end()?;
            return Err(Error::BufferTooSmall);
        }

        for chunk in payload.chunks(MAX_FRAME_SIZE) {
            let rx = &mut self.scratch[..chunk.len()];
            if let Err(e) = self.link.exchange(chunk, rx) {
                return Err(self.abort(Error::LinkFault(e)));
            }
        }

        self.end()
    }

    /// Read what the chipset has queued into `buf`.
    ///
    /// At most `buf.len()` bytes are read; anything beyond is dropped by the
    /// chipset at the end of the transaction. Returns 0 when nothing was
    /// queued or the frame starts with a zero byte.
    pub fn receive(&mut self, buf: &mut [u8]) -> Result<usize, Error<L::Error>> {
        self.begin()?;

        let header = match self.exchange_header(Direction::Receive, frame::encode_recv_header()) {
            Ok(h) => h,
            Err(e) => return Err(self.abort(e)),
        };

        let advertised = if header.is_ready() {
            header.read_length() as usize
        } else {
            trace!("[spi] chipset not ready (status {:02X}), nothing read", header.status());
            0
        };
        let n = advertised.min(buf.len());
        if advertised > n {
            debug!("[spi] truncating rx frame: {} queued, {} read", advertised, n);
        }

        let mut read = 0;
        while read < n {
            let chunk = (n - read).min(MAX_FRAME_SIZE);
            if let Err(e) = self.link.exchange(&FILL[..chunk], &mut buf[read..read + chunk]) {
                return Err(self.abort(Error::LinkFault(e)));
            }
            read += chunk;
        }

        self.end()?;

        if n > 0 && buf[0] == 0 {
            trace!("[spi] rx frame with empty indicator ignored");
            return Ok(0);
        }
        Ok(n)
    }

    /// Assert CS and wait for the chipset to raise the ready line.
    fn begin(&mut self) -> Result<(), Error<L::Error>> {
        self.link.select().map_err(Error::LinkFault)?;

        let link = &mut self.link;
        if blocking_wait_timeout(|| !link.is_ready(), self.config.exchange_timeout).is_err() {
            warn!(
                "[spi] ready line (pin {}) not asserted within {} ms",
                self.config.irq_pin,
                self.config.exchange_timeout.as_millis()
            );
            self.link.deselect().map_err(Error::LinkFault)?;
            return Err(Error::Timeout);
        }
        Ok(())
    }

    fn exchange_header(
        &mut self,
        direction: Direction,
        tx: [u8; HEADER_SIZE],
    ) -> Result<FrameHeader, Error<L::Error>> {
        let mut rx = [0u8; HEADER_SIZE];
        self.link.exchange(&tx, &mut rx).map_err(Error::LinkFault)?;
        trace!(
            "[spi] header {:02X} -> {:02X} {:02X} {:02X} {:02X} {:02X}",
            tx[0],
            rx[0],
            rx[1],
            rx[2],
            rx[3],
            rx[4]
        );
        Ok(frame::decode_header(direction, rx))
    }

    /// De-assert CS, then give the chipset time to drop the ready line.
    ///
    /// The settle wait only aligns frames; running out of time is not an error.
    fn end(&mut self) -> Result<(), Error<L::Error>> {
        self.link.deselect().map_err(Error::LinkFault)?;

        let link = &mut self.link;
        if blocking_wait_timeout(|| link.is_ready(), self.config.settle_timeout).is_err() {
            trace!("[spi] ready line still high after settle time");
        }
        Ok(())
    }

    /// Release CS after a fault in the middle of a transaction.
    fn abort(&mut self, e: Error<L::Error>) -> Error<L::Error> {
        let _ = self.link.deselect();
        e
    }
}
