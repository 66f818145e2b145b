//! Polled HCI driver for a BlueNRG-2 attached over SPI.
//!
//! ```rust,ignore
//! let link = HalSpiLink::new(spi, cs, irq);
//! let mut driver = SpiHciDriver::new(link, LinkConfig::default(), BringupConfig::default())?;
//! driver.open()?;
//! driver.boot_start(&mut host);
//! driver.prepare_start(&mut host);
//!
//! loop {
//!     if let Err(e) = driver.poll(&mut host) {
//!         warn!("poll: {:?}", e);
//!     }
//! }
//! ```

use crate::bringup::{Bringup, BringupConfig, EventKind, State};
use crate::config::{ConfigError, LinkConfig};
use crate::dispatch::{RxDispatcher, RxStats};
use crate::envelope::Envelope;
use crate::error::Error;
use crate::frame::{PacketKind, MAX_FRAME_SIZE};
use crate::host::{HostControl, HostInbound};
use crate::link::SpiLink;
use crate::transport::SpiTransport;

pub struct SpiHciDriver<L: SpiLink> {
    transport: SpiTransport<L>,
    rx: RxDispatcher,
    bringup: Bringup,
    tx_buf: [u8; MAX_FRAME_SIZE],
}

impl<L: SpiLink> SpiHciDriver<L> {
    pub fn new(
        link: L,
        link_config: LinkConfig,
        bringup_config: BringupConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            transport: SpiTransport::new(link, link_config)?,
            rx: RxDispatcher::new(),
            bringup: Bringup::new(bringup_config),
            tx_buf: [0; MAX_FRAME_SIZE],
        })
    }

    /// Log the link setup and park chip-select.
    pub fn open(&mut self) -> Result<(), Error<L::Error>> {
        let c = self.transport.config();
        info!(
            "[hci] spi {} Hz, {} bit, {:?}, {:?}, cs pin {}, irq pin {}",
            c.frequency_hz,
            c.data_width.bits(),
            c.bit_order,
            c.role,
            c.cs_pin,
            c.irq_pin
        );
        debug!(
            "[hci] exchange timeout {} ms, settle timeout {} ms",
            c.exchange_timeout.as_millis(),
            c.settle_timeout.as_millis()
        );
        self.transport.park()
    }

    /// Transmit one host-to-controller packet.
    ///
    /// On failure the envelope is handed back with the error.
    pub fn send(&mut self, envelope: Envelope) -> Result<(), (Error<L::Error>, Envelope)> {
        if !envelope.kind().is_host_to_controller() {
            warn!("[hci] refusing to send {:?} packet", envelope.kind());
            return Err((Error::InvalidPacket, envelope));
        }

        let n = envelope.write_frame(&mut self.tx_buf);
        match self.transport.send(&self.tx_buf[..n]) {
            Ok(_) => Ok(()),
            Err(e) => {
                debug!("[hci] {:?} packet of {} bytes not sent", envelope.kind(), n);
                Err((e, envelope))
            }
        }
    }

    /// One polling tick: read at most one frame, then run the bring-up watchdog.
    ///
    /// The watchdog runs even when the read fails. Returns the kind of the
    /// frame delivered to the host, if any; a stalled bring-up is reported
    /// ahead of a read error.
    pub fn poll<H>(&mut self, host: &mut H) -> Result<Option<PacketKind>, Error<L::Error>>
    where
        H: HostInbound + HostControl,
    {
        let delivered = self.rx.tick(&mut self.transport, host);
        self.bringup.poll(host)?;
        delivered
    }

    pub fn boot_start<H: HostControl>(&mut self, host: &mut H) {
        self.bringup.boot_start(host);
    }

    pub fn prepare_start<H: HostControl>(&mut self, host: &mut H) {
        self.bringup.prepare_start(host);
    }

    pub fn event_process<H: HostControl>(&mut self, event: EventKind, payload: &[u8], host: &mut H) {
        self.bringup.event_process(event, payload, host);
    }

    pub fn state(&self) -> State {
        self.bringup.state()
    }

    pub fn bringup(&self) -> &Bringup {
        &self.bringup
    }

    pub fn stats(&self) -> RxStats {
        self.rx.stats()
    }

    pub fn transport(&mut self) -> &mut SpiTransport<L> {
        &mut self.transport
    }

    /// Tear down and give the link back.
    pub fn release(self) -> L {
        self.transport.release()
    }
}
