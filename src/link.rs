//! SPI link: the only hardware primitive the transport depends on.

use embedded_hal_1::digital::{self, InputPin, OutputPin};
use embedded_hal_1::spi::{self, SpiBus};

/// One full-duplex SPI bus plus the chip-select and ready lines of the chipset.
///
/// Implementations only report driver-level faults; protocol conditions are
/// handled by [`SpiTransport`](crate::transport::SpiTransport).
pub trait SpiLink {
    /// Link fault type.
    type Error: core::fmt::Debug;

    /// Assert chip-select.
    fn select(&mut self) -> Result<(), Self::Error>;

    /// De-assert chip-select.
    fn deselect(&mut self) -> Result<(), Self::Error>;

    /// Clock `tx` out while clocking the same number of bytes into `rx`.
    ///
    /// Callers pass slices of equal length.
    fn exchange(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), Self::Error>;

    /// Sample the ready line. Never blocks.
    fn is_ready(&mut self) -> bool;
}

/// Fault raised by [`HalSpiLink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// SPI bus error during a transfer.
    Spi(spi::ErrorKind),
    /// Chip-select pin could not be driven.
    ChipSelect(digital::ErrorKind),
}

impl core::fmt::Display for LinkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LinkError::Spi(e) => write!(f, "SPI bus error: {}", e),
            LinkError::ChipSelect(e) => write!(f, "chip-select error: {}", e),
        }
    }
}

impl core::error::Error for LinkError {}

/// [`SpiLink`] over `embedded-hal` 1.0 traits.
///
/// Chip-select is active low; the ready line is active high.
pub struct HalSpiLink<SPI, CS, IRQ> {
    spi: SPI,
    cs: CS,
    irq: IRQ,
}

impl<SPI, CS, IRQ> HalSpiLink<SPI, CS, IRQ>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
    IRQ: InputPin,
{
    /// Wrap an already configured bus and the two GPIO lines.
    pub fn new(spi: SPI, cs: CS, irq: IRQ) -> Self {
        Self { spi, cs, irq }
    }

    /// Give the peripherals back.
    pub fn release(self) -> (SPI, CS, IRQ) {
        (self.spi, self.cs, self.irq)
    }
}

impl<SPI, CS, IRQ> SpiLink for HalSpiLink<SPI, CS, IRQ>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
    IRQ: InputPin,
{
    type Error = LinkError;

    fn select(&mut self) -> Result<(), Self::Error> {
        self.cs
            .set_low()
            .map_err(|e| LinkError::ChipSelect(digital::Error::kind(&e)))
    }

    fn deselect(&mut self) -> Result<(), Self::Error> {
        self.cs
            .set_high()
            .map_err(|e| LinkError::ChipSelect(digital::Error::kind(&e)))
    }

    fn exchange(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), Self::Error> {
        debug_assert_eq!(tx.len(), rx.len());
        self.spi
            .transfer(rx, tx)
            .and_then(|_| self.spi.flush())
            .map_err(|e| LinkError::Spi(spi::Error::kind(&e)))
    }

    fn is_ready(&mut self) -> bool {
        self.irq.is_high().unwrap_or(false)
    }
}
