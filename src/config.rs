//! SPI link configuration.
//!
//! The bus itself is configured by the platform HAL when the `SpiBus` is
//! created; this struct records the parameters the protocol was validated for
//! and carries the protocol timeouts.

use embassy_time::Duration;
use embedded_hal_1::spi::{Mode, MODE_1};

/// Word size on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataWidth {
    /// 8-bit words
    Bits8,
    /// 16-bit words
    Bits16,
    /// 32-bit words
    Bits32,
}

impl DataWidth {
    /// Width in bits.
    pub const fn bits(self) -> u8 {
        match self {
            DataWidth::Bits8 => 8,
            DataWidth::Bits16 => 16,
            DataWidth::Bits32 => 32,
        }
    }
}

/// Bit transmission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitOrder {
    /// Most significant bit first
    MsbFirst,
    /// Least significant bit first
    LsbFirst,
}

/// Which side drives the clock and chip-select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    /// Host drives SCK and CS
    Master,
    /// Host is clocked by the peer
    Slave,
}

/// Config Error
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Clock rate is zero.
    ZeroFrequency,
    /// The handshake is byte oriented; only 8-bit words are supported.
    UnsupportedDataWidth(DataWidth),
    /// The host must own chip-select.
    SlaveRoleUnsupported,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::ZeroFrequency => write!(f, "SPI clock rate is zero"),
            ConfigError::UnsupportedDataWidth(w) => {
                write!(f, "unsupported data width: {} bits", w.bits())
            }
            ConfigError::SlaveRoleUnsupported => write!(f, "host must be SPI master"),
        }
    }
}

impl core::error::Error for ConfigError {}

/// Immutable per-session link configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    /// SPI clock rate in Hz.
    pub frequency_hz: u32,
    /// Word size.
    pub data_width: DataWidth,
    /// Bit order.
    pub bit_order: BitOrder,
    /// Master/slave role of the host.
    pub role: Role,
    /// Clock polarity and phase.
    pub mode: Mode,
    /// Platform identity of the chip-select pin (used for diagnostics only).
    pub cs_pin: u8,
    /// Platform identity of the ready/IRQ pin (used for diagnostics only).
    pub irq_pin: u8,
    /// Bound on waiting for the ready line, and on the whole retry loop of a send.
    pub exchange_timeout: Duration,
    /// Bound on waiting for the ready line to drop after a frame.
    pub settle_timeout: Duration,
}

impl LinkConfig {
    /// Reference board settings: 1 MHz, 8 bits, MSB first, master, CPOL=0 CPHA=1.
    pub const fn new() -> Self {
        Self {
            frequency_hz: 1_000_000,
            data_width: DataWidth::Bits8,
            bit_order: BitOrder::MsbFirst,
            role: Role::Master,
            mode: MODE_1,
            cs_pin: 1,
            irq_pin: 0,
            exchange_timeout: Duration::from_millis(100),
            settle_timeout: Duration::from_millis(1000),
        }
    }

    /// Check the configuration against what the handshake protocol can run on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frequency_hz == 0 {
            return Err(ConfigError::ZeroFrequency);
        }
        if self.data_width != DataWidth::Bits8 {
            return Err(ConfigError::UnsupportedDataWidth(self.data_width));
        }
        if self.role != Role::Master {
            return Err(ConfigError::SlaveRoleUnsupported);
        }
        Ok(())
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::new()
    }
}
