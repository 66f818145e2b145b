#![cfg_attr(not(test), no_std)]
#![doc = include_str!("../README.md")]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

mod utils;

pub mod aci;
pub mod bringup;
pub mod config;
pub mod dispatch;
pub mod driver;
pub mod envelope;
pub mod error;
pub mod frame;
pub mod host;
pub mod link;
pub mod transport;

#[cfg(test)]
mod mock;

// Reexports
pub use bringup::{Bringup, BringupConfig, BringupError, EventKind, State};
pub use config::{ConfigError, LinkConfig};
pub use dispatch::{RxDispatcher, RxStats};
pub use driver::SpiHciDriver;
pub use envelope::Envelope;
pub use error::Error;
pub use frame::PacketKind;
pub use host::{HostControl, HostInbound};
pub use link::{HalSpiLink, LinkError, SpiLink};
pub use transport::SpiTransport;
