//! Seams to the host Bluetooth stack.
//!
//! The driver never interprets HCI beyond the packet indicator and the
//! Command-Complete event code; everything else is handed across these traits.

use bt_hci::cmd::Opcode;

use crate::envelope::Envelope;
use crate::frame::PacketKind;

/// Inbound path: frames read from the chipset.
pub trait HostInbound {
    /// Take an empty envelope from the host pool. `None` drops the frame.
    fn alloc(&mut self, kind: PacketKind) -> Option<Envelope>;

    /// Deliver a filled envelope. Ownership moves to the host.
    fn recv(&mut self, envelope: Envelope);
}

/// Control path used by the bring-up sequence.
pub trait HostControl {
    /// Command submission error.
    type Error: core::fmt::Debug;

    /// Queue an HCI command for transmission.
    fn send_command(&mut self, opcode: Opcode, params: &[u8]) -> Result<(), Self::Error>;

    /// Boot finished, the chipset may now be prepared.
    fn boot_ready(&mut self);

    /// The configuration sequence completed.
    fn prepare_ready(&mut self);
}
