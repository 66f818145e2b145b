//! Fixed-capacity HCI packet container handed between the transport and the host stack.

use bt_hci::cmd::Opcode;

use crate::frame::{PacketKind, MAX_FRAME_SIZE};

/// Largest payload an envelope can carry. One byte of the frame is taken by the
/// H4 indicator.
pub const MAX_PAYLOAD_SIZE: usize = MAX_FRAME_SIZE - 1;

/// Size of an HCI command header (opcode + parameter length).
const COMMAND_HEADER_SIZE: usize = 3;

/// Returned when bytes do not fit into an [`Envelope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CapacityError;

/// One HCI packet: a type tag and its payload, stored inline.
#[derive(Clone)]
pub struct Envelope {
    kind: PacketKind,
    len: usize,
    buf: [u8; MAX_PAYLOAD_SIZE],
}

impl Envelope {
    /// Create an empty envelope of the given kind.
    pub const fn new(kind: PacketKind) -> Self {
        Self {
            kind,
            len: 0,
            buf: [0; MAX_PAYLOAD_SIZE],
        }
    }

    /// Create an envelope holding a copy of `payload`.
    pub fn from_slice(kind: PacketKind, payload: &[u8]) -> Result<Self, CapacityError> {
        let mut env = Self::new(kind);
        env.extend_from_slice(payload)?;
        Ok(env)
    }

    /// Build an HCI command packet: little-endian opcode, parameter length, parameters.
    pub fn command(opcode: Opcode, params: &[u8]) -> Result<Self, CapacityError> {
        let param_len = u8::try_from(params.len()).map_err(|_| CapacityError)?;
        let op = opcode.to_raw().to_le_bytes();

        let mut env = Self::new(PacketKind::Command);
        env.extend_from_slice(&[op[0], op[1], param_len])?;
        env.extend_from_slice(params)?;
        Ok(env)
    }

    /// Append bytes to the payload. Nothing is copied if they do not all fit.
    pub fn extend_from_slice(&mut self, data: &[u8]) -> Result<(), CapacityError> {
        let end = self.len + data.len();
        if end > MAX_PAYLOAD_SIZE {
            return Err(CapacityError);
        }
        self.buf[self.len..end].copy_from_slice(data);
        self.len = end;
        Ok(())
    }

    /// Packet kind.
    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    /// Payload bytes (without the H4 indicator).
    pub fn payload(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Payload length.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Opcode of a command envelope, `None` for other kinds or truncated commands.
    pub fn opcode(&self) -> Option<u16> {
        if self.kind != PacketKind::Command || self.len < COMMAND_HEADER_SIZE {
            return None;
        }
        Some(u16::from_le_bytes([self.buf[0], self.buf[1]]))
    }

    /// Write the H4 frame (indicator + payload) into `out`, returning its length.
    pub(crate) fn write_frame(&self, out: &mut [u8; MAX_FRAME_SIZE]) -> usize {
        out[0] = self.kind.indicator();
        out[1..=self.len].copy_from_slice(self.payload());
        self.len + 1
    }
}

impl core::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Envelope")
            .field("kind", &self.kind)
            .field("payload", &self.payload())
            .finish()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Envelope {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Envelope {{ kind: {}, payload: {} }}", self.kind, self.payload())
    }
}

impl PartialEq for Envelope {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.payload() == other.payload()
    }
}

impl Eq for Envelope {}

#[cfg(test)]
mod tests {
    use super::*;
    use bt_hci::cmd::OpcodeGroup;

    #[test]
    fn from_slice_respects_capacity() {
        let full = [0xAAu8; MAX_PAYLOAD_SIZE];
        let env = Envelope::from_slice(PacketKind::Acl, &full).unwrap();
        assert_eq!(env.len(), MAX_PAYLOAD_SIZE);

        let too_long = [0u8; MAX_PAYLOAD_SIZE + 1];
        assert_eq!(
            Envelope::from_slice(PacketKind::Acl, &too_long),
            Err(CapacityError)
        );
    }

    #[test]
    fn failed_extend_leaves_payload_untouched() {
        let mut env = Envelope::from_slice(PacketKind::Event, &[1, 2, 3]).unwrap();
        assert_eq!(
            env.extend_from_slice(&[0u8; MAX_PAYLOAD_SIZE]),
            Err(CapacityError)
        );
        assert_eq!(env.payload(), &[1, 2, 3]);
    }

    #[test]
    fn command_layout() {
        let opcode = Opcode::new(OpcodeGroup::VENDOR_SPECIFIC, 0x00F);
        let env = Envelope::command(opcode, &[0x01, 0x04]).unwrap();
        assert_eq!(env.kind(), PacketKind::Command);
        assert_eq!(env.payload(), &[0x0F, 0xFC, 0x02, 0x01, 0x04]);
        assert_eq!(env.opcode(), Some(0xFC0F));
    }

    #[test]
    fn opcode_only_for_commands() {
        let env = Envelope::from_slice(PacketKind::Acl, &[0x0F, 0xFC, 0x00]).unwrap();
        assert_eq!(env.opcode(), None);
        assert_eq!(Envelope::new(PacketKind::Command).opcode(), None);
    }

    #[test]
    fn frame_prepends_indicator() {
        let env = Envelope::from_slice(PacketKind::Acl, &[0x10, 0x20]).unwrap();
        let mut out = [0u8; MAX_FRAME_SIZE];
        let n = env.write_frame(&mut out);
        assert_eq!(&out[..n], &[0x02, 0x10, 0x20]);
    }
}
