//! BlueNRG SPI frame codec.
//!
//! Every SPI transaction starts with a 5-byte header exchanged in both
//! directions. The host sends a direction tag followed by four bytes; the
//! chipset answers with a status byte followed by two little-endian counters:
//!
//! ```text
//! byte  0        1..=2              3..=4
//!       tag      write capacity     read length
//! ```
//!
//! The codec is pure: it never touches the bus and never checks the header
//! against the state of the ready line.

/// Size of the handshake header in bytes.
pub const HEADER_SIZE: usize = 5;

/// Largest frame (H4 indicator + HCI packet) moved in one transaction.
pub const MAX_FRAME_SIZE: usize = 255;

/// Status byte of a header answered by an awake, ready chipset.
pub const STATUS_READY: u8 = 0x02;

/// Direction requested by the host in byte 0 of the header.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Host wants to write to the chipset.
    Send = 0x0A,
    /// Host wants to read what the chipset has queued.
    Receive = 0x0B,
}

impl Direction {
    /// Raw tag value.
    pub const fn tag(self) -> u8 {
        self as u8
    }
}

/// H4 packet indicator carried in the first byte of every HCI frame.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketKind {
    Command = 0x01,
    Acl = 0x02,
    Sco = 0x03,
    Event = 0x04,
    Iso = 0x05,
    Vendor = 0xFF,
}

impl PacketKind {
    /// Map an indicator byte to a packet kind. Unknown values yield `None`.
    pub const fn from_indicator(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Command),
            0x02 => Some(Self::Acl),
            0x03 => Some(Self::Sco),
            0x04 => Some(Self::Event),
            0x05 => Some(Self::Iso),
            0xFF => Some(Self::Vendor),
            _ => None,
        }
    }

    /// Raw indicator byte.
    pub const fn indicator(self) -> u8 {
        self as u8
    }

    /// Whether a packet of this kind may travel from the host to the controller.
    pub const fn is_host_to_controller(self) -> bool {
        matches!(self, Self::Command | Self::Acl | Self::Sco | Self::Iso)
    }
}

/// A decoded handshake header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameHeader {
    direction: Direction,
    raw: [u8; HEADER_SIZE],
}

impl FrameHeader {
    /// Direction the header was decoded for.
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Byte 0 as returned by the chipset (0x02 when it is ready on BlueNRG parts).
    pub const fn status(&self) -> u8 {
        self.raw[0]
    }

    /// Whether the status byte reports the chipset ready. The counters of a
    /// header that is not ready carry no meaning.
    pub const fn is_ready(&self) -> bool {
        self.raw[0] == STATUS_READY
    }

    /// Write capacity advertised by the chipset (bytes 1..=2).
    pub const fn write_capacity(&self) -> u16 {
        u16::from_le_bytes([self.raw[1], self.raw[2]])
    }

    /// Number of bytes the chipset has queued for the host (bytes 3..=4).
    pub const fn read_length(&self) -> u16 {
        u16::from_le_bytes([self.raw[3], self.raw[4]])
    }

    /// The counter relevant to [`Self::direction`]: write capacity for a send,
    /// queued length for a receive.
    pub const fn count(&self) -> u16 {
        match self.direction {
            Direction::Send => self.write_capacity(),
            Direction::Receive => self.read_length(),
        }
    }

    /// Undecoded header bytes.
    pub const fn raw(&self) -> &[u8; HEADER_SIZE] {
        &self.raw
    }
}

/// Header asking the chipset for permission to write `byte_count` bytes.
pub const fn encode_send_header(byte_count: u16) -> [u8; HEADER_SIZE] {
    let len = byte_count.to_le_bytes();
    [Direction::Send.tag(), len[0], len[1], 0x00, 0x00]
}

/// Header asking the chipset how many bytes it has queued.
pub const fn encode_recv_header() -> [u8; HEADER_SIZE] {
    [Direction::Receive.tag(), 0x00, 0x00, 0x00, 0x00]
}

/// Interpret the header bytes clocked back by the chipset.
pub const fn decode_header(direction: Direction, raw: [u8; HEADER_SIZE]) -> FrameHeader {
    FrameHeader { direction, raw }
}

/// Classify the leading byte of a received frame.
#[inline]
pub const fn classify(type_byte: u8) -> Option<PacketKind> {
    PacketKind::from_indicator(type_byte)
}
