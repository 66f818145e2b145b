//! BlueNRG-2 vendor commands (ACI) used during bring-up.

use bt_hci::cmd::{Opcode, OpcodeGroup};
use bt_hci::param::BdAddr;

/// `ACI_HAL_WRITE_CONFIG_DATA`
pub const HAL_WRITE_CONFIG_DATA: Opcode = Opcode::new(OpcodeGroup::VENDOR_SPECIFIC, 0x000C);
/// `ACI_HAL_SET_TX_POWER_LEVEL`
pub const HAL_SET_TX_POWER_LEVEL: Opcode = Opcode::new(OpcodeGroup::VENDOR_SPECIFIC, 0x000F);
/// `ACI_GATT_INIT`
pub const GATT_INIT: Opcode = Opcode::new(OpcodeGroup::VENDOR_SPECIFIC, 0x0101);
/// `ACI_GAP_INIT`
pub const GAP_INIT: Opcode = Opcode::new(OpcodeGroup::VENDOR_SPECIFIC, 0x008A);

/// Config-data offset of the public address.
pub const CONFIG_PUBLIC_ADDRESS: u8 = 0x00;
/// Config-data offset of the link-layer-only switch.
pub const CONFIG_LL_ONLY: u8 = 0x2C;

/// GAP role bits.
pub const GAP_PERIPHERAL_ROLE: u8 = 0x01;
pub const GAP_BROADCASTER_ROLE: u8 = 0x02;
pub const GAP_CENTRAL_ROLE: u8 = 0x04;
pub const GAP_OBSERVER_ROLE: u8 = 0x08;

/// Longest parameter block among the bring-up commands.
pub const MAX_PARAMS: usize = 2 + 6;

/// A command ready to be handed to the host stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub opcode: Opcode,
    len: u8,
    params: [u8; MAX_PARAMS],
}

impl Command {
    const fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            len: 0,
            params: [0; MAX_PARAMS],
        }
    }

    pub fn params(&self) -> &[u8] {
        &self.params[..self.len as usize]
    }

    fn push(mut self, byte: u8) -> Self {
        self.params[self.len as usize] = byte;
        self.len += 1;
        self
    }
}

/// `ACI_HAL_WRITE_CONFIG_DATA` with a single value byte.
pub fn write_config_byte(offset: u8, value: u8) -> Command {
    Command::new(HAL_WRITE_CONFIG_DATA).push(offset).push(1).push(value)
}

/// `ACI_HAL_WRITE_CONFIG_DATA` storing the public address.
pub fn write_public_address(addr: BdAddr) -> Command {
    let mut cmd = Command::new(HAL_WRITE_CONFIG_DATA)
        .push(CONFIG_PUBLIC_ADDRESS)
        .push(6);
    for b in addr.raw() {
        cmd = cmd.push(*b);
    }
    cmd
}

pub fn set_tx_power_level(high_power: bool, pa_level: u8) -> Command {
    Command::new(HAL_SET_TX_POWER_LEVEL)
        .push(high_power as u8)
        .push(pa_level)
}

pub fn gatt_init() -> Command {
    Command::new(GATT_INIT)
}

pub fn gap_init(role: u8, privacy: bool, device_name_len: u8) -> Command {
    Command::new(GAP_INIT)
        .push(role)
        .push(privacy as u8)
        .push(device_name_len)
}
