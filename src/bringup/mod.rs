//! Bring-up sequence of the BlueNRG-2.
//!
//! After the host reports boot, the chipset is configured by five vendor
//! commands issued one at a time. Each Command-Complete for the pending command
//! seen while [`State::Preparing`] issues the next one; the last one hands
//! control back to the host through [`HostControl::prepare_ready`].
//!
//! Completions carrying another opcode are ignored. When a step had to be
//! re-issued, the completions of the extra copies are absorbed after the step
//! advances, so one acknowledgement never moves the sequence twice.

use bt_hci::param::BdAddr;
use embassy_time::{Duration, Instant};

use crate::aci::{self, Command};
use crate::host::HostControl;

/// Number of commands in the sequence.
pub const STEP_COUNT: u8 = 5;

/// HCI event codes the sequence reacts to.
const EVT_COMMAND_COMPLETE: u8 = 0x0E;
const EVT_COMMAND_STATUS: u8 = 0x0F;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    Idle,
    Booting,
    Preparing,
}

/// Event notification passed to [`Bringup::event_process`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventKind {
    CommandComplete,
    CommandStatus,
    Other(u8),
}

impl EventKind {
    /// Map an HCI event code.
    pub const fn from_code(code: u8) -> Self {
        match code {
            EVT_COMMAND_COMPLETE => EventKind::CommandComplete,
            EVT_COMMAND_STATUS => EventKind::CommandStatus,
            other => EventKind::Other(other),
        }
    }
}

/// Parameters of the configuration commands plus the step watchdog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BringupConfig {
    /// Public device address, least significant byte first.
    pub public_address: BdAddr,
    pub high_power: bool,
    /// PA level, 0..=7.
    pub pa_level: u8,
    /// GAP role bits, see [`aci::GAP_PERIPHERAL_ROLE`] and friends.
    pub gap_role: u8,
    pub privacy: bool,
    pub device_name_len: u8,
    /// Time to wait for a Command-Complete before the step is re-issued.
    /// `None` waits forever and never re-issues an acknowledged send.
    pub step_timeout: Option<Duration>,
    /// Re-issues per step before giving up.
    pub max_retries: u8,
}

impl BringupConfig {
    pub fn new() -> Self {
        Self {
            public_address: BdAddr::new([0xF5, 0x00, 0x00, 0xE1, 0x80, 0x02]),
            high_power: true,
            pa_level: 4,
            gap_role: aci::GAP_PERIPHERAL_ROLE,
            privacy: false,
            device_name_len: 8,
            step_timeout: None,
            max_retries: 2,
        }
    }
}

impl Default for BringupConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BringupError {
    /// A step never completed within its retry budget. The sequence was reset.
    Stalled { step: u8 },
}

impl core::fmt::Display for BringupError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BringupError::Stalled { step } => {
                write!(f, "bring-up step {} was never acknowledged", step)
            }
        }
    }
}

impl core::error::Error for BringupError {}

pub struct Bringup {
    config: BringupConfig,
    state: State,
    step: u8,
    deadline: Option<Instant>,
    retries: u8,
    /// Copies of the pending command the host accepted.
    sent: u8,
    /// Opcode and count of completions still owed for copies of an earlier step.
    stale: Option<(u16, u8)>,
}

impl Bringup {
    pub fn new(config: BringupConfig) -> Self {
        Self {
            config,
            state: State::Idle,
            step: 0,
            deadline: None,
            retries: 0,
            sent: 0,
            stale: None,
        }
    }

    pub fn config(&self) -> &BringupConfig {
        &self.config
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Current step, 1..=5 while preparing, 0 otherwise.
    pub fn step(&self) -> u8 {
        self.step
    }

    /// The chipset finished booting.
    pub fn boot_start<H: HostControl + ?Sized>(&mut self, host: &mut H) {
        debug!("[bringup] boot start");
        self.state = State::Booting;
        self.step = 0;
        self.deadline = None;
        self.stale = None;
        host.boot_ready();
    }

    /// Start the configuration sequence at step 1.
    pub fn prepare_start<H: HostControl + ?Sized>(&mut self, host: &mut H) {
        debug!("[bringup] prepare start");
        self.state = State::Preparing;
        self.stale = None;
        self.enter(1, host);
    }

    /// Feed an HCI event. Only a Command-Complete for the pending command while
    /// preparing has an effect. `payload` holds the event parameters:
    /// number of allowed commands, opcode, status, return parameters.
    pub fn event_process<H: HostControl + ?Sized>(
        &mut self,
        event: EventKind,
        payload: &[u8],
        host: &mut H,
    ) {
        if self.state != State::Preparing || event != EventKind::CommandComplete {
            return;
        }

        let &[_, lo, hi, ref rest @ ..] = payload else {
            debug!("[bringup] short Command-Complete ignored ({} bytes)", payload.len());
            return;
        };
        let opcode = u16::from_le_bytes([lo, hi]);

        if let Some((stale, owed)) = self.stale {
            if stale == opcode {
                trace!("[bringup] absorbed duplicate completion for 0x{:04X}", opcode);
                self.stale = (owed > 1).then_some((stale, owed - 1));
                return;
            }
        }

        let Some(cmd) = self.command() else {
            return;
        };
        if opcode != cmd.opcode.to_raw() {
            debug!(
                "[bringup] step {} waits for 0x{:04X}, ignoring completion for 0x{:04X}",
                self.step,
                cmd.opcode.to_raw(),
                opcode
            );
            return;
        }

        if let Some(&status) = rest.first() {
            if status != 0 {
                warn!(
                    "[bringup] step {} completed with status 0x{:02X} (opcode 0x{:04X})",
                    self.step,
                    status,
                    opcode
                );
            }
        }

        if self.sent > 1 {
            self.stale = Some((opcode, self.sent - 1));
        }

        if self.step >= STEP_COUNT {
            info!("[bringup] configuration done");
            self.state = State::Idle;
            self.step = 0;
            self.deadline = None;
            host.prepare_ready();
        } else {
            self.enter(self.step + 1, host);
        }
    }

    /// Step watchdog; call once per polling tick.
    ///
    /// Re-issues the pending command when its deadline has passed and gives up
    /// after `max_retries`, returning the sequence to [`State::Idle`].
    pub fn poll<H: HostControl + ?Sized>(&mut self, host: &mut H) -> Result<(), BringupError> {
        if self.state != State::Preparing {
            return Ok(());
        }
        let Some(deadline) = self.deadline else {
            return Ok(());
        };
        if Instant::now() < deadline {
            return Ok(());
        }

        if self.retries >= self.config.max_retries {
            let step = self.step;
            error!("[bringup] step {} stalled after {} retries", step, self.retries);
            self.state = State::Idle;
            self.step = 0;
            self.deadline = None;
            return Err(BringupError::Stalled { step });
        }

        self.retries += 1;
        warn!("[bringup] re-issuing step {} (retry {})", self.step, self.retries);
        self.issue(host);
        Ok(())
    }

    fn enter<H: HostControl + ?Sized>(&mut self, step: u8, host: &mut H) {
        self.step = step;
        self.retries = 0;
        self.sent = 0;
        self.issue(host);
    }

    fn command(&self) -> Option<Command> {
        let c = &self.config;
        match self.step {
            1 => Some(aci::write_config_byte(aci::CONFIG_LL_ONLY, 1)),
            2 => Some(aci::write_public_address(c.public_address)),
            3 => Some(aci::set_tx_power_level(c.high_power, c.pa_level)),
            4 => Some(aci::gatt_init()),
            5 => Some(aci::gap_init(c.gap_role, c.privacy, c.device_name_len)),
            _ => None,
        }
    }

    fn issue<H: HostControl + ?Sized>(&mut self, host: &mut H) {
        let Some(cmd) = self.command() else {
            return;
        };

        trace!("[bringup] step {} -> opcode 0x{:04X}", self.step, cmd.opcode.to_raw());
        match host.send_command(cmd.opcode, cmd.params()) {
            Ok(()) => {
                self.sent = self.sent.saturating_add(1);
                self.deadline = self.config.step_timeout.map(|t| Instant::now() + t);
            }
            Err(_e) => {
                warn!("[bringup] step {} command not accepted by host", self.step);
                self.deadline = Some(Instant::now());
            }
        }
    }
}
