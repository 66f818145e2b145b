//! Scripted chipset and recording host shared by the unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use bt_hci::cmd::Opcode;
use embassy_time::Duration;

use crate::config::LinkConfig;
use crate::envelope::Envelope;
use crate::frame::{Direction, PacketKind, HEADER_SIZE, STATUS_READY};
use crate::host::{HostControl, HostInbound};
use crate::link::SpiLink;

/// Short timeouts so failing waits do not slow the suite down.
pub fn test_config() -> LinkConfig {
    LinkConfig {
        exchange_timeout: Duration::from_millis(20),
        settle_timeout: Duration::from_millis(5),
        ..LinkConfig::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ready {
    /// Line never asserts.
    Never,
    /// Line is stuck high.
    Always,
    /// High while selected.
    WhileSelected,
    /// High while selected or while a frame is queued.
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockFault;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Header,
    Body(Direction),
}

#[derive(Debug)]
pub struct State {
    pub ready: Ready,
    pub selected: bool,
    pub selects: usize,
    pub deselects: usize,
    /// Header status byte.
    pub status: u8,
    /// Write capacity advertised once the script below runs dry.
    pub capacity: u16,
    /// Per-attempt write capacities, consumed first.
    pub capacity_script: VecDeque<u16>,
    /// Frames the chipset has queued for the host.
    pub rx_queue: VecDeque<Vec<u8>>,
    /// Advertised read length override.
    pub advertise: Option<u16>,
    /// Total bytes clocked over the bus.
    pub bytes_exchanged: usize,
    /// Headers received from the host.
    pub headers: Vec<[u8; HEADER_SIZE]>,
    /// Payloads of completed write transactions.
    pub written: Vec<Vec<u8>>,
    /// Fail the exchange with this index (0-based).
    pub fail_exchange: Option<usize>,
    exchanges: usize,
    phase: Phase,
    pending_write: Vec<u8>,
    read_offset: usize,
}

/// Chipset model behind an [`SpiLink`]. Clones share state.
#[derive(Clone)]
pub struct MockLink {
    pub state: Rc<RefCell<State>>,
}

impl MockLink {
    pub fn new(ready: Ready) -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                ready,
                selected: false,
                selects: 0,
                deselects: 0,
                status: STATUS_READY,
                capacity: 255,
                capacity_script: VecDeque::new(),
                rx_queue: VecDeque::new(),
                advertise: None,
                bytes_exchanged: 0,
                headers: Vec::new(),
                written: Vec::new(),
                fail_exchange: None,
                exchanges: 0,
                phase: Phase::Idle,
                pending_write: Vec::new(),
                read_offset: 0,
            })),
        }
    }

    pub fn queue(&self, frame: &[u8]) {
        self.state.borrow_mut().rx_queue.push_back(frame.to_vec());
    }

    pub fn borrow(&self) -> std::cell::Ref<'_, State> {
        self.state.borrow()
    }

    pub fn borrow_mut(&self) -> std::cell::RefMut<'_, State> {
        self.state.borrow_mut()
    }
}

impl SpiLink for MockLink {
    type Error = MockFault;

    fn select(&mut self) -> Result<(), MockFault> {
        let mut s = self.state.borrow_mut();
        s.selected = true;
        s.selects += 1;
        s.phase = Phase::Header;
        Ok(())
    }

    fn deselect(&mut self) -> Result<(), MockFault> {
        let mut guard = self.state.borrow_mut();
        let s = &mut *guard;
        match s.phase {
            // Header-only transactions leave no write behind.
            Phase::Body(Direction::Send) if !s.pending_write.is_empty() => {
                let data = core::mem::take(&mut s.pending_write);
                s.written.push(data);
            }
            // Once reading started, whatever was not clocked out is gone.
            Phase::Body(Direction::Receive) if s.read_offset > 0 => {
                s.rx_queue.pop_front();
                s.read_offset = 0;
            }
            _ => {}
        }
        s.phase = Phase::Idle;
        s.selected = false;
        s.deselects += 1;
        Ok(())
    }

    fn exchange(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), MockFault> {
        assert_eq!(tx.len(), rx.len());
        let mut guard = self.state.borrow_mut();
        let s = &mut *guard;
        let index = s.exchanges;
        s.exchanges += 1;
        if s.fail_exchange == Some(index) {
            return Err(MockFault);
        }
        assert!(s.selected, "exchange without chip-select");
        s.bytes_exchanged += tx.len();

        match s.phase {
            Phase::Header => {
                assert_eq!(tx.len(), HEADER_SIZE);
                let mut header = [0u8; HEADER_SIZE];
                header.copy_from_slice(tx);
                s.headers.push(header);

                let capacity = s.capacity_script.pop_front().unwrap_or(s.capacity);
                let queued = s.rx_queue.front().map_or(0, |f| f.len() as u16);
                let length = s.advertise.unwrap_or(queued);
                let reply = [
                    s.status,
                    capacity as u8,
                    (capacity >> 8) as u8,
                    length as u8,
                    (length >> 8) as u8,
                ];
                rx.copy_from_slice(&reply);
                s.phase = match tx[0] {
                    0x0A => Phase::Body(Direction::Send),
                    _ => Phase::Body(Direction::Receive),
                };
            }
            Phase::Body(Direction::Send) => {
                s.pending_write.extend_from_slice(tx);
                rx.fill(0);
            }
            Phase::Body(Direction::Receive) => {
                let offset = s.read_offset;
                let frame = s.rx_queue.front().map_or(&[][..], |f| &f[..]);
                for (i, b) in rx.iter_mut().enumerate() {
                    *b = frame.get(offset + i).copied().unwrap_or(0);
                }
                s.read_offset += rx.len();
            }
            Phase::Idle => unreachable!(),
        }
        Ok(())
    }

    fn is_ready(&mut self) -> bool {
        let s = self.state.borrow();
        match s.ready {
            Ready::Never => false,
            Ready::Always => true,
            Ready::WhileSelected => s.selected,
            Ready::Pending => s.selected || !s.rx_queue.is_empty(),
        }
    }
}

/// Host stack stand-in recording everything the driver hands it.
#[derive(Debug, Default)]
pub struct MockHost {
    pub commands: Vec<(u16, Vec<u8>)>,
    pub boot_ready: usize,
    pub prepare_ready: usize,
    pub delivered: Vec<Envelope>,
    /// Remaining inbound envelopes; `None` is unlimited.
    pub pool: Option<usize>,
    /// Number of upcoming `send_command` calls that fail.
    pub failing_commands: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostBusy;

impl HostInbound for MockHost {
    fn alloc(&mut self, kind: PacketKind) -> Option<Envelope> {
        match &mut self.pool {
            Some(0) => None,
            Some(n) => {
                *n -= 1;
                Some(Envelope::new(kind))
            }
            None => Some(Envelope::new(kind)),
        }
    }

    fn recv(&mut self, envelope: Envelope) {
        self.delivered.push(envelope);
    }
}

impl HostControl for MockHost {
    type Error = HostBusy;

    fn send_command(&mut self, opcode: Opcode, params: &[u8]) -> Result<(), HostBusy> {
        if self.failing_commands > 0 {
            self.failing_commands -= 1;
            return Err(HostBusy);
        }
        self.commands.push((opcode.to_raw(), params.to_vec()));
        Ok(())
    }

    fn boot_ready(&mut self) {
        self.boot_ready += 1;
    }

    fn prepare_ready(&mut self) {
        self.prepare_ready += 1;
    }
}
