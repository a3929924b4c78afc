//! Simulated USART for host tests
//!
//! Records every register write in order and lets tests script when the
//! data register reports empty.

use spin::Mutex;

use super::regs::{CtrlB, PortPins, Status, UsartRegisters};

/// One recorded register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegWrite {
    OutSet(u8),
    DirSet(u8),
    DirClr(u8),
    BaudCtrlA(u8),
    BaudCtrlB(u8),
    CtrlC(u8),
    CtrlB(u8),
    Data(u8),
}

#[derive(Default)]
struct SimState {
    journal: Vec<RegWrite>,
    busy_polls: u32,
    stuck: bool,
    status_reads: usize,
}

pub struct SimUsart {
    state: Mutex<SimState>,
    yield_on_poll: bool,
}

impl SimUsart {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState::default()),
            yield_on_poll: false,
        }
    }

    /// Yield the OS thread on every status read, to provoke interleaving.
    pub fn yielding() -> Self {
        Self {
            yield_on_poll: true,
            ..Self::new()
        }
    }

    /// Report "not ready" for the next `polls` status reads.
    pub fn set_busy_polls(&self, polls: u32) {
        self.state.lock().busy_polls = polls;
    }

    /// Never report ready until cleared.
    pub fn set_stuck(&self, stuck: bool) {
        self.state.lock().stuck = stuck;
    }

    pub fn journal(&self) -> Vec<RegWrite> {
        self.state.lock().journal.clone()
    }

    pub fn clear_journal(&self) {
        self.state.lock().journal.clear();
    }

    /// Bytes written to DATA, in order.
    pub fn transmitted(&self) -> Vec<u8> {
        self.state
            .lock()
            .journal
            .iter()
            .filter_map(|w| match w {
                RegWrite::Data(b) => Some(*b),
                _ => None,
            })
            .collect()
    }

    pub fn status_reads(&self) -> usize {
        self.state.lock().status_reads
    }

    /// Last value written to a register, if any.
    pub fn last(&self, pick: fn(&RegWrite) -> Option<u8>) -> Option<u8> {
        self.state.lock().journal.iter().rev().find_map(pick)
    }

    fn record(&self, write: RegWrite) {
        self.state.lock().journal.push(write);
    }
}

impl UsartRegisters for SimUsart {
    fn tx_pin(&self) -> PortPins {
        PortPins::PIN3
    }

    fn rx_pin(&self) -> PortPins {
        PortPins::PIN2
    }

    fn port_outset(&self, pins: PortPins) {
        self.record(RegWrite::OutSet(pins.bits()));
    }

    fn port_dirset(&self, pins: PortPins) {
        self.record(RegWrite::DirSet(pins.bits()));
    }

    fn port_dirclr(&self, pins: PortPins) {
        self.record(RegWrite::DirClr(pins.bits()));
    }

    fn write_baudctrla(&self, value: u8) {
        self.record(RegWrite::BaudCtrlA(value));
    }

    fn write_baudctrlb(&self, value: u8) {
        self.record(RegWrite::BaudCtrlB(value));
    }

    fn write_ctrlc(&self, value: u8) {
        self.record(RegWrite::CtrlC(value));
    }

    fn write_ctrlb(&self, value: CtrlB) {
        self.record(RegWrite::CtrlB(value.bits()));
    }

    fn status(&self) -> Status {
        if self.yield_on_poll {
            std::thread::yield_now();
        }
        let mut state = self.state.lock();
        state.status_reads += 1;
        if state.stuck {
            return Status::TXCIF;
        }
        if state.busy_polls > 0 {
            state.busy_polls -= 1;
            return Status::empty();
        }
        Status::DREIF | Status::TXCIF
    }

    fn write_data(&self, byte: u8) {
        self.record(RegWrite::Data(byte));
    }
}
