//! Mutex-guarded USART transmit driver
//!
//! Output-only console driver for scheduler-based firmware.
//!
//! # Lifecycle
//! - [`Uart::initialize`] programs the hardware and creates the transmit lock
//! - A `Uart` value only exists once both succeeded, so writes can never
//!   reach an unconfigured transmitter
//!
//! # Concurrency
//! - One lock acquisition per logical write; `\n` goes out as `\r\n` under
//!   that single acquisition
//! - The data-register-empty poll spins while holding the lock, bounded by
//!   [`PollBudget`]
//! - Register writes happen only under the lock or during initialization

use core::fmt;
use core::hint::spin_loop;

use super::baud::BaudRate;
use super::regs::{CtrlB, FrameFormat, Status, UsartRegisters};
use crate::sync::{LockError, TransmitGuard, TransmitLock, WaitPolicy};

/// Polls of STATUS allowed per byte by default.
///
/// One character at 9600 baud lasts ~33k cycles at 32 MHz; this leaves a
/// wide margin over that.
pub const DEFAULT_READY_POLLS: u32 = 100_000;

/// Bound on the data-register-empty poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollBudget {
    /// Retry the poll this many times, then give up on the byte.
    Polls(u32),
    /// Spin until the hardware reports ready.
    Unbounded,
}

impl Default for PollBudget {
    fn default() -> Self {
        Self::Polls(DEFAULT_READY_POLLS)
    }
}

/// Runtime driver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UartConfig {
    /// Wait policy for the transmit lock.
    pub lock_wait: WaitPolicy,
    /// Bound on the per-byte readiness poll.
    pub ready_budget: PollBudget,
}

/// Opaque output-stream token.
///
/// Carried through the write calls for compatibility with stream-based
/// formatted output; the driver never inspects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct OutputHandle(usize);

impl OutputHandle {
    /// Handle for callers without a stream of their own.
    pub const NONE: Self = Self(0);

    /// Wrap a caller-defined stream token.
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }
}

/// Error type for initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// The requested rate is not in the baud table.
    UnsupportedBaudRate(u32),
    /// The scheduler could not create the transmit lock.
    LockCreationFailed,
    /// The global console was already set up.
    AlreadyInitialized,
}

impl InitError {
    /// Negative status code for C-style callers.
    pub const fn status(self) -> i32 {
        match self {
            Self::LockCreationFailed => -1,
            Self::AlreadyInitialized => -16,
            Self::UnsupportedBaudRate(_) => -22,
        }
    }
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedBaudRate(rate) => write!(f, "unsupported baud rate {}", rate),
            Self::LockCreationFailed => write!(f, "transmit lock creation failed"),
            Self::AlreadyInitialized => write!(f, "console already initialized"),
        }
    }
}

/// Why a write did not reach the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The transmit lock was not acquired.
    Lock(LockError),
    /// The data register never reported empty within the poll budget.
    NotReady,
    /// No driver has been initialized.
    NotInitialized,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lock(err) => write!(f, "dropped: {}", err),
            Self::NotReady => write!(f, "dropped: transmitter not ready"),
            Self::NotInitialized => write!(f, "dropped: driver not initialized"),
        }
    }
}

/// Result of a write call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    /// Every byte was handed to the data register.
    Sent,
    /// Some or all bytes never reached the data register.
    Dropped(DropReason),
}

impl TxOutcome {
    /// Returns true if the write reached the wire in full.
    pub fn is_sent(self) -> bool {
        self == Self::Sent
    }
}

/// Initialized USART transmitter.
pub struct Uart<R: UsartRegisters, L: TransmitLock> {
    regs: R,
    lock: L,
    baud: BaudRate,
    config: UartConfig,
}

impl<R: UsartRegisters, L: TransmitLock> Uart<R, L> {
    /// Bring the transmitter up at `requested_baud_rate`, 8N1, TX only.
    ///
    /// Registers are programmed in hardware-manual order: TXD idle high,
    /// pin directions, baud divisors, frame format, transmitter enable.
    /// Unsupported rates fail before any register is touched. If the lock
    /// cannot be created the hardware stays configured.
    ///
    /// Call exactly once per peripheral.
    pub fn initialize(regs: R, requested_baud_rate: u32, config: UartConfig) -> Result<Self, InitError> {
        let Some(baud) = BaudRate::from_bps(requested_baud_rate) else {
            log::error!("usart: unsupported baud rate {}", requested_baud_rate);
            return Err(InitError::UnsupportedBaudRate(requested_baud_rate));
        };
        let setting = baud.setting();

        // 1. TxD idle high
        regs.port_outset(regs.tx_pin());

        // 2. TxD output, RxD input
        regs.port_dirset(regs.tx_pin());
        regs.port_dirclr(regs.rx_pin());

        // 3. Baud rate
        regs.write_baudctrla(setting.ctrla());
        regs.write_baudctrlb(setting.ctrlb());

        // 4. Frame format
        regs.write_ctrlc(FrameFormat::EIGHT_N_ONE.bits());

        // 5. Transmitter only
        regs.write_ctrlb(CtrlB::TXEN);

        let lock = L::create().map_err(|err| {
            log::error!("usart: {}", err);
            InitError::LockCreationFailed
        })?;

        log::debug!(
            "usart: {} baud 8N1 (bsel={}, bscale={}), lock wait {:?}",
            baud.bps(),
            setting.bsel(),
            setting.bscale(),
            config.lock_wait
        );

        Ok(Self {
            regs,
            lock,
            baud,
            config,
        })
    }

    /// Rate the transmitter was programmed for.
    pub fn baud_rate(&self) -> BaudRate {
        self.baud
    }

    /// Transmit one character, translating `\n` to `\r\n`.
    ///
    /// Both bytes of a translated newline go out under one lock
    /// acquisition, so no other caller can slip in between them.
    pub fn write_char(&self, c: u8, _stream: OutputHandle) -> TxOutcome {
        let _guard = match TransmitGuard::acquire(&self.lock, self.config.lock_wait) {
            Ok(guard) => guard,
            Err(err) => return TxOutcome::Dropped(DropReason::Lock(err)),
        };
        self.emit(c)
    }

    /// Transmit a buffer under a single lock acquisition.
    ///
    /// Stops at the first byte the hardware does not accept.
    pub fn write_bytes(&self, bytes: &[u8], _stream: OutputHandle) -> TxOutcome {
        let _guard = match TransmitGuard::acquire(&self.lock, self.config.lock_wait) {
            Ok(guard) => guard,
            Err(err) => return TxOutcome::Dropped(DropReason::Lock(err)),
        };
        for &byte in bytes {
            if let TxOutcome::Dropped(reason) = self.emit(byte) {
                return TxOutcome::Dropped(reason);
            }
        }
        TxOutcome::Sent
    }

    /// Stream-style write: always reports 0, even when the byte was dropped.
    pub fn put_char(&self, c: u8, stream: OutputHandle) -> i32 {
        let _ = self.write_char(c, stream);
        0
    }

    /// `core::fmt::Write` adapter over this driver.
    pub fn stream(&self, handle: OutputHandle) -> UartStream<'_, R, L> {
        UartStream { uart: self, handle }
    }

    // Caller holds the transmit lock.
    fn emit(&self, c: u8) -> TxOutcome {
        if c == b'\n' {
            if let Err(reason) = self.transmit(b'\r') {
                return TxOutcome::Dropped(reason);
            }
        }
        match self.transmit(c) {
            Ok(()) => TxOutcome::Sent,
            Err(reason) => TxOutcome::Dropped(reason),
        }
    }

    fn transmit(&self, byte: u8) -> Result<(), DropReason> {
        self.wait_ready()?;
        self.regs.write_data(byte);
        Ok(())
    }

    fn wait_ready(&self) -> Result<(), DropReason> {
        match self.config.ready_budget {
            PollBudget::Unbounded => {
                while !self.regs.status().contains(Status::DREIF) {
                    spin_loop();
                }
                Ok(())
            }
            PollBudget::Polls(max) => {
                for _ in 0..=max {
                    if self.regs.status().contains(Status::DREIF) {
                        return Ok(());
                    }
                    spin_loop();
                }
                Err(DropReason::NotReady)
            }
        }
    }
}

/// Formatted output through a [`Uart`].
///
/// Each `write_str` is one lock acquisition; a `write!` with several
/// arguments may be split across acquisitions.
pub struct UartStream<'a, R: UsartRegisters, L: TransmitLock> {
    uart: &'a Uart<R, L>,
    handle: OutputHandle,
}

impl<R: UsartRegisters, L: TransmitLock> fmt::Write for UartStream<'_, R, L> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        // Drops are not formatting errors
        let _ = self.uart.write_bytes(s.as_bytes(), self.handle);
        Ok(())
    }
}
