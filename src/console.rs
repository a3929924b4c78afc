//! Global serial console
//!
//! One process-wide [`Uart`] on USARTC0, set up once and shared by every
//! task. Provides the stream-style C entry points and the print macros.
//!
//! # Lifecycle
//! - `init` / `uart_init` must run once before any output
//! - Output before that is dropped with [`DropReason::NotInitialized`]
//! - A second `init` is rejected with [`InitError::AlreadyInitialized`]

use core::fmt::{self, Write};

use log::{LevelFilter, SetLoggerError};
use spin::Once;

use crate::drivers::regs::{UsartInstance, UsartRegisters, XmegaUsart};
use crate::drivers::uart::{DropReason, InitError, OutputHandle, TxOutcome, Uart, UartConfig};
use crate::logger;
use crate::sync::{SpinTransmitLock, TransmitLock};

/// USART wired to the board's debug header.
pub const CONSOLE_USART: UsartInstance = UsartInstance::C0;

/// Concrete driver type behind the console.
pub type Console = Uart<XmegaUsart, SpinTransmitLock>;

static CONSOLE: Once<Console> = Once::new();

/// Initialize the console with the default configuration.
pub fn init(baud_rate: u32) -> Result<&'static Console, InitError> {
    init_with(baud_rate, UartConfig::default())
}

/// Initialize the console.
///
/// A failed attempt leaves the console uninitialized, so it may be retried.
pub fn init_with(baud_rate: u32, config: UartConfig) -> Result<&'static Console, InitError> {
    init_in(
        &CONSOLE,
        || {
            // SAFETY: CONSOLE_USART is the board's debug USART at its datasheet
            // address, and only this Once ever binds it
            unsafe { XmegaUsart::new(CONSOLE_USART) }
        },
        baud_rate,
        config,
    )
}

/// Initialize the driver held in `cell`, exactly once.
///
/// `bind` runs only when initialization is actually attempted. Once a
/// driver is in place, further calls fail with
/// [`InitError::AlreadyInitialized`] and leave the hardware alone.
pub fn init_in<'c, R, L>(
    cell: &'c Once<Uart<R, L>>,
    bind: impl FnOnce() -> R,
    baud_rate: u32,
    config: UartConfig,
) -> Result<&'c Uart<R, L>, InitError>
where
    R: UsartRegisters,
    L: TransmitLock,
{
    let mut ran = false;
    let uart = cell.try_call_once(|| {
        ran = true;
        Uart::initialize(bind(), baud_rate, config)
    })?;

    if ran {
        Ok(uart)
    } else {
        log::warn!("console: already initialized");
        Err(InitError::AlreadyInitialized)
    }
}

/// Install the console logger and set the maximum level.
pub fn init_logger(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&logger::LOGGER).map(|()| log::set_max_level(level))
}

/// The console, if initialized.
pub fn get() -> Option<&'static Console> {
    CONSOLE.get()
}

/// Write one character to the console.
pub fn write_char(c: u8, stream: OutputHandle) -> TxOutcome {
    match get() {
        Some(console) => console.write_char(c, stream),
        None => TxOutcome::Dropped(DropReason::NotInitialized),
    }
}

/// Write a buffer to the console under one lock acquisition.
pub fn write_bytes(bytes: &[u8]) -> TxOutcome {
    match get() {
        Some(console) => console.write_bytes(bytes, OutputHandle::NONE),
        None => TxOutcome::Dropped(DropReason::NotInitialized),
    }
}

/// C entry point: initialize the console.
///
/// Returns 0 on success, a negative status otherwise.
#[no_mangle]
pub extern "C" fn uart_init(baudrate: u32) -> i32 {
    match init(baudrate) {
        Ok(_) => 0,
        Err(err) => err.status(),
    }
}

/// C entry point: stream `put` hook.
///
/// Always returns 0. Characters dropped because of lock contention, a
/// stuck transmitter or a missing `uart_init` are not reported; use
/// [`write_char`] to observe them.
#[no_mangle]
pub extern "C" fn uart_putchar(c: u8, stream: OutputHandle) -> i32 {
    let _ = write_char(c, stream);
    0
}

/// Helper function used by the print macros
#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    if let Some(console) = get() {
        let _ = console.stream(OutputHandle::NONE).write_fmt(args);
    }
}

/// Print to the serial console
#[macro_export]
macro_rules! uart_print {
    ($($arg:tt)*) => {
        $crate::console::_print(format_args!($($arg)*))
    };
}

/// Println to the serial console
#[macro_export]
macro_rules! uart_println {
    () => {
        $crate::uart_print!("\n")
    };
    ($($arg:tt)*) => {{
        $crate::uart_print!($($arg)*);
        $crate::uart_print!("\n");
    }};
}
