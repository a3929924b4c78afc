//! xmega-uart - Mutex-guarded serial console for ATxmega firmware
//!
//! Lets kernel and application tasks emit diagnostic text over a USART
//! while a task scheduler preempts them.
//!
//! # Guarantees
//! - The transmitter is configured once, in hardware-manual order, before
//!   any byte can be written
//! - One logical write (including `\n` → `\r\n`) is never interleaved with
//!   bytes from another task
//! - Dropped output is observable through [`TxOutcome`]; the stream-style
//!   C entry points keep the "always succeeds" contract
//!
//! # Layout
//! - `drivers`: register surface, baud table, transmit driver
//! - `sync`: the lock seam to the task scheduler
//! - `console`: the global console and its C entry points
//! - `logger`: `log` backend on top of the console
//!
//! # Limitations
//! - Transmit only, 8N1, rates from the table in [`drivers::baud`]

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod console;
pub mod drivers;
pub mod logger;
pub mod sync;

pub use drivers::{BaudRate, DropReason, InitError, OutputHandle, TxOutcome, Uart, UartConfig};
pub use sync::{SpinTransmitLock, TransmitLock, WaitPolicy};
