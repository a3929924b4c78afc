//! Device drivers
//!
//! - `regs`: USART/PORT register surface and its MMIO implementation
//! - `baud`: supported baud rates and divisor encoding
//! - `uart`: the mutex-guarded transmit driver

pub mod baud;
pub mod regs;
pub mod uart;

#[cfg(test)]
pub(crate) mod sim;

pub use baud::{BaudRate, BaudSetting};
pub use regs::{UsartInstance, UsartRegisters, XmegaUsart};
pub use uart::{DropReason, InitError, OutputHandle, PollBudget, TxOutcome, Uart, UartConfig, UartStream};
