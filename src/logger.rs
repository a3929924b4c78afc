//! `log` backend writing to the serial console
//!
//! Each record is rendered into a fixed line buffer first and sent with a
//! single lock acquisition, so lines from different tasks never mix.
//! Overlong records are truncated.

use core::fmt::{self, Write};

use heapless::String;
use log::{Log, Metadata, Record};

use crate::console;
use crate::drivers::regs::UsartRegisters;
use crate::drivers::uart::{OutputHandle, TxOutcome, Uart};
use crate::sync::TransmitLock;

/// Longest rendered line, newline included.
pub const LINE_CAPACITY: usize = 128;

/// Logger forwarding records to [`console`].
pub struct ConsoleLogger;

/// Installed by `console::init_logger`.
pub(crate) static LOGGER: ConsoleLogger = ConsoleLogger;

/// Render `record` as `[LEVEL] target: message\n`.
pub fn write_record<W: Write>(out: &mut W, record: &Record) -> fmt::Result {
    writeln!(out, "[{}] {}: {}", record.level(), record.target(), record.args())
}

/// Render `record` into a line buffer, truncating if needed.
///
/// The result always ends with a newline.
pub fn render<const N: usize>(record: &Record) -> String<N> {
    let mut line = String::new();
    if write_record(&mut Truncating { line: &mut line }, record).is_err() {
        let _ = line.push('\n');
    }
    line
}

// Fills a line up to one byte short of capacity, leaving room for '\n'.
struct Truncating<'a, const N: usize> {
    line: &'a mut String<N>,
}

impl<const N: usize> Write for Truncating<'_, N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for ch in s.chars() {
            if self.line.len() + ch.len_utf8() >= N {
                return Err(fmt::Error);
            }
            self.line.push(ch).map_err(|()| fmt::Error)?;
        }
        Ok(())
    }
}

/// Render `record` and send it as one line under one lock acquisition.
pub fn log_to<R: UsartRegisters, L: TransmitLock>(uart: &Uart<R, L>, record: &Record) -> TxOutcome {
    let line = render::<LINE_CAPACITY>(record);
    uart.write_bytes(line.as_bytes(), OutputHandle::NONE)
}

impl Log for ConsoleLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        console::get().is_some()
    }

    fn log(&self, record: &Record) {
        if let Some(uart) = console::get() {
            let _ = log_to(uart, record);
        }
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::sim::SimUsart;
    use crate::drivers::uart::UartConfig;
    use crate::sync::SpinTransmitLock;
    use log::Level;

    #[test]
    fn test_record_format() {
        let mut out = std::string::String::new();
        write_record(
            &mut out,
            &Record::builder()
                .level(Level::Info)
                .target("boot")
                .args(format_args!("heap {} KiB", 64))
                .build(),
        )
        .unwrap();
        assert_eq!(out, "[INFO] boot: heap 64 KiB\n");
    }

    #[test]
    fn test_render_fits() {
        let line = render::<64>(
            &Record::builder()
                .level(Level::Warn)
                .target("usart")
                .args(format_args!("retry"))
                .build(),
        );
        assert_eq!(line.as_str(), "[WARN] usart: retry\n");
    }

    #[test]
    fn test_render_truncates_with_newline() {
        let long = "x".repeat(100);
        let line = render::<32>(
            &Record::builder()
                .level(Level::Error)
                .target("usart")
                .args(format_args!("{}", long))
                .build(),
        );
        assert_eq!(line.len(), 32);
        assert!(line.starts_with("[ERROR] usart: xxx"));
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn test_disabled_without_console() {
        let metadata = Metadata::builder().level(Level::Error).build();
        assert!(!LOGGER.enabled(&metadata));
    }

    #[test]
    fn test_log_line_is_contiguous_on_the_wire() {
        let regs = SimUsart::yielding();
        let uart =
            Uart::<&SimUsart, SpinTransmitLock>::initialize(&regs, 38_400, UartConfig::default())
                .unwrap();

        std::thread::scope(|s| {
            let uart = &uart;
            s.spawn(move || {
                for _ in 0..50 {
                    uart.write_char(b'#', OutputHandle::NONE);
                }
            });
            s.spawn(move || {
                for _ in 0..10 {
                    let outcome = log_to(
                        uart,
                        &Record::builder()
                            .level(Level::Info)
                            .target("boot")
                            .args(format_args!("up {}", 7))
                            .build(),
                    );
                    assert!(outcome.is_sent());
                }
            });
        });

        let expected: &[u8] = b"[INFO] boot: up 7\r\n";
        let bytes = regs.transmitted();
        let runs = bytes.windows(expected.len()).filter(|w| *w == expected).count();
        assert_eq!(runs, 10);
        assert_eq!(bytes.iter().filter(|&&b| b == b'#').count(), 50);
        assert_eq!(bytes.len(), 50 + 10 * expected.len());
    }
}
