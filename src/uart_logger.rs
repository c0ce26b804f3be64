//! UART log output.
//!
//! Drains the per-task log streams and writes them to a dedicated UART
//! TX pin. Requires an external USB-UART adapter (CH340, CP2102, etc).
//!
//! # Hardware Setup
//!
//! ```text
//! ESP32 GPIO6 (TX) ──────▶ USB-UART RX
//!                           └─▶ PC Serial Monitor
//! ```

use crate::logging::LogEntry;

#[cfg(target_os = "espidf")]
use crate::log_globals::{MAIN_LOG, PORT_A_LOG, PORT_B_LOG};
#[cfg(target_os = "espidf")]
use crate::logging::LogStream;

#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::gpio;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::peripheral::Peripheral;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::uart::{self, UartTxDriver};

/// UART configuration for logging.
pub struct UartLoggerConfig {
    pub baud_rate: u32,
    pub tx_pin: u8,
}

impl Default for UartLoggerConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115200,
            tx_pin: 6,
        }
    }
}

/// Format log entry to string.
///
/// Format: `[timestamp_ms] LEVEL: message\n`
pub fn format_log_entry(entry: &LogEntry, buf: &mut [u8]) -> usize {
    use core::fmt::Write;

    struct BufWriter<'a> {
        buf: &'a mut [u8],
        pos: usize,
    }

    impl<'a> Write for BufWriter<'a> {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            let bytes = s.as_bytes();
            let remaining = self.buf.len() - self.pos;
            let to_write = bytes.len().min(remaining);
            self.buf[self.pos..self.pos + to_write].copy_from_slice(&bytes[..to_write]);
            self.pos += to_write;
            Ok(())
        }
    }

    let mut writer = BufWriter { buf, pos: 0 };

    let _ = write!(
        writer,
        "[{:8}] {}: {}\n",
        entry.timestamp_ms,
        entry.level.as_str(),
        core::str::from_utf8(&entry.msg[..entry.len as usize]).unwrap_or("<invalid utf8>")
    );

    writer.pos
}

/// Drain everything currently pending in `stream` into the UART.
#[cfg(target_os = "espidf")]
fn drain_stream(uart: &mut UartTxDriver<'_>, stream: &LogStream, format_buf: &mut [u8]) -> bool {
    let mut work_done = false;
    while let Some(entry) = stream.drain() {
        let len = format_log_entry(&entry, format_buf);
        let _ = uart.write(&format_buf[..len]);
        work_done = true;
    }
    work_done
}

/// Initialize a TX-only UART for logging output.
#[cfg(target_os = "espidf")]
pub fn init_uart_logger<'d>(
    uart: impl Peripheral<P = esp_idf_svc::hal::uart::UART1> + 'd,
    tx_pin: impl Peripheral<P = impl gpio::OutputPin> + 'd,
    config: &UartLoggerConfig,
) -> Result<UartTxDriver<'d>, esp_idf_svc::sys::EspError> {
    let uart_config =
        uart::config::Config::default().baudrate(esp_idf_svc::hal::units::Hertz(config.baud_rate));

    UartTxDriver::new(
        uart,
        tx_pin,
        Option::<gpio::AnyIOPin>::None, // CTS
        Option::<gpio::AnyIOPin>::None, // RTS
        &uart_config,
    )
}

/// UART log consumer task.
///
/// Drains all three log streams (port A, port B, main loop), reporting
/// dropped-message counts every 10 seconds.
#[cfg(target_os = "espidf")]
pub fn uart_logger_task(uart: &mut UartTxDriver<'_>) -> ! {
    let mut format_buf = [0u8; 192];
    let mut last_dropped_report = 0i64;

    loop {
        let mut work_done = false;
        work_done |= drain_stream(uart, &PORT_A_LOG, &mut format_buf);
        work_done |= drain_stream(uart, &PORT_B_LOG, &mut format_buf);
        work_done |= drain_stream(uart, &MAIN_LOG, &mut format_buf);

        let now = unsafe { esp_idf_svc::sys::esp_timer_get_time() };
        if now - last_dropped_report > 10_000_000 {
            let dropped = [
                ("A", PORT_A_LOG.dropped()),
                ("B", PORT_B_LOG.dropped()),
                ("M", MAIN_LOG.dropped()),
            ];

            if dropped.iter().any(|(_, n)| *n > 0) {
                use core::fmt::Write;
                let mut msg = [0u8; 64];
                let len = {
                    struct MsgWriter<'a> {
                        buf: &'a mut [u8],
                        pos: usize,
                    }
                    impl<'a> Write for MsgWriter<'a> {
                        fn write_str(&mut self, s: &str) -> core::fmt::Result {
                            let bytes = s.as_bytes();
                            let to_write = bytes.len().min(self.buf.len() - self.pos);
                            self.buf[self.pos..self.pos + to_write]
                                .copy_from_slice(&bytes[..to_write]);
                            self.pos += to_write;
                            Ok(())
                        }
                    }
                    let mut w = MsgWriter {
                        buf: &mut msg,
                        pos: 0,
                    };
                    let _ = write!(
                        w,
                        "[WARN] Dropped: A={}, B={}, M={}\n",
                        dropped[0].1, dropped[1].1, dropped[2].1
                    );
                    w.pos
                };
                let _ = uart.write(&msg[..len]);

                PORT_A_LOG.reset_dropped();
                PORT_B_LOG.reset_dropped();
                MAIN_LOG.reset_dropped();
            }

            last_dropped_report = now;
        }

        if !work_done {
            unsafe {
                esp_idf_svc::sys::vTaskDelay(10);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;

    #[test]
    fn test_format_log_entry() {
        let entry = LogEntry {
            timestamp_ms: 1234567,
            level: LogLevel::Info,
            len: 11,
            msg: {
                let mut msg = [0u8; crate::logging::MAX_MSG_LEN];
                msg[..11].copy_from_slice(b"Hello world");
                msg
            },
        };

        let mut buf = [0u8; 192];
        let len = format_log_entry(&entry, &mut buf);

        let formatted = core::str::from_utf8(&buf[..len]).unwrap();
        assert!(formatted.contains("1234567"));
        assert!(formatted.contains("INFO"));
        assert!(formatted.contains("Hello world"));
    }

    #[test]
    fn test_format_respects_entry_len() {
        let entry = LogEntry {
            timestamp_ms: 999,
            level: LogLevel::Error,
            len: 5,
            msg: {
                let mut msg = [0u8; crate::logging::MAX_MSG_LEN];
                msg[..10].copy_from_slice(b"TEST12345X"); // Only first 5 used
                msg
            },
        };

        let mut buf = [0u8; 192];
        let len = format_log_entry(&entry, &mut buf);

        let formatted = core::str::from_utf8(&buf[..len]).unwrap();
        assert!(formatted.contains("ERROR"));
        assert!(formatted.contains("TEST1"));
        assert!(!formatted.contains("X"));
    }
}
