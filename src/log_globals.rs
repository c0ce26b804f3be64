//! Global log stream instances.
//!
//! One stream per producing task, all drained by the UART task.
//! Keeping producers separate is what lets
//! [`LogStream`](crate::logging::LogStream) stay a plain SPSC ring.

use crate::logging::LogStream;

/// Log stream owned by the port A task.
pub static PORT_A_LOG: LogStream = LogStream::new();

/// Log stream owned by the port B task.
pub static PORT_B_LOG: LogStream = LogStream::new();

/// Log stream owned by the main loop (periodic stats lines).
pub static MAIN_LOG: LogStream = LogStream::new();
