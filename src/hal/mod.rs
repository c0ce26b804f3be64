//! Hardware Abstraction Layer for the bridge.
//!
//! Thin wrappers around ESP-IDF peripherals.
//! Business logic stays in core modules, HAL is just I/O.

#[cfg(target_os = "espidf")]
pub mod i2c;

#[cfg(target_os = "espidf")]
pub use i2c::I2cSlavePort;
