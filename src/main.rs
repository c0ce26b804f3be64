//! RustI2cBridge - Main entry point
//!
//! Firmware composition for the espidf target:
//! 1. Build the static relay state and split it into port endpoints
//! 2. Bring up both I2C slave ports
//! 3. Start one event-loop task per port, pinned one per core
//! 4. Start the UART log drain, then idle with periodic stats
//!
//! Host builds get a stub `main` so `cargo test` can link the binary.

#![cfg_attr(target_os = "espidf", no_std)]
#![cfg_attr(target_os = "espidf", no_main)]

#[cfg(target_os = "espidf")]
use core::ffi::c_void;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys;

#[cfg(target_os = "espidf")]
use rust_i2c_bridge::{
    config::PORT_ADDRESS,
    hal::I2cSlavePort,
    log_globals::{MAIN_LOG, PORT_A_LOG, PORT_B_LOG},
    relay::PortId,
    rt_error, rt_info,
    stats::StatsReader,
    task::PortTask,
    uart_logger::{self, UartLoggerConfig},
    RelayState,
};

/// Pin map: port A on I2C0, port B on I2C1, UART log on GPIO6.
#[cfg(target_os = "espidf")]
mod pins {
    pub const PORT_A_SDA: i32 = 4;
    pub const PORT_A_SCL: i32 = 5;
    pub const PORT_B_SDA: i32 = 8;
    pub const PORT_B_SCL: i32 = 9;
}

// Static allocations: the bridge state lives for the whole process,
// no teardown path. Task state is staged in statics because FreeRTOS
// task parameters are raw pointers and there is no allocator.
#[cfg(target_os = "espidf")]
static RELAY: RelayState = RelayState::new();

#[cfg(target_os = "espidf")]
static mut TASK_A: Option<PortTask<'static, I2cSlavePort>> = None;
#[cfg(target_os = "espidf")]
static mut TASK_B: Option<PortTask<'static, I2cSlavePort>> = None;

/// Monotonic milliseconds since boot (wrapping).
#[cfg(target_os = "espidf")]
fn now_ms() -> u32 {
    (unsafe { sys::esp_timer_get_time() } / 1000) as u32
}

#[cfg(target_os = "espidf")]
extern "C" fn port_a_task(_: *mut c_void) {
    // SAFETY: staged exactly once in main before the task starts.
    let task = unsafe { TASK_A.take().expect("port A task not staged") };
    task.run(now_ms)
}

#[cfg(target_os = "espidf")]
extern "C" fn port_b_task(_: *mut c_void) {
    // SAFETY: staged exactly once in main before the task starts.
    let task = unsafe { TASK_B.take().expect("port B task not staged") };
    task.run(now_ms)
}

#[cfg(target_os = "espidf")]
extern "C" fn uart_log_task(_: *mut c_void) {
    let peripherals = unsafe { esp_idf_svc::hal::peripherals::Peripherals::new() };
    let config = UartLoggerConfig::default();

    match uart_logger::init_uart_logger(
        peripherals.uart1,
        peripherals.pins.gpio6,
        &config,
    ) {
        Ok(mut uart) => uart_logger::uart_logger_task(&mut uart),
        Err(_) => loop {
            // Log sink unavailable; keep draining nothing so the
            // streams just drop and count.
            unsafe { sys::vTaskDelay(1000) };
        },
    }
}

#[cfg(target_os = "espidf")]
fn spawn(
    name: &'static [u8],
    entry: extern "C" fn(*mut c_void),
    priority: u32,
    core_id: i32,
) -> bool {
    let mut handle: sys::TaskHandle_t = core::ptr::null_mut();
    let created = unsafe {
        sys::xTaskCreatePinnedToCore(
            Some(entry),
            name.as_ptr() as *const core::ffi::c_char,
            4096,
            core::ptr::null_mut(),
            priority,
            &mut handle,
            core_id,
        )
    };
    created == 1
}

#[cfg(target_os = "espidf")]
#[no_mangle]
fn main() {
    // Initialize ESP-IDF
    sys::link_patches();

    let (a, b, stats) = RELAY.split().expect("relay state already split");

    let port_a = I2cSlavePort::new(0, pins::PORT_A_SDA, pins::PORT_A_SCL, PORT_ADDRESS)
        .expect("port A init failed");
    let port_b = I2cSlavePort::new(1, pins::PORT_B_SDA, pins::PORT_B_SCL, PORT_ADDRESS)
        .expect("port B init failed");

    // SAFETY: written once, before the consuming tasks exist.
    unsafe {
        TASK_A = Some(PortTask::new(port_a, a, &PORT_A_LOG));
        TASK_B = Some(PortTask::new(port_b, b, &PORT_B_LOG));
    }

    // One event loop per core, mirroring the two bus endpoints.
    if !spawn(b"bridge_port_a\0", port_a_task, 10, 0)
        || !spawn(b"bridge_port_b\0", port_b_task, 10, 1)
        || !spawn(b"bridge_uart_log\0", uart_log_task, 2, 1)
    {
        rt_error!(MAIN_LOG, now_ms(), "task spawn failed");
    }

    rt_info!(MAIN_LOG, now_ms(), "bridge up, address 0x{:02X}", PORT_ADDRESS);

    // Idle loop: periodic stats dump (clears sticky overflow flags).
    loop {
        unsafe { sys::vTaskDelay(500) }; // ~5 s at the default tick rate
        log_port_stats(&stats, PortId::A);
        log_port_stats(&stats, PortId::B);
    }
}

#[cfg(target_os = "espidf")]
fn log_port_stats(stats: &StatsReader<'_>, port: PortId) {
    let snap = stats.collect(port);
    rt_info!(
        MAIN_LOG,
        now_ms(),
        "port {:?}: depth={} overflow={} drops={} errors={} last={}ms",
        port,
        snap.depth,
        snap.overflow,
        snap.overflow_drops,
        snap.errors,
        snap.last_activity_ms
    );
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    // Firmware entry point; only meaningful on an ESP32 target.
    eprintln!("bridge: build for an espidf target to run this binary");
}
