//! I2C slave port driver.
//!
//! Wraps the ESP-IDF I2C slave driver behind [`BusPort`]: the driver's
//! receive/request callbacks run in ISR context and only push a small
//! event record into a FreeRTOS queue; [`I2cSlavePort::wait_event`]
//! blocks on that queue from task context. Replies go out through the
//! driver's slave write, which the hardware clocks onto the bus for the
//! in-flight master read.
//!
//! The driver does not report a distinct transaction-finished event;
//! activity stamps come from receives and requests alone.

use core::ffi::c_void;
use core::ptr;

use esp_idf_svc::sys;

use crate::bus::{BusEvent, BusPort, TransportError};
use crate::task::RX_SCRATCH;

/// Driver-side event queue depth.
const EVENT_QUEUE_DEPTH: u32 = 8;

/// Reply staging timeout in milliseconds. The bus master's clock
/// stretching tolerance bounds how long staging may take; past that
/// the transaction is lost anyway.
const REPLY_TIMEOUT_MS: i32 = 20;

const KIND_RECEIVE: u8 = 0;
const KIND_REQUEST: u8 = 1;

/// Event record shuttled from ISR to task context. Fixed size so it
/// can live in a FreeRTOS queue by copy.
#[repr(C)]
#[derive(Clone, Copy)]
struct RawEvent {
    kind: u8,
    len: u8,
    data: [u8; RX_SCRATCH],
}

impl RawEvent {
    const fn zeroed() -> Self {
        Self {
            kind: KIND_RECEIVE,
            len: 0,
            data: [0; RX_SCRATCH],
        }
    }
}

/// One I2C slave endpoint implementing [`BusPort`].
pub struct I2cSlavePort {
    dev: sys::i2c_slave_dev_handle_t,
    events: sys::QueueHandle_t,
}

// SAFETY: the handle pair is only used from the owning port task after
// construction; the ISR side touches nothing but the queue, which
// FreeRTOS synchronizes.
unsafe impl Send for I2cSlavePort {}

unsafe extern "C" fn on_receive_cb(
    _dev: sys::i2c_slave_dev_handle_t,
    edata: *const sys::i2c_slave_rx_done_event_data_t,
    ctx: *mut c_void,
) -> bool {
    let queue = ctx as sys::QueueHandle_t;

    let mut evt = RawEvent::zeroed();
    let len = (*edata).length.min(RX_SCRATCH);
    ptr::copy_nonoverlapping((*edata).buffer, evt.data.as_mut_ptr(), len);
    evt.kind = KIND_RECEIVE;
    evt.len = len as u8;

    let mut woken: sys::BaseType_t = 0;
    sys::xQueueGenericSendFromISR(
        queue,
        &evt as *const RawEvent as *const c_void,
        &mut woken,
        sys::queueSEND_TO_BACK as sys::BaseType_t,
    );
    woken != 0
}

unsafe extern "C" fn on_request_cb(
    _dev: sys::i2c_slave_dev_handle_t,
    _edata: *const sys::i2c_slave_request_event_data_t,
    ctx: *mut c_void,
) -> bool {
    let queue = ctx as sys::QueueHandle_t;

    let mut evt = RawEvent::zeroed();
    evt.kind = KIND_REQUEST;

    let mut woken: sys::BaseType_t = 0;
    sys::xQueueGenericSendFromISR(
        queue,
        &evt as *const RawEvent as *const c_void,
        &mut woken,
        sys::queueSEND_TO_BACK as sys::BaseType_t,
    );
    woken != 0
}

impl I2cSlavePort {
    /// Configure one hardware I2C controller as a slave on `addr`.
    pub fn new(
        port: sys::i2c_port_num_t,
        sda: sys::gpio_num_t,
        scl: sys::gpio_num_t,
        addr: u8,
    ) -> Result<Self, sys::EspError> {
        let events = unsafe {
            sys::xQueueGenericCreate(
                EVENT_QUEUE_DEPTH,
                core::mem::size_of::<RawEvent>() as u32,
                sys::queueQUEUE_TYPE_BASE as u8,
            )
        };
        if events.is_null() {
            return Err(sys::EspError::from_infallible::<
                { sys::ESP_ERR_NO_MEM as sys::esp_err_t },
            >());
        }

        let config = sys::i2c_slave_config_t {
            i2c_port: port,
            sda_io_num: sda,
            scl_io_num: scl,
            clk_source: sys::soc_periph_i2c_clk_src_t_I2C_CLK_SRC_DEFAULT,
            send_buf_depth: 64,
            receive_buf_depth: 64,
            slave_addr: addr as u16,
            addr_bit_len: sys::i2c_addr_bit_len_t_I2C_ADDR_BIT_LEN_7,
            intr_priority: 0,
            flags: Default::default(),
        };

        let mut dev: sys::i2c_slave_dev_handle_t = ptr::null_mut();
        unsafe {
            sys::esp!(sys::i2c_new_slave_device(&config, &mut dev))?;

            let callbacks = sys::i2c_slave_event_callbacks_t {
                on_receive: Some(on_receive_cb),
                on_request: Some(on_request_cb),
            };
            sys::esp!(sys::i2c_slave_register_event_callbacks(
                dev,
                &callbacks,
                events as *mut c_void,
            ))?;
        }

        Ok(Self { dev, events })
    }
}

impl BusPort for I2cSlavePort {
    fn wait_event(&mut self, rx: &mut [u8]) -> Result<BusEvent, TransportError> {
        let mut evt = RawEvent::zeroed();

        let ok = unsafe {
            sys::xQueueReceive(
                self.events,
                &mut evt as *mut RawEvent as *mut c_void,
                u32::MAX, // portMAX_DELAY: block until traffic arrives
            )
        };
        if ok == 0 {
            return Err(TransportError::Driver);
        }

        match evt.kind {
            KIND_RECEIVE => {
                let len = (evt.len as usize).min(rx.len());
                rx[..len].copy_from_slice(&evt.data[..len]);
                Ok(BusEvent::Receive(evt.len as usize))
            }
            _ => Ok(BusEvent::Request),
        }
    }

    fn reply(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut written: u32 = 0;
        let err = unsafe {
            sys::i2c_slave_write(
                self.dev,
                bytes.as_ptr(),
                bytes.len() as u32,
                &mut written,
                REPLY_TIMEOUT_MS,
            )
        };

        if err == sys::ESP_OK as sys::esp_err_t {
            Ok(())
        } else if err == sys::ESP_ERR_TIMEOUT as sys::esp_err_t {
            Err(TransportError::Timeout)
        } else {
            Err(TransportError::Driver)
        }
    }
}

impl Drop for I2cSlavePort {
    fn drop(&mut self) {
        // The bridge never tears ports down in normal operation; this
        // exists for completeness if construction is retried.
        unsafe {
            sys::i2c_del_slave_device(self.dev);
            sys::vQueueDelete(self.events);
        }
    }
}
