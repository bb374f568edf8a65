//! Periodic tick timers using ESP-IDF's esp_timer API.
//!
//! Two periodic timers push events into the lock-free multi-producer queue:
//! the poll tick (sample → evaluate → apply) and the telemetry tick.
//! Periods come from [`SystemConfig`] and can be changed at runtime with
//! [`restart_timers`].
//!
//! Timer callbacks execute in the ESP timer task context (not ISR), so
//! they can safely call `push_event()`.
//!
//! On simulation targets no timers exist; [`SimTicker`] derives the same
//! events from elapsed time so a host loop can drive the service.

use crate::config::SystemConfig;
use crate::events::{Event, push_event};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::{error, info};

#[cfg(target_os = "espidf")]
static mut POLL_TIMER: esp_timer_handle_t = core::ptr::null_mut();
#[cfg(target_os = "espidf")]
static mut TELEMETRY_TIMER: esp_timer_handle_t = core::ptr::null_mut();

#[cfg(target_os = "espidf")]
unsafe extern "C" fn poll_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::PollTick);
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn telemetry_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::TelemetryTick);
}

/// Create (first call only) and start one periodic timer.
///
/// SAFETY: `handle` must point at one of this module's timer statics and
/// be accessed from the main task only.
#[cfg(target_os = "espidf")]
unsafe fn start_periodic(
    handle: *mut esp_timer_handle_t,
    callback: unsafe extern "C" fn(*mut core::ffi::c_void),
    name: &'static [u8],
    period_us: u64,
) -> bool {
    unsafe {
        if (*handle).is_null() {
            let args = esp_timer_create_args_t {
                callback: Some(callback),
                arg: core::ptr::null_mut(),
                dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
                name: name.as_ptr() as *const _,
                skip_unhandled_events: true,
            };
            let ret = esp_timer_create(&args, handle);
            if ret != ESP_OK as i32 {
                error!("hw_timer: create failed (rc={})", ret);
                return false;
            }
        }
        let ret = esp_timer_start_periodic(*handle, period_us);
        if ret != ESP_OK as i32 {
            error!("hw_timer: start failed (rc={})", ret);
            return false;
        }
        true
    }
}

/// Start the poll and telemetry timers at the configured periods.
#[cfg(target_os = "espidf")]
pub fn start_timers(config: &SystemConfig) {
    let poll_us = u64::from(config.poll_interval_ms) * 1_000;
    let telemetry_us = u64::from(config.telemetry_interval_secs) * 1_000_000;
    // SAFETY: the timer statics are only touched from the main task.  The
    // callbacks only call push_event(), which is lock-free.
    unsafe {
        if !start_periodic(&raw mut POLL_TIMER, poll_tick_cb, b"poll\0", poll_us) {
            error!("hw_timer: continuing without poll ticks");
            return;
        }
        if !start_periodic(
            &raw mut TELEMETRY_TIMER,
            telemetry_tick_cb,
            b"telemetry\0",
            telemetry_us,
        ) {
            error!("hw_timer: continuing without telemetry ticks");
            return;
        }
    }
    info!(
        "hw_timer: poll every {} ms, telemetry every {} s",
        config.poll_interval_ms, config.telemetry_interval_secs
    );
}

#[cfg(not(target_os = "espidf"))]
pub fn start_timers(config: &SystemConfig) {
    log::info!(
        "hw_timer(sim): no hardware timers (poll {} ms, telemetry {} s via SimTicker)",
        config.poll_interval_ms,
        config.telemetry_interval_secs
    );
}

/// Stop all tick timers.
#[cfg(target_os = "espidf")]
pub fn stop_timers() {
    // SAFETY: handles are valid if start_timers() created them; null-check
    // covers the case where it never ran.
    unsafe {
        let poll = POLL_TIMER;
        if !poll.is_null() {
            esp_timer_stop(poll);
        }
        let telemetry = TELEMETRY_TIMER;
        if !telemetry.is_null() {
            esp_timer_stop(telemetry);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn stop_timers() {}

/// Apply new periods after a config update.
pub fn restart_timers(config: &SystemConfig) {
    stop_timers();
    start_timers(config);
}

/// Host-side stand-in for the hardware timers.
#[derive(Debug, Clone)]
pub struct SimTicker {
    poll_ms: u64,
    telemetry_ms: u64,
    next_poll: u64,
    next_telemetry: u64,
}

impl SimTicker {
    pub fn new(config: &SystemConfig, now_ms: u64) -> Self {
        let poll_ms = u64::from(config.poll_interval_ms).max(1);
        let telemetry_ms = u64::from(config.telemetry_interval_secs).max(1) * 1_000;
        Self {
            poll_ms,
            telemetry_ms,
            next_poll: now_ms + poll_ms,
            next_telemetry: now_ms + telemetry_ms,
        }
    }

    /// Push every tick that came due by `now_ms`.  Returns how many were pushed.
    pub fn advance(&mut self, now_ms: u64) -> usize {
        let mut pushed = 0;
        while now_ms >= self.next_poll {
            self.next_poll += self.poll_ms;
            pushed += usize::from(push_event(Event::PollTick));
        }
        while now_ms >= self.next_telemetry {
            self.next_telemetry += self.telemetry_ms;
            pushed += usize::from(push_event(Event::TelemetryTick));
        }
        pushed
    }
}
