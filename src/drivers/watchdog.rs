//! Task Watchdog Timer (TWDT) driver.
//!
//! Resets the device if the main loop stops draining events.  The timeout
//! is derived from the poll interval so a slow poll configuration never
//! trips it: at least [`MIN_TIMEOUT_MS`], and never less than three poll
//! periods.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::info;

pub const MIN_TIMEOUT_MS: u32 = 10_000;

/// Timeout for a given poll interval.
pub fn timeout_for(poll_interval_ms: u32) -> u32 {
    poll_interval_ms.saturating_mul(3).max(MIN_TIMEOUT_MS)
}

pub struct Watchdog {
    timeout_ms: u32,
    #[cfg(target_os = "espidf")]
    subscribed: bool,
}

impl Watchdog {
    /// Configure the TWDT and subscribe the calling task.
    pub fn new(poll_interval_ms: u32) -> Self {
        let timeout_ms = timeout_for(poll_interval_ms);

        #[cfg(target_os = "espidf")]
        {
            // SAFETY: plain IDF calls from the main task at boot.
            unsafe {
                let cfg = esp_task_wdt_config_t {
                    timeout_ms,
                    idle_core_mask: 0,
                    trigger_panic: true,
                };
                let ret = esp_task_wdt_reconfigure(&cfg);
                if ret != ESP_OK as i32 {
                    log::warn!("TWDT reconfigure returned {} (may already be configured)", ret);
                }

                let ret = esp_task_wdt_add(core::ptr::null_mut());
                let subscribed = ret == ESP_OK as i32;
                if subscribed {
                    info!("Watchdog: subscribed ({} ms timeout, panic on trigger)", timeout_ms);
                } else {
                    log::warn!("Watchdog: failed to subscribe ({})", ret);
                }

                Self {
                    timeout_ms,
                    subscribed,
                }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("Watchdog(sim): no-op ({} ms)", timeout_ms);
            Self { timeout_ms }
        }
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    /// Stretch or shrink the timeout after the poll interval changed.
    /// The task stays subscribed.
    pub fn set_poll_interval(&mut self, poll_interval_ms: u32) {
        let timeout_ms = timeout_for(poll_interval_ms);
        if timeout_ms == self.timeout_ms {
            return;
        }

        #[cfg(target_os = "espidf")]
        {
            let cfg = esp_task_wdt_config_t {
                timeout_ms,
                idle_core_mask: 0,
                trigger_panic: true,
            };
            // SAFETY: plain IDF call from the main task.
            let ret = unsafe { esp_task_wdt_reconfigure(&cfg) };
            if ret != ESP_OK as i32 {
                log::warn!("TWDT reconfigure returned {}, keeping {} ms", ret, self.timeout_ms);
                return;
            }
        }

        info!("Watchdog: timeout {} -> {} ms", self.timeout_ms, timeout_ms);
        self.timeout_ms = timeout_ms;
    }

    /// Feed the watchdog.  Call on every main loop iteration.
    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        {
            if self.subscribed {
                // SAFETY: the calling task is subscribed.
                unsafe {
                    esp_task_wdt_reset();
                }
            }
        }
    }
}
