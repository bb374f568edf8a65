//! Hardware initialisation, tick timers, input conditioning, status LED
//! patterns and the watchdog.

pub mod hw_init;
pub mod hw_timer;
pub mod input;
pub mod led_patterns;
pub mod watchdog;
