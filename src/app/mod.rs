//! Application core: pure domain logic, zero I/O.
//!
//! This module ties the sensor registry, the threshold policy and the
//! actuator controller into one poll cycle.  All interaction with hardware
//! happens through **port traits** defined in [`ports`], keeping this
//! layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
