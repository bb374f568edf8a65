//! Control layer: threshold policy and actuator state.
//!
//! [`policy`] decides, [`actuator`] applies.  Neither touches hardware
//! except through the GPIO port.

pub mod actuator;
pub mod policy;
