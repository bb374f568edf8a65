//! Cosmos controller library.
//!
//! Exposes the domain and adapter modules for integration testing and the
//! firmware binary.  All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module; host builds get
//! simulation twins.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod board;
pub mod config;
pub mod control;
pub mod drivers;
pub mod error;
pub mod events;
pub mod sensors;
