//! Prop controller firmware library.
//!
//! Exposes the orchestration core, effect routines and drivers for the
//! binary and for integration testing.  All ESP-IDF-specific code is
//! guarded by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod cancel;
pub mod config;
pub mod drivers;
pub mod effects;
pub mod error;
pub mod fsm;
pub mod pins;
pub mod safety;

mod esp_link_shims;
