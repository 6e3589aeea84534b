//! Application core: orchestration logic, zero direct I/O.
//!
//! The control loop, the trigger gate and the event vocabulary live here.
//! All interaction with hardware goes through the **port traits** in
//! [`ports`], so the whole core runs in tests against a mock rig and a
//! virtual clock.

pub mod events;
pub mod orchestrator;
pub mod ports;
pub mod trigger;
