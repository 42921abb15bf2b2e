//! # go2 Control Unit Library
//!
//! Fixed-period low-level joint control for the Go2. Every cycle reads the
//! latest `LowState` snapshot, advances a tick-driven trajectory, writes the
//! commanded joints into a persistent `LowCmd`, stamps its CRC and publishes
//! it without waiting for delivery.
//!
//! ## Components
//!
//! 1. [`cache`]: last-value-wins snapshot shared with the delivery callback
//! 2. [`trajectory`]: bootstrap → ramp → oscillate state machine
//! 3. [`cycle`]: periodic scheduler, cycle statistics and RT setup
//! 4. [`config`]: TOML configuration with validation
//!
//! ## Zero-Allocation Cycle
//!
//! The trajectory buffers and the command frame are sized at startup; the
//! cycle body copies values and never allocates.

pub mod cache;
pub mod config;
pub mod cycle;
pub mod trajectory;
