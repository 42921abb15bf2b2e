//! go2 Common Library
//!
//! Shared building blocks for the go2 low-level control workspace.
//!
//! # Module Structure
//!
//! - [`consts`] - Motor counts, sentinels, topics and default periods
//! - [`crc`] - CRC-32 integrity field used by the Go2 wire protocol
//! - [`wire`] - Bit-exact codecs for `LowCmd`, `LowState` and `WirelessController`
//! - [`transport`] - Publish/subscribe seam and the in-process [`transport::LocalBus`]
//! - [`config`] - TOML configuration loading
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use go2_common::prelude::*;
//!
//! let mut cmd = LowCmd::new();
//! let frame = cmd.encode_with_crc();
//! assert!(verify_frame(&frame));
//! ```

pub mod config;
pub mod consts;
pub mod crc;
pub mod prelude;
pub mod transport;
pub mod wire;
