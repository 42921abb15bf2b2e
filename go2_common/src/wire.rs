//! Bit-exact codecs for the Go2 low-level topics.
//!
//! All frames are little-endian and follow the C struct padding of the
//! robot's IDL types, so every record starts on the same byte offset as it
//! does in the firmware. Frames are encoded field by field; no `repr(C)`
//! transmutes are involved.
//!
//! | Frame                  | Size  | Module        |
//! |------------------------|-------|---------------|
//! | `LowCmd`               | 812   | [`lowcmd`]    |
//! | `LowState`             | 1180  | [`lowstate`]  |
//! | `WirelessController`   | 18    | [`wireless`]  |

pub mod lowcmd;
pub mod lowstate;
pub mod wireless;

pub use lowcmd::{BmsCmd, LOWCMD_SIZE, LowCmd, MotorCmd};
pub use lowstate::{BmsState, ImuState, LOWSTATE_SIZE, LowState, MotorState};
pub use wireless::{KeySwitch, WIRELESS_CONTROLLER_SIZE, WirelessController};

use thiserror::Error;

use crate::crc::frame_crc;

/// Errors raised while decoding a received frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// Buffer shorter than the fixed frame size.
    #[error("frame truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// Stored integrity field does not match the frame body.
    #[error("CRC mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    CrcMismatch { stored: u32, computed: u32 },
}

// ─── Frame Header ───────────────────────────────────────────────────

/// Size of the common frame header including its trailing padding.
pub const HEADER_SIZE: usize = 24;

/// Header shared by `LowCmd` and `LowState` (24 bytes on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameHeader {
    pub head: [u8; 2],
    pub level_flag: u8,
    pub frame_reserve: u8,
    pub sn: [u32; 2],
    pub version: [u32; 2],
    pub bandwidth: u16,
}

impl FrameHeader {
    pub(crate) fn write(&self, w: &mut ByteWriter<'_>) {
        w.bytes(&self.head);
        w.u8(self.level_flag);
        w.u8(self.frame_reserve);
        w.u32(self.sn[0]);
        w.u32(self.sn[1]);
        w.u32(self.version[0]);
        w.u32(self.version[1]);
        w.u16(self.bandwidth);
        w.pad(2);
    }

    pub(crate) fn read(r: &mut ByteReader<'_>) -> Self {
        let header = Self {
            head: r.array(),
            level_flag: r.u8(),
            frame_reserve: r.u8(),
            sn: [r.u32(), r.u32()],
            version: [r.u32(), r.u32()],
            bandwidth: r.u16(),
        };
        r.skip(2);
        header
    }
}

// ─── Integrity Helpers ──────────────────────────────────────────────

/// Compute the CRC of an encoded frame and store it in the trailing word.
pub fn stamp_crc(frame: &mut [u8]) -> u32 {
    let crc = frame_crc(frame);
    let n = frame.len();
    frame[n - 4..].copy_from_slice(&crc.to_le_bytes());
    crc
}

/// Check the trailing CRC word of an encoded frame.
///
/// # Errors
/// `WireError::CrcMismatch` carrying both values when they differ.
pub fn check_crc(frame: &[u8]) -> Result<(), WireError> {
    let n = frame.len();
    if n < 4 {
        return Err(WireError::Truncated {
            expected: 4,
            actual: n,
        });
    }
    let stored = u32::from_le_bytes([frame[n - 4], frame[n - 3], frame[n - 2], frame[n - 1]]);
    let computed = frame_crc(frame);
    if stored == computed {
        Ok(())
    } else {
        Err(WireError::CrcMismatch { stored, computed })
    }
}

pub(crate) fn ensure_len(buf: &[u8], expected: usize) -> Result<(), WireError> {
    if buf.len() < expected {
        return Err(WireError::Truncated {
            expected,
            actual: buf.len(),
        });
    }
    Ok(())
}

// ─── Byte Cursors ───────────────────────────────────────────────────

/// Sequential little-endian writer over a fixed-size frame buffer.
pub(crate) struct ByteWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> ByteWriter<'a> {
    pub(crate) fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn bytes(&mut self, src: &[u8]) {
        self.buf[self.pos..self.pos + src.len()].copy_from_slice(src);
        self.pos += src.len();
    }

    pub(crate) fn pad(&mut self, n: usize) {
        self.buf[self.pos..self.pos + n].fill(0);
        self.pos += n;
    }

    pub(crate) fn u8(&mut self, v: u8) {
        self.bytes(&[v]);
    }

    pub(crate) fn i8(&mut self, v: i8) {
        self.bytes(&v.to_le_bytes());
    }

    pub(crate) fn u16(&mut self, v: u16) {
        self.bytes(&v.to_le_bytes());
    }

    pub(crate) fn i16(&mut self, v: i16) {
        self.bytes(&v.to_le_bytes());
    }

    pub(crate) fn u32(&mut self, v: u32) {
        self.bytes(&v.to_le_bytes());
    }

    pub(crate) fn i32(&mut self, v: i32) {
        self.bytes(&v.to_le_bytes());
    }

    pub(crate) fn f32(&mut self, v: f32) {
        self.bytes(&v.to_le_bytes());
    }
}

/// Sequential little-endian reader. Callers check the length up front with
/// [`ensure_len`], so reads index without further bounds handling.
pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn skip(&mut self, n: usize) {
        self.pos += n;
    }

    pub(crate) fn array<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    pub(crate) fn u8(&mut self) -> u8 {
        self.array::<1>()[0]
    }

    pub(crate) fn i8(&mut self) -> i8 {
        i8::from_le_bytes(self.array())
    }

    pub(crate) fn u16(&mut self) -> u16 {
        u16::from_le_bytes(self.array())
    }

    pub(crate) fn i16(&mut self) -> i16 {
        i16::from_le_bytes(self.array())
    }

    pub(crate) fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.array())
    }

    pub(crate) fn i32(&mut self) -> i32 {
        i32::from_le_bytes(self.array())
    }

    pub(crate) fn f32(&mut self) -> f32 {
        f32::from_le_bytes(self.array())
    }
}
