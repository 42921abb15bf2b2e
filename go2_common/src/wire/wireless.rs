//! `WirelessController`: raw gamepad frame (robot → gamepad processor).
//!
//! `lx ly rx ry` as f32 followed by the `keys` bitfield as u16, 18 bytes,
//! little-endian, no integrity field.

use bitflags::bitflags;

use super::{ByteReader, ByteWriter, WireError, ensure_len};

bitflags! {
    /// Button bits of `WirelessController::keys`, bit 0 first.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KeySwitch: u16 {
        const R1 = 1 << 0;
        const L1 = 1 << 1;
        const START = 1 << 2;
        const SELECT = 1 << 3;
        const R2 = 1 << 4;
        const L2 = 1 << 5;
        const F1 = 1 << 6;
        const F2 = 1 << 7;
        const A = 1 << 8;
        const B = 1 << 9;
        const X = 1 << 10;
        const Y = 1 << 11;
        const UP = 1 << 12;
        const RIGHT = 1 << 13;
        const DOWN = 1 << 14;
        const LEFT = 1 << 15;
    }
}

/// Encoded size of a `WirelessController` frame.
pub const WIRELESS_CONTROLLER_SIZE: usize = 18;

/// Raw stick axes and button bitfield.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WirelessController {
    pub lx: f32,
    pub ly: f32,
    pub rx: f32,
    pub ry: f32,
    pub keys: u16,
}

impl WirelessController {
    /// Decoded button bits. Every bit of the field is a defined button.
    pub fn key_switch(&self) -> KeySwitch {
        KeySwitch::from_bits_retain(self.keys)
    }

    pub fn encode(&self) -> [u8; WIRELESS_CONTROLLER_SIZE] {
        let mut buf = [0u8; WIRELESS_CONTROLLER_SIZE];
        let mut w = ByteWriter::new(&mut buf);
        w.f32(self.lx);
        w.f32(self.ly);
        w.f32(self.rx);
        w.f32(self.ry);
        w.u16(self.keys);
        buf
    }

    /// # Errors
    /// `WireError::Truncated` if `buf` is shorter than
    /// [`WIRELESS_CONTROLLER_SIZE`].
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        ensure_len(buf, WIRELESS_CONTROLLER_SIZE)?;
        let mut r = ByteReader::new(buf);
        Ok(Self {
            lx: r.f32(),
            ly: r.f32(),
            rx: r.f32(),
            ry: r.f32(),
            keys: r.u16(),
        })
    }
}
