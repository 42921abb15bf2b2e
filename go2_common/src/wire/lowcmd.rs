//! `LowCmd`: per-motor command frame (control unit → robot).
//!
//! Layout (812 bytes, little-endian):
//!
//! ```text
//! 0    header (24)          head[2] level_flag frame_reserve sn[2] version[2] bandwidth pad[2]
//! 24   motor_cmd[20] (36)   mode pad[3] q dq tau kp kd reserve[3]
//! 744  bms_cmd (4)          off reserve[3]
//! 748  wireless_remote[40]
//! 788  led[12]
//! 800  fan[2]
//! 802  gpio pad[1]
//! 804  reserve
//! 808  crc                  CRC-32 over words 0..202
//! ```

use static_assertions::const_assert_eq;

use super::{ByteReader, ByteWriter, FrameHeader, HEADER_SIZE, WireError, ensure_len, stamp_crc};
use crate::consts::{LOWCMD_HEAD, LOWCMD_LEVEL_FLAG, NUM_MOTOR, POS_STOP_F, SERVO_MODE, VEL_STOP_F};

/// Encoded size of one motor command record.
pub const MOTOR_CMD_SIZE: usize = 36;

/// Encoded size of a complete `LowCmd` frame.
pub const LOWCMD_SIZE: usize = 812;

const_assert_eq!(
    HEADER_SIZE + NUM_MOTOR * MOTOR_CMD_SIZE + 4 + 40 + 12 + 2 + 2 + 4 + 4,
    LOWCMD_SIZE
);
const_assert_eq!(LOWCMD_SIZE % 4, 0);

/// Command for a single motor slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorCmd {
    /// Motor mode (`SERVO_MODE` = 0x01).
    pub mode: u8,
    /// Target position [rad].
    pub q: f32,
    /// Target velocity [rad/s].
    pub dq: f32,
    /// Feed-forward torque [N·m].
    pub tau: f32,
    /// Position stiffness.
    pub kp: f32,
    /// Velocity damping.
    pub kd: f32,
    pub reserve: [u32; 3],
}

impl MotorCmd {
    /// Servo mode, position and velocity tracking disabled, zero gains.
    ///
    /// Firmware reads a literal `0.0` as a target, so idle slots carry the
    /// stop sentinels instead.
    pub const fn hold() -> Self {
        Self {
            mode: SERVO_MODE,
            q: POS_STOP_F,
            dq: VEL_STOP_F,
            tau: 0.0,
            kp: 0.0,
            kd: 0.0,
            reserve: [0; 3],
        }
    }

    /// True when both tracking targets are the stop sentinels and no gain
    /// or torque is applied.
    pub fn is_hold(&self) -> bool {
        self.q == POS_STOP_F
            && self.dq == VEL_STOP_F
            && self.kp == 0.0
            && self.kd == 0.0
            && self.tau == 0.0
    }

    fn write(&self, w: &mut ByteWriter<'_>) {
        w.u8(self.mode);
        w.pad(3);
        w.f32(self.q);
        w.f32(self.dq);
        w.f32(self.tau);
        w.f32(self.kp);
        w.f32(self.kd);
        for r in self.reserve {
            w.u32(r);
        }
    }

    fn read(r: &mut ByteReader<'_>) -> Self {
        let mode = r.u8();
        r.skip(3);
        Self {
            mode,
            q: r.f32(),
            dq: r.f32(),
            tau: r.f32(),
            kp: r.f32(),
            kd: r.f32(),
            reserve: [r.u32(), r.u32(), r.u32()],
        }
    }
}

impl Default for MotorCmd {
    fn default() -> Self {
        Self::hold()
    }
}

/// Battery management command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BmsCmd {
    pub off: u8,
    pub reserve: [u8; 3],
}

/// Complete low-level command frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LowCmd {
    pub header: FrameHeader,
    pub motor_cmd: [MotorCmd; NUM_MOTOR],
    pub bms_cmd: BmsCmd,
    pub wireless_remote: [u8; 40],
    pub led: [u8; 12],
    pub fan: [u8; 2],
    pub gpio: u8,
    pub reserve: u32,
    /// Integrity field, refreshed by [`LowCmd::encode_with_crc`].
    pub crc: u32,
}

impl LowCmd {
    /// Startup command: fixed header, every slot in servo mode holding the
    /// stop sentinels.
    pub fn new() -> Self {
        Self {
            header: FrameHeader {
                head: LOWCMD_HEAD,
                level_flag: LOWCMD_LEVEL_FLAG,
                ..FrameHeader::default()
            },
            motor_cmd: [MotorCmd::hold(); NUM_MOTOR],
            bms_cmd: BmsCmd::default(),
            wireless_remote: [0; 40],
            led: [0; 12],
            fan: [0; 2],
            gpio: 0,
            reserve: 0,
            crc: 0,
        }
    }

    /// Encode with the currently stored `crc` field.
    pub fn encode(&self) -> [u8; LOWCMD_SIZE] {
        let mut buf = [0u8; LOWCMD_SIZE];
        let mut w = ByteWriter::new(&mut buf);
        self.header.write(&mut w);
        for motor in &self.motor_cmd {
            motor.write(&mut w);
        }
        w.u8(self.bms_cmd.off);
        w.bytes(&self.bms_cmd.reserve);
        w.bytes(&self.wireless_remote);
        w.bytes(&self.led);
        w.bytes(&self.fan);
        w.u8(self.gpio);
        w.pad(1);
        w.u32(self.reserve);
        w.u32(self.crc);
        debug_assert_eq!(w.position(), LOWCMD_SIZE);
        buf
    }

    /// Encode, compute the CRC over every preceding word and store it both
    /// in the returned frame and in `self.crc`.
    pub fn encode_with_crc(&mut self) -> [u8; LOWCMD_SIZE] {
        let mut buf = self.encode();
        self.crc = stamp_crc(&mut buf);
        buf
    }

    /// Decode a received frame. The CRC is carried over, not checked.
    ///
    /// # Errors
    /// `WireError::Truncated` if `buf` is shorter than [`LOWCMD_SIZE`].
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        ensure_len(buf, LOWCMD_SIZE)?;
        let mut r = ByteReader::new(buf);
        let header = FrameHeader::read(&mut r);
        let mut motor_cmd = [MotorCmd::hold(); NUM_MOTOR];
        for motor in motor_cmd.iter_mut() {
            *motor = MotorCmd::read(&mut r);
        }
        let bms_cmd = BmsCmd {
            off: r.u8(),
            reserve: r.array(),
        };
        let wireless_remote = r.array();
        let led = r.array();
        let fan = r.array();
        let gpio = r.u8();
        r.skip(1);
        let reserve = r.u32();
        let crc = r.u32();
        debug_assert_eq!(r.position(), LOWCMD_SIZE);
        Ok(Self {
            header,
            motor_cmd,
            bms_cmd,
            wireless_remote,
            led,
            fan,
            gpio,
            reserve,
            crc,
        })
    }
}

impl Default for LowCmd {
    fn default() -> Self {
        Self::new()
    }
}
