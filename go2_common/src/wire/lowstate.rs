//! `LowState`: sensor frame (robot → control unit).
//!
//! Layout (1180 bytes, little-endian):
//!
//! ```text
//! 0     header (24)
//! 24    imu_state (56)        quaternion[4] gyroscope[3] accelerometer[3] rpy[3] temperature pad[3]
//! 80    motor_state[20] (48)  mode pad[3] q dq ddq tau_est q_raw dq_raw ddq_raw temperature pad[3] lost reserve[2]
//! 1040  bms_state (44)
//! 1084  foot_force[4] foot_force_est[4] tick
//! 1104  wireless_remote[40] bit_flag pad[3] adc_reel
//! 1152  temperature_ntc1 temperature_ntc2 pad[2] power_v power_a fan_frequency[4]
//! 1172  reserve crc
//! ```

use static_assertions::const_assert_eq;

use super::{ByteReader, ByteWriter, FrameHeader, HEADER_SIZE, WireError, ensure_len, stamp_crc};
use crate::consts::NUM_MOTOR;

pub const IMU_STATE_SIZE: usize = 56;
pub const MOTOR_STATE_SIZE: usize = 48;
pub const BMS_STATE_SIZE: usize = 44;

/// Encoded size of a complete `LowState` frame.
pub const LOWSTATE_SIZE: usize = 1180;

const_assert_eq!(
    HEADER_SIZE + IMU_STATE_SIZE + NUM_MOTOR * MOTOR_STATE_SIZE + BMS_STATE_SIZE + 8 + 8 + 4
        + 40 + 4 + 4 + 4 + 4 + 4 + 8 + 4 + 4,
    LOWSTATE_SIZE
);

/// Body IMU sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImuState {
    pub quaternion: [f32; 4],
    pub gyroscope: [f32; 3],
    pub accelerometer: [f32; 3],
    pub rpy: [f32; 3],
    pub temperature: i8,
}

/// Measured state of a single motor slot.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotorState {
    pub mode: u8,
    /// Measured position [rad].
    pub q: f32,
    /// Measured velocity [rad/s].
    pub dq: f32,
    pub ddq: f32,
    /// Estimated output torque [N·m].
    pub tau_est: f32,
    pub q_raw: f32,
    pub dq_raw: f32,
    pub ddq_raw: f32,
    pub temperature: i8,
    pub lost: u32,
    pub reserve: [u32; 2],
}

/// Battery management state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BmsState {
    pub version_high: u8,
    pub version_low: u8,
    pub status: u8,
    pub soc: u8,
    pub current: i32,
    pub cycle: u16,
    pub bq_ntc: [i8; 2],
    pub mcu_ntc: [i8; 2],
    pub cell_vol: [u16; 15],
}

/// Complete low-level state frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LowState {
    pub header: FrameHeader,
    pub imu_state: ImuState,
    pub motor_state: [MotorState; NUM_MOTOR],
    pub bms_state: BmsState,
    pub foot_force: [i16; 4],
    pub foot_force_est: [i16; 4],
    /// Robot-side millisecond tick.
    pub tick: u32,
    pub wireless_remote: [u8; 40],
    pub bit_flag: u8,
    pub adc_reel: f32,
    pub temperature_ntc1: i8,
    pub temperature_ntc2: i8,
    pub power_v: f32,
    pub power_a: f32,
    pub fan_frequency: [u16; 4],
    pub reserve: u32,
    pub crc: u32,
}

impl Default for LowState {
    fn default() -> Self {
        Self {
            header: FrameHeader::default(),
            imu_state: ImuState::default(),
            motor_state: [MotorState::default(); NUM_MOTOR],
            bms_state: BmsState::default(),
            foot_force: [0; 4],
            foot_force_est: [0; 4],
            tick: 0,
            wireless_remote: [0; 40],
            bit_flag: 0,
            adc_reel: 0.0,
            temperature_ntc1: 0,
            temperature_ntc2: 0,
            power_v: 0.0,
            power_a: 0.0,
            fan_frequency: [0; 4],
            reserve: 0,
            crc: 0,
        }
    }
}

impl LowState {
    /// Measured joint positions of all slots.
    pub fn positions(&self) -> [f32; NUM_MOTOR] {
        self.motor_state.map(|m| m.q)
    }

    /// Encode with the currently stored `crc` field.
    pub fn encode(&self) -> [u8; LOWSTATE_SIZE] {
        let mut buf = [0u8; LOWSTATE_SIZE];
        let mut w = ByteWriter::new(&mut buf);
        self.header.write(&mut w);

        let imu = &self.imu_state;
        for v in imu
            .quaternion
            .iter()
            .chain(&imu.gyroscope)
            .chain(&imu.accelerometer)
            .chain(&imu.rpy)
        {
            w.f32(*v);
        }
        w.i8(imu.temperature);
        w.pad(3);

        for m in &self.motor_state {
            w.u8(m.mode);
            w.pad(3);
            for v in [m.q, m.dq, m.ddq, m.tau_est, m.q_raw, m.dq_raw, m.ddq_raw] {
                w.f32(v);
            }
            w.i8(m.temperature);
            w.pad(3);
            w.u32(m.lost);
            w.u32(m.reserve[0]);
            w.u32(m.reserve[1]);
        }

        let bms = &self.bms_state;
        w.bytes(&[bms.version_high, bms.version_low, bms.status, bms.soc]);
        w.i32(bms.current);
        w.u16(bms.cycle);
        for v in bms.bq_ntc.iter().chain(&bms.mcu_ntc) {
            w.i8(*v);
        }
        for v in bms.cell_vol {
            w.u16(v);
        }

        for v in self.foot_force.iter().chain(&self.foot_force_est) {
            w.i16(*v);
        }
        w.u32(self.tick);
        w.bytes(&self.wireless_remote);
        w.u8(self.bit_flag);
        w.pad(3);
        w.f32(self.adc_reel);
        w.i8(self.temperature_ntc1);
        w.i8(self.temperature_ntc2);
        w.pad(2);
        w.f32(self.power_v);
        w.f32(self.power_a);
        for v in self.fan_frequency {
            w.u16(v);
        }
        w.u32(self.reserve);
        w.u32(self.crc);
        debug_assert_eq!(w.position(), LOWSTATE_SIZE);
        buf
    }

    /// Encode and stamp the CRC (stored back into `self.crc`).
    pub fn encode_with_crc(&mut self) -> [u8; LOWSTATE_SIZE] {
        let mut buf = self.encode();
        self.crc = stamp_crc(&mut buf);
        buf
    }

    /// Decode a received frame. The CRC is carried over, not checked.
    ///
    /// # Errors
    /// `WireError::Truncated` if `buf` is shorter than [`LOWSTATE_SIZE`].
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        ensure_len(buf, LOWSTATE_SIZE)?;
        let mut r = ByteReader::new(buf);
        let header = FrameHeader::read(&mut r);

        let f32s = |r: &mut ByteReader<'_>, out: &mut [f32]| {
            for v in out.iter_mut() {
                *v = r.f32();
            }
        };
        let mut imu_state = ImuState::default();
        f32s(&mut r, &mut imu_state.quaternion);
        f32s(&mut r, &mut imu_state.gyroscope);
        f32s(&mut r, &mut imu_state.accelerometer);
        f32s(&mut r, &mut imu_state.rpy);
        imu_state.temperature = r.i8();
        r.skip(3);

        let mut motor_state = [MotorState::default(); NUM_MOTOR];
        for m in motor_state.iter_mut() {
            m.mode = r.u8();
            r.skip(3);
            m.q = r.f32();
            m.dq = r.f32();
            m.ddq = r.f32();
            m.tau_est = r.f32();
            m.q_raw = r.f32();
            m.dq_raw = r.f32();
            m.ddq_raw = r.f32();
            m.temperature = r.i8();
            r.skip(3);
            m.lost = r.u32();
            m.reserve = [r.u32(), r.u32()];
        }

        let mut bms_state = BmsState {
            version_high: r.u8(),
            version_low: r.u8(),
            status: r.u8(),
            soc: r.u8(),
            current: r.i32(),
            cycle: r.u16(),
            bq_ntc: [r.i8(), r.i8()],
            mcu_ntc: [r.i8(), r.i8()],
            cell_vol: [0; 15],
        };
        for v in bms_state.cell_vol.iter_mut() {
            *v = r.u16();
        }

        let foot_force = [r.i16(), r.i16(), r.i16(), r.i16()];
        let foot_force_est = [r.i16(), r.i16(), r.i16(), r.i16()];
        let tick = r.u32();
        let wireless_remote = r.array();
        let bit_flag = r.u8();
        r.skip(3);
        let adc_reel = r.f32();
        let temperature_ntc1 = r.i8();
        let temperature_ntc2 = r.i8();
        r.skip(2);
        let power_v = r.f32();
        let power_a = r.f32();
        let fan_frequency = [r.u16(), r.u16(), r.u16(), r.u16()];
        let reserve = r.u32();
        let crc = r.u32();
        debug_assert_eq!(r.position(), LOWSTATE_SIZE);

        Ok(Self {
            header,
            imu_state,
            motor_state,
            bms_state,
            foot_force,
            foot_force_est,
            tick,
            wireless_remote,
            bit_flag,
            adc_reel,
            temperature_ntc1,
            temperature_ntc2,
            power_v,
            power_a,
            fan_frequency,
            reserve,
            crc,
        })
    }
}
