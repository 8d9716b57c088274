use crate::codec::expect_len;
use crate::constants::{PROFILE_SIZE, SCREENS_SIZE};
use crate::error::NewtonError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

/// Bit that must be set in `sample_smoothing` on the wire.
pub const SMOOTHING_REQUIRED_BITS: u16 = 0x0800;

/// Bit that must be clear in `sample_smoothing` on the wire.
pub const SMOOTHING_FORBIDDEN_BITS: u16 = 0x0020;

/// A persisted rider/bike configuration. Four live on the device.
///
/// 82 wire bytes, little-endian. The `unknown_*` and `null_*` fields
/// are carried verbatim; their observed values are captured in
/// [`NewtonProfile::default`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewtonProfile {
    pub unknown_0: i16,
    pub sample_smoothing: u16,
    pub unknown_1: i16,
    pub null_1: i32,
    pub null_2: i16,
    pub user_edited: u16,
    pub total_mass_lb: i16,
    pub wheel_circumference_mm: i16,
    pub null_3: i16,
    pub unknown_3: i16,
    pub unknown_2: i16,
    pub unknown_4: u16,
    pub unknown_5: i16,
    pub aero: f32,
    pub fric: f32,
    pub unknown_6: f32,
    pub unknown_7: f32,
    pub unknown_8: i32,
    pub wind_scaling_sqrt: f32,
    pub tilt_mult_10: i16,
    pub cal_mass_lb: i16,
    pub rider_mass_lb: i16,
    pub unknown_9: i16,
    pub ftp_per_kilo_ish: i16,
    pub ftp_over_095: i16,
    pub unknown_a: i16,
    pub speed_id: u16,
    pub cadence_id: u16,
    pub hr_id: u16,
    pub power_id: u16,
    pub speed_type: u8,
    pub cadence_type: u8,
    pub hr_type: u8,
    pub power_type: u8,
    pub power_smoothing_seconds: u16,
    pub unknown_c: i16,
}

impl Default for NewtonProfile {
    /// A freshly reset profile as observed on the device.
    fn default() -> Self {
        NewtonProfile {
            unknown_0: 0x5c16,
            sample_smoothing: 10251,
            unknown_1: 0x382b,
            null_1: 0,
            null_2: 0,
            user_edited: 32780,
            total_mass_lb: 205,
            wheel_circumference_mm: 2096,
            null_3: 0,
            unknown_3: 0,
            unknown_2: 0,
            unknown_4: 0,
            unknown_5: 0,
            aero: 0.488_925_01,
            fric: 11.311,
            unknown_6: 0.0,
            unknown_7: 0.0,
            unknown_8: 1_670_644_000,
            wind_scaling_sqrt: 1.151_086,
            tilt_mult_10: -7,
            cal_mass_lb: 205,
            rider_mass_lb: 180,
            unknown_9: 1803,
            ftp_per_kilo_ish: 1,
            ftp_over_095: 85,
            unknown_a: 769,
            speed_id: 0,
            cadence_id: 0,
            hr_id: 0,
            power_id: 0,
            speed_type: 0,
            cadence_type: 0,
            hr_type: 0,
            power_type: 0,
            power_smoothing_seconds: 1,
            unknown_c: 50,
        }
    }
}

/// Normalize smoothing flags the way the firmware stores them:
/// 0x0800 always set, 0x0020 always cleared.
pub fn normalize_sample_smoothing(raw: u16) -> u16 {
    (raw | SMOOTHING_REQUIRED_BITS) & !SMOOTHING_FORBIDDEN_BITS
}

impl NewtonProfile {
    pub fn from_binary(data: &[u8]) -> Result<Self, NewtonError> {
        expect_len(data, PROFILE_SIZE)?;
        let mut buf = data;
        Ok(NewtonProfile {
            unknown_0: buf.get_i16_le(),
            sample_smoothing: buf.get_u16_le(),
            unknown_1: buf.get_i16_le(),
            null_1: buf.get_i32_le(),
            null_2: buf.get_i16_le(),
            user_edited: buf.get_u16_le(),
            total_mass_lb: buf.get_i16_le(),
            wheel_circumference_mm: buf.get_i16_le(),
            null_3: buf.get_i16_le(),
            unknown_3: buf.get_i16_le(),
            unknown_2: buf.get_i16_le(),
            unknown_4: buf.get_u16_le(),
            unknown_5: buf.get_i16_le(),
            aero: buf.get_f32_le(),
            fric: buf.get_f32_le(),
            unknown_6: buf.get_f32_le(),
            unknown_7: buf.get_f32_le(),
            unknown_8: buf.get_i32_le(),
            wind_scaling_sqrt: buf.get_f32_le(),
            tilt_mult_10: buf.get_i16_le(),
            cal_mass_lb: buf.get_i16_le(),
            rider_mass_lb: buf.get_i16_le(),
            unknown_9: buf.get_i16_le(),
            ftp_per_kilo_ish: buf.get_i16_le(),
            ftp_over_095: buf.get_i16_le(),
            unknown_a: buf.get_i16_le(),
            speed_id: buf.get_u16_le(),
            cadence_id: buf.get_u16_le(),
            hr_id: buf.get_u16_le(),
            power_id: buf.get_u16_le(),
            speed_type: buf.get_u8(),
            cadence_type: buf.get_u8(),
            hr_type: buf.get_u8(),
            power_type: buf.get_u8(),
            power_smoothing_seconds: buf.get_u16_le(),
            unknown_c: buf.get_i16_le(),
        })
    }

    pub fn to_binary(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(PROFILE_SIZE);
        self.put(&mut buf);
        buf.freeze()
    }

    pub(crate) fn put(&self, buf: &mut BytesMut) {
        buf.put_i16_le(self.unknown_0);
        buf.put_u16_le(self.sample_smoothing);
        buf.put_i16_le(self.unknown_1);
        buf.put_i32_le(self.null_1);
        buf.put_i16_le(self.null_2);
        buf.put_u16_le(self.user_edited);
        buf.put_i16_le(self.total_mass_lb);
        buf.put_i16_le(self.wheel_circumference_mm);
        buf.put_i16_le(self.null_3);
        buf.put_i16_le(self.unknown_3);
        buf.put_i16_le(self.unknown_2);
        buf.put_u16_le(self.unknown_4);
        buf.put_i16_le(self.unknown_5);
        buf.put_f32_le(self.aero);
        buf.put_f32_le(self.fric);
        buf.put_f32_le(self.unknown_6);
        buf.put_f32_le(self.unknown_7);
        buf.put_i32_le(self.unknown_8);
        buf.put_f32_le(self.wind_scaling_sqrt);
        buf.put_i16_le(self.tilt_mult_10);
        buf.put_i16_le(self.cal_mass_lb);
        buf.put_i16_le(self.rider_mass_lb);
        buf.put_i16_le(self.unknown_9);
        buf.put_i16_le(self.ftp_per_kilo_ish);
        buf.put_i16_le(self.ftp_over_095);
        buf.put_i16_le(self.unknown_a);
        buf.put_u16_le(self.speed_id);
        buf.put_u16_le(self.cadence_id);
        buf.put_u16_le(self.hr_id);
        buf.put_u16_le(self.power_id);
        buf.put_u8(self.speed_type);
        buf.put_u8(self.cadence_type);
        buf.put_u8(self.hr_type);
        buf.put_u8(self.power_type);
        buf.put_u16_le(self.power_smoothing_seconds);
        buf.put_i16_le(self.unknown_c);
    }
}

/// One profile's display layout block.
///
/// The device treats these 18 bytes as an opaque unit when syncing;
/// the internal structure is undocumented, so the bits are carried
/// verbatim through [`crate::command::SetScreens`] and
/// [`crate::command::GetAllScreens`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewtonProfileScreens(pub [u8; SCREENS_SIZE]);

impl NewtonProfileScreens {
    pub fn from_binary(data: &[u8]) -> Result<Self, NewtonError> {
        expect_len(data, SCREENS_SIZE)?;
        let mut bytes = [0u8; SCREENS_SIZE];
        bytes.copy_from_slice(data);
        Ok(NewtonProfileScreens(bytes))
    }

    pub fn to_binary(&self) -> Bytes {
        Bytes::copy_from_slice(&self.0)
    }
}
