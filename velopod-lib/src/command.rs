//! The closed command catalog: every request the host can put on the
//! wire, its identifier byte, its payload shape, and its typed
//! response (or lack of one).
//!
//! A request message is `identifier || payload`; a response message is
//! the bare response payload. The device side decodes inbound messages
//! through [`DeviceRequest::decode`], a match on the identifier byte.

use crate::codec::{expect_len, split_records};
use crate::constants::*;
use crate::error::NewtonError;
use crate::profile::{NewtonProfile, NewtonProfileScreens};
use crate::ride::{NewtonRide, NewtonRideHeader};
use crate::time::NewtonTime;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use num_enum::{FromPrimitive, IntoPrimitive};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Command identifier bytes.
///
/// The catalog is closed; anything else on the wire is a protocol
/// violation surfaced through the `Unknown` catch-all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum CommandId {
    UploadFirmware = 0x01,
    SetTime = 0x04,
    EraseAll = 0x07,
    GetSpaceUsage = 0x08,
    GetSerialNumber = 0x09,
    SetUnits = 0x0A,
    SetOdometer = 0x0B,
    SetSampleRate = 0x0C,
    GetOdometer = 0x0D,
    GetFirmwareVersion = 0x0E,
    SetTrainerWeights = 0x14,
    SetIntervals = 0x19,
    SetProfileData = 0x1A,
    GetProfileNumber = 0x1C,
    SetProfileNumber = 0x1D,
    SetProfileData2 = 0x1E,
    GetProfileData = 0x1F,
    GetFile = 0x20,
    GetFileList = 0x21,
    Unknown22 = 0x22,
    SetScreens = 0x29,
    GetAllScreens = 0x2A,
    #[num_enum(catch_all)]
    Unknown(u8),
}

/// Response payload codec.
pub trait Response: Sized {
    fn from_binary(data: &[u8]) -> Result<Self, NewtonError>;
    fn to_binary(&self) -> Bytes;
}

/// Stand-in response type for commands that elicit only the second
/// completion ack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoResponse;

impl Response for NoResponse {
    fn from_binary(_data: &[u8]) -> Result<Self, NewtonError> {
        Err(NewtonError::Protocol(
            "command does not carry a response".to_string(),
        ))
    }

    fn to_binary(&self) -> Bytes {
        Bytes::new()
    }
}

/// A typed request in the catalog.
pub trait Request: Sized {
    const IDENTIFIER: CommandId;
    /// Whether the device answers with a message (as opposed to the
    /// lone `CommandAck`).
    const RESPONDS: bool = true;
    type Response: Response;

    fn encode_payload(&self, buf: &mut BytesMut);
    fn decode_payload(data: &[u8]) -> Result<Self, NewtonError>;

    /// The full application message: identifier byte plus payload.
    fn to_binary(&self) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_u8(Self::IDENTIFIER.into());
        self.encode_payload(&mut buf);
        buf.freeze()
    }
}

/// Display unit system stored on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, IntoPrimitive, num_enum::TryFromPrimitive, Serialize, Deserialize)]
#[repr(i16)]
pub enum Units {
    #[default]
    English = 0,
    Metric = 1,
}

// --- 0x01 UploadFirmware -------------------------------------------------

/// Firmware upload. The payload format is undocumented and is carried
/// opaquely; the simulator accepts and discards it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFirmware {
    pub payload: Bytes,
}

impl Request for UploadFirmware {
    const IDENTIFIER: CommandId = CommandId::UploadFirmware;
    const RESPONDS: bool = false;
    type Response = NoResponse;

    fn encode_payload(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.payload);
    }

    fn decode_payload(data: &[u8]) -> Result<Self, NewtonError> {
        Ok(UploadFirmware {
            payload: Bytes::copy_from_slice(data),
        })
    }
}

// --- 0x04 SetTime --------------------------------------------------------

/// Push the wall clock to the device. The leading flag byte is
/// required here; peers that omit it (seen in the wild) are not
/// understood.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetTime {
    pub unknown: i8,
    pub newton_time: NewtonTime,
}

impl Request for SetTime {
    const IDENTIFIER: CommandId = CommandId::SetTime;
    const RESPONDS: bool = false;
    type Response = NoResponse;

    fn encode_payload(&self, buf: &mut BytesMut) {
        buf.put_i8(self.unknown);
        self.newton_time.put(buf);
    }

    fn decode_payload(data: &[u8]) -> Result<Self, NewtonError> {
        expect_len(data, 1 + TIME_SIZE)?;
        Ok(SetTime {
            unknown: data[0] as i8,
            newton_time: NewtonTime::from_binary(&data[1..])?,
        })
    }
}

// --- 0x07 EraseAll -------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EraseAll;

impl Request for EraseAll {
    const IDENTIFIER: CommandId = CommandId::EraseAll;
    const RESPONDS: bool = false;
    type Response = NoResponse;

    fn encode_payload(&self, _buf: &mut BytesMut) {}

    fn decode_payload(data: &[u8]) -> Result<Self, NewtonError> {
        expect_len(data, 0)?;
        Ok(EraseAll)
    }
}

// --- 0x08 GetSpaceUsage --------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetSpaceUsage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpaceUsageResponse {
    pub used_percentage: i16,
}

impl Request for GetSpaceUsage {
    const IDENTIFIER: CommandId = CommandId::GetSpaceUsage;
    type Response = SpaceUsageResponse;

    fn encode_payload(&self, _buf: &mut BytesMut) {}

    fn decode_payload(data: &[u8]) -> Result<Self, NewtonError> {
        expect_len(data, 0)?;
        Ok(GetSpaceUsage)
    }
}

impl Response for SpaceUsageResponse {
    fn from_binary(data: &[u8]) -> Result<Self, NewtonError> {
        expect_len(data, 2)?;
        Ok(SpaceUsageResponse {
            used_percentage: (&data[..]).get_i16_le(),
        })
    }

    fn to_binary(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(2);
        buf.put_i16_le(self.used_percentage);
        buf.freeze()
    }
}

// --- 0x09 GetSerialNumber ------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetSerialNumber;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialNumberResponse {
    pub serial_number: [u8; 16],
}

impl SerialNumberResponse {
    /// Render in the device's dash-separated hex form,
    /// `00-00-…-00`.
    pub fn formatted(&self) -> String {
        self.serial_number
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join("-")
    }
}

impl Request for GetSerialNumber {
    const IDENTIFIER: CommandId = CommandId::GetSerialNumber;
    type Response = SerialNumberResponse;

    fn encode_payload(&self, _buf: &mut BytesMut) {}

    fn decode_payload(data: &[u8]) -> Result<Self, NewtonError> {
        expect_len(data, 0)?;
        Ok(GetSerialNumber)
    }
}

impl Response for SerialNumberResponse {
    fn from_binary(data: &[u8]) -> Result<Self, NewtonError> {
        expect_len(data, 16)?;
        let mut serial_number = [0u8; 16];
        serial_number.copy_from_slice(data);
        Ok(SerialNumberResponse { serial_number })
    }

    fn to_binary(&self) -> Bytes {
        Bytes::copy_from_slice(&self.serial_number)
    }
}

// --- 0x0A SetUnits -------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetUnits {
    pub units: Units,
}

impl Request for SetUnits {
    const IDENTIFIER: CommandId = CommandId::SetUnits;
    const RESPONDS: bool = false;
    type Response = NoResponse;

    fn encode_payload(&self, buf: &mut BytesMut) {
        buf.put_i16_le(self.units.into());
    }

    fn decode_payload(data: &[u8]) -> Result<Self, NewtonError> {
        expect_len(data, 2)?;
        let raw = (&data[..]).get_i16_le();
        let units = Units::try_from(raw)
            .map_err(|_| NewtonError::Protocol(format!("unknown units value {raw}")))?;
        Ok(SetUnits { units })
    }
}

// --- 0x0B SetOdometer ----------------------------------------------------

/// Odometer is carried as tenths of a kilometre.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetOdometer {
    pub tenths_km: i32,
}

impl SetOdometer {
    pub fn from_km(km: f64) -> Self {
        SetOdometer {
            tenths_km: (km * 10.0).round() as i32,
        }
    }

    pub fn km(&self) -> f64 {
        self.tenths_km as f64 / 10.0
    }
}

impl Request for SetOdometer {
    const IDENTIFIER: CommandId = CommandId::SetOdometer;
    const RESPONDS: bool = false;
    type Response = NoResponse;

    fn encode_payload(&self, buf: &mut BytesMut) {
        buf.put_i32_le(self.tenths_km);
    }

    fn decode_payload(data: &[u8]) -> Result<Self, NewtonError> {
        expect_len(data, 4)?;
        Ok(SetOdometer {
            tenths_km: (&data[..]).get_i32_le(),
        })
    }
}

// --- 0x0C SetSampleRate --------------------------------------------------

/// The first field has no known meaning but must be zero; the
/// simulator treats anything else as a protocol violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetSampleRate {
    pub unknown: i16,
    pub sample_rate: i16,
}

impl Request for SetSampleRate {
    const IDENTIFIER: CommandId = CommandId::SetSampleRate;
    const RESPONDS: bool = false;
    type Response = NoResponse;

    fn encode_payload(&self, buf: &mut BytesMut) {
        buf.put_i16_le(self.unknown);
        buf.put_i16_le(self.sample_rate);
    }

    fn decode_payload(data: &[u8]) -> Result<Self, NewtonError> {
        expect_len(data, 4)?;
        let mut buf = data;
        Ok(SetSampleRate {
            unknown: buf.get_i16_le(),
            sample_rate: buf.get_i16_le(),
        })
    }
}

// --- 0x0D GetOdometer ----------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetOdometer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OdometerResponse {
    pub units: Units,
    pub unknown_1: i16,
    pub unknown_2: i16,
    pub odometer_tenths_km: i32,
}

impl OdometerResponse {
    pub fn km(&self) -> f64 {
        self.odometer_tenths_km as f64 / 10.0
    }
}

impl Request for GetOdometer {
    const IDENTIFIER: CommandId = CommandId::GetOdometer;
    type Response = OdometerResponse;

    fn encode_payload(&self, _buf: &mut BytesMut) {}

    fn decode_payload(data: &[u8]) -> Result<Self, NewtonError> {
        expect_len(data, 0)?;
        Ok(GetOdometer)
    }
}

impl Response for OdometerResponse {
    fn from_binary(data: &[u8]) -> Result<Self, NewtonError> {
        expect_len(data, 10)?;
        let mut buf = data;
        let raw_units = buf.get_i16_le();
        Ok(OdometerResponse {
            units: Units::try_from(raw_units)
                .map_err(|_| NewtonError::Protocol(format!("unknown units value {raw_units}")))?,
            unknown_1: buf.get_i16_le(),
            unknown_2: buf.get_i16_le(),
            odometer_tenths_km: buf.get_i32_le(),
        })
    }

    fn to_binary(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(10);
        buf.put_i16_le(self.units.into());
        buf.put_i16_le(self.unknown_1);
        buf.put_i16_le(self.unknown_2);
        buf.put_i32_le(self.odometer_tenths_km);
        buf.freeze()
    }
}

// --- 0x0E GetFirmwareVersion ---------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetFirmwareVersion;

/// Firmware version in the device's split encoding: versions at or
/// below 2.00 are hundredths; later versions carry an extra +500 so
/// that e.g. 6.12 encodes as 1112.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersionResponse {
    pub version_encoded: i16,
}

impl FirmwareVersionResponse {
    pub fn from_version(version: f32) -> Self {
        let encoded = if version <= 2.0 {
            (version * 100.0).round()
        } else {
            (version * 100.0 + 500.0).round()
        };
        FirmwareVersionResponse {
            version_encoded: encoded as i16,
        }
    }

    pub fn version(&self) -> f32 {
        if self.version_encoded > 0x0200 {
            self.version_encoded as f32 / 100.0 - 5.0
        } else {
            self.version_encoded as f32 / 100.0
        }
    }
}

impl Request for GetFirmwareVersion {
    const IDENTIFIER: CommandId = CommandId::GetFirmwareVersion;
    type Response = FirmwareVersionResponse;

    fn encode_payload(&self, _buf: &mut BytesMut) {}

    fn decode_payload(data: &[u8]) -> Result<Self, NewtonError> {
        expect_len(data, 0)?;
        Ok(GetFirmwareVersion)
    }
}

impl Response for FirmwareVersionResponse {
    fn from_binary(data: &[u8]) -> Result<Self, NewtonError> {
        expect_len(data, 2)?;
        Ok(FirmwareVersionResponse {
            version_encoded: (&data[..]).get_i16_le(),
        })
    }

    fn to_binary(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(2);
        buf.put_i16_le(self.version_encoded);
        buf.freeze()
    }
}

// --- 0x14 SetTrainerWeights ----------------------------------------------

/// Trainer resistance curve: watts as a cubic polynomial in mph,
/// `a0 + a1·v + a2·v² + a3·v³`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetTrainerWeights {
    pub weights: [f32; 4],
}

impl Request for SetTrainerWeights {
    const IDENTIFIER: CommandId = CommandId::SetTrainerWeights;
    const RESPONDS: bool = false;
    type Response = NoResponse;

    fn encode_payload(&self, buf: &mut BytesMut) {
        for w in self.weights {
            buf.put_f32_le(w);
        }
    }

    fn decode_payload(data: &[u8]) -> Result<Self, NewtonError> {
        expect_len(data, 16)?;
        let mut buf = data;
        let mut weights = [0f32; 4];
        for w in &mut weights {
            *w = buf.get_f32_le();
        }
        Ok(SetTrainerWeights { weights })
    }
}

// --- 0x19 SetIntervals ---------------------------------------------------

/// One interval of a stored workout. Working names; the wire carries
/// three i16 fields per interval either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalRecord {
    pub target_watts: i16,
    pub work_secs: i16,
    pub rest_secs: i16,
}

const INTERVAL_RECORD_SIZE: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetIntervals {
    pub unknown_0: i8,
    pub intervals: Vec<IntervalRecord>,
}

impl Request for SetIntervals {
    const IDENTIFIER: CommandId = CommandId::SetIntervals;
    const RESPONDS: bool = false;
    type Response = NoResponse;

    fn encode_payload(&self, buf: &mut BytesMut) {
        buf.put_i16_le(self.intervals.len() as i16);
        buf.put_i8(self.unknown_0);
        for interval in &self.intervals {
            buf.put_i16_le(interval.target_watts);
            buf.put_i16_le(interval.work_secs);
            buf.put_i16_le(interval.rest_secs);
        }
    }

    fn decode_payload(data: &[u8]) -> Result<Self, NewtonError> {
        if data.len() < 3 {
            return Err(NewtonError::InsufficientData {
                expected: 3,
                actual: data.len(),
            });
        }
        let mut buf = data;
        let count = buf.get_i16_le();
        let unknown_0 = buf.get_i8();
        if count < 0 {
            return Err(NewtonError::Protocol(format!(
                "negative interval count {count}"
            )));
        }
        let intervals = split_records(&data[3..], INTERVAL_RECORD_SIZE, count as usize)?
            .map(|mut record| IntervalRecord {
                target_watts: record.get_i16_le(),
                work_secs: record.get_i16_le(),
                rest_secs: record.get_i16_le(),
            })
            .collect();
        Ok(SetIntervals {
            unknown_0,
            intervals,
        })
    }
}

// --- 0x1A SetProfileData -------------------------------------------------

/// The profile fields Isaac pushes in one go. Merged into the current
/// profile by the device; `tilt_cal` travels as tenths of a degree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetProfileData {
    pub total_mass_lb: i16,
    pub user_edited: u16,
    pub wheel_circumference_mm: i16,
    pub sample_smoothing: u16,
    pub aero: f32,
    pub fric: f32,
    pub unknown_6: f32,
    pub unknown_7: f32,
    pub wind_scaling_sqrt: f32,
    pub speed_id: u16,
    pub cadence_id: u16,
    pub hr_id: u16,
    pub power_id: u16,
    pub speed_type: u8,
    pub cadence_type: u8,
    pub hr_type: u8,
    pub power_type: u8,
    pub tilt_cal: f64,
    pub cal_mass_lb: i16,
    pub rider_mass_lb: i16,
    pub unknown_9: i16,
    pub ftp_per_kilo_ish: i16,
    pub ftp_over_095: i16,
}

const SET_PROFILE_DATA_SIZE: usize = 52;

impl Request for SetProfileData {
    const IDENTIFIER: CommandId = CommandId::SetProfileData;
    const RESPONDS: bool = false;
    type Response = NoResponse;

    fn encode_payload(&self, buf: &mut BytesMut) {
        buf.put_i16_le(self.total_mass_lb);
        buf.put_u16_le(self.user_edited);
        buf.put_i16_le(self.wheel_circumference_mm);
        buf.put_u16_le(self.sample_smoothing);
        buf.put_f32_le(self.aero);
        buf.put_f32_le(self.fric);
        buf.put_f32_le(self.unknown_6);
        buf.put_f32_le(self.unknown_7);
        buf.put_f32_le(self.wind_scaling_sqrt);
        buf.put_u16_le(self.speed_id);
        buf.put_u16_le(self.cadence_id);
        buf.put_u16_le(self.hr_id);
        buf.put_u16_le(self.power_id);
        buf.put_u8(self.speed_type);
        buf.put_u8(self.cadence_type);
        buf.put_u8(self.hr_type);
        buf.put_u8(self.power_type);
        buf.put_i16_le((self.tilt_cal * 10.0).round() as i16);
        buf.put_i16_le(self.cal_mass_lb);
        buf.put_i16_le(self.rider_mass_lb);
        buf.put_i16_le(self.unknown_9);
        buf.put_i16_le(self.ftp_per_kilo_ish);
        buf.put_i16_le(self.ftp_over_095);
    }

    fn decode_payload(data: &[u8]) -> Result<Self, NewtonError> {
        expect_len(data, SET_PROFILE_DATA_SIZE)?;
        let mut buf = data;
        Ok(SetProfileData {
            total_mass_lb: buf.get_i16_le(),
            user_edited: buf.get_u16_le(),
            wheel_circumference_mm: buf.get_i16_le(),
            sample_smoothing: buf.get_u16_le(),
            aero: buf.get_f32_le(),
            fric: buf.get_f32_le(),
            unknown_6: buf.get_f32_le(),
            unknown_7: buf.get_f32_le(),
            wind_scaling_sqrt: buf.get_f32_le(),
            speed_id: buf.get_u16_le(),
            cadence_id: buf.get_u16_le(),
            hr_id: buf.get_u16_le(),
            power_id: buf.get_u16_le(),
            speed_type: buf.get_u8(),
            cadence_type: buf.get_u8(),
            hr_type: buf.get_u8(),
            power_type: buf.get_u8(),
            tilt_cal: buf.get_i16_le() as f64 * 0.1,
            cal_mass_lb: buf.get_i16_le(),
            rider_mass_lb: buf.get_i16_le(),
            unknown_9: buf.get_i16_le(),
            ftp_per_kilo_ish: buf.get_i16_le(),
            ftp_over_095: buf.get_i16_le(),
        })
    }
}

// --- 0x1C GetProfileNumber / 0x1D SetProfileNumber -----------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetProfileNumber;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileNumberResponse {
    pub number: i16,
}

impl Request for GetProfileNumber {
    const IDENTIFIER: CommandId = CommandId::GetProfileNumber;
    type Response = ProfileNumberResponse;

    fn encode_payload(&self, _buf: &mut BytesMut) {}

    fn decode_payload(data: &[u8]) -> Result<Self, NewtonError> {
        expect_len(data, 0)?;
        Ok(GetProfileNumber)
    }
}

impl Response for ProfileNumberResponse {
    fn from_binary(data: &[u8]) -> Result<Self, NewtonError> {
        expect_len(data, 2)?;
        Ok(ProfileNumberResponse {
            number: (&data[..]).get_i16_le(),
        })
    }

    fn to_binary(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(2);
        buf.put_i16_le(self.number);
        buf.freeze()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetProfileNumber {
    pub number: i16,
}

impl Request for SetProfileNumber {
    const IDENTIFIER: CommandId = CommandId::SetProfileNumber;
    const RESPONDS: bool = false;
    type Response = NoResponse;

    fn encode_payload(&self, buf: &mut BytesMut) {
        buf.put_i16_le(self.number);
    }

    fn decode_payload(data: &[u8]) -> Result<Self, NewtonError> {
        expect_len(data, 2)?;
        Ok(SetProfileNumber {
            number: (&data[..]).get_i16_le(),
        })
    }
}

// --- 0x1E SetProfileData2 ------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetProfileData2 {
    pub power_smoothing_seconds: u16,
    pub unknown_a: i16,
}

impl Request for SetProfileData2 {
    const IDENTIFIER: CommandId = CommandId::SetProfileData2;
    const RESPONDS: bool = false;
    type Response = NoResponse;

    fn encode_payload(&self, buf: &mut BytesMut) {
        buf.put_u16_le(self.power_smoothing_seconds);
        buf.put_i16_le(self.unknown_a);
    }

    fn decode_payload(data: &[u8]) -> Result<Self, NewtonError> {
        expect_len(data, 4)?;
        let mut buf = data;
        Ok(SetProfileData2 {
            power_smoothing_seconds: buf.get_u16_le(),
            unknown_a: buf.get_i16_le(),
        })
    }
}

// --- 0x1F GetProfileData -------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetProfileData;

/// All four profiles, prefixed with the total byte count (i32; 328 =
/// 4 × 82).
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileDataResponse {
    pub profiles: [NewtonProfile; PROFILE_COUNT],
}

impl Request for GetProfileData {
    const IDENTIFIER: CommandId = CommandId::GetProfileData;
    type Response = ProfileDataResponse;

    fn encode_payload(&self, _buf: &mut BytesMut) {}

    fn decode_payload(data: &[u8]) -> Result<Self, NewtonError> {
        expect_len(data, 0)?;
        Ok(GetProfileData)
    }
}

impl Response for ProfileDataResponse {
    fn from_binary(data: &[u8]) -> Result<Self, NewtonError> {
        if data.len() < 4 {
            return Err(NewtonError::InsufficientData {
                expected: 4,
                actual: data.len(),
            });
        }
        let total = (&data[..4]).get_i32_le();
        if total as usize != PROFILE_COUNT * PROFILE_SIZE {
            return Err(NewtonError::Protocol(format!(
                "profile block length prefix {total}, expected {}",
                PROFILE_COUNT * PROFILE_SIZE
            )));
        }
        let mut profiles = [NewtonProfile::default(); PROFILE_COUNT];
        for (i, chunk) in split_records(&data[4..], PROFILE_SIZE, PROFILE_COUNT)?.enumerate() {
            profiles[i] = NewtonProfile::from_binary(chunk)?;
        }
        Ok(ProfileDataResponse { profiles })
    }

    fn to_binary(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(4 + PROFILE_COUNT * PROFILE_SIZE);
        buf.put_i32_le((PROFILE_COUNT * PROFILE_SIZE) as i32);
        for profile in &self.profiles {
            profile.put(&mut buf);
        }
        buf.freeze()
    }
}

// --- 0x20 GetFile --------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetFile {
    pub ride_number: i16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileResponse {
    pub ride: NewtonRide,
}

impl Request for GetFile {
    const IDENTIFIER: CommandId = CommandId::GetFile;
    type Response = FileResponse;

    fn encode_payload(&self, buf: &mut BytesMut) {
        buf.put_i16_le(self.ride_number);
    }

    fn decode_payload(data: &[u8]) -> Result<Self, NewtonError> {
        expect_len(data, 2)?;
        Ok(GetFile {
            ride_number: (&data[..]).get_i16_le(),
        })
    }
}

impl Response for FileResponse {
    fn from_binary(data: &[u8]) -> Result<Self, NewtonError> {
        Ok(FileResponse {
            ride: NewtonRide::from_binary(data)?,
        })
    }

    fn to_binary(&self) -> Bytes {
        self.ride.to_binary()
    }
}

// --- 0x21 GetFileList ----------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetFileList;

/// Ride directory: an i16 count followed by one 14-byte header per
/// ride.
#[derive(Debug, Clone, PartialEq)]
pub struct FileListResponse {
    pub headers: Vec<NewtonRideHeader>,
}

impl Request for GetFileList {
    const IDENTIFIER: CommandId = CommandId::GetFileList;
    type Response = FileListResponse;

    fn encode_payload(&self, _buf: &mut BytesMut) {}

    fn decode_payload(data: &[u8]) -> Result<Self, NewtonError> {
        expect_len(data, 0)?;
        Ok(GetFileList)
    }
}

impl Response for FileListResponse {
    fn from_binary(data: &[u8]) -> Result<Self, NewtonError> {
        if data.len() < 2 {
            return Err(NewtonError::InsufficientData {
                expected: 2,
                actual: data.len(),
            });
        }
        let count = (&data[..2]).get_i16_le();
        if count < 0 {
            return Err(NewtonError::Protocol(format!("negative ride count {count}")));
        }
        let headers = split_records(&data[2..], RIDE_LIST_HEADER_SIZE, count as usize)?
            .map(NewtonRideHeader::from_binary)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FileListResponse { headers })
    }

    fn to_binary(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(2 + self.headers.len() * RIDE_LIST_HEADER_SIZE);
        buf.put_i16_le(self.headers.len() as i16);
        for header in &self.headers {
            header.put(&mut buf);
        }
        buf.freeze()
    }
}

// --- 0x22 Unknown22 ------------------------------------------------------

/// Sent by Isaac ahead of GetSpaceUsage; the reply is the constant
/// pair (2, 0). The purpose is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unknown22;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unknown22Response {
    pub unknown_0: i16,
    pub unknown_1: i16,
}

impl Request for Unknown22 {
    const IDENTIFIER: CommandId = CommandId::Unknown22;
    type Response = Unknown22Response;

    fn encode_payload(&self, _buf: &mut BytesMut) {}

    fn decode_payload(data: &[u8]) -> Result<Self, NewtonError> {
        expect_len(data, 0)?;
        Ok(Unknown22)
    }
}

impl Response for Unknown22Response {
    fn from_binary(data: &[u8]) -> Result<Self, NewtonError> {
        expect_len(data, 4)?;
        let mut buf = data;
        Ok(Unknown22Response {
            unknown_0: buf.get_i16_le(),
            unknown_1: buf.get_i16_le(),
        })
    }

    fn to_binary(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(4);
        buf.put_i16_le(self.unknown_0);
        buf.put_i16_le(self.unknown_1);
        buf.freeze()
    }
}

// --- 0x29 SetScreens / 0x2A GetAllScreens --------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetScreens {
    pub screens: NewtonProfileScreens,
}

impl Request for SetScreens {
    const IDENTIFIER: CommandId = CommandId::SetScreens;
    const RESPONDS: bool = false;
    type Response = NoResponse;

    fn encode_payload(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.screens.0);
    }

    fn decode_payload(data: &[u8]) -> Result<Self, NewtonError> {
        Ok(SetScreens {
            screens: NewtonProfileScreens::from_binary(data)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetAllScreens;

/// Every profile's screen block, prefixed with the total byte count
/// (i32; 72 = 4 × 18).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllScreensResponse {
    pub screens: [NewtonProfileScreens; PROFILE_COUNT],
}

impl Request for GetAllScreens {
    const IDENTIFIER: CommandId = CommandId::GetAllScreens;
    type Response = AllScreensResponse;

    fn encode_payload(&self, _buf: &mut BytesMut) {}

    fn decode_payload(data: &[u8]) -> Result<Self, NewtonError> {
        expect_len(data, 0)?;
        Ok(GetAllScreens)
    }
}

impl Response for AllScreensResponse {
    fn from_binary(data: &[u8]) -> Result<Self, NewtonError> {
        if data.len() < 4 {
            return Err(NewtonError::InsufficientData {
                expected: 4,
                actual: data.len(),
            });
        }
        let total = (&data[..4]).get_i32_le();
        if total as usize != PROFILE_COUNT * SCREENS_SIZE {
            return Err(NewtonError::Protocol(format!(
                "screens block length prefix {total}, expected {}",
                PROFILE_COUNT * SCREENS_SIZE
            )));
        }
        let mut screens = [NewtonProfileScreens::default(); PROFILE_COUNT];
        for (i, chunk) in split_records(&data[4..], SCREENS_SIZE, PROFILE_COUNT)?.enumerate() {
            screens[i] = NewtonProfileScreens::from_binary(chunk)?;
        }
        Ok(AllScreensResponse { screens })
    }

    fn to_binary(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(4 + PROFILE_COUNT * SCREENS_SIZE);
        buf.put_i32_le((PROFILE_COUNT * SCREENS_SIZE) as i32);
        for screens in &self.screens {
            buf.put_slice(&screens.0);
        }
        buf.freeze()
    }
}

// --- device-side dispatch ------------------------------------------------

/// A fully decoded inbound request, ready for a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceRequest {
    UploadFirmware(UploadFirmware),
    SetTime(SetTime),
    EraseAll(EraseAll),
    GetSpaceUsage(GetSpaceUsage),
    GetSerialNumber(GetSerialNumber),
    SetUnits(SetUnits),
    SetOdometer(SetOdometer),
    SetSampleRate(SetSampleRate),
    GetOdometer(GetOdometer),
    GetFirmwareVersion(GetFirmwareVersion),
    SetTrainerWeights(SetTrainerWeights),
    SetIntervals(SetIntervals),
    SetProfileData(SetProfileData),
    GetProfileNumber(GetProfileNumber),
    SetProfileNumber(SetProfileNumber),
    SetProfileData2(SetProfileData2),
    GetProfileData(GetProfileData),
    GetFile(GetFile),
    GetFileList(GetFileList),
    Unknown22(Unknown22),
    SetScreens(SetScreens),
    GetAllScreens(GetAllScreens),
}

impl DeviceRequest {
    /// Decode a complete application message (identifier byte plus
    /// payload) into its typed request.
    pub fn decode(message: &[u8]) -> Result<Self, NewtonError> {
        let (&id, payload) = message
            .split_first()
            .ok_or_else(|| NewtonError::Protocol("empty application message".to_string()))?;
        match CommandId::from_primitive(id) {
            CommandId::UploadFirmware => Ok(Self::UploadFirmware(UploadFirmware::decode_payload(payload)?)),
            CommandId::SetTime => Ok(Self::SetTime(SetTime::decode_payload(payload)?)),
            CommandId::EraseAll => Ok(Self::EraseAll(EraseAll::decode_payload(payload)?)),
            CommandId::GetSpaceUsage => Ok(Self::GetSpaceUsage(GetSpaceUsage::decode_payload(payload)?)),
            CommandId::GetSerialNumber => Ok(Self::GetSerialNumber(GetSerialNumber::decode_payload(payload)?)),
            CommandId::SetUnits => Ok(Self::SetUnits(SetUnits::decode_payload(payload)?)),
            CommandId::SetOdometer => Ok(Self::SetOdometer(SetOdometer::decode_payload(payload)?)),
            CommandId::SetSampleRate => Ok(Self::SetSampleRate(SetSampleRate::decode_payload(payload)?)),
            CommandId::GetOdometer => Ok(Self::GetOdometer(GetOdometer::decode_payload(payload)?)),
            CommandId::GetFirmwareVersion => {
                Ok(Self::GetFirmwareVersion(GetFirmwareVersion::decode_payload(payload)?))
            }
            CommandId::SetTrainerWeights => {
                Ok(Self::SetTrainerWeights(SetTrainerWeights::decode_payload(payload)?))
            }
            CommandId::SetIntervals => Ok(Self::SetIntervals(SetIntervals::decode_payload(payload)?)),
            CommandId::SetProfileData => Ok(Self::SetProfileData(SetProfileData::decode_payload(payload)?)),
            CommandId::GetProfileNumber => {
                Ok(Self::GetProfileNumber(GetProfileNumber::decode_payload(payload)?))
            }
            CommandId::SetProfileNumber => {
                Ok(Self::SetProfileNumber(SetProfileNumber::decode_payload(payload)?))
            }
            CommandId::SetProfileData2 => Ok(Self::SetProfileData2(SetProfileData2::decode_payload(payload)?)),
            CommandId::GetProfileData => Ok(Self::GetProfileData(GetProfileData::decode_payload(payload)?)),
            CommandId::GetFile => Ok(Self::GetFile(GetFile::decode_payload(payload)?)),
            CommandId::GetFileList => Ok(Self::GetFileList(GetFileList::decode_payload(payload)?)),
            CommandId::Unknown22 => Ok(Self::Unknown22(Unknown22::decode_payload(payload)?)),
            CommandId::SetScreens => Ok(Self::SetScreens(SetScreens::decode_payload(payload)?)),
            CommandId::GetAllScreens => Ok(Self::GetAllScreens(GetAllScreens::decode_payload(payload)?)),
            CommandId::Unknown(id) => Err(NewtonError::UnknownCommand(id)),
        }
    }

    pub fn id(&self) -> CommandId {
        match self {
            Self::UploadFirmware(_) => CommandId::UploadFirmware,
            Self::SetTime(_) => CommandId::SetTime,
            Self::EraseAll(_) => CommandId::EraseAll,
            Self::GetSpaceUsage(_) => CommandId::GetSpaceUsage,
            Self::GetSerialNumber(_) => CommandId::GetSerialNumber,
            Self::SetUnits(_) => CommandId::SetUnits,
            Self::SetOdometer(_) => CommandId::SetOdometer,
            Self::SetSampleRate(_) => CommandId::SetSampleRate,
            Self::GetOdometer(_) => CommandId::GetOdometer,
            Self::GetFirmwareVersion(_) => CommandId::GetFirmwareVersion,
            Self::SetTrainerWeights(_) => CommandId::SetTrainerWeights,
            Self::SetIntervals(_) => CommandId::SetIntervals,
            Self::SetProfileData(_) => CommandId::SetProfileData,
            Self::GetProfileNumber(_) => CommandId::GetProfileNumber,
            Self::SetProfileNumber(_) => CommandId::SetProfileNumber,
            Self::SetProfileData2(_) => CommandId::SetProfileData2,
            Self::GetProfileData(_) => CommandId::GetProfileData,
            Self::GetFile(_) => CommandId::GetFile,
            Self::GetFileList(_) => CommandId::GetFileList,
            Self::Unknown22(_) => CommandId::Unknown22,
            Self::SetScreens(_) => CommandId::SetScreens,
            Self::GetAllScreens(_) => CommandId::GetAllScreens,
        }
    }
}
