//! Rides: the 82-byte fixed header, the per-second 15-byte telemetry
//! records (a 120-bit big-endian bit stream), the paused-gap record
//! variant, and the 14-byte list entry returned by GetFileList.

use crate::codec::{BitReader, BitWriter, expect_len, split_records, swap_endian, to_signed, to_unsigned};
use crate::constants::*;
use crate::error::NewtonError;
use crate::time::NewtonTime;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

// Bit widths of the packed record fields, in wire order. The record
// is exactly 15 bytes; the compile-time check below keeps the table
// honest when fields are rearranged.
const W_ELEVATION_FEET: u32 = 16;
const W_CADENCE: u32 = 8;
const W_HEART_RATE: u32 = 8;
const W_TEMPERATURE: u32 = 8;
const W_UNKNOWN_0: u32 = 9;
const W_TILT: u32 = 10;
const W_SPEED: u32 = 10;
const W_WIND_TUBE: u32 = 10;
const W_POWER: u32 = 11;
const W_DFPM_POWER: u32 = 11;
const W_ACCELERATION: u32 = 10;
const W_STOPPED_FLAG: u32 = 1;
const W_UNKNOWN_3: u32 = 8;

const RECORD_FIELD_WIDTHS: [u32; 13] = [
    W_ELEVATION_FEET,
    W_CADENCE,
    W_HEART_RATE,
    W_TEMPERATURE,
    W_UNKNOWN_0,
    W_TILT,
    W_SPEED,
    W_WIND_TUBE,
    W_POWER,
    W_DFPM_POWER,
    W_ACCELERATION,
    W_STOPPED_FLAG,
    W_UNKNOWN_3,
];

const _: () = {
    let mut sum = 0;
    let mut i = 0;
    while i < RECORD_FIELD_WIDTHS.len() {
        sum += RECORD_FIELD_WIDTHS[i];
        i += 1;
    }
    assert!(sum == 8 * RIDE_RECORD_SIZE as u32);
};

/// Wire bias applied to the temperature field.
const TEMPERATURE_BIAS: i16 = 100;

/// A paused slot starts with six 0xFF bytes where no elevation and
/// cadence could legally appear together.
const PAUSED_TAG: [u8; 6] = [0xFF; 6];

/// One second of telemetry, unpacked from the 120-bit record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewtonRideData {
    pub elevation_feet: i16,
    pub cadence: u8,
    pub heart_rate: u8,
    /// Stored on the wire with a +100 bias (wire 0x00 = -100 F).
    pub temperature_farenheit: i16,
    pub unknown_0: i16,
    /// Degrees, tenths resolution on the wire.
    pub tilt: f64,
    /// Tenths resolution on the wire.
    pub speed_mph: f64,
    pub wind_tube_pressure_difference: u16,
    pub power_watts: u16,
    pub dfpm_power_watts: u16,
    pub acceleration: i16,
    pub stopped_flag: u8,
    pub unknown_3: u8,
}

impl NewtonRideData {
    fn from_bits(data: &[u8]) -> Self {
        let mut r = BitReader::new(data);
        NewtonRideData {
            elevation_feet: to_signed(swap_endian(r.read(W_ELEVATION_FEET) as u16) as u32, 16) as i16,
            cadence: r.read(W_CADENCE) as u8,
            heart_rate: r.read(W_HEART_RATE) as u8,
            temperature_farenheit: r.read(W_TEMPERATURE) as i16 - TEMPERATURE_BIAS,
            unknown_0: to_signed(r.read(W_UNKNOWN_0), W_UNKNOWN_0) as i16,
            tilt: to_signed(r.read(W_TILT), W_TILT) as f64 * 0.1,
            speed_mph: r.read(W_SPEED) as f64 * 0.1,
            wind_tube_pressure_difference: r.read(W_WIND_TUBE) as u16,
            power_watts: r.read(W_POWER) as u16,
            dfpm_power_watts: r.read(W_DFPM_POWER) as u16,
            acceleration: to_signed(r.read(W_ACCELERATION), W_ACCELERATION) as i16,
            stopped_flag: r.read(W_STOPPED_FLAG) as u8,
            unknown_3: r.read(W_UNKNOWN_3) as u8,
        }
    }

    fn to_bits(&self) -> Vec<u8> {
        let mut w = BitWriter::new(RIDE_RECORD_SIZE);
        w.write(swap_endian(to_unsigned(self.elevation_feet as i32, 16) as u16) as u32, W_ELEVATION_FEET);
        w.write(self.cadence as u32, W_CADENCE);
        w.write(self.heart_rate as u32, W_HEART_RATE);
        w.write((self.temperature_farenheit + TEMPERATURE_BIAS) as u32, W_TEMPERATURE);
        w.write(to_unsigned(self.unknown_0 as i32, W_UNKNOWN_0), W_UNKNOWN_0);
        w.write(to_unsigned((self.tilt * 10.0).round() as i32, W_TILT), W_TILT);
        w.write((self.speed_mph * 10.0).round() as u32, W_SPEED);
        w.write(self.wind_tube_pressure_difference as u32, W_WIND_TUBE);
        w.write(self.power_watts as u32, W_POWER);
        w.write(self.dfpm_power_watts as u32, W_DFPM_POWER);
        w.write(to_unsigned(self.acceleration as i32, W_ACCELERATION), W_ACCELERATION);
        w.write(self.stopped_flag as u32, W_STOPPED_FLAG);
        w.write(self.unknown_3 as u32, W_UNKNOWN_3);
        w.finish()
    }

    pub fn elevation_metres(&self) -> f64 {
        self.elevation_feet as f64 * 0.3048
    }

    pub fn temperature_kelvin(&self) -> f64 {
        (self.temperature_farenheit as f64 + 459.67) * 5.0 / 9.0
    }

    /// Barometric pressure at this record's elevation.
    pub fn pressure_pa(&self, reference_pressure_pa: f64, reference_temperature_kelvin: f64) -> f64 {
        reference_pressure_pa
            * (1.0 - (0.0065 * self.elevation_metres()) / reference_temperature_kelvin)
                .powf(9.80665 * 0.0289644 / 8.31447 / 0.0065)
    }

    /// Air density from pressure and the record's own temperature.
    pub fn density(&self, reference_pressure_pa: f64, reference_temperature_kelvin: f64) -> f64 {
        self.pressure_pa(reference_pressure_pa, reference_temperature_kelvin) * 0.0289644
            / 8.31447
            / self.temperature_kelvin()
    }

    /// Wind speed from the tube pressure differential. Readings below
    /// `offset` register as still air.
    pub fn wind_speed_kph(
        &self,
        offset: u16,
        multiplier: f64,
        reference_pressure_pa: f64,
        reference_temperature_kelvin: f64,
        wind_scaling_sqrt: f64,
    ) -> f64 {
        if self.wind_tube_pressure_difference < offset {
            return 0.0;
        }
        ((self.wind_tube_pressure_difference - offset) as f64
            / self.density(reference_pressure_pa, reference_temperature_kelvin)
            * multiplier)
            .sqrt()
            * wind_scaling_sqrt
    }

    /// Wind speed with the factory calibration constants.
    pub fn wind_speed_kph_default(&self) -> f64 {
        self.wind_speed_kph(
            WIND_TUBE_OFFSET,
            WIND_TUBE_MULTIPLIER,
            REFERENCE_PRESSURE_PA,
            REFERENCE_TEMPERATURE_K,
            1.0,
        )
    }
}

/// A recording gap: the same 15-byte slot carrying a timestamp
/// instead of telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewtonRidePaused {
    pub newton_time: NewtonTime,
    pub unknown_3: i8,
}

/// One 15-byte record slot. Paused and telemetry records alternate
/// freely within a ride.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RideRecord {
    Data(NewtonRideData),
    Paused(NewtonRidePaused),
}

impl RideRecord {
    pub fn from_binary(data: &[u8]) -> Result<Self, NewtonError> {
        expect_len(data, RIDE_RECORD_SIZE)?;
        if data[..6] == PAUSED_TAG {
            return Ok(RideRecord::Paused(NewtonRidePaused {
                newton_time: NewtonTime::from_binary(&data[6..14])?,
                unknown_3: data[14] as i8,
            }));
        }
        Ok(RideRecord::Data(NewtonRideData::from_bits(data)))
    }

    pub fn to_binary(&self) -> Bytes {
        match self {
            RideRecord::Data(record) => Bytes::from(record.to_bits()),
            RideRecord::Paused(paused) => {
                let mut buf = BytesMut::with_capacity(RIDE_RECORD_SIZE);
                buf.put_slice(&PAUSED_TAG);
                paused.newton_time.put(&mut buf);
                buf.put_i8(paused.unknown_3);
                buf.freeze()
            }
        }
    }

    pub fn as_data(&self) -> Option<&NewtonRideData> {
        match self {
            RideRecord::Data(record) => Some(record),
            RideRecord::Paused(_) => None,
        }
    }
}

/// Entry in the GetFileList response: 14 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewtonRideHeader {
    pub unknown_0: i16,
    pub start_time: NewtonTime,
    pub distance_metres: f32,
}

impl NewtonRideHeader {
    pub fn from_binary(data: &[u8]) -> Result<Self, NewtonError> {
        expect_len(data, RIDE_LIST_HEADER_SIZE)?;
        Ok(NewtonRideHeader {
            unknown_0: (&data[..2]).get_i16_le(),
            start_time: NewtonTime::from_binary(&data[2..10])?,
            distance_metres: (&data[10..14]).get_f32_le(),
        })
    }

    pub fn to_binary(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(RIDE_LIST_HEADER_SIZE);
        self.put(&mut buf);
        buf.freeze()
    }

    pub(crate) fn put(&self, buf: &mut BytesMut) {
        buf.put_i16_le(self.unknown_0);
        self.start_time.put(buf);
        buf.put_f32_le(self.distance_metres);
    }
}

/// One recording session: the fixed header plus its record stream.
///
/// The wire `size` field (record count) is derived from `records`
/// rather than stored, so the count can never disagree with the data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewtonRide {
    pub unknown_0: i16,
    pub total_mass_lb: f32,
    pub energy_kj: f32,
    pub aero: f32,
    pub fric: f32,
    pub initial_elevation_feet: f32,
    pub elevation_gain_feet: f32,
    pub wheel_circumference_mm: f32,
    pub unknown_1: i16,
    pub unknown_2: i16,
    pub start_time: NewtonTime,
    pub pressure_pa: i32,
    pub cm: f32,
    /// Rounded mean of the record temperatures.
    pub average_temperature_farenheit: i16,
    pub wind_scaling_sqrt: f32,
    pub riding_tilt_times_10: i16,
    pub cal_mass_lb: i16,
    pub unknown_5: i16,
    /// 10-bit signed calibration value; stored on the wire biased by
    /// +1024 in a 16-bit field.
    pub wind_tube_pressure_offset: i16,
    pub unknown_7: i32,
    pub reference_temperature_kelvin: i16,
    pub reference_pressure_pa: i32,
    pub unknown_9: i16,
    pub unknown_a: i16,
    pub records: Vec<RideRecord>,
}

/// Wire bias on `wind_tube_pressure_offset`.
const WIND_TUBE_OFFSET_BIAS: i16 = 1024;

impl NewtonRide {
    /// Build a ride around `records` with the header fields the
    /// firmware derives from them (record count, mean temperature,
    /// initial elevation, total energy) and factory defaults for the
    /// rest.
    pub fn make(records: Vec<RideRecord>) -> Self {
        let data: Vec<&NewtonRideData> = records.iter().filter_map(RideRecord::as_data).collect();
        let (average_temperature_farenheit, initial_elevation_feet, energy_kj) = if data.is_empty() {
            (73, 0.0, 0.0)
        } else {
            let mean_temp = data
                .iter()
                .map(|r| r.temperature_farenheit as f64)
                .sum::<f64>()
                / data.len() as f64;
            let total_power: f64 = data.iter().map(|r| r.power_watts as f64).sum();
            (
                mean_temp.round() as i16,
                data[0].elevation_feet as f32,
                (total_power / 1000.0).round() as f32,
            )
        };

        NewtonRide {
            unknown_0: 17,
            total_mass_lb: 235.0,
            energy_kj,
            aero: 0.384,
            fric: 12.0,
            initial_elevation_feet,
            elevation_gain_feet: 0.0,
            wheel_circumference_mm: 2136.0,
            unknown_1: 15,
            unknown_2: 1,
            start_time: NewtonTime::default(),
            pressure_pa: 101_325,
            cm: 1.0204,
            average_temperature_farenheit,
            wind_scaling_sqrt: 1.0,
            riding_tilt_times_10: 0,
            cal_mass_lb: 235,
            unknown_5: 88,
            wind_tube_pressure_offset: 620,
            unknown_7: 0,
            reference_temperature_kelvin: 288,
            reference_pressure_pa: 101_325,
            unknown_9: 1,
            unknown_a: 50,
            records,
        }
    }

    pub fn from_binary(data: &[u8]) -> Result<Self, NewtonError> {
        if data.len() < RIDE_HEADER_SIZE {
            return Err(NewtonError::InsufficientData {
                expected: RIDE_HEADER_SIZE,
                actual: data.len(),
            });
        }
        let mut buf = &data[..RIDE_HEADER_SIZE];
        let unknown_0 = buf.get_i16_le();
        let size = buf.get_i32_le();
        let total_mass_lb = buf.get_f32_le();
        let energy_kj = buf.get_f32_le();
        let aero = buf.get_f32_le();
        let fric = buf.get_f32_le();
        let initial_elevation_feet = buf.get_f32_le();
        let elevation_gain_feet = buf.get_f32_le();
        let wheel_circumference_mm = buf.get_f32_le();
        let unknown_1 = buf.get_i16_le();
        let unknown_2 = buf.get_i16_le();
        let start_time = NewtonTime::from_binary(&data[38..46])?;
        let mut buf = &data[46..RIDE_HEADER_SIZE];
        let pressure_pa = buf.get_i32_le();
        let cm = buf.get_f32_le();
        let average_temperature_farenheit = buf.get_i16_le();
        let wind_scaling_sqrt = buf.get_f32_le();
        let riding_tilt_times_10 = buf.get_i16_le();
        let cal_mass_lb = buf.get_i16_le();
        let unknown_5 = buf.get_i16_le();
        let wind_tube_pressure_offset = buf.get_i16_le() - WIND_TUBE_OFFSET_BIAS;
        let unknown_7 = buf.get_i32_le();
        let reference_temperature_kelvin = buf.get_i16_le();
        let reference_pressure_pa = buf.get_i32_le();
        let unknown_9 = buf.get_i16_le();
        let unknown_a = buf.get_i16_le();

        if size < 0 {
            return Err(NewtonError::InvalidPacket(format!(
                "negative ride record count {size}"
            )));
        }
        let records = split_records(&data[RIDE_HEADER_SIZE..], RIDE_RECORD_SIZE, size as usize)?
            .map(RideRecord::from_binary)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(NewtonRide {
            unknown_0,
            total_mass_lb,
            energy_kj,
            aero,
            fric,
            initial_elevation_feet,
            elevation_gain_feet,
            wheel_circumference_mm,
            unknown_1,
            unknown_2,
            start_time,
            pressure_pa,
            cm,
            average_temperature_farenheit,
            wind_scaling_sqrt,
            riding_tilt_times_10,
            cal_mass_lb,
            unknown_5,
            wind_tube_pressure_offset,
            unknown_7,
            reference_temperature_kelvin,
            reference_pressure_pa,
            unknown_9,
            unknown_a,
            records,
        })
    }

    pub fn to_binary(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(RIDE_HEADER_SIZE + self.records.len() * RIDE_RECORD_SIZE);
        buf.put_i16_le(self.unknown_0);
        buf.put_i32_le(self.records.len() as i32);
        buf.put_f32_le(self.total_mass_lb);
        buf.put_f32_le(self.energy_kj);
        buf.put_f32_le(self.aero);
        buf.put_f32_le(self.fric);
        buf.put_f32_le(self.initial_elevation_feet);
        buf.put_f32_le(self.elevation_gain_feet);
        buf.put_f32_le(self.wheel_circumference_mm);
        buf.put_i16_le(self.unknown_1);
        buf.put_i16_le(self.unknown_2);
        self.start_time.put(&mut buf);
        buf.put_i32_le(self.pressure_pa);
        buf.put_f32_le(self.cm);
        buf.put_i16_le(self.average_temperature_farenheit);
        buf.put_f32_le(self.wind_scaling_sqrt);
        buf.put_i16_le(self.riding_tilt_times_10);
        buf.put_i16_le(self.cal_mass_lb);
        buf.put_i16_le(self.unknown_5);
        buf.put_i16_le(self.wind_tube_pressure_offset + WIND_TUBE_OFFSET_BIAS);
        buf.put_i32_le(self.unknown_7);
        buf.put_i16_le(self.reference_temperature_kelvin);
        buf.put_i32_le(self.reference_pressure_pa);
        buf.put_i16_le(self.unknown_9);
        buf.put_i16_le(self.unknown_a);
        for record in &self.records {
            buf.put_slice(&record.to_binary());
        }
        buf.freeze()
    }

    /// Total distance in metres from the per-second speed samples.
    pub fn distance_metres(&self) -> f64 {
        self.records
            .iter()
            .filter_map(RideRecord::as_data)
            .map(|r| r.speed_mph * 1602.0 / 3600.0)
            .sum()
    }

    /// The 14-byte entry GetFileList advertises for this ride.
    pub fn header(&self) -> NewtonRideHeader {
        NewtonRideHeader {
            unknown_0: self.unknown_0,
            start_time: self.start_time,
            distance_metres: self.distance_metres() as f32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_zero_record_decodes_to_biased_floor() {
        let record = RideRecord::from_binary(&[0u8; RIDE_RECORD_SIZE]).unwrap();
        let RideRecord::Data(data) = record else {
            panic!("all-zero record is not a pause marker");
        };
        assert_eq!(data.elevation_feet, 0);
        assert_eq!(data.cadence, 0);
        assert_eq!(data.heart_rate, 0);
        assert_eq!(data.temperature_farenheit, -100);
        assert_eq!(data.speed_mph, 0.0);
        assert_eq!(record.to_binary().as_ref(), &[0u8; RIDE_RECORD_SIZE]);
    }

    #[test]
    fn temperature_bias_boundaries() {
        let mut record = NewtonRideData::from_bits(&[0u8; RIDE_RECORD_SIZE]);
        record.temperature_farenheit = -100;
        assert_eq!(record.to_bits()[4], 0x00);
        record.temperature_farenheit = 155;
        assert_eq!(record.to_bits()[4], 0xFF);
    }

    #[test]
    fn negative_elevation_swaps_bytes() {
        let mut record = NewtonRideData::from_bits(&[0u8; RIDE_RECORD_SIZE]);
        record.elevation_feet = -1;
        let bits = record.to_bits();
        assert_eq!(&bits[..2], &[0xFF, 0xFF]);
    }

    #[test]
    fn paused_record_round_trip() {
        let mut wire = vec![0xFFu8; 6];
        wire.extend_from_slice(&NewtonTime::default().to_binary());
        wire.push(5);
        let record = RideRecord::from_binary(&wire).unwrap();
        assert!(matches!(record, RideRecord::Paused(_)));
        assert_eq!(record.to_binary().as_ref(), wire.as_slice());
    }

    #[test]
    fn wind_speed_cutoff_below_offset() {
        let mut record = NewtonRideData::from_bits(&[0u8; RIDE_RECORD_SIZE]);
        record.temperature_farenheit = 68;
        record.wind_tube_pressure_difference = WIND_TUBE_OFFSET - 1;
        assert_eq!(record.wind_speed_kph_default(), 0.0);
        record.wind_tube_pressure_difference = WIND_TUBE_OFFSET + 100;
        assert!(record.wind_speed_kph_default() > 0.0);
    }
}
