use crate::codec::expect_len;
use crate::constants::TIME_SIZE;
use crate::error::NewtonError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// The device's 8-byte calendar timestamp.
///
/// Little-endian `secs mins hours day month month_length year:i16`.
/// `month_length` is the day count of `month`; the firmware needs it
/// spelled out rather than deriving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewtonTime {
    pub secs: i8,
    pub mins: i8,
    pub hours: i8,
    pub day: i8,
    pub month: i8,
    pub month_length: i8,
    pub year: i16,
}

impl Default for NewtonTime {
    fn default() -> Self {
        // Device epoch: midnight, January 1st 2000.
        NewtonTime {
            secs: 0,
            mins: 0,
            hours: 0,
            day: 1,
            month: 1,
            month_length: 31,
            year: 2000,
        }
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map_or(31, |d| d.day())
}

impl NewtonTime {
    pub fn from_binary(data: &[u8]) -> Result<Self, NewtonError> {
        expect_len(data, TIME_SIZE)?;
        let mut buf = data;
        Ok(NewtonTime {
            secs: buf.get_i8(),
            mins: buf.get_i8(),
            hours: buf.get_i8(),
            day: buf.get_i8(),
            month: buf.get_i8(),
            month_length: buf.get_i8(),
            year: buf.get_i16_le(),
        })
    }

    pub fn to_binary(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(TIME_SIZE);
        self.put(&mut buf);
        buf.freeze()
    }

    pub(crate) fn put(&self, buf: &mut BytesMut) {
        buf.put_i8(self.secs);
        buf.put_i8(self.mins);
        buf.put_i8(self.hours);
        buf.put_i8(self.day);
        buf.put_i8(self.month);
        buf.put_i8(self.month_length);
        buf.put_i16_le(self.year);
    }

    /// Interpret as a calendar timestamp; `None` if the fields do not
    /// name a real instant.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)?
            .and_hms_opt(self.hours as u32, self.mins as u32, self.secs as u32)
    }

    pub fn from_datetime(dt: NaiveDateTime) -> Self {
        NewtonTime {
            secs: dt.second() as i8,
            mins: dt.minute() as i8,
            hours: dt.hour() as i8,
            day: dt.day() as i8,
            month: dt.month() as i8,
            month_length: days_in_month(dt.year(), dt.month()) as i8,
            year: dt.year() as i16,
        }
    }
}
