// Protocol constants for the Newton serial link

use std::time::Duration;

/// Tag byte of a CommandAck control packet.
pub const TAG_COMMAND_ACK: u8 = 0x00;

/// Tag byte of a Ready control packet.
pub const TAG_READY: u8 = 0x80;

/// Tag byte of an Ack control packet.
pub const TAG_ACK: u8 = 0x90;

/// Tag byte of an Interrupt control packet.
pub const TAG_INTERRUPT: u8 = 0xA0;

/// First prefix byte of a data packet.
pub const TAG_MESSAGE: u8 = 0xF7;

/// Second prefix byte of a data packet.
pub const MESSAGE_PREFIX_1: u8 = 0x7F;

/// Frame overhead of a data packet: two prefix bytes, length, checksum.
pub const MESSAGE_OVERHEAD: usize = 4;

/// Maximum data bytes a single data packet may carry.
pub const MAX_MESSAGE_DATA: usize = 127;

/// Fragment boundary: non-terminal fragments carry exactly this many
/// bytes, the terminal fragment strictly fewer. The device firmware
/// splits at 63 (earlier firmwares used 127).
pub const MESSAGE_SPLIT: usize = 63;

/// Per-byte timeout once a frame has begun, and for all writes.
pub const SHORT_TIMEOUT: Duration = Duration::from_millis(100);

/// Default serial port device.
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Serial baud rate (8N1).
pub const BAUD_RATE: u32 = 115_200;

/// Size of a serialized [`crate::time::NewtonTime`].
pub const TIME_SIZE: usize = 8;

/// Size of a serialized [`crate::profile::NewtonProfile`].
pub const PROFILE_SIZE: usize = 82;

/// Size of a serialized [`crate::profile::NewtonProfileScreens`].
pub const SCREENS_SIZE: usize = 18;

/// Number of rider profiles the device persists.
pub const PROFILE_COUNT: usize = 4;

/// Size of the fixed ride header that precedes the record stream.
pub const RIDE_HEADER_SIZE: usize = 82;

/// Size of one per-second ride record slot.
pub const RIDE_RECORD_SIZE: usize = 15;

/// Size of a serialized [`crate::ride::NewtonRideHeader`].
pub const RIDE_LIST_HEADER_SIZE: usize = 14;

/// Wind tube pressure readings below this offset register as still air.
pub const WIND_TUBE_OFFSET: u16 = 621;

/// Calibration multiplier for wind speed from tube pressure.
pub const WIND_TUBE_MULTIPLIER: f64 = 13.6355;

/// Standard reference pressure in Pascals.
pub const REFERENCE_PRESSURE_PA: f64 = 101_325.0;

/// Standard reference temperature in Kelvin.
pub const REFERENCE_TEMPERATURE_K: f64 = 288.15;
