use std::array::TryFromSliceError;
use std::io;
use thiserror::Error;

/// The primary error type for the `velopod-lib` library.
#[derive(Error, Debug)]
pub enum NewtonError {
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("byte channel closed by peer")]
    ChannelClosed,

    #[error("invalid packet: {0}")]
    InvalidPacket(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("insufficient data: expected {expected} bytes, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    #[error("unknown command identifier 0x{0:02x}")]
    UnknownCommand(u8),

    #[error("codec round-trip mismatch for {context}: re-encoded bytes differ from wire bytes")]
    RoundTrip { context: &'static str },

    #[error("handler rejected command: {0}")]
    Handler(String),
}

impl From<TryFromSliceError> for NewtonError {
    fn from(_: TryFromSliceError) -> Self {
        NewtonError::InvalidPacket("failed to convert slice to array".to_string())
    }
}
