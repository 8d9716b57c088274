use crate::constants::{BAUD_RATE, SHORT_TIMEOUT};
use crate::error::NewtonError;
use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::time::Duration;
use tracing::debug;

/// Byte transport under the link protocol.
///
/// `read` returns up to `buf.len()` bytes and may return short (or
/// zero) once the configured timeout elapses; a timeout is not an
/// error. `None` passed to `set_read_timeout` means "block until a
/// byte arrives".
pub trait ByteChannel {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, NewtonError>;

    fn write(&mut self, buf: &[u8]) -> Result<usize, NewtonError>;

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), NewtonError>;

    /// Read until `buf` is full or the timeout strikes. Returns how
    /// many bytes actually arrived.
    fn read_fully(&mut self, buf: &mut [u8]) -> Result<usize, NewtonError> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }
}

/// `serialport` does not model an infinite timeout, so "blocking" is a
/// timeout long enough that the distinction never matters on a link
/// whose peer polls every second.
const EFFECTIVELY_BLOCKING: Duration = Duration::from_secs(3600);

/// A [`ByteChannel`] over a physical serial port (115200 8N1).
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
}

impl SerialChannel {
    /// Open `path` with the device's fixed line settings. The port is
    /// closed again when the channel is dropped.
    pub fn open(path: &str) -> Result<Self, NewtonError> {
        let port = serialport::new(path, BAUD_RATE)
            .timeout(SHORT_TIMEOUT)
            .open()?;
        debug!(port = path, baud = BAUD_RATE, "serial port open");
        Ok(Self { port })
    }
}

impl ByteChannel for SerialChannel {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, NewtonError> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, NewtonError> {
        match self.port.write(buf) {
            Ok(n) => {
                self.port.flush()?;
                Ok(n)
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), NewtonError> {
        self.port
            .set_timeout(timeout.unwrap_or(EFFECTIVELY_BLOCKING))?;
        Ok(())
    }
}
