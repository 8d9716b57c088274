//! Common test utilities and shared imports

// Allow unused imports and dead code since this is a shared module
// used across multiple test files - not all items are used in every
// test file
#![allow(dead_code)]
#![allow(unused_imports)]

pub use bytes::Bytes;
pub use velopod_lib::channel::ByteChannel;
pub use velopod_lib::command::*;
pub use velopod_lib::constants::*;
pub use velopod_lib::error::NewtonError;
pub use velopod_lib::link::{LinkRole, SerialLink};
pub use velopod_lib::packet::{Packet, PacketTag, message_checksum};
pub use velopod_lib::profile::{NewtonProfile, NewtonProfileScreens};
pub use velopod_lib::ride::{NewtonRide, NewtonRideData, NewtonRideHeader, NewtonRidePaused, RideRecord};
pub use velopod_lib::simulator::{DeviceState, NewtonSimulator};
pub use velopod_lib::time::NewtonTime;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError, channel};
use std::time::Duration;

/// Decode hex string to bytes for testing
pub fn hex_to_bytes(hex_data: &str) -> Vec<u8> {
    hex::decode(hex_data).expect("Failed to decode hex")
}

/// Opt-in log output while debugging a test run.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One scripted event on the read side of a [`ScriptedChannel`].
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Byte(u8),
    /// The next read call returns empty, as a timed-out read would.
    Timeout,
}

/// Single-ended channel for driving one link in isolation: reads come
/// from a script, writes are captured for inspection.
pub struct ScriptedChannel {
    input: VecDeque<Step>,
    written: Rc<RefCell<Vec<u8>>>,
}

impl ScriptedChannel {
    pub fn new(script: impl IntoIterator<Item = Step>) -> (Self, Rc<RefCell<Vec<u8>>>) {
        let written = Rc::new(RefCell::new(Vec::new()));
        (
            Self {
                input: script.into_iter().collect(),
                written: written.clone(),
            },
            written,
        )
    }

    /// Script from raw byte chunks, no timeouts.
    pub fn from_bytes(chunks: &[&[u8]]) -> (Self, Rc<RefCell<Vec<u8>>>) {
        Self::new(
            chunks
                .iter()
                .flat_map(|chunk| chunk.iter().copied().map(Step::Byte))
                .collect::<Vec<_>>(),
        )
    }
}

impl ByteChannel for ScriptedChannel {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, NewtonError> {
        if self.input.is_empty() {
            // Script exhausted: treat as the peer hanging up so tests
            // fail fast instead of spinning.
            return Err(NewtonError::ChannelClosed);
        }
        if matches!(self.input.front(), Some(Step::Timeout)) {
            self.input.pop_front();
            return Ok(0);
        }
        let mut filled = 0;
        while filled < buf.len() {
            match self.input.front() {
                Some(Step::Byte(b)) => {
                    buf[filled] = *b;
                    filled += 1;
                    self.input.pop_front();
                }
                _ => break,
            }
        }
        Ok(filled)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, NewtonError> {
        self.written.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn set_read_timeout(&mut self, _timeout: Option<Duration>) -> Result<(), NewtonError> {
        Ok(())
    }
}

/// In-memory duplex pipe: two channels wired back to back, one per
/// thread, standing in for the serial cable.
pub struct PipeChannel {
    tx: Sender<u8>,
    rx: Receiver<u8>,
    timeout: Option<Duration>,
}

pub fn pipe() -> (PipeChannel, PipeChannel) {
    let (tx_a, rx_b) = channel();
    let (tx_b, rx_a) = channel();
    (
        PipeChannel {
            tx: tx_a,
            rx: rx_a,
            timeout: None,
        },
        PipeChannel {
            tx: tx_b,
            rx: rx_b,
            timeout: None,
        },
    )
}

impl ByteChannel for PipeChannel {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, NewtonError> {
        if buf.is_empty() {
            return Ok(0);
        }
        // First byte honours the timeout, the rest drain greedily.
        buf[0] = match self.timeout {
            None => self.rx.recv().map_err(|_| NewtonError::ChannelClosed)?,
            Some(timeout) => match self.rx.recv_timeout(timeout) {
                Ok(byte) => byte,
                Err(RecvTimeoutError::Timeout) => return Ok(0),
                Err(RecvTimeoutError::Disconnected) => return Err(NewtonError::ChannelClosed),
            },
        };
        let mut filled = 1;
        while filled < buf.len() {
            match self.rx.try_recv() {
                Ok(byte) => {
                    buf[filled] = byte;
                    filled += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break,
            }
        }
        Ok(filled)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, NewtonError> {
        for byte in buf {
            self.tx.send(*byte).map_err(|_| NewtonError::ChannelClosed)?;
        }
        Ok(buf.len())
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), NewtonError> {
        self.timeout = timeout;
        Ok(())
    }
}

/// A telemetry record with recognizable values for list tests.
pub fn sample_record(speed_mph: f64, power_watts: u16) -> RideRecord {
    RideRecord::Data(NewtonRideData {
        elevation_feet: 120,
        cadence: 85,
        heart_rate: 150,
        temperature_farenheit: 68,
        unknown_0: 0,
        // Half-degree tilt so the tenths-scaled wire value decodes to
        // a bit-identical f64.
        tilt: -0.5,
        speed_mph,
        wind_tube_pressure_difference: 700,
        power_watts,
        dfpm_power_watts: 0,
        acceleration: 0,
        stopped_flag: 0,
        unknown_3: 0,
    })
}
