//! The host role: typed command issue over the link, with the
//! re-encode check that catches codec drift against the real device.

use crate::channel::ByteChannel;
use crate::command::*;
use crate::error::NewtonError;
use crate::link::{LinkRole, SerialLink};
use crate::packet::Packet;
use crate::profile::NewtonProfile;
use crate::ride::{NewtonRide, NewtonRideHeader};
use crate::time::NewtonTime;
use chrono::Local;
use tracing::debug;

pub struct HostDriver<C> {
    link: SerialLink<C>,
}

impl<C: ByteChannel> HostDriver<C> {
    pub fn new(channel: C) -> Self {
        HostDriver {
            link: SerialLink::new(channel, LinkRole::Host),
        }
    }

    /// Issue one command and collect its typed response, or `None`
    /// for commands the device answers with the bare `CommandAck`.
    ///
    /// The decoded response is re-encoded and compared against the
    /// raw payload; a mismatch means the codec no longer matches the
    /// device and is surfaced as an error rather than silently
    /// accepted.
    pub fn do_command<R: Request>(&mut self, request: &R) -> Result<Option<R::Response>, NewtonError> {
        debug!(command = %R::IDENTIFIER, "issuing command");
        self.link.write_message(Some(&request.to_binary()))?;
        if !R::RESPONDS {
            // In place of a response message the device sends a lone
            // CommandAck; consume it so the next handshake starts on
            // a clean wire.
            let packet = self.link.read_packet()?;
            if packet != Packet::CommandAck {
                return Err(NewtonError::Protocol(format!(
                    "expected lone CommandAck, got {packet:?}"
                )));
            }
            return Ok(None);
        }
        let raw = self.link.read_message()?;
        let response = R::Response::from_binary(&raw)?;
        if response.to_binary() != raw {
            return Err(NewtonError::RoundTrip {
                context: std::any::type_name::<R::Response>(),
            });
        }
        Ok(Some(response))
    }

    fn expect<T>(response: Option<T>) -> Result<T, NewtonError> {
        response.ok_or_else(|| NewtonError::Protocol("response expected but absent".to_string()))
    }

    pub fn serial_number(&mut self) -> Result<SerialNumberResponse, NewtonError> {
        Self::expect(self.do_command(&GetSerialNumber)?)
    }

    pub fn firmware_version(&mut self) -> Result<f32, NewtonError> {
        Ok(Self::expect(self.do_command(&GetFirmwareVersion)?)?.version())
    }

    pub fn space_usage(&mut self) -> Result<i16, NewtonError> {
        Ok(Self::expect(self.do_command(&GetSpaceUsage)?)?.used_percentage)
    }

    pub fn odometer(&mut self) -> Result<OdometerResponse, NewtonError> {
        Self::expect(self.do_command(&GetOdometer)?)
    }

    pub fn profiles(&mut self) -> Result<[NewtonProfile; 4], NewtonError> {
        Ok(Self::expect(self.do_command(&GetProfileData)?)?.profiles)
    }

    pub fn file_list(&mut self) -> Result<Vec<NewtonRideHeader>, NewtonError> {
        Ok(Self::expect(self.do_command(&GetFileList)?)?.headers)
    }

    pub fn file(&mut self, ride_number: i16) -> Result<NewtonRide, NewtonError> {
        Ok(Self::expect(self.do_command(&GetFile { ride_number })?)?.ride)
    }

    pub fn set_units(&mut self, units: Units) -> Result<(), NewtonError> {
        self.do_command(&SetUnits { units })?;
        Ok(())
    }

    pub fn set_odometer_km(&mut self, km: f64) -> Result<(), NewtonError> {
        self.do_command(&SetOdometer::from_km(km))?;
        Ok(())
    }

    pub fn erase_all(&mut self) -> Result<(), NewtonError> {
        self.do_command(&EraseAll)?;
        Ok(())
    }

    /// Push the host's local wall clock.
    pub fn set_time_now(&mut self) -> Result<(), NewtonError> {
        self.do_command(&SetTime {
            unknown: 0,
            newton_time: NewtonTime::from_datetime(Local::now().naive_local()),
        })?;
        Ok(())
    }
}
