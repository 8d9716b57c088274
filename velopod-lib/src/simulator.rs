//! The device role: mutable state plus one handler per catalog
//! command, driven by a serve loop on the device side of the link.

use crate::channel::ByteChannel;
use crate::command::*;
use crate::error::NewtonError;
use crate::link::{LinkRole, SerialLink};
use crate::profile::{NewtonProfile, NewtonProfileScreens, normalize_sample_smoothing};
use crate::ride::{NewtonRide, NewtonRideData, RideRecord};
use bytes::Bytes;
use tracing::{debug, info};

/// Everything the simulated device remembers across commands.
#[derive(Debug, Clone)]
pub struct DeviceState {
    pub firmware_version: f32,
    pub serial_number: [u8; 16],
    pub rides: Vec<NewtonRide>,
    pub profiles: [NewtonProfile; 4],
    pub screens: [NewtonProfileScreens; 4],
    pub current_profile: usize,
    /// Kilometres, tenths resolution.
    pub odometer_distance: f64,
    pub units: Units,
    pub sample_rate: i16,
    pub trainer_weights: Option<[f32; 4]>,
    pub intervals: Vec<IntervalRecord>,
}

impl Default for DeviceState {
    fn default() -> Self {
        DeviceState {
            firmware_version: 6.12,
            serial_number: [0u8; 16],
            rides: vec![demo_ride()],
            profiles: [NewtonProfile::default(); 4],
            screens: [NewtonProfileScreens::default(); 4],
            current_profile: 0,
            odometer_distance: 0.0,
            units: Units::English,
            sample_rate: 1,
            trainer_weights: None,
            intervals: Vec::new(),
        }
    }
}

/// A synthetic thousand-second ride: steady 10 mph at 100 W with an
/// acceleration ramp through the second hundred records. Enough shape
/// for Isaac to chart something.
fn demo_ride() -> NewtonRide {
    let records = (0i16..1000)
        .map(|x| {
            RideRecord::Data(NewtonRideData {
                elevation_feet: 10,
                cadence: 0,
                heart_rate: 100,
                temperature_farenheit: 100,
                unknown_0: 0,
                tilt: 0.0,
                speed_mph: 10.0,
                wind_tube_pressure_difference: 620,
                power_watts: 100,
                dfpm_power_watts: 200,
                acceleration: if (100..200).contains(&x) { x - 100 } else { 0 },
                stopped_flag: 1,
                unknown_3: 5,
            })
        })
        .collect();
    NewtonRide::make(records)
}

impl DeviceState {
    fn current_profile_mut(&mut self) -> &mut NewtonProfile {
        &mut self.profiles[self.current_profile]
    }

    /// Apply one decoded request, returning the encoded response
    /// payload (`None` for commands answered by the bare
    /// `CommandAck`). Handler-level validation failures are
    /// session-fatal; no response is fabricated for them.
    pub fn handle(&mut self, request: &DeviceRequest) -> Result<Option<Bytes>, NewtonError> {
        match request {
            DeviceRequest::UploadFirmware(cmd) => {
                // Payload format undocumented; accepted and dropped.
                debug!(len = cmd.payload.len(), "discarding firmware payload");
                Ok(None)
            }
            DeviceRequest::SetTime(cmd) => {
                debug!(time = ?cmd.newton_time, "time set (not tracked)");
                Ok(None)
            }
            DeviceRequest::EraseAll(_) => {
                info!(erased = self.rides.len(), "erasing ride memory");
                self.rides.clear();
                Ok(None)
            }
            DeviceRequest::GetSpaceUsage(_) => {
                // Hope you like having no free space.
                Ok(Some(
                    SpaceUsageResponse {
                        used_percentage: 199,
                    }
                    .to_binary(),
                ))
            }
            DeviceRequest::GetSerialNumber(_) => Ok(Some(
                SerialNumberResponse {
                    serial_number: self.serial_number,
                }
                .to_binary(),
            )),
            DeviceRequest::SetUnits(cmd) => {
                self.units = cmd.units;
                Ok(None)
            }
            DeviceRequest::SetOdometer(cmd) => {
                self.odometer_distance = cmd.km();
                Ok(None)
            }
            DeviceRequest::SetSampleRate(cmd) => {
                if cmd.unknown != 0 {
                    return Err(NewtonError::Handler(format!(
                        "SetSampleRate reserved field must be 0, got {}",
                        cmd.unknown
                    )));
                }
                self.sample_rate = cmd.sample_rate;
                Ok(None)
            }
            DeviceRequest::GetOdometer(_) => Ok(Some(
                OdometerResponse {
                    units: self.units,
                    unknown_1: 1,
                    unknown_2: 0,
                    odometer_tenths_km: (self.odometer_distance * 10.0).round() as i32,
                }
                .to_binary(),
            )),
            DeviceRequest::GetFirmwareVersion(_) => Ok(Some(
                FirmwareVersionResponse::from_version(self.firmware_version).to_binary(),
            )),
            DeviceRequest::SetTrainerWeights(cmd) => {
                self.trainer_weights = Some(cmd.weights);
                Ok(None)
            }
            DeviceRequest::SetIntervals(cmd) => {
                self.intervals = cmd.intervals.clone();
                Ok(None)
            }
            DeviceRequest::SetProfileData(cmd) => {
                let profile = self.current_profile_mut();
                profile.total_mass_lb = cmd.total_mass_lb;
                profile.user_edited = cmd.user_edited;
                profile.wheel_circumference_mm = cmd.wheel_circumference_mm;
                profile.sample_smoothing = normalize_sample_smoothing(cmd.sample_smoothing);
                profile.aero = cmd.aero;
                profile.fric = cmd.fric;
                profile.unknown_6 = cmd.unknown_6;
                profile.unknown_7 = cmd.unknown_7;
                profile.wind_scaling_sqrt = cmd.wind_scaling_sqrt;
                profile.speed_id = cmd.speed_id;
                profile.cadence_id = cmd.cadence_id;
                profile.hr_id = cmd.hr_id;
                profile.power_id = cmd.power_id;
                profile.speed_type = cmd.speed_type;
                profile.cadence_type = cmd.cadence_type;
                profile.hr_type = cmd.hr_type;
                profile.power_type = cmd.power_type;
                profile.tilt_mult_10 = (cmd.tilt_cal * 10.0).round() as i16;
                profile.cal_mass_lb = cmd.cal_mass_lb;
                profile.rider_mass_lb = cmd.rider_mass_lb;
                profile.unknown_9 = cmd.unknown_9;
                profile.ftp_per_kilo_ish = cmd.ftp_per_kilo_ish;
                profile.ftp_over_095 = cmd.ftp_over_095;
                Ok(None)
            }
            DeviceRequest::GetProfileNumber(_) => Ok(Some(
                ProfileNumberResponse {
                    number: self.current_profile as i16,
                }
                .to_binary(),
            )),
            DeviceRequest::SetProfileNumber(cmd) => {
                let number = cmd.number;
                if !(0..4).contains(&number) {
                    return Err(NewtonError::Handler(format!(
                        "profile number {number} out of range"
                    )));
                }
                self.current_profile = number as usize;
                Ok(None)
            }
            DeviceRequest::SetProfileData2(cmd) => {
                let profile = self.current_profile_mut();
                profile.power_smoothing_seconds = cmd.power_smoothing_seconds;
                profile.unknown_a = cmd.unknown_a;
                Ok(None)
            }
            DeviceRequest::GetProfileData(_) => Ok(Some(
                ProfileDataResponse {
                    profiles: self.profiles,
                }
                .to_binary(),
            )),
            DeviceRequest::GetFile(cmd) => {
                let ride = self
                    .rides
                    .get(cmd.ride_number as usize)
                    .ok_or_else(|| {
                        NewtonError::Handler(format!("no ride {}", cmd.ride_number))
                    })?;
                Ok(Some(FileResponse { ride: ride.clone() }.to_binary()))
            }
            DeviceRequest::GetFileList(_) => Ok(Some(
                FileListResponse {
                    headers: self.rides.iter().map(NewtonRide::header).collect(),
                }
                .to_binary(),
            )),
            DeviceRequest::Unknown22(_) => Ok(Some(
                Unknown22Response {
                    unknown_0: 2,
                    unknown_1: 0,
                }
                .to_binary(),
            )),
            DeviceRequest::SetScreens(cmd) => {
                self.screens[self.current_profile] = cmd.screens;
                Ok(None)
            }
            DeviceRequest::GetAllScreens(_) => Ok(Some(
                AllScreensResponse {
                    screens: self.screens,
                }
                .to_binary(),
            )),
        }
    }
}

/// A simulated device on one end of a byte channel.
pub struct NewtonSimulator<C> {
    link: SerialLink<C>,
    state: DeviceState,
    last_poll: CommandId,
}

impl<C: ByteChannel> NewtonSimulator<C> {
    pub fn new(channel: C, state: DeviceState) -> Self {
        NewtonSimulator {
            link: SerialLink::new(channel, LinkRole::Device),
            state,
            // Primed so the first firmware poll already logs quietly.
            last_poll: CommandId::GetSerialNumber,
        }
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut DeviceState {
        &mut self.state
    }

    /// Serve until the channel dies or a session-fatal protocol
    /// violation arrives.
    pub fn run(&mut self) -> Result<(), NewtonError> {
        info!("simulator ready");
        loop {
            self.serve_one()?;
        }
    }

    /// One command/response exchange.
    pub fn serve_one(&mut self) -> Result<(), NewtonError> {
        let message = self.link.read_message()?;
        let request = DeviceRequest::decode(&message)?;

        // Isaac polls serial number and firmware version every second
        // or so; keep that chatter out of the info log.
        let id = request.id();
        let polling = matches!(
            (self.last_poll, id),
            (CommandId::GetSerialNumber, CommandId::GetFirmwareVersion)
                | (CommandId::GetFirmwareVersion, CommandId::GetSerialNumber)
        );
        if polling {
            self.last_poll = id;
            debug!(command = %id, "<- request");
        } else {
            info!(command = %id, "<- request");
        }

        let response = self.state.handle(&request)?;
        match &response {
            Some(payload) => debug!(len = payload.len(), "-> response"),
            None => debug!("-> command ack"),
        }
        self.link.write_message(response.as_deref())?;
        Ok(())
    }
}
