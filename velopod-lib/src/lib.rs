//! Host-side library and device simulator for the Newton/PowerPod
//! serial cycling power computer.
//!
//! The crate is layered the way the wire is: a [`channel::ByteChannel`]
//! moves bytes, the [`packet`] module frames them, the [`link`] module
//! carries whole application messages across the ready/ack handshake,
//! and the [`command`] catalog maps messages to typed requests and
//! responses. On top sit the two roles: [`host::HostDriver`] for tools
//! talking to a real device and [`simulator::NewtonSimulator`] for
//! playing the device against a real copy of Isaac.

pub mod channel;
pub mod codec;
pub mod command;
pub mod constants;
pub mod error;
pub mod host;
pub mod link;
pub mod packet;
pub mod profile;
pub mod ride;
pub mod simulator;
pub mod storage;
pub mod time;

// Re-export commonly used types
pub use channel::{ByteChannel, SerialChannel};
pub use command::{CommandId, DeviceRequest, Request, Response, Units};
pub use error::NewtonError;
pub use host::HostDriver;
pub use link::{LinkRole, SerialLink};
pub use packet::{Packet, PacketTag};
pub use profile::{NewtonProfile, NewtonProfileScreens};
pub use ride::{NewtonRide, NewtonRideData, NewtonRideHeader, RideRecord};
pub use simulator::{DeviceState, NewtonSimulator};
pub use time::NewtonTime;
