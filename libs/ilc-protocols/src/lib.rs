//! ILC Communication Stack
//!
//! This library implements the inner loop controller (ILC) communication
//! protocol for the mirror support system: a modbus-derived serial protocol
//! carried over FPGA FIFOs to five actuator subnets.
//!
//! # Architecture
//!
//! - [`wire`] packs protocol bytes into the tagged 16-bit FIFO words the
//!   FPGA expects and carries CRC and framing primitives.
//! - [`requests`] encodes the outbound function frames; [`buslist`]
//!   assembles them into complete per-subnet command images.
//! - [`decoder`] validates and parses response buffers into the telemetry
//!   structures of [`telemetry`], running the cross-cutting force and
//!   pressure checks against [`safety`].
//! - [`transaction`] drives whole bus lists through a [`transaction::FifoTransport`]
//!   with per-subnet bounded waits and timeout accounting.
//!
//! Actuator placement and limit configuration load through [`settings`]
//! into the [`subnet::SubnetAddressMap`].

pub mod buslist;
pub mod constants;
pub mod decoder;
pub mod error;
pub mod forces;
pub mod requests;
pub mod safety;
pub mod settings;
pub mod subnet;
pub mod telemetry;
pub mod timestamp;
pub mod transaction;
pub mod wire;

// Re-export the types nearly every consumer touches
pub use buslist::{BusList, BusListBuilder};
pub use decoder::ResponseDecoder;
pub use error::{IlcError, Result};
pub use requests::RequestEncoder;
pub use safety::{DetailedState, PressureRange, SafetyReporter};
pub use settings::{ForceActuatorSettings, HardpointSettings, IlcTimings};
pub use subnet::{DeviceType, Orientation, SubnetAddressMap};
pub use telemetry::{EventSink, IlcWarning, TelemetryStore, WarningKind};
pub use transaction::{BusTransactionManager, FifoTransport};
pub use wire::WireBuffer;
