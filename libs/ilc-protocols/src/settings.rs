//! Configuration structures for the ILC stack.
//!
//! Actuator placement tables load from CSV, limit and timing settings from
//! YAML. All validation happens at load time so the hot path never checks
//! table shapes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::HP_COUNT;
use crate::error::{IlcError, Result};
use crate::subnet::Orientation;

/// One force actuator placement row (CSV).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForceActuatorTableRow {
    pub actuator_id: i32,
    pub subnet: u8,
    pub address: u8,
    pub orientation: Orientation,
}

/// One hardpoint actuator or monitor placement row (CSV).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IlcTableRow {
    pub actuator_id: i32,
    pub subnet: u8,
    pub address: u8,
}

/// Inclusive measured-force limit band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForceLimitRange {
    pub low: f32,
    pub high: f32,
}

impl ForceLimitRange {
    pub fn contains(&self, value: f32) -> bool {
        value >= self.low && value <= self.high
    }
}

/// Per-channel force actuator limits.
///
/// Measured-force bands are indexed by data index (primary) and secondary
/// index (secondary). Following-error entries are maximum absolute errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForceActuatorSettings {
    pub primary_cylinder_measured_force: Vec<ForceLimitRange>,
    pub secondary_cylinder_measured_force: Vec<ForceLimitRange>,
    pub primary_cylinder_following_error: Vec<f32>,
    pub secondary_cylinder_following_error: Vec<f32>,
}

impl ForceActuatorSettings {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        serde_yaml::from_str(&content)
            .map_err(|e| IlcError::config(format!("force actuator settings: {e}")))
    }

    /// Identical limits for every channel. Used by engineering setups and
    /// tests.
    pub fn uniform(
        count: usize,
        secondary_count: usize,
        measured: ForceLimitRange,
        following_error: f32,
    ) -> Self {
        ForceActuatorSettings {
            primary_cylinder_measured_force: vec![measured; count],
            secondary_cylinder_measured_force: vec![measured; secondary_count],
            primary_cylinder_following_error: vec![following_error; count],
            secondary_cylinder_following_error: vec![following_error; secondary_count],
        }
    }

    /// Checks table lengths against the loaded actuator map.
    pub fn validate(&self, fa_count: usize, secondary_count: usize) -> Result<()> {
        if self.primary_cylinder_measured_force.len() != fa_count
            || self.primary_cylinder_following_error.len() != fa_count
        {
            return Err(IlcError::config(format!(
                "primary limit tables must have {fa_count} entries"
            )));
        }
        if self.secondary_cylinder_measured_force.len() != secondary_count
            || self.secondary_cylinder_following_error.len() != secondary_count
        {
            return Err(IlcError::config(format!(
                "secondary limit tables must have {secondary_count} entries"
            )));
        }
        Ok(())
    }
}

/// Hardpoint actuator limits and encoder calibration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HardpointSettings {
    /// Encoder reading at zero displacement, per hardpoint
    pub encoder_offset: [i32; HP_COUNT],
    /// Displacement scale of the incremental encoder
    pub micrometers_per_encoder: f32,
    /// Load cell hard fault band, newtons
    pub measured_force_fault_low: f32,
    pub measured_force_fault_high: f32,
    /// Load cell warning band applied while the mirror is active
    pub measured_force_warning_low: f32,
    pub measured_force_warning_high: f32,
    /// Tighter warning band once balance forces are applied
    pub balance_force_warning_low: f32,
    pub balance_force_warning_high: f32,
    /// Breakaway air pressure fault band, millibar
    pub air_pressure_fault_low: f32,
    pub air_pressure_fault_high: f32,
    /// Relaxed low threshold while the mirror is raising
    pub air_pressure_fault_low_raising: f32,
}

impl HardpointSettings {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        serde_yaml::from_str(&content)
            .map_err(|e| IlcError::config(format!("hardpoint settings: {e}")))
    }
}

impl Default for HardpointSettings {
    fn default() -> Self {
        HardpointSettings {
            encoder_offset: [0; HP_COUNT],
            micrometers_per_encoder: 0.2442,
            measured_force_fault_low: -9999.0,
            measured_force_fault_high: 9999.0,
            measured_force_warning_low: -4500.0,
            measured_force_warning_high: 4500.0,
            balance_force_warning_low: -1200.0,
            balance_force_warning_high: 1200.0,
            air_pressure_fault_low: 110.0,
            air_pressure_fault_high: 130.0,
            air_pressure_fault_low_raising: 85.0,
        }
    }
}

/// Bus timing parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IlcTimings {
    /// Response wait after each unicast frame, microseconds
    #[serde(default = "default_unicast_wait_us")]
    pub unicast_wait_us: u16,
    /// Settling delay after each broadcast frame, microseconds
    #[serde(default = "default_broadcast_delay_us")]
    pub broadcast_delay_us: u16,
    /// Bound on waiting for a subnet's receive interrupt, milliseconds
    #[serde(default = "default_subnet_wait_ms")]
    pub subnet_wait_ms: u64,
    /// FIFO read/write timeout, milliseconds
    #[serde(default = "default_fifo_timeout_ms")]
    pub fifo_timeout_ms: u64,
}

fn default_unicast_wait_us() -> u16 {
    500
}

fn default_broadcast_delay_us() -> u16 {
    300
}

fn default_subnet_wait_ms() -> u64 {
    20
}

fn default_fifo_timeout_ms() -> u64 {
    10
}

impl Default for IlcTimings {
    fn default() -> Self {
        IlcTimings {
            unicast_wait_us: default_unicast_wait_us(),
            broadcast_delay_us: default_broadcast_delay_us(),
            subnet_wait_ms: default_subnet_wait_ms(),
            fifo_timeout_ms: default_fifo_timeout_ms(),
        }
    }
}

/// Loads a force actuator placement table from CSV.
pub fn load_force_actuator_table(path: impl AsRef<Path>) -> Result<Vec<ForceActuatorTableRow>> {
    let mut reader = csv::Reader::from_path(path.as_ref())
        .map_err(|e| IlcError::config(format!("force actuator table: {e}")))?;
    reader
        .deserialize()
        .map(|row| row.map_err(|e| IlcError::config(format!("force actuator table: {e}"))))
        .collect()
}

/// Loads a hardpoint actuator or monitor placement table from CSV.
pub fn load_ilc_table(path: impl AsRef<Path>) -> Result<Vec<IlcTableRow>> {
    let mut reader = csv::Reader::from_path(path.as_ref())
        .map_err(|e| IlcError::config(format!("ilc table: {e}")))?;
    reader
        .deserialize()
        .map(|row| row.map_err(|e| IlcError::config(format!("ilc table: {e}"))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_force_actuator_table_from_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "actuator_id,subnet,address,orientation").unwrap();
        writeln!(file, "101,1,1,NA").unwrap();
        writeln!(file, "135,1,17,+Y").unwrap();
        writeln!(file, "212,2,18,-X").unwrap();
        file.flush().unwrap();

        let rows = load_force_actuator_table(file.path()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].orientation, Orientation::None);
        assert_eq!(rows[1].orientation, Orientation::PositiveY);
        assert_eq!(rows[2].orientation, Orientation::NegativeX);
        assert_eq!(rows[2].subnet, 2);
    }

    #[test]
    fn test_invalid_orientation_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "actuator_id,subnet,address,orientation").unwrap();
        writeln!(file, "101,1,1,+Q").unwrap();
        file.flush().unwrap();

        assert!(load_force_actuator_table(file.path()).is_err());
    }

    #[test]
    fn test_hardpoint_settings_from_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "encoder_offset: [100, 200, 300, 400, 500, 600]\n\
             micrometers_per_encoder: 0.25\n\
             measured_force_fault_low: -9000.0\n\
             measured_force_fault_high: 9000.0\n\
             measured_force_warning_low: -4000.0\n\
             measured_force_warning_high: 4000.0\n\
             balance_force_warning_low: -1000.0\n\
             balance_force_warning_high: 1000.0\n\
             air_pressure_fault_low: 110.0\n\
             air_pressure_fault_high: 130.0\n\
             air_pressure_fault_low_raising: 85.0\n"
        )
        .unwrap();
        file.flush().unwrap();

        let settings = HardpointSettings::from_yaml_file(file.path()).unwrap();
        assert_eq!(settings.encoder_offset[2], 300);
        assert_eq!(settings.micrometers_per_encoder, 0.25);
    }

    #[test]
    fn test_timings_defaults() {
        let timings: IlcTimings = serde_yaml::from_str("{}").unwrap();
        assert_eq!(timings.unicast_wait_us, 500);
        assert_eq!(timings.subnet_wait_ms, 20);
    }

    #[test]
    fn test_force_settings_validate() {
        let settings = ForceActuatorSettings::uniform(
            3,
            2,
            ForceLimitRange {
                low: -1000.0,
                high: 1000.0,
            },
            200.0,
        );
        assert!(settings.validate(3, 2).is_ok());
        assert!(settings.validate(4, 2).is_err());
        assert!(settings.validate(3, 1).is_err());
    }

    #[test]
    fn test_limit_range_contains() {
        let range = ForceLimitRange {
            low: -10.0,
            high: 10.0,
        };
        assert!(range.contains(0.0));
        assert!(range.contains(-10.0));
        assert!(range.contains(10.0));
        assert!(!range.contains(10.1));
    }
}
