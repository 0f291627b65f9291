//! Telemetry state stores.
//!
//! The decoder owns one arena per record family, indexed by the channel's
//! data index (plus secondary/x/y indices for dual-axis cylinder data).
//! Consumers read the arenas between cycles; discrete warnings are pushed
//! through [`EventSink`] as they are classified.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::subnet::{Orientation, SubnetAddressMap};

/// Discrete problem classification for one received (or missing) frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    ResponseTimeout,
    InvalidCrc,
    IllegalFunction,
    IllegalDataValue,
    InvalidLength,
    UnknownSubnet,
    UnknownAddress,
    UnknownFunction,
    UnknownProblem,
}

/// One warning event. `actuator_id` is -1 when the frame could not be
/// attributed to a device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IlcWarning {
    pub timestamp: f64,
    pub actuator_id: i32,
    pub kind: WarningKind,
}

/// Receives classified events from the decoder.
pub trait EventSink {
    fn ilc_warning(&mut self, warning: &IlcWarning);
    fn force_actuator_force_warning(&mut self, warning: &ForceActuatorForceWarning);
}

/// Sink that drops everything. Engineering utilities and tests.
#[derive(Debug, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn ilc_warning(&mut self, _warning: &IlcWarning) {}
    fn force_actuator_force_warning(&mut self, _warning: &ForceActuatorForceWarning) {}
}

// ----------------------------------------------------------------------
// Force actuators
// ----------------------------------------------------------------------

/// Static identity and calibration, filled by server ID, calibration and
/// mezzanine ID reports.
#[derive(Debug, Clone)]
pub struct ForceActuatorInfo {
    pub reference_id: [i32; FA_COUNT],
    pub orientation: [Orientation; FA_COUNT],
    pub ilc_unique_id: [u64; FA_COUNT],
    pub ilc_application_type: [u8; FA_COUNT],
    pub network_node_type: [u8; FA_COUNT],
    pub ilc_selected_options: [u8; FA_COUNT],
    pub network_node_options: [u8; FA_COUNT],
    pub major_revision: [u8; FA_COUNT],
    pub minor_revision: [u8; FA_COUNT],
    pub adc_scan_rate: [u8; FA_COUNT],
    pub mezzanine_unique_id: [u64; FA_COUNT],
    pub mezzanine_firmware_type: [u8; FA_COUNT],
    pub mezzanine_major_revision: [u8; FA_COUNT],
    pub mezzanine_minor_revision: [u8; FA_COUNT],
    pub mezzanine_primary_cylinder_gain: [f32; FA_COUNT],
    pub mezzanine_secondary_cylinder_gain: [f32; FA_COUNT],
    pub main_primary_cylinder_coefficient: [f32; FA_COUNT],
    pub main_secondary_cylinder_coefficient: [f32; FA_COUNT],
    pub main_primary_cylinder_load_cell_offset: [f32; FA_COUNT],
    pub main_secondary_cylinder_load_cell_offset: [f32; FA_COUNT],
    pub main_primary_cylinder_load_cell_sensitivity: [f32; FA_COUNT],
    pub main_secondary_cylinder_load_cell_sensitivity: [f32; FA_COUNT],
    pub backup_primary_cylinder_coefficient: [f32; FA_COUNT],
    pub backup_secondary_cylinder_coefficient: [f32; FA_COUNT],
    pub backup_primary_cylinder_load_cell_offset: [f32; FA_COUNT],
    pub backup_secondary_cylinder_load_cell_offset: [f32; FA_COUNT],
    pub backup_primary_cylinder_load_cell_sensitivity: [f32; FA_COUNT],
    pub backup_secondary_cylinder_load_cell_sensitivity: [f32; FA_COUNT],
}

impl ForceActuatorInfo {
    fn new() -> Self {
        ForceActuatorInfo {
            reference_id: [-1; FA_COUNT],
            orientation: [Orientation::None; FA_COUNT],
            ilc_unique_id: [0; FA_COUNT],
            ilc_application_type: [0; FA_COUNT],
            network_node_type: [0; FA_COUNT],
            ilc_selected_options: [0; FA_COUNT],
            network_node_options: [0; FA_COUNT],
            major_revision: [0; FA_COUNT],
            minor_revision: [0; FA_COUNT],
            adc_scan_rate: [0; FA_COUNT],
            mezzanine_unique_id: [0; FA_COUNT],
            mezzanine_firmware_type: [0; FA_COUNT],
            mezzanine_major_revision: [0; FA_COUNT],
            mezzanine_minor_revision: [0; FA_COUNT],
            mezzanine_primary_cylinder_gain: [0.0; FA_COUNT],
            mezzanine_secondary_cylinder_gain: [0.0; FA_COUNT],
            main_primary_cylinder_coefficient: [0.0; FA_COUNT],
            main_secondary_cylinder_coefficient: [0.0; FA_COUNT],
            main_primary_cylinder_load_cell_offset: [0.0; FA_COUNT],
            main_secondary_cylinder_load_cell_offset: [0.0; FA_COUNT],
            main_primary_cylinder_load_cell_sensitivity: [0.0; FA_COUNT],
            main_secondary_cylinder_load_cell_sensitivity: [0.0; FA_COUNT],
            backup_primary_cylinder_coefficient: [0.0; FA_COUNT],
            backup_secondary_cylinder_coefficient: [0.0; FA_COUNT],
            backup_primary_cylinder_load_cell_offset: [0.0; FA_COUNT],
            backup_secondary_cylinder_load_cell_offset: [0.0; FA_COUNT],
            backup_primary_cylinder_load_cell_sensitivity: [0.0; FA_COUNT],
            backup_secondary_cylinder_load_cell_sensitivity: [0.0; FA_COUNT],
        }
    }
}

/// ILC mode of each force actuator (server status reports).
#[derive(Debug, Clone)]
pub struct ForceActuatorState {
    pub timestamp: f64,
    pub ilc_state: [u8; FA_COUNT],
}

/// Measured cylinder and mirror-space forces.
#[derive(Debug, Clone)]
pub struct ForceActuatorData {
    pub timestamp: f64,
    pub primary_cylinder_force: [f32; FA_COUNT],
    pub secondary_cylinder_force: [f32; FA_SECONDARY_COUNT],
    pub z_force: [f32; FA_COUNT],
    pub x_force: [f32; FA_X_COUNT],
    pub y_force: [f32; FA_Y_COUNT],
}

/// Force actuator status and fault bits.
#[derive(Debug, Clone)]
pub struct ForceActuatorWarning {
    pub timestamp: f64,
    // status byte of force/status responses
    pub ilc_fault: [bool; FA_COUNT],
    pub mezzanine_error: [bool; FA_COUNT],
    pub broadcast_counter_mismatch: [bool; FA_COUNT],
    // server status word
    pub major_fault: [bool; FA_COUNT],
    pub minor_fault: [bool; FA_COUNT],
    pub fault_override: [bool; FA_COUNT],
    pub main_calibration_error: [bool; FA_COUNT],
    pub backup_calibration_error: [bool; FA_COUNT],
    pub mezzanine_fault: [bool; FA_COUNT],
    pub mezzanine_firmware_update: [bool; FA_COUNT],
    // server fault word
    pub unique_id_crc_error: [bool; FA_COUNT],
    pub application_type_mismatch: [bool; FA_COUNT],
    pub application_missing: [bool; FA_COUNT],
    pub application_crc_mismatch: [bool; FA_COUNT],
    pub one_wire_missing: [bool; FA_COUNT],
    pub one_wire1_mismatch: [bool; FA_COUNT],
    pub one_wire2_mismatch: [bool; FA_COUNT],
    pub watchdog_reset: [bool; FA_COUNT],
    pub brownout: [bool; FA_COUNT],
    pub event_trap_reset: [bool; FA_COUNT],
    pub ssr_power_fault: [bool; FA_COUNT],
    pub aux_power_fault: [bool; FA_COUNT],
    // mezzanine status report (raw word kept alongside the decoded bits)
    pub mezzanine_status_word: [u16; FA_COUNT],
    pub mezzanine_unique_id_crc_error: [bool; FA_COUNT],
    pub mezzanine_event_trap_reset: [bool; FA_COUNT],
    pub mezzanine_application_missing: [bool; FA_COUNT],
    pub mezzanine_application_crc_mismatch: [bool; FA_COUNT],
    pub mezzanine_bootloader_active: [bool; FA_COUNT],
}

impl ForceActuatorWarning {
    fn new() -> Self {
        ForceActuatorWarning {
            timestamp: 0.0,
            ilc_fault: [false; FA_COUNT],
            mezzanine_error: [false; FA_COUNT],
            broadcast_counter_mismatch: [false; FA_COUNT],
            major_fault: [false; FA_COUNT],
            minor_fault: [false; FA_COUNT],
            fault_override: [false; FA_COUNT],
            main_calibration_error: [false; FA_COUNT],
            backup_calibration_error: [false; FA_COUNT],
            mezzanine_fault: [false; FA_COUNT],
            mezzanine_firmware_update: [false; FA_COUNT],
            unique_id_crc_error: [false; FA_COUNT],
            application_type_mismatch: [false; FA_COUNT],
            application_missing: [false; FA_COUNT],
            application_crc_mismatch: [false; FA_COUNT],
            one_wire_missing: [false; FA_COUNT],
            one_wire1_mismatch: [false; FA_COUNT],
            one_wire2_mismatch: [false; FA_COUNT],
            watchdog_reset: [false; FA_COUNT],
            brownout: [false; FA_COUNT],
            event_trap_reset: [false; FA_COUNT],
            ssr_power_fault: [false; FA_COUNT],
            aux_power_fault: [false; FA_COUNT],
            mezzanine_status_word: [0; FA_COUNT],
            mezzanine_unique_id_crc_error: [false; FA_COUNT],
            mezzanine_event_trap_reset: [false; FA_COUNT],
            mezzanine_application_missing: [false; FA_COUNT],
            mezzanine_application_crc_mismatch: [false; FA_COUNT],
            mezzanine_bootloader_active: [false; FA_COUNT],
        }
    }
}

/// Measured-force and following-error limit violations.
#[derive(Debug, Clone)]
pub struct ForceActuatorForceWarning {
    pub timestamp: f64,
    pub any_warning: bool,
    pub any_primary_measured_force_warning: bool,
    pub any_secondary_measured_force_warning: bool,
    pub any_primary_following_error_warning: bool,
    pub any_secondary_following_error_warning: bool,
    pub primary_measured_force_warning: [bool; FA_COUNT],
    pub secondary_measured_force_warning: [bool; FA_COUNT],
    pub primary_following_error_warning: [bool; FA_COUNT],
    pub secondary_following_error_warning: [bool; FA_COUNT],
}

impl ForceActuatorForceWarning {
    fn new() -> Self {
        ForceActuatorForceWarning {
            timestamp: 0.0,
            any_warning: false,
            any_primary_measured_force_warning: false,
            any_secondary_measured_force_warning: false,
            any_primary_following_error_warning: false,
            any_secondary_following_error_warning: false,
            primary_measured_force_warning: [false; FA_COUNT],
            secondary_measured_force_warning: [false; FA_COUNT],
            primary_following_error_warning: [false; FA_COUNT],
            secondary_following_error_warning: [false; FA_COUNT],
        }
    }

    /// Recomputes the aggregate flags from the per-channel arrays.
    pub fn aggregate(&mut self) {
        self.any_primary_measured_force_warning =
            self.primary_measured_force_warning.iter().any(|w| *w);
        self.any_secondary_measured_force_warning =
            self.secondary_measured_force_warning.iter().any(|w| *w);
        self.any_primary_following_error_warning =
            self.primary_following_error_warning.iter().any(|w| *w);
        self.any_secondary_following_error_warning =
            self.secondary_following_error_warning.iter().any(|w| *w);
        self.any_warning = self.any_primary_measured_force_warning
            || self.any_secondary_measured_force_warning
            || self.any_primary_following_error_warning
            || self.any_secondary_following_error_warning;
    }
}

/// Commanded cylinder forces in millinewtons, written by the force
/// controller before the raised bus list is built. The decoder compares
/// measured forces against these.
#[derive(Debug, Clone)]
pub struct AppliedCylinderForces {
    pub timestamp: f64,
    pub primary_cylinder_force: [i32; FA_COUNT],
    pub secondary_cylinder_force: [i32; FA_SECONDARY_COUNT],
}

impl Default for AppliedCylinderForces {
    fn default() -> Self {
        AppliedCylinderForces {
            timestamp: 0.0,
            primary_cylinder_force: [0; FA_COUNT],
            secondary_cylinder_force: [0; FA_SECONDARY_COUNT],
        }
    }
}

// ----------------------------------------------------------------------
// Hardpoint actuators
// ----------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HardpointActuatorInfo {
    pub reference_id: [i32; HP_COUNT],
    pub ilc_unique_id: [u64; HP_COUNT],
    pub ilc_application_type: [u8; HP_COUNT],
    pub network_node_type: [u8; HP_COUNT],
    pub ilc_selected_options: [u8; HP_COUNT],
    pub network_node_options: [u8; HP_COUNT],
    pub major_revision: [u8; HP_COUNT],
    pub minor_revision: [u8; HP_COUNT],
    pub adc_scan_rate: [u8; HP_COUNT],
    pub main_load_cell_coefficient: [f32; HP_COUNT],
    pub main_load_cell_offset: [f32; HP_COUNT],
    pub main_load_cell_sensitivity: [f32; HP_COUNT],
    pub backup_load_cell_coefficient: [f32; HP_COUNT],
    pub backup_load_cell_offset: [f32; HP_COUNT],
    pub backup_load_cell_sensitivity: [f32; HP_COUNT],
}

impl HardpointActuatorInfo {
    fn new() -> Self {
        HardpointActuatorInfo {
            reference_id: [-1; HP_COUNT],
            ilc_unique_id: [0; HP_COUNT],
            ilc_application_type: [0; HP_COUNT],
            network_node_type: [0; HP_COUNT],
            ilc_selected_options: [0; HP_COUNT],
            network_node_options: [0; HP_COUNT],
            major_revision: [0; HP_COUNT],
            minor_revision: [0; HP_COUNT],
            adc_scan_rate: [0; HP_COUNT],
            main_load_cell_coefficient: [0.0; HP_COUNT],
            main_load_cell_offset: [0.0; HP_COUNT],
            main_load_cell_sensitivity: [0.0; HP_COUNT],
            backup_load_cell_coefficient: [0.0; HP_COUNT],
            backup_load_cell_offset: [0.0; HP_COUNT],
            backup_load_cell_sensitivity: [0.0; HP_COUNT],
        }
    }
}

#[derive(Debug, Clone)]
pub struct HardpointActuatorState {
    pub timestamp: f64,
    pub ilc_state: [u8; HP_COUNT],
}

#[derive(Debug, Clone)]
pub struct HardpointActuatorData {
    pub timestamp: f64,
    pub encoder: [i32; HP_COUNT],
    pub measured_force: [f32; HP_COUNT],
    /// Derived from the encoder via offset and scale, meters
    pub displacement: [f32; HP_COUNT],
}

#[derive(Debug, Clone)]
pub struct HardpointActuatorWarning {
    pub timestamp: f64,
    pub ilc_fault: [bool; HP_COUNT],
    pub limit_switch1_operated: [bool; HP_COUNT],
    pub limit_switch2_operated: [bool; HP_COUNT],
    pub broadcast_counter_mismatch: [bool; HP_COUNT],
    pub major_fault: [bool; HP_COUNT],
    pub minor_fault: [bool; HP_COUNT],
    pub fault_override: [bool; HP_COUNT],
    pub main_calibration_error: [bool; HP_COUNT],
    pub backup_calibration_error: [bool; HP_COUNT],
    pub unique_id_crc_error: [bool; HP_COUNT],
    pub application_type_mismatch: [bool; HP_COUNT],
    pub application_missing: [bool; HP_COUNT],
    pub application_crc_mismatch: [bool; HP_COUNT],
    pub one_wire_missing: [bool; HP_COUNT],
    pub one_wire1_mismatch: [bool; HP_COUNT],
    pub one_wire2_mismatch: [bool; HP_COUNT],
    pub watchdog_reset: [bool; HP_COUNT],
    pub brownout: [bool; HP_COUNT],
    pub event_trap_reset: [bool; HP_COUNT],
    pub motor_driver_fault: [bool; HP_COUNT],
    pub ssr_power_fault: [bool; HP_COUNT],
    pub aux_power_fault: [bool; HP_COUNT],
    pub smc_power_fault: [bool; HP_COUNT],
}

impl HardpointActuatorWarning {
    fn new() -> Self {
        HardpointActuatorWarning {
            timestamp: 0.0,
            ilc_fault: [false; HP_COUNT],
            limit_switch1_operated: [false; HP_COUNT],
            limit_switch2_operated: [false; HP_COUNT],
            broadcast_counter_mismatch: [false; HP_COUNT],
            major_fault: [false; HP_COUNT],
            minor_fault: [false; HP_COUNT],
            fault_override: [false; HP_COUNT],
            main_calibration_error: [false; HP_COUNT],
            backup_calibration_error: [false; HP_COUNT],
            unique_id_crc_error: [false; HP_COUNT],
            application_type_mismatch: [false; HP_COUNT],
            application_missing: [false; HP_COUNT],
            application_crc_mismatch: [false; HP_COUNT],
            one_wire_missing: [false; HP_COUNT],
            one_wire1_mismatch: [false; HP_COUNT],
            one_wire2_mismatch: [false; HP_COUNT],
            watchdog_reset: [false; HP_COUNT],
            brownout: [false; HP_COUNT],
            event_trap_reset: [false; HP_COUNT],
            motor_driver_fault: [false; HP_COUNT],
            ssr_power_fault: [false; HP_COUNT],
            aux_power_fault: [false; HP_COUNT],
            smc_power_fault: [false; HP_COUNT],
        }
    }
}

// ----------------------------------------------------------------------
// Hardpoint monitors
// ----------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HardpointMonitorInfo {
    pub reference_id: [i32; HM_COUNT],
    pub ilc_unique_id: [u64; HM_COUNT],
    pub ilc_application_type: [u8; HM_COUNT],
    pub network_node_type: [u8; HM_COUNT],
    pub major_revision: [u8; HM_COUNT],
    pub minor_revision: [u8; HM_COUNT],
    pub mezzanine_unique_id: [u64; HM_COUNT],
    pub mezzanine_firmware_type: [u8; HM_COUNT],
    pub mezzanine_major_revision: [u8; HM_COUNT],
    pub mezzanine_minor_revision: [u8; HM_COUNT],
}

impl HardpointMonitorInfo {
    fn new() -> Self {
        HardpointMonitorInfo {
            reference_id: [-1; HM_COUNT],
            ilc_unique_id: [0; HM_COUNT],
            ilc_application_type: [0; HM_COUNT],
            network_node_type: [0; HM_COUNT],
            major_revision: [0; HM_COUNT],
            minor_revision: [0; HM_COUNT],
            mezzanine_unique_id: [0; HM_COUNT],
            mezzanine_firmware_type: [0; HM_COUNT],
            mezzanine_major_revision: [0; HM_COUNT],
            mezzanine_minor_revision: [0; HM_COUNT],
        }
    }
}

#[derive(Debug, Clone)]
pub struct HardpointMonitorState {
    pub timestamp: f64,
    pub ilc_state: [u8; HM_COUNT],
}

#[derive(Debug, Clone)]
pub struct HardpointMonitorData {
    pub timestamp: f64,
    pub pressure_sensor1: [f32; HM_COUNT],
    pub pressure_sensor2: [f32; HM_COUNT],
    pub pressure_sensor3: [f32; HM_COUNT],
    pub breakaway_pressure: [f32; HM_COUNT],
    pub breakaway_lvdt: [f32; HM_COUNT],
    pub displacement_lvdt: [f32; HM_COUNT],
}

#[derive(Debug, Clone)]
pub struct HardpointMonitorWarning {
    pub timestamp: f64,
    pub major_fault: [bool; HM_COUNT],
    pub minor_fault: [bool; HM_COUNT],
    pub fault_override: [bool; HM_COUNT],
    pub unique_id_crc_error: [bool; HM_COUNT],
    pub application_type_mismatch: [bool; HM_COUNT],
    pub application_missing: [bool; HM_COUNT],
    pub application_crc_mismatch: [bool; HM_COUNT],
    pub one_wire_missing: [bool; HM_COUNT],
    pub one_wire1_mismatch: [bool; HM_COUNT],
    pub one_wire2_mismatch: [bool; HM_COUNT],
    pub watchdog_reset: [bool; HM_COUNT],
    pub brownout: [bool; HM_COUNT],
    pub event_trap_reset: [bool; HM_COUNT],
    pub ssr_power_fault: [bool; HM_COUNT],
    pub aux_power_fault: [bool; HM_COUNT],
    pub mezzanine_s1a_interface1_fault: [bool; HM_COUNT],
    pub mezzanine_s1a_lvdt1_fault: [bool; HM_COUNT],
    pub mezzanine_s1a_interface2_fault: [bool; HM_COUNT],
    pub mezzanine_s1a_lvdt2_fault: [bool; HM_COUNT],
    pub mezzanine_unique_id_crc_error: [bool; HM_COUNT],
    pub mezzanine_event_trap_reset: [bool; HM_COUNT],
    pub mezzanine_rs422_chip_fault: [bool; HM_COUNT],
    pub mezzanine_application_missing: [bool; HM_COUNT],
    pub mezzanine_application_crc_mismatch: [bool; HM_COUNT],
    pub mezzanine_bootloader_active: [bool; HM_COUNT],
}

impl HardpointMonitorWarning {
    fn new() -> Self {
        HardpointMonitorWarning {
            timestamp: 0.0,
            major_fault: [false; HM_COUNT],
            minor_fault: [false; HM_COUNT],
            fault_override: [false; HM_COUNT],
            unique_id_crc_error: [false; HM_COUNT],
            application_type_mismatch: [false; HM_COUNT],
            application_missing: [false; HM_COUNT],
            application_crc_mismatch: [false; HM_COUNT],
            one_wire_missing: [false; HM_COUNT],
            one_wire1_mismatch: [false; HM_COUNT],
            one_wire2_mismatch: [false; HM_COUNT],
            watchdog_reset: [false; HM_COUNT],
            brownout: [false; HM_COUNT],
            event_trap_reset: [false; HM_COUNT],
            ssr_power_fault: [false; HM_COUNT],
            aux_power_fault: [false; HM_COUNT],
            mezzanine_s1a_interface1_fault: [false; HM_COUNT],
            mezzanine_s1a_lvdt1_fault: [false; HM_COUNT],
            mezzanine_s1a_interface2_fault: [false; HM_COUNT],
            mezzanine_s1a_lvdt2_fault: [false; HM_COUNT],
            mezzanine_unique_id_crc_error: [false; HM_COUNT],
            mezzanine_event_trap_reset: [false; HM_COUNT],
            mezzanine_rs422_chip_fault: [false; HM_COUNT],
            mezzanine_application_missing: [false; HM_COUNT],
            mezzanine_application_crc_mismatch: [false; HM_COUNT],
            mezzanine_bootloader_active: [false; HM_COUNT],
        }
    }
}

// ----------------------------------------------------------------------
// Aggregate store
// ----------------------------------------------------------------------

/// Every telemetry arena, boxed as one store.
#[derive(Debug, Clone)]
pub struct TelemetryStore {
    pub fa_info: ForceActuatorInfo,
    pub fa_state: ForceActuatorState,
    pub fa_data: ForceActuatorData,
    pub fa_warning: ForceActuatorWarning,
    pub force_warning: ForceActuatorForceWarning,
    pub applied_cylinder_forces: AppliedCylinderForces,
    pub hp_info: HardpointActuatorInfo,
    pub hp_state: HardpointActuatorState,
    pub hp_data: HardpointActuatorData,
    pub hp_warning: HardpointActuatorWarning,
    pub hm_info: HardpointMonitorInfo,
    pub hm_state: HardpointMonitorState,
    pub hm_data: HardpointMonitorData,
    pub hm_warning: HardpointMonitorWarning,
}

impl TelemetryStore {
    /// Creates an empty store with reference ids and orientations seeded
    /// from the address map.
    pub fn new(map: &SubnetAddressMap) -> Self {
        let mut store = TelemetryStore {
            fa_info: ForceActuatorInfo::new(),
            fa_state: ForceActuatorState {
                timestamp: 0.0,
                ilc_state: [0; FA_COUNT],
            },
            fa_data: ForceActuatorData {
                timestamp: 0.0,
                primary_cylinder_force: [0.0; FA_COUNT],
                secondary_cylinder_force: [0.0; FA_SECONDARY_COUNT],
                z_force: [0.0; FA_COUNT],
                x_force: [0.0; FA_X_COUNT],
                y_force: [0.0; FA_Y_COUNT],
            },
            fa_warning: ForceActuatorWarning::new(),
            force_warning: ForceActuatorForceWarning::new(),
            applied_cylinder_forces: AppliedCylinderForces {
                timestamp: 0.0,
                primary_cylinder_force: [0; FA_COUNT],
                secondary_cylinder_force: [0; FA_SECONDARY_COUNT],
            },
            hp_info: HardpointActuatorInfo::new(),
            hp_state: HardpointActuatorState {
                timestamp: 0.0,
                ilc_state: [0; HP_COUNT],
            },
            hp_data: HardpointActuatorData {
                timestamp: 0.0,
                encoder: [0; HP_COUNT],
                measured_force: [0.0; HP_COUNT],
                displacement: [0.0; HP_COUNT],
            },
            hp_warning: HardpointActuatorWarning::new(),
            hm_info: HardpointMonitorInfo::new(),
            hm_state: HardpointMonitorState {
                timestamp: 0.0,
                ilc_state: [0; HM_COUNT],
            },
            hm_data: HardpointMonitorData {
                timestamp: 0.0,
                pressure_sensor1: [0.0; HM_COUNT],
                pressure_sensor2: [0.0; HM_COUNT],
                pressure_sensor3: [0.0; HM_COUNT],
                breakaway_pressure: [0.0; HM_COUNT],
                breakaway_lvdt: [0.0; HM_COUNT],
                displacement_lvdt: [0.0; HM_COUNT],
            },
            hm_warning: HardpointMonitorWarning::new(),
        };

        for (i, id) in map.force_actuator_ids().iter().enumerate() {
            store.fa_info.reference_id[i] = *id;
        }
        for subnet in 1..=4u8 {
            for channel in map.channels_on(subnet, crate::subnet::DeviceType::ForceActuator) {
                store.fa_info.orientation[channel.data_index] = channel.orientation;
            }
        }
        for (i, id) in map.hardpoint_ids().iter().enumerate() {
            store.hp_info.reference_id[i] = *id;
        }
        for (i, id) in map.hardpoint_monitor_ids().iter().enumerate() {
            store.hm_info.reference_id[i] = *id;
        }
        store
    }
}
