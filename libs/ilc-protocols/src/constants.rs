//! Protocol constants for the ILC communication stack.
//!
//! Wire tags and control words match the FPGA FIFO encoding; function codes
//! and exception sets match the inner loop controller firmware interface.

// ============================================================================
// Wire word tags (upper nibble of each 16-bit FIFO word)
// ============================================================================

/// Mask selecting the tag nibble of a wire word
pub const TAG_MASK: u16 = 0xF000;

/// Tag carried by data bytes read back from a subnet (`(byte << 1) | 0x9000`)
pub const RX_DATA_TAG: u16 = 0x9000;

/// Tag carried by data bytes written toward a subnet (`(byte << 1) | 0x1200`)
pub const TX_DATA_TAG: u16 = 0x1200;

/// Tag carried by frame timestamp bytes (`0xB000 | byte`)
pub const TIMESTAMP_TAG: u16 = 0xB000;

/// End-of-frame marker word
pub const END_OF_FRAME: u16 = 0xA000;

/// Number of timestamp words terminating each response frame
pub const FRAME_TIMESTAMP_WORDS: usize = 4;

// ============================================================================
// Transmit control words (command FIFO only)
// ============================================================================

/// Raises the modbus transceiver trigger line
pub const SOFTWARE_TRIGGER: u16 = 0x8000;

/// Raises the subnet interrupt after the last frame is clocked out
pub const TRIGGER_IRQ: u16 = 0x7000;

/// Delay tag; low 12 bits hold microseconds (`0x4000 | us`)
pub const DELAY_TAG: u16 = 0x4000;

/// Wait-for-receive tag; low 12 bits hold the timeout in microseconds
pub const WAIT_FOR_RX_TAG: u16 = 0x6000;

/// Requests the FPGA append its timestamp to the response stream
pub const TIMESTAMP_REQUEST: u16 = 0x3000;

/// Widest value representable in the low 12 bits of a control word
pub const CONTROL_WORD_MAX_US: u16 = 0x0FFF;

// ============================================================================
// FPGA register map
// ============================================================================

/// Command FIFO target registers for subnets 1..=5 (index 0 unused)
pub const SUBNET_TX_REGISTER: [u16; 6] = [0, 9, 10, 11, 12, 13];

/// Response FIFO source registers for subnets 1..=5 (index 0 unused)
pub const SUBNET_RX_REGISTER: [u16; 6] = [0, 14, 15, 16, 17, 18];

/// Number of ILC subnets
pub const SUBNET_COUNT: usize = 5;

/// Words in a wire buffer (matches the FPGA FIFO depth)
pub const WIRE_BUFFER_SIZE: usize = 5120;

// ============================================================================
// Device addressing
// ============================================================================

/// Broadcast address accepted by every ILC
pub const BROADCAST_ADDRESS: u8 = 248;

/// Broadcast address accepted by motor-driving ILCs only
pub const MOTOR_BROADCAST_ADDRESS: u8 = 249;

/// Highest single-axis force actuator address (1..=16 on subnets 1-4)
pub const FA_SAA_ADDRESS_MAX: u8 = 16;

/// Highest dual-axis force actuator address (17..=46 on subnets 1-4)
pub const FA_DAA_ADDRESS_MAX: u8 = 46;

/// Hardpoint monitor addresses on subnet 5 (84..=89)
pub const HM_ADDRESS_MIN: u8 = 84;

// ============================================================================
// Channel counts
// ============================================================================

/// Force actuators across subnets 1-4
pub const FA_COUNT: usize = 156;

/// Force actuators with a secondary (lateral) cylinder
pub const FA_SECONDARY_COUNT: usize = 112;

/// Dual-axis actuators oriented along X
pub const FA_X_COUNT: usize = 12;

/// Dual-axis actuators oriented along Y
pub const FA_Y_COUNT: usize = 100;

/// Hardpoint actuators on subnet 5
pub const HP_COUNT: usize = 6;

/// Hardpoint monitors on subnet 5
pub const HM_COUNT: usize = 6;

// ============================================================================
// Function codes
// ============================================================================

pub mod function {
    pub const REPORT_SERVER_ID: u8 = 17;
    pub const REPORT_SERVER_STATUS: u8 = 18;
    pub const CHANGE_ILC_MODE: u8 = 65;
    pub const STEP_MOTOR: u8 = 66;
    pub const ELECTROMECHANICAL_FORCE_AND_STATUS: u8 = 67;
    pub const FREEZE_SENSOR_VALUES: u8 = 68;
    pub const SET_BOOST_VALVE_DCA_GAINS: u8 = 73;
    pub const READ_BOOST_VALVE_DCA_GAINS: u8 = 74;
    pub const FORCE_DEMAND: u8 = 75;
    pub const PNEUMATIC_FORCE_AND_STATUS: u8 = 76;
    pub const SET_ADC_SCAN_RATE: u8 = 80;
    pub const SET_ADC_CHANNEL_OFFSET_AND_SENSITIVITY: u8 = 81;
    pub const RESET: u8 = 107;
    pub const READ_CALIBRATION: u8 = 110;
    pub const READ_DCA_PRESSURE_VALUES: u8 = 119;
    pub const REPORT_DCA_ID: u8 = 120;
    pub const REPORT_DCA_STATUS: u8 = 121;
    pub const REPORT_LVDT: u8 = 122;
}

/// Exception responses arrive as `function | 0x80`
pub const EXCEPTION_FLAG: u8 = 0x80;

// ============================================================================
// Exception function sets (function | 0x80 per supported code)
// ============================================================================

/// Exception codes a force actuator can return
pub const FA_EXCEPTION_FUNCTIONS: &[u8] = &[
    145, 146, 193, 201, 202, 203, 204, 208, 209, 235, 238, 247, 248, 249,
];

/// Exception codes a hardpoint actuator can return
pub const HP_EXCEPTION_FUNCTIONS: &[u8] = &[145, 146, 193, 194, 195, 208, 209, 235, 238];

/// Exception codes a hardpoint monitor can return
pub const HM_EXCEPTION_FUNCTIONS: &[u8] = &[145, 146, 193, 235, 247, 248, 249, 250];

// ============================================================================
// ILC modes (function 65 payload)
// ============================================================================

pub mod ilc_mode {
    pub const STANDBY: u16 = 0;
    pub const DISABLED: u16 = 1;
    pub const ENABLED: u16 = 2;
    pub const FIRMWARE_UPDATE: u16 = 3;
    pub const FAULT: u16 = 4;
    pub const CLEAR_FAULTS: u16 = 5;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_counts_consistent() {
        assert_eq!(FA_X_COUNT + FA_Y_COUNT, FA_SECONDARY_COUNT);
        assert!(FA_SECONDARY_COUNT < FA_COUNT);
    }

    #[test]
    fn test_exception_sets_flagged() {
        for set in [
            FA_EXCEPTION_FUNCTIONS,
            HP_EXCEPTION_FUNCTIONS,
            HM_EXCEPTION_FUNCTIONS,
        ] {
            for code in set {
                assert!(code & EXCEPTION_FLAG != 0);
            }
        }
    }
}
