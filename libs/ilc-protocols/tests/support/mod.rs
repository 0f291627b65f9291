//! Simulated ILC bus backing the integration tests.
//!
//! `SimulatedIlcBus` parses command images the way the FPGA firmware does
//! (per-subnet segments, frames delimited by bus turnaround words) and
//! synthesizes deterministic responses for every mapped device. Failure
//! injection mutes individual devices or corrupts their response CRC.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use ilc_protocols::constants::*;
use ilc_protocols::error::{IlcError, Result};
use ilc_protocols::subnet::{DeviceType, SubnetAddressMap};
use ilc_protocols::transaction::FifoTransport;
use ilc_protocols::wire::{crc16, WireBuffer};

/// Deterministic response values, derived from the subnet address.
pub mod model {
    pub fn unique_id(address: u8) -> u64 {
        0x1000_0000 + u64::from(address)
    }

    pub fn primary_force(address: u8) -> f32 {
        100.0 + f32::from(address)
    }

    pub fn secondary_force(address: u8) -> f32 {
        10.0 + f32::from(address)
    }

    /// Raw encoder value on the wire; the decoder negates it.
    pub fn raw_encoder(address: u8) -> i32 {
        -(10_000 + i32::from(address))
    }

    /// Raw load cell value on the wire; the decoder negates it.
    pub fn raw_measured_force(address: u8) -> f32 {
        -(200.0 + f32::from(address))
    }

    pub fn breakaway_pressure(_address: u8) -> f32 {
        120.0
    }

    pub fn lvdt(address: u8) -> f32 {
        0.5 + f32::from(address) * 0.01
    }
}

struct Device {
    device: DeviceType,
    address: u8,
}

pub struct SimulatedIlcBus {
    devices: HashMap<u8, Vec<Device>>,
    responses: HashMap<u8, Vec<u16>>,
    broadcast_counter: u8,
    cycle: u32,
    ilc_states: HashMap<(u8, u8), u8>,
    /// Devices that never answer.
    pub muted: HashSet<(u8, u8)>,
    /// Devices whose next response frame gets a corrupted CRC.
    pub corrupt_crc: HashSet<(u8, u8)>,
}

impl SimulatedIlcBus {
    pub fn new(map: &SubnetAddressMap) -> Self {
        let mut devices: HashMap<u8, Vec<Device>> = HashMap::new();
        for subnet in 1..=SUBNET_COUNT as u8 {
            for device_type in [
                DeviceType::ForceActuator,
                DeviceType::HardpointActuator,
                DeviceType::HardpointMonitor,
            ] {
                for channel in map.channels_on(subnet, device_type) {
                    devices.entry(subnet).or_default().push(Device {
                        device: channel.device,
                        address: channel.address,
                    });
                }
            }
        }
        SimulatedIlcBus {
            devices,
            responses: HashMap::new(),
            broadcast_counter: 0,
            cycle: 0,
            ilc_states: HashMap::new(),
            muted: HashSet::new(),
            corrupt_crc: HashSet::new(),
        }
    }

    fn device_on(&self, subnet: u8, address: u8) -> Option<&Device> {
        self.devices
            .get(&subnet)?
            .iter()
            .find(|d| d.address == address)
    }

    fn subnet_for_register(register: u16) -> Option<u8> {
        SUBNET_TX_REGISTER
            .iter()
            .position(|&r| r != 0 && r == register)
            .map(|s| s as u8)
    }

    /// Splits one subnet segment into modbus frames. Frames end at the bus
    /// turnaround word following their CRC.
    fn segment_frames(words: &[u16]) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        let mut current: Vec<u8> = Vec::new();
        for &word in words {
            match word & TAG_MASK {
                tag if word == SOFTWARE_TRIGGER || word == TRIGGER_IRQ || tag == 0x3000 => {}
                tag if tag == END_OF_FRAME || tag == DELAY_TAG || tag == WAIT_FOR_RX_TAG => {
                    if !current.is_empty() {
                        frames.push(std::mem::take(&mut current));
                    }
                }
                _ => current.push(((word >> 1) & 0xFF) as u8),
            }
        }
        if !current.is_empty() {
            frames.push(current);
        }
        frames
    }

    fn handle_segment(&mut self, subnet: u8, words: &[u16]) -> Result<()> {
        let mut rx = WireBuffer::rx();
        // global timestamp words, 20 ms per cycle
        let raw = u64::from(self.cycle) * 20_000_000;
        for shift in [0, 16, 32, 48] {
            rx.push_raw(((raw >> shift) & 0xFFFF) as u16)?;
        }

        let mut answered = false;
        for frame in Self::segment_frames(words) {
            if frame.len() < 4 {
                continue;
            }
            let (data, crc_bytes) = frame.split_at(frame.len() - 2);
            let received = u16::from(crc_bytes[0]) | (u16::from(crc_bytes[1]) << 8);
            assert_eq!(crc16(data), received, "command frame carries a bad CRC");

            let address = data[0];
            let function = data[1];
            let payload = &data[2..];

            if address == BROADCAST_ADDRESS || address == MOTOR_BROADCAST_ADDRESS {
                // first payload byte of every broadcast carries the counter
                if let Some(&status) = payload.first() {
                    self.broadcast_counter = status >> 4;
                }
                continue;
            }

            let device = match self.device_on(subnet, address) {
                Some(d) if !self.muted.contains(&(subnet, address)) => d.device,
                _ => continue,
            };
            self.write_response(&mut rx, subnet, device, address, function, payload)?;
            answered = true;
        }

        if answered {
            self.responses.insert(subnet, rx.words().to_vec());
        }
        Ok(())
    }

    fn write_response(
        &mut self,
        rx: &mut WireBuffer,
        subnet: u8,
        device: DeviceType,
        address: u8,
        function: u8,
        payload: &[u8],
    ) -> Result<()> {
        let start = rx.len();
        rx.write_u8(address)?;
        rx.write_u8(function)?;
        let status = self.broadcast_counter << 4;

        match function {
            function::REPORT_SERVER_ID => {
                rx.write_u8(12)?;
                rx.write_u48(model::unique_id(address))?;
                rx.write_u8(match device {
                    DeviceType::ForceActuator => 2,
                    DeviceType::HardpointActuator => 1,
                    DeviceType::HardpointMonitor => 7,
                })?;
                rx.write_u8(1)?; // network node type
                rx.write_u8(0)?;
                rx.write_u8(0)?;
                rx.write_u8(5)?; // major revision
                rx.write_u8(2)?; // minor revision
            }
            function::REPORT_SERVER_STATUS => {
                let state = *self.ilc_states.get(&(subnet, address)).unwrap_or(&0);
                rx.write_u8(state)?;
                rx.write_u16(0)?;
                rx.write_u16(0)?;
            }
            function::CHANGE_ILC_MODE => {
                let mode = (u16::from(payload[0]) << 8) | u16::from(payload[1]);
                self.ilc_states.insert((subnet, address), mode as u8);
                rx.write_u16(mode)?;
            }
            function::STEP_MOTOR | function::ELECTROMECHANICAL_FORCE_AND_STATUS => {
                rx.write_u8(status)?;
                rx.write_i32(model::raw_encoder(address))?;
                rx.write_sgl(model::raw_measured_force(address))?;
            }
            function::SET_BOOST_VALVE_DCA_GAINS
            | function::SET_ADC_CHANNEL_OFFSET_AND_SENSITIVITY
            | function::RESET => {}
            function::READ_BOOST_VALVE_DCA_GAINS => {
                rx.write_sgl(1.5)?;
                rx.write_sgl(-1.5)?;
            }
            function::FORCE_DEMAND | function::PNEUMATIC_FORCE_AND_STATUS => {
                rx.write_u8(status)?;
                rx.write_sgl(model::primary_force(address))?;
                if address > FA_SAA_ADDRESS_MAX {
                    rx.write_sgl(model::secondary_force(address))?;
                }
            }
            function::SET_ADC_SCAN_RATE => {
                rx.write_u8(payload[0])?;
            }
            function::READ_CALIBRATION => {
                for slot in 0..24 {
                    rx.write_sgl(f32::from(address) + slot as f32 * 0.5)?;
                }
            }
            function::READ_DCA_PRESSURE_VALUES => {
                rx.write_sgl(118.0)?;
                rx.write_sgl(119.0)?;
                rx.write_sgl(121.0)?;
                rx.write_sgl(model::breakaway_pressure(address))?;
            }
            function::REPORT_DCA_ID => {
                rx.write_u48(model::unique_id(address) + 0x100)?;
                rx.write_u8(3)?;
                rx.write_u8(1)?;
                rx.write_u8(0)?;
            }
            function::REPORT_DCA_STATUS => {
                rx.write_u16(0)?;
            }
            function::REPORT_LVDT => {
                rx.write_sgl(model::lvdt(address))?;
                rx.write_sgl(model::lvdt(address) * 2.0)?;
            }
            _ => panic!("simulated bus has no model for function {function}"),
        }

        rx.write_crc(rx.len() - start)?;
        if self.corrupt_crc.remove(&(subnet, address)) {
            let word = rx.words()[start + 2];
            rx.set_word(start + 2, word ^ 0x0002);
        }
        rx.write_rx_timestamp(u32::from(self.cycle) * 20_000_000 + 1000)?;
        rx.write_end_of_frame()?;
        Ok(())
    }
}

impl FifoTransport for SimulatedIlcBus {
    fn write_command(&mut self, words: &[u16]) -> Result<()> {
        self.cycle += 1;
        self.responses.clear();
        let mut i = 0;
        while i < words.len() {
            let subnet = Self::subnet_for_register(words[i]).ok_or_else(|| {
                IlcError::protocol(format!("unknown command register {:#06x}", words[i]))
            })?;
            let length = words[i + 1] as usize;
            self.handle_segment(subnet, &words[i + 2..i + 2 + length])?;
            i += 2 + length;
        }
        Ok(())
    }

    fn wait_for_subnet(&mut self, subnet: u8, _timeout: Duration) -> Result<()> {
        if self.responses.contains_key(&subnet) {
            Ok(())
        } else {
            Err(IlcError::timeout(format!(
                "no response pending on subnet {subnet}"
            )))
        }
    }

    fn read_response(&mut self, subnet: u8, _timeout: Duration) -> Result<Vec<u16>> {
        self.responses
            .remove(&subnet)
            .ok_or_else(|| IlcError::timeout(format!("subnet {subnet} FIFO empty")))
    }
}
