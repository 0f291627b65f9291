//! Bus list construction.
//!
//! A bus list is one complete command image for the FPGA command FIFO:
//! for each subnet it touches, a target register word, a length word and
//! the frames to clock out, ending in an interrupt trigger. Alongside the
//! words it carries the roster of responses the frames will solicit, which
//! the decoder uses for timeout accounting.

use crate::constants::*;
use crate::error::{IlcError, Result};
use crate::requests::{RequestEncoder, BROADCAST_DAA_SETPOINTS, BROADCAST_SAA_SETPOINTS};
use crate::subnet::{DeviceType, SubnetAddressMap};
use crate::telemetry::AppliedCylinderForces;
use crate::wire::WireBuffer;

/// A built command image plus its response roster.
pub struct BusList {
    buffer: WireBuffer,
    expected: Vec<(DeviceType, usize)>,
    subnets: Vec<u8>,
}

impl BusList {
    /// Command FIFO words, all subnet segments concatenated.
    pub fn words(&self) -> &[u16] {
        self.buffer.words()
    }

    /// Responses the frames in this list solicit.
    pub fn expected_responses(&self) -> &[(DeviceType, usize)] {
        &self.expected
    }

    /// Subnets with a segment in this list, in segment order.
    pub fn subnets(&self) -> &[u8] {
        &self.subnets
    }
}

/// Assembles one bus list segment by segment.
pub struct BusListBuilder {
    encoder: RequestEncoder,
    buffer: WireBuffer,
    expected: Vec<(DeviceType, usize)>,
    subnets: Vec<u8>,
    length_index: Option<usize>,
}

impl BusListBuilder {
    pub fn new(encoder: RequestEncoder) -> Self {
        BusListBuilder {
            encoder,
            buffer: WireBuffer::tx(),
            expected: Vec::new(),
            subnets: Vec::new(),
            length_index: None,
        }
    }

    pub fn encoder(&self) -> &RequestEncoder {
        &self.encoder
    }

    /// Opens a segment: target register, length placeholder, transceiver
    /// trigger.
    pub fn begin_subnet(&mut self, subnet: u8) -> Result<()> {
        if self.length_index.is_some() {
            return Err(IlcError::protocol("subnet segment already open"));
        }
        if subnet < 1 || subnet as usize > SUBNET_COUNT {
            return Err(IlcError::protocol(format!("invalid subnet {subnet}")));
        }
        self.buffer.push_raw(SUBNET_TX_REGISTER[subnet as usize])?;
        self.length_index = Some(self.buffer.len());
        self.buffer.push_raw(0)?;
        self.buffer.write_software_trigger()?;
        self.subnets.push(subnet);
        Ok(())
    }

    /// Closes the open segment: interrupt trigger, then the length word is
    /// patched to cover every word after it.
    pub fn end_subnet(&mut self) -> Result<()> {
        let length_index = self
            .length_index
            .take()
            .ok_or_else(|| IlcError::protocol("no subnet segment open"))?;
        self.buffer.write_trigger_irq()?;
        let length = self.buffer.len() - (length_index + 1);
        self.buffer.set_word(length_index, length as u16);
        Ok(())
    }

    pub fn buffer(&mut self) -> &mut WireBuffer {
        &mut self.buffer
    }

    /// Registers a response the last written frame will solicit.
    pub fn expect(&mut self, device: DeviceType, data_index: usize) {
        self.expected.push((device, data_index));
    }

    pub fn build(mut self) -> Result<BusList> {
        if self.length_index.is_some() {
            return Err(IlcError::protocol("subnet segment left open"));
        }
        if self.subnets.is_empty() {
            return Err(IlcError::protocol("bus list has no subnet segments"));
        }
        self.buffer.set_index(0);
        Ok(BusList {
            buffer: self.buffer,
            expected: self.expected,
            subnets: self.subnets,
        })
    }
}

/// One unicast frame to every mapped channel, any device type.
fn per_channel_list(
    map: &SubnetAddressMap,
    encoder: RequestEncoder,
    write: impl Fn(&RequestEncoder, &mut WireBuffer, u8) -> Result<()>,
    devices: &[DeviceType],
) -> Result<BusList> {
    let mut builder = BusListBuilder::new(encoder);
    for subnet in 1..=SUBNET_COUNT as u8 {
        let channels: Vec<_> = devices
            .iter()
            .flat_map(|d| map.channels_on(subnet, *d))
            .copied()
            .collect();
        if channels.is_empty() {
            continue;
        }
        builder.begin_subnet(subnet)?;
        for channel in channels {
            write(&builder.encoder, &mut builder.buffer, channel.address)?;
            builder.expect(channel.device, channel.data_index);
        }
        builder.end_subnet()?;
    }
    builder.build()
}

const ALL_DEVICES: &[DeviceType] = &[
    DeviceType::ForceActuator,
    DeviceType::HardpointActuator,
    DeviceType::HardpointMonitor,
];

/// Queries every channel for its server identification.
pub fn report_server_id_list(map: &SubnetAddressMap, encoder: RequestEncoder) -> Result<BusList> {
    per_channel_list(
        map,
        encoder,
        |e, b, a| e.report_server_id(b, a),
        ALL_DEVICES,
    )
}

/// Queries every channel for its server status.
pub fn report_server_status_list(
    map: &SubnetAddressMap,
    encoder: RequestEncoder,
) -> Result<BusList> {
    per_channel_list(
        map,
        encoder,
        |e, b, a| e.report_server_status(b, a),
        ALL_DEVICES,
    )
}

/// Commands every channel into the given ILC mode.
pub fn change_ilc_mode_list(
    map: &SubnetAddressMap,
    encoder: RequestEncoder,
    mode: u16,
) -> Result<BusList> {
    per_channel_list(
        map,
        encoder,
        move |e, b, a| e.change_ilc_mode(b, a, mode),
        ALL_DEVICES,
    )
}

/// Resets every channel.
pub fn reset_list(map: &SubnetAddressMap, encoder: RequestEncoder) -> Result<BusList> {
    per_channel_list(map, encoder, |e, b, a| e.reset(b, a), ALL_DEVICES)
}

/// Reads load cell calibration from force and hardpoint actuators.
pub fn read_calibration_list(map: &SubnetAddressMap, encoder: RequestEncoder) -> Result<BusList> {
    per_channel_list(
        map,
        encoder,
        |e, b, a| e.read_calibration(b, a),
        &[DeviceType::ForceActuator, DeviceType::HardpointActuator],
    )
}

/// Reads boost valve gains from every force actuator.
pub fn read_boost_valve_gains_list(
    map: &SubnetAddressMap,
    encoder: RequestEncoder,
) -> Result<BusList> {
    per_channel_list(
        map,
        encoder,
        |e, b, a| e.read_boost_valve_dca_gains(b, a),
        &[DeviceType::ForceActuator],
    )
}

/// Writes boost valve gains to every force actuator.
pub fn set_boost_valve_gains_list(
    map: &SubnetAddressMap,
    encoder: RequestEncoder,
    primary_gain: f32,
    secondary_gain: f32,
) -> Result<BusList> {
    per_channel_list(
        map,
        encoder,
        move |e, b, a| e.set_boost_valve_dca_gains(b, a, primary_gain, secondary_gain),
        &[DeviceType::ForceActuator],
    )
}

/// Sets the ADC scan rate on force and hardpoint actuators. The echoed
/// rate lands in the info stores.
pub fn set_adc_scan_rate_list(
    map: &SubnetAddressMap,
    encoder: RequestEncoder,
    rate: u8,
) -> Result<BusList> {
    per_channel_list(
        map,
        encoder,
        move |e, b, a| e.set_adc_scan_rate(b, a, rate),
        &[DeviceType::ForceActuator, DeviceType::HardpointActuator],
    )
}

/// Writes ADC channel offset and sensitivity to force and hardpoint
/// actuators: channel 1 everywhere, channel 2 on dual-axis actuators.
pub fn set_adc_offset_sensitivity_list(
    map: &SubnetAddressMap,
    encoder: RequestEncoder,
    offset: f32,
    sensitivity: f32,
) -> Result<BusList> {
    let mut builder = BusListBuilder::new(encoder);
    for subnet in 1..=SUBNET_COUNT as u8 {
        let channels: Vec<_> = [DeviceType::ForceActuator, DeviceType::HardpointActuator]
            .iter()
            .flat_map(|d| map.channels_on(subnet, *d))
            .copied()
            .collect();
        if channels.is_empty() {
            continue;
        }
        builder.begin_subnet(subnet)?;
        for channel in channels {
            builder.encoder.set_adc_channel_offset_and_sensitivity(
                &mut builder.buffer,
                channel.address,
                1,
                offset,
                sensitivity,
            )?;
            builder.expect(channel.device, channel.data_index);
            if channel.is_dual_axis() {
                builder.encoder.set_adc_channel_offset_and_sensitivity(
                    &mut builder.buffer,
                    channel.address,
                    2,
                    offset,
                    sensitivity,
                )?;
                builder.expect(channel.device, channel.data_index);
            }
        }
        builder.end_subnet()?;
    }
    builder.build()
}

/// Queries mezzanine identification from force actuators and hardpoint
/// monitors.
pub fn report_mezzanine_id_list(
    map: &SubnetAddressMap,
    encoder: RequestEncoder,
) -> Result<BusList> {
    per_channel_list(
        map,
        encoder,
        |e, b, a| e.report_dca_id(b, a),
        &[DeviceType::ForceActuator, DeviceType::HardpointMonitor],
    )
}

/// Queries mezzanine status from force actuators and hardpoint monitors.
pub fn report_mezzanine_status_list(
    map: &SubnetAddressMap,
    encoder: RequestEncoder,
) -> Result<BusList> {
    per_channel_list(
        map,
        encoder,
        |e, b, a| e.report_dca_status(b, a),
        &[DeviceType::ForceActuator, DeviceType::HardpointMonitor],
    )
}

/// Latches sensor values across all subnets, then samples every device.
///
/// The freeze broadcast makes each subnet's devices capture concurrently;
/// the unicast frames that follow read the captured values back.
pub fn freeze_sensor_list(
    map: &SubnetAddressMap,
    encoder: RequestEncoder,
    counter: u8,
) -> Result<BusList> {
    let mut builder = BusListBuilder::new(encoder);
    for subnet in 1..=SUBNET_COUNT as u8 {
        let fas: Vec<_> = map
            .channels_on(subnet, DeviceType::ForceActuator)
            .copied()
            .collect();
        let hps: Vec<_> = map
            .channels_on(subnet, DeviceType::HardpointActuator)
            .copied()
            .collect();
        let hms: Vec<_> = map
            .channels_on(subnet, DeviceType::HardpointMonitor)
            .copied()
            .collect();
        if fas.is_empty() && hps.is_empty() && hms.is_empty() {
            continue;
        }
        builder.begin_subnet(subnet)?;
        builder
            .encoder
            .broadcast_freeze_sensor_values(&mut builder.buffer, counter)?;
        for channel in &fas {
            builder
                .encoder
                .pneumatic_force_and_status(&mut builder.buffer, channel.address)?;
            builder.expect(channel.device, channel.data_index);
        }
        for channel in &hps {
            builder
                .encoder
                .electromechanical_force_and_status(&mut builder.buffer, channel.address)?;
            builder.expect(channel.device, channel.data_index);
        }
        for channel in &hms {
            builder
                .encoder
                .read_dca_pressure_values(&mut builder.buffer, channel.address)?;
            builder.expect(channel.device, channel.data_index);
            builder
                .encoder
                .report_lvdt(&mut builder.buffer, channel.address)?;
            builder.expect(channel.device, channel.data_index);
        }
        builder.end_subnet()?;
    }
    builder.build()
}

/// Hardpoint step demands for one raised-operations cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct HardpointSteps(pub [i8; HP_COUNT]);

/// The per-cycle list used while the mirror carries load: broadcast force
/// setpoints and hardpoint steps, then sample every device.
///
/// LVDT sampling is read-only monitoring here, so those responses are not
/// entered into the expected roster.
pub fn raised_list(
    map: &SubnetAddressMap,
    encoder: RequestEncoder,
    counter: u8,
    slew_flag: bool,
    applied: &AppliedCylinderForces,
    steps: &HardpointSteps,
) -> Result<BusList> {
    let mut builder = BusListBuilder::new(encoder);

    for subnet in 1..=4u8 {
        let fas: Vec<_> = map
            .channels_on(subnet, DeviceType::ForceActuator)
            .copied()
            .collect();
        if fas.is_empty() {
            continue;
        }

        let mut saa = [0i32; BROADCAST_SAA_SETPOINTS];
        let mut daa_primary = [0i32; BROADCAST_DAA_SETPOINTS];
        let mut daa_secondary = [0i32; BROADCAST_DAA_SETPOINTS];
        for channel in &fas {
            let primary = applied.primary_cylinder_force[channel.data_index];
            if channel.address as usize <= BROADCAST_SAA_SETPOINTS {
                saa[channel.address as usize - 1] = primary;
            } else {
                let slot = channel.address as usize - BROADCAST_SAA_SETPOINTS - 1;
                daa_primary[slot] = primary;
                if let Some(si) = channel.secondary_index {
                    daa_secondary[slot] = applied.secondary_cylinder_force[si];
                }
            }
        }

        builder.begin_subnet(subnet)?;
        builder.encoder.broadcast_force_demand(
            &mut builder.buffer,
            counter,
            slew_flag,
            &saa,
            &daa_primary,
            &daa_secondary,
        )?;
        for channel in &fas {
            builder
                .encoder
                .pneumatic_force_and_status(&mut builder.buffer, channel.address)?;
            builder.expect(channel.device, channel.data_index);
        }
        builder.end_subnet()?;
    }

    let hps: Vec<_> = map
        .channels_on(5, DeviceType::HardpointActuator)
        .copied()
        .collect();
    let hms: Vec<_> = map
        .channels_on(5, DeviceType::HardpointMonitor)
        .copied()
        .collect();
    if !hps.is_empty() || !hms.is_empty() {
        builder.begin_subnet(5)?;
        builder
            .encoder
            .broadcast_step_motor(&mut builder.buffer, counter, &steps.0)?;
        for channel in &hps {
            builder
                .encoder
                .electromechanical_force_and_status(&mut builder.buffer, channel.address)?;
            builder.expect(channel.device, channel.data_index);
        }
        for channel in &hms {
            builder
                .encoder
                .nop_report_lvdt(&mut builder.buffer, channel.address)?;
        }
        builder.end_subnet()?;
    }

    builder.build()
}

/// Unicast force demands to every force actuator, with per-frame status
/// responses. Engineering use; raised operations broadcast instead.
pub fn force_demand_list(
    map: &SubnetAddressMap,
    encoder: RequestEncoder,
    slew_flag: bool,
    applied: &AppliedCylinderForces,
) -> Result<BusList> {
    let mut builder = BusListBuilder::new(encoder);
    for subnet in 1..=4u8 {
        let fas: Vec<_> = map
            .channels_on(subnet, DeviceType::ForceActuator)
            .copied()
            .collect();
        if fas.is_empty() {
            continue;
        }
        builder.begin_subnet(subnet)?;
        for channel in &fas {
            let primary = applied.primary_cylinder_force[channel.data_index];
            match channel.secondary_index {
                Some(si) => builder.encoder.dual_axis_force_demand(
                    &mut builder.buffer,
                    channel.address,
                    slew_flag,
                    primary,
                    applied.secondary_cylinder_force[si],
                )?,
                None => builder.encoder.single_axis_force_demand(
                    &mut builder.buffer,
                    channel.address,
                    slew_flag,
                    primary,
                )?,
            }
            builder.expect(channel.device, channel.data_index);
        }
        builder.end_subnet()?;
    }
    builder.build()
}
