//! Request frame encoding.
//!
//! One method per supported function code. Each method appends a complete
//! frame to a transmit buffer: address, function, payload, CRC,
//! end-of-frame and the bus turnaround word (wait-for-receive after a
//! unicast, a settling delay after a broadcast).

use crate::constants::*;
use crate::error::Result;
use crate::settings::IlcTimings;
use crate::wire::WireBuffer;

/// Number of single-axis setpoints in a broadcast force demand
pub const BROADCAST_SAA_SETPOINTS: usize = 16;
/// Number of dual-axis setpoint pairs in a broadcast force demand
pub const BROADCAST_DAA_SETPOINTS: usize = 30;

/// Builds request frames for every ILC operation.
#[derive(Debug, Clone)]
pub struct RequestEncoder {
    timings: IlcTimings,
}

impl RequestEncoder {
    pub fn new(timings: IlcTimings) -> Self {
        RequestEncoder { timings }
    }

    fn unicast(
        &self,
        buffer: &mut WireBuffer,
        address: u8,
        function: u8,
        payload: impl FnOnce(&mut WireBuffer) -> Result<()>,
    ) -> Result<()> {
        let start = buffer.index();
        buffer.write_u8(address)?;
        buffer.write_u8(function)?;
        payload(buffer)?;
        buffer.write_crc(buffer.index() - start)?;
        buffer.write_end_of_frame()?;
        buffer.write_wait_for_rx(self.timings.unicast_wait_us)
    }

    fn broadcast(
        &self,
        buffer: &mut WireBuffer,
        address: u8,
        function: u8,
        payload: impl FnOnce(&mut WireBuffer) -> Result<()>,
    ) -> Result<()> {
        let start = buffer.index();
        buffer.write_u8(address)?;
        buffer.write_u8(function)?;
        payload(buffer)?;
        buffer.write_crc(buffer.index() - start)?;
        buffer.write_end_of_frame()?;
        buffer.write_delay(self.timings.broadcast_delay_us)
    }

    /// High nibble carries the outer loop counter, bit 0 the slew flag.
    fn broadcast_status_byte(counter: u8, slew: bool) -> u8 {
        ((counter & 0x0F) << 4) | u8::from(slew)
    }

    // ------------------------------------------------------------------
    // Identity and status
    // ------------------------------------------------------------------

    pub fn report_server_id(&self, buffer: &mut WireBuffer, address: u8) -> Result<()> {
        self.unicast(buffer, address, function::REPORT_SERVER_ID, |_| Ok(()))
    }

    pub fn report_server_status(&self, buffer: &mut WireBuffer, address: u8) -> Result<()> {
        self.unicast(buffer, address, function::REPORT_SERVER_STATUS, |_| Ok(()))
    }

    /// Commands a mode transition. High payload byte is reserved.
    pub fn change_ilc_mode(&self, buffer: &mut WireBuffer, address: u8, mode: u16) -> Result<()> {
        self.unicast(buffer, address, function::CHANGE_ILC_MODE, |b| {
            b.write_u16(mode)
        })
    }

    pub fn reset(&self, buffer: &mut WireBuffer, address: u8) -> Result<()> {
        self.unicast(buffer, address, function::RESET, |_| Ok(()))
    }

    // ------------------------------------------------------------------
    // Hardpoint actuators
    // ------------------------------------------------------------------

    pub fn step_motor(&self, buffer: &mut WireBuffer, address: u8, steps: i8) -> Result<()> {
        self.unicast(buffer, address, function::STEP_MOTOR, |b| b.write_i8(steps))
    }

    /// Commands every hardpoint's motor in one frame on the motor
    /// broadcast address.
    pub fn broadcast_step_motor(
        &self,
        buffer: &mut WireBuffer,
        counter: u8,
        steps: &[i8; HP_COUNT],
    ) -> Result<()> {
        self.broadcast(buffer, MOTOR_BROADCAST_ADDRESS, function::STEP_MOTOR, |b| {
            b.write_u8(Self::broadcast_status_byte(counter, false))?;
            for step in steps {
                b.write_i8(*step)?;
            }
            Ok(())
        })
    }

    pub fn electromechanical_force_and_status(
        &self,
        buffer: &mut WireBuffer,
        address: u8,
    ) -> Result<()> {
        self.unicast(
            buffer,
            address,
            function::ELECTROMECHANICAL_FORCE_AND_STATUS,
            |_| Ok(()),
        )
    }

    // ------------------------------------------------------------------
    // Force actuators
    // ------------------------------------------------------------------

    pub fn broadcast_freeze_sensor_values(
        &self,
        buffer: &mut WireBuffer,
        counter: u8,
    ) -> Result<()> {
        self.broadcast(
            buffer,
            BROADCAST_ADDRESS,
            function::FREEZE_SENSOR_VALUES,
            |b| b.write_u8(Self::broadcast_status_byte(counter, false)),
        )
    }

    pub fn set_boost_valve_dca_gains(
        &self,
        buffer: &mut WireBuffer,
        address: u8,
        primary_gain: f32,
        secondary_gain: f32,
    ) -> Result<()> {
        self.unicast(buffer, address, function::SET_BOOST_VALVE_DCA_GAINS, |b| {
            b.write_sgl(primary_gain)?;
            b.write_sgl(secondary_gain)
        })
    }

    pub fn read_boost_valve_dca_gains(&self, buffer: &mut WireBuffer, address: u8) -> Result<()> {
        self.unicast(buffer, address, function::READ_BOOST_VALVE_DCA_GAINS, |_| {
            Ok(())
        })
    }

    /// Force demand for a single-axis actuator. Setpoint in millinewtons.
    pub fn single_axis_force_demand(
        &self,
        buffer: &mut WireBuffer,
        address: u8,
        slew: bool,
        primary_setpoint: i32,
    ) -> Result<()> {
        self.unicast(buffer, address, function::FORCE_DEMAND, |b| {
            b.write_u8(u8::from(slew))?;
            b.write_i24(primary_setpoint)
        })
    }

    /// Force demand for a dual-axis actuator. Setpoints in millinewtons.
    pub fn dual_axis_force_demand(
        &self,
        buffer: &mut WireBuffer,
        address: u8,
        slew: bool,
        primary_setpoint: i32,
        secondary_setpoint: i32,
    ) -> Result<()> {
        self.unicast(buffer, address, function::FORCE_DEMAND, |b| {
            b.write_u8(u8::from(slew))?;
            b.write_i24(primary_setpoint)?;
            b.write_i24(secondary_setpoint)
        })
    }

    /// Force demand for every actuator on one subnet: 16 single-axis
    /// setpoints for addresses 1..=16 followed by 30 setpoint pairs for
    /// addresses 17..=46. Absent addresses carry zero.
    pub fn broadcast_force_demand(
        &self,
        buffer: &mut WireBuffer,
        counter: u8,
        slew: bool,
        saa_primary: &[i32; BROADCAST_SAA_SETPOINTS],
        daa_primary: &[i32; BROADCAST_DAA_SETPOINTS],
        daa_secondary: &[i32; BROADCAST_DAA_SETPOINTS],
    ) -> Result<()> {
        self.broadcast(
            buffer,
            MOTOR_BROADCAST_ADDRESS,
            function::FORCE_DEMAND,
            |b| {
                b.write_u8(Self::broadcast_status_byte(counter, slew))?;
                for setpoint in saa_primary {
                    b.write_i24(*setpoint)?;
                }
                for (primary, secondary) in daa_primary.iter().zip(daa_secondary) {
                    b.write_i24(*primary)?;
                    b.write_i24(*secondary)?;
                }
                Ok(())
            },
        )
    }

    pub fn pneumatic_force_and_status(&self, buffer: &mut WireBuffer, address: u8) -> Result<()> {
        self.unicast(buffer, address, function::PNEUMATIC_FORCE_AND_STATUS, |_| {
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // ADC configuration
    // ------------------------------------------------------------------

    pub fn set_adc_scan_rate(&self, buffer: &mut WireBuffer, address: u8, rate: u8) -> Result<()> {
        self.unicast(buffer, address, function::SET_ADC_SCAN_RATE, |b| {
            b.write_u8(rate)
        })
    }

    pub fn set_adc_channel_offset_and_sensitivity(
        &self,
        buffer: &mut WireBuffer,
        address: u8,
        channel: u8,
        offset: f32,
        sensitivity: f32,
    ) -> Result<()> {
        self.unicast(
            buffer,
            address,
            function::SET_ADC_CHANNEL_OFFSET_AND_SENSITIVITY,
            |b| {
                b.write_u8(channel)?;
                b.write_sgl(offset)?;
                b.write_sgl(sensitivity)
            },
        )
    }

    pub fn read_calibration(&self, buffer: &mut WireBuffer, address: u8) -> Result<()> {
        self.unicast(buffer, address, function::READ_CALIBRATION, |_| Ok(()))
    }

    // ------------------------------------------------------------------
    // Mezzanine boards
    // ------------------------------------------------------------------

    pub fn read_dca_pressure_values(&self, buffer: &mut WireBuffer, address: u8) -> Result<()> {
        self.unicast(buffer, address, function::READ_DCA_PRESSURE_VALUES, |_| {
            Ok(())
        })
    }

    pub fn report_dca_id(&self, buffer: &mut WireBuffer, address: u8) -> Result<()> {
        self.unicast(buffer, address, function::REPORT_DCA_ID, |_| Ok(()))
    }

    pub fn report_dca_status(&self, buffer: &mut WireBuffer, address: u8) -> Result<()> {
        self.unicast(buffer, address, function::REPORT_DCA_STATUS, |_| Ok(()))
    }

    pub fn report_lvdt(&self, buffer: &mut WireBuffer, address: u8) -> Result<()> {
        self.unicast(buffer, address, function::REPORT_LVDT, |_| Ok(()))
    }

    /// Timing-parity placeholder: encodes the same frame as
    /// [`report_lvdt`](Self::report_lvdt), but the caller registers no
    /// expected response for it.
    pub fn nop_report_lvdt(&self, buffer: &mut WireBuffer, address: u8) -> Result<()> {
        self.report_lvdt(buffer, address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::crc16;

    fn encoder() -> RequestEncoder {
        RequestEncoder::new(IlcTimings::default())
    }

    fn data_bytes(buffer: &WireBuffer) -> Vec<u8> {
        buffer
            .words()
            .iter()
            .filter(|w| (*w & TAG_MASK) == (TX_DATA_TAG & TAG_MASK))
            .map(|w| ((w >> 1) & 0xFF) as u8)
            .collect()
    }

    #[test]
    fn test_change_ilc_mode_frame() {
        let mut buffer = WireBuffer::tx();
        encoder().change_ilc_mode(&mut buffer, 17, 2).unwrap();

        // addr, fn, mode, crc, eof, wait
        assert_eq!(buffer.len(), 9);
        let bytes = data_bytes(&buffer);
        assert_eq!(&bytes[..4], &[17, 65, 0, 2]);
        let crc = crc16(&bytes[..4]);
        assert_eq!(bytes[4], crc as u8);
        assert_eq!(bytes[5], (crc >> 8) as u8);

        let words = buffer.words();
        assert_eq!(words[8] & TAG_MASK, WAIT_FOR_RX_TAG & TAG_MASK);
        assert_eq!(words[7], END_OF_FRAME);
    }

    #[test]
    fn test_unicast_force_demand_lengths() {
        let mut single = WireBuffer::tx();
        encoder()
            .single_axis_force_demand(&mut single, 5, false, 120_000)
            .unwrap();
        // addr, fn, slew, 3 setpoint, 2 crc, eof, wait
        assert_eq!(single.len(), 11);

        let mut dual = WireBuffer::tx();
        encoder()
            .dual_axis_force_demand(&mut dual, 17, true, 120_000, -35_000)
            .unwrap();
        assert_eq!(dual.len(), 14);
        assert_eq!(data_bytes(&dual)[2], 0x01);
    }

    #[test]
    fn test_broadcast_force_demand_frame() {
        let mut buffer = WireBuffer::tx();
        encoder()
            .broadcast_force_demand(
                &mut buffer,
                7,
                true,
                &[1000; BROADCAST_SAA_SETPOINTS],
                &[2000; BROADCAST_DAA_SETPOINTS],
                &[-2000; BROADCAST_DAA_SETPOINTS],
            )
            .unwrap();

        let bytes = data_bytes(&buffer);
        // addr + fn + status + 16*3 + 30*6 + crc
        assert_eq!(bytes.len(), 2 + 1 + 48 + 180 + 2);
        assert_eq!(bytes[0], MOTOR_BROADCAST_ADDRESS);
        assert_eq!(bytes[1], function::FORCE_DEMAND);
        assert_eq!(bytes[2], (7 << 4) | 1);

        // broadcast terminates with a delay, not a wait
        let last = *buffer.words().last().unwrap();
        assert_eq!(last & TAG_MASK, DELAY_TAG & TAG_MASK);
    }

    #[test]
    fn test_broadcast_step_motor_frame() {
        let mut buffer = WireBuffer::tx();
        encoder()
            .broadcast_step_motor(&mut buffer, 3, &[1, -1, 2, -2, 0, 5])
            .unwrap();
        let bytes = data_bytes(&buffer);
        assert_eq!(bytes[0], MOTOR_BROADCAST_ADDRESS);
        assert_eq!(bytes[1], function::STEP_MOTOR);
        assert_eq!(bytes[2], 3 << 4);
        assert_eq!(bytes[3..9], [1, 0xFF, 2, 0xFE, 0, 5]);
    }

    #[test]
    fn test_no_payload_requests() {
        for (method, function) in [
            (
                RequestEncoder::report_server_id as fn(&RequestEncoder, &mut WireBuffer, u8) -> Result<()>,
                function::REPORT_SERVER_ID,
            ),
            (RequestEncoder::report_server_status, function::REPORT_SERVER_STATUS),
            (RequestEncoder::reset, function::RESET),
            (RequestEncoder::read_calibration, function::READ_CALIBRATION),
            (RequestEncoder::report_dca_status, function::REPORT_DCA_STATUS),
            (RequestEncoder::report_lvdt, function::REPORT_LVDT),
        ] {
            let mut buffer = WireBuffer::tx();
            method(&encoder(), &mut buffer, 42).unwrap();
            let bytes = data_bytes(&buffer);
            assert_eq!(bytes.len(), 4);
            assert_eq!(&bytes[..2], &[42, function]);
        }
    }

    #[test]
    fn test_nop_report_lvdt_matches_report_lvdt() {
        let mut a = WireBuffer::tx();
        let mut b = WireBuffer::tx();
        encoder().report_lvdt(&mut a, 85).unwrap();
        encoder().nop_report_lvdt(&mut b, 85).unwrap();
        assert_eq!(a.words(), b.words());
    }
}
