//! Response stream decoding.
//!
//! `ResponseDecoder::parse` consumes one subnet's receive buffer per call:
//! global timestamp words, then frames, each CRC-validated, routed through
//! the subnet address map and dispatched by function code. Routing faults
//! and device exceptions become [`IlcWarning`] events; unparseable frames
//! are skipped with the cursor left on the next frame. Expected-response
//! accounting lives here as well, closed out by `verify_responses` at the
//! end of each cycle.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::constants::*;
use crate::error::{IlcError, Result};
use crate::forces::{daa_to_mirror, saa_to_mirror};
use crate::safety::{DetailedState, PressureRange, SafetyReporter};
use crate::settings::{ForceActuatorSettings, HardpointSettings};
use crate::subnet::{DeviceType, IlcChannel, SubnetAddressMap};
use crate::telemetry::{EventSink, IlcWarning, TelemetryStore, WarningKind};
use crate::timestamp;
use crate::wire::WireBuffer;

const MICROMETERS_PER_METER: f32 = 1_000_000.0;
const MILLINEWTONS_PER_NEWTON: f32 = 1000.0;

/// Rate limiter for repetitive warnings on the hot path.
struct ThrottledWarn {
    interval: Duration,
    last: Option<Instant>,
}

impl ThrottledWarn {
    fn new(interval: Duration) -> Self {
        ThrottledWarn {
            interval,
            last: None,
        }
    }

    /// True at most once per interval.
    fn ready(&mut self) -> bool {
        let now = Instant::now();
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// Outstanding response counters, one per channel.
#[derive(Debug, Clone)]
pub struct ExpectedResponses {
    fa: [u32; FA_COUNT],
    hp: [u32; HP_COUNT],
    hm: [u32; HM_COUNT],
}

impl ExpectedResponses {
    fn new() -> Self {
        ExpectedResponses {
            fa: [0; FA_COUNT],
            hp: [0; HP_COUNT],
            hm: [0; HM_COUNT],
        }
    }

    fn counters(&mut self, device: DeviceType) -> &mut [u32] {
        match device {
            DeviceType::ForceActuator => &mut self.fa,
            DeviceType::HardpointActuator => &mut self.hp,
            DeviceType::HardpointMonitor => &mut self.hm,
        }
    }

    fn increment(&mut self, device: DeviceType, data_index: usize) {
        self.counters(device)[data_index] += 1;
    }

    fn decrement(&mut self, device: DeviceType, data_index: usize) {
        let counter = &mut self.counters(device)[data_index];
        *counter = counter.saturating_sub(1);
    }

    pub fn outstanding(&self, device: DeviceType, data_index: usize) -> u32 {
        match device {
            DeviceType::ForceActuator => self.fa[data_index],
            DeviceType::HardpointActuator => self.hp[data_index],
            DeviceType::HardpointMonitor => self.hm[data_index],
        }
    }

    fn clear(&mut self) {
        self.fa = [0; FA_COUNT];
        self.hp = [0; HP_COUNT];
        self.hm = [0; HM_COUNT];
    }
}

/// Routed frame being dispatched.
#[derive(Debug, Clone, Copy)]
struct FrameContext {
    channel: IlcChannel,
    timestamp: f64,
}

type FrameHandler = fn(
    &mut ResponseDecoder,
    &mut WireBuffer,
    &FrameContext,
    &mut dyn EventSink,
    &mut dyn SafetyReporter,
);

enum FrameCheck {
    Valid { timestamp: f64 },
    BadCrc { timestamp: f64 },
    TooShort,
}

/// Decodes subnet response buffers into the telemetry store.
pub struct ResponseDecoder {
    map: SubnetAddressMap,
    fa_settings: ForceActuatorSettings,
    hp_settings: HardpointSettings,
    pub store: TelemetryStore,
    expected: ExpectedResponses,
    detailed_state: DetailedState,
    balance_forces_applied: bool,
    broadcast_counter: u8,
    fa_handlers: HashMap<u8, FrameHandler>,
    hp_handlers: HashMap<u8, FrameHandler>,
    hm_handlers: HashMap<u8, FrameHandler>,
    crc_throttle: ThrottledWarn,
    timeout_throttle: ThrottledWarn,
}

impl ResponseDecoder {
    pub fn new(
        map: SubnetAddressMap,
        fa_settings: ForceActuatorSettings,
        hp_settings: HardpointSettings,
    ) -> Result<Self> {
        let secondary_count = (1..=4u8)
            .flat_map(|s| map.channels_on(s, DeviceType::ForceActuator))
            .filter(|c| c.is_dual_axis())
            .count();
        fa_settings.validate(map.force_actuator_count(), secondary_count)?;
        if map.hardpoint_count() > HP_COUNT || map.hardpoint_monitor_count() > HM_COUNT {
            return Err(IlcError::config("hardpoint table exceeds channel capacity"));
        }

        let store = TelemetryStore::new(&map);
        Ok(ResponseDecoder {
            map,
            fa_settings,
            hp_settings,
            store,
            expected: ExpectedResponses::new(),
            detailed_state: DetailedState::Standby,
            balance_forces_applied: false,
            broadcast_counter: 0,
            fa_handlers: Self::fa_handler_table(),
            hp_handlers: Self::hp_handler_table(),
            hm_handlers: Self::hm_handler_table(),
            crc_throttle: ThrottledWarn::new(Duration::from_secs(60)),
            timeout_throttle: ThrottledWarn::new(Duration::from_secs(60)),
        })
    }

    fn fa_handler_table() -> HashMap<u8, FrameHandler> {
        HashMap::from([
            (function::REPORT_SERVER_ID, Self::fa_server_id as FrameHandler),
            (function::REPORT_SERVER_STATUS, Self::fa_server_status),
            (function::CHANGE_ILC_MODE, Self::fa_change_mode),
            (function::SET_BOOST_VALVE_DCA_GAINS, Self::skip_frame),
            (function::READ_BOOST_VALVE_DCA_GAINS, Self::fa_boost_valve_gains),
            (function::FORCE_DEMAND, Self::fa_force_status),
            (function::PNEUMATIC_FORCE_AND_STATUS, Self::fa_force_status),
            (function::SET_ADC_SCAN_RATE, Self::fa_adc_scan_rate),
            (function::SET_ADC_CHANNEL_OFFSET_AND_SENSITIVITY, Self::skip_frame),
            (function::RESET, Self::skip_frame),
            (function::READ_CALIBRATION, Self::fa_calibration),
            (function::READ_DCA_PRESSURE_VALUES, Self::fa_dca_pressure),
            (function::REPORT_DCA_ID, Self::fa_dca_id),
            (function::REPORT_DCA_STATUS, Self::fa_dca_status),
        ])
    }

    fn hp_handler_table() -> HashMap<u8, FrameHandler> {
        HashMap::from([
            (function::REPORT_SERVER_ID, Self::hp_server_id as FrameHandler),
            (function::REPORT_SERVER_STATUS, Self::hp_server_status),
            (function::CHANGE_ILC_MODE, Self::hp_change_mode),
            (function::STEP_MOTOR, Self::hp_force_status),
            (function::ELECTROMECHANICAL_FORCE_AND_STATUS, Self::hp_force_status),
            (function::SET_ADC_SCAN_RATE, Self::hp_adc_scan_rate),
            (function::SET_ADC_CHANNEL_OFFSET_AND_SENSITIVITY, Self::skip_frame),
            (function::RESET, Self::skip_frame),
            (function::READ_CALIBRATION, Self::hp_calibration),
        ])
    }

    fn hm_handler_table() -> HashMap<u8, FrameHandler> {
        HashMap::from([
            (function::REPORT_SERVER_ID, Self::hm_server_id as FrameHandler),
            (function::REPORT_SERVER_STATUS, Self::hm_server_status),
            (function::CHANGE_ILC_MODE, Self::hm_change_mode),
            (function::RESET, Self::skip_frame),
            (function::READ_DCA_PRESSURE_VALUES, Self::hm_pressure_values),
            (function::REPORT_DCA_ID, Self::hm_mezzanine_id),
            (function::REPORT_DCA_STATUS, Self::hm_mezzanine_status),
            (function::REPORT_LVDT, Self::hm_lvdt),
        ])
    }

    // ------------------------------------------------------------------
    // External state
    // ------------------------------------------------------------------

    pub fn set_detailed_state(&mut self, state: DetailedState) {
        self.detailed_state = state;
    }

    pub fn set_balance_forces_applied(&mut self, applied: bool) {
        self.balance_forces_applied = applied;
    }

    /// Outer loop counter echoed back in broadcast-accepting responses.
    pub fn set_broadcast_counter(&mut self, counter: u8) {
        self.broadcast_counter = counter & 0x0F;
    }

    pub fn map(&self) -> &SubnetAddressMap {
        &self.map
    }

    pub fn expected_responses(&self) -> &ExpectedResponses {
        &self.expected
    }

    /// Registers responses a bus list will solicit.
    pub fn expect_responses(&mut self, expected: &[(DeviceType, usize)]) {
        for (device, data_index) in expected {
            self.expected.increment(*device, *data_index);
        }
    }

    pub fn clear_expected_responses(&mut self) {
        self.expected.clear();
    }

    // ------------------------------------------------------------------
    // Parsing
    // ------------------------------------------------------------------

    /// Decodes one subnet's response buffer.
    pub fn parse(
        &mut self,
        buffer: &mut WireBuffer,
        subnet: u8,
        sink: &mut dyn EventSink,
        safety: &mut dyn SafetyReporter,
    ) {
        // four plain words of FPGA nanosecond counter, low word first
        let a = u64::from(buffer.read_raw());
        let b = u64::from(buffer.read_raw());
        let c = u64::from(buffer.read_raw());
        let d = u64::from(buffer.read_raw());
        let global_timestamp = timestamp::raw_to_seconds((d << 48) | (c << 32) | (b << 16) | a);
        self.set_timestamps(global_timestamp);

        while !buffer.end_of_buffer() {
            if buffer.end_of_frame() {
                buffer.read_end_of_frame();
                continue;
            }
            match self.validate_frame(buffer) {
                FrameCheck::Valid { timestamp } => {
                    self.route_frame(buffer, subnet, timestamp, sink, safety);
                }
                FrameCheck::BadCrc { timestamp } => {
                    if self.crc_throttle.ready() {
                        warn!(subnet, "invalid CRC on response frame");
                    }
                    self.emit(sink, timestamp, -1, WarningKind::InvalidCrc);
                }
                FrameCheck::TooShort => {
                    warn!(subnet, "response frame too short to validate");
                    self.emit(sink, global_timestamp, -1, WarningKind::InvalidLength);
                }
            }
        }
    }

    fn set_timestamps(&mut self, timestamp: f64) {
        let store = &mut self.store;
        store.fa_state.timestamp = timestamp;
        store.fa_data.timestamp = timestamp;
        store.fa_warning.timestamp = timestamp;
        store.force_warning.timestamp = timestamp;
        store.hp_state.timestamp = timestamp;
        store.hp_data.timestamp = timestamp;
        store.hp_warning.timestamp = timestamp;
        store.hm_state.timestamp = timestamp;
        store.hm_data.timestamp = timestamp;
        store.hm_warning.timestamp = timestamp;
    }

    /// Scans ahead to the frame's timestamp words, checks the CRC and
    /// positions the cursor: at the frame start when valid, past the frame
    /// otherwise.
    fn validate_frame(&mut self, buffer: &mut WireBuffer) -> FrameCheck {
        let start = buffer.index();
        while !buffer.end_of_buffer()
            && !buffer.end_of_frame()
            && (buffer.peek_raw() & TAG_MASK) != TIMESTAMP_TAG
        {
            buffer.inc_index(1);
        }
        let end = buffer.index();
        if (buffer.peek_raw() & TAG_MASK) != TIMESTAMP_TAG || end < start + 4 {
            // no timestamp words: not a decodable frame
            buffer.skip_to_next_frame();
            return FrameCheck::TooShort;
        }

        let crc_index = end - 2;
        buffer.set_index(crc_index);
        let calculated = buffer.calculate_crc(crc_index - start);
        let received = buffer.read_crc();
        let timestamp = buffer.read_timestamp();
        if calculated == received {
            buffer.set_index(start);
            FrameCheck::Valid { timestamp }
        } else {
            // a frame that fails its CRC is untrusted end to end; discard
            // everything up to the next terminator
            buffer.skip_to_next_frame();
            FrameCheck::BadCrc { timestamp }
        }
    }

    fn route_frame(
        &mut self,
        buffer: &mut WireBuffer,
        subnet: u8,
        timestamp: f64,
        sink: &mut dyn EventSink,
        safety: &mut dyn SafetyReporter,
    ) {
        let address = buffer.read_u8();
        let function = buffer.read_u8();

        if subnet < 1 || subnet as usize > SUBNET_COUNT {
            warn!(subnet, "response from unknown subnet");
            self.emit(sink, timestamp, -1, WarningKind::UnknownSubnet);
            buffer.skip_to_next_frame();
            return;
        }

        let channel = match self.map.lookup(subnet, address) {
            Some(channel) => *channel,
            None => {
                warn!(subnet, address, function, "response from unknown address");
                self.emit(sink, timestamp, -1, WarningKind::UnknownAddress);
                buffer.skip_to_next_frame();
                return;
            }
        };

        // the frame is attributed: it satisfies one outstanding response
        // whether it parses cleanly or not
        self.expected.decrement(channel.device, channel.data_index);

        let ctx = FrameContext { channel, timestamp };
        let (exceptions, handlers) = match channel.device {
            DeviceType::ForceActuator => (FA_EXCEPTION_FUNCTIONS, &self.fa_handlers),
            DeviceType::HardpointActuator => (HP_EXCEPTION_FUNCTIONS, &self.hp_handlers),
            DeviceType::HardpointMonitor => (HM_EXCEPTION_FUNCTIONS, &self.hm_handlers),
        };

        if exceptions.contains(&function) {
            self.parse_error_response(buffer, &ctx, sink);
            return;
        }
        match handlers.get(&function).copied() {
            Some(handler) => handler(self, buffer, &ctx, sink, safety),
            None => {
                warn!(
                    subnet,
                    address, function, "unknown function code in response"
                );
                self.emit(sink, timestamp, channel.actuator_id, WarningKind::UnknownFunction);
                buffer.skip_to_next_frame();
            }
        }
    }

    fn parse_error_response(
        &mut self,
        buffer: &mut WireBuffer,
        ctx: &FrameContext,
        sink: &mut dyn EventSink,
    ) {
        let exception_code = buffer.read_u8();
        let kind = match exception_code {
            1 => WarningKind::IllegalFunction,
            3 => WarningKind::IllegalDataValue,
            code => {
                warn!(
                    actuator_id = ctx.channel.actuator_id,
                    code, "unrecognized exception code"
                );
                WarningKind::UnknownProblem
            }
        };
        self.emit(sink, ctx.timestamp, ctx.channel.actuator_id, kind);
        buffer.skip_to_next_frame();
    }

    fn emit(&self, sink: &mut dyn EventSink, timestamp: f64, actuator_id: i32, kind: WarningKind) {
        sink.ilc_warning(&IlcWarning {
            timestamp,
            actuator_id,
            kind,
        });
    }

    // ------------------------------------------------------------------
    // Cycle closure
    // ------------------------------------------------------------------

    /// Reports every channel still expecting a response as timed out,
    /// zeroes the counters and raises the aggregate communication flag.
    pub fn verify_responses(
        &mut self,
        timestamp: f64,
        sink: &mut dyn EventSink,
        safety: &mut dyn SafetyReporter,
    ) {
        let mut any_timeout = false;

        for i in 0..self.map.force_actuator_count() {
            if self.expected.fa[i] != 0 {
                any_timeout = true;
                if self.timeout_throttle.ready() {
                    warn!(data_index = i, "force actuator response timeout");
                }
                let id = self.store.fa_info.reference_id[i];
                self.emit(sink, timestamp, id, WarningKind::ResponseTimeout);
                self.expected.fa[i] = 0;
            }
        }
        for i in 0..self.map.hardpoint_count() {
            if self.expected.hp[i] != 0 {
                any_timeout = true;
                if self.timeout_throttle.ready() {
                    warn!(data_index = i, "hardpoint actuator response timeout");
                }
                let id = self.store.hp_info.reference_id[i];
                self.emit(sink, timestamp, id, WarningKind::ResponseTimeout);
                self.expected.hp[i] = 0;
            }
        }
        for i in 0..self.map.hardpoint_monitor_count() {
            if self.expected.hm[i] != 0 {
                any_timeout = true;
                if self.timeout_throttle.ready() {
                    warn!(data_index = i, "hardpoint monitor response timeout");
                }
                let id = self.store.hm_info.reference_id[i];
                self.emit(sink, timestamp, id, WarningKind::ResponseTimeout);
                self.expected.hm[i] = 0;
            }
        }

        safety.ilc_communication_timeout(any_timeout);
    }

    // ------------------------------------------------------------------
    // Shared handlers
    // ------------------------------------------------------------------

    fn skip_frame(
        &mut self,
        buffer: &mut WireBuffer,
        _ctx: &FrameContext,
        _sink: &mut dyn EventSink,
        _safety: &mut dyn SafetyReporter,
    ) {
        buffer.skip_to_next_frame();
    }

    // ------------------------------------------------------------------
    // Force actuator handlers
    // ------------------------------------------------------------------

    fn fa_server_id(
        &mut self,
        buffer: &mut WireBuffer,
        ctx: &FrameContext,
        _sink: &mut dyn EventSink,
        _safety: &mut dyn SafetyReporter,
    ) {
        let i = ctx.channel.data_index;
        let length = buffer.read_u8() as usize;
        let info = &mut self.store.fa_info;
        info.ilc_unique_id[i] = buffer.read_u48();
        info.ilc_application_type[i] = buffer.read_u8();
        info.network_node_type[i] = buffer.read_u8();
        info.ilc_selected_options[i] = buffer.read_u8();
        info.network_node_options[i] = buffer.read_u8();
        info.major_revision[i] = buffer.read_u8();
        info.minor_revision[i] = buffer.read_u8();
        // firmware name bytes follow; length counts everything after itself
        buffer.inc_index(length.saturating_sub(12));
        buffer.skip_to_next_frame();
    }

    fn fa_server_status(
        &mut self,
        buffer: &mut WireBuffer,
        ctx: &FrameContext,
        _sink: &mut dyn EventSink,
        _safety: &mut dyn SafetyReporter,
    ) {
        let i = ctx.channel.data_index;
        self.store.fa_state.ilc_state[i] = buffer.read_u8();
        let status = buffer.read_u16();
        let w = &mut self.store.fa_warning;
        w.major_fault[i] = status & 0x0001 != 0;
        w.minor_fault[i] = status & 0x0002 != 0;
        // 0x0004 is reserved
        w.fault_override[i] = status & 0x0008 != 0;
        w.main_calibration_error[i] = status & 0x0010 != 0;
        w.backup_calibration_error[i] = status & 0x0020 != 0;
        w.mezzanine_fault[i] = status & 0x2000 != 0;
        w.mezzanine_firmware_update[i] = status & 0x4000 != 0;
        let faults = buffer.read_u16();
        w.unique_id_crc_error[i] = faults & 0x0001 != 0;
        w.application_type_mismatch[i] = faults & 0x0002 != 0;
        w.application_missing[i] = faults & 0x0004 != 0;
        w.application_crc_mismatch[i] = faults & 0x0008 != 0;
        w.one_wire_missing[i] = faults & 0x0010 != 0;
        w.one_wire1_mismatch[i] = faults & 0x0020 != 0;
        w.one_wire2_mismatch[i] = faults & 0x0040 != 0;
        w.watchdog_reset[i] = faults & 0x0100 != 0;
        w.brownout[i] = faults & 0x0200 != 0;
        w.event_trap_reset[i] = faults & 0x0400 != 0;
        w.ssr_power_fault[i] = faults & 0x1000 != 0;
        w.aux_power_fault[i] = faults & 0x2000 != 0;
        buffer.skip_to_next_frame();
    }

    fn fa_change_mode(
        &mut self,
        buffer: &mut WireBuffer,
        ctx: &FrameContext,
        _sink: &mut dyn EventSink,
        _safety: &mut dyn SafetyReporter,
    ) {
        self.store.fa_state.ilc_state[ctx.channel.data_index] = buffer.read_u16() as u8;
        buffer.skip_to_next_frame();
    }

    fn fa_boost_valve_gains(
        &mut self,
        buffer: &mut WireBuffer,
        ctx: &FrameContext,
        _sink: &mut dyn EventSink,
        _safety: &mut dyn SafetyReporter,
    ) {
        let i = ctx.channel.data_index;
        self.store.fa_info.mezzanine_primary_cylinder_gain[i] = buffer.read_sgl();
        self.store.fa_info.mezzanine_secondary_cylinder_gain[i] = buffer.read_sgl();
        buffer.skip_to_next_frame();
    }

    /// Force demand and pneumatic status responses share one layout:
    /// status byte, primary cylinder force, secondary cylinder force on
    /// dual-axis units.
    fn fa_force_status(
        &mut self,
        buffer: &mut WireBuffer,
        ctx: &FrameContext,
        sink: &mut dyn EventSink,
        safety: &mut dyn SafetyReporter,
    ) {
        let channel = ctx.channel;
        let i = channel.data_index;
        let status = buffer.read_u8();
        {
            let w = &mut self.store.fa_warning;
            w.ilc_fault[i] = status & 0x01 != 0;
            w.mezzanine_error[i] = status & 0x02 != 0;
            w.broadcast_counter_mismatch[i] = (status >> 4) != self.broadcast_counter;
        }

        let primary = buffer.read_sgl();
        let data = &mut self.store.fa_data;
        data.primary_cylinder_force[i] = primary;
        if let Some(si) = channel.secondary_index {
            let secondary = buffer.read_sgl();
            data.secondary_cylinder_force[si] = secondary;
            let mirror = daa_to_mirror(channel.orientation, primary, secondary);
            if let Some(xi) = channel.x_index {
                data.x_force[xi] = mirror.x;
            }
            if let Some(yi) = channel.y_index {
                data.y_force[yi] = mirror.y;
            }
            data.z_force[i] = mirror.z;
        } else {
            data.z_force[i] = saa_to_mirror(primary).z;
        }
        buffer.skip_to_next_frame();

        self.check_force_actuator_measured_force(&channel, sink);
        self.check_force_actuator_following_error(&channel, sink, safety);
    }

    fn fa_adc_scan_rate(
        &mut self,
        buffer: &mut WireBuffer,
        ctx: &FrameContext,
        _sink: &mut dyn EventSink,
        _safety: &mut dyn SafetyReporter,
    ) {
        self.store.fa_info.adc_scan_rate[ctx.channel.data_index] = buffer.read_u8();
        buffer.skip_to_next_frame();
    }

    fn fa_calibration(
        &mut self,
        buffer: &mut WireBuffer,
        ctx: &FrameContext,
        _sink: &mut dyn EventSink,
        _safety: &mut dyn SafetyReporter,
    ) {
        let i = ctx.channel.data_index;
        let info = &mut self.store.fa_info;
        // both cylinders share the channel 1 ADC coefficient
        info.main_primary_cylinder_coefficient[i] = buffer.read_sgl();
        info.main_secondary_cylinder_coefficient[i] = info.main_primary_cylinder_coefficient[i];
        buffer.read_sgl(); // main coefficient channel 2
        buffer.read_sgl(); // main coefficient channel 3
        buffer.read_sgl(); // main coefficient channel 4
        info.main_primary_cylinder_load_cell_offset[i] = buffer.read_sgl();
        info.main_secondary_cylinder_load_cell_offset[i] = buffer.read_sgl();
        buffer.read_sgl(); // main offset channel 3
        buffer.read_sgl(); // main offset channel 4
        info.main_primary_cylinder_load_cell_sensitivity[i] = buffer.read_sgl();
        info.main_secondary_cylinder_load_cell_sensitivity[i] = buffer.read_sgl();
        buffer.read_sgl(); // main sensitivity channel 3
        buffer.read_sgl(); // main sensitivity channel 4
        info.backup_primary_cylinder_coefficient[i] = buffer.read_sgl();
        info.backup_secondary_cylinder_coefficient[i] = info.backup_primary_cylinder_coefficient[i];
        buffer.read_sgl(); // backup coefficient channel 2
        buffer.read_sgl(); // backup coefficient channel 3
        buffer.read_sgl(); // backup coefficient channel 4
        info.backup_primary_cylinder_load_cell_offset[i] = buffer.read_sgl();
        info.backup_secondary_cylinder_load_cell_offset[i] = buffer.read_sgl();
        buffer.read_sgl(); // backup offset channel 3
        buffer.read_sgl(); // backup offset channel 4
        info.backup_primary_cylinder_load_cell_sensitivity[i] = buffer.read_sgl();
        info.backup_secondary_cylinder_load_cell_sensitivity[i] = buffer.read_sgl();
        buffer.read_sgl(); // backup sensitivity channel 3
        buffer.read_sgl(); // backup sensitivity channel 4
        buffer.skip_to_next_frame();
    }

    fn fa_dca_pressure(
        &mut self,
        buffer: &mut WireBuffer,
        _ctx: &FrameContext,
        _sink: &mut dyn EventSink,
        _safety: &mut dyn SafetyReporter,
    ) {
        // pressure values are not kept for force actuators
        buffer.read_sgl();
        buffer.read_sgl();
        buffer.read_sgl();
        buffer.read_sgl();
        buffer.skip_to_next_frame();
    }

    fn fa_dca_id(
        &mut self,
        buffer: &mut WireBuffer,
        ctx: &FrameContext,
        _sink: &mut dyn EventSink,
        _safety: &mut dyn SafetyReporter,
    ) {
        let i = ctx.channel.data_index;
        let info = &mut self.store.fa_info;
        info.mezzanine_unique_id[i] = buffer.read_u48();
        info.mezzanine_firmware_type[i] = buffer.read_u8();
        info.mezzanine_major_revision[i] = buffer.read_u8();
        info.mezzanine_minor_revision[i] = buffer.read_u8();
        buffer.skip_to_next_frame();
    }

    fn fa_dca_status(
        &mut self,
        buffer: &mut WireBuffer,
        ctx: &FrameContext,
        _sink: &mut dyn EventSink,
        _safety: &mut dyn SafetyReporter,
    ) {
        let i = ctx.channel.data_index;
        let status = buffer.read_u16();
        let w = &mut self.store.fa_warning;
        w.mezzanine_status_word[i] = status;
        w.mezzanine_unique_id_crc_error[i] = status & 0x0010 != 0;
        w.mezzanine_event_trap_reset[i] = status & 0x0100 != 0;
        w.mezzanine_application_missing[i] = status & 0x1000 != 0;
        w.mezzanine_application_crc_mismatch[i] = status & 0x2000 != 0;
        w.mezzanine_bootloader_active[i] = status & 0x8000 != 0;
        buffer.skip_to_next_frame();
    }

    // ------------------------------------------------------------------
    // Hardpoint actuator handlers
    // ------------------------------------------------------------------

    fn hp_server_id(
        &mut self,
        buffer: &mut WireBuffer,
        ctx: &FrameContext,
        _sink: &mut dyn EventSink,
        _safety: &mut dyn SafetyReporter,
    ) {
        let i = ctx.channel.data_index;
        let length = buffer.read_u8() as usize;
        let info = &mut self.store.hp_info;
        info.ilc_unique_id[i] = buffer.read_u48();
        info.ilc_application_type[i] = buffer.read_u8();
        info.network_node_type[i] = buffer.read_u8();
        info.ilc_selected_options[i] = buffer.read_u8();
        info.network_node_options[i] = buffer.read_u8();
        info.major_revision[i] = buffer.read_u8();
        info.minor_revision[i] = buffer.read_u8();
        buffer.inc_index(length.saturating_sub(12));
        buffer.skip_to_next_frame();
    }

    fn hp_server_status(
        &mut self,
        buffer: &mut WireBuffer,
        ctx: &FrameContext,
        _sink: &mut dyn EventSink,
        _safety: &mut dyn SafetyReporter,
    ) {
        let i = ctx.channel.data_index;
        self.store.hp_state.ilc_state[i] = buffer.read_u8();
        let status = buffer.read_u16();
        let w = &mut self.store.hp_warning;
        w.major_fault[i] = status & 0x0001 != 0;
        w.minor_fault[i] = status & 0x0002 != 0;
        w.fault_override[i] = status & 0x0008 != 0;
        w.main_calibration_error[i] = status & 0x0010 != 0;
        w.backup_calibration_error[i] = status & 0x0020 != 0;
        w.limit_switch1_operated[i] = status & 0x0100 != 0;
        w.limit_switch2_operated[i] = status & 0x0200 != 0;
        let faults = buffer.read_u16();
        w.unique_id_crc_error[i] = faults & 0x0001 != 0;
        w.application_type_mismatch[i] = faults & 0x0002 != 0;
        w.application_missing[i] = faults & 0x0004 != 0;
        w.application_crc_mismatch[i] = faults & 0x0008 != 0;
        w.one_wire_missing[i] = faults & 0x0010 != 0;
        w.one_wire1_mismatch[i] = faults & 0x0020 != 0;
        w.one_wire2_mismatch[i] = faults & 0x0040 != 0;
        w.watchdog_reset[i] = faults & 0x0100 != 0;
        w.brownout[i] = faults & 0x0200 != 0;
        w.event_trap_reset[i] = faults & 0x0400 != 0;
        w.motor_driver_fault[i] = faults & 0x0800 != 0;
        w.ssr_power_fault[i] = faults & 0x1000 != 0;
        w.aux_power_fault[i] = faults & 0x2000 != 0;
        w.smc_power_fault[i] = faults & 0x4000 != 0;
        buffer.skip_to_next_frame();
    }

    fn hp_change_mode(
        &mut self,
        buffer: &mut WireBuffer,
        ctx: &FrameContext,
        _sink: &mut dyn EventSink,
        _safety: &mut dyn SafetyReporter,
    ) {
        self.store.hp_state.ilc_state[ctx.channel.data_index] = buffer.read_u16() as u8;
        buffer.skip_to_next_frame();
    }

    /// Step motor and electromechanical status responses share one layout:
    /// status byte, encoder, measured force.
    fn hp_force_status(
        &mut self,
        buffer: &mut WireBuffer,
        ctx: &FrameContext,
        _sink: &mut dyn EventSink,
        safety: &mut dyn SafetyReporter,
    ) {
        let i = ctx.channel.data_index;
        let status = buffer.read_u8();
        {
            let w = &mut self.store.hp_warning;
            w.ilc_fault[i] = status & 0x01 != 0;
            // 0x02 is reserved
            w.limit_switch1_operated[i] = status & 0x04 != 0;
            w.limit_switch2_operated[i] = status & 0x08 != 0;
            w.broadcast_counter_mismatch[i] = (status >> 4) != self.broadcast_counter;
        }

        let data = &mut self.store.hp_data;
        // encoder sign is flipped so extension reads positive
        data.encoder[i] = -buffer.read_i32() + self.hp_settings.encoder_offset[i];
        // load cell reports compression positive; flip to match the
        // pneumatic convention
        data.measured_force[i] = -buffer.read_sgl();
        data.displacement[i] =
            (data.encoder[i] as f32 * self.hp_settings.micrometers_per_encoder)
                / MICROMETERS_PER_METER;
        buffer.skip_to_next_frame();

        self.check_hardpoint_measured_force(i, safety);
    }

    fn hp_adc_scan_rate(
        &mut self,
        buffer: &mut WireBuffer,
        ctx: &FrameContext,
        _sink: &mut dyn EventSink,
        _safety: &mut dyn SafetyReporter,
    ) {
        self.store.hp_info.adc_scan_rate[ctx.channel.data_index] = buffer.read_u8();
        buffer.skip_to_next_frame();
    }

    fn hp_calibration(
        &mut self,
        buffer: &mut WireBuffer,
        ctx: &FrameContext,
        _sink: &mut dyn EventSink,
        _safety: &mut dyn SafetyReporter,
    ) {
        let i = ctx.channel.data_index;
        let info = &mut self.store.hp_info;
        buffer.read_sgl(); // main coefficient channel 1
        buffer.read_sgl(); // main coefficient channel 2
        info.main_load_cell_coefficient[i] = buffer.read_sgl();
        buffer.read_sgl(); // main coefficient channel 4
        info.main_load_cell_offset[i] = buffer.read_sgl();
        buffer.read_sgl(); // main offset channel 2
        buffer.read_sgl(); // main offset channel 3
        buffer.read_sgl(); // main offset channel 4
        info.main_load_cell_sensitivity[i] = buffer.read_sgl();
        buffer.read_sgl(); // main sensitivity channel 2
        buffer.read_sgl(); // main sensitivity channel 3
        buffer.read_sgl(); // main sensitivity channel 4
        buffer.read_sgl(); // backup coefficient channel 1
        buffer.read_sgl(); // backup coefficient channel 2
        info.backup_load_cell_coefficient[i] = buffer.read_sgl();
        buffer.read_sgl(); // backup coefficient channel 4
        info.backup_load_cell_offset[i] = buffer.read_sgl();
        buffer.read_sgl(); // backup offset channel 2
        buffer.read_sgl(); // backup offset channel 3
        buffer.read_sgl(); // backup offset channel 4
        info.backup_load_cell_sensitivity[i] = buffer.read_sgl();
        buffer.read_sgl(); // backup sensitivity channel 2
        buffer.read_sgl(); // backup sensitivity channel 3
        buffer.read_sgl(); // backup sensitivity channel 4
        buffer.skip_to_next_frame();
    }

    // ------------------------------------------------------------------
    // Hardpoint monitor handlers
    // ------------------------------------------------------------------

    fn hm_server_id(
        &mut self,
        buffer: &mut WireBuffer,
        ctx: &FrameContext,
        _sink: &mut dyn EventSink,
        _safety: &mut dyn SafetyReporter,
    ) {
        let i = ctx.channel.data_index;
        let length = buffer.read_u8() as usize;
        let info = &mut self.store.hm_info;
        info.ilc_unique_id[i] = buffer.read_u48();
        info.ilc_application_type[i] = buffer.read_u8();
        info.network_node_type[i] = buffer.read_u8();
        buffer.read_u8(); // selected options
        buffer.read_u8(); // network node options
        info.major_revision[i] = buffer.read_u8();
        info.minor_revision[i] = buffer.read_u8();
        buffer.inc_index(length.saturating_sub(12));
        buffer.skip_to_next_frame();
    }

    fn hm_server_status(
        &mut self,
        buffer: &mut WireBuffer,
        ctx: &FrameContext,
        _sink: &mut dyn EventSink,
        _safety: &mut dyn SafetyReporter,
    ) {
        let i = ctx.channel.data_index;
        self.store.hm_state.ilc_state[i] = buffer.read_u8();
        let status = buffer.read_u16();
        let w = &mut self.store.hm_warning;
        w.major_fault[i] = status & 0x0001 != 0;
        w.minor_fault[i] = status & 0x0002 != 0;
        w.fault_override[i] = status & 0x0008 != 0;
        let faults = buffer.read_u16();
        w.unique_id_crc_error[i] = faults & 0x0001 != 0;
        w.application_type_mismatch[i] = faults & 0x0002 != 0;
        w.application_missing[i] = faults & 0x0004 != 0;
        w.application_crc_mismatch[i] = faults & 0x0008 != 0;
        w.one_wire_missing[i] = faults & 0x0010 != 0;
        w.one_wire1_mismatch[i] = faults & 0x0020 != 0;
        w.one_wire2_mismatch[i] = faults & 0x0040 != 0;
        w.watchdog_reset[i] = faults & 0x0100 != 0;
        w.brownout[i] = faults & 0x0200 != 0;
        w.event_trap_reset[i] = faults & 0x0400 != 0;
        w.ssr_power_fault[i] = faults & 0x1000 != 0;
        w.aux_power_fault[i] = faults & 0x2000 != 0;
        buffer.skip_to_next_frame();
    }

    fn hm_change_mode(
        &mut self,
        buffer: &mut WireBuffer,
        ctx: &FrameContext,
        _sink: &mut dyn EventSink,
        _safety: &mut dyn SafetyReporter,
    ) {
        self.store.hm_state.ilc_state[ctx.channel.data_index] = buffer.read_u16() as u8;
        buffer.skip_to_next_frame();
    }

    fn hm_pressure_values(
        &mut self,
        buffer: &mut WireBuffer,
        ctx: &FrameContext,
        _sink: &mut dyn EventSink,
        safety: &mut dyn SafetyReporter,
    ) {
        let i = ctx.channel.data_index;
        let data = &mut self.store.hm_data;
        data.pressure_sensor1[i] = buffer.read_sgl();
        data.pressure_sensor2[i] = buffer.read_sgl();
        data.pressure_sensor3[i] = buffer.read_sgl();
        data.breakaway_pressure[i] = buffer.read_sgl();
        buffer.skip_to_next_frame();

        self.check_hardpoint_air_pressure(i, safety);
    }

    fn hm_mezzanine_id(
        &mut self,
        buffer: &mut WireBuffer,
        ctx: &FrameContext,
        _sink: &mut dyn EventSink,
        _safety: &mut dyn SafetyReporter,
    ) {
        let i = ctx.channel.data_index;
        let info = &mut self.store.hm_info;
        info.mezzanine_unique_id[i] = buffer.read_u48();
        info.mezzanine_firmware_type[i] = buffer.read_u8();
        info.mezzanine_major_revision[i] = buffer.read_u8();
        info.mezzanine_minor_revision[i] = buffer.read_u8();
        buffer.skip_to_next_frame();
    }

    fn hm_mezzanine_status(
        &mut self,
        buffer: &mut WireBuffer,
        ctx: &FrameContext,
        _sink: &mut dyn EventSink,
        _safety: &mut dyn SafetyReporter,
    ) {
        let i = ctx.channel.data_index;
        let status = buffer.read_u16();
        let w = &mut self.store.hm_warning;
        w.mezzanine_s1a_interface1_fault[i] = status & 0x0001 != 0;
        w.mezzanine_s1a_lvdt1_fault[i] = status & 0x0002 != 0;
        w.mezzanine_s1a_interface2_fault[i] = status & 0x0004 != 0;
        w.mezzanine_s1a_lvdt2_fault[i] = status & 0x0008 != 0;
        w.mezzanine_unique_id_crc_error[i] = status & 0x0010 != 0;
        w.mezzanine_event_trap_reset[i] = status & 0x0100 != 0;
        w.mezzanine_rs422_chip_fault[i] = status & 0x0400 != 0;
        w.mezzanine_application_missing[i] = status & 0x1000 != 0;
        w.mezzanine_application_crc_mismatch[i] = status & 0x2000 != 0;
        w.mezzanine_bootloader_active[i] = status & 0x8000 != 0;
        buffer.skip_to_next_frame();
    }

    fn hm_lvdt(
        &mut self,
        buffer: &mut WireBuffer,
        ctx: &FrameContext,
        _sink: &mut dyn EventSink,
        _safety: &mut dyn SafetyReporter,
    ) {
        let i = ctx.channel.data_index;
        self.store.hm_data.breakaway_lvdt[i] = buffer.read_sgl();
        self.store.hm_data.displacement_lvdt[i] = buffer.read_sgl();
        buffer.skip_to_next_frame();
    }

    // ------------------------------------------------------------------
    // Cross-cutting checks
    // ------------------------------------------------------------------

    fn check_force_actuator_measured_force(
        &mut self,
        channel: &IlcChannel,
        sink: &mut dyn EventSink,
    ) {
        let i = channel.data_index;
        let primary = self.store.fa_data.primary_cylinder_force[i];
        let primary_warning = !self.fa_settings.primary_cylinder_measured_force[i].contains(primary);
        let mut any_change =
            primary_warning != self.store.force_warning.primary_measured_force_warning[i];
        self.store.force_warning.primary_measured_force_warning[i] = primary_warning;

        if let Some(si) = channel.secondary_index {
            let secondary = self.store.fa_data.secondary_cylinder_force[si];
            let secondary_warning =
                !self.fa_settings.secondary_cylinder_measured_force[si].contains(secondary);
            any_change = any_change
                || secondary_warning != self.store.force_warning.secondary_measured_force_warning[i];
            self.store.force_warning.secondary_measured_force_warning[i] = secondary_warning;
        }

        if any_change {
            self.publish_force_warning(sink);
        }
    }

    fn check_force_actuator_following_error(
        &mut self,
        channel: &IlcChannel,
        sink: &mut dyn EventSink,
        safety: &mut dyn SafetyReporter,
    ) {
        let i = channel.data_index;
        let applied = &self.store.applied_cylinder_forces;
        let measured = self.store.fa_data.primary_cylinder_force[i];
        let setpoint = applied.primary_cylinder_force[i] as f32 / MILLINEWTONS_PER_NEWTON;
        let primary_warning =
            (measured - setpoint).abs() > self.fa_settings.primary_cylinder_following_error[i];
        let mut any_change =
            primary_warning != self.store.force_warning.primary_following_error_warning[i];
        self.store.force_warning.primary_following_error_warning[i] = primary_warning;

        let mut secondary_warning = false;
        if let Some(si) = channel.secondary_index {
            let measured = self.store.fa_data.secondary_cylinder_force[si];
            let setpoint = applied.secondary_cylinder_force[si] as f32 / MILLINEWTONS_PER_NEWTON;
            secondary_warning = (measured - setpoint).abs()
                > self.fa_settings.secondary_cylinder_following_error[si];
            any_change = any_change
                || secondary_warning
                    != self.store.force_warning.secondary_following_error_warning[i];
            self.store.force_warning.secondary_following_error_warning[i] = secondary_warning;
        }

        safety.force_actuator_following_error(i, primary_warning || secondary_warning);

        if any_change {
            self.publish_force_warning(sink);
        }
    }

    fn publish_force_warning(&mut self, sink: &mut dyn EventSink) {
        self.store.force_warning.aggregate();
        sink.force_actuator_force_warning(&self.store.force_warning);
    }

    fn check_hardpoint_measured_force(&mut self, data_index: usize, safety: &mut dyn SafetyReporter) {
        let force = self.store.hp_data.measured_force[data_index];
        let settings = &self.hp_settings;
        let load_cell_error = force < settings.measured_force_fault_low
            || force > settings.measured_force_fault_high;
        safety.hardpoint_actuator_load_cell_error(load_cell_error);

        if self.detailed_state.is_active() {
            let (low, high) = if self.balance_forces_applied {
                (
                    settings.balance_force_warning_low,
                    settings.balance_force_warning_high,
                )
            } else {
                (
                    settings.measured_force_warning_low,
                    settings.measured_force_warning_high,
                )
            };
            safety.hardpoint_actuator_measured_force(data_index, force < low || force > high);
        } else {
            safety.hardpoint_actuator_measured_force(data_index, false);
        }
    }

    fn check_hardpoint_air_pressure(&mut self, data_index: usize, safety: &mut dyn SafetyReporter) {
        let pressure = self.store.hm_data.breakaway_pressure[data_index];
        let mut range = PressureRange::InRange;
        if self.detailed_state.monitors_air_pressure() {
            let low = if self.detailed_state.is_raising() {
                self.hp_settings.air_pressure_fault_low_raising
            } else {
                self.hp_settings.air_pressure_fault_low
            };
            if pressure < low {
                range = PressureRange::BelowMinimum;
            } else if pressure > self.hp_settings.air_pressure_fault_high {
                range = PressureRange::AboveMaximum;
            }
        }
        safety.hardpoint_actuator_air_pressure(data_index, range, pressure);
    }
}
