//! Safety reporting interface.
//!
//! The decoder reports cross-cutting check outcomes through
//! [`SafetyReporter`] every evaluation, clear or not, so the receiving side
//! always holds the current condition.

use serde::{Deserialize, Serialize};

/// Mirror support system state, as far as the communication stack needs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetailedState {
    Standby,
    Disabled,
    Parked,
    ParkedEngineering,
    Raising,
    RaisingEngineering,
    Active,
    ActiveEngineering,
    Lowering,
    LoweringEngineering,
    Fault,
    Offline,
}

impl DetailedState {
    /// States in which the mirror carries its operating load.
    pub fn is_active(self) -> bool {
        matches!(self, DetailedState::Active | DetailedState::ActiveEngineering)
    }

    /// States in which the mirror is being raised.
    pub fn is_raising(self) -> bool {
        matches!(
            self,
            DetailedState::Raising | DetailedState::RaisingEngineering
        )
    }

    /// States in which breakaway air pressure is evaluated against limits.
    pub fn monitors_air_pressure(self) -> bool {
        self.is_raising()
            || self.is_active()
            || matches!(
                self,
                DetailedState::Lowering | DetailedState::LoweringEngineering
            )
    }
}

/// Classification of a breakaway pressure reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PressureRange {
    BelowMinimum,
    InRange,
    AboveMaximum,
}

/// Receives per-cycle safety conditions from the decoder.
pub trait SafetyReporter {
    /// Any channel missed its expected response this cycle.
    fn ilc_communication_timeout(&mut self, any_timeout: bool);

    /// Force actuator following error state, by data index.
    fn force_actuator_following_error(&mut self, data_index: usize, warning: bool);

    /// Any hardpoint load cell outside its fault band.
    fn hardpoint_actuator_load_cell_error(&mut self, error: bool);

    /// Hardpoint measured force outside the applicable warning band.
    fn hardpoint_actuator_measured_force(&mut self, data_index: usize, warning: bool);

    /// Breakaway air pressure classification for one hardpoint monitor.
    fn hardpoint_actuator_air_pressure(
        &mut self,
        data_index: usize,
        range: PressureRange,
        pressure: f32,
    );
}

/// Reporter that records nothing. Engineering utilities and tests.
#[derive(Debug, Default)]
pub struct NullSafetyReporter;

impl SafetyReporter for NullSafetyReporter {
    fn ilc_communication_timeout(&mut self, _any_timeout: bool) {}
    fn force_actuator_following_error(&mut self, _data_index: usize, _warning: bool) {}
    fn hardpoint_actuator_load_cell_error(&mut self, _error: bool) {}
    fn hardpoint_actuator_measured_force(&mut self, _data_index: usize, _warning: bool) {}
    fn hardpoint_actuator_air_pressure(
        &mut self,
        _data_index: usize,
        _range: PressureRange,
        _pressure: f32,
    ) {
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_families() {
        assert!(DetailedState::Active.is_active());
        assert!(DetailedState::ActiveEngineering.is_active());
        assert!(!DetailedState::Raising.is_active());

        assert!(DetailedState::RaisingEngineering.is_raising());
        assert!(!DetailedState::Lowering.is_raising());

        for state in [
            DetailedState::Raising,
            DetailedState::RaisingEngineering,
            DetailedState::Active,
            DetailedState::ActiveEngineering,
            DetailedState::Lowering,
            DetailedState::LoweringEngineering,
        ] {
            assert!(state.monitors_air_pressure());
        }
        for state in [
            DetailedState::Standby,
            DetailedState::Parked,
            DetailedState::ParkedEngineering,
            DetailedState::Fault,
        ] {
            assert!(!state.monitors_air_pressure());
        }
    }
}
