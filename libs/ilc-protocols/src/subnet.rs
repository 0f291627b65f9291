//! Subnet/address to channel resolution.
//!
//! Every ILC is identified on the wire by its subnet (1..=5) and bus address.
//! `SubnetAddressMap` resolves that pair to a channel descriptor carrying the
//! device type and the indices under which the channel's telemetry is stored.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{IlcError, Result};
use crate::settings::{ForceActuatorTableRow, IlcTableRow};

/// Kind of device behind a bus address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    ForceActuator,
    HardpointActuator,
    HardpointMonitor,
}

/// Lateral orientation of a dual-axis actuator's secondary cylinder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    #[serde(rename = "+X")]
    PositiveX,
    #[serde(rename = "-X")]
    NegativeX,
    #[serde(rename = "+Y")]
    PositiveY,
    #[serde(rename = "-Y")]
    NegativeY,
    #[serde(rename = "NA")]
    None,
}

/// Resolved channel descriptor for one ILC.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IlcChannel {
    pub device: DeviceType,
    pub actuator_id: i32,
    pub subnet: u8,
    pub address: u8,
    /// Index into the per-device telemetry arrays
    pub data_index: usize,
    /// Index into the secondary-cylinder arrays, dual-axis actuators only
    pub secondary_index: Option<usize>,
    /// Index into the X force array, X-oriented dual-axis actuators only
    pub x_index: Option<usize>,
    /// Index into the Y force array, Y-oriented dual-axis actuators only
    pub y_index: Option<usize>,
    pub orientation: Orientation,
}

impl IlcChannel {
    /// True for dual-axis force actuators (address above the single-axis range).
    pub fn is_dual_axis(&self) -> bool {
        self.secondary_index.is_some()
    }
}

/// Lookup table from (subnet, address) to channel, built once from the
/// actuator tables at startup.
#[derive(Debug, Clone)]
pub struct SubnetAddressMap {
    channels: Vec<Option<IlcChannel>>,
    fa_ids: Vec<i32>,
    hp_ids: Vec<i32>,
    hm_ids: Vec<i32>,
}

fn slot(subnet: u8, address: u8) -> usize {
    usize::from(subnet) * 256 + usize::from(address)
}

impl SubnetAddressMap {
    /// Builds the map from the three actuator tables, assigning telemetry
    /// indices in table order.
    pub fn new(
        force_actuators: &[ForceActuatorTableRow],
        hardpoints: &[IlcTableRow],
        monitors: &[IlcTableRow],
    ) -> Result<Self> {
        let mut map = SubnetAddressMap {
            channels: vec![None; (SUBNET_COUNT + 1) * 256],
            fa_ids: Vec::with_capacity(force_actuators.len()),
            hp_ids: Vec::with_capacity(hardpoints.len()),
            hm_ids: Vec::with_capacity(monitors.len()),
        };

        let mut secondary = 0usize;
        let mut x = 0usize;
        let mut y = 0usize;
        for (data_index, row) in force_actuators.iter().enumerate() {
            if !(1..=4).contains(&row.subnet) {
                return Err(IlcError::config(format!(
                    "force actuator {} on invalid subnet {}",
                    row.actuator_id, row.subnet
                )));
            }
            if row.address < 1 || row.address > FA_DAA_ADDRESS_MAX {
                return Err(IlcError::config(format!(
                    "force actuator {} at invalid address {}",
                    row.actuator_id, row.address
                )));
            }
            let dual_axis = row.address > FA_SAA_ADDRESS_MAX;
            if dual_axis == matches!(row.orientation, Orientation::None) {
                return Err(IlcError::config(format!(
                    "force actuator {} orientation does not match its address class",
                    row.actuator_id
                )));
            }
            let channel = IlcChannel {
                device: DeviceType::ForceActuator,
                actuator_id: row.actuator_id,
                subnet: row.subnet,
                address: row.address,
                data_index,
                secondary_index: dual_axis.then(|| {
                    secondary += 1;
                    secondary - 1
                }),
                x_index: matches!(
                    row.orientation,
                    Orientation::PositiveX | Orientation::NegativeX
                )
                .then(|| {
                    x += 1;
                    x - 1
                }),
                y_index: matches!(
                    row.orientation,
                    Orientation::PositiveY | Orientation::NegativeY
                )
                .then(|| {
                    y += 1;
                    y - 1
                }),
                orientation: row.orientation,
            };
            map.insert(channel)?;
            map.fa_ids.push(row.actuator_id);
        }

        for (data_index, row) in hardpoints.iter().enumerate() {
            if row.subnet != 5 || row.address < 1 || row.address > HP_COUNT as u8 {
                return Err(IlcError::config(format!(
                    "hardpoint actuator {} at invalid subnet {} address {}",
                    row.actuator_id, row.subnet, row.address
                )));
            }
            map.insert(IlcChannel {
                device: DeviceType::HardpointActuator,
                actuator_id: row.actuator_id,
                subnet: row.subnet,
                address: row.address,
                data_index,
                secondary_index: None,
                x_index: None,
                y_index: None,
                orientation: Orientation::None,
            })?;
            map.hp_ids.push(row.actuator_id);
        }

        for (data_index, row) in monitors.iter().enumerate() {
            if row.subnet != 5
                || row.address < HM_ADDRESS_MIN
                || row.address >= HM_ADDRESS_MIN + HM_COUNT as u8
            {
                return Err(IlcError::config(format!(
                    "hardpoint monitor {} at invalid subnet {} address {}",
                    row.actuator_id, row.subnet, row.address
                )));
            }
            map.insert(IlcChannel {
                device: DeviceType::HardpointMonitor,
                actuator_id: row.actuator_id,
                subnet: row.subnet,
                address: row.address,
                data_index,
                secondary_index: None,
                x_index: None,
                y_index: None,
                orientation: Orientation::None,
            })?;
            map.hm_ids.push(row.actuator_id);
        }

        if map.fa_ids.len() > FA_COUNT
            || map.hp_ids.len() > HP_COUNT
            || map.hm_ids.len() > HM_COUNT
        {
            return Err(IlcError::config("actuator table exceeds channel capacity"));
        }

        Ok(map)
    }

    fn insert(&mut self, channel: IlcChannel) -> Result<()> {
        let slot = slot(channel.subnet, channel.address);
        if self.channels[slot].is_some() {
            return Err(IlcError::config(format!(
                "duplicate channel at subnet {} address {}",
                channel.subnet, channel.address
            )));
        }
        self.channels[slot] = Some(channel);
        Ok(())
    }

    /// Resolves a subnet/address pair. `None` for unknown devices or
    /// out-of-range subnets.
    pub fn lookup(&self, subnet: u8, address: u8) -> Option<&IlcChannel> {
        if subnet as usize > SUBNET_COUNT {
            return None;
        }
        self.channels[slot(subnet, address)].as_ref()
    }

    /// Channels of one device type on one subnet, in address order.
    pub fn channels_on(
        &self,
        subnet: u8,
        device: DeviceType,
    ) -> impl Iterator<Item = &IlcChannel> {
        let range = if (subnet as usize) <= SUBNET_COUNT {
            &self.channels[slot(subnet, 0)..slot(subnet, 0) + 256]
        } else {
            &[]
        };
        range
            .iter()
            .filter_map(move |c| c.as_ref().filter(|c| c.device == device))
    }

    /// Actuator ids indexed by force actuator data index.
    pub fn force_actuator_ids(&self) -> &[i32] {
        &self.fa_ids
    }

    /// Actuator ids indexed by hardpoint data index.
    pub fn hardpoint_ids(&self) -> &[i32] {
        &self.hp_ids
    }

    /// Actuator ids indexed by hardpoint monitor data index.
    pub fn hardpoint_monitor_ids(&self) -> &[i32] {
        &self.hm_ids
    }

    pub fn force_actuator_count(&self) -> usize {
        self.fa_ids.len()
    }

    pub fn hardpoint_count(&self) -> usize {
        self.hp_ids.len()
    }

    pub fn hardpoint_monitor_count(&self) -> usize {
        self.hm_ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{ForceActuatorTableRow, IlcTableRow};

    fn small_map() -> SubnetAddressMap {
        SubnetAddressMap::new(
            &[
                ForceActuatorTableRow {
                    actuator_id: 101,
                    subnet: 1,
                    address: 1,
                    orientation: Orientation::None,
                },
                ForceActuatorTableRow {
                    actuator_id: 117,
                    subnet: 1,
                    address: 17,
                    orientation: Orientation::PositiveY,
                },
                ForceActuatorTableRow {
                    actuator_id: 218,
                    subnet: 2,
                    address: 18,
                    orientation: Orientation::NegativeX,
                },
            ],
            &[IlcTableRow {
                actuator_id: 1,
                subnet: 5,
                address: 1,
            }],
            &[IlcTableRow {
                actuator_id: 84,
                subnet: 5,
                address: 84,
            }],
        )
        .unwrap()
    }

    #[test]
    fn test_index_assignment() {
        let map = small_map();

        let saa = map.lookup(1, 1).unwrap();
        assert_eq!(saa.device, DeviceType::ForceActuator);
        assert_eq!(saa.data_index, 0);
        assert!(!saa.is_dual_axis());
        assert_eq!(saa.secondary_index, None);

        let daa_y = map.lookup(1, 17).unwrap();
        assert_eq!(daa_y.data_index, 1);
        assert_eq!(daa_y.secondary_index, Some(0));
        assert_eq!(daa_y.y_index, Some(0));
        assert_eq!(daa_y.x_index, None);

        let daa_x = map.lookup(2, 18).unwrap();
        assert_eq!(daa_x.secondary_index, Some(1));
        assert_eq!(daa_x.x_index, Some(0));

        assert_eq!(map.lookup(5, 1).unwrap().device, DeviceType::HardpointActuator);
        assert_eq!(map.lookup(5, 84).unwrap().device, DeviceType::HardpointMonitor);
    }

    #[test]
    fn test_unknown_lookups() {
        let map = small_map();
        assert!(map.lookup(1, 2).is_none());
        assert!(map.lookup(3, 1).is_none());
        assert!(map.lookup(6, 1).is_none());
        assert!(map.lookup(0, 1).is_none());
    }

    #[test]
    fn test_reverse_id_tables() {
        let map = small_map();
        assert_eq!(map.force_actuator_ids(), &[101, 117, 218]);
        assert_eq!(map.hardpoint_ids(), &[1]);
        assert_eq!(map.hardpoint_monitor_ids(), &[84]);
    }

    #[test]
    fn test_duplicate_rejected() {
        let rows = [
            ForceActuatorTableRow {
                actuator_id: 1,
                subnet: 1,
                address: 1,
                orientation: Orientation::None,
            },
            ForceActuatorTableRow {
                actuator_id: 2,
                subnet: 1,
                address: 1,
                orientation: Orientation::None,
            },
        ];
        assert!(SubnetAddressMap::new(&rows, &[], &[]).is_err());
    }

    #[test]
    fn test_orientation_class_mismatch_rejected() {
        let rows = [ForceActuatorTableRow {
            actuator_id: 1,
            subnet: 1,
            address: 17,
            orientation: Orientation::None,
        }];
        assert!(SubnetAddressMap::new(&rows, &[], &[]).is_err());
    }

    #[test]
    fn test_channels_on_subnet() {
        let map = small_map();
        let fa_subnet1: Vec<u8> = map
            .channels_on(1, DeviceType::ForceActuator)
            .map(|c| c.address)
            .collect();
        assert_eq!(fa_subnet1, vec![1, 17]);
        assert_eq!(map.channels_on(5, DeviceType::ForceActuator).count(), 0);
        assert_eq!(map.channels_on(5, DeviceType::HardpointMonitor).count(), 1);
    }
}
