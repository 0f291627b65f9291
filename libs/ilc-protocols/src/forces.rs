//! Cylinder-space to mirror-space force conversion.
//!
//! Dual-axis actuators mount their secondary (lateral) cylinder at 45
//! degrees, so a secondary force contributes equally along the actuator's
//! orientation axis and the mirror Z axis. Single-axis actuators push along
//! Z only.

use crate::subnet::Orientation;

/// cos(45 deg); projection factor of the secondary cylinder onto each axis
pub const RECIPROCAL_SQRT2: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// Force decomposed along the mirror coordinate axes, newtons.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MirrorForces {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Converts a single-axis actuator's primary cylinder force to mirror space.
pub fn saa_to_mirror(primary: f32) -> MirrorForces {
    MirrorForces {
        x: 0.0,
        y: 0.0,
        z: primary,
    }
}

/// Converts a dual-axis actuator's cylinder forces to mirror space.
///
/// The orientation names the axis and sign of the secondary cylinder's
/// lateral component.
pub fn daa_to_mirror(orientation: Orientation, primary: f32, secondary: f32) -> MirrorForces {
    let lateral = secondary * RECIPROCAL_SQRT2;
    let z = primary + lateral;
    match orientation {
        Orientation::PositiveX => MirrorForces { x: lateral, y: 0.0, z },
        Orientation::NegativeX => MirrorForces { x: -lateral, y: 0.0, z },
        Orientation::PositiveY => MirrorForces { x: 0.0, y: lateral, z },
        Orientation::NegativeY => MirrorForces { x: 0.0, y: -lateral, z },
        Orientation::None => saa_to_mirror(primary),
    }
}
