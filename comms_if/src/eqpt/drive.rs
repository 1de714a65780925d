//! # Drive Equipment Demands
//!
//! The rover has four wheels in two groups. Each group is driven by one motor channel, so a
//! demand is a direction and a duty cycle per group rather than per wheel.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Maximum duty cycle that can be demanded of a wheel group.
///
/// Units: percent
pub const MAX_DUTY_PCT: f64 = 100.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Demand for a single wheel group.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct WheelDems {
    /// Direction the group shall turn in
    pub dir: WheelDir,

    /// PWM duty cycle applied to the group's enable line.
    ///
    /// Units: percent, between 0 and 100
    pub duty_pct: f64,
}

/// Demands for both wheel groups of the rover.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct DriveDems {
    pub left: WheelDems,
    pub right: WheelDems,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Direction of a wheel group.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WheelDir {
    Forward,
    Reverse,

    /// Both bridge inputs low, the motor coasts
    Neutral,
}

/// The two independently driven sides of the rover.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum WheelGroup {
    Left,
    Right,
}

/// IDs of the individual wheels, as shown on the dashboard.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum WheelId {
    #[serde(rename = "L_Front")]
    LFront,
    #[serde(rename = "L_Rear")]
    LRear,
    #[serde(rename = "R_Front")]
    RFront,
    #[serde(rename = "R_Rear")]
    RRear,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl WheelDems {
    /// A coasting wheel group with no drive.
    pub const NEUTRAL: Self = Self {
        dir: WheelDir::Neutral,
        duty_pct: 0.0,
    };

    pub fn new(dir: WheelDir, duty_pct: f64) -> Self {
        Self { dir, duty_pct }
    }

    /// Return a copy of the demand with the duty cycle clamped into `[0, 100]`.
    ///
    /// A NaN duty cycle is treated as zero.
    pub fn clamped(self) -> Self {
        let duty_pct = if self.duty_pct.is_nan() {
            0.0
        } else {
            self.duty_pct.clamp(0.0, MAX_DUTY_PCT)
        };

        Self { duty_pct, ..self }
    }
}

impl DriveDems {
    /// Both groups neutral at zero duty.
    pub const STOP: Self = Self {
        left: WheelDems::NEUTRAL,
        right: WheelDems::NEUTRAL,
    };

    /// Return a copy of the demands with both duty cycles clamped, see [`WheelDems::clamped`].
    pub fn clamped(self) -> Self {
        Self {
            left: self.left.clamped(),
            right: self.right.clamped(),
        }
    }

    /// Get the demand for one wheel group.
    pub fn group(&self, group: WheelGroup) -> WheelDems {
        match group {
            WheelGroup::Left => self.left,
            WheelGroup::Right => self.right,
        }
    }

    /// Get the demand seen by an individual wheel.
    pub fn wheel(&self, id: WheelId) -> WheelDems {
        self.group(id.group())
    }

    /// True if neither group is being driven.
    pub fn is_stop(&self) -> bool {
        [self.left, self.right]
            .iter()
            .all(|w| w.dir == WheelDir::Neutral || w.duty_pct == 0.0)
    }
}

impl WheelId {
    pub const ALL: [WheelId; 4] = [
        WheelId::LFront,
        WheelId::LRear,
        WheelId::RFront,
        WheelId::RRear,
    ];

    /// The wheel group this wheel belongs to.
    pub fn group(&self) -> WheelGroup {
        match self {
            WheelId::LFront | WheelId::LRear => WheelGroup::Left,
            WheelId::RFront | WheelId::RRear => WheelGroup::Right,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
