//! Drive actuator, applies demands through a motor driver

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::drive::{DriveDems, WheelGroup};

use crate::motor_driver::{MotorDriver, MotorError};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Owns the motor driver and remembers the last demands it applied.
pub struct DriveActuator {
    driver: Box<dyn MotorDriver>,

    last_applied: Option<DriveDems>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DriveActuator {
    pub fn new(driver: Box<dyn MotorDriver>) -> Self {
        Self {
            driver,
            last_applied: None,
        }
    }

    /// Apply demands to both wheel groups.
    ///
    /// Duty cycles are clamped into `[0, 100]` rather than rejected. The applied demands are only
    /// recorded once both groups have been written successfully.
    pub fn apply(&mut self, dems: DriveDems) -> Result<DriveDems, MotorError> {
        let dems = dems.clamped();

        self.driver.set_group(WheelGroup::Left, dems.left)?;
        self.driver.set_group(WheelGroup::Right, dems.right)?;

        self.last_applied = Some(dems);

        Ok(dems)
    }

    /// The last demands successfully applied, or `None` before the first write.
    pub fn last_applied(&self) -> Option<DriveDems> {
        self.last_applied
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
