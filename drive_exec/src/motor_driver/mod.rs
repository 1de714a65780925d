//! # Motor Driver Module
//!
//! This module provides a unified interface over the boards which drive the rover's wheel groups.
//! A [`MotorDriver`] only knows about wheel groups and levels, the mapping from manouvres to
//! demands lives in [`crate::drive_ctrl`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// [`MotorDriver`] implementation for an L298N style dual H-bridge on the Raspberry Pi GPIO.
#[cfg(all(target_os = "linux", any(target_arch = "arm", target_arch = "aarch64")))]
pub mod l298n;

/// Simulated [`MotorDriver`] which records every write.
pub mod sim;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::drive::{WheelDems, WheelGroup};
use serde::{Deserialize, Serialize};

use crate::params::DriveParams;

pub use sim::{SimMotorDriver, SimMotorLog};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Trait to provide a unified API for the motor driver boards.
pub trait MotorDriver: Send {
    /// Set the direction and duty cycle of one wheel group.
    ///
    /// ## Arguments
    /// - `group` - The wheel group to set
    /// - `dems` - The demand to apply. The duty cycle has already been clamped into `[0, 100]` by
    ///   the caller.
    ///
    /// Writes are level triggered, setting the same demand twice has no further effect.
    fn set_group(&mut self, group: WheelGroup, dems: WheelDems) -> Result<(), MotorError>;
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Motor driver back ends which can be selected in the parameters.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotorDriverKind {
    L298n,
    Sim,
}

#[derive(thiserror::Error, Debug)]
pub enum MotorError {
    #[error("GPIO error: {0}")]
    Gpio(String),

    #[error("The {0:?} motor driver is not available on this platform")]
    Unsupported(MotorDriverKind),

    #[error("Simulated write failure on the {0:?} group")]
    SimFailure(WheelGroup),
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Create the motor driver selected in the parameters.
pub fn create(params: &DriveParams) -> Result<Box<dyn MotorDriver>, MotorError> {
    match params.motors {
        MotorDriverKind::Sim => Ok(Box::new(SimMotorDriver::new(SimMotorLog::default()))),

        #[cfg(all(target_os = "linux", any(target_arch = "arm", target_arch = "aarch64")))]
        MotorDriverKind::L298n => Ok(Box::new(l298n::L298n::new(params)?)),

        #[cfg(not(all(target_os = "linux", any(target_arch = "arm", target_arch = "aarch64"))))]
        MotorDriverKind::L298n => Err(MotorError::Unsupported(MotorDriverKind::L298n)),
    }
}
