//! # Range Sensor Module
//!
//! Forward facing distance sensors used by the obstacle monitor.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// HC-SR04 ultrasonic ranger on the Raspberry Pi GPIO.
#[cfg(all(target_os = "linux", any(target_arch = "arm", target_arch = "aarch64")))]
pub mod hc_sr04;

/// Simulated range sensor with a settable distance.
pub mod sim;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::params::MonitorParams;

pub use sim::{SimRange, SimRangeSensor};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A sensor measuring the distance to the nearest object in front of the rover.
pub trait RangeSensor: Send {
    /// Take a single reading.
    ///
    /// Units: meters
    fn distance_m(&mut self) -> Result<f64, SensorError>;

    /// Distance at or below which an object counts as an obstacle.
    ///
    /// Units: meters
    fn threshold_m(&self) -> f64;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single classified reading, as reported in telemetry.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeReport {
    /// Units: meters
    pub distance_m: f64,

    /// Units: meters
    pub threshold_m: f64,

    pub proximity: Proximity,

    /// Time at which the reading was taken
    pub timestamp: DateTime<Utc>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Range sensor back ends which can be selected in the parameters.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    HcSr04,
    Sim,
}

/// Whether the nearest object is within the obstacle threshold.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum Proximity {
    #[serde(rename = "In range")]
    InRange,

    #[serde(rename = "Out of range")]
    OutOfRange,
}

#[derive(thiserror::Error, Debug)]
pub enum SensorError {
    #[error("GPIO error: {0}")]
    Gpio(String),

    #[error("No echo was received within {0} s of the trigger pulse")]
    NoEcho(f64),

    #[error("The echo pulse did not end within {0} s")]
    EchoTimeout(f64),

    #[error("The {0:?} sensor is not available on this platform")]
    Unsupported(SensorKind),

    #[error("Range reading {0} m is not a valid distance")]
    InvalidReading(f64),

    #[error("Simulated sensor fault")]
    SimFault,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RangeReport {
    pub fn new(distance_m: f64, threshold_m: f64) -> Self {
        Self {
            distance_m,
            threshold_m,
            proximity: Proximity::classify(distance_m, threshold_m),
            timestamp: Utc::now(),
        }
    }
}

impl Proximity {
    pub fn classify(distance_m: f64, threshold_m: f64) -> Self {
        if distance_m <= threshold_m {
            Proximity::InRange
        } else {
            Proximity::OutOfRange
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Create the range sensor selected in the parameters.
pub fn create(params: &MonitorParams) -> Result<Box<dyn RangeSensor>, SensorError> {
    match params.sensor {
        SensorKind::Sim => Ok(Box::new(SimRangeSensor::new(
            SimRange::new(params.sim_distance_m),
            params.threshold_m,
        ))),

        #[cfg(all(target_os = "linux", any(target_arch = "arm", target_arch = "aarch64")))]
        SensorKind::HcSr04 => Ok(Box::new(hc_sr04::HcSr04::new(params)?)),

        #[cfg(not(all(target_os = "linux", any(target_arch = "arm", target_arch = "aarch64"))))]
        SensorKind::HcSr04 => Err(SensorError::Unsupported(SensorKind::HcSr04)),
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
