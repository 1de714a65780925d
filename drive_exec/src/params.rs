//! # Drive Executable Parameters
//!
//! This module provide parameters for the drive executable, loaded from `drive_exec.toml`. Any
//! section or key missing from the file takes its default value.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{net::NetParams, tc::SpeedLevel};
use serde::{Deserialize, Serialize};

use crate::{
    motor_driver::MotorDriverKind, obstacle_monitor::SensorFaultPolicy, range_sensor::SensorKind,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Longest period or timeout accepted from the parameter file.
///
/// Units: seconds
const MAX_DURATION_S: f64 = 3600.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveExecParams {
    pub net: NetParams,

    pub drive: DriveParams,

    pub monitor: MonitorParams,

    pub tm: TmParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveParams {
    /// Speed level used until the first speed command arrives
    pub default_speed: SpeedLevel,

    pub motors: MotorDriverKind,

    // ---- L298N ----
    pub left_pins: L298nPins,

    pub right_pins: L298nPins,

    /// Frequency of the software PWM on the enable pins.
    ///
    /// Units: Hertz
    pub pwm_frequency_hz: f64,
}

/// BCM pin numbers for one side of an L298N board.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct L298nPins {
    pub fwd: u8,
    pub rev: u8,
    pub en: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorParams {
    /// Period of the monitor loop.
    ///
    /// Units: seconds
    pub period_s: f64,

    /// Distance at or below which forward motion is stopped.
    ///
    /// Units: meters
    pub threshold_m: f64,

    pub sensor_fault_policy: SensorFaultPolicy,

    pub sensor: SensorKind,

    // ---- HC-SR04 ----
    pub trigger_pin: u8,

    pub echo_pin: u8,

    /// Maximum time to wait for each edge of the echo pulse.
    ///
    /// Units: seconds
    pub echo_timeout_s: f64,

    /// Readings are capped at this distance.
    ///
    /// Units: meters
    pub max_distance_m: f64,

    // ---- SIM ----
    /// Initial reading of the simulated sensor.
    ///
    /// Units: meters
    pub sim_distance_m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TmParams {
    /// Period between telemetry packets.
    ///
    /// Units: seconds
    pub period_s: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParamsError {
    #[error("{0} must be greater than 0 and at most 3600 s, found {1}")]
    InvalidDuration(&'static str, f64),

    #[error("{0} must be a finite value greater than 0, found {1}")]
    NotPositive(&'static str, f64),

    #[error("{0} must not be 0")]
    Zero(&'static str),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DriveExecParams {
    /// Switch every hardware back end to its simulated equivalent.
    pub fn use_sim(&mut self) {
        self.drive.motors = MotorDriverKind::Sim;
        self.monitor.sensor = SensorKind::Sim;
    }

    /// Check the values deserialisation can't, returning the first invalid one.
    pub fn validate(&self) -> Result<(), ParamsError> {
        check_duration("monitor.period_s", self.monitor.period_s)?;
        check_duration("monitor.echo_timeout_s", self.monitor.echo_timeout_s)?;
        check_duration("tm.period_s", self.tm.period_s)?;

        check_positive("monitor.threshold_m", self.monitor.threshold_m)?;
        check_positive("monitor.max_distance_m", self.monitor.max_distance_m)?;
        check_positive("drive.pwm_frequency_hz", self.drive.pwm_frequency_hz)?;

        // The simulated sensor may start right against an obstacle
        if !(self.monitor.sim_distance_m.is_finite() && self.monitor.sim_distance_m >= 0.0) {
            return Err(ParamsError::NotPositive(
                "monitor.sim_distance_m",
                self.monitor.sim_distance_m,
            ));
        }

        if self.net.max_msg_len == 0 {
            return Err(ParamsError::Zero("net.max_msg_len"));
        }

        Ok(())
    }
}

impl Default for DriveParams {
    fn default() -> Self {
        Self {
            default_speed: SpeedLevel::default(),
            motors: MotorDriverKind::L298n,
            left_pins: L298nPins {
                fwd: 20,
                rev: 21,
                en: 16,
            },
            right_pins: L298nPins {
                fwd: 26,
                rev: 19,
                en: 13,
            },
            pwm_frequency_hz: 1000.0,
        }
    }
}

impl Default for MonitorParams {
    fn default() -> Self {
        Self {
            period_s: 0.05,
            threshold_m: 0.3,
            sensor_fault_policy: SensorFaultPolicy::FailOpen,
            sensor: SensorKind::HcSr04,
            trigger_pin: 23,
            echo_pin: 24,
            echo_timeout_s: 0.03,
            max_distance_m: 4.0,
            sim_distance_m: 1.0,
        }
    }
}

impl Default for TmParams {
    fn default() -> Self {
        Self { period_s: 0.2 }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn check_duration(name: &'static str, value_s: f64) -> Result<(), ParamsError> {
    // Written so that NaN fails
    if value_s > 0.0 && value_s <= MAX_DURATION_S {
        Ok(())
    } else {
        Err(ParamsError::InvalidDuration(name, value_s))
    }
}

fn check_positive(name: &'static str, value: f64) -> Result<(), ParamsError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ParamsError::NotPositive(name, value))
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_file() {
        let params: DriveExecParams = toml::from_str(
            r#"
            [drive]
            motors = "sim"
            default_speed = "high"

            [monitor]
            sensor_fault_policy = "fail_closed"
            "#,
        )
        .unwrap();

        assert_eq!(params.drive.motors, MotorDriverKind::Sim);
        assert_eq!(params.drive.default_speed, SpeedLevel::High);
        assert_eq!(params.drive.left_pins.en, 16);
        assert_eq!(
            params.monitor.sensor_fault_policy,
            SensorFaultPolicy::FailClosed
        );
        assert_eq!(params.monitor.sensor, SensorKind::HcSr04);
        assert_eq!(params.net.tc_endpoint, "0.0.0.0:5000");
        assert_eq!(params.tm.period_s, 0.2);
    }

    #[test]
    fn test_use_sim() {
        let mut params = DriveExecParams::default();
        params.use_sim();

        assert_eq!(params.drive.motors, MotorDriverKind::Sim);
        assert_eq!(params.monitor.sensor, SensorKind::Sim);
    }

    #[test]
    fn test_validate() {
        assert_eq!(DriveExecParams::default().validate(), Ok(()));

        let mut params = DriveExecParams::default();
        params.monitor.period_s = -0.05;
        assert_eq!(
            params.validate(),
            Err(ParamsError::InvalidDuration("monitor.period_s", -0.05))
        );

        let mut params = DriveExecParams::default();
        params.tm.period_s = 0.0;
        assert!(matches!(
            params.validate(),
            Err(ParamsError::InvalidDuration("tm.period_s", _))
        ));

        let mut params = DriveExecParams::default();
        params.monitor.echo_timeout_s = f64::NAN;
        assert!(matches!(
            params.validate(),
            Err(ParamsError::InvalidDuration("monitor.echo_timeout_s", _))
        ));

        let mut params = DriveExecParams::default();
        params.monitor.period_s = 1e300;
        assert!(params.validate().is_err());

        let mut params = DriveExecParams::default();
        params.monitor.threshold_m = f64::INFINITY;
        assert!(matches!(
            params.validate(),
            Err(ParamsError::NotPositive("monitor.threshold_m", _))
        ));

        let mut params = DriveExecParams::default();
        params.net.max_msg_len = 0;
        assert_eq!(
            params.validate(),
            Err(ParamsError::Zero("net.max_msg_len"))
        );
    }

    #[test]
    fn test_validate_file_values() {
        let params: DriveExecParams = toml::from_str(
            r#"
            [monitor]
            period_s = -0.05
            "#,
        )
        .unwrap();

        assert!(params.validate().is_err());
    }
}
