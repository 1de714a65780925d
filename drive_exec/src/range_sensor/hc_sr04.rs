//! [`RangeSensor`] implementation for the HC-SR04 ultrasonic ranger
//!
//! A 10 us pulse on the trigger pin starts a measurement. The sensor then raises the echo pin for
//! as long as the sound took to travel out and back.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::thread;
use std::time::{Duration, Instant};

use log::debug;
use rppal::gpio::{Gpio, InputPin, OutputPin};

use super::{RangeSensor, SensorError};
use crate::params::MonitorParams;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Speed of sound in air at roughly 20 degrees C.
///
/// Units: meters/second
const SPEED_OF_SOUND_MS: f64 = 343.0;

const TRIGGER_PULSE: Duration = Duration::from_micros(10);

const TRIGGER_SETTLE: Duration = Duration::from_micros(2);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct HcSr04 {
    trigger: OutputPin,
    echo: InputPin,
    threshold_m: f64,
    echo_timeout: Duration,
    max_distance_m: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl HcSr04 {
    pub fn new(params: &MonitorParams) -> Result<Self, SensorError> {
        let gpio = Gpio::new().map_err(gpio_err)?;

        let trigger = gpio
            .get(params.trigger_pin)
            .map_err(gpio_err)?
            .into_output_low();
        let echo = gpio.get(params.echo_pin).map_err(gpio_err)?.into_input();

        debug!(
            "HC-SR04 initialised, trigger on {}, echo on {}",
            params.trigger_pin, params.echo_pin
        );

        Ok(Self {
            trigger,
            echo,
            threshold_m: params.threshold_m,
            echo_timeout: Duration::from_secs_f64(params.echo_timeout_s),
            max_distance_m: params.max_distance_m,
        })
    }
}

impl RangeSensor for HcSr04 {
    fn distance_m(&mut self) -> Result<f64, SensorError> {
        let timeout_s = self.echo_timeout.as_secs_f64();

        self.trigger.set_low();
        thread::sleep(TRIGGER_SETTLE);
        self.trigger.set_high();
        thread::sleep(TRIGGER_PULSE);
        self.trigger.set_low();

        // Wait for the echo to start
        let wait_start = Instant::now();
        while self.echo.is_low() {
            if wait_start.elapsed() > self.echo_timeout {
                return Err(SensorError::NoEcho(timeout_s));
            }
        }

        // Time the echo pulse
        let pulse_start = Instant::now();
        while self.echo.is_high() {
            if pulse_start.elapsed() > self.echo_timeout {
                return Err(SensorError::EchoTimeout(timeout_s));
            }
        }
        let pulse_s = pulse_start.elapsed().as_secs_f64();

        Ok((pulse_s * SPEED_OF_SOUND_MS / 2.0).min(self.max_distance_m))
    }

    fn threshold_m(&self) -> f64 {
        self.threshold_m
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn gpio_err(e: rppal::gpio::Error) -> SensorError {
    SensorError::Gpio(e.to_string())
}
