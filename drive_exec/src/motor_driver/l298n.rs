//! [`MotorDriver`] implementation for an L298N dual H-bridge
//!
//! Each wheel group uses two direction inputs and one enable input. The enable input carries a
//! software PWM signal whose duty cycle sets the speed of the group.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::drive::{WheelDems, WheelDir, WheelGroup, MAX_DUTY_PCT};
use log::{debug, warn};
use rppal::gpio::{Gpio, OutputPin};

use super::{MotorDriver, MotorError};
use crate::params::{DriveParams, L298nPins};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct L298n {
    left: Bridge,
    right: Bridge,
    pwm_frequency_hz: f64,
}

/// The three outputs driving one side of the board.
struct Bridge {
    fwd: OutputPin,
    rev: OutputPin,
    en: OutputPin,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl L298n {
    /// Claim the GPIO pins given in the parameters. All outputs start low.
    pub fn new(params: &DriveParams) -> Result<Self, MotorError> {
        let gpio = Gpio::new().map_err(gpio_err)?;

        let driver = Self {
            left: Bridge::new(&gpio, &params.left_pins)?,
            right: Bridge::new(&gpio, &params.right_pins)?,
            pwm_frequency_hz: params.pwm_frequency_hz,
        };

        debug!(
            "L298N initialised, left {:?}, right {:?}, PWM at {} Hz",
            params.left_pins, params.right_pins, params.pwm_frequency_hz
        );

        Ok(driver)
    }

    fn bridge(&mut self, group: WheelGroup) -> &mut Bridge {
        match group {
            WheelGroup::Left => &mut self.left,
            WheelGroup::Right => &mut self.right,
        }
    }
}

impl MotorDriver for L298n {
    fn set_group(&mut self, group: WheelGroup, dems: WheelDems) -> Result<(), MotorError> {
        let freq = self.pwm_frequency_hz;
        let bridge = self.bridge(group);

        match dems.dir {
            WheelDir::Forward => {
                bridge.rev.set_low();
                bridge.fwd.set_high();
            }
            WheelDir::Reverse => {
                bridge.fwd.set_low();
                bridge.rev.set_high();
            }
            WheelDir::Neutral => {
                bridge.fwd.set_low();
                bridge.rev.set_low();
            }
        }

        if dems.dir == WheelDir::Neutral || dems.duty_pct <= 0.0 {
            bridge.en.clear_pwm().map_err(gpio_err)?;
            bridge.en.set_low();
        } else {
            bridge
                .en
                .set_pwm_frequency(freq, dems.duty_pct / MAX_DUTY_PCT)
                .map_err(gpio_err)?;
        }

        Ok(())
    }
}

impl Bridge {
    fn new(gpio: &Gpio, pins: &L298nPins) -> Result<Self, MotorError> {
        let out = |pin: u8| -> Result<OutputPin, MotorError> {
            Ok(gpio.get(pin).map_err(gpio_err)?.into_output_low())
        };

        Ok(Self {
            fwd: out(pins.fwd)?,
            rev: out(pins.rev)?,
            en: out(pins.en)?,
        })
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        if let Err(e) = self.en.clear_pwm() {
            warn!("Could not stop PWM on pin {}: {}", self.en.pin(), e);
        }
        self.en.set_low();
        self.fwd.set_low();
        self.rev.set_low();
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn gpio_err(e: rppal::gpio::Error) -> MotorError {
    MotorError::Gpio(e.to_string())
}
