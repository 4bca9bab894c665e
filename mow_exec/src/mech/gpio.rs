//! # Raspberry Pi GPIO backend
//!
//! Drives the bridges directly from the Pi's GPIO header using software PWM.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::info;
use rppal::gpio::{Gpio, OutputPin};

use super::{BladeBridge, DigitalOutput, HBridge, MechError, MechParams, MotorDriver, PwmOutput};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A GPIO pin used as a digital output.
pub struct GpioDigital(OutputPin);

/// A GPIO pin driven with software PWM.
pub struct GpioPwm {
    pin: OutputPin,
    frequency_hz: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DigitalOutput for GpioDigital {
    fn set(&mut self, high: bool) -> Result<(), MechError> {
        if high {
            self.0.set_high();
        } else {
            self.0.set_low();
        }
        Ok(())
    }
}

impl PwmOutput for GpioPwm {
    fn set_duty(&mut self, duty: f64) -> Result<(), MechError> {
        if !(0.0..=1.0).contains(&duty) {
            return Err(MechError::InvalidDutyCycle(duty));
        }

        if duty == 0.0 {
            self.pin
                .clear_pwm()
                .map_err(|e| MechError::Gpio(e.to_string()))?;
            self.pin.set_low();
            Ok(())
        } else {
            self.pin
                .set_pwm_frequency(self.frequency_hz, duty)
                .map_err(|e| MechError::Gpio(e.to_string()))
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Create a motor driver using the GPIO pins given in the parameters.
pub fn motor_driver(params: &MechParams) -> Result<MotorDriver<GpioDigital, GpioPwm>, MechError> {
    let gpio = Gpio::new().map_err(|e| MechError::Gpio(e.to_string()))?;

    let output = |pin: u8| -> Result<OutputPin, MechError> {
        Ok(gpio
            .get(pin)
            .map_err(|e| MechError::Gpio(e.to_string()))?
            .into_output_low())
    };
    let pwm = |pin: u8| -> Result<GpioPwm, MechError> {
        Ok(GpioPwm {
            pin: output(pin)?,
            frequency_hz: params.pwm_frequency_hz,
        })
    };

    let left = HBridge::new(
        GpioDigital(output(params.left_dir_pin)?),
        pwm(params.left_pwm_pin)?,
        params.min_duty,
    );
    let right = HBridge::new(
        GpioDigital(output(params.right_dir_pin)?),
        pwm(params.right_pwm_pin)?,
        params.min_duty,
    );
    let blade = BladeBridge::new(
        GpioDigital(output(params.blade_fwd_pin)?),
        GpioDigital(output(params.blade_rev_pin)?),
        pwm(params.blade_pwm_pin)?,
    );

    info!("GPIO motor driver initialised");

    Ok(MotorDriver::new(left, right, blade, params))
}
