//! # Mechanisms Module
//!
//! Translates normalised drive and blade demands into the outputs of the motor drivers. Each
//! motor is driven through an H-bridge with one direction input and one PWM input; the blade
//! motor has separate forward and reverse inputs.
//!
//! The output pins are abstracted by the [`DigitalOutput`] and [`PwmOutput`] traits, so that the
//! bridges can be driven by the Raspberry Pi GPIO on the mower or by any other backend.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Raspberry Pi GPIO backend.
#[cfg(target_arch = "arm")]
pub mod gpio;

mod params;
pub use params::MechParams;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;
use mow_if::eqpt::{drive::saturate, DriveCmd};
use util::maths::lin_map;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Something that can drive the mower.
///
/// The latest command always wins, nothing is queued.
pub trait Actuator {
    /// Set the drive demand.
    fn set_drive(&mut self, cmd: DriveCmd) -> Result<(), MechError>;

    /// Set the blade speed in [-1, 1], 0 being off.
    fn set_blade(&mut self, speed: f64) -> Result<(), MechError>;

    /// Stop the drive and the blade.
    fn stop(&mut self) -> Result<(), MechError>;
}

/// A digital output pin.
pub trait DigitalOutput {
    fn set(&mut self, high: bool) -> Result<(), MechError>;
}

/// A PWM output pin.
pub trait PwmOutput {
    /// Set the duty cycle. Must be between 0.0 and 1.0, values outside this range will be
    /// rejected.
    fn set_duty(&mut self, duty: f64) -> Result<(), MechError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An H-bridge driving one motor.
#[derive(Debug)]
pub struct HBridge<D, P> {
    dir: D,
    pwm: P,

    /// Duty applied to the smallest non-zero demand
    min_duty: f64,
}

/// The blade motor bridge.
#[derive(Debug)]
pub struct BladeBridge<D, P> {
    fwd: D,
    rev: D,
    pwm: P,
}

/// Drives both drive motors and the blade.
#[derive(Debug)]
pub struct MotorDriver<D, P> {
    left: HBridge<D, P>,
    right: HBridge<D, P>,
    blade: BladeBridge<D, P>,

    left_trim: f64,
    right_trim: f64,

    last_drive: DriveCmd,
    last_blade: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum MechError {
    #[error("Duty cycle must be between 0.0 and 1.0, got {0}")]
    InvalidDutyCycle(f64),

    #[error("GPIO error: {0}")]
    Gpio(String),

    #[error("Motor hardware is not available on this platform")]
    NotSupported,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<D: DigitalOutput, P: PwmOutput> HBridge<D, P> {
    pub fn new(dir: D, pwm: P, min_duty: f64) -> Self {
        Self {
            dir,
            pwm,
            min_duty: min_duty.max(0.0).min(1.0),
        }
    }

    /// Set the motor demand in [-1, 1].
    ///
    /// The direction output is high when the demand is positive and the duty is the magnitude of
    /// the demand, rescaled so that non-zero demands give at least the minimum duty.
    pub fn set(&mut self, value: f64) -> Result<(), MechError> {
        let value = saturate(value);

        let duty = if value == 0.0 {
            0.0
        } else {
            lin_map((0.0, 1.0), (self.min_duty, 1.0), value.abs())
        };

        self.dir.set(value > 0.0)?;
        self.pwm.set_duty(duty)
    }

    pub fn outputs(&self) -> (&D, &P) {
        (&self.dir, &self.pwm)
    }
}

impl<D: DigitalOutput, P: PwmOutput> BladeBridge<D, P> {
    pub fn new(fwd: D, rev: D, pwm: P) -> Self {
        Self { fwd, rev, pwm }
    }

    /// Set the blade speed in [-1, 1].
    pub fn set(&mut self, speed: f64) -> Result<(), MechError> {
        let speed = saturate(speed);

        self.fwd.set(speed > 0.0)?;
        self.rev.set(speed < 0.0)?;
        self.pwm.set_duty(speed.abs())
    }

    pub fn outputs(&self) -> (&D, &D, &P) {
        (&self.fwd, &self.rev, &self.pwm)
    }
}

impl<D: DigitalOutput, P: PwmOutput> MotorDriver<D, P> {
    pub fn new(
        left: HBridge<D, P>,
        right: HBridge<D, P>,
        blade: BladeBridge<D, P>,
        params: &MechParams,
    ) -> Self {
        Self {
            left,
            right,
            blade,
            left_trim: params.left_trim,
            right_trim: params.right_trim,
            last_drive: DriveCmd::STOP,
            last_blade: 0.0,
        }
    }

    /// The last drive command applied, before trimming.
    pub fn last_drive(&self) -> DriveCmd {
        self.last_drive
    }

    pub fn last_blade(&self) -> f64 {
        self.last_blade
    }

    pub fn bridges(&self) -> (&HBridge<D, P>, &HBridge<D, P>, &BladeBridge<D, P>) {
        (&self.left, &self.right, &self.blade)
    }
}

impl<D: DigitalOutput, P: PwmOutput> Actuator for MotorDriver<D, P> {
    fn set_drive(&mut self, cmd: DriveCmd) -> Result<(), MechError> {
        trace!("Drive demand: {:?}", cmd);

        self.left.set(cmd.left * self.left_trim)?;
        self.right.set(cmd.right * self.right_trim)?;
        self.last_drive = cmd;

        Ok(())
    }

    fn set_blade(&mut self, speed: f64) -> Result<(), MechError> {
        trace!("Blade demand: {}", speed);

        self.blade.set(speed)?;
        self.last_blade = saturate(speed);

        Ok(())
    }

    fn stop(&mut self) -> Result<(), MechError> {
        // Attempt everything even if one output fails
        let drive = self.set_drive(DriveCmd::STOP);
        let blade = self.set_blade(0.0);

        drive.and(blade)
    }
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn set_drive(&mut self, cmd: DriveCmd) -> Result<(), MechError> {
        (**self).set_drive(cmd)
    }

    fn set_blade(&mut self, speed: f64) -> Result<(), MechError> {
        (**self).set_blade(speed)
    }

    fn stop(&mut self) -> Result<(), MechError> {
        (**self).stop()
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Open the motor drivers wired to the GPIO header of the mower.
#[cfg(target_arch = "arm")]
pub fn hw_actuator(params: &MechParams) -> Result<Box<dyn Actuator>, MechError> {
    Ok(Box::new(gpio::motor_driver(params)?))
}

/// Open the motor drivers wired to the GPIO header of the mower.
///
/// Only the Raspberry Pi has them, so this always fails elsewhere.
#[cfg(not(target_arch = "arm"))]
pub fn hw_actuator(_params: &MechParams) -> Result<Box<dyn Actuator>, MechError> {
    Err(MechError::NotSupported)
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug, Default)]
    struct Pin {
        high: bool,
    }

    #[derive(Debug, Default)]
    struct Pwm {
        duty: f64,
    }

    impl DigitalOutput for Pin {
        fn set(&mut self, high: bool) -> Result<(), MechError> {
            self.high = high;
            Ok(())
        }
    }

    impl PwmOutput for Pwm {
        fn set_duty(&mut self, duty: f64) -> Result<(), MechError> {
            if !(0.0..=1.0).contains(&duty) {
                return Err(MechError::InvalidDutyCycle(duty));
            }
            self.duty = duty;
            Ok(())
        }
    }

    fn driver() -> MotorDriver<Pin, Pwm> {
        let params = MechParams {
            right_trim: 0.5,
            ..Default::default()
        };

        MotorDriver::new(
            HBridge::new(Pin::default(), Pwm::default(), 0.0),
            HBridge::new(Pin::default(), Pwm::default(), 0.0),
            BladeBridge::new(Pin::default(), Pin::default(), Pwm::default()),
            &params,
        )
    }

    #[test]
    fn test_hbridge_sign_and_duty() {
        let mut b = HBridge::new(Pin::default(), Pwm::default(), 0.0);

        b.set(0.6).unwrap();
        assert!(b.outputs().0.high);
        assert!((b.outputs().1.duty - 0.6).abs() < 1e-12);

        b.set(-0.25).unwrap();
        assert!(!b.outputs().0.high);
        assert!((b.outputs().1.duty - 0.25).abs() < 1e-12);

        b.set(-3.0).unwrap();
        assert_eq!(b.outputs().1.duty, 1.0);

        b.set(0.0).unwrap();
        assert!(!b.outputs().0.high);
        assert_eq!(b.outputs().1.duty, 0.0);
    }

    #[test]
    fn test_hbridge_min_duty() {
        let mut b = HBridge::new(Pin::default(), Pwm::default(), 0.2);

        b.set(0.5).unwrap();
        assert!((b.outputs().1.duty - 0.6).abs() < 1e-12);

        b.set(0.0).unwrap();
        assert_eq!(b.outputs().1.duty, 0.0);
    }

    #[test]
    fn test_blade_pins() {
        let mut b = BladeBridge::new(Pin::default(), Pin::default(), Pwm::default());

        b.set(0.3).unwrap();
        let (fwd, rev, pwm) = b.outputs();
        assert!(fwd.high && !rev.high);
        assert!((pwm.duty - 0.3).abs() < 1e-12);

        b.set(-0.5).unwrap();
        let (fwd, rev, pwm) = b.outputs();
        assert!(!fwd.high && rev.high);
        assert!((pwm.duty - 0.5).abs() < 1e-12);

        b.set(0.0).unwrap();
        let (fwd, rev, pwm) = b.outputs();
        assert!(!fwd.high && !rev.high);
        assert_eq!(pwm.duty, 0.0);
    }

    #[test]
    fn test_driver_trim_and_stop() {
        let mut d = driver();

        d.set_drive(DriveCmd::new(0.8, 0.8)).unwrap();
        d.set_blade(0.3).unwrap();
        {
            let (l, r, _) = d.bridges();
            assert!((l.outputs().1.duty - 0.8).abs() < 1e-12);
            assert!((r.outputs().1.duty - 0.4).abs() < 1e-12);
        }
        assert_eq!(d.last_drive(), DriveCmd::new(0.8, 0.8));

        // Latest command wins
        d.set_drive(DriveCmd::new(-0.2, 0.2)).unwrap();
        assert_eq!(d.last_drive(), DriveCmd::new(-0.2, 0.2));

        d.stop().unwrap();
        let (l, r, blade) = d.bridges();
        assert_eq!(l.outputs().1.duty, 0.0);
        assert_eq!(r.outputs().1.duty, 0.0);
        assert_eq!(blade.outputs().2.duty, 0.0);
        assert!(d.last_drive().is_stop());
        assert_eq!(d.last_blade(), 0.0);
    }

    #[test]
    fn test_boxed_actuator() {
        let mut boxed: Box<dyn Actuator> = Box::new(driver());
        boxed.set_drive(DriveCmd::new(0.5, 0.5)).unwrap();
        boxed.stop().unwrap();

        #[cfg(not(target_arch = "arm"))]
        assert!(matches!(
            hw_actuator(&MechParams::default()),
            Err(MechError::NotSupported)
        ));
    }
}
