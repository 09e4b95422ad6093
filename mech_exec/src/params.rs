//! # Mechanisms Executable Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;
use std::time::Duration;

use crate::{
    servo_ctrl::{PwmParams, ServoConfig},
    teleop,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Default I2C address of the PCA9685 board.
pub const DEFAULT_I2C_ADDRESS: u8 = 0x40;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Deserialize, Debug)]
pub struct MechExecParams {
    /// Target period of one control cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// I2C address of the servo driver board
    #[serde(default = "default_i2c_address")]
    pub i2c_address: u8,

    /// PWM timing of the servo driver board
    #[serde(default)]
    pub pwm: PwmParams,

    /// Calibration and wiring of each servo
    pub servos: Vec<ServoParams>,

    /// Operator input bindings
    #[serde(default)]
    pub teleop: teleop::Params,
}

#[derive(Deserialize, Debug)]
pub struct ServoParams {
    #[serde(flatten)]
    pub config: ServoConfig,

    /// Channel of the driver board the servo is connected to
    pub channel: u8,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors in the values of otherwise well formed parameters.
#[derive(thiserror::Error, Debug)]
pub enum ParamsError {
    #[error("cycle_period_s must be a finite number of seconds greater than zero, got {0}")]
    InvalidCyclePeriod(f64),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MechExecParams {
    /// Target period of one control cycle.
    pub fn cycle_period(&self) -> Result<Duration, ParamsError> {
        if !(self.cycle_period_s > 0.0) || !self.cycle_period_s.is_finite() {
            return Err(ParamsError::InvalidCyclePeriod(self.cycle_period_s));
        }

        Ok(Duration::from_secs_f64(self.cycle_period_s))
    }

    /// Calibration configs of all servos, in the order they appear in the parameters.
    pub fn servo_configs(&self) -> Vec<ServoConfig> {
        self.servos.iter().map(|s| s.config.clone()).collect()
    }

    /// The board channel of each servo.
    pub fn channels(&self) -> impl Iterator<Item = (&str, u8)> {
        self.servos.iter().map(|s| (s.config.name.as_str(), s.channel))
    }
}

fn default_i2c_address() -> u8 {
    DEFAULT_I2C_ADDRESS
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::servo_ctrl::Direction;

    #[test]
    fn test_demo_params() {
        let params: MechExecParams =
            util::params::parse(include_str!("../../params/mech_exec.toml")).unwrap();

        assert_eq!(params.i2c_address, DEFAULT_I2C_ADDRESS);
        assert_eq!(params.servos.len(), 3);

        let configs = params.servo_configs();
        assert_eq!(configs[2].name, "gripper");
        assert_eq!(configs[2].direction, Direction::Reverse);
        assert_eq!(configs[2].min_position, 0.30);
        assert_eq!(configs[2].max_position, 0.80);
        assert_eq!(configs[2].required_travel_deg, 90.0);

        let channels: Vec<(&str, u8)> = params.channels().collect();
        assert_eq!(channels[0], ("gimbal_pan", 0));

        assert_eq!(params.teleop.axes.len(), 1);
        assert_eq!(params.teleop.buttons.len(), 2);

        assert_eq!(params.cycle_period().unwrap(), Duration::from_millis(50));
    }

    #[test]
    fn test_invalid_cycle_period() {
        let demo = include_str!("../../params/mech_exec.toml");

        for period in ["-0.05", "0.0", "nan", "inf"].iter() {
            let toml_str = demo.replace(
                "cycle_period_s = 0.05",
                &format!("cycle_period_s = {}", period),
            );
            let params: MechExecParams = util::params::parse(&toml_str).unwrap();

            assert!(
                matches!(params.cycle_period(), Err(ParamsError::InvalidCyclePeriod(_))),
                "{} should be rejected",
                period
            );
        }
    }
}
