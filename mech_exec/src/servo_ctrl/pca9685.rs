//! [`ServoDriver`] implementation for the PCA9685 driver

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use embedded_hal::blocking::i2c::{Write, WriteRead};
use pwm_pca9685::{Channel, Pca9685};

use super::{ServoDriver, ServoError};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of counts in one PWM period.
const MAX_PWM: u16 = 4096;

/// Internal oscillator frequency of the PCA9685.
const OSC_CLOCK_HZ: f64 = 25_000_000.0;

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Get the prescale value which sets the board's PWM frequency as close as possible to `freq_hz`.
///
/// The board accepts prescales between 3 and 255.
pub fn prescale_for(freq_hz: f64) -> u8 {
    let prescale = (OSC_CLOCK_HZ / (MAX_PWM as f64 * freq_hz)).round() - 1.0;

    util::maths::clamp(prescale, 3.0, 255.0) as u8
}

/// Number of "on" counts for a duty cycle, never the full period so the off count stays valid.
fn duty_to_counts(duty_cycle: f64) -> u16 {
    ((duty_cycle * MAX_PWM as f64) as u16).min(MAX_PWM - 1)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<I2C, E> ServoDriver for Pca9685<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
{
    type Channel = Channel;

    fn channel(index: u8) -> Option<Channel> {
        Some(match index {
            0 => Channel::C0,
            1 => Channel::C1,
            2 => Channel::C2,
            3 => Channel::C3,
            4 => Channel::C4,
            5 => Channel::C5,
            6 => Channel::C6,
            7 => Channel::C7,
            8 => Channel::C8,
            9 => Channel::C9,
            10 => Channel::C10,
            11 => Channel::C11,
            12 => Channel::C12,
            13 => Channel::C13,
            14 => Channel::C14,
            15 => Channel::C15,
            _ => return None,
        })
    }

    fn set_duty_cycle(&mut self, channel: Self::Channel, duty_cycle: f64) -> Result<(), ServoError> {
        // If the duty cycle is out of range return an error
        if !(0.0..=1.0).contains(&duty_cycle) {
            return Err(ServoError::InvalidDutyCycle(duty_cycle));
        }

        // Pulses start at the beginning of the period and end after the on counts
        match self.set_channel_on_off(channel, 0, duty_to_counts(duty_cycle)) {
            Ok(_) => Ok(()),
            Err(pwm_pca9685::Error::I2C(_)) => Err(ServoError::I2c),
            Err(pwm_pca9685::Error::InvalidInputData) => {
                Err(ServoError::InvalidDutyCycle(duty_cycle))
            }
        }
    }
}
