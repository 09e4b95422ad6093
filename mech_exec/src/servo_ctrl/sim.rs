//! Simulated servo driver board
//!
//! Used when no hardware is available. Duty cycles are validated in the same way as a real board
//! and stored so they can be inspected.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;

use super::{ServoDriver, ServoError};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of channels on the simulated board, matching the PCA9685.
pub const NUM_SIM_CHANNELS: usize = 16;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct SimBoard {
    duty_cycles: [Option<f64>; NUM_SIM_CHANNELS],
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last duty cycle set on the channel, if any.
    pub fn duty_cycle(&self, channel: u8) -> Option<f64> {
        self.duty_cycles
            .get(channel as usize)
            .copied()
            .flatten()
    }
}

impl ServoDriver for SimBoard {
    type Channel = u8;

    fn channel(index: u8) -> Option<u8> {
        if (index as usize) < NUM_SIM_CHANNELS {
            Some(index)
        } else {
            None
        }
    }

    fn set_duty_cycle(&mut self, channel: u8, duty_cycle: f64) -> Result<(), ServoError> {
        if !(0.0..=1.0).contains(&duty_cycle) {
            return Err(ServoError::InvalidDutyCycle(duty_cycle));
        }

        let slot = self
            .duty_cycles
            .get_mut(channel as usize)
            .ok_or(ServoError::InvalidChannel(channel))?;
        *slot = Some(duty_cycle);

        trace!("SimBoard channel {} duty cycle {:.5}", channel, duty_cycle);

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_set_duty_cycle() {
        let mut board = SimBoard::new();

        board.set_duty_cycle(3, 0.075).unwrap();
        assert_eq!(board.duty_cycle(3), Some(0.075));
        assert_eq!(board.duty_cycle(4), None);
        assert_eq!(board.duty_cycle(200), None);
    }

    #[test]
    fn test_rejects_invalid() {
        let mut board = SimBoard::new();

        assert!(matches!(
            board.set_duty_cycle(0, 1.5),
            Err(ServoError::InvalidDutyCycle(_))
        ));
        assert!(matches!(
            board.set_duty_cycle(0, f64::NAN),
            Err(ServoError::InvalidDutyCycle(_))
        ));
        assert!(matches!(
            board.set_duty_cycle(16, 0.5),
            Err(ServoError::InvalidChannel(16))
        ));
        assert_eq!(SimBoard::channel(16), None);
        assert_eq!(board.duty_cycle(0), None);
    }
}
