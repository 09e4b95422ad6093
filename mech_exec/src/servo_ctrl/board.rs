//! Servo outputs for channels of a shared [`ServoDriver`] board.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::{HardwareMap, ServoDriver, ServoError, ServoOutput};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// PWM timing used to convert a normalised position into a duty cycle.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PwmParams {
    /// PWM frequency of the board.
    ///
    /// Units: Hertz
    pub freq_hz: f64,

    /// Pulse width corresponding to position 0.0.
    ///
    /// Units: microseconds
    pub min_pulse_us: f64,

    /// Pulse width corresponding to position 1.0.
    ///
    /// Units: microseconds
    pub max_pulse_us: f64,
}

/// A [`HardwareMap`] resolving servo names to channels on a single board.
pub struct BoardMap<D: ServoDriver> {
    board: Rc<RefCell<D>>,
    channels: HashMap<String, D::Channel>,
    pwm: PwmParams,
}

/// A servo connected to one channel of a board.
pub struct BoardServo<D: ServoDriver> {
    board: Rc<RefCell<D>>,
    channel: D::Channel,
    pwm: PwmParams,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for PwmParams {
    /// Standard hobby servo timing, 50 Hz with 500-2500 us pulses.
    fn default() -> Self {
        Self {
            freq_hz: 50.0,
            min_pulse_us: 500.0,
            max_pulse_us: 2500.0,
        }
    }
}

impl PwmParams {
    /// Duty cycle of the pulse for the given position.
    pub fn duty_cycle(&self, position: f64) -> f64 {
        let pulse_us = util::maths::lin_map(
            (0.0, 1.0),
            (self.min_pulse_us, self.max_pulse_us),
            position,
        );

        pulse_us * self.freq_hz * 1e-6
    }
}

impl<D: ServoDriver> BoardMap<D> {
    /// Create a new map for the given board.
    ///
    /// `channels` gives the channel index of each servo connected to the board.
    pub fn new<'a, I>(board: D, channels: I, pwm: PwmParams) -> Result<Self, ServoError>
    where
        I: IntoIterator<Item = (&'a str, u8)>,
    {
        let channels = channels
            .into_iter()
            .map(|(name, index)| {
                D::channel(index)
                    .map(|c| (name.to_string(), c))
                    .ok_or(ServoError::InvalidChannel(index))
            })
            .collect::<Result<HashMap<_, _>, _>>()?;

        Ok(Self {
            board: Rc::new(RefCell::new(board)),
            channels,
            pwm,
        })
    }

    /// Shared handle to the underlying board, used to inspect a simulated board's channels.
    pub fn board(&self) -> Rc<RefCell<D>> {
        self.board.clone()
    }
}

impl<D: ServoDriver> HardwareMap for BoardMap<D> {
    type Output = BoardServo<D>;

    fn get_servo(&mut self, name: &str) -> Option<Self::Output> {
        self.channels.get(name).map(|&channel| BoardServo {
            board: self.board.clone(),
            channel,
            pwm: self.pwm,
        })
    }
}

impl<D: ServoDriver> ServoOutput for BoardServo<D> {
    fn set_position(&mut self, position: f64) -> Result<(), ServoError> {
        let duty_cycle = self.pwm.duty_cycle(position);

        self.board
            .borrow_mut()
            .set_duty_cycle(self.channel, duty_cycle)
    }
}
