//! Servo calibration configuration

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::ConfigError;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Calibration of a single servo, as provided by the user.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ServoConfig {
    /// Unique name of the servo, also used to look up the servo's output.
    pub name: String,

    /// Whether increasing angle increases or decreases the position.
    pub direction: Direction,

    /// Position the servo is at when at the start of its travel (or the end if reversed).
    ///
    /// Units: normalised position, `[0, 1]`
    pub min_position: f64,

    /// Position the servo is at when at the end of its travel (or the start if reversed).
    ///
    /// Units: normalised position, `[0, 1]`
    pub max_position: f64,

    /// Mechanical travel spanned by moving from `min_position` to `max_position`.
    ///
    /// Units: degrees
    pub required_travel_deg: f64,
}

/// A validated calibration record held by the servo controller.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct ServoCalib {
    pub direction: Direction,
    pub min_position: f64,
    pub max_position: f64,
    pub required_travel_deg: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Direction of a servo.
///
/// `Reverse` inverts the angle to position mapping, so inverted servos keep
/// `min_position < max_position`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Reverse,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ServoConfig {
    /// Build a set of configs from parallel arrays, where index `i` of every array describes the
    /// same servo.
    ///
    /// Returns [`ConfigError::LengthMismatch`] if the arrays aren't all the same length.
    pub fn from_parallel<S: AsRef<str>>(
        names: &[S],
        directions: &[Direction],
        min_positions: &[f64],
        max_positions: &[f64],
        required_travels_deg: &[f64],
    ) -> Result<Vec<Self>, ConfigError> {
        let len = names.len();
        if directions.len() != len
            || min_positions.len() != len
            || max_positions.len() != len
            || required_travels_deg.len() != len
        {
            return Err(ConfigError::LengthMismatch);
        }

        Ok((0..len)
            .map(|i| ServoConfig {
                name: names[i].as_ref().to_string(),
                direction: directions[i],
                min_position: min_positions[i],
                max_position: max_positions[i],
                required_travel_deg: required_travels_deg[i],
            })
            .collect())
    }

    /// Check the calibration values, returning the validated record.
    ///
    /// Duplicate names are checked by the controller, as they depend on the other configs.
    pub fn validate(&self) -> Result<ServoCalib, ConfigError> {
        // Written as negated comparisons so that NaNs are rejected too
        if !(self.min_position < self.max_position)
            || !(self.min_position >= 0.0)
            || !(self.max_position <= 1.0)
        {
            return Err(ConfigError::InvalidOutputRange {
                name: self.name.clone(),
                min: self.min_position,
                max: self.max_position,
            });
        }

        if !(self.required_travel_deg > 0.0) {
            return Err(ConfigError::InvalidTravel {
                name: self.name.clone(),
                travel: self.required_travel_deg,
            });
        }

        Ok(ServoCalib {
            direction: self.direction,
            min_position: self.min_position,
            max_position: self.max_position,
            required_travel_deg: self.required_travel_deg,
        })
    }
}

impl ServoCalib {
    /// Calculate the position for an angle already normalised into `[0, required_travel_deg]`.
    pub fn position(&self, norm_angle_deg: f64) -> f64 {
        let mut ratio = norm_angle_deg / self.required_travel_deg;

        if self.direction == Direction::Reverse {
            ratio = 1.0 - ratio;
        }

        let position = self.min_position + ratio * (self.max_position - self.min_position);

        util::maths::clamp(position, 0.0, 1.0)
    }
}
