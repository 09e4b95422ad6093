//! Operator input structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// State of the operator's gamepad in one cycle.
///
/// Any field missing from a serialised input takes its default (centred stick, released button).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorInput {
    /// Units: normalised, `[-1, 1]`, positive right
    pub left_stick_x: f64,

    /// Units: normalised, `[-1, 1]`, positive up
    pub left_stick_y: f64,

    pub right_stick_x: f64,

    pub right_stick_y: f64,

    pub a: bool,
    pub b: bool,
    pub x: bool,
    pub y: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A single stick axis on the gamepad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StickAxis {
    LeftX,
    LeftY,
    RightX,
    RightY,
}

/// A face button on the gamepad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    A,
    B,
    X,
    Y,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl OperatorInput {
    /// Value of the given stick axis, limited to `[-1, 1]`.
    pub fn axis(&self, axis: StickAxis) -> f64 {
        let value = match axis {
            StickAxis::LeftX => self.left_stick_x,
            StickAxis::LeftY => self.left_stick_y,
            StickAxis::RightX => self.right_stick_x,
            StickAxis::RightY => self.right_stick_y,
        };

        util::maths::clamp(value, -1.0, 1.0)
    }

    /// Whether the given button is pressed.
    pub fn pressed(&self, button: Button) -> bool {
        match button {
            Button::A => self.a,
            Button::B => self.b,
            Button::X => self.x,
            Button::Y => self.y,
        }
    }
}
