//! # Teleoperation module
//!
//! Maps the operator's gamepad onto angle demands for the servos. Stick axes drive a servo
//! continuously about a centre angle, while buttons send a servo to a fixed angle while held.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod input;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use serde::{Deserialize, Serialize};
use util::module::State;

pub use input::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for teleoperation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Params {
    /// Stick axes bound to servos.
    #[serde(default)]
    pub axes: Vec<AxisBinding>,

    /// Buttons bound to servos. If several buttons for the same servo are held the first one
    /// listed wins.
    #[serde(default)]
    pub buttons: Vec<ButtonBinding>,
}

/// Drives a servo to `centre_deg + stick * scale_deg`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisBinding {
    pub servo: String,
    pub axis: StickAxis,

    /// Units: degrees
    pub centre_deg: f64,

    /// Angle change at full stick deflection.
    ///
    /// Units: degrees
    pub scale_deg: f64,
}

/// Sends a servo to `angle_deg` while the button is held.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonBinding {
    pub servo: String,
    pub button: Button,

    /// Units: degrees
    pub angle_deg: f64,
}

/// Angle demanded for a servo in this cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AngleDem {
    pub servo: String,
    pub angle_deg: f64,
}

/// Status report of one teleop cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatusReport {
    /// Number of demands from stick axes.
    pub num_axis_dems: usize,

    /// Number of demands from held buttons.
    pub num_button_dems: usize,
}

/// Teleoperation module state.
#[derive(Debug, Default)]
pub struct TeleopCtrl {
    params: Params,

    /// Servos driven by buttons, in the order they first appear in the bindings.
    button_servos: Vec<String>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur in teleoperation.
#[derive(Debug, thiserror::Error)]
pub enum TeleopError {
    #[error("A binding has an empty servo name")]
    EmptyServoName,

    #[error("The binding for servo '{0}' has a non-finite angle")]
    NonFiniteAngle(String),

    #[error("Servo '{0}' is bound to more than one stick axis")]
    DuplicateAxisBinding(String),

    #[error("Servo '{0}' is bound to both a stick axis and a button")]
    ConflictingBindings(String),

    #[error("Servo '{0}' is bound to an input but isn't a known servo")]
    UnknownServo(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TeleopCtrl {
    /// Check that every bound servo is known, for example by the servo controller.
    pub fn check_servos<F>(&self, is_known: F) -> Result<(), TeleopError>
    where
        F: Fn(&str) -> bool,
    {
        self.bound_servos()
            .find(|s| !is_known(*s))
            .map_or(Ok(()), |s| Err(TeleopError::UnknownServo(s.to_string())))
    }

    /// Names of all servos with a binding.
    pub fn bound_servos(&self) -> impl Iterator<Item = &str> {
        self.params
            .axes
            .iter()
            .map(|a| a.servo.as_str())
            .chain(self.button_servos.iter().map(|s| s.as_str()))
    }
}

impl State for TeleopCtrl {
    type InitData = Params;
    type InitError = TeleopError;

    type InputData = OperatorInput;
    type OutputData = Vec<AngleDem>;
    type StatusReport = StatusReport;
    type ProcError = TeleopError;

    fn init(&mut self, params: Params) -> Result<(), TeleopError> {
        let mut axis_servos: Vec<&str> = vec![];

        for a in params.axes.iter() {
            if a.servo.is_empty() {
                return Err(TeleopError::EmptyServoName);
            }
            if !a.centre_deg.is_finite() || !a.scale_deg.is_finite() {
                return Err(TeleopError::NonFiniteAngle(a.servo.clone()));
            }
            if axis_servos.contains(&a.servo.as_str()) {
                return Err(TeleopError::DuplicateAxisBinding(a.servo.clone()));
            }
            axis_servos.push(&a.servo);
        }

        let mut button_servos: Vec<String> = vec![];

        for b in params.buttons.iter() {
            if b.servo.is_empty() {
                return Err(TeleopError::EmptyServoName);
            }
            if !b.angle_deg.is_finite() {
                return Err(TeleopError::NonFiniteAngle(b.servo.clone()));
            }
            if axis_servos.contains(&b.servo.as_str()) {
                return Err(TeleopError::ConflictingBindings(b.servo.clone()));
            }
            if !button_servos.contains(&b.servo) {
                button_servos.push(b.servo.clone());
            }
        }

        debug!(
            "Teleop initialised with {} axis and {} button bindings",
            params.axes.len(),
            params.buttons.len()
        );

        self.button_servos = button_servos;
        self.params = params;

        Ok(())
    }

    fn proc(
        &mut self,
        input: &OperatorInput,
    ) -> Result<(Vec<AngleDem>, StatusReport), TeleopError> {
        let mut dems: Vec<AngleDem> = self
            .params
            .axes
            .iter()
            .map(|a| AngleDem {
                servo: a.servo.clone(),
                angle_deg: a.centre_deg + input.axis(a.axis) * a.scale_deg,
            })
            .collect();

        let num_axis_dems = dems.len();

        for servo in self.button_servos.iter() {
            let held = self
                .params
                .buttons
                .iter()
                .find(|b| &b.servo == servo && input.pressed(b.button));

            if let Some(b) = held {
                dems.push(AngleDem {
                    servo: servo.clone(),
                    angle_deg: b.angle_deg,
                });
            }
        }

        let report = StatusReport {
            num_axis_dems,
            num_button_dems: dems.len() - num_axis_dems,
        };

        Ok((dems, report))
    }
}
