//! # Mechanisms library
//!
//! Servo calibration and teleoperation for the mechanisms executable.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Parameters for the mechanisms executable.
pub mod params;

/// Angle to position conversion and servo outputs.
pub mod servo_ctrl;

/// Operator input mapping.
pub mod teleop;
