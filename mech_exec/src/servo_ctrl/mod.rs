//! # Servo Controller Module
//!
//! This module converts demanded joint angles into normalised servo positions using a per-servo
//! calibration, and forwards those positions to the servo outputs.
//!
//! Outputs are found through a [`HardwareMap`] when the controller is built, which keeps the
//! calibration maths independent of the driver boards actually fitted. [`BoardMap`] provides the
//! map for multi-channel [`ServoDriver`] boards.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Hardware map and servo outputs for channels on a driver board.
pub mod board;

/// Servo calibration records.
pub mod config;

/// [`ServoDriver`] implementation for the Adafruit PCA9685 16 channel servo driver board.
pub mod pca9685;

/// Simulated driver board.
pub mod sim;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, trace};
use std::collections::HashMap;

pub use board::{BoardMap, BoardServo, PwmParams};
pub use config::{Direction, ServoCalib, ServoConfig};
pub use sim::SimBoard;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Angles are normalised into `[0, FULL_TURN_DEG)` before being checked against the travel.
pub const FULL_TURN_DEG: f64 = 360.0;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Trait to provide a unified API for accessing servo driver boards.
pub trait ServoDriver {
    /// The type that the underlying driver uses for channel identification
    type Channel: Copy;

    /// Get the channel with the given index, or `None` if the board doesn't have that channel.
    fn channel(index: u8) -> Option<Self::Channel>;

    /// Set the duty cycle of a channel.
    ///
    /// ## Arguments
    /// - `channel` - The channel to set the duty cycle for
    /// - `duty_cycle` - The duty cycle to set. Must be a value between 0.0 and 1.0. Values outside
    ///   this range will be rejected.
    fn set_duty_cycle(&mut self, channel: Self::Channel, duty_cycle: f64)
        -> Result<(), ServoError>;
}

/// A single servo which can be commanded to a normalised position.
pub trait ServoOutput {
    /// Set the position of the servo, between 0.0 and 1.0.
    fn set_position(&mut self, position: f64) -> Result<(), ServoError>;
}

/// Resolves servo names into outputs.
pub trait HardwareMap {
    type Output: ServoOutput;

    /// Get the output for the named servo, or `None` if there is no such servo.
    fn get_servo(&mut self, name: &str) -> Option<Self::Output>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Converts angle demands into servo positions for a fixed set of named servos.
///
/// The set of servos and their calibrations cannot change once the controller has been built.
pub struct ServoCtrl<O> {
    servos: HashMap<String, ServoEntry<O>>,
}

struct ServoEntry<O> {
    calib: ServoCalib,
    output: O,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum ServoError {
    #[error("An I2C error occured")]
    I2c,

    #[error("Duty cycle must be between 0.0 and 1.0, got {0}")]
    InvalidDutyCycle(f64),

    #[error("The driver board has no channel {0}")]
    InvalidChannel(u8),
}

/// Errors which can occur while building a [`ServoCtrl`].
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("All servo configuration arrays must have the same length")]
    LengthMismatch,

    #[error(
        "Servo '{name}': min_position ({min:.2}) must be strictly less than max_position \
        ({max:.2}) and both must be within [0, 1]. Use the reverse direction for inverse motion \
        rather than swapping min and max."
    )]
    InvalidOutputRange { name: String, min: f64, max: f64 },

    #[error("Servo '{name}': required_travel_deg must be positive, got {travel}")]
    InvalidTravel { name: String, travel: f64 },

    #[error("Servo '{0}': duplicate servo name")]
    DuplicateName(String),

    #[error("Servo '{0}': no matching servo found in the hardware map")]
    DeviceLookupFailed(String),
}

/// Errors which can occur while computing or applying a servo position.
#[derive(thiserror::Error, Debug)]
pub enum ComputeError {
    #[error("No servo named '{0}' was found")]
    UnknownActuator(String),

    #[error(
        "Angle {angle:.1} (normalised to {normalised:.1}) is outside the configured travel range \
        (0-{travel:.1} degrees) for servo '{name}'"
    )]
    AngleOutOfRange {
        name: String,
        angle: f64,
        normalised: f64,
        travel: f64,
    },

    #[error("Could not set the position of servo '{name}': {source}")]
    Output {
        name: String,
        #[source]
        source: ServoError,
    },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<O> ServoCtrl<O>
where
    O: ServoOutput,
{
    /// Create a new servo controller.
    ///
    /// Configs are checked in order, and the first invalid one aborts the build. For each config
    /// the range, travel, and name uniqueness are checked before the output is looked up in the
    /// hardware map.
    pub fn new<H>(configs: &[ServoConfig], hw_map: &mut H) -> Result<Self, ConfigError>
    where
        H: HardwareMap<Output = O>,
    {
        let mut servos = HashMap::with_capacity(configs.len());

        for config in configs {
            let calib = config.validate()?;

            if servos.contains_key(&config.name) {
                return Err(ConfigError::DuplicateName(config.name.clone()));
            }

            let output = hw_map
                .get_servo(&config.name)
                .ok_or_else(|| ConfigError::DeviceLookupFailed(config.name.clone()))?;

            debug!(
                "Servo '{}': {:?}, position [{:.3}, {:.3}] over {:.1} deg",
                config.name,
                calib.direction,
                calib.min_position,
                calib.max_position,
                calib.required_travel_deg
            );

            servos.insert(config.name.clone(), ServoEntry { calib, output });
        }

        Ok(Self { servos })
    }

    /// Create a new servo controller from parallel configuration arrays.
    ///
    /// See [`ServoConfig::from_parallel`] and [`ServoCtrl::new`].
    pub fn from_parallel<S, H>(
        names: &[S],
        directions: &[Direction],
        min_positions: &[f64],
        max_positions: &[f64],
        required_travels_deg: &[f64],
        hw_map: &mut H,
    ) -> Result<Self, ConfigError>
    where
        S: AsRef<str>,
        H: HardwareMap<Output = O>,
    {
        let configs = ServoConfig::from_parallel(
            names,
            directions,
            min_positions,
            max_positions,
            required_travels_deg,
        )?;

        Self::new(&configs, hw_map)
    }

    /// Set the named servo to the given angle, returning the position that was sent.
    pub fn apply_angle(&mut self, name: &str, angle_deg: f64) -> Result<f64, ComputeError> {
        let position = self.compute_command(name, angle_deg)?;

        let entry = self
            .servos
            .get_mut(name)
            .ok_or_else(|| ComputeError::UnknownActuator(name.to_string()))?;

        entry
            .output
            .set_position(position)
            .map_err(|source| ComputeError::Output {
                name: name.to_string(),
                source,
            })?;

        Ok(position)
    }
}

impl<O> ServoCtrl<O> {
    /// Calculate the position for the named servo at the given angle.
    ///
    /// The angle is first wrapped into `[0, 360)`, and must then be within the servo's travel
    /// (inclusive of both ends).
    pub fn compute_command(&self, name: &str, angle_deg: f64) -> Result<f64, ComputeError> {
        let calib = self
            .calib(name)
            .ok_or_else(|| ComputeError::UnknownActuator(name.to_string()))?;

        let normalised = normalise_angle(angle_deg);

        // Negated so that NaN and infinite angles (which normalise to NaN) are rejected
        if !(normalised <= calib.required_travel_deg) {
            return Err(ComputeError::AngleOutOfRange {
                name: name.to_string(),
                angle: angle_deg,
                normalised,
                travel: calib.required_travel_deg,
            });
        }

        let position = calib.position(normalised);

        trace!(
            "Servo '{}': {:.2} deg (normalised {:.2}) -> {:.4}",
            name,
            angle_deg,
            normalised,
            position
        );

        Ok(position)
    }

    /// Get the calibration of the named servo.
    pub fn calib(&self, name: &str) -> Option<&ServoCalib> {
        self.servos.get(name).map(|e| &e.calib)
    }

    /// Iterate over the names of all servos in the controller, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.servos.keys().map(|n| n.as_str())
    }

    /// Number of servos in the controller.
    pub fn len(&self) -> usize {
        self.servos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servos.is_empty()
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Wrap an angle in degrees into `[0, 360)`.
pub fn normalise_angle(angle_deg: f64) -> f64 {
    util::maths::rem_euclid(angle_deg, FULL_TURN_DEG)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::rc::Rc;

    const EPS: f64 = 1e-9;

    /// Output which records every position it's sent.
    #[derive(Clone, Default)]
    struct RecordingOutput {
        positions: Rc<RefCell<Vec<f64>>>,
        fail: bool,
    }

    impl ServoOutput for RecordingOutput {
        fn set_position(&mut self, position: f64) -> Result<(), ServoError> {
            if self.fail {
                return Err(ServoError::I2c);
            }
            self.positions.borrow_mut().push(position);
            Ok(())
        }
    }

    /// Hardware map which knows a fixed set of servo names.
    #[derive(Default)]
    struct TestMap {
        known: HashSet<String>,
        outputs: HashMap<String, RecordingOutput>,
        lookups: Vec<String>,
    }

    impl TestMap {
        fn with(names: &[&str]) -> Self {
            Self {
                known: names.iter().map(|n| n.to_string()).collect(),
                ..Default::default()
            }
        }
    }

    impl HardwareMap for TestMap {
        type Output = RecordingOutput;

        fn get_servo(&mut self, name: &str) -> Option<RecordingOutput> {
            self.lookups.push(name.to_string());
            if !self.known.contains(name) {
                return None;
            }
            Some(self.outputs.entry(name.to_string()).or_default().clone())
        }
    }

    fn config(name: &str, direction: Direction, min: f64, max: f64, travel: f64) -> ServoConfig {
        ServoConfig {
            name: name.into(),
            direction,
            min_position: min,
            max_position: max,
            required_travel_deg: travel,
        }
    }

    fn pan() -> ServoConfig {
        config("pan", Direction::Forward, 0.07, 0.93, 180.0)
    }

    fn grip() -> ServoConfig {
        config("grip", Direction::Reverse, 0.30, 0.80, 90.0)
    }

    fn ctrl(configs: &[ServoConfig]) -> ServoCtrl<RecordingOutput> {
        let names: Vec<&str> = configs.iter().map(|c| c.name.as_str()).collect();
        ServoCtrl::new(configs, &mut TestMap::with(&names)).unwrap()
    }

    #[test]
    fn test_pan_scenario() {
        let sc = ctrl(&[pan()]);

        let pos = sc.compute_command("pan", 90.0).unwrap();
        assert!((pos - 0.50).abs() < EPS, "got {}", pos);
    }

    #[test]
    fn test_grip_scenario() {
        let sc = ctrl(&[grip()]);

        assert!((sc.compute_command("grip", 0.0).unwrap() - 0.80).abs() < EPS);
        assert!((sc.compute_command("grip", 90.0).unwrap() - 0.30).abs() < EPS);
    }

    #[test]
    fn test_travel_end_points() {
        let configs = [
            config("a", Direction::Forward, 0.1, 0.9, 270.0),
            config("b", Direction::Reverse, 0.1, 0.9, 270.0),
            config("c", Direction::Forward, 0.0, 1.0, 45.0),
            config("d", Direction::Reverse, 0.25, 0.5, 359.0),
        ];
        let sc = ctrl(&configs);

        for c in configs.iter() {
            let start = sc.compute_command(&c.name, 0.0).unwrap();
            let end = sc.compute_command(&c.name, c.required_travel_deg).unwrap();

            let (exp_start, exp_end) = match c.direction {
                Direction::Forward => (c.min_position, c.max_position),
                Direction::Reverse => (c.max_position, c.min_position),
            };

            assert!((start - exp_start).abs() < EPS, "{} start {}", c.name, start);
            assert!((end - exp_end).abs() < EPS, "{} end {}", c.name, end);
        }
    }

    #[test]
    fn test_monotonic_within_range() {
        let sc = ctrl(&[pan(), grip()]);

        for c in [pan(), grip()].iter() {
            let mut prev: Option<f64> = None;

            for i in 0..=100 {
                let angle = c.required_travel_deg * (i as f64) / 100.0;
                let pos = sc.compute_command(&c.name, angle).unwrap();

                assert!(pos >= c.min_position - EPS && pos <= c.max_position + EPS);

                if let Some(p) = prev {
                    match c.direction {
                        Direction::Forward => assert!(pos > p),
                        Direction::Reverse => assert!(pos < p),
                    }
                }
                prev = Some(pos);
            }
        }
    }

    #[test]
    fn test_angle_wrapping() {
        let sc = ctrl(&[pan()]);

        let base = sc.compute_command("pan", 45.0).unwrap();
        for k in [-3.0, -1.0, 1.0, 2.0, 10.0].iter() {
            let pos = sc.compute_command("pan", 45.0 + 360.0 * k).unwrap();
            assert!((pos - base).abs() < EPS, "k = {}", k);
        }

        // -90 wraps to 270, which is past the pan travel
        assert!(matches!(
            sc.compute_command("pan", -90.0),
            Err(ComputeError::AngleOutOfRange { normalised, .. }) if (normalised - 270.0).abs() < EPS
        ));
    }

    #[test]
    fn test_out_of_range() {
        let sc = ctrl(&[pan()]);

        match sc.compute_command("pan", 180.01) {
            Err(ComputeError::AngleOutOfRange {
                name,
                angle,
                normalised,
                travel,
            }) => {
                assert_eq!(name, "pan");
                assert_eq!(angle, 180.01);
                assert!((normalised - 180.01).abs() < EPS);
                assert_eq!(travel, 180.0);
            }
            r => panic!("Expected AngleOutOfRange, got {:?}", r),
        }

        // Upper bound is inclusive
        assert!(sc.compute_command("pan", 180.0).is_ok());

        for angle in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY].iter() {
            assert!(matches!(
                sc.compute_command("pan", *angle),
                Err(ComputeError::AngleOutOfRange { .. })
            ));
        }
    }

    #[test]
    fn test_unknown_actuator() {
        let empty: ServoCtrl<RecordingOutput> = ctrl(&[]);
        let full = ctrl(&[pan(), grip()]);

        assert!(empty.is_empty());
        assert_eq!(full.len(), 2);
        assert_eq!(empty.names().count(), 0);

        let mut names: Vec<&str> = full.names().collect();
        names.sort_unstable();
        assert_eq!(names, vec!["grip", "pan"]);

        for sc in [empty, full].iter() {
            assert!(matches!(
                sc.compute_command("nope", 10.0),
                Err(ComputeError::UnknownActuator(n)) if n == "nope"
            ));
        }
    }

    #[test]
    fn test_rejects_equal_min_max() {
        let r = ServoCtrl::new(
            &[config("pan", Direction::Forward, 0.5, 0.5, 180.0)],
            &mut TestMap::with(&["pan"]),
        );

        match r {
            Err(ConfigError::InvalidOutputRange { name, min, max }) => {
                assert_eq!(name, "pan");
                assert_eq!(min, 0.5);
                assert_eq!(max, 0.5);
            }
            Err(e) => panic!("Expected InvalidOutputRange, got {:?}", e),
            Ok(_) => panic!("Expected InvalidOutputRange, got a controller"),
        }
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let mut map = TestMap::with(&["pan"]);
        let r = ServoCtrl::new(
            &[pan(), config("pan", Direction::Reverse, 0.2, 0.4, 90.0)],
            &mut map,
        );

        assert!(matches!(r, Err(ConfigError::DuplicateName(n)) if n == "pan"));
        // The duplicate is rejected before its output is looked up
        assert_eq!(map.lookups, vec!["pan".to_string()]);
    }

    #[test]
    fn test_check_order() {
        // Range is checked before travel
        let r = ServoCtrl::new(
            &[config("x", Direction::Forward, 0.9, 0.1, -1.0)],
            &mut TestMap::with(&["x"]),
        );
        assert!(matches!(r, Err(ConfigError::InvalidOutputRange { .. })));

        // Travel is checked before the duplicate
        let r = ServoCtrl::new(
            &[pan(), config("pan", Direction::Forward, 0.1, 0.9, 0.0)],
            &mut TestMap::with(&["pan"]),
        );
        assert!(matches!(r, Err(ConfigError::InvalidTravel { .. })));

        // Validation happens before lookup, so an invalid config missing from the map is still
        // reported as invalid
        let mut map = TestMap::with(&[]);
        let r = ServoCtrl::new(&[config("y", Direction::Forward, 0.1, 0.9, 0.0)], &mut map);
        assert!(matches!(r, Err(ConfigError::InvalidTravel { .. })));
        assert!(map.lookups.is_empty());
    }

    #[test]
    fn test_lookup_failure_aborts() {
        let mut map = TestMap::with(&["pan"]);
        let r = ServoCtrl::new(&[pan(), grip()], &mut map);

        assert!(matches!(r, Err(ConfigError::DeviceLookupFailed(n)) if n == "grip"));
    }

    #[test]
    fn test_from_parallel_length_mismatch() {
        let r = ServoCtrl::from_parallel(
            &["pan"],
            &[Direction::Forward, Direction::Forward],
            &[0.07],
            &[0.93],
            &[180.0],
            &mut TestMap::with(&["pan"]),
        );

        assert!(matches!(r, Err(ConfigError::LengthMismatch)));
    }

    #[test]
    fn test_apply_angle() {
        let mut map = TestMap::with(&["pan", "grip"]);
        let mut sc = ServoCtrl::new(&[pan(), grip()], &mut map).unwrap();

        let pos = sc.apply_angle("pan", 90.0).unwrap();
        assert!((pos - 0.5).abs() < EPS);
        sc.apply_angle("grip", 0.0).unwrap();

        let pan_positions = map.outputs["pan"].positions.borrow().clone();
        let grip_positions = map.outputs["grip"].positions.borrow().clone();
        assert_eq!(pan_positions, vec![pos]);
        assert!((grip_positions[0] - 0.8).abs() < EPS);

        // Failed computes don't reach the output
        assert!(sc.apply_angle("pan", 200.0).is_err());
        assert!(sc.apply_angle("nope", 0.0).is_err());
        assert_eq!(map.outputs["pan"].positions.borrow().len(), 1);
    }

    #[test]
    fn test_apply_angle_output_error() {
        let mut map = TestMap::with(&["pan"]);
        map.outputs.insert(
            "pan".into(),
            RecordingOutput {
                fail: true,
                ..Default::default()
            },
        );
        let mut sc = ServoCtrl::new(&[pan()], &mut map).unwrap();

        assert!(matches!(
            sc.apply_angle("pan", 10.0),
            Err(ComputeError::Output { name, source: ServoError::I2c }) if name == "pan"
        ));
    }
}
