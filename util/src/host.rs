//! Host platform (linux for example) utility functions

use std::path::PathBuf;

/// Environment variable pointing at the root of the software tree.
///
/// Parameter files are found in `$SERVO_CAL_SW_ROOT/params` and sessions are created under this
/// directory.
pub const SW_ROOT_ENV_VAR: &str = "SERVO_CAL_SW_ROOT";

/// Basic information on the platform the software was built for.
#[derive(Debug, Clone, Copy)]
pub struct Platform {
    pub os: &'static str,
    pub family: &'static str,
    pub arch: &'static str,
}

/// Retrieve the root directory of the software tree.
pub fn get_sw_root() -> Result<PathBuf, std::env::VarError> {
    std::env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}

/// Retrieve information on the platform.
pub fn get_platform() -> Platform {
    Platform {
        os: std::env::consts::OS,
        family: std::env::consts::FAMILY,
        arch: std::env::consts::ARCH,
    }
}
