//! Host platform (linux for example) utility functions

use std::env;
use std::path::PathBuf;

/// Name of the environment variable pointing at the software root directory.
pub const SW_ROOT_ENV_VAR: &str = "MOTION_SW_ROOT";

/// Retrieve the software root directory, which contains the `params` and `sessions` directories.
pub fn get_motion_sw_root() -> Result<PathBuf, env::VarError> {
    env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}

/// Retrieve the host name of the machine, for logging.
pub fn get_hostname() -> String {
    match std::fs::read_to_string("/etc/hostname") {
        Ok(s) => s.trim().to_string(),
        Err(_) => String::from("unknown"),
    }
}
