//! Host platform (linux for example) utility functions

use std::{env, path::PathBuf};

/// Environment variable holding the root directory of the rover software. Parameter files and
/// session directories are found relative to it.
pub const SW_ROOT_ENV_VAR: &str = "RC_ROVER_ROOT";

/// Retrieve uname information.
pub fn get_uname() -> std::io::Result<uname::Info> {
    uname::uname()
}

/// Get the root directory of the rover software.
pub fn get_rover_sw_root() -> Result<PathBuf, env::VarError> {
    env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}
