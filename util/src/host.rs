//! Host platform (linux for example) utility functions

use std::path::PathBuf;

use uname;

/// Name of the environment variable pointing at the software root directory.
pub const EXO_SW_ROOT_VAR: &str = "EXO_SW_ROOT";

/// Retrieve uname information.
pub fn get_uname() -> std::io::Result<uname::Info> {
    uname::uname()
}

/// Get the root directory of the exo software, as set by the `EXO_SW_ROOT`
/// environment variable.
pub fn get_exo_sw_root() -> Result<PathBuf, std::env::VarError> {
    std::env::var(EXO_SW_ROOT_VAR).map(PathBuf::from)
}
