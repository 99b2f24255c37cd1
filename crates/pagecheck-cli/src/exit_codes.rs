//! Exit codes for the `pagecheck` binary. Part of the public contract.

pub const SUCCESS: i32 = 0;
pub const CHECK_FAILED: i32 = 1; // A case or a group failed
pub const CONFIG_ERROR: i32 = 2; // Bad suite file, bad arguments or internal error
