//! Standard exit codes (BSD sysexits.h compatible)

/// Successful termination
pub const OK: i32 = 0;

/// Command line usage error
pub const USAGE: i32 = 64;

/// Service unavailable (documentation generator missing)
pub const UNAVAILABLE: i32 = 69;

/// Internal software error (generator or renderer failed)
pub const SOFTWARE: i32 = 70;

/// System error (e.g., can't fork the renderer)
pub const OSERR: i32 = 71;

/// Input/output error
pub const IOERR: i32 = 74;

/// Configuration error
pub const CONFIG: i32 = 78;
