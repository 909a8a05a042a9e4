//! Application-wide constants.

/// The display name of the application.
pub const APP_NAME: &str = "ZMK to Kanata";

/// The binary name of the application (also the config directory name).
pub const APP_BINARY_NAME: &str = "zmk-kanata";
