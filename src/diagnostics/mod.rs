//! Diagnostics shared by every conversion stage.
//!
//! Components never print. They build a [`ConversionError`] and hand it to the
//! run's [`ErrorManager`], which logs it, keeps it for the summary section of
//! the generated file, and raises it when it reaches the configured threshold.

pub mod context;
pub mod error;
pub mod manager;

pub use context::render_context;
pub use error::{Component, ConversionError, ErrorKind, Severity};
pub use manager::{ErrorManager, ErrorReport};
