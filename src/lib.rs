//! ZMK to Kanata keymap conversion.
//!
//! The pipeline runs the C preprocessor over a ZMK `.keymap`, parses the
//! devicetree source, extracts layers and behaviors into a [`models::KeymapConfig`],
//! and assembles an equivalent Kanata configuration. Anything without a Kanata
//! counterpart becomes a placeholder plus a diagnostic rather than being dropped.
//!
//! ```no_run
//! use zmk_kanata::pipeline::{ConvertOptions, Converter};
//!
//! let converter = Converter::new(ConvertOptions::default());
//! let output = converter.convert_str("/ { keymap { compatible = \"zmk,keymap\"; }; };")?;
//! println!("{}", output.kanata);
//! # Ok::<(), zmk_kanata::pipeline::ConversionFailure>(())
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod diagnostics;
pub mod dts;
pub mod extract;
pub mod keycodes;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod transform;

pub use pipeline::{ConversionFailure, ConversionOutput, ConvertOptions, Converter};
