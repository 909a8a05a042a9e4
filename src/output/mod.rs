//! Kanata text generation and the metadata that accompanies it.

pub mod assembler;
pub mod defsrc;
pub mod metadata;

pub use assembler::{assemble, AssembleOptions, Assembled};
pub use metadata::{AssemblyStats, ConversionMetadata};
