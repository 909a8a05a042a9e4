//! Intermediate keymap model shared by the extractor and the transformers.
//!
//! Everything here is plain data; the extractor builds a [`KeymapConfig`]
//! once and the transform pass only reads it.

pub mod behavior;
pub mod binding;
pub mod keymap;

pub use behavior::{
    validate_disableable_timing, validate_timing, Behavior, Combo, ConditionalLayer, Flavor,
    HoldTap, LayerKind, Macro, MacroMode, MacroStep, ModMorph, StickyKey, TapDance,
    DISABLEABLE_TIMING_RANGE, TIMING_RANGE,
};
pub use binding::{
    BehaviorRef, Binding, Builtin, MalformedMacro, Modifier, ModifierArg, ModifierExpression,
    Param,
};
pub use keymap::{BuiltinBehaviors, GlobalSettings, KeymapConfig, Layer};
