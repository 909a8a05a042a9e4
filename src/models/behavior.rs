//! Behavior definitions extracted from `behaviors`, `macros` and `combos` nodes.
//!
//! [`Behavior`] is a closed enum; every consumer matches it exhaustively, so a
//! new ZMK behavior kind means a new variant plus its match arms.

use super::binding::{BehaviorRef, Binding, Builtin};
use serde::Serialize;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Accepted range for every millisecond timing value.
pub const TIMING_RANGE: RangeInclusive<i64> = 1..=10_000;

/// Accepted range for timings where `0` switches the feature off
/// (`quick-tap-ms`, `require-prior-idle-ms`).
pub const DISABLEABLE_TIMING_RANGE: RangeInclusive<i64> = 0..=10_000;

/// Returns the value as milliseconds when it lies in [`TIMING_RANGE`].
#[must_use]
pub fn validate_timing(value: i64) -> Option<u32> {
    if TIMING_RANGE.contains(&value) {
        u32::try_from(value).ok()
    } else {
        None
    }
}

/// Like [`validate_timing`] but also accepts `0`.
#[must_use]
pub fn validate_disableable_timing(value: i64) -> Option<u32> {
    if DISABLEABLE_TIMING_RANGE.contains(&value) {
        u32::try_from(value).ok()
    } else {
        None
    }
}

/// Hold-tap decision flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Flavor {
    /// Hold once another key is pressed
    #[default]
    HoldPreferred,
    /// Hold only after the tapping term
    TapPreferred,
    /// Hold when another key is pressed and released
    Balanced,
    /// Tap unless another key interrupts before the tapping term
    TapUnlessInterrupted,
}

impl Flavor {
    /// ZMK spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HoldPreferred => "hold-preferred",
            Self::TapPreferred => "tap-preferred",
            Self::Balanced => "balanced",
            Self::TapUnlessInterrupted => "tap-unless-interrupted",
        }
    }
}

impl FromStr for Flavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hold-preferred" => Ok(Self::HoldPreferred),
            "tap-preferred" => Ok(Self::TapPreferred),
            "balanced" => Ok(Self::Balanced),
            "tap-unless-interrupted" => Ok(Self::TapUnlessInterrupted),
            other => Err(format!("unknown hold-tap flavor '{other}'")),
        }
    }
}

/// `zmk,behavior-hold-tap`, also used for the built-in `&mt` and `&lt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HoldTap {
    /// `tapping-term-ms`, when set
    pub tapping_term_ms: Option<u32>,
    /// `hold-time-ms`, when set
    pub hold_time_ms: Option<u32>,
    /// `quick-tap-ms`, when set
    pub quick_tap_ms: Option<u32>,
    /// `require-prior-idle-ms`, when set
    pub require_prior_idle_ms: Option<u32>,
    /// `flavor`
    pub flavor: Flavor,
    /// `hold-trigger-key-positions`
    pub hold_trigger_positions: Vec<usize>,
    /// `hold-trigger-on-release`
    pub hold_trigger_on_release: bool,
    /// `retro-tap`
    pub retro_tap: bool,
    /// First entry of `bindings`, fed the first parameter
    pub hold: BehaviorRef,
    /// Second entry of `bindings`, fed the second parameter
    pub tap: BehaviorRef,
}

impl HoldTap {
    /// A hold-tap with ZMK defaults and the given hold/tap behaviors.
    #[must_use]
    pub const fn new(hold: BehaviorRef, tap: BehaviorRef) -> Self {
        Self {
            tapping_term_ms: None,
            hold_time_ms: None,
            quick_tap_ms: None,
            require_prior_idle_ms: None,
            flavor: Flavor::HoldPreferred,
            hold_trigger_positions: Vec::new(),
            hold_trigger_on_release: false,
            retro_tap: false,
            hold,
            tap,
        }
    }

    /// Built-in `&mt`: hold-preferred, `&kp` for both halves.
    #[must_use]
    pub const fn mod_tap() -> Self {
        Self::new(
            BehaviorRef::Builtin(Builtin::KeyPress),
            BehaviorRef::Builtin(Builtin::KeyPress),
        )
    }

    /// Built-in `&lt`: tap-preferred, `&mo` on hold.
    #[must_use]
    pub fn layer_tap() -> Self {
        Self {
            flavor: Flavor::TapPreferred,
            ..Self::new(
                BehaviorRef::Builtin(Builtin::Momentary),
                BehaviorRef::Builtin(Builtin::KeyPress),
            )
        }
    }
}

/// Activation mode of the macro state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MacroMode {
    /// Press and release each key
    #[default]
    Tap,
    /// Press and hold
    Press,
    /// Release
    Release,
}

/// One entry of a macro's `bindings`, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MacroStep {
    /// `&macro_tap`, `&macro_press` or `&macro_release`
    Mode(MacroMode),
    /// A key or behavior binding played in the active mode
    Key(Binding),
    /// `&macro_wait_time N`, already validated
    Wait(u32),
    /// `&macro_tap_time N`, already validated
    TapTime(u32),
    /// `&macro_pause_for_release`
    PauseForRelease,
    /// `&macro_param_XtoY`
    Param {
        /// Binding parameter being read
        from: u8,
        /// Parameter slot of the next step
        to: u8,
    },
}

/// `zmk,behavior-macro` and its one/two-parameter variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Macro {
    /// `wait-ms`, default 15
    pub wait_ms: u32,
    /// `tap-ms`, default 30
    pub tap_ms: u32,
    /// Steps in source order
    pub steps: Vec<MacroStep>,
    /// 0, 1 or 2 binding parameters
    pub param_count: usize,
}

impl Macro {
    /// Default `wait-ms`.
    pub const DEFAULT_WAIT_MS: u32 = 15;
    /// Default `tap-ms`.
    pub const DEFAULT_TAP_MS: u32 = 30;
}

/// `zmk,behavior-sticky-key`, also the built-in `&sk`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StickyKey {
    /// `release-after-ms`, default 1000
    pub release_after_ms: u32,
    /// `quick-release`
    pub quick_release: bool,
    /// `ignore-modifiers`
    pub ignore_modifiers: bool,
    /// Behavior fed the parameter, normally `&kp`
    pub binding: BehaviorRef,
}

impl Default for StickyKey {
    fn default() -> Self {
        Self {
            release_after_ms: 1000,
            quick_release: false,
            ignore_modifiers: false,
            binding: BehaviorRef::Builtin(Builtin::KeyPress),
        }
    }
}

/// Layer behavior kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    /// Active while held (`&mo`)
    Momentary,
    /// Switch to the layer (`&to`)
    To,
    /// Toggle the layer (`&tog`)
    Toggle,
    /// Active for the next key press (`&sl`)
    Sticky,
}

/// `zmk,combos` child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Combo {
    /// `key-positions`
    pub key_positions: Vec<usize>,
    /// `timeout-ms`, default 50
    pub timeout_ms: u32,
    /// `bindings`
    pub bindings: Vec<Binding>,
    /// `layers`; empty means every layer
    pub layers: Vec<usize>,
    /// `require-prior-idle-ms`, when set
    pub require_prior_idle_ms: Option<u32>,
    /// `slow-release`
    pub slow_release: bool,
}

impl Combo {
    /// Default `timeout-ms`.
    pub const DEFAULT_TIMEOUT_MS: u32 = 50;
}

/// `zmk,behavior-tap-dance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TapDance {
    /// `tapping-term-ms`, default 200
    pub tapping_term_ms: u32,
    /// One binding per tap count
    pub bindings: Vec<Binding>,
}

impl TapDance {
    /// Default `tapping-term-ms`.
    pub const DEFAULT_TAPPING_TERM_MS: u32 = 200;
}

/// `zmk,behavior-mod-morph`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModMorph {
    /// Binding without the trigger modifiers
    pub default: Binding,
    /// Binding while a trigger modifier is held
    pub morphed: Binding,
    /// Trigger modifier mask
    pub mods: u8,
    /// Modifiers passed through to the morphed binding
    pub keep_mods: u8,
}

/// A child of `zmk,conditional-layers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConditionalLayer {
    /// `if-layers`
    pub if_layers: Vec<usize>,
    /// `then-layer`
    pub then_layer: usize,
}

/// Every behavior kind the converter understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Behavior {
    /// Tap/hold dual-role key
    HoldTap(HoldTap),
    /// Scripted key sequence
    Macro(Macro),
    /// One-shot key
    StickyKey(StickyKey),
    /// Layer switching behavior defined in the source
    Layer {
        /// Which layer action
        kind: LayerKind,
    },
    /// Chord
    Combo(Combo),
    /// Tap-count dependent binding
    TapDance(TapDance),
    /// Modifier-dependent binding
    ModMorph(ModMorph),
    /// Layer activated when others are all active
    ConditionalLayer(ConditionalLayer),
    /// `zmk,behavior-key-press` declared in the source
    KeyPress,
    /// `zmk,behavior-transparent`
    Transparent,
    /// `zmk,behavior-none`
    NoOp,
    /// `zmk,behavior-caps-word`
    CapsWord,
    /// `zmk,behavior-key-repeat`
    KeyRepeat,
    /// `zmk,behavior-mouse-key-press`
    MouseKeyPress,
    /// Firmware-only behavior with no Kanata counterpart
    Unsupported {
        /// The `compatible` string
        compatible: String,
        /// `#binding-cells`
        binding_cells: usize,
    },
}

impl Behavior {
    /// Number of parameters a binding of this behavior takes.
    #[must_use]
    pub fn binding_cells(&self) -> usize {
        match self {
            Self::HoldTap(_) => 2,
            Self::Macro(m) => m.param_count,
            Self::StickyKey(_) | Self::Layer { .. } | Self::KeyPress | Self::MouseKeyPress => 1,
            Self::Unsupported { binding_cells, .. } => *binding_cells,
            Self::Combo(_)
            | Self::TapDance(_)
            | Self::ModMorph(_)
            | Self::ConditionalLayer(_)
            | Self::Transparent
            | Self::NoOp
            | Self::CapsWord
            | Self::KeyRepeat => 0,
        }
    }

    /// The built-in this behavior re-declares, if any.
    ///
    /// Fully preprocessed sources contain ZMK's own system behavior nodes;
    /// bindings to them render exactly like the built-ins.
    #[must_use]
    pub const fn as_builtin(&self) -> Option<Builtin> {
        match self {
            Self::KeyPress => Some(Builtin::KeyPress),
            Self::Transparent => Some(Builtin::Transparent),
            Self::NoOp => Some(Builtin::None),
            Self::CapsWord => Some(Builtin::CapsWord),
            Self::KeyRepeat => Some(Builtin::KeyRepeat),
            Self::MouseKeyPress => Some(Builtin::MouseKeyPress),
            Self::Layer { kind } => Some(match kind {
                LayerKind::Momentary => Builtin::Momentary,
                LayerKind::To => Builtin::To,
                LayerKind::Toggle => Builtin::Toggle,
                LayerKind::Sticky => Builtin::StickyLayer,
            }),
            _ => None,
        }
    }

    /// Short name for summaries.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::HoldTap(_) => "hold-tap",
            Self::Macro(_) => "macro",
            Self::StickyKey(_) => "sticky-key",
            Self::Layer { .. } => "layer",
            Self::Combo(_) => "combo",
            Self::TapDance(_) => "tap-dance",
            Self::ModMorph(_) => "mod-morph",
            Self::ConditionalLayer(_) => "conditional-layer",
            Self::KeyPress => "key-press",
            Self::Transparent => "transparent",
            Self::NoOp => "none",
            Self::CapsWord => "caps-word",
            Self::KeyRepeat => "key-repeat",
            Self::MouseKeyPress => "mouse-key-press",
            Self::Unsupported { .. } => "unsupported",
        }
    }
}
