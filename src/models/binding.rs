//! Bindings as written in `bindings = <...>` arrays.

use serde::Serialize;
use std::fmt;

/// One of the eight ZMK modifier functions (`LS(x)`, `RC(x)`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Modifier {
    /// `LC`
    LeftCtrl,
    /// `LS`
    LeftShift,
    /// `LA`
    LeftAlt,
    /// `LG`
    LeftGui,
    /// `RC`
    RightCtrl,
    /// `RS`
    RightShift,
    /// `RA`
    RightAlt,
    /// `RG`
    RightGui,
}

impl Modifier {
    /// Every modifier in HID bit order.
    pub const ALL: [Self; 8] = [
        Self::LeftCtrl,
        Self::LeftShift,
        Self::LeftAlt,
        Self::LeftGui,
        Self::RightCtrl,
        Self::RightShift,
        Self::RightAlt,
        Self::RightGui,
    ];

    /// Two-letter function name, e.g. `LS`.
    #[must_use]
    pub const fn function(self) -> &'static str {
        match self {
            Self::LeftCtrl => "LC",
            Self::LeftShift => "LS",
            Self::LeftAlt => "LA",
            Self::LeftGui => "LG",
            Self::RightCtrl => "RC",
            Self::RightShift => "RS",
            Self::RightAlt => "RA",
            Self::RightGui => "RG",
        }
    }

    /// Parses a function name, case-insensitively.
    #[must_use]
    pub fn from_function(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.function().eq_ignore_ascii_case(name))
    }

    /// Canonical ZMK key name of the modifier key itself, e.g. `LSHIFT`.
    #[must_use]
    pub const fn key_name(self) -> &'static str {
        match self {
            Self::LeftCtrl => "LCTRL",
            Self::LeftShift => "LSHIFT",
            Self::LeftAlt => "LALT",
            Self::LeftGui => "LGUI",
            Self::RightCtrl => "RCTRL",
            Self::RightShift => "RSHIFT",
            Self::RightAlt => "RALT",
            Self::RightGui => "RGUI",
        }
    }

    /// Bit in the HID modifier byte.
    #[must_use]
    pub const fn bit(self) -> u8 {
        match self {
            Self::LeftCtrl => 0x01,
            Self::LeftShift => 0x02,
            Self::LeftAlt => 0x04,
            Self::LeftGui => 0x08,
            Self::RightCtrl => 0x10,
            Self::RightShift => 0x20,
            Self::RightAlt => 0x40,
            Self::RightGui => 0x80,
        }
    }

    /// Modifiers whose bits are set in `mask`, in bit order.
    #[must_use]
    pub fn from_mask(mask: u8) -> Vec<Self> {
        Self::ALL.into_iter().filter(|m| mask & m.bit() != 0).collect()
    }
}

/// Argument of a modifier function: a key or another modifier function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ModifierArg {
    /// Innermost key name, e.g. `LALT`
    Key(String),
    /// Nested function, e.g. `LS(LALT)`
    Expr(Box<ModifierExpression>),
}

/// A parsed `LC(LS(LALT))` style expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModifierExpression {
    /// Outermost function
    pub modifier: Modifier,
    /// Its argument
    pub arg: ModifierArg,
}

impl ModifierExpression {
    /// Modifiers from outermost to innermost.
    #[must_use]
    pub fn modifiers(&self) -> Vec<Modifier> {
        let mut out = vec![self.modifier];
        let mut arg = &self.arg;
        while let ModifierArg::Expr(inner) = arg {
            out.push(inner.modifier);
            arg = &inner.arg;
        }
        out
    }

    /// The innermost key name.
    #[must_use]
    pub fn key(&self) -> &str {
        let mut arg = &self.arg;
        loop {
            match arg {
                ModifierArg::Key(key) => return key,
                ModifierArg::Expr(inner) => arg = &inner.arg,
            }
        }
    }
}

impl fmt::Display for ModifierExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.arg {
            ModifierArg::Key(key) => write!(f, "{}({key})", self.modifier.function()),
            ModifierArg::Expr(inner) => write!(f, "{}({inner})", self.modifier.function()),
        }
    }
}

/// A parameter that looked like a modifier function but could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedMacro {
    /// Source text as written
    pub text: String,
    /// Why it was rejected
    pub reason: String,
}

impl MalformedMacro {
    /// Creates a malformed-macro record.
    pub fn new(text: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reason: reason.into(),
        }
    }

    /// Inline comment emitted next to the placeholder.
    #[must_use]
    pub fn comment(&self) -> String {
        format!(";; ERROR: malformed or unknown macro: {}", self.text)
    }
}

/// A binding parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Param {
    /// Key or layer name, e.g. `A`, `LSHIFT`, `NAV`
    Key(String),
    /// Integer: a layer index, a timing value, or an encoded keycode
    Number(i64),
    /// `LC(A)` style expression
    Modifier(ModifierExpression),
    /// Unparseable modifier expression
    Malformed(MalformedMacro),
}

impl Param {
    /// Source-like text of the parameter, used for alias names.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Key(key) => key.clone(),
            Self::Number(n) => n.to_string(),
            Self::Modifier(expr) => expr.to_string(),
            Self::Malformed(m) => m.text.clone(),
        }
    }
}

/// Behaviors every ZMK keymap can reference without defining them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Builtin {
    /// `&kp`
    KeyPress,
    /// `&mo`
    Momentary,
    /// `&to`
    To,
    /// `&tog`
    Toggle,
    /// `&sl`
    StickyLayer,
    /// `&mt`
    ModTap,
    /// `&lt`
    LayerTap,
    /// `&sk`
    StickyKey,
    /// `&trans`
    Transparent,
    /// `&none`
    None,
    /// `&caps_word`
    CapsWord,
    /// `&key_repeat`
    KeyRepeat,
    /// `&mkp`
    MouseKeyPress,
    /// `&macro_tap`
    MacroTap,
    /// `&macro_press`
    MacroPress,
    /// `&macro_release`
    MacroRelease,
    /// `&macro_wait_time`
    MacroWaitTime,
    /// `&macro_tap_time`
    MacroTapTime,
    /// `&macro_pause_for_release`
    MacroPauseForRelease,
    /// `&macro_param_<from>to<to>`
    MacroParam {
        /// Binding parameter being read (1 or 2)
        from: u8,
        /// Parameter slot of the next step it fills (1 or 2)
        to: u8,
    },
    /// Firmware-only behavior (`&bt`, `&bootloader`, ...)
    Firmware(&'static str),
}

const FIRMWARE: [&str; 12] = [
    "bt",
    "out",
    "bootloader",
    "sys_reset",
    "rgb_ug",
    "ext_power",
    "bl",
    "soft_off",
    "studio_unlock",
    "msc",
    "mmv",
    "reset",
];

impl Builtin {
    /// Looks up a built-in by the name used after `&`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let builtin = match name {
            "kp" => Self::KeyPress,
            "mo" => Self::Momentary,
            "to" => Self::To,
            "tog" => Self::Toggle,
            "sl" => Self::StickyLayer,
            "mt" => Self::ModTap,
            "lt" => Self::LayerTap,
            "sk" => Self::StickyKey,
            "trans" => Self::Transparent,
            "none" => Self::None,
            "caps_word" => Self::CapsWord,
            "key_repeat" => Self::KeyRepeat,
            "mkp" => Self::MouseKeyPress,
            "macro_tap" => Self::MacroTap,
            "macro_press" => Self::MacroPress,
            "macro_release" => Self::MacroRelease,
            "macro_wait_time" => Self::MacroWaitTime,
            "macro_tap_time" => Self::MacroTapTime,
            "macro_pause_for_release" => Self::MacroPauseForRelease,
            other => {
                if let Some(firmware) = FIRMWARE.into_iter().find(|f| *f == other) {
                    return Some(Self::Firmware(firmware));
                }
                return parse_macro_param(other);
            }
        };
        Some(builtin)
    }

    /// Name as written after `&`.
    #[must_use]
    pub fn name(self) -> String {
        match self {
            Self::KeyPress => "kp".into(),
            Self::Momentary => "mo".into(),
            Self::To => "to".into(),
            Self::Toggle => "tog".into(),
            Self::StickyLayer => "sl".into(),
            Self::ModTap => "mt".into(),
            Self::LayerTap => "lt".into(),
            Self::StickyKey => "sk".into(),
            Self::Transparent => "trans".into(),
            Self::None => "none".into(),
            Self::CapsWord => "caps_word".into(),
            Self::KeyRepeat => "key_repeat".into(),
            Self::MouseKeyPress => "mkp".into(),
            Self::MacroTap => "macro_tap".into(),
            Self::MacroPress => "macro_press".into(),
            Self::MacroRelease => "macro_release".into(),
            Self::MacroWaitTime => "macro_wait_time".into(),
            Self::MacroTapTime => "macro_tap_time".into(),
            Self::MacroPauseForRelease => "macro_pause_for_release".into(),
            Self::MacroParam { from, to } => format!("macro_param_{from}to{to}"),
            Self::Firmware(name) => name.into(),
        }
    }

    /// Number of parameters the behavior takes; `None` means "until the next `&`".
    #[must_use]
    pub const fn binding_cells(self) -> Option<usize> {
        match self {
            Self::ModTap | Self::LayerTap => Some(2),
            Self::KeyPress
            | Self::Momentary
            | Self::To
            | Self::Toggle
            | Self::StickyLayer
            | Self::StickyKey
            | Self::MouseKeyPress
            | Self::MacroWaitTime
            | Self::MacroTapTime => Some(1),
            Self::Transparent
            | Self::None
            | Self::CapsWord
            | Self::KeyRepeat
            | Self::MacroTap
            | Self::MacroPress
            | Self::MacroRelease
            | Self::MacroPauseForRelease
            | Self::MacroParam { .. } => Some(0),
            Self::Firmware(_) => None,
        }
    }

    /// True for the `&macro_*` control tokens.
    #[must_use]
    pub const fn is_macro_control(self) -> bool {
        matches!(
            self,
            Self::MacroTap
                | Self::MacroPress
                | Self::MacroRelease
                | Self::MacroWaitTime
                | Self::MacroTapTime
                | Self::MacroPauseForRelease
                | Self::MacroParam { .. }
        )
    }
}

fn parse_macro_param(name: &str) -> Option<Builtin> {
    let rest = name.strip_prefix("macro_param_")?;
    let (from, to) = rest.split_once("to")?;
    let from: u8 = from.parse().ok().filter(|n| (1..=2).contains(n))?;
    let to: u8 = to.parse().ok().filter(|n| (1..=2).contains(n))?;
    Some(Builtin::MacroParam { from, to })
}

/// What a binding's `&name` refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BehaviorRef {
    /// A behavior ZMK provides without a definition
    Builtin(Builtin),
    /// A behavior defined in the keymap's `behaviors`/`macros` nodes
    Defined(String),
    /// Nothing by that name exists
    Unknown(String),
}

impl BehaviorRef {
    /// Name as written after `&`.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Builtin(builtin) => builtin.name(),
            Self::Defined(name) | Self::Unknown(name) => name.clone(),
        }
    }
}

/// One `&behavior param...` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    /// Referenced behavior
    pub behavior: BehaviorRef,
    /// Parameters after the behavior name
    pub params: Vec<Param>,
    /// Source line of the `&`; bindings on the same line form one row
    pub line: usize,
    /// Source column of the `&`
    pub column: usize,
}

impl Binding {
    /// Creates a binding at a source position.
    #[must_use]
    pub const fn new(behavior: BehaviorRef, params: Vec<Param>, line: usize, column: usize) -> Self {
        Self {
            behavior,
            params,
            line,
            column,
        }
    }

    /// Shorthand for a built-in binding.
    #[must_use]
    pub const fn builtin(builtin: Builtin, params: Vec<Param>, line: usize, column: usize) -> Self {
        Self::new(BehaviorRef::Builtin(builtin), params, line, column)
    }

    /// Source-like rendering, e.g. `&kp LS(A)`.
    #[must_use]
    pub fn source_text(&self) -> String {
        let mut text = format!("&{}", self.behavior.name());
        for param in &self.params {
            text.push(' ');
            text.push_str(&param.text());
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names_round_trip() {
        for name in ["kp", "mo", "lt", "trans", "macro_param_1to1", "bt", "caps_word"] {
            let builtin = Builtin::from_name(name).unwrap();
            assert_eq!(builtin.name(), name);
        }
        assert_eq!(Builtin::from_name("macro_param_3to1"), None);
        assert_eq!(Builtin::from_name("hm"), None);
    }

    #[test]
    fn test_binding_cells() {
        assert_eq!(Builtin::ModTap.binding_cells(), Some(2));
        assert_eq!(Builtin::KeyPress.binding_cells(), Some(1));
        assert_eq!(Builtin::Transparent.binding_cells(), Some(0));
        assert_eq!(Builtin::Firmware("bt").binding_cells(), None);
    }

    #[test]
    fn test_modifier_expression_walk() {
        let expr = ModifierExpression {
            modifier: Modifier::LeftCtrl,
            arg: ModifierArg::Expr(Box::new(ModifierExpression {
                modifier: Modifier::LeftShift,
                arg: ModifierArg::Key("LALT".into()),
            })),
        };
        assert_eq!(expr.modifiers(), vec![Modifier::LeftCtrl, Modifier::LeftShift]);
        assert_eq!(expr.key(), "LALT");
        assert_eq!(expr.to_string(), "LC(LS(LALT))");
    }

    #[test]
    fn test_modifier_mask() {
        assert_eq!(
            Modifier::from_mask(0x22),
            vec![Modifier::LeftShift, Modifier::RightShift]
        );
        assert_eq!(Modifier::from_function("rg"), Some(Modifier::RightGui));
    }

    #[test]
    fn test_source_text() {
        let binding = Binding::builtin(
            Builtin::ModTap,
            vec![Param::Key("LSHIFT".into()), Param::Key("A".into())],
            3,
            5,
        );
        assert_eq!(binding.source_text(), "&mt LSHIFT A");
    }
}
