//! Keymap model to Kanata fragments.
//!
//! Every binding goes through [`TransformContext::binding`], which dispatches
//! on the referenced behavior and returns a [`Rendered`]: the action text to
//! place in a layer, the named definitions it depends on, and any comments to
//! attach after the row. Sub-bindings (the tap half of a hold-tap, the keys of
//! a tap-dance) recurse through the same entry point.

pub mod combo;
pub mod hold_tap;
pub mod layer;
pub mod macros;
pub mod mod_morph;
pub mod sticky_key;
pub mod tap_dance;

use crate::diagnostics::{Component, ConversionError, ErrorKind, ErrorManager};
use crate::keycodes::modifier::render_chord;
use crate::keycodes::{numeric, KeycodeDb, ModifierConvention};
use crate::models::{Behavior, BehaviorRef, Binding, Builtin, KeymapConfig, LayerKind, Param};
use std::collections::HashSet;

/// Nesting limit for behaviors that render other bindings.
const MAX_DEPTH: usize = 8;

/// Kanata placeholder for a key that does nothing.
pub const NO_OP: &str = "XX";

/// Kanata placeholder for a transparent key.
pub const TRANSPARENT: &str = "_";

/// Timeout for `&caps_word`, in milliseconds.
pub const CAPS_WORD_TIMEOUT_MS: u32 = 2000;

/// A named Kanata definition a binding depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Definition {
    /// Entry of `(defalias ...)`
    Alias {
        /// Alias name, referenced as `@name`
        name: String,
        /// Action expression
        body: String,
        /// Comment lines placed above the entry
        todos: Vec<String>,
    },
    /// `(defmacro name ...)` block
    Macro {
        /// Macro name, referenced as `@name`
        name: String,
        /// One step per line
        lines: Vec<String>,
        /// Comment lines placed above the block
        todos: Vec<String>,
    },
}

impl Definition {
    /// The name the definition is referenced by.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Alias { name, .. } | Self::Macro { name, .. } => name,
        }
    }

    /// Text compared when two definitions share a name.
    #[must_use]
    pub fn body(&self) -> String {
        match self {
            Self::Alias { body, .. } => body.clone(),
            Self::Macro { lines, .. } => lines.join("\n"),
        }
    }
}

/// Rendering of one binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    /// Text placed at the key position
    pub action: String,
    /// Definitions the action depends on, innermost first
    pub definitions: Vec<Definition>,
    /// Comments attached after the row
    pub comments: Vec<String>,
}

impl Rendered {
    /// A plain action with nothing attached.
    #[must_use]
    pub fn inline(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    /// `XX` with an explanatory comment.
    #[must_use]
    pub fn placeholder(comment: impl Into<String>) -> Self {
        Self {
            action: NO_OP.to_string(),
            definitions: Vec::new(),
            comments: vec![comment.into()],
        }
    }

    /// `@name`, defined by `definition`.
    #[must_use]
    pub fn reference(definition: Definition) -> Self {
        Self {
            action: format!("@{}", definition.name()),
            definitions: vec![definition],
            comments: Vec::new(),
        }
    }

    /// Takes `other`'s definitions and comments, returning its action.
    pub fn absorb(&mut self, other: Self) -> String {
        self.definitions.extend(other.definitions);
        self.comments.extend(other.comments);
        other.action
    }
}

/// Name of the alias or macro for a behavior invoked with `params`.
///
/// `hm` with `LGUI A` gives `hm_lgui_a`; `(` and `,` become `_`, `)` is
/// dropped, and anything else outside `[a-z0-9_]` is removed.
#[must_use]
pub fn alias_name(behavior: &str, params: &[Param]) -> String {
    let mut raw = behavior.to_string();
    for param in params {
        raw.push('_');
        raw.push_str(&param.text());
    }

    let mut name = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '(' | ',' => name.push('_'),
            ')' => {}
            c if c.is_ascii_alphanumeric() || c == '_' => name.push(c.to_ascii_lowercase()),
            _ => {}
        }
    }
    name
}

/// Shared state for one transformation pass.
#[derive(Debug)]
pub struct TransformContext<'a> {
    /// The keymap being converted
    pub config: &'a KeymapConfig,
    /// Key name table
    pub keycodes: &'a KeycodeDb,
    /// GUI naming convention
    pub convention: ModifierConvention,
    /// `defsrc` keys, by key position
    pub source_keys: &'a [String],
    /// The run's diagnostics
    pub errors: &'a mut ErrorManager,
    layer_names: Vec<String>,
    reported: HashSet<String>,
    depth: usize,
}

impl<'a> TransformContext<'a> {
    /// Creates a context over `config`.
    pub fn new(
        config: &'a KeymapConfig,
        keycodes: &'a KeycodeDb,
        convention: ModifierConvention,
        source_keys: &'a [String],
        errors: &'a mut ErrorManager,
    ) -> Self {
        Self {
            config,
            keycodes,
            convention,
            source_keys,
            errors,
            layer_names: config.layer_names(),
            reported: HashSet::new(),
            depth: 0,
        }
    }

    /// `deflayer` names in layer order.
    #[must_use]
    pub fn layer_names(&self) -> &[String] {
        &self.layer_names
    }

    /// Reports `error` unless a report with the same `key` was already made.
    pub fn report_once(&mut self, key: &str, error: ConversionError) -> Result<(), ConversionError> {
        if self.reported.insert(key.to_string()) {
            self.errors.report(error)?;
        }
        Ok(())
    }

    /// Renders a binding.
    pub fn binding(&mut self, binding: &Binding) -> Result<Rendered, ConversionError> {
        if self.depth >= MAX_DEPTH {
            self.errors.report(
                ConversionError::new(
                    ErrorKind::BindingResolutionError,
                    Component::Assembler,
                    format!("{} nests behaviors too deeply", binding.source_text()),
                )
                .with_position(binding.line, binding.column),
            )?;
            return Ok(Rendered::placeholder(format!(
                ";; ERROR: recursive behavior {}",
                binding.source_text()
            )));
        }

        self.depth += 1;
        let rendered = self.dispatch(binding);
        self.depth -= 1;
        rendered
    }

    /// Renders `behavior` applied to `params`, positioned like `at`.
    pub fn apply(
        &mut self,
        behavior: &BehaviorRef,
        params: &[Param],
        at: &Binding,
    ) -> Result<Rendered, ConversionError> {
        let binding = Binding::new(behavior.clone(), params.to_vec(), at.line, at.column);
        self.binding(&binding)
    }

    fn dispatch(&mut self, binding: &Binding) -> Result<Rendered, ConversionError> {
        match &binding.behavior {
            BehaviorRef::Builtin(builtin) => self.builtin(*builtin, binding),
            BehaviorRef::Defined(name) => self.defined(name, binding),
            BehaviorRef::Unknown(name) => Ok(Rendered::placeholder(format!(
                ";; unknown behavior &{name}"
            ))),
        }
    }

    fn builtin(&mut self, builtin: Builtin, binding: &Binding) -> Result<Rendered, ConversionError> {
        let config = self.config;
        match builtin {
            Builtin::KeyPress => self.key_binding(binding),
            Builtin::Transparent => Ok(Rendered::inline(TRANSPARENT)),
            Builtin::None => Ok(Rendered::inline(NO_OP)),
            Builtin::Momentary => layer::render(self, LayerKind::Momentary, binding),
            Builtin::To => layer::render(self, LayerKind::To, binding),
            Builtin::Toggle => layer::render(self, LayerKind::Toggle, binding),
            Builtin::StickyLayer => layer::render(self, LayerKind::Sticky, binding),
            Builtin::ModTap => hold_tap::render(self, "mt", &config.builtins.mod_tap, binding),
            Builtin::LayerTap => hold_tap::render(self, "lt", &config.builtins.layer_tap, binding),
            Builtin::StickyKey => sticky_key::render(self, "sk", &config.builtins.sticky_key, binding),
            Builtin::CapsWord => Ok(Rendered::inline(format!("(caps-word {CAPS_WORD_TIMEOUT_MS})"))),
            Builtin::KeyRepeat => Ok(Rendered::inline("rpt")),
            Builtin::MouseKeyPress => self.mouse_button(binding),
            Builtin::Firmware(name) => self.unsupported(name, binding),
            Builtin::MacroTap
            | Builtin::MacroPress
            | Builtin::MacroRelease
            | Builtin::MacroWaitTime
            | Builtin::MacroTapTime
            | Builtin::MacroPauseForRelease
            | Builtin::MacroParam { .. } => {
                self.errors.report(
                    ConversionError::new(
                        ErrorKind::BindingResolutionError,
                        Component::Macro,
                        format!("&{} is only meaningful inside a macro", builtin.name()),
                    )
                    .with_position(binding.line, binding.column),
                )?;
                Ok(Rendered::placeholder(format!(
                    ";; ERROR: &{} outside a macro",
                    builtin.name()
                )))
            }
        }
    }

    fn defined(&mut self, name: &str, binding: &Binding) -> Result<Rendered, ConversionError> {
        let config = self.config;
        let Some(behavior) = config.behaviors.get(name) else {
            self.report_once(
                &format!("skipped:{name}"),
                ConversionError::new(
                    ErrorKind::BindingResolutionError,
                    Component::Assembler,
                    format!("&{name} refers to a behavior that could not be converted"),
                )
                .with_position(binding.line, binding.column),
            )?;
            return Ok(Rendered::placeholder(format!(
                ";; ERROR: &{name} could not be converted"
            )));
        };

        match behavior {
            Behavior::HoldTap(hold_tap) => hold_tap::render(self, name, hold_tap, binding),
            Behavior::Macro(m) => macros::render(self, name, m, binding),
            Behavior::StickyKey(sticky) => sticky_key::render(self, name, sticky, binding),
            Behavior::TapDance(td) => tap_dance::render(self, name, td, binding),
            Behavior::ModMorph(morph) => mod_morph::render(self, name, morph, binding),
            Behavior::Unsupported { compatible, .. } => {
                let compatible = compatible.clone();
                self.unsupported(&format!("{name} ({compatible})"), binding)
            }
            Behavior::Combo(_) | Behavior::ConditionalLayer(_) => {
                self.errors.report(
                    ConversionError::new(
                        ErrorKind::BindingResolutionError,
                        Component::Assembler,
                        format!("&{name} is a {} and cannot be bound to a key", behavior.type_name()),
                    )
                    .with_position(binding.line, binding.column),
                )?;
                Ok(Rendered::placeholder(format!(";; ERROR: &{name} is not a key behavior")))
            }
            Behavior::Layer { .. }
            | Behavior::KeyPress
            | Behavior::Transparent
            | Behavior::NoOp
            | Behavior::CapsWord
            | Behavior::KeyRepeat
            | Behavior::MouseKeyPress => match behavior.as_builtin() {
                Some(builtin) => self.builtin(builtin, binding),
                None => Ok(Rendered::inline(NO_OP)),
            },
        }
    }

    fn unsupported(&mut self, what: &str, binding: &Binding) -> Result<Rendered, ConversionError> {
        self.report_once(
            &format!("unsupported:{what}"),
            ConversionError::new(
                ErrorKind::BindingResolutionError,
                Component::Assembler,
                format!("&{what} is firmware-only and has no Kanata equivalent"),
            )
            .with_position(binding.line, binding.column)
            .with_suggestion("bindings using it are converted to XX"),
        )?;
        Ok(Rendered::placeholder(format!(
            ";; TODO: {} has no Kanata equivalent",
            binding.source_text()
        )))
    }

    fn key_binding(&mut self, binding: &Binding) -> Result<Rendered, ConversionError> {
        match binding.params.first() {
            Some(param) => self.key(param, binding),
            None => Ok(Rendered::placeholder(format!(
                ";; ERROR: {} has no key",
                binding.source_text()
            ))),
        }
    }

    /// Renders a key parameter: a name, a chord, or a numeric keycode.
    pub fn key(&mut self, param: &Param, at: &Binding) -> Result<Rendered, ConversionError> {
        match param {
            Param::Key(name) => {
                if let Some(key) = self.keycodes.kanata_key(name, self.convention) {
                    return Ok(Rendered::inline(key));
                }
                let lowered = name.to_ascii_lowercase();
                self.report_unknown_key(name, &lowered, at)?;
                Ok(Rendered::inline(lowered))
            }
            Param::Modifier(expr) => {
                let chord = render_chord(expr, self.keycodes, self.convention);
                if !chord.known {
                    self.report_unknown_key(expr.key(), &chord.text, at)?;
                }
                Ok(Rendered::inline(chord.text))
            }
            Param::Number(value) => match numeric::render(*value, self.keycodes, self.convention) {
                Some(key) => Ok(Rendered::inline(key)),
                None => {
                    self.report_once(
                        &format!("numeric:{value}"),
                        ConversionError::new(
                            ErrorKind::BindingResolutionError,
                            Component::Keycodes,
                            format!("numeric keycode {value} is not in the keycode table"),
                        )
                        .with_position(at.line, at.column),
                    )?;
                    Ok(Rendered::placeholder(numeric::unknown_comment(*value)))
                }
            },
            Param::Malformed(malformed) => Ok(Rendered::placeholder(malformed.comment())),
        }
    }

    fn report_unknown_key(&mut self, name: &str, rendered: &str, at: &Binding) -> Result<(), ConversionError> {
        self.report_once(
            &format!("key:{name}"),
            ConversionError::new(
                ErrorKind::BindingResolutionError,
                Component::Keycodes,
                format!("unknown key name '{name}'; passed through as '{rendered}'"),
            )
            .with_position(at.line, at.column),
        )
    }

    fn mouse_button(&mut self, binding: &Binding) -> Result<Rendered, ConversionError> {
        let button = match binding.params.first() {
            Some(Param::Key(name)) => match name.to_ascii_uppercase().as_str() {
                "LCLK" | "MB1" => Some("mlft"),
                "RCLK" | "MB2" => Some("mrgt"),
                "MCLK" | "MB3" => Some("mmid"),
                "MB4" => Some("mbck"),
                "MB5" => Some("mfwd"),
                _ => None,
            },
            Some(Param::Number(1)) => Some("mlft"),
            Some(Param::Number(2)) => Some("mrgt"),
            Some(Param::Number(4)) => Some("mmid"),
            _ => None,
        };
        match button {
            Some(button) => Ok(Rendered::inline(button)),
            None => {
                self.errors.report(
                    ConversionError::new(
                        ErrorKind::BindingResolutionError,
                        Component::Keycodes,
                        format!("unknown mouse button in {}", binding.source_text()),
                    )
                    .with_position(binding.line, binding.column),
                )?;
                Ok(Rendered::placeholder(format!(
                    ";; ERROR: unknown mouse button {}",
                    binding.source_text()
                )))
            }
        }
    }

    /// Resolves a layer parameter (index or name) to its `deflayer` name.
    ///
    /// Unresolvable references are reported and give `None`.
    pub fn layer_ref(
        &mut self,
        param: Option<&Param>,
        component: Component,
        at: &Binding,
    ) -> Result<Option<String>, ConversionError> {
        let config = self.config;
        let position = match param {
            Some(Param::Number(n)) => usize::try_from(*n)
                .ok()
                .and_then(|index| config.layers.iter().position(|l| l.index == index)),
            Some(Param::Key(name)) => config.find_layer(name),
            _ => None,
        };

        if let Some(position) = position {
            return Ok(self.layer_names.get(position).cloned());
        }

        let shown = param.map_or_else(|| "nothing".to_string(), Param::text);
        self.errors.report(
            ConversionError::new(
                ErrorKind::BindingResolutionError,
                component,
                format!(
                    "{} refers to layer {shown}, but the keymap has {} layer(s)",
                    at.source_text(),
                    config.layers.len()
                ),
            )
            .with_position(at.line, at.column),
        )?;
        Ok(None)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::models::Layer;

    pub fn kp(key: &str) -> Binding {
        Binding::builtin(Builtin::KeyPress, vec![Param::Key(key.into())], 1, 1)
    }

    pub fn layer(name: &str, index: usize, bindings: Vec<Binding>) -> Layer {
        Layer {
            name: name.into(),
            display_name: None,
            index,
            bindings,
        }
    }

    pub fn config_with_layers(names: &[&str]) -> KeymapConfig {
        KeymapConfig {
            layers: names
                .iter()
                .enumerate()
                .map(|(i, name)| layer(name, i, vec![kp("A"), kp("B"), kp("C")]))
                .collect(),
            ..KeymapConfig::default()
        }
    }

    pub fn source_keys() -> Vec<String> {
        ["a", "b", "c", "d", "e", "f"].iter().map(ToString::to_string).collect()
    }
}
