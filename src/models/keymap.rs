//! Layers, global settings, and the extracted keymap as a whole.

use super::behavior::{Behavior, Combo, ConditionalLayer, HoldTap, StickyKey};
use super::binding::Binding;
use indexmap::IndexMap;
use serde::Serialize;

/// A `keymap` child node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Layer {
    /// Devicetree node name, e.g. `default_layer`
    pub name: String,
    /// `display-name` or `label` property
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Position among the keymap's layers
    pub index: usize,
    /// Bindings in key-position order
    pub bindings: Vec<Binding>,
}

impl Layer {
    /// Name used for `deflayer`; a trailing `_layer` is dropped.
    #[must_use]
    pub fn base_name(&self) -> &str {
        match self.name.strip_suffix("_layer") {
            Some(stripped) if !stripped.is_empty() => stripped,
            _ => &self.name,
        }
    }

    /// True if `reference` names this layer by node name, base name or display name.
    #[must_use]
    pub fn matches(&self, reference: &str) -> bool {
        self.name.eq_ignore_ascii_case(reference)
            || self.base_name().eq_ignore_ascii_case(reference)
            || self
                .display_name
                .as_deref()
                .is_some_and(|d| d.eq_ignore_ascii_case(reference))
    }

    /// Bindings grouped into rows by source line.
    #[must_use]
    pub fn rows(&self) -> Vec<&[Binding]> {
        let mut rows = Vec::new();
        let mut start = 0;
        for i in 1..=self.bindings.len() {
            if i == self.bindings.len() || self.bindings[i].line != self.bindings[start].line {
                rows.push(&self.bindings[start..i]);
                start = i;
            }
        }
        rows
    }
}

/// Keymap-wide timing variables emitted as `defvar`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GlobalSettings {
    /// `tap-time`, default 200
    pub tap_time_ms: u32,
    /// `hold-time`, default 250
    pub hold_time_ms: u32,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            tap_time_ms: 200,
            hold_time_ms: 250,
        }
    }
}

/// Built-in behaviors whose properties a `&label { ... };` block may override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuiltinBehaviors {
    /// `&mt`
    pub mod_tap: HoldTap,
    /// `&lt`
    pub layer_tap: HoldTap,
    /// `&sk`
    pub sticky_key: StickyKey,
}

impl Default for BuiltinBehaviors {
    fn default() -> Self {
        Self {
            mod_tap: HoldTap::mod_tap(),
            layer_tap: HoldTap::layer_tap(),
            sticky_key: StickyKey::default(),
        }
    }
}

/// Everything the transformers need, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct KeymapConfig {
    /// Layers in source order
    pub layers: Vec<Layer>,
    /// Defined behaviors by name, in source order
    pub behaviors: IndexMap<String, Behavior>,
    /// `tap-time` / `hold-time`
    pub global_settings: GlobalSettings,
    /// Built-ins after overrides
    pub builtins: BuiltinBehaviors,
}

impl KeymapConfig {
    /// `deflayer` names, one per layer, made unique by suffixing `_2`, `_3`, ...
    #[must_use]
    pub fn layer_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let base = layer.base_name().to_string();
            let mut candidate = base.clone();
            let mut n = 2;
            while names.contains(&candidate) {
                candidate = format!("{base}_{n}");
                n += 1;
            }
            names.push(candidate);
        }
        names
    }

    /// Index of the layer referenced by `reference` (node name, base name or display name).
    #[must_use]
    pub fn find_layer(&self, reference: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.matches(reference))
    }

    /// Combos in source order.
    pub fn combos(&self) -> impl Iterator<Item = (&str, &Combo)> {
        self.behaviors.iter().filter_map(|(name, b)| match b {
            Behavior::Combo(combo) => Some((name.as_str(), combo)),
            _ => None,
        })
    }

    /// Conditional layers in source order.
    pub fn conditional_layers(
        &self,
    ) -> impl Iterator<Item = (&str, &ConditionalLayer)> {
        self.behaviors.iter().filter_map(|(name, b)| match b {
            Behavior::ConditionalLayer(cl) => Some((name.as_str(), cl)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BehaviorRef, Builtin, Param};

    fn kp(key: &str, line: usize) -> Binding {
        Binding::new(
            BehaviorRef::Builtin(Builtin::KeyPress),
            vec![Param::Key(key.to_string())],
            line,
            1,
        )
    }

    fn layer(name: &str, index: usize) -> Layer {
        Layer {
            name: name.to_string(),
            display_name: None,
            index,
            bindings: Vec::new(),
        }
    }

    #[test]
    fn test_rows_follow_source_lines() {
        let base = Layer {
            bindings: vec![kp("A", 4), kp("B", 4), kp("C", 4), kp("D", 5), kp("E", 5)],
            ..layer("default_layer", 0)
        };
        let rows = base.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 3);
        assert_eq!(rows[1].len(), 2);
        assert!(layer("empty", 1).rows().is_empty());
    }

    #[test]
    fn test_layer_suffix_is_cosmetic() {
        assert_eq!(layer("default_layer", 0).base_name(), "default");
        assert_eq!(layer("nav", 1).base_name(), "nav");
        assert_eq!(layer("_layer", 2).base_name(), "_layer");
    }

    #[test]
    fn test_layer_names_are_unique() {
        let config = KeymapConfig {
            layers: vec![layer("nav_layer", 0), layer("nav", 1), layer("sym", 2)],
            ..KeymapConfig::default()
        };
        assert_eq!(config.layer_names(), vec!["nav", "nav_2", "sym"]);
        assert_eq!(config.find_layer("SYM"), Some(2));
        assert_eq!(config.find_layer("nav_layer"), Some(0));
        assert_eq!(config.find_layer("fn"), None);
    }

    #[test]
    fn test_global_defaults() {
        let settings = GlobalSettings::default();
        assert_eq!((settings.tap_time_ms, settings.hold_time_ms), (200, 250));
    }
}
