//! ZMK keycode names and their Kanata equivalents.
//!
//! The table is embedded at compile time from `keycodes.json` and indexed once
//! per process. Lookups are case-insensitive and accept every ZMK alias
//! (`RET`, `ENTER`, `RETURN`, ...).

pub mod modifier;
pub mod numeric;

use crate::models::Modifier;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// HID keyboard/keypad usage page.
pub const KEYBOARD_PAGE: u16 = 0x07;
/// HID consumer usage page.
pub const CONSUMER_PAGE: u16 = 0x0C;

/// Which platform's names to use for the GUI modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModifierConvention {
    /// `lmet` / `rmet`
    #[default]
    Pc,
    /// `lcmd` / `rcmd`
    Mac,
}

impl fmt::Display for ModifierConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pc => write!(f, "pc"),
            Self::Mac => write!(f, "mac"),
        }
    }
}

impl FromStr for ModifierConvention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pc" | "windows" | "linux" => Ok(Self::Pc),
            "mac" | "macos" => Ok(Self::Mac),
            other => Err(format!("unknown modifier convention '{other}' (expected pc or mac)")),
        }
    }
}

/// Category of keycodes, used by `inspect` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeycodeCategory {
    /// Category ID (e.g., "letters", "media")
    pub id: String,
    /// Display name
    pub name: String,
}

/// One ZMK key name and its Kanata rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeycodeDefinition {
    /// Canonical ZMK name (e.g., "`BSPC`")
    pub zmk: String,
    /// Kanata name (e.g., "bspc", "S-1")
    pub kanata: String,
    /// Category ID
    pub category: String,
    /// HID usage page
    #[serde(default = "default_page")]
    pub page: u16,
    /// HID usage ID
    pub usage: u16,
    /// Alternative ZMK names
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Modifier bits ZMK adds implicitly (shifted symbols)
    #[serde(default)]
    pub implicit_mods: u8,
}

const fn default_page() -> u16 {
    KEYBOARD_PAGE
}

/// One of the eight modifier keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierDefinition {
    /// Canonical ZMK name (e.g., "`LSHIFT`")
    pub zmk: String,
    /// Modifier function (e.g., "LS")
    pub function: String,
    /// Kanata key name under the PC convention
    pub pc: String,
    /// Kanata key name under the Mac convention
    pub mac: String,
    /// Kanata chord prefix (e.g., "S-")
    pub prefix: String,
    /// HID usage ID on the keyboard page
    pub usage: u16,
    /// Alternative ZMK names
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl ModifierDefinition {
    /// Kanata key name under `convention`.
    #[must_use]
    pub fn kanata(&self, convention: ModifierConvention) -> &str {
        match convention {
            ModifierConvention::Pc => &self.pc,
            ModifierConvention::Mac => &self.mac,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct KeycodeDatabase {
    #[allow(dead_code)]
    version: String,
    categories: Vec<KeycodeCategory>,
    keycodes: Vec<KeycodeDefinition>,
    modifiers: Vec<ModifierDefinition>,
}

/// Indexed keycode table.
#[derive(Debug, Clone)]
pub struct KeycodeDb {
    keycodes: Vec<KeycodeDefinition>,
    categories: Vec<KeycodeCategory>,
    modifiers: Vec<ModifierDefinition>,
    /// Upper-cased name or alias to index in `keycodes`
    lookup: HashMap<String, usize>,
    /// Upper-cased name or alias to index in `modifiers`
    modifier_lookup: HashMap<String, usize>,
    /// `(page, usage)` of unshifted keys to index in `keycodes`
    usage_lookup: HashMap<(u16, u16), usize>,
}

impl KeycodeDb {
    /// Parses the embedded `keycodes.json`.
    pub fn load() -> Result<Self> {
        let json_data = include_str!("keycodes.json");
        let db: KeycodeDatabase =
            serde_json::from_str(json_data).context("Failed to parse embedded keycodes.json")?;

        let mut lookup = HashMap::new();
        let mut usage_lookup = HashMap::new();
        for (idx, keycode) in db.keycodes.iter().enumerate() {
            lookup.insert(keycode.zmk.to_ascii_uppercase(), idx);
            for alias in &keycode.aliases {
                lookup.insert(alias.to_ascii_uppercase(), idx);
            }
            if keycode.implicit_mods == 0 {
                usage_lookup.entry((keycode.page, keycode.usage)).or_insert(idx);
            }
        }

        let mut modifier_lookup = HashMap::new();
        for (idx, modifier) in db.modifiers.iter().enumerate() {
            modifier_lookup.insert(modifier.zmk.to_ascii_uppercase(), idx);
            for alias in &modifier.aliases {
                modifier_lookup.insert(alias.to_ascii_uppercase(), idx);
            }
        }

        Ok(Self {
            keycodes: db.keycodes,
            categories: db.categories,
            modifiers: db.modifiers,
            lookup,
            modifier_lookup,
            usage_lookup,
        })
    }

    /// Process-wide table, loaded on first use.
    ///
    /// # Panics
    ///
    /// Panics if the embedded JSON is invalid, which the unit tests rule out.
    #[must_use]
    pub fn builtin() -> &'static Self {
        static DB: OnceLock<KeycodeDb> = OnceLock::new();
        DB.get_or_init(|| Self::load().expect("embedded keycodes.json is valid"))
    }

    /// Key definition by ZMK name or alias.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&KeycodeDefinition> {
        let idx = self.lookup.get(&name.to_ascii_uppercase())?;
        self.keycodes.get(*idx)
    }

    /// Modifier definition by ZMK name or alias (`LSHIFT`, `LSFT`, `LEFT_SHIFT`, ...).
    #[must_use]
    pub fn modifier(&self, name: &str) -> Option<&ModifierDefinition> {
        let idx = self.modifier_lookup.get(&name.to_ascii_uppercase())?;
        self.modifiers.get(*idx)
    }

    /// Modifier definition for a modifier function.
    #[must_use]
    pub fn modifier_for(&self, modifier: Modifier) -> Option<&ModifierDefinition> {
        self.modifiers
            .iter()
            .find(|m| m.function == modifier.function())
    }

    /// Kanata name for a ZMK key or modifier name.
    #[must_use]
    pub fn kanata_key(&self, name: &str, convention: ModifierConvention) -> Option<String> {
        if let Some(modifier) = self.modifier(name) {
            return Some(modifier.kanata(convention).to_string());
        }
        self.get(name).map(|k| k.kanata.clone())
    }

    /// Kanata name for an unshifted HID usage, modifiers included.
    #[must_use]
    pub fn by_usage(&self, page: u16, usage: u16, convention: ModifierConvention) -> Option<String> {
        if page == KEYBOARD_PAGE {
            if let Some(modifier) = self.modifiers.iter().find(|m| m.usage == usage) {
                return Some(modifier.kanata(convention).to_string());
            }
        }
        let idx = self.usage_lookup.get(&(page, usage))?;
        self.keycodes.get(*idx).map(|k| k.kanata.clone())
    }

    /// Kanata chord prefix for a set of modifiers, e.g. `C-S-`.
    #[must_use]
    pub fn chord_prefix(&self, modifiers: &[Modifier]) -> String {
        let mut seen: Vec<Modifier> = Vec::new();
        let mut prefix = String::new();
        for modifier in modifiers {
            if seen.contains(modifier) {
                continue;
            }
            seen.push(*modifier);
            if let Some(def) = self.modifier_for(*modifier) {
                prefix.push_str(&def.prefix);
            }
        }
        prefix
    }

    /// Keycode categories.
    #[must_use]
    pub fn categories(&self) -> &[KeycodeCategory] {
        &self.categories
    }

    /// Number of key definitions (modifiers excluded).
    #[must_use]
    pub fn len(&self) -> usize {
        self.keycodes.len()
    }

    /// True when the table has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keycodes.is_empty()
    }

    /// Key definitions in table order.
    pub fn iter(&self) -> impl Iterator<Item = &KeycodeDefinition> {
        self.keycodes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_load_database() {
        let db = KeycodeDb::load().unwrap();
        assert!(db.len() > 100);
        assert!(!db.categories().is_empty());
    }

    #[rstest]
    #[case("A", "a")]
    #[case("n1", "1")]
    #[case("RETURN", "ret")]
    #[case("BSPC", "bspc")]
    #[case("EXCL", "S-1")]
    #[case("QMARK", "S-/")]
    #[case("PG_UP", "pgup")]
    #[case("C_VOL_UP", "volu")]
    #[case("F13", "f13")]
    fn test_kanata_key(#[case] zmk: &str, #[case] kanata: &str) {
        let db = KeycodeDb::builtin();
        assert_eq!(
            db.kanata_key(zmk, ModifierConvention::Pc).as_deref(),
            Some(kanata)
        );
    }

    #[rstest]
    #[case("LSHIFT", "lsft", "lsft")]
    #[case("LSHFT", "lsft", "lsft")]
    #[case("LEFT_SHIFT", "lsft", "lsft")]
    #[case("LGUI", "lmet", "lcmd")]
    #[case("LCMD", "lmet", "lcmd")]
    #[case("RGUI", "rmet", "rcmd")]
    #[case("RALT", "ralt", "ralt")]
    fn test_modifier_table(#[case] zmk: &str, #[case] pc: &str, #[case] mac: &str) {
        let db = KeycodeDb::builtin();
        assert_eq!(db.kanata_key(zmk, ModifierConvention::Pc).as_deref(), Some(pc));
        assert_eq!(db.kanata_key(zmk, ModifierConvention::Mac).as_deref(), Some(mac));
    }

    #[test]
    fn test_unknown_key() {
        assert_eq!(
            KeycodeDb::builtin().kanata_key("NOT_A_KEY", ModifierConvention::Pc),
            None
        );
    }

    #[test]
    fn test_usage_lookup_prefers_unshifted() {
        let db = KeycodeDb::builtin();
        assert_eq!(
            db.by_usage(KEYBOARD_PAGE, 0x1E, ModifierConvention::Pc).as_deref(),
            Some("1")
        );
        assert_eq!(
            db.by_usage(KEYBOARD_PAGE, 0xE1, ModifierConvention::Pc).as_deref(),
            Some("lsft")
        );
        assert_eq!(
            db.by_usage(CONSUMER_PAGE, 0xE2, ModifierConvention::Pc).as_deref(),
            Some("mute")
        );
    }

    #[test]
    fn test_chord_prefix() {
        let db = KeycodeDb::builtin();
        assert_eq!(
            db.chord_prefix(&[Modifier::LeftCtrl, Modifier::LeftShift]),
            "C-S-"
        );
        assert_eq!(db.chord_prefix(&[Modifier::RightAlt]), "RA-");
    }

    #[test]
    fn test_convention_parse() {
        assert_eq!("Mac".parse::<ModifierConvention>(), Ok(ModifierConvention::Mac));
        assert!("amiga".parse::<ModifierConvention>().is_err());
    }
}
