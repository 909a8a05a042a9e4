//! Numeric keycodes left behind by the preprocessor.
//!
//! ZMK encodes a key as `(mods << 24) | (page << 16) | usage`. A plain HID
//! usage with no page byte is read as a keyboard-page usage.

use super::{KeycodeDb, ModifierConvention, CONSUMER_PAGE, KEYBOARD_PAGE};
use crate::models::Modifier;

/// A keycode split into its ZMK fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedKeycode {
    /// Implicit modifier byte
    pub modifiers: u8,
    /// HID usage page
    pub page: u16,
    /// HID usage ID
    pub usage: u16,
}

/// Splits an integer into modifier byte, usage page and usage ID.
///
/// Returns `None` for negative values, values wider than 32 bits, and pages
/// other than keyboard and consumer.
#[must_use]
pub fn decode(value: i64) -> Option<EncodedKeycode> {
    let value = u32::try_from(value).ok()?;
    let modifiers = (value >> 24) as u8;
    let page = match ((value >> 16) & 0xFF) as u16 {
        0 => KEYBOARD_PAGE,
        page @ (KEYBOARD_PAGE | CONSUMER_PAGE) => page,
        _ => return None,
    };
    let usage = (value & 0xFFFF) as u16;
    Some(EncodedKeycode {
        modifiers,
        page,
        usage,
    })
}

/// Renders a numeric keycode as a Kanata key, e.g. `0x0207001E` to `S-1`.
#[must_use]
pub fn render(value: i64, db: &KeycodeDb, convention: ModifierConvention) -> Option<String> {
    let encoded = decode(value)?;
    let base = db.by_usage(encoded.page, encoded.usage, convention)?;
    let prefix = db.chord_prefix(&Modifier::from_mask(encoded.modifiers));
    Some(format!("{prefix}{base}"))
}

/// Comment emitted in place of a code the table cannot name.
#[must_use]
pub fn unknown_comment(value: i64) -> String {
    format!(";; TODO: Unknown numeric keycode {value}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_fields() {
        assert_eq!(
            decode(0x0207_001E),
            Some(EncodedKeycode {
                modifiers: 0x02,
                page: KEYBOARD_PAGE,
                usage: 0x1E
            })
        );
        assert_eq!(decode(4).map(|k| k.page), Some(KEYBOARD_PAGE));
        assert_eq!(decode(-1), None);
        assert_eq!(decode(0x0009_0001), None);
    }

    #[test]
    fn test_render_keyboard_and_consumer() {
        let db = KeycodeDb::builtin();
        assert_eq!(render(0x0007_0004, db, ModifierConvention::Pc).as_deref(), Some("a"));
        assert_eq!(render(4, db, ModifierConvention::Pc).as_deref(), Some("a"));
        assert_eq!(
            render(0x0207_001E, db, ModifierConvention::Pc).as_deref(),
            Some("S-1")
        );
        assert_eq!(
            render(0x000C_00E9, db, ModifierConvention::Pc).as_deref(),
            Some("volu")
        );
        assert_eq!(
            render(0x0007_00E3, db, ModifierConvention::Mac).as_deref(),
            Some("lcmd")
        );
    }

    #[test]
    fn test_unknown_code() {
        let db = KeycodeDb::builtin();
        assert_eq!(render(0x0007_00FF, db, ModifierConvention::Pc), None);
        assert_eq!(
            unknown_comment(999),
            ";; TODO: Unknown numeric keycode 999"
        );
    }
}
