//! Modifier expressions such as `LC(LS(LALT))`.
//!
//! Parsing is a small recursive descent over `FN(arg)` where `FN` is one of the
//! eight modifier functions. Malformed input never panics; it comes back as a
//! [`MalformedMacro`] that the caller reports and renders as a comment.

use super::{KeycodeDb, ModifierConvention};
use crate::models::{MalformedMacro, Modifier, ModifierArg, ModifierExpression};

/// True when `text` has the `IDENT(` shape of a modifier expression.
#[must_use]
pub fn looks_like_expression(text: &str) -> bool {
    text.find('(').is_some_and(|open| {
        open > 0
            && text[..open]
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

/// Parses `LC(LS(LALT))` into a nested expression.
pub fn parse_modifier_expression(text: &str) -> Result<ModifierExpression, MalformedMacro> {
    let trimmed = text.trim();
    let (expr, rest) = parse_expr(trimmed).map_err(|reason| MalformedMacro::new(text, reason))?;
    if rest.trim().is_empty() {
        Ok(expr)
    } else {
        Err(MalformedMacro::new(
            text,
            format!("unexpected trailing text '{}'", rest.trim()),
        ))
    }
}

fn parse_expr(text: &str) -> Result<(ModifierExpression, &str), String> {
    let open = text
        .find('(')
        .ok_or_else(|| format!("expected '(' in '{text}'"))?;
    let function = text[..open].trim();
    let modifier = Modifier::from_function(function)
        .ok_or_else(|| format!("unknown modifier function '{function}'"))?;

    let inner = text[open + 1..].trim_start();
    let (arg, rest) = if looks_like_expression(inner) {
        let (nested, rest) = parse_expr(inner)?;
        (ModifierArg::Expr(Box::new(nested)), rest)
    } else {
        let end = inner
            .find(|c: char| c == ')' || c == '(' || c.is_whitespace())
            .unwrap_or(inner.len());
        let key = &inner[..end];
        if key.is_empty() {
            return Err(format!("{}() has no argument", modifier.function()));
        }
        (ModifierArg::Key(key.to_string()), &inner[end..])
    };

    let rest = rest.trim_start();
    let rest = rest
        .strip_prefix(')')
        .ok_or_else(|| format!("missing ')' after {}(", modifier.function()))?;

    Ok((ModifierExpression { modifier, arg }, rest))
}

/// Resolves an expression to the nested lower-case form, e.g.
/// `LC(LS(LALT))` to `lc(ls(lalt))`.
///
/// Malformed input yields the malformed-macro comment instead.
#[must_use]
pub fn resolve(text: &str) -> String {
    resolve_with(text, KeycodeDb::builtin(), ModifierConvention::Pc)
}

/// [`resolve`] with an explicit table and convention.
#[must_use]
pub fn resolve_with(text: &str, db: &KeycodeDb, convention: ModifierConvention) -> String {
    match parse_modifier_expression(text) {
        Ok(expr) => render_nested(&expr, db, convention),
        Err(malformed) => malformed.comment(),
    }
}

fn render_nested(expr: &ModifierExpression, db: &KeycodeDb, convention: ModifierConvention) -> String {
    let inner = match &expr.arg {
        ModifierArg::Key(key) => db
            .kanata_key(key, convention)
            .unwrap_or_else(|| key.to_ascii_lowercase()),
        ModifierArg::Expr(nested) => render_nested(nested, db, convention),
    };
    format!("{}({inner})", expr.modifier.function().to_ascii_lowercase())
}

/// Result of rendering an expression as a Kanata chord.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chord {
    /// Kanata text, e.g. `C-S-lalt`
    pub text: String,
    /// False when the innermost key was not in the table and was lower-cased as-is
    pub known: bool,
}

/// Renders an expression in Kanata's prefix form, e.g. `LC(LS(LALT))` to `C-S-lalt`.
#[must_use]
pub fn render_chord(expr: &ModifierExpression, db: &KeycodeDb, convention: ModifierConvention) -> Chord {
    let mut modifiers = expr.modifiers();
    let key = expr.key();

    let (base, known) = match db.get(key) {
        Some(def) if def.implicit_mods != 0 => {
            modifiers.extend(Modifier::from_mask(def.implicit_mods));
            let base = db
                .by_usage(def.page, def.usage, convention)
                .unwrap_or_else(|| def.kanata.clone());
            (base, true)
        }
        _ => match db.kanata_key(key, convention) {
            Some(name) => (name, true),
            None => (key.to_ascii_lowercase(), false),
        },
    };

    Chord {
        text: format!("{}{base}", db.chord_prefix(&modifiers)),
        known,
    }
}
