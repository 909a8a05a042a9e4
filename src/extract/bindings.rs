//! Splitting `bindings` arrays into [`Binding`]s.

use crate::diagnostics::{Component, ConversionError, ErrorKind, ErrorManager};
use crate::dts::expr::{evaluate, parse_integer};
use crate::dts::{CellArray, LocatedCell};
use crate::keycodes::modifier::{looks_like_expression, parse_modifier_expression};
use crate::models::{BehaviorRef, Binding, Builtin, MalformedMacro, Param};
use indexmap::IndexMap;

/// What the bindings parser needs to know about one defined behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellEntry {
    /// Parameter count; `None` means every cell up to the next `&` is a parameter
    pub cells: Option<usize>,
    /// Behavior has no Kanata counterpart, so its parameters are never rendered
    pub firmware_only: bool,
}

impl CellEntry {
    /// Entry for a behavior that converts.
    #[must_use]
    pub const fn new(cells: Option<usize>) -> Self {
        Self {
            cells,
            firmware_only: false,
        }
    }

    /// Entry for a firmware-only behavior.
    #[must_use]
    pub const fn firmware(cells: Option<usize>) -> Self {
        Self {
            cells,
            firmware_only: true,
        }
    }
}

/// Behaviors defined in the source, by name.
pub type CellTable = IndexMap<String, CellEntry>;

/// Resolves `&name` against the defined behaviors, then the built-ins.
#[must_use]
pub fn resolve_behavior(name: &str, table: &CellTable) -> (BehaviorRef, Option<usize>) {
    if let Some(entry) = table.get(name) {
        return (BehaviorRef::Defined(name.to_string()), entry.cells);
    }
    match Builtin::from_name(name) {
        Some(builtin) => (BehaviorRef::Builtin(builtin), builtin.binding_cells()),
        None => (BehaviorRef::Unknown(name.to_string()), None),
    }
}

/// True for bindings that always become `XX` whatever their parameters are.
#[must_use]
pub fn is_firmware_only(behavior: &BehaviorRef, table: &CellTable) -> bool {
    match behavior {
        BehaviorRef::Builtin(Builtin::Firmware(_)) => true,
        BehaviorRef::Defined(name) => table.get(name).is_some_and(|entry| entry.firmware_only),
        BehaviorRef::Builtin(_) | BehaviorRef::Unknown(_) => false,
    }
}

/// Parses a `bindings` array.
///
/// `owner` names the layer or behavior for diagnostics. Unknown behaviors
/// become [`BehaviorRef::Unknown`] with one report each; parameter count
/// mismatches are reported and extra parameters dropped.
pub fn parse_bindings(
    array: &CellArray,
    table: &CellTable,
    owner: &str,
    component: Component,
    errors: &mut ErrorManager,
) -> Result<Vec<Binding>, ConversionError> {
    let cells = array.located_cells();
    let mut bindings = Vec::new();
    let mut i = 0;

    let leading: Vec<&LocatedCell> = cells.iter().take_while(|c| !c.text.starts_with('&')).collect();
    if let Some(first) = leading.first() {
        let text = leading
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        errors.report(
            ConversionError::new(
                ErrorKind::BindingResolutionError,
                component,
                format!("'{text}' in {owner} is not preceded by a behavior reference"),
            )
            .with_position(first.line, first.column)
            .with_suggestion("every binding starts with '&', e.g. &kp A"),
        )?;
        bindings.push(Binding::new(
            BehaviorRef::Unknown(text),
            Vec::new(),
            first.line,
            first.column,
        ));
        i = leading.len();
    }

    while i < cells.len() {
        let head = &cells[i];
        let name = &head.text[1..];
        i += 1;

        let start = i;
        while i < cells.len() && !cells[i].text.starts_with('&') {
            i += 1;
        }
        let raw_params = &cells[start..i];

        let (behavior, expected) = resolve_behavior(name, table);
        if let BehaviorRef::Unknown(unknown) = &behavior {
            errors.report(
                ConversionError::new(
                    ErrorKind::BindingResolutionError,
                    component,
                    format!("unknown behavior '&{unknown}' in {owner}"),
                )
                .with_position(head.line, head.column),
            )?;
        }

        let firmware_only = is_firmware_only(&behavior, table);
        let mut params = Vec::with_capacity(raw_params.len());
        for cell in raw_params {
            let param = if firmware_only {
                classify_param(cell)
            } else {
                parse_param(cell, errors)?
            };
            params.push(param);
        }

        if let Some(expected) = expected {
            if params.len() < expected {
                errors.report(
                    ConversionError::new(
                        ErrorKind::BindingResolutionError,
                        component,
                        format!(
                            "&{name} in {owner} expects {expected} parameter(s), found {}",
                            params.len()
                        ),
                    )
                    .with_position(head.line, head.column),
                )?;
            } else if params.len() > expected {
                let extra: Vec<&str> = raw_params[expected..]
                    .iter()
                    .map(|c| c.text.as_str())
                    .collect();
                errors.report(
                    ConversionError::new(
                        ErrorKind::BindingResolutionError,
                        component,
                        format!(
                            "&{name} in {owner} takes {expected} parameter(s); dropped '{}'",
                            extra.join(" ")
                        ),
                    )
                    .with_position(raw_params[expected].line, raw_params[expected].column),
                )?;
                params.truncate(expected);
            }
        }

        bindings.push(Binding::new(behavior, params, head.line, head.column));
    }

    Ok(bindings)
}

/// Parses the behavior-only entries of `bindings = <&kp>, <&mo>;`.
#[must_use]
pub fn parse_behavior_refs(array: &CellArray, table: &CellTable) -> Vec<BehaviorRef> {
    array
        .located_cells()
        .iter()
        .filter_map(|c| c.text.strip_prefix('&'))
        .map(|name| resolve_behavior(name, table).0)
        .collect()
}

/// Classifies one parameter cell, reporting malformed modifier expressions.
pub fn parse_param(
    cell: &LocatedCell,
    errors: &mut ErrorManager,
) -> Result<Param, ConversionError> {
    let param = classify_param(cell);
    if let Param::Malformed(malformed) = &param {
        report_malformed(malformed, cell, errors)?;
    }
    Ok(param)
}

/// Classifies one parameter cell without reporting anything.
#[must_use]
pub fn classify_param(cell: &LocatedCell) -> Param {
    let text = cell.text.as_str();

    if let Some(n) = parse_integer(text) {
        return Param::Number(n);
    }

    if text.starts_with('(') {
        if let Some(n) = evaluate(text) {
            return Param::Number(n);
        }
        return Param::Malformed(MalformedMacro::new(
            text,
            "expression could not be evaluated",
        ));
    }

    if looks_like_expression(text) || text.contains(')') {
        return match parse_modifier_expression(text) {
            Ok(expr) => Param::Modifier(expr),
            Err(malformed) => Param::Malformed(malformed),
        };
    }

    Param::Key(text.to_string())
}

fn report_malformed(
    malformed: &MalformedMacro,
    cell: &LocatedCell,
    errors: &mut ErrorManager,
) -> Result<(), ConversionError> {
    errors.report(
        ConversionError::new(
            ErrorKind::MalformedMacro,
            Component::ModifierResolver,
            format!("malformed or unknown macro '{}': {}", malformed.text, malformed.reason),
        )
        .with_position(cell.line, cell.column),
    )
}
