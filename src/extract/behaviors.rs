//! Behavior extraction, classified by `compatible`.

use super::bindings::{parse_behavior_refs, parse_bindings, CellEntry, CellTable};
use super::view::NodeView;
use crate::diagnostics::{Component, ConversionError, ErrorKind, ErrorManager, Severity};
use crate::dts::{NodeId, Root};
use crate::models::{
    Behavior, BehaviorRef, Binding, BuiltinBehaviors, Builtin, Combo, ConditionalLayer, Flavor,
    HoldTap, LayerKind, Macro, MacroMode, MacroStep, ModMorph, Param, StickyKey, TapDance,
};
use indexmap::IndexMap;
use tracing::debug;

/// Where a behavior node was found, which decides how it is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    /// Child of a `behaviors` or `macros` node; classified by `compatible`
    Behaviors,
    /// Child of a `zmk,combos` node
    Combos,
    /// Child of a `zmk,conditional-layers` node
    ConditionalLayers,
}

/// Recognized `compatible` strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    HoldTap,
    Macro(usize),
    StickyKey,
    TapDance,
    ModMorph,
    KeyPress,
    Transparent,
    NoOp,
    CapsWord,
    KeyRepeat,
    MouseKeyPress,
    Layer(LayerKind),
    Firmware,
    MacroControl,
}

const FIRMWARE_COMPATIBLES: [&str; 14] = [
    "zmk,behavior-bluetooth",
    "zmk,behavior-outputs",
    "zmk,behavior-reset",
    "zmk,behavior-rgb-underglow",
    "zmk,behavior-ext-power",
    "zmk,behavior-backlight",
    "zmk,behavior-soft-off",
    "zmk,behavior-studio-unlock",
    "zmk,behavior-mouse-move",
    "zmk,behavior-mouse-scroll",
    "zmk,behavior-sensor-rotate",
    "zmk,behavior-sensor-rotate-var",
    "zmk,behavior-input-two-axis",
    "zmk,behavior-leader-key",
];

fn classify(compatible: &str) -> Option<Kind> {
    let kind = match compatible {
        "zmk,behavior-hold-tap" => Kind::HoldTap,
        "zmk,behavior-macro" => Kind::Macro(0),
        "zmk,behavior-macro-one-param" => Kind::Macro(1),
        "zmk,behavior-macro-two-param" => Kind::Macro(2),
        "zmk,behavior-sticky-key" => Kind::StickyKey,
        "zmk,behavior-tap-dance" => Kind::TapDance,
        "zmk,behavior-mod-morph" => Kind::ModMorph,
        "zmk,behavior-key-press" => Kind::KeyPress,
        "zmk,behavior-transparent" => Kind::Transparent,
        "zmk,behavior-none" => Kind::NoOp,
        "zmk,behavior-caps-word" => Kind::CapsWord,
        "zmk,behavior-key-repeat" => Kind::KeyRepeat,
        "zmk,behavior-mouse-key-press" => Kind::MouseKeyPress,
        "zmk,behavior-momentary-layer" => Kind::Layer(LayerKind::Momentary),
        "zmk,behavior-to-layer" => Kind::Layer(LayerKind::To),
        "zmk,behavior-toggle-layer" => Kind::Layer(LayerKind::Toggle),
        other if other.starts_with("zmk,macro-control-") => Kind::MacroControl,
        other if FIRMWARE_COMPATIBLES.contains(&other) => Kind::Firmware,
        _ => return None,
    };
    Some(kind)
}

impl Kind {
    const fn default_cells(self) -> Option<usize> {
        match self {
            Self::HoldTap => Some(2),
            Self::Macro(n) => Some(n),
            Self::StickyKey | Self::KeyPress | Self::MouseKeyPress | Self::Layer(_) => Some(1),
            Self::TapDance
            | Self::ModMorph
            | Self::Transparent
            | Self::NoOp
            | Self::CapsWord
            | Self::KeyRepeat
            | Self::MacroControl => Some(0),
            Self::Firmware => None,
        }
    }
}

/// Nodes that may define behaviors, in source order.
#[must_use]
pub fn behavior_nodes(root: &Root) -> Vec<(NodeId, Group)> {
    let mut out: Vec<(NodeId, Group)> = Vec::new();
    for parent in root.descendants(NodeId::ROOT) {
        let node = root.node(parent);
        let group = match node.compatible() {
            Some("zmk,combos") => Group::Combos,
            Some("zmk,conditional-layers") => Group::ConditionalLayers,
            _ if node.name == "behaviors" || node.name == "macros" => Group::Behaviors,
            _ => continue,
        };
        for child in root.children(parent) {
            if root.node(child).name == "global" || out.iter().any(|(id, _)| *id == child) {
                continue;
            }
            out.push((child, group));
        }
    }
    out
}

/// Parameter counts of every referenceable defined behavior.
///
/// Built before any `bindings` are parsed, so behaviors may reference ones
/// defined later in the file.
#[must_use]
pub fn cell_table(root: &Root, nodes: &[(NodeId, Group)]) -> CellTable {
    let mut table = CellTable::new();
    for (id, group) in nodes {
        if *group != Group::Behaviors {
            continue;
        }
        let view = NodeView::new(root, *id);
        let Some(kind) = view.string("compatible").and_then(classify) else {
            continue;
        };
        if kind == Kind::MacroControl {
            continue;
        }
        let declared = view
            .property("#binding-cells")
            .and_then(|p| p.as_integer())
            .and_then(|n| usize::try_from(n).ok());
        let cells = declared.or(kind.default_cells());
        let entry = if kind == Kind::Firmware {
            CellEntry::firmware(cells)
        } else {
            CellEntry::new(cells)
        };
        table.insert(view.behavior_name(), entry);
    }
    table
}

/// Extracts every behavior, skipping (and reporting) the ones that cannot be read.
pub fn extract_behaviors(
    root: &Root,
    nodes: &[(NodeId, Group)],
    table: &CellTable,
    errors: &mut ErrorManager,
) -> Result<IndexMap<String, Behavior>, ConversionError> {
    let mut behaviors = IndexMap::new();

    for (id, group) in nodes {
        let view = NodeView::new(root, *id);
        let name = view.behavior_name();

        let behavior = match group {
            Group::Combos => Some(read_combo(&view, table, errors)?),
            Group::ConditionalLayers => read_conditional_layer(&view, errors)?,
            Group::Behaviors => read_behavior(&view, table, errors)?,
        };

        if let Some(behavior) = behavior {
            debug!(name = %name, kind = behavior.type_name(), "extracted behavior");
            if behaviors.insert(name.clone(), behavior).is_some() {
                errors.report(view.node_diagnostic(
                    ErrorKind::ExtractionError,
                    Component::Extractor,
                    format!("behavior '{name}' defined twice; later definition wins"),
                ))?;
            }
        }
    }

    Ok(behaviors)
}

fn read_behavior(
    view: &NodeView<'_>,
    table: &CellTable,
    errors: &mut ErrorManager,
) -> Result<Option<Behavior>, ConversionError> {
    let name = view.behavior_name();
    let Some(compatible) = view.string("compatible") else {
        errors.report(view.node_diagnostic(
            ErrorKind::ExtractionError,
            Component::Extractor,
            format!("behavior '{name}' has no compatible property; skipped"),
        ))?;
        return Ok(None);
    };

    let Some(kind) = classify(compatible) else {
        errors.report(
            view.node_diagnostic(
                ErrorKind::ExtractionError,
                Component::Extractor,
                format!("behavior '{name}' has unrecognized compatible \"{compatible}\"; skipped"),
            )
            .with_suggestion("bindings that use it will be converted to XX"),
        )?;
        return Ok(None);
    };

    let behavior = match kind {
        Kind::HoldTap => read_hold_tap(view, HoldTap::mod_tap(), table, errors)?.map(Behavior::HoldTap),
        Kind::Macro(param_count) => Some(Behavior::Macro(read_macro(view, param_count, table, errors)?)),
        Kind::StickyKey => Some(Behavior::StickyKey(read_sticky_key(
            view,
            StickyKey::default(),
            table,
            errors,
        )?)),
        Kind::TapDance => read_tap_dance(view, table, errors)?,
        Kind::ModMorph => read_mod_morph(view, table, errors)?,
        Kind::KeyPress => Some(Behavior::KeyPress),
        Kind::Transparent => Some(Behavior::Transparent),
        Kind::NoOp => Some(Behavior::NoOp),
        Kind::CapsWord => Some(Behavior::CapsWord),
        Kind::KeyRepeat => Some(Behavior::KeyRepeat),
        Kind::MouseKeyPress => Some(Behavior::MouseKeyPress),
        Kind::Layer(kind) => Some(Behavior::Layer { kind }),
        Kind::Firmware => Some(Behavior::Unsupported {
            compatible: compatible.to_string(),
            binding_cells: table.get(&name).and_then(|entry| entry.cells).unwrap_or(0),
        }),
        Kind::MacroControl => {
            errors.report(
                view.node_diagnostic(
                    ErrorKind::ExtractionError,
                    Component::Extractor,
                    format!("macro control node '{name}' handled as a built-in"),
                )
                .with_severity(Severity::Debug),
            )?;
            None
        }
    };
    Ok(behavior)
}

/// Applies hold-tap properties on top of `base`.
///
/// Returns `None` (after reporting) when `bindings` does not hold exactly two
/// behavior references.
pub fn read_hold_tap(
    view: &NodeView<'_>,
    base: HoldTap,
    table: &CellTable,
    errors: &mut ErrorManager,
) -> Result<Option<HoldTap>, ConversionError> {
    let component = Component::HoldTap;
    let mut hold_tap = base;

    if let Some(ms) = view.timing("tapping-term-ms", component, errors)? {
        hold_tap.tapping_term_ms = Some(ms);
    }
    if let Some(ms) = view.timing("hold-time-ms", component, errors)? {
        hold_tap.hold_time_ms = Some(ms);
    }
    if let Some(ms) = view.disableable_timing("quick-tap-ms", component, errors)? {
        hold_tap.quick_tap_ms = Some(ms);
    }
    if let Some(ms) = view.disableable_timing("require-prior-idle-ms", component, errors)? {
        hold_tap.require_prior_idle_ms = Some(ms);
    }

    if let Some(property) = view.property("flavor") {
        match property.as_str().map(str::parse::<Flavor>) {
            Some(Ok(flavor)) => hold_tap.flavor = flavor,
            Some(Err(message)) => {
                errors.report(view.diagnostic(
                    ErrorKind::ExtractionError,
                    component,
                    property,
                    format!("{message}; using {}", hold_tap.flavor.as_str()),
                ))?;
            }
            None => {
                errors.report(view.diagnostic(
                    ErrorKind::ExtractionError,
                    component,
                    property,
                    "flavor must be a string; ignored".to_string(),
                ))?;
            }
        }
    }

    if view.property("hold-trigger-key-positions").is_some() {
        hold_tap.hold_trigger_positions =
            view.indices("hold-trigger-key-positions", component, errors)?;
    }
    hold_tap.hold_trigger_on_release |= view.flag("hold-trigger-on-release");
    hold_tap.retro_tap |= view.flag("retro-tap");

    if let Some(array) = view.array("bindings") {
        match parse_behavior_refs(array, table).as_slice() {
            [hold, tap] => {
                hold_tap.hold = hold.clone();
                hold_tap.tap = tap.clone();
            }
            refs => {
                errors.report(view.node_diagnostic(
                    ErrorKind::ExtractionError,
                    component,
                    format!(
                        "hold-tap '{}' needs exactly two bindings, found {}; skipped",
                        view.behavior_name(),
                        refs.len()
                    ),
                ))?;
                return Ok(None);
            }
        }
    }

    Ok(Some(hold_tap))
}

/// Applies sticky-key properties on top of `base`.
pub fn read_sticky_key(
    view: &NodeView<'_>,
    base: StickyKey,
    table: &CellTable,
    errors: &mut ErrorManager,
) -> Result<StickyKey, ConversionError> {
    let mut sticky = base;
    if let Some(ms) = view.timing("release-after-ms", Component::StickyKey, errors)? {
        sticky.release_after_ms = ms;
    }
    sticky.quick_release |= view.flag("quick-release");
    sticky.ignore_modifiers |= view.flag("ignore-modifiers");
    if let Some(binding) = view
        .array("bindings")
        .and_then(|array| parse_behavior_refs(array, table).into_iter().next())
    {
        sticky.binding = binding;
    }
    Ok(sticky)
}

fn read_macro(
    view: &NodeView<'_>,
    param_count: usize,
    table: &CellTable,
    errors: &mut ErrorManager,
) -> Result<Macro, ConversionError> {
    let component = Component::Macro;
    let wait_ms = view
        .timing("wait-ms", component, errors)?
        .unwrap_or(Macro::DEFAULT_WAIT_MS);
    let tap_ms = view
        .timing("tap-ms", component, errors)?
        .unwrap_or(Macro::DEFAULT_TAP_MS);

    let name = view.behavior_name();
    let bindings = match view.array("bindings") {
        Some(array) => parse_bindings(array, table, &format!("macro '{name}'"), component, errors)?,
        None => {
            errors.report(view.node_diagnostic(
                ErrorKind::ExtractionError,
                component,
                format!("macro '{name}' has no bindings; it will do nothing"),
            ))?;
            Vec::new()
        }
    };

    let mut steps = Vec::with_capacity(bindings.len());
    for binding in bindings {
        let step = match binding.behavior {
            BehaviorRef::Builtin(Builtin::MacroTap) => MacroStep::Mode(MacroMode::Tap),
            BehaviorRef::Builtin(Builtin::MacroPress) => MacroStep::Mode(MacroMode::Press),
            BehaviorRef::Builtin(Builtin::MacroRelease) => MacroStep::Mode(MacroMode::Release),
            BehaviorRef::Builtin(Builtin::MacroPauseForRelease) => MacroStep::PauseForRelease,
            BehaviorRef::Builtin(Builtin::MacroParam { from, to }) => MacroStep::Param { from, to },
            BehaviorRef::Builtin(Builtin::MacroWaitTime) => {
                MacroStep::Wait(step_timing(&binding, &name, wait_ms, errors)?)
            }
            BehaviorRef::Builtin(Builtin::MacroTapTime) => {
                MacroStep::TapTime(step_timing(&binding, &name, tap_ms, errors)?)
            }
            _ => MacroStep::Key(binding),
        };
        steps.push(step);
    }

    Ok(Macro {
        wait_ms,
        tap_ms,
        steps,
        param_count,
    })
}

fn step_timing(
    binding: &Binding,
    macro_name: &str,
    default: u32,
    errors: &mut ErrorManager,
) -> Result<u32, ConversionError> {
    let value = match binding.params.first() {
        Some(Param::Number(n)) => crate::models::validate_timing(*n).ok_or_else(|| n.to_string()),
        Some(other) => Err(other.text()),
        None => Err("nothing".to_string()),
    };
    match value {
        Ok(ms) => Ok(ms),
        Err(found) => {
            errors.report(
                ConversionError::new(
                    ErrorKind::TimingValidationError,
                    Component::Macro,
                    format!(
                        "&{} {found} in macro '{macro_name}' is not in 1..=10000 ms; using {default}",
                        binding.behavior.name()
                    ),
                )
                .with_position(binding.line, binding.column),
            )?;
            Ok(default)
        }
    }
}

fn read_tap_dance(
    view: &NodeView<'_>,
    table: &CellTable,
    errors: &mut ErrorManager,
) -> Result<Option<Behavior>, ConversionError> {
    let component = Component::TapDance;
    let name = view.behavior_name();
    let tapping_term_ms = view
        .timing("tapping-term-ms", component, errors)?
        .unwrap_or(TapDance::DEFAULT_TAPPING_TERM_MS);

    let bindings = match view.array("bindings") {
        Some(array) => parse_bindings(array, table, &format!("tap-dance '{name}'"), component, errors)?,
        None => Vec::new(),
    };
    if bindings.is_empty() {
        errors.report(view.node_diagnostic(
            ErrorKind::ExtractionError,
            component,
            format!("tap-dance '{name}' has no bindings; skipped"),
        ))?;
        return Ok(None);
    }

    Ok(Some(Behavior::TapDance(TapDance {
        tapping_term_ms,
        bindings,
    })))
}

/// Parses a `mods` value: an integer or `MOD_LSFT|MOD_RSFT` style list.
#[must_use]
pub fn parse_mods(text: &str) -> Option<u8> {
    if let Some(n) = crate::dts::expr::evaluate(text) {
        return u8::try_from(n).ok();
    }
    let mut mask = 0u8;
    for part in text.trim_matches(|c| c == '(' || c == ')').split('|') {
        let bit = match part.trim() {
            "MOD_LCTL" => 0x01,
            "MOD_LSFT" => 0x02,
            "MOD_LALT" => 0x04,
            "MOD_LGUI" => 0x08,
            "MOD_RCTL" => 0x10,
            "MOD_RSFT" => 0x20,
            "MOD_RALT" => 0x40,
            "MOD_RGUI" => 0x80,
            _ => return None,
        };
        mask |= bit;
    }
    Some(mask)
}

fn read_mods(
    view: &NodeView<'_>,
    name: &str,
    errors: &mut ErrorManager,
) -> Result<Option<u8>, ConversionError> {
    let Some(property) = view.property(name) else {
        return Ok(None);
    };
    let text = match property.as_array() {
        Some(array) => array.text(),
        None => property.as_integer().map(|n| n.to_string()).unwrap_or_default(),
    };
    match parse_mods(&text) {
        Some(mask) => Ok(Some(mask)),
        None => {
            errors.report(view.diagnostic(
                ErrorKind::ExtractionError,
                Component::ModMorph,
                property,
                format!("could not read {name} '{text}'; ignored"),
            ))?;
            Ok(None)
        }
    }
}

fn read_mod_morph(
    view: &NodeView<'_>,
    table: &CellTable,
    errors: &mut ErrorManager,
) -> Result<Option<Behavior>, ConversionError> {
    let component = Component::ModMorph;
    let name = view.behavior_name();

    let bindings = match view.array("bindings") {
        Some(array) => parse_bindings(array, table, &format!("mod-morph '{name}'"), component, errors)?,
        None => Vec::new(),
    };
    let Some(mods) = read_mods(view, "mods", errors)? else {
        errors.report(view.node_diagnostic(
            ErrorKind::ExtractionError,
            component,
            format!("mod-morph '{name}' has no usable mods; skipped"),
        ))?;
        return Ok(None);
    };
    let keep_mods = read_mods(view, "keep-mods", errors)?.unwrap_or(0);

    let mut bindings = bindings.into_iter();
    let (Some(default), Some(morphed), None) = (bindings.next(), bindings.next(), bindings.next()) else {
        errors.report(view.node_diagnostic(
            ErrorKind::ExtractionError,
            component,
            format!("mod-morph '{name}' needs exactly two bindings; skipped"),
        ))?;
        return Ok(None);
    };

    Ok(Some(Behavior::ModMorph(ModMorph {
        default,
        morphed,
        mods,
        keep_mods,
    })))
}

fn read_combo(
    view: &NodeView<'_>,
    table: &CellTable,
    errors: &mut ErrorManager,
) -> Result<Behavior, ConversionError> {
    let component = Component::Combo;
    let name = view.behavior_name();

    let bindings = match view.array("bindings") {
        Some(array) => parse_bindings(array, table, &format!("combo '{name}'"), component, errors)?,
        None => Vec::new(),
    };

    Ok(Behavior::Combo(Combo {
        key_positions: view.indices("key-positions", component, errors)?,
        timeout_ms: view
            .timing("timeout-ms", component, errors)?
            .unwrap_or(Combo::DEFAULT_TIMEOUT_MS),
        bindings,
        layers: view.indices("layers", component, errors)?,
        require_prior_idle_ms: view.disableable_timing("require-prior-idle-ms", component, errors)?,
        slow_release: view.flag("slow-release"),
    }))
}

fn read_conditional_layer(
    view: &NodeView<'_>,
    errors: &mut ErrorManager,
) -> Result<Option<Behavior>, ConversionError> {
    let component = Component::Layer;
    let if_layers = view.indices("if-layers", component, errors)?;
    let then_layer = view
        .integer("then-layer", component, errors)?
        .and_then(|n| usize::try_from(n).ok());

    match then_layer {
        Some(then_layer) if !if_layers.is_empty() => {
            Ok(Some(Behavior::ConditionalLayer(ConditionalLayer {
                if_layers,
                then_layer,
            })))
        }
        _ => {
            errors.report(view.node_diagnostic(
                ErrorKind::ExtractionError,
                component,
                format!(
                    "conditional layer '{}' needs if-layers and then-layer; skipped",
                    view.behavior_name()
                ),
            ))?;
            Ok(None)
        }
    }
}

/// Applies `&mt { }`, `&lt { }` and `&sk { }` blocks to the built-in defaults.
///
/// Blocks for labels defined in the source are applied through [`NodeView`];
/// blocks for any other label are reported as ignored.
pub fn extract_builtin_overrides(
    root: &Root,
    table: &CellTable,
    errors: &mut ErrorManager,
) -> Result<BuiltinBehaviors, ConversionError> {
    let mut builtins = BuiltinBehaviors::default();

    for (label, id) in root.overrides() {
        if root.resolve_reference(label).is_some() {
            continue;
        }
        let view = NodeView::detached(root, *id);
        match label.as_str() {
            "mt" => {
                if let Some(ht) = read_hold_tap(&view, builtins.mod_tap.clone(), table, errors)? {
                    builtins.mod_tap = ht;
                }
            }
            "lt" => {
                if let Some(ht) = read_hold_tap(&view, builtins.layer_tap.clone(), table, errors)? {
                    builtins.layer_tap = ht;
                }
            }
            "sk" => {
                builtins.sticky_key =
                    read_sticky_key(&view, builtins.sticky_key.clone(), table, errors)?;
            }
            other => {
                errors.report(
                    view.node_diagnostic(
                        ErrorKind::ExtractionError,
                        Component::Extractor,
                        format!("override block for '&{other}' has no effect on the conversion; ignored"),
                    )
                    .with_severity(Severity::Info),
                )?;
            }
        }
    }

    Ok(builtins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dts::parse;

    fn extract(source: &str) -> (IndexMap<String, Behavior>, BuiltinBehaviors, ErrorManager) {
        let mut errors = ErrorManager::default();
        let root = parse(source, &mut errors).unwrap();
        let nodes = behavior_nodes(&root);
        let table = cell_table(&root, &nodes);
        let behaviors = extract_behaviors(&root, &nodes, &table, &mut errors).unwrap();
        let builtins = extract_builtin_overrides(&root, &table, &mut errors).unwrap();
        (behaviors, builtins, errors)
    }

    #[test]
    fn test_hold_tap_properties() {
        let (behaviors, _, errors) = extract(
            r#"/ { behaviors {
                hm: homerow_mods {
                    compatible = "zmk,behavior-hold-tap";
                    #binding-cells = <2>;
                    tapping-term-ms = <280>;
                    quick-tap-ms = <175>;
                    flavor = "balanced";
                    hold-trigger-key-positions = <5 6 7>;
                    retro-tap;
                    bindings = <&kp>, <&kp>;
                };
            }; };"#,
        );

        let Behavior::HoldTap(hm) = &behaviors["hm"] else {
            panic!("expected hold-tap");
        };
        assert_eq!(hm.tapping_term_ms, Some(280));
        assert_eq!(hm.quick_tap_ms, Some(175));
        assert_eq!(hm.flavor, Flavor::Balanced);
        assert_eq!(hm.hold_trigger_positions, vec![5, 6, 7]);
        assert!(hm.retro_tap);
        assert!(errors.errors().is_empty());
    }

    #[test]
    fn test_zero_quick_tap_and_idle_are_accepted() {
        let (behaviors, _, errors) = extract(
            r#"/ { behaviors {
                hm: homerow_mods {
                    compatible = "zmk,behavior-hold-tap";
                    #binding-cells = <2>;
                    quick-tap-ms = <0>;
                    require-prior-idle-ms = <0>;
                    bindings = <&kp>, <&kp>;
                };
            }; };"#,
        );

        let Behavior::HoldTap(hm) = &behaviors["hm"] else {
            panic!("expected hold-tap");
        };
        assert_eq!(hm.quick_tap_ms, Some(0));
        assert_eq!(hm.require_prior_idle_ms, Some(0));
        assert!(errors.errors().is_empty());
    }

    #[test]
    fn test_unknown_compatible_skips_only_that_behavior() {
        let (behaviors, _, errors) = extract(
            r#"/ { behaviors {
                weird: weird { compatible = "vendor,thing"; };
                td: tap_dance { compatible = "zmk,behavior-tap-dance"; bindings = <&kp A>, <&kp B>; };
            }; };"#,
        );

        assert_eq!(behaviors.len(), 1);
        assert!(matches!(behaviors["td"], Behavior::TapDance(_)));
        assert_eq!(errors.errors().len(), 1);
        assert!(errors.errors()[0].message.contains("vendor,thing"));
    }

    #[test]
    fn test_macro_steps_and_timing() {
        let (behaviors, _, errors) = extract(
            r#"/ { macros {
                hello: hello {
                    compatible = "zmk,behavior-macro";
                    #binding-cells = <0>;
                    wait-ms = <0>;
                    bindings = <&macro_press &kp LSHIFT>, <&macro_tap &kp H>,
                               <&macro_wait_time 100>, <&macro_release &kp LSHIFT>;
                };
            }; };"#,
        );

        let Behavior::Macro(hello) = &behaviors["hello"] else {
            panic!("expected macro");
        };
        assert_eq!(hello.wait_ms, Macro::DEFAULT_WAIT_MS);
        assert_eq!(hello.steps.len(), 7);
        assert_eq!(hello.steps[0], MacroStep::Mode(MacroMode::Press));
        assert_eq!(hello.steps[4], MacroStep::Wait(100));
        assert_eq!(errors.errors().len(), 1);
        assert_eq!(errors.errors()[0].kind, ErrorKind::TimingValidationError);
    }

    #[test]
    fn test_combos_and_mod_morph() {
        let (behaviors, _, errors) = extract(
            r#"/ {
                combos {
                    compatible = "zmk,combos";
                    combo_esc { timeout-ms = <40>; key-positions = <0 1>; bindings = <&kp ESC>; };
                };
                behaviors {
                    bspc_del: bspc_del {
                        compatible = "zmk,behavior-mod-morph";
                        bindings = <&kp BSPC>, <&kp DEL>;
                        mods = <(MOD_LSFT|MOD_RSFT)>;
                    };
                };
            };"#,
        );

        let Behavior::Combo(combo) = &behaviors["combo_esc"] else {
            panic!("expected combo");
        };
        assert_eq!(combo.key_positions, vec![0, 1]);
        assert_eq!(combo.timeout_ms, 40);

        let Behavior::ModMorph(morph) = &behaviors["bspc_del"] else {
            panic!("expected mod-morph");
        };
        assert_eq!(morph.mods, 0x22);
        assert!(errors.errors().is_empty());
    }

    #[test]
    fn test_builtin_overrides() {
        let (_, builtins, errors) = extract(
            "/ { }; &mt { tapping-term-ms = <190>; flavor = \"tap-preferred\"; }; &sk { quick-release; };",
        );
        assert_eq!(builtins.mod_tap.tapping_term_ms, Some(190));
        assert_eq!(builtins.mod_tap.flavor, Flavor::TapPreferred);
        assert!(builtins.sticky_key.quick_release);
        assert!(errors.errors().is_empty());
    }

    #[test]
    fn test_parse_mods() {
        assert_eq!(parse_mods("(MOD_LSFT|MOD_RSFT)"), Some(0x22));
        assert_eq!(parse_mods("0x02"), Some(0x02));
        assert_eq!(parse_mods("MOD_HYPER"), None);
    }
}
