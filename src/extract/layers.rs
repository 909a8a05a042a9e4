//! Layer extraction from the `keymap` node.

use super::bindings::{parse_bindings, CellTable};
use super::view::NodeView;
use crate::diagnostics::{Component, ConversionError, ErrorKind, ErrorManager, Severity};
use crate::dts::{NodeId, Root};
use crate::models::Layer;
use tracing::debug;

/// The keymap node: first `compatible = "zmk,keymap"`, else first node named `keymap`.
#[must_use]
pub fn find_keymap(root: &Root) -> Option<NodeId> {
    root.find_by_compatible("zmk,keymap")
        .into_iter()
        .next()
        .or_else(|| root.find_by_name("keymap"))
}

/// Every direct child of the keymap node with a `bindings` array is a layer.
///
/// A missing keymap is reported at Error severity. A child without `bindings`
/// is skipped with a warning; its index is still consumed so numeric layer
/// references keep pointing at the right layer.
pub fn extract_layers(
    root: &Root,
    table: &CellTable,
    errors: &mut ErrorManager,
) -> Result<Vec<Layer>, ConversionError> {
    let Some(keymap) = find_keymap(root) else {
        errors.report(
            ConversionError::new(
                ErrorKind::ExtractionError,
                Component::Extractor,
                "no keymap node found",
            )
            .with_severity(Severity::Error)
            .with_suggestion("add a node with compatible = \"zmk,keymap\""),
        )?;
        return Ok(Vec::new());
    };

    let mut layers = Vec::new();
    for (index, id) in root.children(keymap).enumerate() {
        let view = NodeView::new(root, id);
        let node = view.node();

        let Some(array) = view.array("bindings") else {
            errors.report(view.node_diagnostic(
                ErrorKind::ExtractionError,
                Component::Extractor,
                format!("layer '{}' has no bindings property; skipped", node.name),
            ))?;
            continue;
        };

        let owner = format!("layer '{}'", node.name);
        let bindings = parse_bindings(array, table, &owner, Component::Extractor, errors)?;
        let display_name = view
            .string("display-name")
            .or_else(|| view.string("label"))
            .map(str::to_string);

        debug!(layer = %node.name, index, keys = bindings.len(), "extracted layer");
        layers.push(Layer {
            name: node.name.clone(),
            display_name,
            index,
            bindings,
        });
    }

    Ok(layers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dts::parse;
    use crate::models::Param;

    const KEYMAP: &str = r#"
/ {
    keymap {
        compatible = "zmk,keymap";
        default_layer {
            display-name = "Base";
            bindings = <
                &kp A &kp B &kp C
                &kp D &kp E &kp F
            >;
        };
        broken_layer {
            label = "Broken";
        };
        nav {
            bindings = <&trans &mo 0>;
        };
    };
};
"#;

    #[test]
    fn test_layers_in_source_order() {
        let mut errors = ErrorManager::default();
        let root = parse(KEYMAP, &mut errors).unwrap();
        let layers = extract_layers(&root, &CellTable::new(), &mut errors).unwrap();

        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].name, "default_layer");
        assert_eq!(layers[0].display_name.as_deref(), Some("Base"));
        assert_eq!(layers[0].rows().len(), 2);
        assert_eq!(layers[1].index, 2);
        assert_eq!(layers[1].bindings[1].params, vec![Param::Number(0)]);

        assert_eq!(errors.errors().len(), 1);
        assert!(errors.errors()[0].message.contains("broken_layer"));
    }

    #[test]
    fn test_keymap_found_by_name() {
        let mut errors = ErrorManager::default();
        let root = parse("/ { keymap { base { bindings = <&kp A>; }; }; };", &mut errors).unwrap();
        assert!(find_keymap(&root).is_some());
        let layers = extract_layers(&root, &CellTable::new(), &mut errors).unwrap();
        assert_eq!(layers.len(), 1);
    }

    #[test]
    fn test_missing_keymap_is_error() {
        let mut errors = ErrorManager::default();
        let root = parse("/ { behaviors { }; };", &mut errors).unwrap();
        let err = extract_layers(&root, &CellTable::new(), &mut errors).unwrap_err();
        assert_eq!(err.severity, Severity::Error);
        assert_eq!(err.kind, ErrorKind::ExtractionError);
    }
}
