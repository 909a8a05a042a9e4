//! Property access for one node with its `&label { ... };` overrides applied.

use crate::diagnostics::{Component, ConversionError, ErrorKind, ErrorManager};
use crate::dts::{CellArray, Node, NodeId, Property, Root};
use crate::models::{validate_disableable_timing, validate_timing};

/// A node plus the override blocks that target any of its labels.
///
/// Lookups consult the overrides first (last block wins), then the node.
#[derive(Debug, Clone)]
pub struct NodeView<'a> {
    root: &'a Root,
    id: NodeId,
    layers: Vec<NodeId>,
}

impl<'a> NodeView<'a> {
    /// View of a node in the main tree, overrides included.
    #[must_use]
    pub fn new(root: &'a Root, id: NodeId) -> Self {
        let mut layers = vec![id];
        for label in &root.node(id).labels {
            layers.extend(root.overrides_for(label));
        }
        Self { root, id, layers }
    }

    /// View of a detached override block on its own.
    #[must_use]
    pub fn detached(root: &'a Root, id: NodeId) -> Self {
        Self {
            root,
            id,
            layers: vec![id],
        }
    }

    /// The underlying node.
    #[must_use]
    pub fn node(&self) -> &'a Node {
        self.root.node(self.id)
    }

    /// Node path for diagnostics, e.g. `/behaviors/hm`.
    #[must_use]
    pub fn path(&self) -> String {
        self.root.path(self.id)
    }

    /// Behavior name: first label, else node name.
    #[must_use]
    pub fn behavior_name(&self) -> String {
        let node = self.node();
        node.label().unwrap_or(&node.name).to_string()
    }

    /// Property with overrides applied.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&'a Property> {
        let root = self.root;
        self.layers
            .iter()
            .rev()
            .find_map(|id| root.node(*id).property(name))
    }

    /// String property.
    #[must_use]
    pub fn string(&self, name: &str) -> Option<&'a str> {
        self.property(name)?.as_str()
    }

    /// Array property.
    #[must_use]
    pub fn array(&self, name: &str) -> Option<&'a CellArray> {
        self.property(name)?.as_array()
    }

    /// Flag property (`name;` or `name = true;`).
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        let root = self.root;
        self.layers
            .iter()
            .rev()
            .find(|id| root.node(**id).property(name).is_some())
            .is_some_and(|id| root.node(*id).flag(name))
    }

    /// Integer property, reporting a non-integer value as a skipped property.
    pub fn integer(
        &self,
        name: &str,
        component: Component,
        errors: &mut ErrorManager,
    ) -> Result<Option<i64>, ConversionError> {
        let Some(property) = self.property(name) else {
            return Ok(None);
        };
        match property.as_integer() {
            Some(value) => Ok(Some(value)),
            None => {
                errors.report(
                    self.diagnostic(
                        ErrorKind::ExtractionError,
                        component,
                        property,
                        format!("property '{name}' of '{}' is not an integer; ignored", self.behavior_name()),
                    ),
                )?;
                Ok(None)
            }
        }
    }

    /// Millisecond timing property in `1..=10000`; anything else is rejected and reported.
    pub fn timing(
        &self,
        name: &str,
        component: Component,
        errors: &mut ErrorManager,
    ) -> Result<Option<u32>, ConversionError> {
        self.checked_timing(name, component, errors, false)
    }

    /// Timing property where `0` turns the feature off, so `0..=10000` is accepted.
    pub fn disableable_timing(
        &self,
        name: &str,
        component: Component,
        errors: &mut ErrorManager,
    ) -> Result<Option<u32>, ConversionError> {
        self.checked_timing(name, component, errors, true)
    }

    fn checked_timing(
        &self,
        name: &str,
        component: Component,
        errors: &mut ErrorManager,
        allow_zero: bool,
    ) -> Result<Option<u32>, ConversionError> {
        let Some(value) = self.integer(name, component, errors)? else {
            return Ok(None);
        };
        let (checked, range, suggestion) = if allow_zero {
            (
                validate_disableable_timing(value),
                "0..=10000",
                "use 0 to disable, or a value of at most 10000",
            )
        } else {
            (
                validate_timing(value),
                "1..=10000",
                "use a positive value of at most 10000",
            )
        };
        if let Some(ms) = checked {
            return Ok(Some(ms));
        }
        if let Some(property) = self.property(name) {
            errors.report(
                self.diagnostic(
                    ErrorKind::TimingValidationError,
                    component,
                    property,
                    format!(
                        "{name} = {value} on '{}' is outside {range} ms; default used",
                        self.behavior_name()
                    ),
                )
                .with_suggestion(suggestion),
            )?;
        }
        Ok(None)
    }

    /// Array of non-negative integers such as `key-positions` or `layers`.
    pub fn indices(
        &self,
        name: &str,
        component: Component,
        errors: &mut ErrorManager,
    ) -> Result<Vec<usize>, ConversionError> {
        let Some(property) = self.property(name) else {
            return Ok(Vec::new());
        };
        let values = property
            .as_array()
            .and_then(CellArray::integers)
            .and_then(|v| v.into_iter().map(|n| usize::try_from(n).ok()).collect::<Option<Vec<_>>>());
        match values {
            Some(values) => Ok(values),
            None => {
                errors.report(self.diagnostic(
                    ErrorKind::ExtractionError,
                    component,
                    property,
                    format!(
                        "property '{name}' of '{}' must be a list of non-negative integers; ignored",
                        self.behavior_name()
                    ),
                ))?;
                Ok(Vec::new())
            }
        }
    }

    /// Diagnostic positioned at `property`, with the node path as context.
    #[must_use]
    pub fn diagnostic(
        &self,
        kind: ErrorKind,
        component: Component,
        property: &Property,
        message: String,
    ) -> ConversionError {
        ConversionError::new(kind, component, message)
            .with_position(property.line, property.column)
            .with_context(format!("in {}", self.path()))
    }

    /// Diagnostic positioned at the node itself.
    #[must_use]
    pub fn node_diagnostic(&self, kind: ErrorKind, component: Component, message: String) -> ConversionError {
        let node = self.node();
        ConversionError::new(kind, component, message)
            .with_position(node.line, node.column)
            .with_context(format!("in {}", self.path()))
    }
}
