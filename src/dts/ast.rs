//! Devicetree node tree and label index.
//!
//! Nodes live in an arena owned by [`Root`] and are addressed by [`NodeId`].
//! A node owns its children through the `children` map; the `parent` link is a
//! plain back-reference. The label index maps each label to a `NodeId` and is
//! frozen once [`TreeBuilder::finish`] returns.

use super::error::ParseError;
use super::expr::{evaluate, parse_integer};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;

/// Stable handle to a node inside a [`Root`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    /// The root node `/`.
    pub const ROOT: Self = Self(0);

    /// Index into the arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// One segment of an angle-bracket array with its source position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArraySegment {
    /// Text between `<` and `>`
    pub text: String,
    /// Line of the opening `<`
    pub line: usize,
    /// Column of the opening `<`
    pub column: usize,
}

/// A cell split out of an array, with its own position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocatedCell {
    /// Raw cell text, parenthesized groups kept whole
    pub text: String,
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub column: usize,
}

/// Array cell value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Cell {
    /// Integer literal or constant expression
    Integer(i64),
    /// Anything else (`&kp`, `LSHIFT`, `LC(A)`)
    Text(String),
}

/// One or more `<...>` arrays joined by comma continuation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CellArray {
    /// Segments in source order
    pub segments: Vec<ArraySegment>,
}

impl CellArray {
    /// Builds an array from a single segment.
    #[must_use]
    pub fn single(text: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            segments: vec![ArraySegment {
                text: text.into(),
                line,
                column,
            }],
        }
    }

    /// Splits every segment into whitespace-separated cells.
    ///
    /// Parenthesized groups such as `LC(LS(A))` or `(1 << 8 | 2)` stay one cell
    /// even when they contain spaces.
    #[must_use]
    pub fn located_cells(&self) -> Vec<LocatedCell> {
        let mut cells = Vec::new();

        for segment in &self.segments {
            let mut line = segment.line;
            let mut column = segment.column + 1;
            let mut depth = 0usize;
            let mut current = String::new();
            let mut start = (line, column);

            for c in segment.text.chars() {
                if c.is_whitespace() && depth == 0 {
                    if !current.is_empty() {
                        cells.push(LocatedCell {
                            text: std::mem::take(&mut current),
                            line: start.0,
                            column: start.1,
                        });
                    }
                } else {
                    if current.is_empty() {
                        start = (line, column);
                    }
                    match c {
                        '(' => depth += 1,
                        ')' => depth = depth.saturating_sub(1),
                        _ => {}
                    }
                    current.push(c);
                }

                if c == '\n' {
                    line += 1;
                    column = 1;
                } else {
                    column += 1;
                }
            }

            if !current.is_empty() {
                cells.push(LocatedCell {
                    text: current,
                    line: start.0,
                    column: start.1,
                });
            }
        }

        cells
    }

    /// Cells classified as integers or text.
    #[must_use]
    pub fn cells(&self) -> Vec<Cell> {
        self.located_cells()
            .into_iter()
            .map(|cell| match cell_integer(&cell.text) {
                Some(n) => Cell::Integer(n),
                None => Cell::Text(cell.text),
            })
            .collect()
    }

    /// All cells as integers, or `None` if any cell is not numeric.
    #[must_use]
    pub fn integers(&self) -> Option<Vec<i64>> {
        self.cells()
            .into_iter()
            .map(|cell| match cell {
                Cell::Integer(n) => Some(n),
                Cell::Text(_) => None,
            })
            .collect()
    }

    /// Segment texts joined with a space.
    #[must_use]
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.trim())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Position of the first segment.
    #[must_use]
    pub fn position(&self) -> Option<(usize, usize)> {
        self.segments.first().map(|s| (s.line, s.column))
    }
}

fn cell_integer(text: &str) -> Option<i64> {
    parse_integer(text).or_else(|| {
        if text.starts_with('(') {
            evaluate(text)
        } else {
            None
        }
    })
}

/// Kind tag for a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PropertyKind {
    /// Single string
    String,
    /// Comma-separated strings
    StringList,
    /// Bare integer
    Integer,
    /// Angle-bracket array(s)
    Array,
    /// Flag property or `true`/`false`
    Boolean,
    /// `&label`
    Reference,
}

/// Value assigned to a property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PropertyValue {
    /// `"text"`
    String(String),
    /// `"a", "b"`
    StringList(Vec<String>),
    /// `42` or `0x2A`
    Integer(i64),
    /// `<...>` or `<...>, <...>`
    Array(CellArray),
    /// `name;`, `true`, `false`
    Boolean(bool),
    /// `&label`
    Reference(String),
}

impl PropertyValue {
    /// Kind tag of this value.
    #[must_use]
    pub const fn kind(&self) -> PropertyKind {
        match self {
            Self::String(_) => PropertyKind::String,
            Self::StringList(_) => PropertyKind::StringList,
            Self::Integer(_) => PropertyKind::Integer,
            Self::Array(_) => PropertyKind::Array,
            Self::Boolean(_) => PropertyKind::Boolean,
            Self::Reference(_) => PropertyKind::Reference,
        }
    }
}

/// A named property with the position of its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Property {
    /// Property name
    pub name: String,
    /// Parsed value
    pub value: PropertyValue,
    /// 1-based line of the name
    pub line: usize,
    /// 1-based column of the name
    pub column: usize,
}

impl Property {
    /// Integer value; a one-cell array such as `<200>` counts.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match &self.value {
            PropertyValue::Integer(n) => Some(*n),
            PropertyValue::Array(array) => match array.integers()?.as_slice() {
                [n] => Some(*n),
                _ => None,
            },
            _ => None,
        }
    }

    /// String value; the first entry of a string list counts.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            PropertyValue::String(s) => Some(s),
            PropertyValue::StringList(list) => list.first().map(String::as_str),
            _ => None,
        }
    }

    /// Array value.
    #[must_use]
    pub fn as_array(&self) -> Option<&CellArray> {
        match &self.value {
            PropertyValue::Array(array) => Some(array),
            _ => None,
        }
    }
}

/// A devicetree node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    /// Node name, `/` for the root
    pub name: String,
    /// Labels declared on this node, in declaration order, without duplicates
    pub labels: Vec<String>,
    /// Properties in declaration order
    pub properties: IndexMap<String, Property>,
    /// Children by name, in declaration order
    pub children: IndexMap<String, NodeId>,
    /// Back-reference to the parent
    #[serde(skip)]
    pub parent: Option<NodeId>,
    /// 1-based line where the node was first opened
    pub line: usize,
    /// 1-based column where the node was first opened
    pub column: usize,
}

impl Node {
    fn new(name: impl Into<String>, parent: Option<NodeId>, line: usize, column: usize) -> Self {
        Self {
            name: name.into(),
            labels: Vec::new(),
            properties: IndexMap::new(),
            children: IndexMap::new(),
            parent,
            line,
            column,
        }
    }

    /// Property by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    /// Integer property (`<200>`, `200`).
    #[must_use]
    pub fn integer(&self, name: &str) -> Option<i64> {
        self.property(name)?.as_integer()
    }

    /// String property.
    #[must_use]
    pub fn string(&self, name: &str) -> Option<&str> {
        self.property(name)?.as_str()
    }

    /// Array property.
    #[must_use]
    pub fn array(&self, name: &str) -> Option<&CellArray> {
        self.property(name)?.as_array()
    }

    /// True for `name;` and `name = true;`.
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        matches!(
            self.property(name).map(|p| &p.value),
            Some(PropertyValue::Boolean(true))
        )
    }

    /// First `compatible` string.
    #[must_use]
    pub fn compatible(&self) -> Option<&str> {
        self.string("compatible")
    }

    /// First label, if any.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.labels.first().map(String::as_str)
    }
}

/// Parsed document: node arena plus label index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Root {
    nodes: Vec<Node>,
    #[serde(skip)]
    label_index: HashMap<String, NodeId>,
    overrides: Vec<(String, NodeId)>,
}

impl Root {
    /// Node by id.
    ///
    /// Ids only come from this `Root`, so the lookup cannot miss.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// The `/` node.
    #[must_use]
    pub fn root_node(&self) -> &Node {
        self.node(NodeId::ROOT)
    }

    /// Children of a node in declaration order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node(id).children.values().copied()
    }

    /// Parent of a node; `None` for the root and detached override blocks.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Slash-separated path such as `/behaviors/hm`.
    #[must_use]
    pub fn path(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id != NodeId::ROOT {
                parts.push(self.node(node_id).name.as_str());
            }
            current = self.parent(node_id);
        }

        if parts.is_empty() {
            return "/".to_string();
        }
        parts.reverse();
        format!("/{}", parts.join("/"))
    }

    /// Resolves `&label` (or `label`) through the label index.
    #[must_use]
    pub fn resolve_reference(&self, reference: &str) -> Option<NodeId> {
        let label = reference.strip_prefix('&').unwrap_or(reference);
        self.label_index.get(label).copied()
    }

    /// Number of indexed labels.
    #[must_use]
    pub fn label_count(&self) -> usize {
        self.label_index.len()
    }

    /// All nodes under `id` in depth-first pre-order, `id` included.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            let children: Vec<NodeId> = self.children(current).collect();
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Every node in the main tree named `name`, in source order.
    #[must_use]
    pub fn find_all_by_name(&self, name: &str) -> Vec<NodeId> {
        self.descendants(NodeId::ROOT)
            .into_iter()
            .filter(|id| self.node(*id).name == name)
            .collect()
    }

    /// First node in the main tree named `name`.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.find_all_by_name(name).into_iter().next()
    }

    /// Every node in the main tree whose `compatible` equals `compatible`.
    #[must_use]
    pub fn find_by_compatible(&self, compatible: &str) -> Vec<NodeId> {
        self.descendants(NodeId::ROOT)
            .into_iter()
            .filter(|id| self.node(*id).compatible() == Some(compatible))
            .collect()
    }

    /// `&label { ... };` blocks targeting `label`, in source order.
    pub fn overrides_for<'a>(&'a self, label: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.overrides
            .iter()
            .filter(move |(target, _)| target == label)
            .map(|(_, id)| *id)
    }

    /// Every override block as `(label, node)`.
    #[must_use]
    pub fn overrides(&self) -> &[(String, NodeId)] {
        &self.overrides
    }
}

/// Mutable arena used while parsing; frozen into a [`Root`] by [`finish`](Self::finish).
#[derive(Debug)]
pub struct TreeBuilder {
    nodes: Vec<Node>,
    overrides: Vec<(String, NodeId)>,
}

impl TreeBuilder {
    /// Starts a tree holding only the root node `/`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new("/", None, 1, 1)],
            overrides: Vec::new(),
        }
    }

    /// Node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Returns the child `name` of `parent`, creating it if needed.
    ///
    /// The boolean is true when an existing child was reopened.
    pub fn child(&mut self, parent: NodeId, name: &str, line: usize, column: usize) -> (NodeId, bool) {
        if let Some(existing) = self.nodes[parent.0].children.get(name) {
            return (*existing, true);
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(name, Some(parent), line, column));
        self.nodes[parent.0].children.insert(name.to_string(), id);
        (id, false)
    }

    /// Creates a node outside the main tree for a `&label { ... }` block.
    pub fn override_block(&mut self, label: &str, line: usize, column: usize) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes
            .push(Node::new(format!("&{label}"), None, line, column));
        self.overrides.push((label.to_string(), id));
        id
    }

    /// Adds a label to a node, ignoring repeats on the same node.
    pub fn add_label(&mut self, id: NodeId, label: &str) {
        let labels = &mut self.nodes[id.0].labels;
        if !labels.iter().any(|l| l == label) {
            labels.push(label.to_string());
        }
    }

    /// Sets a property, returning the value it replaced.
    pub fn set_property(&mut self, id: NodeId, property: Property) -> Option<Property> {
        self.nodes[id.0]
            .properties
            .insert(property.name.clone(), property)
    }

    /// Path of a node while building.
    fn path(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id != NodeId::ROOT {
                parts.push(self.nodes[node_id.0].name.as_str());
            }
            current = self.nodes[node_id.0].parent;
        }
        if parts.is_empty() {
            return "/".to_string();
        }
        parts.reverse();
        format!("/{}", parts.join("/"))
    }

    /// Freezes the arena and builds the label index in one traversal.
    ///
    /// Fails when two different nodes carry the same label.
    pub fn finish(self) -> Result<Root, ParseError> {
        let mut label_index: HashMap<String, NodeId> = HashMap::new();

        let mut stack = vec![NodeId::ROOT];
        stack.extend(self.overrides.iter().rev().map(|(_, id)| *id));
        let mut order = Vec::new();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id.0].children.values().rev().copied());
        }

        for id in order {
            for label in &self.nodes[id.0].labels {
                if let Some(first) = label_index.get(label) {
                    if *first != id {
                        return Err(ParseError::DuplicateLabel {
                            label: label.clone(),
                            first: self.path(*first),
                            second: self.path(id),
                        });
                    }
                }
                label_index.insert(label.clone(), id);
            }
        }

        Ok(Root {
            nodes: self.nodes,
            label_index,
            overrides: self.overrides,
        })
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
