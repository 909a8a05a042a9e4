//! Recursive-descent parser from tokens to a [`Root`].
//!
//! Grammar, informally:
//!
//! ```text
//! document  := item*
//! item      := '/' '{' body '}' ';'          root block (repeats are merged)
//!            | '{' body '}' ';'              stray block, merged into root
//!            | '&' label '{' body '}' ';'    override block
//!            | '/' directive '/' ... ';'     /dts-v1/; /plugin/; ...
//! body      := ( '}' | node | property | directive )*
//! node      := (label ':')* name '{' body '}' ';'
//! property  := name ';' | name '=' value (',' value)* ';'
//! ```

use super::ast::{CellArray, NodeId, Property, PropertyValue, Root, TreeBuilder};
use super::error::ParseError;
use super::expr::parse_integer;
use super::tokenizer::{tokenize, Token, TokenKind};
use crate::diagnostics::{render_context, Component, ConversionError, ErrorKind, ErrorManager, Severity};

/// Tokenizes and parses devicetree source.
pub fn parse(source: &str, errors: &mut ErrorManager) -> Result<Root, ParseError> {
    let tokens = tokenize(source)?;
    parse_tokens(&tokens, source, errors)
}

/// Parses an already tokenized document.
///
/// `source` is only used to render context snippets for errors.
pub fn parse_tokens(
    tokens: &[Token],
    source: &str,
    errors: &mut ErrorManager,
) -> Result<Root, ParseError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        source,
        builder: TreeBuilder::new(),
        errors,
        root_blocks: 0,
    };
    parser.document()?;
    parser.builder.finish()
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    source: &'a str,
    builder: TreeBuilder,
    errors: &'a mut ErrorManager,
    root_blocks: usize,
}

impl Parser<'_> {
    fn peek(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn peek_kind(&self) -> TokenKind {
        if self.tokens.is_empty() {
            TokenKind::Eof
        } else {
            self.peek().kind
        }
    }

    fn peek_kind_at(&self, ahead: usize) -> TokenKind {
        self.tokens
            .get(self.pos + ahead)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn syntax(&self, message: impl Into<String>, token: &Token) -> ParseError {
        ParseError::Syntax {
            message: message.into(),
            line: token.line,
            column: token.column,
            context: render_context(self.source, token.line, token.column),
        }
    }

    fn warn(&mut self, message: String, token: &Token, severity: Severity) -> Result<(), ParseError> {
        self.errors.report(
            ConversionError::new(ErrorKind::ParseError, Component::Parser, message)
                .with_severity(severity)
                .with_position(token.line, token.column),
        )?;
        Ok(())
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParseError> {
        if self.tokens.is_empty() || self.peek().kind != kind {
            let token = self.peek_or_eof();
            return Err(self.syntax(format!("expected {what}, found {}", describe(&token)), &token));
        }
        Ok(self.advance())
    }

    fn peek_or_eof(&self) -> Token {
        if self.tokens.is_empty() {
            Token {
                kind: TokenKind::Eof,
                text: String::new(),
                line: 1,
                column: 1,
                offset: 0,
            }
        } else {
            self.peek().clone()
        }
    }

    fn document(&mut self) -> Result<(), ParseError> {
        loop {
            let token = self.peek_or_eof();
            match token.kind {
                TokenKind::Eof => return Ok(()),
                TokenKind::Slash if self.peek_kind_at(1) == TokenKind::LBrace => {
                    self.advance();
                    self.advance();
                    self.root_blocks += 1;
                    if self.root_blocks > 1 {
                        self.warn(
                            format!("additional root block #{} merged into '/'", self.root_blocks),
                            &token,
                            Severity::Info,
                        )?;
                    }
                    self.body(NodeId::ROOT)?;
                    self.top_level_terminator("root block")?;
                }
                TokenKind::Slash => self.directive()?,
                TokenKind::LBrace => {
                    self.advance();
                    self.warn(
                        "stray '{' at top level parsed as an anonymous block and merged into '/'"
                            .to_string(),
                        &token,
                        Severity::Warning,
                    )?;
                    self.body(NodeId::ROOT)?;
                    self.top_level_terminator("anonymous block")?;
                }
                TokenKind::Reference => {
                    self.advance();
                    self.expect(TokenKind::LBrace, &format!("'{{' after '&{}'", token.text))?;
                    let id = self
                        .builder
                        .override_block(&token.text, token.line, token.column);
                    self.body(id)?;
                    self.expect(TokenKind::Semicolon, "';' after override block")?;
                }
                TokenKind::Semicolon => {
                    self.advance();
                }
                _ => {
                    return Err(self.syntax(
                        format!("expected '/ {{' at top level, found {}", describe(&token)),
                        &token,
                    ))
                }
            }
        }
    }

    /// `};` after a top-level block; a missing `;` right before end of input
    /// is tolerated.
    fn top_level_terminator(&mut self, what: &str) -> Result<(), ParseError> {
        match self.peek_kind() {
            TokenKind::Semicolon => {
                self.advance();
                Ok(())
            }
            TokenKind::Eof => {
                let token = self.peek_or_eof();
                self.warn(
                    format!("missing ';' after {what} at end of input"),
                    &token,
                    Severity::Warning,
                )
            }
            _ => {
                let token = self.peek_or_eof();
                Err(self.syntax(
                    format!("expected ';' after {what}, found {}", describe(&token)),
                    &token,
                ))
            }
        }
    }

    /// `/name/ ...;` directives. `/include/ "file"` has no semicolon.
    fn directive(&mut self) -> Result<(), ParseError> {
        let start = self.advance();
        let name = self.expect(TokenKind::Ident, "directive name after '/'")?;
        self.expect(TokenKind::Slash, &format!("'/' closing '/{}'", name.text))?;

        match name.text.as_str() {
            "dts-v1" | "plugin" => {
                self.expect(TokenKind::Semicolon, &format!("';' after '/{}/'", name.text))?;
            }
            "include" => {
                let file = self.expect(TokenKind::String, "file name after '/include/'")?;
                self.warn(
                    format!("/include/ \"{}\" ignored; run the preprocessor instead", file.text),
                    &start,
                    Severity::Warning,
                )?;
            }
            "delete-node" | "delete-property" => {
                let target = self.advance();
                self.expect(
                    TokenKind::Semicolon,
                    &format!("';' after '/{}/ {}'", name.text, target.text),
                )?;
                self.warn(
                    format!("/{}/ {} ignored", name.text, target.text),
                    &start,
                    Severity::Info,
                )?;
            }
            other => {
                return Err(self.syntax(format!("unknown directive '/{other}/'"), &name));
            }
        }

        Ok(())
    }

    fn body(&mut self, node: NodeId) -> Result<(), ParseError> {
        loop {
            let token = self.peek_or_eof();
            match token.kind {
                TokenKind::RBrace => {
                    self.advance();
                    return Ok(());
                }
                TokenKind::Eof => {
                    let open = self.builder.node(node);
                    let message = format!(
                        "unexpected end of input; node '{}' opened at line {}, column {} is missing '}}'",
                        open.name, open.line, open.column
                    );
                    return Err(self.syntax(message, &token));
                }
                TokenKind::Slash => self.directive()?,
                TokenKind::Ident | TokenKind::Number => self.item(node)?,
                _ => {
                    return Err(self.syntax(
                        format!("unexpected {} in node body", describe(&token)),
                        &token,
                    ))
                }
            }
        }
    }

    fn item(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let mut labels = Vec::new();
        while matches!(self.peek_kind(), TokenKind::Ident | TokenKind::Number)
            && self.peek_kind_at(1) == TokenKind::Colon
        {
            labels.push(self.advance());
            self.advance();
        }

        let name = self.advance();
        if !matches!(name.kind, TokenKind::Ident | TokenKind::Number) {
            return Err(self.syntax(
                format!("expected node name after label, found {}", describe(&name)),
                &name,
            ));
        }

        match self.peek_kind() {
            TokenKind::LBrace => {
                self.advance();
                let (child, _) = self
                    .builder
                    .child(parent, &name.text, name.line, name.column);
                for label in &labels {
                    self.builder.add_label(child, &label.text);
                }
                self.body(child)?;
                self.expect(TokenKind::Semicolon, &format!("';' after node '{}'", name.text))?;
                Ok(())
            }
            _ if !labels.is_empty() => {
                let found = self.peek_or_eof();
                Err(self.syntax(
                    format!(
                        "expected '{{' after node name '{}', found {}",
                        name.text,
                        describe(&found)
                    ),
                    &found,
                ))
            }
            TokenKind::Semicolon => {
                self.advance();
                self.store(parent, &name, PropertyValue::Boolean(true))
            }
            TokenKind::Equals => {
                self.advance();
                let value = self.value(&name)?;
                self.expect(
                    TokenKind::Semicolon,
                    &format!("';' after property '{}'", name.text),
                )?;
                self.store(parent, &name, value)
            }
            _ => {
                let found = self.peek_or_eof();
                Err(self.syntax(
                    format!(
                        "expected '=', ';' or '{{' after '{}', found {}",
                        name.text,
                        describe(&found)
                    ),
                    &found,
                ))
            }
        }
    }

    fn store(&mut self, node: NodeId, name: &Token, value: PropertyValue) -> Result<(), ParseError> {
        let property = Property {
            name: name.text.clone(),
            value,
            line: name.line,
            column: name.column,
        };
        if let Some(previous) = self.builder.set_property(node, property) {
            let owner = self.builder.node(node).name.clone();
            self.warn(
                format!(
                    "property '{}' of node '{}' redefined (first at line {}); later value wins",
                    name.text, owner, previous.line
                ),
                name,
                Severity::Warning,
            )?;
        }
        Ok(())
    }

    /// Parses `value (',' value)*` into a single [`PropertyValue`].
    fn value(&mut self, name: &Token) -> Result<PropertyValue, ParseError> {
        let mut parts = vec![self.advance()];
        while self.peek_kind() == TokenKind::Comma {
            self.advance();
            parts.push(self.advance());
        }

        let invalid = |parser: &Self, token: &Token| {
            parser.syntax(
                format!(
                    "invalid value for property '{}': {}",
                    name.text,
                    describe(token)
                ),
                token,
            )
        };

        let first = &parts[0];
        match first.kind {
            TokenKind::String => {
                let mut strings = Vec::new();
                for part in &parts {
                    if part.kind != TokenKind::String {
                        return Err(invalid(self, part));
                    }
                    strings.push(part.text.clone());
                }
                if strings.len() == 1 {
                    Ok(PropertyValue::String(strings.remove(0)))
                } else {
                    Ok(PropertyValue::StringList(strings))
                }
            }
            TokenKind::Array | TokenKind::Bytes => {
                let mut array = CellArray::default();
                for part in &parts {
                    if !matches!(part.kind, TokenKind::Array | TokenKind::Bytes) {
                        return Err(invalid(self, part));
                    }
                    array
                        .segments
                        .extend(CellArray::single(&part.text, part.line, part.column).segments);
                }
                Ok(PropertyValue::Array(array))
            }
            _ if parts.len() > 1 => Err(invalid(self, &parts[1])),
            TokenKind::Number => parse_integer(&first.text)
                .map(PropertyValue::Integer)
                .ok_or_else(|| invalid(self, first)),
            TokenKind::Reference => Ok(PropertyValue::Reference(first.text.clone())),
            TokenKind::Ident => Ok(match first.text.as_str() {
                "true" => PropertyValue::Boolean(true),
                "false" => PropertyValue::Boolean(false),
                other => PropertyValue::String(other.to_string()),
            }),
            _ => Err(invalid(self, first)),
        }
    }
}

fn describe(token: &Token) -> String {
    match token.kind {
        TokenKind::Eof => "end of input".to_string(),
        TokenKind::String => format!("string \"{}\"", token.text),
        TokenKind::Array => "array".to_string(),
        TokenKind::Reference => format!("'&{}'", token.text),
        _ => format!("'{}'", token.text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> (Root, ErrorManager) {
        let mut errors = ErrorManager::default();
        let root = parse(source, &mut errors).unwrap();
        (root, errors)
    }

    fn parse_err(source: &str) -> ParseError {
        let mut errors = ErrorManager::default();
        parse(source, &mut errors).unwrap_err()
    }

    const KEYMAP: &str = r#"
/dts-v1/;
/ {
    behaviors {
        hm: homerow_mods {
            compatible = "zmk,behavior-hold-tap";
            #binding-cells = <2>;
            tapping-term-ms = <200>;
            flavor = "balanced";
            bindings = <&kp>, <&kp>;
            retro-tap;
        };
    };

    keymap {
        compatible = "zmk,keymap";
        default_layer {
            bindings = <&kp A &hm LSHIFT B>;
        };
    };
};
"#;

    #[test]
    fn test_parse_keymap_structure() {
        let (root, errors) = parse_ok(KEYMAP);
        assert!(errors.errors().is_empty());
        assert_eq!(root.root_node().name, "/");

        let hm = root.resolve_reference("&hm").unwrap();
        let node = root.node(hm);
        assert_eq!(node.name, "homerow_mods");
        assert_eq!(node.compatible(), Some("zmk,behavior-hold-tap"));
        assert_eq!(node.integer("#binding-cells"), Some(2));
        assert_eq!(node.integer("tapping-term-ms"), Some(200));
        assert_eq!(node.string("flavor"), Some("balanced"));
        assert!(node.flag("retro-tap"));

        let bindings = node.array("bindings").unwrap();
        assert_eq!(bindings.segments.len(), 2);
        assert_eq!(bindings.text(), "&kp &kp");
        assert_eq!(root.path(hm), "/behaviors/homerow_mods");
    }

    #[test]
    fn test_multiple_root_blocks_merge_with_warning() {
        let source = r#"
/ { keymap { a { x = <1>; }; }; };
/ { keymap { a { x = <2>; }; b { y; }; }; };
"#;
        let (root, errors) = parse_ok(source);
        let keymap = root.find_by_name("keymap").unwrap();
        assert_eq!(root.children(keymap).count(), 2);

        let a = root.find_by_name("a").unwrap();
        assert_eq!(root.node(a).integer("x"), Some(2));

        let warnings: Vec<_> = errors
            .errors()
            .iter()
            .filter(|e| e.severity == Severity::Warning)
            .collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("'x'"));
    }

    #[test]
    fn test_stray_block_is_merged() {
        let (root, errors) = parse_ok("/ { a { }; };\n{ b { }; };\n");
        assert!(root.find_by_name("b").is_some());
        assert!(errors
            .errors()
            .iter()
            .any(|e| e.message.contains("stray '{'")));
    }

    #[test]
    fn test_override_blocks_are_detached() {
        let (root, _) = parse_ok("&mt { tapping-term-ms = <180>; };\n/ { };");
        let overrides: Vec<_> = root.overrides_for("mt").collect();
        assert_eq!(overrides.len(), 1);
        assert_eq!(root.node(overrides[0]).integer("tapping-term-ms"), Some(180));
        assert_eq!(root.find_by_name("&mt"), None);
    }

    #[test]
    fn test_value_kinds() {
        let (root, _) = parse_ok(
            r#"/ { n { s = "a"; l = "a", "b"; i = 0x10; b = false; r = &kp; f; }; };"#,
        );
        let node = root.node(root.find_by_name("n").unwrap());
        assert_eq!(
            node.property("l").unwrap().value,
            PropertyValue::StringList(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(node.integer("i"), Some(16));
        assert_eq!(node.property("b").unwrap().value, PropertyValue::Boolean(false));
        assert_eq!(
            node.property("r").unwrap().value,
            PropertyValue::Reference("kp".to_string())
        );
        assert!(node.flag("f"));
    }

    #[test]
    fn test_missing_semicolon_after_property() {
        let err = parse_err("/ {\n  a {\n    x = <1>\n  };\n};");
        match err {
            ParseError::Syntax {
                message,
                line,
                context,
                ..
            } => {
                assert!(message.contains("expected ';' after property 'x'"));
                assert_eq!(line, 4);
                assert!(context.contains("^"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_brace_after_labelled_node() {
        let err = parse_err("/ { hm: homerow = <1>; };");
        assert!(err.to_string().contains("expected '{' after node name 'homerow'"));
    }

    #[test]
    fn test_invalid_property_value() {
        let err = parse_err("/ { a = ; };");
        assert!(err.to_string().contains("invalid value for property 'a'"));
    }

    #[test]
    fn test_missing_final_semicolon_is_tolerated() {
        let (root, errors) = parse_ok("/ { a { }; }");
        assert!(root.find_by_name("a").is_some());
        assert_eq!(errors.count(Severity::Warning), 1);
    }

    #[test]
    fn test_unclosed_node_reports_opening_position() {
        let err = parse_err("/ {\n  keymap {\n");
        assert!(err.to_string().contains("node 'keymap' opened at line 2"));
    }

    #[test]
    fn test_duplicate_labels_fail() {
        let err = parse_err("/ { x: a { }; x: b { }; };");
        assert!(matches!(err, ParseError::DuplicateLabel { .. }));
    }

    #[test]
    fn test_strict_threshold_escalates_recoveries() {
        let mut errors = ErrorManager::new(Severity::Warning);
        let err = parse("/ { a = <1>; a = <2>; };", &mut errors).unwrap_err();
        assert!(matches!(err, ParseError::Escalated(_)));
    }
}
