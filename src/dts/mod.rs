//! Devicetree front end: preprocessing, tokenizing, parsing.
//!
//! The output of this module is a [`Root`]: an immutable node tree with a
//! label index, ready for the extractor.

pub mod ast;
pub mod error;
pub mod expr;
pub mod parser;
pub mod preprocessor;
pub mod tokenizer;

pub use ast::{Cell, CellArray, LocatedCell, Node, NodeId, Property, PropertyKind, PropertyValue, Root};
pub use error::ParseError;
pub use parser::parse;
pub use preprocessor::{Preprocessor, PreprocessorError};
pub use tokenizer::{tokenize, Token, TokenKind};
