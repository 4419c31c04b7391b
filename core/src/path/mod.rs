//! A small path language for selecting nodes in a [`Document`]. It covers
//! the location-path part of XPath 1.0: the usual axes, name and kind tests,
//! positional predicates, and `=`/`!=` comparisons against literals,
//! numbers, and other paths.

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use lalrpop_util::lalrpop_mod;

use crate::dom::Document;

pub mod ast;
pub mod error;
mod eval;

lalrpop_mod!(#[allow(clippy::all)] grammar, "/path/grammar.rs");

pub use error::{PathError, PathParserError};
pub use eval::Item;
pub use grammar::PathParser;

/// A compiled path expression
#[derive(Clone, Debug, PartialEq)]
pub struct PathExpression {
    source: String,
    path: ast::Path,
}

impl PathExpression {
    /// Parses the given expression
    pub fn compile(expression: &str) -> Result<Self, PathError> {
        let path = PathParser::new()
            .parse(expression)
            .map_err(|e| e.map_token(|t| t.to_string()))?;
        Ok(Self {
            source: expression.to_string(),
            path,
        })
    }

    /// Returns the expression this path was compiled from
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn path(&self) -> &ast::Path {
        &self.path
    }

    /// Evaluates the path against the document node of `doc`. Returns the
    /// selected items in document order.
    pub fn select(&self, doc: &Document) -> Vec<Item> {
        eval::evaluate(&self.path, doc, Item::Node(doc.root()))
    }

    /// Returns `true` if the path selects at least one item
    pub fn matches(&self, doc: &Document) -> bool {
        !self.select(doc).is_empty()
    }
}

impl FromStr for PathExpression {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::compile(s)
    }
}

impl Display for PathExpression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}
