use crate::{
    dom::Document,
    path::{PathError, PathExpression},
};

/// Decides whether a materialized element should be transformed. Predicates
/// must not keep state between calls: the same document must always yield
/// the same result.
pub trait Predicate {
    fn test(&self, document: &Document) -> bool;
}

impl<F> Predicate for F
where
    F: Fn(&Document) -> bool,
{
    fn test(&self, document: &Document) -> bool {
        self(document)
    }
}

/// A predicate that accepts every document
#[derive(Default, Debug, Clone, Copy)]
pub struct AcceptAll;

impl Predicate for AcceptAll {
    fn test(&self, _document: &Document) -> bool {
        true
    }
}

/// A predicate that accepts documents in which a path expression selects at
/// least one node
#[derive(Debug, Clone)]
pub struct PathPredicate {
    path: PathExpression,
}

impl PathPredicate {
    /// Compiles the given path expression. Fails if the expression is
    /// invalid.
    pub fn new(expression: &str) -> Result<Self, PathError> {
        Ok(Self {
            path: PathExpression::compile(expression)?,
        })
    }
}

impl From<PathExpression> for PathPredicate {
    fn from(path: PathExpression) -> Self {
        Self { path }
    }
}

impl Predicate for PathPredicate {
    fn test(&self, document: &Document) -> bool {
        self.path.matches(document)
    }
}
