use std::io::Write;

use anyhow::Result;

use crate::{
    dom::Document,
    path::{PathError, PathExpression},
};

/// Writes the output for a materialized element that passed the predicate.
/// Implementations may write any number of bytes but must neither flush the
/// sink nor keep references to the document or the sink.
pub trait Transformer {
    fn apply(&self, document: &Document, sink: &mut dyn Write) -> Result<()>;
}

impl<F> Transformer for F
where
    F: Fn(&Document, &mut dyn Write) -> Result<()>,
{
    fn apply(&self, document: &Document, sink: &mut dyn Write) -> Result<()> {
        self(document, sink)
    }
}

/// Writes the string value of every node a path expression selects, each
/// followed by a newline
#[derive(Debug, Clone)]
pub struct PathTransformer {
    path: PathExpression,
}

impl PathTransformer {
    /// Compiles the given path expression. Fails if the expression is
    /// invalid.
    pub fn new(expression: &str) -> Result<Self, PathError> {
        Ok(Self {
            path: PathExpression::compile(expression)?,
        })
    }
}

impl From<PathExpression> for PathTransformer {
    fn from(path: PathExpression) -> Self {
        Self { path }
    }
}

impl Transformer for PathTransformer {
    fn apply(&self, document: &Document, sink: &mut dyn Write) -> Result<()> {
        for item in self.path.select(document) {
            sink.write_all(item.string_value(document).as_bytes())?;
            sink.write_all(b"\n")?;
        }
        Ok(())
    }
}

/// Writes the materialized element back as XML followed by a newline
#[derive(Default, Debug, Clone, Copy)]
pub struct CopyTransformer;

impl Transformer for CopyTransformer {
    fn apply(&self, document: &Document, sink: &mut dyn Write) -> Result<()> {
        document.write_to(document.document_element(), &mut *sink)?;
        sink.write_all(b"\n")?;
        Ok(())
    }
}
