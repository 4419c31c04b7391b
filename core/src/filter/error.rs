use std::{io, sync::Arc};

use thiserror::Error;

use crate::input::xml::MaterializeError;

/// Errors that can occur when a filter is configured
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("the local name of the elements to filter must not be empty")]
    EmptyElementName,
}

/// Errors that can occur while filtering a document
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("unable to parse input")]
    Parse(#[source] quick_xml::Error),

    #[error("input ended before element `{element}' was closed")]
    Truncated { element: String },

    #[error("input is not well-formed: {0}")]
    Malformed(&'static str),

    #[error("I/O error")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Transform(anyhow::Error),
}

impl FilterError {
    /// Returns `true` if the input was not well-formed XML
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            FilterError::Parse(_) | FilterError::Truncated { .. } | FilterError::Malformed(_)
        )
    }
}

impl From<quick_xml::Error> for FilterError {
    fn from(err: quick_xml::Error) -> Self {
        match err {
            quick_xml::Error::Io(e) => FilterError::Io(
                Arc::try_unwrap(e).unwrap_or_else(|e| io::Error::new(e.kind(), e)),
            ),
            e => FilterError::Parse(e),
        }
    }
}

impl From<MaterializeError> for FilterError {
    fn from(err: MaterializeError) -> Self {
        match err {
            MaterializeError::Truncated { element } => FilterError::Truncated { element },
            MaterializeError::Xml(e) => e.into(),
        }
    }
}
