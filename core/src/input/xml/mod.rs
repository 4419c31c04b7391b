pub mod materializer;
pub mod namespaces;

pub use materializer::{DomMaterializer, MaterializeError, Materializer};
pub use namespaces::{NamespaceBinding, NamespaceScope, Prefix};
