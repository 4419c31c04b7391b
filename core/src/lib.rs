pub mod dom;
pub mod filter;
pub mod input;
pub mod path;
pub mod predicate;
pub mod transform;

#[cfg(test)]
mod testing;

pub use filter::{ConfigError, FilterError, FilterSummary, StreamFilter, XmlStreamFilter};
