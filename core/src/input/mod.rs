use std::io::BufRead;

use quick_xml::Reader;

pub mod gzip;
pub mod xml;

/// Creates the token stream the filter engine reads XML events from
pub trait ReaderFactory {
    /// Wraps the given (already buffered and decompressed) input into a
    /// new XML reader
    fn create_reader<R: BufRead>(&self, input: R) -> Reader<R>;
}

/// The default [`ReaderFactory`]. Reads UTF-8 input, checks that end tags
/// match their start tags, and keeps text and self-closing tags exactly as
/// they appear in the input.
#[derive(Default, Debug, Clone, Copy)]
pub struct Utf8ReaderFactory;

impl ReaderFactory for Utf8ReaderFactory {
    fn create_reader<R: BufRead>(&self, input: R) -> Reader<R> {
        let mut reader = Reader::from_reader(input);
        reader
            .check_end_names(true)
            .trim_text(false)
            .expand_empty_elements(false);
        reader
    }
}
