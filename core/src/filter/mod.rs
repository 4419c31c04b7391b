use std::io::{BufRead, BufReader, BufWriter, Read, Write};

use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};
use tracing::{debug, instrument, trace};

use crate::{
    dom::Document,
    input::{
        gzip::AutoGunzip,
        xml::{DomMaterializer, Materializer, NamespaceScope},
        ReaderFactory, Utf8ReaderFactory,
    },
    predicate::Predicate,
    transform::Transformer,
};

mod error;

pub use error::{ConfigError, FilterError};

/// Counts how many elements a filter run has seen
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSummary {
    /// Number of elements whose local name matched
    pub elements_matched: usize,

    /// Number of matched elements that passed the predicate and have been
    /// handed to the transformer
    pub elements_passed: usize,
}

/// Streams an XML document from an input to an output
pub trait StreamFilter {
    /// Reads the whole `input` and writes everything the filter produces to
    /// `output`. The input and the output are consumed and closed before
    /// this method returns, no matter whether it succeeds or not. When it
    /// succeeds, all output has been flushed.
    fn filter<R: Read, W: Write>(&self, input: R, output: W) -> Result<FilterSummary, FilterError>;
}

/// A [`StreamFilter`] that materializes every element with a given local
/// name, tests it with a [`Predicate`] and, if the predicate accepts it,
/// hands it to a [`Transformer`]. Text and markup outside matching elements
/// produce no output.
///
/// Elements with the same local name nested inside a matching element are
/// part of the outer element's document and are not matched on their own.
pub struct XmlStreamFilter<P, T, F = Utf8ReaderFactory, M = DomMaterializer> {
    element_local_name: String,
    predicate: P,
    transformer: T,
    reader_factory: F,
    materializer: M,
}

impl<P, T> XmlStreamFilter<P, T>
where
    P: Predicate,
    T: Transformer,
{
    /// Creates a filter for elements with the given local name that reads
    /// UTF-8 input and materializes elements into [`Document`]s
    pub fn new(
        element_local_name: impl Into<String>,
        predicate: P,
        transformer: T,
    ) -> Result<Self, ConfigError> {
        Self::with_components(
            element_local_name,
            predicate,
            transformer,
            Utf8ReaderFactory,
            DomMaterializer,
        )
    }
}

impl<P, T, F, M> XmlStreamFilter<P, T, F, M>
where
    P: Predicate,
    T: Transformer,
    F: ReaderFactory,
    M: Materializer,
{
    pub fn with_components(
        element_local_name: impl Into<String>,
        predicate: P,
        transformer: T,
        reader_factory: F,
        materializer: M,
    ) -> Result<Self, ConfigError> {
        let element_local_name = element_local_name.into();
        if element_local_name.is_empty() {
            return Err(ConfigError::EmptyElementName);
        }

        Ok(Self {
            element_local_name,
            predicate,
            transformer,
            reader_factory,
            materializer,
        })
    }

    fn is_target(&self, start: &BytesStart) -> bool {
        start.local_name().as_ref() == self.element_local_name.as_bytes()
    }

    /// Reads events until the end of the input and processes every
    /// matching element
    fn scan<R: BufRead>(
        &self,
        reader: &mut Reader<R>,
        sink: &mut dyn Write,
    ) -> Result<FilterSummary, FilterError> {
        let mut summary = FilterSummary::default();
        let mut scope = NamespaceScope::default();
        let mut root_closed = false;
        let mut buf = Vec::new();

        loop {
            let event = reader.read_event_into(&mut buf)?;
            let at_top = scope.depth() == 0;
            match event {
                Event::Start(_) | Event::Empty(_) if at_top && root_closed => {
                    return Err(FilterError::Malformed("more than one root element"));
                }

                Event::Text(t) if at_top && !is_whitespace(&t) => {
                    return Err(FilterError::Malformed("text outside the root element"));
                }

                Event::CData(_) if at_top => {
                    return Err(FilterError::Malformed("CDATA outside the root element"));
                }

                Event::Start(s) if self.is_target(&s) => {
                    let start = s.into_owned();
                    let document =
                        self.materializer
                            .materialize(reader, &start, false, &scope.bindings())?;
                    self.process(&document, sink, &mut summary)?;
                    root_closed |= at_top;
                }

                Event::Empty(s) if self.is_target(&s) => {
                    let start = s.into_owned();
                    let document =
                        self.materializer
                            .materialize(reader, &start, true, &scope.bindings())?;
                    self.process(&document, sink, &mut summary)?;
                    root_closed |= at_top;
                }

                Event::Start(s) => scope.push(&s, reader)?,

                Event::Empty(_) => root_closed |= at_top,

                Event::End(_) => {
                    scope.pop();
                    root_closed |= scope.depth() == 0;
                }

                Event::Eof => break,

                _ => {}
            }
            buf.clear();
        }

        if let Some(element) = scope.innermost() {
            return Err(FilterError::Truncated { element });
        }

        Ok(summary)
    }

    fn process(
        &self,
        document: &Document,
        sink: &mut dyn Write,
        summary: &mut FilterSummary,
    ) -> Result<(), FilterError> {
        summary.elements_matched += 1;
        if !self.predicate.test(document) {
            trace!(element = summary.elements_matched, "element rejected");
            return Ok(());
        }

        summary.elements_passed += 1;
        trace!(element = summary.elements_matched, "element accepted");
        self.transformer
            .apply(document, sink)
            .map_err(FilterError::Transform)
    }
}

/// Returns `true` if the text consists of XML whitespace only
fn is_whitespace(text: &[u8]) -> bool {
    text.iter()
        .all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
}

impl<P, T, F, M> StreamFilter for XmlStreamFilter<P, T, F, M>
where
    P: Predicate,
    T: Transformer,
    F: ReaderFactory,
    M: Materializer,
{
    #[instrument(skip_all, fields(element = %self.element_local_name))]
    fn filter<R: Read, W: Write>(&self, input: R, output: W) -> Result<FilterSummary, FilterError> {
        let mut output = BufWriter::new(output);
        let input = BufReader::new(AutoGunzip::new(BufReader::new(input))?);
        let mut reader = self.reader_factory.create_reader(input);

        let result = self.scan(&mut reader, &mut output);
        drop(reader);

        match result {
            Ok(summary) => {
                output.flush()?;
                debug!(
                    matched = summary.elements_matched,
                    passed = summary.elements_passed,
                    "finished filtering"
                );
                Ok(summary)
            }

            Err(err) => {
                if let Err(flush_err) = output.flush() {
                    debug!(error = %flush_err, "unable to flush output after failure");
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::Cell,
        io::{self, BufRead, Read, Write},
    };

    use anyhow::{bail, Result};
    use assertor::{assert_that, EqualityAssertion};
    use flate2::{write::GzEncoder, Compression};
    use pretty_assertions::assert_eq;
    use quick_xml::{events::BytesStart, Reader};

    use crate::{
        dom::Document,
        input::{
            xml::{DomMaterializer, MaterializeError, Materializer, NamespaceBinding},
            Utf8ReaderFactory,
        },
        predicate::{AcceptAll, PathPredicate},
        transform::{CopyTransformer, PathTransformer, Transformer},
    };

    use super::{ConfigError, FilterError, FilterSummary, StreamFilter, XmlStreamFilter};

    const BOOKS: &str = include_str!("../../testdata/books.xml");

    fn write_title(document: &Document, sink: &mut dyn Write) -> Result<()> {
        let title = document
            .descendants(document.root())
            .find(|&n| document.local_name(n) == Some("title"))
            .map(|n| document.string_value(n))
            .unwrap_or_default();
        writeln!(sink, "{title}")?;
        Ok(())
    }

    fn fail(_document: &Document, sink: &mut dyn Write) -> Result<()> {
        sink.write_all(b"partial")?;
        bail!("transformer failed")
    }

    /// Counts how often the wrapped transformer is invoked
    struct Counting<T> {
        inner: T,
        calls: Cell<usize>,
    }

    impl<T> Counting<T> {
        fn new(inner: T) -> Self {
            Self {
                inner,
                calls: Cell::new(0),
            }
        }
    }

    impl<T: Transformer> Transformer for Counting<T> {
        fn apply(&self, document: &Document, sink: &mut dyn Write) -> Result<()> {
            self.calls.set(self.calls.get() + 1);
            self.inner.apply(document, sink)
        }
    }

    fn run<S: StreamFilter>(filter: &S, xml: &[u8]) -> (Result<FilterSummary, FilterError>, String) {
        let mut out = Vec::new();
        let r = filter.filter(xml, &mut out);
        (r, String::from_utf8(out).unwrap())
    }

    #[test]
    fn empty_element_name() {
        let r = XmlStreamFilter::new("", AcceptAll, CopyTransformer);
        assert_eq!(r.err(), Some(ConfigError::EmptyElementName));
    }

    #[test]
    fn no_matching_elements() {
        let filter = XmlStreamFilter::new("book", AcceptAll, Counting::new(CopyTransformer)).unwrap();
        let (r, out) = run(&filter, b"<library><magazine>text</magazine></library>");
        assert_that!(r.unwrap()).is_equal_to(FilterSummary::default());
        assert_eq!(out, "");
        assert_that!(filter.transformer.calls.get()).is_equal_to(0);
    }

    #[test]
    fn outputs_in_document_order() {
        let filter = XmlStreamFilter::new("book", AcceptAll, write_title).unwrap();
        let (r, out) = run(&filter, BOOKS.as_bytes());
        assert_that!(r.unwrap()).is_equal_to(FilterSummary {
            elements_matched: 4,
            elements_passed: 4,
        });
        assert_eq!(
            out,
            "Everyday Italian\nHarry Potter\nXQuery Kick Start\nLearning XML\n"
        );
    }

    #[test]
    fn predicate_selects_elements() {
        let predicate = PathPredicate::new("//book/tags/tag[text() = 'magician']").unwrap();
        let filter = XmlStreamFilter::new("book", predicate, write_title).unwrap();
        let (r, out) = run(&filter, BOOKS.as_bytes());
        assert_that!(r.unwrap()).is_equal_to(FilterSummary {
            elements_matched: 4,
            elements_passed: 1,
        });
        assert_eq!(out, "Harry Potter\n");
    }

    #[test]
    fn predicate_rejects_all() {
        let predicate = PathPredicate::new("//book/tags/tag[text() = 'astronomy']").unwrap();
        let filter = XmlStreamFilter::new("book", predicate, Counting::new(write_title)).unwrap();
        let (r, out) = run(&filter, BOOKS.as_bytes());
        assert_that!(r.unwrap().elements_passed).is_equal_to(0);
        assert_eq!(out, "");
        assert_that!(filter.transformer.calls.get()).is_equal_to(0);
    }

    #[test]
    fn path_transformer_on_single_book() {
        let xml = concat!(
            r#"<bookstore><book category="COOKING"><title lang="en">Everyday Italian</title>"#,
            r#"<author>Giada De Laurentiis</author><year>2005</year><price>30.00</price>"#,
            r#"</book></bookstore>"#,
        );
        let transformer = PathTransformer::new("//book/title/text()").unwrap();
        let filter = XmlStreamFilter::new("book", AcceptAll, transformer).unwrap();
        let (r, out) = run(&filter, xml.as_bytes());
        r.unwrap();
        assert_eq!(out, "Everyday Italian\n");
    }

    #[test]
    fn matches_local_name_regardless_of_prefix() {
        let xml = r#"<r xmlns:b="urn:b"><b:book><title>A</title></b:book><book><title>B</title></book></r>"#;
        let filter = XmlStreamFilter::new("book", AcceptAll, write_title).unwrap();
        let (r, out) = run(&filter, xml.as_bytes());
        r.unwrap();
        assert_eq!(out, "A\nB\n");
    }

    #[test]
    fn nested_elements_are_not_matched_twice() {
        let xml = "<r><a><a>inner</a><b/></a><a>second</a></r>";
        let filter = XmlStreamFilter::new("a", AcceptAll, Counting::new(CopyTransformer)).unwrap();
        let (r, out) = run(&filter, xml.as_bytes());
        assert_that!(r.unwrap().elements_matched).is_equal_to(2);
        assert_eq!(out, "<a><a>inner</a><b/></a>\n<a>second</a>\n");
        assert_that!(filter.transformer.calls.get()).is_equal_to(2);
    }

    #[test]
    fn descendants_are_not_invoked_separately() {
        let seen = Cell::new(0);
        let predicate = |_: &Document| {
            seen.set(seen.get() + 1);
            true
        };
        let filter = XmlStreamFilter::new("book", predicate, CopyTransformer).unwrap();
        let (r, _) = run(&filter, BOOKS.as_bytes());
        r.unwrap();
        assert_that!(seen.get()).is_equal_to(4);
    }

    #[test]
    fn self_closing_elements() {
        let xml = r#"<r><item id="1"/><item id="2"></item></r>"#;
        let filter = XmlStreamFilter::new("item", AcceptAll, CopyTransformer).unwrap();
        let (r, out) = run(&filter, xml.as_bytes());
        r.unwrap();
        assert_eq!(out, "<item id=\"1\"/>\n<item id=\"2\"/>\n");
    }

    #[test]
    fn inherits_namespace_declarations() {
        let xml = concat!(
            r#"<r xmlns="urn:default" xmlns:g="urn:g"><g:feature xmlns:x="urn:x">"#,
            r#"<g:name>n</g:name></g:feature></r>"#,
        );
        let filter = XmlStreamFilter::new("feature", AcceptAll, CopyTransformer).unwrap();
        let (r, out) = run(&filter, xml.as_bytes());
        r.unwrap();
        assert_eq!(
            out,
            concat!(
                r#"<g:feature xmlns:x="urn:x" xmlns="urn:default" xmlns:g="urn:g">"#,
                "<g:name>n</g:name></g:feature>\n",
            )
        );
    }

    #[test]
    fn gzip_input() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(BOOKS.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        let filter = XmlStreamFilter::new("book", AcceptAll, CopyTransformer).unwrap();
        let (plain_result, plain) = run(&filter, BOOKS.as_bytes());
        let (gzip_result, gzip) = run(&filter, &compressed);
        assert_eq!(plain_result.unwrap(), gzip_result.unwrap());
        assert_eq!(plain, gzip);
    }

    #[test]
    fn filter_is_reusable() {
        let filter = XmlStreamFilter::new("book", AcceptAll, write_title).unwrap();
        let (_, first) = run(&filter, BOOKS.as_bytes());
        let (_, second) = run(&filter, BOOKS.as_bytes());
        assert_eq!(first, second);
    }

    #[test]
    fn truncated_input() {
        let filter = XmlStreamFilter::new("book", AcceptAll, write_title).unwrap();

        let (r, out) = run(&filter, b"<r><book><title>A</title></book><other>");
        let err = r.unwrap_err();
        assert!(err.is_parse_error());
        assert!(matches!(err, FilterError::Truncated { ref element } if element == "other"));
        assert_eq!(out, "A\n");

        let (r, _) = run(&filter, b"<r><book><title>A</title>");
        let err = r.unwrap_err();
        assert!(matches!(err, FilterError::Truncated { ref element } if element == "book"));
    }

    #[test]
    fn malformed_input() {
        let filter = XmlStreamFilter::new("book", AcceptAll, write_title).unwrap();

        let (r, _) = run(&filter, b"<r><book><title>A</book></r>");
        let err = r.unwrap_err();
        assert!(matches!(err, FilterError::Parse(_)));

        let (r, out) = run(&filter, b"<r><book><title>A</title></book></x>");
        assert!(r.unwrap_err().is_parse_error());
        assert_eq!(out, "A\n");
    }

    #[test]
    fn transformer_error_is_propagated() {
        let filter = XmlStreamFilter::new("book", AcceptAll, fail).unwrap();
        let (r, out) = run(&filter, BOOKS.as_bytes());
        match r {
            Err(FilterError::Transform(e)) => assert_eq!(e.to_string(), "transformer failed"),
            r => panic!("expected transformer error, got {r:?}"),
        }
        assert!(!FilterError::Transform(anyhow::anyhow!("x")).is_parse_error());

        // output written before the failure is flushed
        assert_eq!(out, "partial");
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn output_error() {
        let filter = XmlStreamFilter::new("book", AcceptAll, write_title).unwrap();
        let r = filter.filter(BOOKS.as_bytes(), FailingWriter);
        match r {
            Err(FilterError::Io(e)) => assert_that!(e.kind()).is_equal_to(io::ErrorKind::BrokenPipe),
            r => panic!("expected I/O error, got {r:?}"),
        }
    }

    /// Records written data and how often it has been flushed
    #[derive(Default)]
    struct TrackingWriter {
        data: Vec<u8>,
        flushes: usize,
        fail_flush: bool,
    }

    impl Write for TrackingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushes += 1;
            if self.fail_flush {
                return Err(io::Error::new(io::ErrorKind::Other, "flush failed"));
            }
            Ok(())
        }
    }

    #[test]
    fn output_is_flushed_on_success() {
        let filter = XmlStreamFilter::new("a", AcceptAll, CopyTransformer).unwrap();
        let mut out = TrackingWriter::default();
        filter.filter(&b"<r><a/></r>"[..], &mut out).unwrap();
        assert_eq!(out.data, b"<a/>\n");
        assert_that!(out.flushes).is_equal_to(1);
    }

    #[test]
    fn failing_flush_is_an_error() {
        let filter = XmlStreamFilter::new("a", AcceptAll, CopyTransformer).unwrap();
        let mut out = TrackingWriter {
            fail_flush: true,
            ..Default::default()
        };
        match filter.filter(&b"<r><a/></r>"[..], &mut out) {
            Err(FilterError::Io(e)) => assert_eq!(e.to_string(), "flush failed"),
            r => panic!("expected I/O error, got {r:?}"),
        }
        assert_eq!(out.data, b"<a/>\n");
    }

    #[test]
    fn output_is_flushed_on_failure() {
        let filter = XmlStreamFilter::new("a", AcceptAll, CopyTransformer).unwrap();
        let mut out = TrackingWriter::default();
        let r = filter.filter(&b"<r><a/><b>"[..], &mut out);
        assert!(r.unwrap_err().is_parse_error());
        assert_eq!(out.data, b"<a/>\n");
        assert_that!(out.flushes).is_equal_to(1);
    }

    #[test]
    fn more_than_one_root_element() {
        let filter = XmlStreamFilter::new("a", AcceptAll, CopyTransformer).unwrap();
        for xml in [
            "<a>1</a><a>2</a>",
            "<r><a>1</a></r><a>2</a>",
            "<r/><r/>",
            "<a/>\n<r></r>",
        ] {
            let (r, _) = run(&filter, xml.as_bytes());
            match r {
                Err(e @ FilterError::Malformed(_)) => assert!(e.is_parse_error()),
                r => panic!("expected {xml} to be rejected, got {r:?}"),
            }
        }
    }

    #[test]
    fn text_outside_root_element() {
        let filter = XmlStreamFilter::new("a", AcceptAll, CopyTransformer).unwrap();
        for xml in [
            "junk<a>1</a>",
            "<r><a>1</a></r>junk",
            "<![CDATA[x]]><r/>",
        ] {
            let (r, _) = run(&filter, xml.as_bytes());
            assert!(
                matches!(r, Err(FilterError::Malformed(_))),
                "expected {xml} to be rejected, got {r:?}"
            );
        }

        let (r, out) = run(&filter, b"\n <r>\n<a>1</a>\n</r>\n\t<!-- end -->\n");
        r.unwrap();
        assert_eq!(out, "<a>1</a>\n");
    }

    #[test]
    fn deeply_nested_match() {
        let depth = 100_000;
        let xml = format!(
            "<r><a>{}{}</a></r>",
            "<b>".repeat(depth),
            "</b>".repeat(depth)
        );
        let filter = XmlStreamFilter::new("a", AcceptAll, CopyTransformer).unwrap();
        let (r, out) = run(&filter, xml.as_bytes());
        assert_that!(r.unwrap().elements_matched).is_equal_to(1);
        assert!(out.starts_with("<a><b><b>"));
        assert!(out.ends_with("<b/></b></b></a>\n"));
        assert_that!(out.matches("<b>").count()).is_equal_to(depth - 1);
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "gone"))
        }
    }

    #[test]
    fn input_error() {
        let filter = XmlStreamFilter::new("book", AcceptAll, write_title).unwrap();
        let mut out = Vec::new();
        let r = filter.filter(FailingReader, &mut out);
        match r {
            Err(FilterError::Io(e)) => {
                assert_that!(e.kind()).is_equal_to(io::ErrorKind::ConnectionReset)
            }
            r => panic!("expected I/O error, got {r:?}"),
        }
    }

    /// Materializes elements and then modifies the resulting documents
    struct Scribbler;

    impl Materializer for Scribbler {
        fn materialize<R: BufRead>(
            &self,
            reader: &mut Reader<R>,
            start: &BytesStart,
            empty: bool,
            inherited: &[NamespaceBinding],
        ) -> Result<Document, MaterializeError> {
            let mut document = DomMaterializer.materialize(reader, start, empty, inherited)?;
            let root = document.document_element();
            document.set_attribute(root, "seen", "yes");
            for n in document.descendants(root).collect::<Vec<_>>() {
                if document.text(n).is_some() {
                    document.set_text(n, "changed");
                }
            }
            Ok(document)
        }
    }

    #[test]
    fn documents_are_independent_of_the_input() {
        let xml = "<r><a>1</a><b>untouched</b><a>2</a></r>";
        let filter = XmlStreamFilter::with_components(
            "a",
            AcceptAll,
            CopyTransformer,
            Utf8ReaderFactory,
            Scribbler,
        )
        .unwrap();
        let (r, out) = run(&filter, xml.as_bytes());
        assert_that!(r.unwrap().elements_matched).is_equal_to(2);
        assert_eq!(
            out,
            "<a seen=\"yes\">changed</a>\n<a seen=\"yes\">changed</a>\n"
        );
    }
}
