use std::io::BufRead;

use quick_xml::{events::BytesStart, events::Event, Reader};
use thiserror::Error;

use crate::dom::{Attribute, Document, DocumentBuilder};

use super::namespaces::NamespaceBinding;

/// Errors that can occur while materializing an element
#[derive(Error, Debug)]
pub enum MaterializeError {
    #[error("input ended before element `{element}' was closed")]
    Truncated { element: String },

    #[error("unable to parse element")]
    Xml(#[from] quick_xml::Error),
}

/// Turns the element at the current position of a reader into a standalone
/// [`Document`]
pub trait Materializer {
    /// Materializes the element whose start tag `start` has just been read
    /// from `reader`. Consumes all events up to and including the matching
    /// end tag. If `empty` is `true`, `start` was a self-closing tag and
    /// nothing else is read. The `inherited` namespace bindings are in scope
    /// at the element's position and are declared on the document element
    /// unless it redeclares them itself.
    fn materialize<R: BufRead>(
        &self,
        reader: &mut Reader<R>,
        start: &BytesStart,
        empty: bool,
        inherited: &[NamespaceBinding],
    ) -> Result<Document, MaterializeError>;
}

/// The default [`Materializer`]. Keeps elements, attributes, text, CDATA
/// (as text), and comments. Processing instructions are dropped.
#[derive(Default, Debug, Clone, Copy)]
pub struct DomMaterializer;

/// Decodes the name and attributes of a start tag
fn decode_start<B>(
    start: &BytesStart,
    reader: &Reader<B>,
) -> Result<(String, Vec<Attribute>), quick_xml::Error> {
    let decoder = reader.decoder();
    let name = decoder.decode(start.name().as_ref())?.into_owned();

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::InvalidAttr)?;
        let key = decoder.decode(attr.key.as_ref())?.into_owned();
        let value = attr.decode_and_unescape_value(reader)?.into_owned();
        attributes.push(Attribute::new(key, value));
    }

    Ok((name, attributes))
}

impl Materializer for DomMaterializer {
    fn materialize<R: BufRead>(
        &self,
        reader: &mut Reader<R>,
        start: &BytesStart,
        empty: bool,
        inherited: &[NamespaceBinding],
    ) -> Result<Document, MaterializeError> {
        let mut builder = DocumentBuilder::default();

        let (name, mut attributes) = decode_start(start, reader)?;
        for (prefix, uri) in inherited {
            let key = prefix.attribute_name();
            if !attributes.iter().any(|a| a.name == key) {
                attributes.push(Attribute::new(key, uri.as_str()));
            }
        }
        builder.start_element(name.clone(), attributes);

        if empty {
            builder.end_element();
            return Ok(builder.finish());
        }

        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(s) => {
                    let (name, attributes) = decode_start(&s, reader)?;
                    builder.start_element(name, attributes);
                }

                Event::Empty(s) => {
                    let (name, attributes) = decode_start(&s, reader)?;
                    builder.start_element(name, attributes);
                    builder.end_element();
                }

                Event::End(_) => {
                    builder.end_element();
                    if builder.depth() == 0 {
                        break;
                    }
                }

                Event::Text(t) => builder.text(&t.unescape()?),

                Event::CData(c) => builder.text(&reader.decoder().decode(&c)?),

                Event::Comment(c) => builder.comment(&reader.decoder().decode(&c)?),

                Event::Eof => return Err(MaterializeError::Truncated { element: name }),

                _ => {}
            }
            buf.clear();
        }

        Ok(builder.finish())
    }
}
