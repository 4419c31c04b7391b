use quick_xml::{events::Event, Reader};

use crate::{
    dom::Document,
    input::xml::{DomMaterializer, Materializer},
};

/// Materializes the first element of the given XML string
pub fn document(xml: &str) -> Document {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).unwrap() {
            Event::Start(s) => {
                let s = s.into_owned();
                return DomMaterializer
                    .materialize(&mut reader, &s, false, &[])
                    .unwrap();
            }
            Event::Empty(s) => {
                let s = s.into_owned();
                return DomMaterializer
                    .materialize(&mut reader, &s, true, &[])
                    .unwrap();
            }
            Event::Eof => panic!("no element found"),
            _ => {}
        }
        buf.clear();
    }
}
