use quick_xml::{events::BytesStart, name::PrefixDeclaration, Reader};

/// An XML namespace prefix declaration
#[derive(PartialEq, Eq, Clone, Debug, Ord, PartialOrd)]
pub enum Prefix {
    Default,
    Named(String),
}

impl Prefix {
    /// Returns the name of the attribute that declares this prefix
    /// (`xmlns` or `xmlns:prefix`)
    pub fn attribute_name(&self) -> String {
        match self {
            Prefix::Default => "xmlns".to_string(),
            Prefix::Named(n) => format!("xmlns:{n}"),
        }
    }
}

/// A namespace binding: a prefix and the namespace URI it is bound to
pub type NamespaceBinding = (Prefix, String);

/// Extracts the namespace declarations from the given XML tag. The
/// declarations will be returned in lexicographical order.
pub fn namespaces_from_tag<B>(
    tag: &BytesStart,
    reader: &Reader<B>,
) -> Result<Vec<NamespaceBinding>, quick_xml::Error> {
    let decoder = reader.decoder();
    let mut namespaces = Vec::new();

    for attr in tag.attributes() {
        let attr = attr.map_err(quick_xml::Error::InvalidAttr)?;
        if let Some(binding) = attr.key.as_namespace_binding() {
            let prefix = match binding {
                PrefixDeclaration::Default => Prefix::Default,
                PrefixDeclaration::Named(b"") => Prefix::Default,
                PrefixDeclaration::Named(n) => Prefix::Named(decoder.decode(n)?.to_string()),
            };
            let value = attr.decode_and_unescape_value(reader)?;
            namespaces.push((prefix, value.to_string()));
        }
    }

    namespaces.sort_unstable();

    Ok(namespaces)
}

/// An element that has been opened but not closed yet
struct OpenElement {
    name: Vec<u8>,
    namespaces: Vec<NamespaceBinding>,
}

/// Keeps track of the elements enclosing the current position of a reader
/// and the namespace declarations they make
#[derive(Default)]
pub struct NamespaceScope {
    open: Vec<OpenElement>,
}

impl NamespaceScope {
    /// Records that the element with the given start tag has been opened
    pub fn push<B>(&mut self, tag: &BytesStart, reader: &Reader<B>) -> Result<(), quick_xml::Error> {
        self.open.push(OpenElement {
            name: tag.name().as_ref().to_vec(),
            namespaces: namespaces_from_tag(tag, reader)?,
        });
        Ok(())
    }

    /// Records that the innermost open element has been closed
    pub fn pop(&mut self) {
        self.open.pop();
    }

    /// Returns the number of open elements
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Returns the name of the innermost open element, if any
    pub fn innermost(&self) -> Option<String> {
        self.open
            .last()
            .map(|e| String::from_utf8_lossy(&e.name).into_owned())
    }

    /// Returns the namespace bindings in effect at the current position.
    /// Declarations of inner elements take precedence over outer ones. The
    /// result is sorted by prefix.
    pub fn bindings(&self) -> Vec<NamespaceBinding> {
        let mut result: Vec<NamespaceBinding> = Vec::new();
        for e in self.open.iter().rev() {
            for (prefix, uri) in &e.namespaces {
                if !result.iter().any(|(p, _)| p == prefix) {
                    result.push((prefix.clone(), uri.clone()));
                }
            }
        }
        result.sort_unstable();
        result
    }
}
