use std::io::Write;

use quick_xml::{
    events::{BytesEnd, BytesStart, BytesText, Event},
    Writer,
};

use super::{Document, NodeId, NodeKind};

impl Document {
    /// Serializes the subtree rooted at `id` as XML into the given writer.
    /// Elements without children are written as self-closing tags.
    pub fn write_to<W: Write>(&self, id: NodeId, writer: W) -> Result<(), quick_xml::Error> {
        let mut writer = Writer::new(writer);
        self.write_node(id, &mut writer)
    }

    /// Serializes the subtree rooted at `id` into a string
    pub fn to_xml_string(&self, id: NodeId) -> Result<String, quick_xml::Error> {
        let mut buf = Vec::new();
        self.write_to(id, &mut buf)?;
        String::from_utf8(buf).map_err(|e| quick_xml::Error::NonDecodable(Some(e.utf8_error())))
    }

    fn write_node<W: Write>(
        &self,
        id: NodeId,
        writer: &mut Writer<W>,
    ) -> Result<(), quick_xml::Error> {
        // (node, whether its children have already been written)
        let mut stack = vec![(id, false)];

        while let Some((id, entered)) = stack.pop() {
            match self.node(id).kind() {
                NodeKind::Document => {
                    stack.extend(self.children(id).iter().rev().map(|&c| (c, false)));
                }

                NodeKind::Element { name, .. } if entered => {
                    writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
                }

                NodeKind::Element { name, attributes } => {
                    let mut start = BytesStart::new(name.as_str());
                    for a in attributes {
                        start.push_attribute((a.name.as_str(), a.value.as_str()));
                    }

                    let children = self.children(id);
                    if children.is_empty() {
                        writer.write_event(Event::Empty(start))?;
                    } else {
                        writer.write_event(Event::Start(start))?;
                        stack.push((id, true));
                        stack.extend(children.iter().rev().map(|&c| (c, false)));
                    }
                }

                NodeKind::Text(t) => writer.write_event(Event::Text(BytesText::new(t)))?,

                NodeKind::Comment(c) => {
                    writer.write_event(Event::Comment(BytesText::from_escaped(c.as_str())))?
                }
            }
        }

        Ok(())
    }
}
