//! XML writer over the `xml-rs` emitter, indenting by one space.
//!
//! Elements holding only text stay on one line; elements holding child
//! elements get their children on indented lines. Raw fragments are copied
//! without any escaping. Errors are kept until [`XmlWriter::finish`].

use thiserror::Error;
use xml::writer::{EmitterConfig, EventWriter, XmlEvent};

#[derive(Error, Debug)]
pub enum WriterError {
    #[error("cannot emit xml: {0}")]
    Emitter(#[from] xml::writer::Error),
    #[error("attribute {0} written outside a start tag")]
    AttributeOutsideStartTag(String),
    #[error("no element left to end")]
    NoOpenElement,
    #[error("written xml is not utf-8")]
    NotUtf8,
}

/// A start tag whose attributes may still grow.
struct StartTag {
    name: String,
    attributes: Vec<(String, String)>,
}

pub struct XmlWriter {
    events: EventWriter<Vec<u8>>,
    start_tag: Option<StartTag>,
    depth: usize,
    error: Option<WriterError>,
}

impl Default for XmlWriter {
    fn default() -> Self {
        let config = EmitterConfig::new()
            .perform_indent(true)
            .indent_string(" ")
            .write_document_declaration(false)
            .pad_self_closing(false);

        Self {
            events: EventWriter::new_with_config(vec![], config),
            start_tag: None,
            depth: 0,
            error: None,
        }
    }
}

impl XmlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_element(&mut self, name: &str) {
        self.flush_start_tag();
        self.start_tag = Some(StartTag {
            name: name.to_owned(),
            attributes: vec![],
        });
        self.depth += 1;
    }

    /// Adds an attribute to the element most recently started. `xmlns` and
    /// `xmlns:*` become namespace declarations.
    pub fn attribute(&mut self, name: &str, value: &str) {
        match &mut self.start_tag {
            Some(start_tag) => start_tag.attributes.push((name.to_owned(), value.to_owned())),
            None => self.fail(WriterError::AttributeOutsideStartTag(name.to_owned())),
        }
    }

    pub fn text(&mut self, text: &str) {
        self.flush_start_tag();
        self.emit(XmlEvent::characters(text));
    }

    pub fn write_raw(&mut self, raw: &str) {
        self.flush_start_tag();
        // closes the start tag and keeps the end tag on the same line
        self.emit(XmlEvent::characters(""));
        self.events.inner_mut().extend_from_slice(raw.as_bytes());
    }

    pub fn write_element(&mut self, name: &str, text: &str) {
        self.start_element(name);
        self.text(text);
        self.end_element();
    }

    pub fn end_element(&mut self) {
        if self.depth == 0 {
            self.fail(WriterError::NoOpenElement);
            return;
        }
        self.flush_start_tag();
        self.emit(XmlEvent::end_element());
        self.depth -= 1;
    }

    /// Closes any elements still open and returns the document.
    pub fn finish(mut self) -> Result<String, WriterError> {
        while self.depth > 0 {
            self.end_element();
        }
        if let Some(error) = self.error {
            return Err(error);
        }

        let mut xml = String::from_utf8(self.events.into_inner()).map_err(|_| WriterError::NotUtf8)?;
        xml.push('\n');
        Ok(xml)
    }

    fn flush_start_tag(&mut self) {
        let Some(start_tag) = self.start_tag.take() else {
            return;
        };

        let mut event = XmlEvent::start_element(start_tag.name.as_str());
        for (name, value) in &start_tag.attributes {
            event = if name == "xmlns" {
                event.default_ns(value.as_str())
            } else if let Some(prefix) = name.strip_prefix("xmlns:") {
                event.ns(prefix, value.as_str())
            } else {
                event.attr(name.as_str(), value)
            };
        }
        self.emit(event);
    }

    fn emit<'a, E: Into<XmlEvent<'a>>>(&mut self, event: E) {
        if let Err(error) = self.events.write(event) {
            self.fail(error.into());
        }
    }

    fn fail(&mut self, error: WriterError) {
        self.error.get_or_insert(error);
    }
}
