//! Body digest marks (IRmark).
//!
//! The envelope is packaged once with a placeholder token inside the mark
//! element. The Body is then cut out of the packaged text, the mark element
//! removed, the Body rebuilt as a standalone document carrying the root
//! element's namespace declarations, canonicalized and hashed with SHA-1.
//! The base64 digest finally replaces the placeholder inside the Body of
//! the packaged text.

use std::{collections::BTreeMap, ops::Range};

use base64::{Engine, prelude::BASE64_STANDARD};
use sha1::{Digest, Sha1};
use thiserror::Error;
use xml::{
    namespace::{NS_XML_PREFIX, NS_XMLNS_PREFIX},
    reader::{EventReader, XmlEvent},
};

use crate::{
    canon::{self, CanonicalizationError, CanonicalizationMode},
    writer::{WriterError, XmlWriter},
};

pub const DEFAULT_MARK_ELEMENT: &str = "IRmark";
pub const DEFAULT_PLACEHOLDER: &str = "IRmark+Token";

const BODY_OPEN: &str = "<Body>";
const BODY_CLOSE: &str = "</Body>";

#[derive(Error, Debug)]
pub enum DigestError {
    #[error("expected exactly one Body element, found {0}")]
    BodyBoundary(usize),
    #[error("expected exactly one digest placeholder in the body, found {0}")]
    PlaceholderCount(usize),
    #[error("digest placeholder is not the only content of a {0} element")]
    MarkElementNotFound(String),
    #[error("cannot read envelope root element")]
    NoRootElement,
    #[error("{0}")]
    Canonicalization(#[from] CanonicalizationError),
    #[error("cannot rebuild body: {0}")]
    Writer(#[from] WriterError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DigestMarker {
    element: String,
    placeholder: String,
    mode: CanonicalizationMode,
}

impl Default for DigestMarker {
    fn default() -> Self {
        Self {
            element: DEFAULT_MARK_ELEMENT.to_owned(),
            placeholder: DEFAULT_PLACEHOLDER.to_owned(),
            mode: CanonicalizationMode::default(),
        }
    }
}

impl DigestMarker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: CanonicalizationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_element<E: Into<String>, P: Into<String>>(mut self, element: E, placeholder: P) -> Self {
        self.element = element.into();
        self.placeholder = placeholder.into();
        self
    }

    pub fn element(&self) -> &str {
        &self.element
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn mode(&self) -> CanonicalizationMode {
        self.mode
    }

    /// Writes the mark element, holding the placeholder, into a body being
    /// built.
    pub fn write_placeholder(&self, writer: &mut XmlWriter) {
        writer.start_element(&self.element);
        writer.attribute("Type", "generic");
        writer.text(&self.placeholder);
        writer.end_element();
    }

    /// Replaces the placeholder in a packaged envelope with the digest of
    /// its body. On error the package is left as it was.
    pub fn mark(&self, package: &str) -> Result<String, DigestError> {
        let namespaces = root_namespaces(package)?;
        let span = body_span(package)?;
        let body = &package[span.clone()];
        let unmarked = self.remove_mark_element(body)?;
        let digest = self.digest(&unmarked, &namespaces)?;

        tracing::debug!(mark = %digest, "computed body digest");

        Ok(format!(
            "{}{}{}",
            &package[..span.start],
            body.replacen(self.placeholder.as_str(), &digest, 1),
            &package[span.end..]
        ))
    }

    /// Base64 SHA-1 of the canonical form of `<Body>` holding `body_content`
    /// with the given namespace declarations.
    pub fn digest(
        &self,
        body_content: &str,
        namespaces: &BTreeMap<String, String>,
    ) -> Result<String, DigestError> {
        let mut standalone = XmlWriter::new();
        standalone.start_element("Body");
        for (prefix, uri) in namespaces {
            if prefix.is_empty() {
                standalone.attribute("xmlns", uri);
            } else {
                standalone.attribute(&format!("xmlns:{prefix}"), uri);
            }
        }
        standalone.write_raw(body_content);
        standalone.end_element();
        let standalone = standalone.finish()?;

        let canonical = canon::canonicalize(&standalone, self.mode)?;
        tracing::trace!(%canonical, "canonical body");

        Ok(BASE64_STANDARD.encode(Sha1::digest(canonical.as_bytes())))
    }

    fn remove_mark_element(&self, body: &str) -> Result<String, DigestError> {
        let count = body.matches(self.placeholder.as_str()).count();
        if count != 1 {
            return Err(DigestError::PlaceholderCount(count));
        }

        let not_found = || DigestError::MarkElementNotFound(self.element.clone());

        let token_start = body.find(self.placeholder.as_str()).ok_or_else(not_found)?;
        let token_end = token_start + self.placeholder.len();

        let open_start = body[..token_start].rfind('<').ok_or_else(not_found)?;
        let open_tag = &body[open_start + 1..token_start];
        let open_tag = open_tag.strip_suffix('>').ok_or_else(not_found)?;
        let open_name = open_tag.split_whitespace().next().ok_or_else(not_found)?;

        let close_tag = body[token_end..].strip_prefix("</").ok_or_else(not_found)?;
        let close_len = close_tag.find('>').ok_or_else(not_found)?;
        let close_name = &close_tag[..close_len];
        let close_end = token_end + 2 + close_len + 1;

        let local_name = open_name.rsplit(':').next().unwrap_or(open_name);
        if local_name != self.element || close_name != open_name {
            return Err(not_found());
        }

        Ok(format!("{}{}", &body[..open_start], &body[close_end..]))
    }
}

/// Inner text of the single `<Body>...</Body>` element of a package.
pub fn extract_body(package: &str) -> Result<&str, DigestError> {
    Ok(&package[body_span(package)?])
}

fn body_span(package: &str) -> Result<Range<usize>, DigestError> {
    let mut found = vec![];
    let mut position = 0;

    while let Some(open) = package[position..].find(BODY_OPEN) {
        let content_start = position + open + BODY_OPEN.len();
        match package[content_start..].find(BODY_CLOSE) {
            Some(close) => {
                let content_end = content_start + close;
                found.push(content_start..content_end);
                position = content_end + BODY_CLOSE.len();
            }
            None => break,
        }
    }

    match found.as_slice() {
        [body] => Ok(body.clone()),
        _ => Err(DigestError::BodyBoundary(found.len())),
    }
}

/// Namespace declarations made on the package's root element, keyed by
/// prefix (empty for the default namespace).
pub fn root_namespaces(package: &str) -> Result<BTreeMap<String, String>, DigestError> {
    let reader = EventReader::new(package.as_bytes());

    for event in reader {
        match event.map_err(CanonicalizationError::from)? {
            XmlEvent::StartElement { namespace, .. } => {
                return Ok(namespace
                    .0
                    .into_iter()
                    .filter(|(prefix, uri)| {
                        prefix != NS_XML_PREFIX
                            && prefix != NS_XMLNS_PREFIX
                            && !(prefix.is_empty() && uri.is_empty())
                    })
                    .collect());
            }
            XmlEvent::EndDocument => break,
            _ => {}
        }
    }

    Err(DigestError::NoRootElement)
}
