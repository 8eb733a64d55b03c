//! XML canonicalization (C14N 1.0, comments omitted) of a whole document.
//!
//! Both the inclusive and the exclusive (no inclusive-prefix list) variants
//! are supported. Only what lies inside the document element is rendered.
//!
//! The input goes through line-end normalisation (XML 1.0 §2.11) and
//! attribute-value normalisation (§3.3.3) first, since the parser leaves
//! both to its caller.

use std::collections::BTreeMap;

use thiserror::Error;
use xml::{
    attribute::OwnedAttribute,
    name::OwnedName,
    namespace::{NS_XML_PREFIX, NS_XMLNS_PREFIX, Namespace},
    reader::{EventReader, ParserConfig, XmlEvent},
};

#[derive(Error, Debug)]
pub enum CanonicalizationError {
    #[error("cannot parse xml: {0}")]
    CannotParse(#[from] xml::reader::Error),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CanonicalizationMode {
    Inclusive,
    #[default]
    Exclusive,
}

type Rendered = BTreeMap<String, String>;

pub fn canonicalize(
    xml: &str,
    mode: CanonicalizationMode,
) -> Result<String, CanonicalizationError> {
    let config = ParserConfig::new()
        .trim_whitespace(false)
        .whitespace_to_characters(true)
        .cdata_to_characters(true)
        .ignore_comments(true)
        .coalesce_characters(true);
    let normalized = normalize(xml);
    let reader = EventReader::new_with_config(normalized.as_bytes(), config);

    let mut output = String::with_capacity(xml.len());
    let mut rendered: Vec<Rendered> = vec![];

    for event in reader {
        match event? {
            XmlEvent::StartElement {
                name,
                attributes,
                namespace,
            } => {
                let parent = rendered.last().cloned().unwrap_or_default();
                let declarations = namespace_declarations(&name, &attributes, &namespace, &parent, mode);

                output.push('<');
                output.push_str(&qualified(&name));

                let mut in_scope = parent;
                for (prefix, uri) in &declarations {
                    if prefix.is_empty() {
                        output.push_str(" xmlns=\"");
                    } else {
                        output.push_str(" xmlns:");
                        output.push_str(prefix);
                        output.push_str("=\"");
                    }
                    output.push_str(&escape_attribute(uri));
                    output.push('"');
                    in_scope.insert(prefix.clone(), uri.clone());
                }

                let mut attributes = attributes;
                attributes.sort_by(|a, b| {
                    let a_key = (a.name.namespace.as_deref().unwrap_or(""), &a.name.local_name);
                    let b_key = (b.name.namespace.as_deref().unwrap_or(""), &b.name.local_name);
                    a_key.cmp(&b_key)
                });
                for attribute in &attributes {
                    output.push(' ');
                    output.push_str(&qualified(&attribute.name));
                    output.push_str("=\"");
                    output.push_str(&escape_attribute(&attribute.value));
                    output.push('"');
                }

                output.push('>');
                rendered.push(in_scope);
            }
            XmlEvent::EndElement { name } => {
                output.push_str("</");
                output.push_str(&qualified(&name));
                output.push('>');
                rendered.pop();
            }
            XmlEvent::Characters(text) | XmlEvent::Whitespace(text) if !rendered.is_empty() => {
                output.push_str(&escape_text(&text));
            }
            XmlEvent::ProcessingInstruction { name, data } if !rendered.is_empty() => {
                output.push_str("<?");
                output.push_str(&name);
                if let Some(data) = data {
                    output.push(' ');
                    output.push_str(&data);
                }
                output.push_str("?>");
            }
            _ => {}
        }
    }

    Ok(output)
}

/// Markup spans copied through normalisation untouched.
const OPAQUE: [(&str, &str); 4] = [("<!--", "-->"), ("<![CDATA[", "]]>"), ("<?", "?>"), ("<!", ">")];

enum Markup {
    Content,
    Tag,
    Value(char),
}

/// Line ends become `\n` everywhere, and literal tabs and newlines inside
/// attribute values become spaces. Character references are left alone.
fn normalize(xml: &str) -> String {
    let xml = xml.replace("\r\n", "\n").replace('\r', "\n");
    let mut output = String::with_capacity(xml.len());
    let mut state = Markup::Content;
    let mut rest = xml.as_str();

    while let Some(c) = rest.chars().next() {
        match state {
            Markup::Content => {
                if let Some((open, close)) = OPAQUE.iter().find(|(open, _)| rest.starts_with(open)) {
                    let end = rest[open.len()..]
                        .find(close)
                        .map_or(rest.len(), |at| open.len() + at + close.len());
                    output.push_str(&rest[..end]);
                    rest = &rest[end..];
                    continue;
                }
                if c == '<' {
                    state = Markup::Tag;
                }
            }
            Markup::Tag => match c {
                '"' | '\'' => state = Markup::Value(c),
                '>' => state = Markup::Content,
                _ => {}
            },
            Markup::Value(quote) => {
                if c == quote {
                    state = Markup::Tag;
                } else if c == '\t' || c == '\n' {
                    output.push(' ');
                    rest = &rest[1..];
                    continue;
                }
            }
        }
        output.push(c);
        rest = &rest[c.len_utf8()..];
    }

    output
}

/// Namespace declarations to render on an element, ordered by prefix with
/// the default namespace first.
fn namespace_declarations(
    name: &OwnedName,
    attributes: &[OwnedAttribute],
    namespace: &Namespace,
    parent: &Rendered,
    mode: CanonicalizationMode,
) -> Vec<(String, String)> {
    let candidates: BTreeMap<String, String> = match mode {
        CanonicalizationMode::Inclusive => namespace
            .0
            .iter()
            .filter(|(prefix, _)| !is_reserved(prefix))
            .map(|(prefix, uri)| (prefix.clone(), uri.clone()))
            .collect(),
        CanonicalizationMode::Exclusive => {
            let element_prefix = name.prefix.clone().unwrap_or_default();
            std::iter::once(element_prefix)
                .chain(attributes.iter().filter_map(|a| a.name.prefix.clone()))
                .filter(|prefix| !is_reserved(prefix))
                .map(|prefix| {
                    let uri = namespace.get(&prefix).unwrap_or("").to_owned();
                    (prefix, uri)
                })
                .collect()
        }
    };

    candidates
        .into_iter()
        .filter(|(prefix, uri)| {
            let inherited = parent.get(prefix).map(String::as_str).unwrap_or("");
            if prefix.is_empty() && uri.is_empty() {
                !inherited.is_empty()
            } else {
                parent.get(prefix) != Some(uri)
            }
        })
        .collect()
}

fn is_reserved(prefix: &str) -> bool {
    prefix == NS_XML_PREFIX || prefix == NS_XMLNS_PREFIX
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\r' => escaped.push_str("&#xD;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '"' => escaped.push_str("&quot;"),
            '\t' => escaped.push_str("&#x9;"),
            '\n' => escaped.push_str("&#xA;"),
            '\r' => escaped.push_str("&#xD;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn qualified(name: &OwnedName) -> String {
    match &name.prefix {
        Some(prefix) => format!("{}:{}", prefix, name.local_name),
        None => name.local_name.clone(),
    }
}
