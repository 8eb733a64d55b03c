//! Parsed gateway responses.

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use xmltree::{Element, XMLNode};

use crate::message::{Qualifier, TransactionId};

const ROOT_ELEMENT: &str = "GovTalkMessage";

#[derive(Error, Debug)]
pub enum ResponseParseError {
    #[error("response is not well-formed xml: {0}")]
    Malformed(#[from] xmltree::ParseError),
    #[error("response root element is {0}, not GovTalkMessage")]
    NotAnEnvelope(String),
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Fatal,
    Recoverable,
    Business,
    Warning,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Fatal,
        Severity::Recoverable,
        Severity::Business,
        Severity::Warning,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Fatal => "fatal",
            Severity::Recoverable => "recoverable",
            Severity::Business => "business",
            Severity::Warning => "warning",
        }
    }
}

impl FromStr for Severity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|severity| severity.as_str() == s)
            .ok_or(())
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of GovTalkDetails/GovTalkErrors.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct GovTalkError {
    /// `None` when the gateway sent a type outside the four known ones.
    pub severity: Option<Severity>,
    pub raw_type: String,
    pub number: String,
    pub text: String,
    pub location: Option<String>,
    pub raised_by: Option<String>,
}

/// Errors grouped by severity, each group in document order.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorBuckets {
    pub fatal: Vec<GovTalkError>,
    pub recoverable: Vec<GovTalkError>,
    pub business: Vec<GovTalkError>,
    pub warning: Vec<GovTalkError>,
    pub unclassified: Vec<GovTalkError>,
}

impl ErrorBuckets {
    pub fn get(&self, severity: Severity) -> &[GovTalkError] {
        match severity {
            Severity::Fatal => &self.fatal,
            Severity::Recoverable => &self.recoverable,
            Severity::Business => &self.business,
            Severity::Warning => &self.warning,
        }
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &GovTalkError> {
        self.fatal
            .iter()
            .chain(&self.recoverable)
            .chain(&self.business)
            .chain(&self.warning)
            .chain(&self.unclassified)
    }

    fn push(&mut self, error: GovTalkError) {
        let bucket = match error.severity {
            Some(Severity::Fatal) => &mut self.fatal,
            Some(Severity::Recoverable) => &mut self.recoverable,
            Some(Severity::Business) => &mut self.business,
            Some(Severity::Warning) => &mut self.warning,
            None => &mut self.unclassified,
        };
        bucket.push(error);
    }
}

/// Where and how often to poll for the outcome of a submission.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ResponseEndpoint {
    pub url: String,
    /// Seconds, when the gateway states one.
    pub poll_interval: Option<u64>,
}

/// An inbound GovTalk message. Immutable once parsed.
#[derive(Clone, Debug)]
pub struct ResponseEnvelope {
    raw: String,
    root: Element,
}

impl ResponseEnvelope {
    pub fn parse<S: Into<String>>(raw: S) -> Result<Self, ResponseParseError> {
        let raw = raw.into();
        let root = Element::parse(raw.as_bytes())?;

        if root.name != ROOT_ELEMENT {
            return Err(ResponseParseError::NotAnEnvelope(root.name));
        }

        Ok(Self { raw, root })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    /// The Body element; its children are the department payload.
    pub fn body(&self) -> Option<&Element> {
        self.root.get_child("Body")
    }

    /// True whenever GovTalkDetails carries a GovTalkErrors element, even an
    /// empty one.
    pub fn has_errors(&self) -> bool {
        self.govtalk_errors().is_some()
    }

    pub fn errors(&self) -> ErrorBuckets {
        let mut buckets = ErrorBuckets::default();
        for element in self.error_elements() {
            buckets.push(parse_error(element));
        }
        buckets
    }

    pub fn qualifier(&self) -> Option<Qualifier> {
        self.message_detail("Qualifier")?.parse().ok()
    }

    pub fn class(&self) -> Option<String> {
        self.message_detail("Class")
    }

    pub fn function(&self) -> Option<String> {
        self.message_detail("Function")
    }

    pub fn transaction_id(&self) -> Option<TransactionId> {
        self.message_detail("TransactionID").map(TransactionId::new)
    }

    pub fn correlation_id(&self) -> Option<String> {
        self.message_detail("CorrelationID")
    }

    pub fn gateway_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.message_detail("GatewayTimestamp")?)
    }

    pub fn endpoint(&self) -> Option<ResponseEndpoint> {
        let element = self.message_details()?.get_child("ResponseEndPoint")?;
        let url = text_of(element)?;
        let poll_interval = element
            .attributes
            .get("PollInterval")
            .and_then(|interval| interval.trim().parse().ok());

        Some(ResponseEndpoint { url, poll_interval })
    }

    fn message_details(&self) -> Option<&Element> {
        self.root.get_child("Header")?.get_child("MessageDetails")
    }

    fn message_detail(&self, name: &str) -> Option<String> {
        text_of(self.message_details()?.get_child(name)?)
    }

    fn govtalk_errors(&self) -> Option<&Element> {
        self.root.get_child("GovTalkDetails")?.get_child("GovTalkErrors")
    }

    fn error_elements(&self) -> impl Iterator<Item = &Element> {
        self.govtalk_errors()
            .into_iter()
            .flat_map(|errors| child_elements(errors, "Error"))
    }
}

/// Element children of `parent` named `name`, in document order.
pub fn child_elements<'a>(parent: &'a Element, name: &'a str) -> impl Iterator<Item = &'a Element> {
    parent
        .children
        .iter()
        .filter_map(XMLNode::as_element)
        .filter(move |child| child.name == name)
}

/// Trimmed text content, `None` when absent or blank.
pub fn text_of(element: &Element) -> Option<String> {
    let text = element.get_text()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_owned())
}

/// Trimmed text of the named child.
pub fn child_text(parent: &Element, name: &str) -> Option<String> {
    text_of(parent.get_child(name)?)
}

fn parse_error(element: &Element) -> GovTalkError {
    let raw_type = child_text(element, "Type")
        .or_else(|| element.attributes.get("Type").map(|t| t.trim().to_owned()))
        .unwrap_or_default();

    GovTalkError {
        severity: raw_type.parse().ok(),
        number: child_text(element, "Number").unwrap_or_default(),
        text: child_text(element, "Text").unwrap_or_default(),
        location: child_text(element, "Location"),
        raised_by: child_text(element, "RaisedBy"),
        raw_type,
    }
}

/// Gateway timestamps come with or without an offset; the latter are UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|timestamp| timestamp.and_utc())
        })
        .ok()
}
