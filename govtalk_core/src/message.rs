use std::{
    fmt,
    str::FromStr,
    sync::atomic::{AtomicI64, Ordering},
};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    LIBRARY_PRODUCT, LIBRARY_URI, LIBRARY_VERSION,
    writer::{WriterError, XmlWriter},
};

static LAST_TRANSACTION_MICROS: AtomicI64 = AtomicI64::new(0);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown message qualifier: {0}")]
pub struct UnknownQualifier(pub String);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown authentication type: {0}")]
pub struct UnknownAuthType(pub String);

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Qualifier {
    Request,
    Acknowledgement,
    Response,
    Poll,
    Error,
}

impl Qualifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Qualifier::Request => "request",
            Qualifier::Acknowledgement => "acknowledgement",
            Qualifier::Response => "response",
            Qualifier::Poll => "poll",
            Qualifier::Error => "error",
        }
    }
}

impl FromStr for Qualifier {
    type Err = UnknownQualifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "request" => Ok(Qualifier::Request),
            "acknowledgement" => Ok(Qualifier::Acknowledgement),
            "response" => Ok(Qualifier::Response),
            "poll" => Ok(Qualifier::Poll),
            "error" => Ok(Qualifier::Error),
            other => Err(UnknownQualifier(other.to_owned())),
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthType {
    #[serde(rename = "clear")]
    Clear,
    #[serde(rename = "alternative")]
    Alternative,
    #[serde(rename = "MD5")]
    Md5,
    #[serde(rename = "W3Csigned")]
    W3cSigned,
    #[serde(rename = "CHMD5")]
    ChMd5,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::Clear => "clear",
            AuthType::Alternative => "alternative",
            AuthType::Md5 => "MD5",
            AuthType::W3cSigned => "W3Csigned",
            AuthType::ChMd5 => "CHMD5",
        }
    }
}

impl FromStr for AuthType {
    type Err = UnknownAuthType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clear" => Ok(AuthType::Clear),
            "alternative" => Ok(AuthType::Alternative),
            "MD5" => Ok(AuthType::Md5),
            "W3Csigned" => Ok(AuthType::W3cSigned),
            "CHMD5" => Ok(AuthType::ChMd5),
            other => Err(UnknownAuthType(other.to_owned())),
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub sender_id: String,
    pub password: String,
}

impl Credentials {
    pub fn new<S: Into<String>, P: Into<String>>(sender_id: S, password: P) -> Self {
        Self {
            sender_id: sender_id.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("sender_id", &self.sender_id)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// Numeric transaction id, derived from the send time in microseconds.
///
/// Ids handed out by one process never repeat: when two sends land in the
/// same microsecond the later one is bumped forward.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    pub fn generate_at(now: DateTime<Utc>) -> Self {
        let micros = now.timestamp_micros();
        let previous = LAST_TRANSACTION_MICROS
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(micros.max(last + 1))
            })
            .unwrap_or(micros);

        Self(micros.max(previous + 1).to_string())
    }

    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_numeric(&self) -> bool {
        !self.0.is_empty() && self.0.chars().all(|c| c.is_ascii_digit())
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageKey {
    pub key_type: String,
    pub value: String,
}

impl MessageKey {
    pub fn new<T: Into<String>, V: Into<String>>(key_type: T, value: V) -> Self {
        Self {
            key_type: key_type.into(),
            value: value.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChannelId {
    pub id_type: String,
    pub value: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChannelRoute {
    pub uri: String,
    pub product: Option<String>,
    pub version: Option<String>,
    pub ids: Vec<ChannelId>,
    pub timestamp: DateTime<Utc>,
}

impl ChannelRoute {
    pub fn new<S: Into<String>>(uri: S) -> Self {
        Self {
            uri: uri.into(),
            product: None,
            version: None,
            ids: vec![],
            timestamp: Utc::now(),
        }
    }

    pub fn product<S: Into<String>>(mut self, product: S) -> Self {
        self.product = Some(product.into());
        self
    }

    pub fn version<S: Into<String>>(mut self, version: S) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn id<T: Into<String>, V: Into<String>>(mut self, id_type: T, value: V) -> Self {
        self.ids.push(ChannelId {
            id_type: id_type.into(),
            value: value.into(),
        });
        self
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub(crate) fn library(now: DateTime<Utc>) -> Self {
        Self::new(LIBRARY_URI)
            .product(LIBRARY_PRODUCT)
            .version(LIBRARY_VERSION)
            .timestamp(now)
    }

    pub(crate) fn write_to(&self, writer: &mut XmlWriter) {
        writer.start_element("Channel");
        writer.write_element("URI", &self.uri);
        if let Some(product) = &self.product {
            writer.write_element("Product", product);
        }
        if let Some(version) = &self.version {
            writer.write_element("Version", version);
        }
        for id in &self.ids {
            writer.start_element("ID");
            writer.attribute("type", &id.id_type);
            writer.text(&id.value);
            writer.end_element();
        }
        writer.write_element(
            "Timestamp",
            &self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, false),
        );
        writer.end_element();
    }
}

/// Contents of the envelope's Body element, kept verbatim.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Body(String);

impl Body {
    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn raw<S: AsRef<str>>(xml: S) -> Self {
        Self(xml.as_ref().trim().to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Body {
    fn from(xml: &str) -> Self {
        Self::raw(xml)
    }
}

impl From<String> for Body {
    fn from(xml: String) -> Self {
        Self::raw(xml)
    }
}

impl TryFrom<XmlWriter> for Body {
    type Error = WriterError;

    fn try_from(writer: XmlWriter) -> Result<Self, Self::Error> {
        Ok(Self::raw(writer.finish()?))
    }
}
