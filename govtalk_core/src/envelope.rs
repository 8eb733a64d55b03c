use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    ENVELOPE_NAMESPACE, ENVELOPE_SCHEMA_LOCATION, ENVELOPE_VERSION, XSI_NAMESPACE,
    auth::{AuthHook, AuthenticationError, Authenticator},
    digest::{DigestError, DigestMarker},
    message::{AuthType, Body, ChannelRoute, Credentials, MessageKey, Qualifier, TransactionId},
    validate::{self, ValidationError},
    writer::{WriterError, XmlWriter},
};

const POLL_FUNCTION: &str = "submit";

#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("envelope is not ready, missing {}", .missing.join(", "))]
    NotReady { missing: Vec<&'static str> },
    #[error("cannot authenticate: {0}")]
    Authentication(#[from] AuthenticationError),
    #[error("cannot add digest mark: {0}")]
    Digest(#[from] DigestError),
    #[error("cannot write envelope: {0}")]
    Writer(#[from] WriterError),
}

/// A serialized envelope and the transaction id it was sent under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackagedEnvelope {
    pub transaction_id: TransactionId,
    pub xml: String,
}

/// One outbound GovTalk message.
///
/// Every setter validates before it assigns, so a rejected value leaves the
/// envelope exactly as it was. Packaging consumes the envelope.
#[derive(Clone, Debug)]
pub struct Envelope {
    namespace: String,
    schema_location: Option<String>,
    test: bool,
    class: Option<String>,
    qualifier: Option<Qualifier>,
    function: Option<String>,
    correlation_id: Option<String>,
    credentials: Option<Credentials>,
    email: Option<String>,
    authenticator: Option<Authenticator>,
    keys: Vec<MessageKey>,
    routes: Vec<ChannelRoute>,
    body: Option<Body>,
    digest: Option<DigestMarker>,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            namespace: ENVELOPE_NAMESPACE.to_owned(),
            schema_location: None,
            test: false,
            class: None,
            qualifier: None,
            function: None,
            correlation_id: None,
            credentials: None,
            email: None,
            authenticator: None,
            keys: vec![],
            routes: vec![],
            body: None,
            digest: None,
        }
    }
}

impl Envelope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace<S: Into<String>>(mut self, namespace: S) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn set_schema_location(&mut self, url: &str) -> Result<(), ValidationError> {
        self.schema_location = Some(validate::schema_location(url)?.to_owned());
        Ok(())
    }

    pub fn set_test_flag(&mut self, test: bool) {
        self.test = test;
    }

    pub fn set_class(&mut self, class: &str) -> Result<(), ValidationError> {
        self.class = Some(validate::message_class(class)?.to_owned());
        Ok(())
    }

    pub fn set_qualifier(&mut self, qualifier: &str) -> Result<(), ValidationError> {
        self.qualifier = Some(validate::message_qualifier(qualifier)?);
        Ok(())
    }

    pub fn set_function<S: Into<String>>(&mut self, function: S) {
        self.function = Some(function.into());
    }

    pub fn clear_function(&mut self) {
        self.function = None;
    }

    pub fn set_correlation_id(&mut self, correlation_id: &str) -> Result<(), ValidationError> {
        self.correlation_id = Some(validate::correlation_id(correlation_id)?.to_owned());
        Ok(())
    }

    pub fn clear_correlation_id(&mut self) {
        self.correlation_id = None;
    }

    pub fn set_credentials(&mut self, credentials: Credentials) {
        self.credentials = Some(credentials);
    }

    pub fn set_email(&mut self, email: &str) -> Result<(), ValidationError> {
        self.email = Some(validate::email_address(email)?.to_owned());
        Ok(())
    }

    /// Selects the authentication type, keeping any hook already set.
    pub fn set_authentication(&mut self, auth_type: AuthType) {
        let hook = self.authenticator.as_ref().and_then(Authenticator::hook);
        self.authenticator = Some(match hook {
            Some(hook) => Authenticator::with_hook(auth_type, hook),
            None => Authenticator::new(auth_type),
        });
    }

    pub fn set_authenticator(&mut self, authenticator: Authenticator) {
        self.authenticator = Some(authenticator);
    }

    /// Sets the hook used by the `alternative`, `MD5` and `W3Csigned`
    /// types. Defaults the type to `alternative` when none is set yet.
    pub fn set_auth_hook(&mut self, hook: Arc<dyn AuthHook>) {
        let authenticator = self
            .authenticator
            .get_or_insert_with(|| Authenticator::new(AuthType::Alternative));
        authenticator.set_hook(hook);
    }

    pub fn add_key<T: Into<String>, V: Into<String>>(&mut self, key_type: T, value: V) {
        self.keys.push(MessageKey::new(key_type, value));
    }

    /// Deletes every key of the given type, or only those that also have the
    /// given value. Returns how many were deleted.
    pub fn delete_keys(&mut self, key_type: &str, value: Option<&str>) -> usize {
        let before = self.keys.len();
        self.keys.retain(|key| {
            let matches =
                key.key_type == key_type && value.is_none_or(|value| key.value == value);
            !matches
        });
        before - self.keys.len()
    }

    pub fn reset_keys(&mut self) {
        self.keys.clear();
    }

    pub fn add_channel_route(&mut self, route: ChannelRoute) -> Result<(), ValidationError> {
        validate::channel_uri(&route.uri)?;
        self.routes.push(route);
        Ok(())
    }

    pub fn set_body<B: Into<Body>>(&mut self, body: B) {
        self.body = Some(body.into());
    }

    pub fn set_digest(&mut self, digest: Option<DigestMarker>) {
        self.digest = digest;
    }

    /// A fresh poll request. Credentials and authentication still need to be
    /// set before it can be packaged.
    pub fn poll(class: &str, correlation_id: &str) -> Result<Self, ValidationError> {
        let mut envelope = Self::new();
        envelope.prepare_poll(class, correlation_id)?;
        Ok(envelope)
    }

    /// Turns this envelope into a poll for an earlier submission: qualifier
    /// `poll`, function `submit`, no keys and an empty body.
    pub fn prepare_poll(&mut self, class: &str, correlation_id: &str) -> Result<(), ValidationError> {
        let class = validate::message_class(class)?;
        let correlation_id = validate::correlation_id(correlation_id)?;

        self.class = Some(class.to_owned());
        self.qualifier = Some(Qualifier::Poll);
        self.function = Some(POLL_FUNCTION.to_owned());
        self.correlation_id = Some(correlation_id.to_owned());
        self.keys.clear();
        self.body = Some(Body::empty());
        self.digest = None;
        Ok(())
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn schema_location(&self) -> Option<&str> {
        self.schema_location.as_deref()
    }

    pub fn test_flag(&self) -> bool {
        self.test
    }

    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    pub fn qualifier(&self) -> Option<Qualifier> {
        self.qualifier
    }

    pub fn function(&self) -> Option<&str> {
        self.function.as_deref()
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn auth_type(&self) -> Option<AuthType> {
        self.authenticator.as_ref().map(Authenticator::auth_type)
    }

    pub fn keys(&self) -> &[MessageKey] {
        &self.keys
    }

    pub fn channel_routes(&self) -> &[ChannelRoute] {
        &self.routes
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    pub fn digest_marker(&self) -> Option<&DigestMarker> {
        self.digest.as_ref()
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = vec![];
        if self.class.is_none() {
            missing.push("class");
        }
        if self.qualifier.is_none() {
            missing.push("qualifier");
        }
        if self.authenticator.is_none() {
            missing.push("authentication type");
        }
        if self.credentials.is_none() {
            missing.push("sender credentials");
        }
        if self.body.is_none() {
            missing.push("body");
        }
        missing
    }

    pub fn is_ready(&self) -> bool {
        self.missing_fields().is_empty()
    }

    pub fn package(self) -> Result<PackagedEnvelope, EnvelopeError> {
        self.package_internal(Utc::now())
    }

    #[cfg(feature = "chrono")]
    pub fn package_at_time(self, now: DateTime<Utc>) -> Result<PackagedEnvelope, EnvelopeError> {
        self.package_internal(now)
    }

    fn package_internal(self, now: DateTime<Utc>) -> Result<PackagedEnvelope, EnvelopeError> {
        let (Some(class), Some(qualifier), Some(authenticator), Some(credentials), Some(body)) = (
            &self.class,
            self.qualifier,
            &self.authenticator,
            &self.credentials,
            &self.body,
        ) else {
            return Err(EnvelopeError::NotReady {
                missing: self.missing_fields(),
            });
        };

        let transaction_id = TransactionId::generate_at(now);
        let authentication = authenticator.authenticate(credentials, &transaction_id)?;

        let mut writer = XmlWriter::new();
        writer.start_element("GovTalkMessage");
        writer.attribute("xmlns", &self.namespace);
        writer.attribute("xmlns:xsi", XSI_NAMESPACE);
        writer.attribute("xsi:schemaLocation", &self.full_schema_location());
        writer.write_element("EnvelopeVersion", ENVELOPE_VERSION);

        writer.start_element("Header");
        writer.start_element("MessageDetails");
        writer.write_element("Class", class);
        writer.write_element("Qualifier", qualifier.as_str());
        if let Some(function) = &self.function {
            writer.write_element("Function", function);
        }
        writer.write_element("TransactionID", transaction_id.as_str());
        if let Some(correlation_id) = &self.correlation_id {
            writer.write_element("CorrelationID", correlation_id);
        }
        writer.write_element("GatewayTest", if self.test { "1" } else { "0" });
        writer.end_element(); // MessageDetails

        writer.start_element("SenderDetails");
        writer.start_element("IDAuthentication");
        writer.write_element("SenderID", &credentials.sender_id);
        writer.start_element("Authentication");
        writer.write_element("Method", &authentication.method);
        writer.write_element("Value", &authentication.value);
        writer.end_element(); // Authentication
        writer.end_element(); // IDAuthentication
        if let Some(email) = &self.email {
            writer.write_element("EmailAddress", email);
        }
        writer.end_element(); // SenderDetails
        writer.end_element(); // Header

        writer.start_element("GovTalkDetails");
        if !self.keys.is_empty() {
            writer.start_element("Keys");
            for key in &self.keys {
                writer.start_element("Key");
                writer.attribute("type", &key.key_type);
                writer.text(&key.value);
                writer.end_element();
            }
            writer.end_element(); // Keys
        }
        writer.start_element("ChannelRouting");
        for route in self.routes.iter().chain(std::iter::once(&ChannelRoute::library(now))) {
            route.write_to(&mut writer);
        }
        writer.end_element(); // ChannelRouting
        writer.end_element(); // GovTalkDetails

        writer.start_element("Body");
        if body.is_empty() {
            writer.write_raw("");
        } else {
            writer.write_raw(&format!("\n{}\n", body.as_str()));
        }
        writer.end_element(); // Body

        let mut xml = writer.finish()?;
        if let Some(digest) = &self.digest {
            xml = digest.mark(&xml)?;
        }

        tracing::debug!(
            %transaction_id,
            class = %class,
            qualifier = %qualifier,
            bytes = xml.len(),
            "packaged envelope"
        );

        Ok(PackagedEnvelope {
            transaction_id,
            xml,
        })
    }

    fn full_schema_location(&self) -> String {
        match &self.schema_location {
            Some(additional) => format!("{} {}", ENVELOPE_SCHEMA_LOCATION, additional),
            None => ENVELOPE_SCHEMA_LOCATION.to_owned(),
        }
    }
}
