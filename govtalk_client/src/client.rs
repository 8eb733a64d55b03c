use std::{error::Error, sync::Arc};

use govtalk_core::{
    auth::AuthHook,
    envelope::{Envelope, EnvelopeError},
    message::TransactionId,
    response::{ErrorBuckets, ResponseEnvelope, ResponseParseError},
    validate::ValidationError,
};
use thiserror::Error;
use tracing::Instrument;
use url::Url;

use crate::{
    config::{GatewayConfig, GatewayConfigError, parse_endpoint},
    event::{Event, EventSender},
    transport::{HttpTransport, Transport, TransportError},
};

#[derive(Error, Debug)]
pub enum SendError {
    #[error("cannot package envelope: {0}")]
    Envelope(#[from] EnvelopeError),
    #[error("cannot reach gateway: {0}")]
    Transport(#[source] Box<dyn Error + Send + Sync>),
    #[error("gateway response is not usable: {0}")]
    InvalidResponse(#[from] ResponseParseError),
}

/// What the last send left behind.
#[derive(Debug, Default)]
struct LastExchange {
    transaction_id: Option<TransactionId>,
    request: Option<String>,
    raw_response: Option<String>,
    response: Option<ResponseEnvelope>,
}

/// Sends envelopes to one gateway and keeps the last request and response.
///
/// `send` takes `&mut self`, so a client carries at most one send at a time.
pub struct Client<T> {
    config: GatewayConfig,
    transport: T,
    auth_hook: Option<Arc<dyn AuthHook>>,
    event_sender: Option<EventSender>,
    last: LastExchange,
}

impl Client<HttpTransport> {
    pub fn new(config: GatewayConfig) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(config.timeout())?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T> Client<T>
where
    T: Transport,
{
    pub fn with_transport(config: GatewayConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            auth_hook: None,
            event_sender: None,
            last: LastExchange::default(),
        }
    }

    pub fn with_auth_hook(mut self, hook: Arc<dyn AuthHook>) -> Self {
        self.auth_hook = Some(hook);
        self
    }

    pub fn with_events(mut self, event_sender: EventSender) -> Self {
        self.event_sender = Some(event_sender);
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn endpoint(&self) -> &Url {
        &self.config.endpoint
    }

    /// Redirects later sends, e.g. to the poll endpoint a gateway returned.
    pub fn set_endpoint(&mut self, url: &str) -> Result<(), GatewayConfigError> {
        self.config.endpoint = parse_endpoint(url)?;
        Ok(())
    }

    pub fn set_test_flag(&mut self, test: bool) {
        self.config.test = test;
    }

    /// A fresh envelope carrying this client's sender details,
    /// authentication and test flag.
    pub fn envelope(&self) -> Result<Envelope, ValidationError> {
        let mut envelope = Envelope::new();
        envelope.set_credentials(self.config.credentials());
        envelope.set_authentication(self.config.auth_type);
        if let Some(hook) = &self.auth_hook {
            envelope.set_auth_hook(Arc::clone(hook));
        }
        envelope.set_test_flag(self.config.test);
        if let Some(schema_location) = &self.config.schema_location {
            envelope.set_schema_location(schema_location)?;
        }
        Ok(envelope)
    }

    pub fn poll_envelope(&self, class: &str, correlation_id: &str) -> Result<Envelope, ValidationError> {
        let mut envelope = self.envelope()?;
        envelope.prepare_poll(class, correlation_id)?;
        Ok(envelope)
    }

    pub async fn send(&mut self, envelope: Envelope) -> Result<&ResponseEnvelope, SendError> {
        let class = envelope.class().unwrap_or_default().to_owned();
        let qualifier = envelope.qualifier();

        self.last = LastExchange::default();

        let packaged = envelope.package().inspect_err(|error| {
            if let EnvelopeError::NotReady { missing } = error {
                self.emit(Event::NotReady(missing.clone()));
            }
        })?;

        let transaction_id = packaged.transaction_id;
        self.last.transaction_id = Some(transaction_id.clone());
        self.last.request = Some(packaged.xml);

        let span = tracing::info_span!(
            "send",
            class = %class,
            qualifier = ?qualifier,
            %transaction_id
        );

        if let Some(qualifier) = qualifier {
            self.emit(Event::Sending {
                transaction_id: transaction_id.clone(),
                class,
                qualifier,
                endpoint: self.config.endpoint.clone(),
            });
        }

        let response = self.exchange(transaction_id).instrument(span).await?;
        Ok(response)
    }

    async fn exchange(&mut self, transaction_id: TransactionId) -> Result<&ResponseEnvelope, SendError> {
        let request = self.last.request.as_deref().unwrap_or_default();
        tracing::debug!(endpoint = %self.config.endpoint, bytes = request.len(), "sending envelope");

        let raw = match self.transport.exchange(&self.config.endpoint, request).await {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!(%error, "transport failed");
                self.emit(Event::TransportFailed(transaction_id, error.to_string()));
                return Err(SendError::Transport(Box::new(error)));
            }
        };
        self.last.raw_response = Some(raw.clone());

        let response = match ResponseEnvelope::parse(raw) {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(%error, "invalid gateway response");
                self.emit(Event::InvalidResponse(transaction_id, error.to_string()));
                return Err(error.into());
            }
        };

        let has_errors = response.has_errors();
        if has_errors {
            tracing::warn!(errors = response.errors().len(), "gateway reported errors");
        } else {
            tracing::debug!(qualifier = ?response.qualifier(), "received response");
        }

        self.emit(Event::Received {
            transaction_id,
            qualifier: response.qualifier(),
            has_errors,
        });

        Ok(&*self.last.response.insert(response))
    }

    pub fn last_transaction_id(&self) -> Option<&TransactionId> {
        self.last.transaction_id.as_ref()
    }

    pub fn full_request(&self) -> Option<&str> {
        self.last.request.as_deref()
    }

    pub fn full_response(&self) -> Option<&str> {
        self.last.raw_response.as_deref()
    }

    pub fn response(&self) -> Option<&ResponseEnvelope> {
        self.last.response.as_ref()
    }

    pub fn response_has_errors(&self) -> bool {
        self.last
            .response
            .as_ref()
            .is_some_and(ResponseEnvelope::has_errors)
    }

    /// `None` when there is no response or it reported no errors.
    pub fn response_errors(&self) -> Option<ErrorBuckets> {
        self.last
            .response
            .as_ref()
            .filter(|response| response.has_errors())
            .map(ResponseEnvelope::errors)
    }

    fn emit(&self, event: Event) {
        if let Some(event_sender) = &self.event_sender {
            event_sender.send(event).ok();
        }
    }
}
