use govtalk_core::message::{Qualifier, TransactionId};
use tokio::sync::mpsc::UnboundedSender;
use url::Url;

pub type EventSender = UnboundedSender<Event>;

/// Progress of sends on a [`Client`](crate::Client), for callers that want
/// more than tracing output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    NotReady(Vec<&'static str>),
    Sending {
        transaction_id: TransactionId,
        class: String,
        qualifier: Qualifier,
        endpoint: Url,
    },
    Received {
        transaction_id: TransactionId,
        qualifier: Option<Qualifier>,
        has_errors: bool,
    },
    TransportFailed(TransactionId, String),
    InvalidResponse(TransactionId, String),
}
