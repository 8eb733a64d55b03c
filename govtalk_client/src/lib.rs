pub mod client;
pub mod config;
pub mod event;
pub mod transport;

pub use client::{Client, SendError};
pub use config::{GatewayConfig, GatewayConfigError};
pub use event::{Event, EventSender};
pub use transport::{HttpTransport, LocalTransport, Transport, TransportError};
