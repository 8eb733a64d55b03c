pub mod auth;
pub mod canon;
pub mod digest;
pub mod envelope;
pub mod message;
pub mod response;
pub mod validate;
pub mod writer;

pub const ENVELOPE_NAMESPACE: &str = "http://www.govtalk.gov.uk/CM/envelope";
pub const ENVELOPE_SCHEMA_LOCATION: &str = "http://www.govtalk.gov.uk/documents/envelope-v2-0.xsd";
pub const ENVELOPE_VERSION: &str = "2.0";
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

pub const LIBRARY_URI: &str = "https://crates.io/crates/govtalk_core";
pub const LIBRARY_PRODUCT: &str = env!("CARGO_PKG_NAME");
pub const LIBRARY_VERSION: &str = env!("CARGO_PKG_VERSION");
