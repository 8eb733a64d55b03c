//! Department services built on [`govtalk_client::Client`].

use govtalk_client::{GatewayConfigError, SendError, TransportError};
use govtalk_core::{
    response::{ErrorBuckets, ResponseEnvelope},
    validate::ValidationError,
    writer::WriterError,
};
use thiserror::Error;

pub mod companies_house;
pub mod hmrc_vat;

pub use companies_house::{CompaniesHouse, CompanySearch, CompanySummary};
pub use hmrc_vat::{HmrcVat, PaymentMethod, PollOutcome, VatReturn, VatService};

#[derive(Error, Debug)]
pub enum DepartmentError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("cannot write request body: {0}")]
    Body(#[from] WriterError),
    #[error("cannot configure gateway: {0}")]
    Config(#[from] GatewayConfigError),
    #[error("cannot start transport: {0}")]
    Transport(#[from] TransportError),
    #[error("{0}")]
    Send(#[from] SendError),
    #[error("gateway reported {} error(s)", .0.len())]
    Gateway(ErrorBuckets),
    #[error("no correlation id to poll with")]
    MissingCorrelationId,
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Turns gateway-reported errors into a [`DepartmentError::Gateway`].
pub(crate) fn reject_errors(response: &ResponseEnvelope) -> Result<(), DepartmentError> {
    if response.has_errors() {
        return Err(DepartmentError::Gateway(response.errors()));
    }
    Ok(())
}
