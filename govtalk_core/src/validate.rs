//! Field validators shared by the envelope and the department adapters.
//!
//! Each validator either returns the (possibly normalised) value or rejects
//! it; callers assign only after a validator has accepted, so a rejected
//! value never reaches the envelope.

use thiserror::Error;

use crate::message::{Qualifier, TransactionId};

pub const CLASS_MIN_LENGTH: usize = 5;
pub const CLASS_MAX_LENGTH: usize = 31;
pub const CORRELATION_ID_MAX_LENGTH: usize = 32;
pub const EMAIL_PART_MAX_LENGTH: usize = 64;
pub const COMPANY_NAME_MAX_LENGTH: usize = 160;

pub const DATASETS: [&str; 4] = ["LIVE", "DISSOLVED", "FORMER", "PROPOSED"];
pub const SENDER_CAPACITIES: [&str; 10] = [
    "Individual",
    "Company",
    "Agent",
    "Bureau",
    "Partnership",
    "Trust",
    "Employer",
    "Government",
    "Acting in Capacity",
    "Other",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("schema location must be an http(s) url on a .gov.uk host")]
    SchemaLocation,
    #[error("message class must be between 5 and 31 characters")]
    MessageClass,
    #[error("message qualifier must be one of request, acknowledgement, response, poll or error")]
    MessageQualifier,
    #[error("correlation id must be at most 32 characters")]
    CorrelationId,
    #[error("sender email address is not valid")]
    EmailAddress,
    #[error("channel route uri must not be empty")]
    ChannelUri,
    #[error("transaction id must be numeric")]
    TransactionId,
    #[error("company name must be between 1 and 160 characters")]
    CompanyName,
    #[error("company number must be up to 8 letters or digits, optionally followed by *")]
    CompanyNumber,
    #[error("dataset must be one of LIVE, DISSOLVED, FORMER or PROPOSED")]
    Dataset,
    #[error("vat registration number must be 9 to 12 digits, optionally prefixed with GB")]
    VatNumber,
    #[error("vat period must be in the form YYYY-MM")]
    VatPeriod,
    #[error("sender capacity is not one of the accepted values")]
    SenderCapacity,
    #[error("amount {0} is not a finite number")]
    Amount(&'static str),
    #[error("net vat cannot be negative")]
    NegativeNetVat,
}

pub fn schema_location(url: &str) -> Result<&str, ValidationError> {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .ok_or(ValidationError::SchemaLocation)?;

    let host_end = rest
        .find(|c: char| !(is_word_char(c) || c == '-' || c == '.'))
        .unwrap_or(rest.len());
    let host = &rest[..host_end];

    // at least one host character must precede ".gov.uk"
    match host.get(1..) {
        Some(tail) if tail.contains(".gov.uk") => Ok(url),
        _ => Err(ValidationError::SchemaLocation),
    }
}

pub fn message_class(class: &str) -> Result<&str, ValidationError> {
    if (CLASS_MIN_LENGTH..=CLASS_MAX_LENGTH).contains(&class.len()) {
        Ok(class)
    } else {
        Err(ValidationError::MessageClass)
    }
}

pub fn message_qualifier(qualifier: &str) -> Result<Qualifier, ValidationError> {
    qualifier
        .to_lowercase()
        .parse()
        .map_err(|_| ValidationError::MessageQualifier)
}

pub fn correlation_id(correlation_id: &str) -> Result<&str, ValidationError> {
    if correlation_id.len() <= CORRELATION_ID_MAX_LENGTH {
        Ok(correlation_id)
    } else {
        Err(ValidationError::CorrelationId)
    }
}

pub fn email_address(email: &str) -> Result<&str, ValidationError> {
    let (local, domain) = email.split_once('@').ok_or(ValidationError::EmailAddress)?;

    let part_ok = |part: &str| {
        (1..=EMAIL_PART_MAX_LENGTH).contains(&part.len())
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
    };

    if part_ok(local) && part_ok(domain) {
        Ok(email)
    } else {
        Err(ValidationError::EmailAddress)
    }
}

pub fn channel_uri(uri: &str) -> Result<&str, ValidationError> {
    if uri.trim().is_empty() {
        Err(ValidationError::ChannelUri)
    } else {
        Ok(uri)
    }
}

pub fn transaction_id(transaction_id: &TransactionId) -> Result<&TransactionId, ValidationError> {
    if transaction_id.is_numeric() {
        Ok(transaction_id)
    } else {
        Err(ValidationError::TransactionId)
    }
}

pub fn company_name(name: &str) -> Result<&str, ValidationError> {
    if !name.is_empty() && name.chars().count() <= COMPANY_NAME_MAX_LENGTH {
        Ok(name)
    } else {
        Err(ValidationError::CompanyName)
    }
}

pub fn company_number(number: &str) -> Result<&str, ValidationError> {
    let digits = number.strip_suffix('*').unwrap_or(number);

    if (1..=8).contains(&digits.len())
        && digits
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        Ok(number)
    } else {
        Err(ValidationError::CompanyNumber)
    }
}

pub fn dataset(dataset: &str) -> Result<&'static str, ValidationError> {
    let upper = dataset.to_uppercase();
    DATASETS
        .into_iter()
        .find(|candidate| *candidate == upper)
        .ok_or(ValidationError::Dataset)
}

/// Strips spaces from a VAT registration number before checking it.
pub fn vat_number(vat_number: &str) -> Result<String, ValidationError> {
    let compact: String = vat_number.chars().filter(|c| *c != ' ').collect();
    let digits = compact.strip_prefix("GB").unwrap_or(&compact);

    if (9..=12).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit()) {
        Ok(compact)
    } else {
        Err(ValidationError::VatNumber)
    }
}

pub fn vat_period(period: &str) -> Result<&str, ValidationError> {
    let bytes = period.as_bytes();
    let shape_ok = bytes.len() == 7
        && bytes[4] == b'-'
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[5..].iter().all(u8::is_ascii_digit);

    if shape_ok {
        Ok(period)
    } else {
        Err(ValidationError::VatPeriod)
    }
}

pub fn sender_capacity(capacity: &str) -> Result<&str, ValidationError> {
    if SENDER_CAPACITIES.contains(&capacity) {
        Ok(capacity)
    } else {
        Err(ValidationError::SenderCapacity)
    }
}

pub fn amount(name: &'static str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::Amount(name))
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
