use std::{fmt, str::FromStr, time::Duration};

use govtalk_core::{
    message::{AuthType, Credentials},
    validate::{self, ValidationError},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GatewayConfigError {
    #[error("url is not valid (is it missing http/https?)")]
    UrlNotValid,
    #[error("{0}")]
    InvalidField(#[from] ValidationError),
}

/// Where to send envelopes and who to send them as.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub endpoint: Url,
    pub sender_id: String,
    pub password: String,
    #[serde(default = "default_auth_type")]
    pub auth_type: AuthType,
    #[serde(default)]
    pub test: bool,
    #[serde(default)]
    pub schema_location: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl GatewayConfig {
    pub fn new<S: Into<String>, P: Into<String>>(
        endpoint: &str,
        sender_id: S,
        password: P,
    ) -> Result<Self, GatewayConfigError> {
        Ok(Self {
            endpoint: parse_endpoint(endpoint)?,
            sender_id: sender_id.into(),
            password: password.into(),
            auth_type: default_auth_type(),
            test: false,
            schema_location: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        })
    }

    pub fn with_auth_type(mut self, auth_type: AuthType) -> Self {
        self.auth_type = auth_type;
        self
    }

    pub fn with_test_flag(mut self, test: bool) -> Self {
        self.test = test;
        self
    }

    pub fn with_schema_location(mut self, url: &str) -> Result<Self, GatewayConfigError> {
        self.schema_location = Some(validate::schema_location(url)?.to_owned());
        Ok(self)
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.sender_id, &self.password)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("endpoint", &self.endpoint.as_str())
            .field("sender_id", &self.sender_id)
            .field("password", &"[redacted]")
            .field("auth_type", &self.auth_type)
            .field("test", &self.test)
            .field("schema_location", &self.schema_location)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

pub(crate) fn parse_endpoint(url: &str) -> Result<Url, GatewayConfigError> {
    let url = Url::from_str(url).map_err(|_| GatewayConfigError::UrlNotValid)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(GatewayConfigError::UrlNotValid),
    }
}

fn default_auth_type() -> AuthType {
    AuthType::Clear
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
