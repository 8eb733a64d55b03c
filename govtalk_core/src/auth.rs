use std::{fmt, sync::Arc};

use md5::{Digest, Md5};
use thiserror::Error;

use crate::message::{AuthType, Credentials, TransactionId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationError {
    #[error("no authentication hook is set for {0} authentication")]
    NoHook(AuthType),
    #[error("authentication hook could not produce a token")]
    HookFailed,
    #[error("{0} authentication needs a numeric transaction id")]
    NonNumericTransactionId(AuthType),
}

/// The Method/Value pair written into SenderDetails/IDAuthentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Authentication {
    pub method: String,
    pub value: String,
}

impl Authentication {
    pub fn new<M: Into<String>, V: Into<String>>(method: M, value: V) -> Self {
        Self {
            method: method.into(),
            value: value.into(),
        }
    }
}

impl fmt::Debug for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authentication")
            .field("method", &self.method)
            .field("value", &"[redacted]")
            .finish()
    }
}

/// Produces a token for the `alternative`, `MD5` and `W3Csigned` methods,
/// none of which has a built-in derivation. Returning `None` fails the send.
pub trait AuthHook: Send + Sync {
    fn authenticate(
        &self,
        credentials: &Credentials,
        transaction_id: &TransactionId,
    ) -> Option<Authentication>;
}

impl<F> AuthHook for F
where
    F: Fn(&Credentials, &TransactionId) -> Option<Authentication> + Send + Sync,
{
    fn authenticate(
        &self,
        credentials: &Credentials,
        transaction_id: &TransactionId,
    ) -> Option<Authentication> {
        self(credentials, transaction_id)
    }
}

/// CHMD5 as a hook, for gateways that expect it under `alternative`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChMd5Hook;

impl AuthHook for ChMd5Hook {
    fn authenticate(
        &self,
        credentials: &Credentials,
        transaction_id: &TransactionId,
    ) -> Option<Authentication> {
        chmd5(credentials, transaction_id).ok()
    }
}

/// Chooses the token derivation for an envelope's authentication type.
/// Tokens are bound to one transaction id, so this runs once per send.
#[derive(Clone)]
pub struct Authenticator {
    auth_type: AuthType,
    hook: Option<Arc<dyn AuthHook>>,
}

impl Authenticator {
    pub fn new(auth_type: AuthType) -> Self {
        Self {
            auth_type,
            hook: None,
        }
    }

    pub fn with_hook(auth_type: AuthType, hook: Arc<dyn AuthHook>) -> Self {
        Self {
            auth_type,
            hook: Some(hook),
        }
    }

    pub fn auth_type(&self) -> AuthType {
        self.auth_type
    }

    pub fn set_hook(&mut self, hook: Arc<dyn AuthHook>) {
        self.hook = Some(hook);
    }

    pub fn hook(&self) -> Option<Arc<dyn AuthHook>> {
        self.hook.clone()
    }

    pub fn authenticate(
        &self,
        credentials: &Credentials,
        transaction_id: &TransactionId,
    ) -> Result<Authentication, AuthenticationError> {
        match self.auth_type {
            AuthType::Clear => Ok(Authentication::new(
                AuthType::Clear.as_str(),
                credentials.password.clone(),
            )),
            AuthType::ChMd5 => chmd5(credentials, transaction_id),
            AuthType::Alternative | AuthType::Md5 | AuthType::W3cSigned => {
                let hook = self
                    .hook
                    .as_ref()
                    .ok_or(AuthenticationError::NoHook(self.auth_type))?;

                hook.authenticate(credentials, transaction_id)
                    .ok_or(AuthenticationError::HookFailed)
            }
        }
    }
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("auth_type", &self.auth_type)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

fn chmd5(
    credentials: &Credentials,
    transaction_id: &TransactionId,
) -> Result<Authentication, AuthenticationError> {
    if !transaction_id.is_numeric() {
        return Err(AuthenticationError::NonNumericTransactionId(AuthType::ChMd5));
    }

    let mut hasher = Md5::new();
    hasher.update(credentials.sender_id.as_bytes());
    hasher.update(credentials.password.as_bytes());
    hasher.update(transaction_id.as_str().as_bytes());

    Ok(Authentication::new(
        AuthType::ChMd5.as_str(),
        format!("{:x}", hasher.finalize()),
    ))
}
