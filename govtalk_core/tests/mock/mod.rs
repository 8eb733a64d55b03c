#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use govtalk_core::{
    auth::{AuthHook, Authentication},
    message::{Credentials, TransactionId},
};

/// Auth hook that signs with a fixed method and remembers every transaction
/// id it was asked to sign.
#[derive(Default)]
pub struct MockHook {
    calls: AtomicUsize,
    seen: Mutex<Vec<TransactionId>>,
    pub refuse: bool,
}

impl MockHook {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn refusing() -> Arc<Self> {
        Arc::new(Self {
            refuse: true,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<TransactionId> {
        self.seen.lock().unwrap().clone()
    }
}

impl AuthHook for MockHook {
    fn authenticate(
        &self,
        credentials: &Credentials,
        transaction_id: &TransactionId,
    ) -> Option<Authentication> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(transaction_id.clone());

        (!self.refuse).then(|| {
            Authentication::new(
                "mock",
                format!("{}:{}", credentials.sender_id, transaction_id),
            )
        })
    }
}
