//! Mock payment gateway for testing.
//!
//! Opens orders with sequential ids, records every request, and can be told
//! to fail the next calls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::ports::{CreateOrderRequest, GatewayError, GatewayOrder, PaymentGateway};

#[derive(Default)]
struct MockState {
    requests: Vec<CreateOrderRequest>,
    failure: Option<GatewayError>,
}

/// Mock gateway for unit and integration tests.
#[derive(Clone)]
pub struct MockPaymentGateway {
    key_id: String,
    next_order: Arc<AtomicU64>,
    inner: Arc<Mutex<MockState>>,
}

impl MockPaymentGateway {
    pub fn new(key_id: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            next_order: Arc::new(AtomicU64::new(1)),
            inner: Arc::default(),
        }
    }

    /// Fail every subsequent `create_order` with `error`.
    pub fn fail_with(&self, error: GatewayError) {
        self.state().failure = Some(error);
    }

    pub fn recover(&self) {
        self.state().failure = None;
    }

    /// Requests received so far, including failed ones.
    pub fn requests(&self) -> Vec<CreateOrderRequest> {
        self.state().requests.clone()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_order(&self, request: CreateOrderRequest) -> Result<GatewayOrder, GatewayError> {
        let mut state = self.state();
        state.requests.push(request.clone());
        if let Some(err) = state.failure.clone() {
            return Err(err);
        }

        let n = self.next_order.fetch_add(1, Ordering::SeqCst);
        Ok(GatewayOrder {
            id: format!("order_mock{:06}", n),
            amount_minor_units: request.amount_minor_units,
            currency: request.currency,
            receipt: Some(request.receipt),
        })
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }
}
