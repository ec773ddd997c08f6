//! HTTP handlers for billing endpoints.
//!
//! These handlers connect axum routes to the application layer. The webhook
//! handler takes the body as raw `Bytes` because the signature covers the
//! exact bytes the gateway sent.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::application::{
    ActivateFreePlanCommand, ActivateFreePlanHandler, CreateOrderCommand, CreateOrderHandler,
    GetSubscriptionHandler, GetSubscriptionQuery, HandleGatewayWebhookCommand,
    HandleGatewayWebhookHandler, PaymentProcessor, SubscriptionActivator, VerifyPaymentCommand,
    VerifyPaymentHandler,
};
use crate::domain::billing::{BillingError, GatewaySignatureVerifier};
use crate::ports::{
    PaymentGateway, PaymentLedger, PaymentSettlement, PlanCatalog, SubscriptionRepository,
};

use crate::adapters::http::middleware::RequireAuth;
use super::dto::{
    ActivationResponse, CreateOrderResponse, ErrorResponse, MySubscriptionResponse,
    PlanSelectionRequest, VerifyPaymentRequest, WebhookAckResponse,
};

/// Header carrying the hex HMAC-SHA256 of the webhook body.
pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared dependencies for billing handlers. Cloned per request.
#[derive(Clone)]
pub struct BillingAppState {
    pub plans: Arc<dyn PlanCatalog>,
    pub ledger: Arc<dyn PaymentLedger>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub verifier: Arc<GatewaySignatureVerifier>,
    pub processor: Arc<PaymentProcessor>,
    pub activator: Arc<SubscriptionActivator>,
}

impl BillingAppState {
    /// Wires the shared services from the storage and gateway ports.
    pub fn new(
        plans: Arc<dyn PlanCatalog>,
        ledger: Arc<dyn PaymentLedger>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        settlement: Arc<dyn PaymentSettlement>,
        gateway: Arc<dyn PaymentGateway>,
        verifier: GatewaySignatureVerifier,
    ) -> Self {
        let processor = Arc::new(PaymentProcessor::new(
            ledger.clone(),
            plans.clone(),
            settlement,
        ));
        let activator = Arc::new(SubscriptionActivator::new(
            plans.clone(),
            subscriptions.clone(),
        ));
        Self {
            plans,
            ledger,
            subscriptions,
            gateway,
            verifier: Arc::new(verifier),
            processor,
            activator,
        }
    }

    pub fn create_order_handler(&self) -> CreateOrderHandler {
        CreateOrderHandler::new(
            self.plans.clone(),
            self.ledger.clone(),
            self.gateway.clone(),
        )
    }

    pub fn verify_payment_handler(&self) -> VerifyPaymentHandler {
        VerifyPaymentHandler::new(
            self.ledger.clone(),
            self.processor.clone(),
            self.activator.clone(),
            self.verifier.clone(),
        )
    }

    pub fn webhook_handler(&self) -> HandleGatewayWebhookHandler {
        HandleGatewayWebhookHandler::new(
            self.ledger.clone(),
            self.processor.clone(),
            self.verifier.clone(),
        )
    }

    pub fn activate_free_plan_handler(&self) -> ActivateFreePlanHandler {
        ActivateFreePlanHandler::new(self.plans.clone(), self.activator.clone())
    }

    pub fn get_subscription_handler(&self) -> GetSubscriptionHandler {
        GetSubscriptionHandler::new(self.activator.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /payments/create-order - Open a gateway order for a paid plan
pub async fn create_order(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<PlanSelectionRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let cmd = CreateOrderCommand {
        user_id: user.id,
        plan_id: request.plan_id,
    };

    let result = state.create_order_handler().handle(cmd).await?;

    Ok(Json(CreateOrderResponse::from(result)))
}

/// POST /payments/verify - Confirm a checkout from the client
pub async fn verify_payment(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let cmd = VerifyPaymentCommand {
        user_id: user.id,
        gateway_order_id: request.gateway_order_id,
        gateway_payment_id: request.gateway_payment_id,
        signature: request.signature,
        plan_id: request.plan_id,
    };

    let result = state.verify_payment_handler().handle(cmd).await?;

    Ok(Json(ActivationResponse::new(result.subscription)))
}

/// POST /payments/activate-free - Activate a zero-price plan
pub async fn activate_free_plan(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<PlanSelectionRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let cmd = ActivateFreePlanCommand {
        user_id: user.id,
        plan_id: request.plan_id,
    };

    let view = state.activate_free_plan_handler().handle(cmd).await?;

    Ok(Json(ActivationResponse::new(Some(view))))
}

/// POST /webhooks/gateway - Gateway-pushed payment events
///
/// No session auth; the signature header is the only credential.
pub async fn handle_gateway_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, BillingApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let cmd = HandleGatewayWebhookCommand {
        raw_body: body.to_vec(),
        signature,
    };

    let outcome = state.webhook_handler().handle(cmd).await?;
    tracing::debug!(outcome = ?outcome, "Webhook acknowledged");

    Ok(Json(WebhookAckResponse::received(outcome)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /payments/my-subscription - The caller's active subscription, or null
pub async fn my_subscription(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, BillingApiError> {
    let query = GetSubscriptionQuery { user_id: user.id };

    let view = state.get_subscription_handler().handle(query).await?;

    Ok(Json(MySubscriptionResponse {
        subscription: view.map(Into::into),
    }))
}

/// GET /health - Liveness probe
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts billing errors to HTTP responses.
#[derive(Debug)]
pub struct BillingApiError(BillingError);

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl BillingApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            BillingError::ValidationFailed { .. }
            | BillingError::FreePlan(_)
            | BillingError::InvalidPaymentSignature
            | BillingError::MalformedPayload(_)
            | BillingError::DowngradeRejected => StatusCode::BAD_REQUEST,
            BillingError::InvalidWebhookSignature => StatusCode::UNAUTHORIZED,
            BillingError::PlanNotFound(_)
            | BillingError::InactivePlan(_)
            | BillingError::OrderNotFound(_) => StatusCode::NOT_FOUND,
            BillingError::DuplicateOrder(_) | BillingError::PaymentConflict { .. } => {
                StatusCode::CONFLICT
            }
            BillingError::GatewayUnavailable(_) | BillingError::Infrastructure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, code = self.0.code(), "Billing request failed");
        }

        let body = ErrorResponse::new(self.0.code(), self.0.message());
        (status, Json(body)).into_response()
    }
}
