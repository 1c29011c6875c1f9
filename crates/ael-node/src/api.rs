//! HTTP API server for the AEL node.
//!
//! REST endpoints for the channel lifecycle: create, transfer, top-up, close,
//! manual settlement resolution, plus read-only listings, the event log and
//! node status.
//! Paid routes (create, top-up) pass the `X-Payment` header through the
//! payment gate before the engine sees the request.

use std::sync::Arc;

use ael_channel::{ChannelError, CloseReceipt, TopupReceipt};
use ael_core::{
    Channel, CreateChannelRequest, CreditBalance, EventRecord, TransactionRecord, TxRequest, TxResult,
};
use ael_ledger::ChannelSummary;
use ael_payment::{GateDecision, PaymentError, PaymentTerms, VerifiedPayment, PAYMENT_HEADER};
use ael_settlement::usdc_base_units;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::state::AppState;

// --- Request / response types ---

#[derive(Serialize)]
pub struct StatusResponse {
    pub version: String,
    pub mode: String,
    pub backend: String,
    pub verification: String,
    pub uptime_secs: u64,
}

#[derive(Serialize)]
pub struct ChannelView {
    pub channel: Channel,
    pub balances: Vec<CreditBalance>,
}

#[derive(Serialize)]
pub struct ChannelsResponse {
    pub channels: Vec<ChannelSummary>,
    pub count: usize,
}

#[derive(Serialize)]
pub struct BalancesResponse {
    pub channel_id: String,
    pub balances: Vec<CreditBalance>,
}

#[derive(Serialize)]
pub struct TransactionsResponse {
    pub channel_id: String,
    pub transactions: Vec<TransactionRecord>,
}

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub limit: usize,
}

#[derive(Serialize)]
pub struct EventsResponse {
    pub events: Vec<EventRecord>,
    pub count: usize,
}

#[derive(Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub limit: usize,
}

#[derive(Deserialize)]
pub struct TopupRequest {
    pub agent_id: String,
    /// Credits to mint. Ignored when a verified payment sets the amount.
    #[serde(default)]
    pub amount: u64,
}

#[derive(Deserialize, Default)]
pub struct ResolveRequest {
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Payment terms, on 402 responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x402: Option<PaymentTerms>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            x402: None,
        }),
    )
}

fn channel_error(err: ChannelError) -> ApiError {
    let status = match &err {
        ChannelError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        ChannelError::NotFound(_) => StatusCode::NOT_FOUND,
        ChannelError::Conflict(_) => StatusCode::CONFLICT,
        ChannelError::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ChannelError::TransientExternalFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
        ChannelError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        ChannelError::Ledger(_) | ChannelError::Internal(_) => {
            tracing::error!(error = %err, "request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, err.to_string())
}

fn payment_error(err: PaymentError) -> ApiError {
    let status = match &err {
        PaymentError::PaymentRequired(_) | PaymentError::Rejected { .. } => StatusCode::PAYMENT_REQUIRED,
        PaymentError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
        PaymentError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let x402 = err.terms().cloned();
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            x402,
        }),
    )
}

fn bad_body(rejection: JsonRejection) -> ApiError {
    error_response(StatusCode::BAD_REQUEST, rejection.body_text())
}

fn payment_proof(headers: &HeaderMap) -> Option<&str> {
    headers.get(PAYMENT_HEADER).and_then(|v| v.to_str().ok())
}

// --- Escrow mirroring ---

#[derive(Debug, Clone, Copy)]
enum Mirror {
    Deposit,
    Topup,
}

/// Forward a verified payment to the escrow contract. Failures are logged;
/// the ledger write has already committed and stays.
async fn mirror_to_escrow(state: &AppState, kind: Mirror, channel_id: &str, payment: &VerifiedPayment) {
    let Some(escrow) = state.escrow.clone() else {
        return;
    };
    let Some(units) = usdc_base_units(payment.amount) else {
        tracing::warn!(
            channel_id = %channel_id,
            amount = %payment.amount,
            "payment amount not representable in token base units, escrow not updated"
        );
        return;
    };

    // Detached so a dropped request cannot cut the escrow call short.
    let id = channel_id.to_string();
    let call = tokio::spawn(async move {
        let result = match kind {
            Mirror::Deposit => escrow.deposit(&id, units).await,
            Mirror::Topup => escrow.topup(&id, units).await,
        };
        (id, result)
    });
    match call.await {
        Ok((id, Ok(tx_ref))) => {
            tracing::info!(channel_id = %id, ?kind, units, tx_ref = %tx_ref, "escrow updated");
        }
        Ok((id, Err(e))) => {
            tracing::error!(channel_id = %id, ?kind, units, error = %e, "escrow update failed");
        }
        Err(e) => tracing::error!(error = %e, "escrow update task failed"),
    }
}

// --- Handlers ---

async fn handle_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        mode: state.engine.mode().to_string(),
        backend: state.backend.as_str().to_string(),
        verification: state.gate.mode().as_str().to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

async fn handle_create_channel(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<CreateChannelRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Channel>), ApiError> {
    let Json(mut req) = body.map_err(bad_body)?;

    let decision = state
        .gate
        .verify(payment_proof(&headers))
        .await
        .map_err(payment_error)?;
    if let GateDecision::Verified(payment) = &decision {
        req.usdc_amount = payment.amount;
    }

    let channel = state
        .engine
        .create_channel(&state.op_context(), req)
        .await
        .map_err(channel_error)?;

    if let Some(payment) = decision.payment() {
        mirror_to_escrow(&state, Mirror::Deposit, &channel.channel_id, payment).await;
    }
    Ok((StatusCode::CREATED, Json(channel)))
}

async fn handle_list_channels(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ChannelsResponse>, ApiError> {
    let channels = state
        .engine
        .list_channels(&state.op_context(), query.limit)
        .await
        .map_err(channel_error)?;
    let count = channels.len();
    Ok(Json(ChannelsResponse { channels, count }))
}

async fn handle_get_channel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ChannelView>, ApiError> {
    let ctx = state.op_context();
    let channel = state.engine.get_channel(&ctx, &id).await.map_err(channel_error)?;
    let balances = state.engine.get_balances(&ctx, &id).await.map_err(channel_error)?;
    Ok(Json(ChannelView { channel, balances }))
}

async fn handle_get_balances(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BalancesResponse>, ApiError> {
    let balances = state
        .engine
        .get_balances(&state.op_context(), &id)
        .await
        .map_err(channel_error)?;
    Ok(Json(BalancesResponse {
        channel_id: id,
        balances,
    }))
}

async fn handle_send_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<TxRequest>, JsonRejection>,
) -> Result<Json<TxResult>, ApiError> {
    let Json(req) = body.map_err(bad_body)?;
    let result = state
        .engine
        .send_transaction(&state.op_context(), &id, req)
        .await
        .map_err(channel_error)?;
    Ok(Json(result))
}

async fn handle_list_transactions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TransactionsResponse>, ApiError> {
    let transactions = state
        .engine
        .list_transactions(&state.op_context(), &id)
        .await
        .map_err(channel_error)?;
    Ok(Json(TransactionsResponse {
        channel_id: id,
        transactions,
    }))
}

async fn handle_topup(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Result<Json<TopupRequest>, JsonRejection>,
) -> Result<Json<TopupReceipt>, ApiError> {
    let Json(req) = body.map_err(bad_body)?;

    let decision = state
        .gate
        .verify(payment_proof(&headers))
        .await
        .map_err(payment_error)?;
    let credits = match &decision {
        GateDecision::Verified(payment) => state
            .engine
            .ledger_config()
            .credit_ratio
            .mint(payment.amount)
            .map_err(|e| channel_error(e.into()))?,
        GateDecision::Skipped => req.amount,
    };

    let receipt = state
        .engine
        .topup_credits(&state.op_context(), &id, &req.agent_id, credits)
        .await
        .map_err(channel_error)?;

    if let Some(payment) = decision.payment() {
        mirror_to_escrow(&state, Mirror::Topup, &id, payment).await;
    }
    Ok(Json(receipt))
}

async fn handle_close(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CloseReceipt>, ApiError> {
    let receipt = state
        .engine
        .close_channel(&state.op_context(), &id)
        .await
        .map_err(channel_error)?;
    Ok(Json(receipt))
}

async fn handle_resolve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<ResolveRequest>, JsonRejection>,
) -> Result<Json<Channel>, ApiError> {
    let Json(req) = body.map_err(bad_body)?;
    let channel = state
        .engine
        .resolve_settlement(&state.op_context(), &id, req.reference)
        .await
        .map_err(channel_error)?;
    Ok(Json(channel))
}

async fn handle_list_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<EventsResponse>, ApiError> {
    let events = state
        .engine
        .list_events(&state.op_context(), query.channel_id.as_deref(), query.limit)
        .await
        .map_err(channel_error)?;
    let count = events.len();
    Ok(Json(EventsResponse { events, count }))
}

// --- Server ---

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/status", get(handle_status))
        .route(
            "/api/v1/channels",
            get(handle_list_channels).post(handle_create_channel),
        )
        .route("/api/v1/channels/{id}", get(handle_get_channel))
        .route("/api/v1/channels/{id}/balances", get(handle_get_balances))
        .route(
            "/api/v1/channels/{id}/transactions",
            get(handle_list_transactions).post(handle_send_transaction),
        )
        .route("/api/v1/channels/{id}/topup", post(handle_topup))
        .route("/api/v1/channels/{id}/close", post(handle_close))
        .route("/api/v1/channels/{id}/resolve", post(handle_resolve))
        .route("/api/v1/events", get(handle_list_events))
        .with_state(state)
}

/// Serve the API on an already-bound listener until `shutdown` flips to `true`.
pub async fn start_api_server(
    listener: TcpListener,
    state: Arc<AppState>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let app = build_router(state);
    let listen_addr = listener.local_addr()?;
    tracing::info!(%listen_addr, "HTTP API server started");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await?;
    tracing::info!("HTTP API server stopped");
    Ok(())
}
